use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::utils::ApiResponse;

#[openapi(tag = "Health")]
#[get("/health")]
pub fn health() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({ "status": "ok" })))
}
