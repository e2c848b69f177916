use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::db::{DbConn, TRABAJADORES};
use crate::models::{Trabajador, TrabajadorPublicResponse, TrabajadorStatus};
use crate::utils::{parse_object_id, ApiError, ApiResponse, Page};

/// Case-insensitive exact match on a free-text field.
pub(crate) fn exact_ci(value: &str) -> Document {
    doc! {
        "$regex": format!("^{}$", regex::escape(value.trim())),
        "$options": "i",
    }
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct TrabajadorSearchQuery {
    pub occupation: Option<String>,
    pub min_rating: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Approved workers, best rated first.
#[openapi(tag = "Trabajador")]
#[get("/trabajadores?<query..>")]
pub async fn list_trabajadores(
    db: &State<DbConn>,
    query: TrabajadorSearchQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = Page::new(query.page, query.limit);

    let mut filter = doc! { "status": TrabajadorStatus::Approved.as_str() };
    if let Some(occupation) = query.occupation.as_deref().filter(|o| !o.trim().is_empty()) {
        filter.insert("occupation", exact_ci(occupation));
    }
    if let Some(min_rating) = query.min_rating {
        filter.insert("averageRating", doc! { "$gte": min_rating });
    }

    let find_options = FindOptions::builder()
        .skip(page.skip())
        .limit(page.limit)
        .sort(doc! { "averageRating": -1, "totalReviews": -1 })
        .build();

    let collection = db.collection::<Trabajador>(TRABAJADORES);
    let trabajadores: Vec<TrabajadorPublicResponse> = collection
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::database("Failed to list trabajadores", e))?
        .map_ok(TrabajadorPublicResponse::from)
        .try_collect()
        .await
        .map_err(|e| ApiError::database("Failed to read trabajadores", e))?;

    let total = collection
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::database("Failed to count trabajadores", e))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "trabajadores": trabajadores,
        "pagination": page.info(total),
    }))))
}

#[openapi(tag = "Trabajador")]
#[get("/trabajadores/<trabajador_id>")]
pub async fn get_trabajador(
    db: &State<DbConn>,
    trabajador_id: String,
) -> Result<Json<ApiResponse<TrabajadorPublicResponse>>, ApiError> {
    let object_id = parse_object_id(&trabajador_id, "trabajador")?;

    let trabajador = db
        .collection::<Trabajador>(TRABAJADORES)
        .find_one(
            doc! { "_id": object_id, "status": TrabajadorStatus::Approved.as_str() },
            None,
        )
        .await
        .map_err(|e| ApiError::database("Failed to load trabajador", e))?
        .ok_or_else(|| ApiError::not_found("Trabajador not found"))?;

    Ok(Json(ApiResponse::success(TrabajadorPublicResponse::from(trabajador))))
}
