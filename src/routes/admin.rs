use log::info;
use mongodb::bson::{doc, DateTime};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::db::{DbConn, TRABAJADORES};
use crate::guards::AdminGuard;
use crate::models::{Trabajador, TrabajadorResponse, TrabajadorStatus, UpdateTrabajadorStatusDto};
use crate::services::whatsapp::status_notification;
use crate::services::TwilioService;
use crate::utils::{parse_object_id, ApiError, ApiResponse, Page};

// ==================== TRABAJADOR APPLICATIONS ====================

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct AdminTrabajadorQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Trabajadores")]
#[get("/admin/trabajadores?<query..>")]
pub async fn list_applications(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: AdminTrabajadorQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = Page::new(query.page, query.limit);

    let mut filter = doc! {};
    if let Some(status) = query.status.as_deref() {
        let status = TrabajadorStatus::parse(status)
            .ok_or_else(|| ApiError::bad_request("Invalid status"))?;
        filter.insert("status", status.as_str());
    }

    let find_options = FindOptions::builder()
        .skip(page.skip())
        .limit(page.limit)
        .sort(doc! { "createdAt": -1 })
        .build();

    let collection = db.collection::<Trabajador>(TRABAJADORES);
    let trabajadores: Vec<TrabajadorResponse> = collection
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::database("Failed to list trabajadores", e))?
        .map_ok(TrabajadorResponse::from)
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

/// Only `approved` and `rejected` are valid decisions.
fn parse_decision(dto: &UpdateTrabajadorStatusDto) -> Result<TrabajadorStatus, ApiError> {
    match TrabajadorStatus::parse(&dto.status) {
        Some(TrabajadorStatus::Pending) => {
            Err(ApiError::bad_request("Status must be 'approved' or 'rejected'"))
        }
        Some(status) => Ok(status),
        None => Err(ApiError::bad_request("Invalid status")),
    }
}

#[openapi(tag = "Admin - Trabajadores")]
#[put("/admin/trabajadores/<trabajador_id>/status", data = "<dto>")]
pub async fn update_application_status(
    db: &State<DbConn>,
    admin: AdminGuard,
    trabajador_id: String,
    dto: Json<UpdateTrabajadorStatusDto>,
) -> Result<Json<ApiResponse<TrabajadorResponse>>, ApiError> {
    let status = parse_decision(&dto)?;
    let object_id = parse_object_id(&trabajador_id, "trabajador")?;

    let reason = dto
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty() && status == TrabajadorStatus::Rejected);

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let trabajador = db
        .collection::<Trabajador>(TRABAJADORES)
        .find_one_and_update(
            doc! { "_id": object_id },
            doc! {
                "$set": {
                    "status": status.as_str(),
                    "rejectionReason": reason,
                    "updatedAt": DateTime::now()
                }
            },
            options,
        )
        .await
        .map_err(|e| ApiError::database("Failed to update trabajador", e))?
        .ok_or_else(|| ApiError::not_found("Trabajador not found"))?;

    info!(
        "Trabajador {} marked {} by admin {}",
        object_id,
        status.as_str(),
        admin.auth.user_id
    );

    TwilioService::notify(
        db,
        &trabajador.telefono,
        &status_notification(status, &trabajador.nombre, reason),
        None,
        None,
    )
    .await;

    Ok(Json(ApiResponse::success_with_message(
        format!("Trabajador {}", status.as_str()),
        TrabajadorResponse::from(trabajador),
    )))
}
