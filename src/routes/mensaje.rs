use mongodb::bson::{doc, DateTime};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::db::{DbConn, MENSAJES};
use crate::guards::AuthGuard;
use crate::models::{CreateMensajeDto, Mensaje, MensajeResponse, Remitente};
use crate::routes::solicitud::find_owned_solicitud;
use crate::utils::{ApiError, ApiResponse, Page};

const MAX_CONTENIDO: usize = 2000;

#[openapi(tag = "Mensaje")]
#[post("/solicitudes/<solicitud_id>/mensajes", data = "<dto>")]
pub async fn create_mensaje(
    db: &State<DbConn>,
    auth: AuthGuard,
    solicitud_id: String,
    dto: Json<CreateMensajeDto>,
) -> Result<Json<ApiResponse<MensajeResponse>>, ApiError> {
    let contenido = dto.contenido.trim();
    if contenido.is_empty() {
        return Err(ApiError::bad_request("Contenido is required"));
    }
    if contenido.chars().count() > MAX_CONTENIDO {
        return Err(ApiError::bad_request("Contenido is too long"));
    }

    let solicitud = find_owned_solicitud(db, &auth, &solicitud_id).await?;
    let Some(id) = solicitud.id else {
        return Err(ApiError::internal_error("Solicitud without ID"));
    };

    let mut mensaje = Mensaje {
        id: None,
        solicitud_id: id,
        usuario_id: solicitud.usuario_id,
        trabajador_id: solicitud.trabajador_id,
        remitente: Remitente::Usuario,
        contenido: contenido.to_string(),
        leido: false,
        created_at: DateTime::now(),
    };

    let result = db
        .collection::<Mensaje>(MENSAJES)
        .insert_one(&mensaje, None)
        .await
        .map_err(|e| ApiError::database("Failed to create mensaje", e))?;
    mensaje.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Mensaje sent",
        MensajeResponse::from(mensaje),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct MensajeListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Mensaje")]
#[get("/solicitudes/<solicitud_id>/mensajes?<query..>")]
pub async fn list_mensajes(
    db: &State<DbConn>,
    auth: AuthGuard,
    solicitud_id: String,
    query: MensajeListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = Page::new(query.page, query.limit);
    let solicitud = find_owned_solicitud(db, &auth, &solicitud_id).await?;

    let filter = doc! { "solicitudId": solicitud.id };
    let find_options = FindOptions::builder()
        .skip(page.skip())
        .limit(page.limit)
        .sort(doc! { "createdAt": 1 })
        .build();

    let collection = db.collection::<Mensaje>(MENSAJES);
    let mensajes: Vec<MensajeResponse> = collection
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::database("Failed to list mensajes", e))?
        .map_ok(MensajeResponse::from)
        .try_collect()
        .await
        .map_err(|e| ApiError::database("Failed to read mensajes", e))?;

    let total = collection
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::database("Failed to count mensajes", e))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "mensajes": mensajes,
        "pagination": page.info(total),
    }))))
}
