use log::{info, warn};
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::db::{DbConn, SOLICITUDES, TRABAJADORES, USUARIOS};
use crate::guards::AuthGuard;
use crate::models::{
    CreateSolicitudDto, Solicitud, SolicitudEstado, SolicitudResponse, Trabajador,
    TrabajadorStatus, UpdateEstadoDto, Usuario,
};
use crate::services::whatsapp::{nueva_solicitud_text, trabajador_notification};
use crate::services::TwilioService;
use crate::services::jwt::Role;
use crate::utils::{
    parse_object_id, validate_fecha, validate_hora, ApiError, ApiResponse, Page,
};

const MAX_DESCRIPCION: usize = 1000;

/// Loads a solicitud the caller may see: their own, or any for admins.
pub(crate) async fn find_owned_solicitud(
    db: &DbConn,
    auth: &AuthGuard,
    solicitud_id: &str,
) -> Result<Solicitud, ApiError> {
    let object_id = parse_object_id(solicitud_id, "solicitud")?;

    let mut filter = doc! { "_id": object_id };
    if auth.role != Role::Admin {
        filter.insert("usuarioId", auth.user_id);
    }

    db.collection::<Solicitud>(SOLICITUDES)
        .find_one(filter, None)
        .await
        .map_err(|e| ApiError::database("Failed to load solicitud", e))?
        .ok_or_else(|| ApiError::not_found("Solicitud not found"))
}

fn validate_create(dto: &CreateSolicitudDto) -> Result<ObjectId, ApiError> {
    let trabajador_id = parse_object_id(&dto.trabajador_id, "trabajador")?;

    let descripcion = dto.descripcion.trim();
    if descripcion.is_empty() {
        return Err(ApiError::bad_request("Descripcion is required"));
    }
    if descripcion.chars().count() > MAX_DESCRIPCION {
        return Err(ApiError::bad_request("Descripcion is too long"));
    }
    if !validate_fecha(&dto.fecha) {
        return Err(ApiError::bad_request("Fecha must be YYYY-MM-DD"));
    }
    if !validate_hora(&dto.hora) {
        return Err(ApiError::bad_request("Hora must be HH:MM"));
    }

    Ok(trabajador_id)
}

#[openapi(tag = "Solicitud")]
#[post("/solicitudes", data = "<dto>")]
pub async fn create_solicitud(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<CreateSolicitudDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let trabajador_id = validate_create(&dto)?;

    let trabajador = db
        .collection::<Trabajador>(TRABAJADORES)
        .find_one(doc! { "_id": trabajador_id }, None)
        .await
        .map_err(|e| ApiError::database("Failed to load trabajador", e))?
        .ok_or_else(|| ApiError::not_found("Trabajador not found"))?;

    if trabajador.status != TrabajadorStatus::Approved {
        return Err(ApiError::bad_request("Trabajador is not approved"));
    }

    let now = DateTime::now();
    let mut solicitud = Solicitud {
        id: None,
        descripcion: dto.descripcion.trim().to_string(),
        fecha: dto.fecha.clone(),
        hora: dto.hora.clone(),
        trabajador_id,
        usuario_id: auth.user_id,
        estado: SolicitudEstado::Pendiente,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Solicitud>(SOLICITUDES)
        .insert_one(&solicitud, None)
        .await
        .map_err(|e| ApiError::database("Failed to create solicitud", e))?;

    solicitud.id = result.inserted_id.as_object_id();
    info!(
        "Solicitud {:?} created by {} for trabajador {}",
        solicitud.id, auth.email, trabajador_id
    );

    let cliente = db
        .collection::<Usuario>(USUARIOS)
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .ok()
        .flatten()
        .map(|u| u.nombre)
        .unwrap_or_else(|| "un cliente".to_string());

    let whatsapp_sent = TwilioService::notify(
        db,
        &trabajador.telefono,
        &nueva_solicitud_text(&solicitud, &cliente),
        solicitud.id,
        Some(trabajador_id),
    )
    .await;

    Ok(Json(ApiResponse::success_with_message(
        "Solicitud created successfully",
        serde_json::json!({
            "solicitud": SolicitudResponse::from(solicitud),
            "whatsappSent": whatsapp_sent,
        }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct SolicitudListQuery {
    pub estado: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Solicitud")]
#[get("/solicitudes?<query..>")]
pub async fn list_solicitudes(
    db: &State<DbConn>,
    auth: AuthGuard,
    query: SolicitudListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = Page::new(query.page, query.limit);

    let mut filter = doc! { "usuarioId": auth.user_id };
    if let Some(estado) = query.estado.as_deref() {
        let estado = SolicitudEstado::parse(estado)
            .ok_or_else(|| ApiError::bad_request("Invalid estado"))?;
        filter.insert("estado", estado);
    }

    let find_options = FindOptions::builder()
        .skip(page.skip())
        .limit(page.limit)
        .sort(doc! { "createdAt": -1 })
        .build();

    let collection = db.collection::<Solicitud>(SOLICITUDES);
    let solicitudes: Vec<SolicitudResponse> = collection
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::database("Failed to list solicitudes", e))?
        .map_ok(SolicitudResponse::from)
        .try_collect()
        .await
        .map_err(|e| ApiError::database("Failed to read solicitudes", e))?;

    let total = collection
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::database("Failed to count solicitudes", e))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "solicitudes": solicitudes,
        "pagination": page.info(total),
    }))))
}

#[openapi(tag = "Solicitud")]
#[get("/solicitudes/<solicitud_id>")]
pub async fn get_solicitud(
    db: &State<DbConn>,
    auth: AuthGuard,
    solicitud_id: String,
) -> Result<Json<ApiResponse<SolicitudResponse>>, ApiError> {
    let solicitud = find_owned_solicitud(db, &auth, &solicitud_id).await?;
    Ok(Json(ApiResponse::success(SolicitudResponse::from(solicitud))))
}

/// Sets any estado; there is no transition check. The worker is told over WhatsApp.
#[openapi(tag = "Solicitud")]
#[put("/solicitudes/<solicitud_id>/estado", data = "<dto>")]
pub async fn update_estado(
    db: &State<DbConn>,
    auth: AuthGuard,
    solicitud_id: String,
    dto: Json<UpdateEstadoDto>,
) -> Result<Json<ApiResponse<SolicitudResponse>>, ApiError> {
    let estado = SolicitudEstado::parse(&dto.estado)
        .ok_or_else(|| ApiError::bad_request("Invalid estado"))?;
    let current = find_owned_solicitud(db, &auth, &solicitud_id).await?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let solicitud = db
        .collection::<Solicitud>(SOLICITUDES)
        .find_one_and_update(
            doc! { "_id": current.id },
            doc! { "$set": { "estado": estado, "updatedAt": DateTime::now() } },
            options,
        )
        .await
        .map_err(|e| ApiError::database("Failed to update solicitud", e))?
        .ok_or_else(|| ApiError::not_found("Solicitud not found"))?;

    match db
        .collection::<Trabajador>(TRABAJADORES)
        .find_one(doc! { "_id": solicitud.trabajador_id }, None)
        .await
    {
        Ok(Some(trabajador)) => {
            TwilioService::notify(
                db,
                &trabajador.telefono,
                &trabajador_notification(estado, &solicitud),
                solicitud.id,
                trabajador.id,
            )
            .await;
        }
        Ok(None) => warn!("Trabajador {} not found, skipping notification", solicitud.trabajador_id),
        Err(e) => warn!("Failed to load trabajador {}: {}", solicitud.trabajador_id, e),
    }

    Ok(Json(ApiResponse::success_with_message(
        "Estado updated successfully",
        SolicitudResponse::from(solicitud),
    )))
}
