use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Remitente {
    Usuario,
    Trabajador,
}

/// Free-text message scoped to a solicitud.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Mensaje {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub solicitud_id: ObjectId,
    pub usuario_id: ObjectId,
    pub trabajador_id: ObjectId,
    pub remitente: Remitente,
    pub contenido: String,
    #[serde(default)]
    pub leido: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateMensajeDto {
    pub contenido: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MensajeResponse {
    pub id: String,
    pub solicitud_id: String,
    pub remitente: Remitente,
    pub contenido: String,
    pub leido: bool,
    pub created_at: String,
}

impl From<Mensaje> for MensajeResponse {
    fn from(m: Mensaje) -> Self {
        MensajeResponse {
            id: m.id.map(|id| id.to_hex()).unwrap_or_default(),
            solicitud_id: m.solicitud_id.to_hex(),
            remitente: m.remitente,
            contenido: m.contenido,
            leido: m.leido,
            created_at: m.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}
