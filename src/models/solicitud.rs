use mongodb::bson::{oid::ObjectId, Bson, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use std::fmt;

/// Lifecycle of a service request. Any estado may follow any other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SolicitudEstado {
    Pendiente,
    Confirmada,
    Rechazada,
    EnProgreso,
    Completada,
}

impl SolicitudEstado {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolicitudEstado::Pendiente => "pendiente",
            SolicitudEstado::Confirmada => "confirmada",
            SolicitudEstado::Rechazada => "rechazada",
            SolicitudEstado::EnProgreso => "en_progreso",
            SolicitudEstado::Completada => "completada",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pendiente" => Some(SolicitudEstado::Pendiente),
            "confirmada" => Some(SolicitudEstado::Confirmada),
            "rechazada" => Some(SolicitudEstado::Rechazada),
            "en_progreso" => Some(SolicitudEstado::EnProgreso),
            "completada" => Some(SolicitudEstado::Completada),
            _ => None,
        }
    }
}

impl fmt::Display for SolicitudEstado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SolicitudEstado> for Bson {
    fn from(estado: SolicitudEstado) -> Self {
        Bson::String(estado.as_str().to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Solicitud {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub descripcion: String,
    /// `YYYY-MM-DD`
    pub fecha: String,
    /// `HH:MM`
    pub hora: String,
    pub trabajador_id: ObjectId,
    pub usuario_id: ObjectId,
    pub estado: SolicitudEstado,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSolicitudDto {
    pub trabajador_id: String,
    pub descripcion: String,
    pub fecha: String,
    pub hora: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateEstadoDto {
    pub estado: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolicitudResponse {
    pub id: String,
    pub descripcion: String,
    pub fecha: String,
    pub hora: String,
    pub trabajador_id: String,
    pub usuario_id: String,
    pub estado: SolicitudEstado,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Solicitud> for SolicitudResponse {
    fn from(s: Solicitud) -> Self {
        SolicitudResponse {
            id: s.id.map(|id| id.to_hex()).unwrap_or_default(),
            descripcion: s.descripcion,
            fecha: s.fecha,
            hora: s.hora,
            trabajador_id: s.trabajador_id.to_hex(),
            usuario_id: s.usuario_id.to_hex(),
            estado: s.estado,
            created_at: s.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: s.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn estado_uses_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&SolicitudEstado::EnProgreso).unwrap(),
            "\"en_progreso\""
        );
        assert_eq!(
            bson::to_bson(&SolicitudEstado::Completada).unwrap(),
            Bson::from(SolicitudEstado::Completada)
        );
    }

    #[test]
    fn estado_parse_matches_as_str() {
        for estado in [
            SolicitudEstado::Pendiente,
            SolicitudEstado::Confirmada,
            SolicitudEstado::Rechazada,
            SolicitudEstado::EnProgreso,
            SolicitudEstado::Completada,
        ] {
            assert_eq!(SolicitudEstado::parse(estado.as_str()), Some(estado));
        }
        assert_eq!(SolicitudEstado::parse("cancelada"), None);
    }
}
