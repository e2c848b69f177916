use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrabajadorStatus {
    Pending,
    Approved,
    Rejected,
}

impl TrabajadorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrabajadorStatus::Pending => "pending",
            TrabajadorStatus::Approved => "approved",
            TrabajadorStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(TrabajadorStatus::Pending),
            "approved" => Some(TrabajadorStatus::Approved),
            "rejected" => Some(TrabajadorStatus::Rejected),
            _ => None,
        }
    }
}

/// A service provider. Only `approved` workers are visible to clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Trabajador {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub telefono: String,
    pub occupation: String,
    pub hourly_rate: f64,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub status: TrabajadorStatus,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: i32,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrabajadorStatusDto {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrabajadorResponse {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub telefono: String,
    pub occupation: String,
    pub hourly_rate: f64,
    pub descripcion: Option<String>,
    pub status: String,
    pub average_rating: Option<f64>,
    pub total_reviews: i32,
    pub rejection_reason: Option<String>,
    pub created_at: String,
}

impl From<Trabajador> for TrabajadorResponse {
    fn from(t: Trabajador) -> Self {
        TrabajadorResponse {
            id: t.id.map(|id| id.to_hex()).unwrap_or_default(),
            nombre: t.nombre,
            apellido: t.apellido,
            email: t.email,
            telefono: t.telefono,
            occupation: t.occupation,
            hourly_rate: t.hourly_rate,
            descripcion: t.descripcion,
            status: t.status.as_str().to_string(),
            average_rating: t.average_rating,
            total_reviews: t.total_reviews,
            rejection_reason: t.rejection_reason,
            created_at: t.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

/// Client-facing view of an approved worker, without contact details.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrabajadorPublicResponse {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub occupation: String,
    pub hourly_rate: f64,
    pub descripcion: Option<String>,
    pub average_rating: Option<f64>,
    pub total_reviews: i32,
}

impl From<Trabajador> for TrabajadorPublicResponse {
    fn from(t: Trabajador) -> Self {
        TrabajadorPublicResponse {
            id: t.id.map(|id| id.to_hex()).unwrap_or_default(),
            nombre: t.nombre,
            apellido: t.apellido,
            occupation: t.occupation,
            hourly_rate: t.hourly_rate,
            descripcion: t.descripcion,
            average_rating: t.average_rating,
            total_reviews: t.total_reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(TrabajadorStatus::parse("Approved"), Some(TrabajadorStatus::Approved));
        assert_eq!(TrabajadorStatus::parse(" rejected "), Some(TrabajadorStatus::Rejected));
        assert_eq!(TrabajadorStatus::parse("banned"), None);
    }

    #[test]
    fn reads_documents_without_rating_fields() {
        let id = ObjectId::new();
        let document = doc! {
            "_id": id,
            "nombre": "Ana",
            "apellido": "Pérez",
            "email": "ana@example.com",
            "telefono": "+5491122334455",
            "occupation": "plomera",
            "hourlyRate": 3500.0,
            "status": "pending",
            "createdAt": DateTime::now(),
            "updatedAt": DateTime::now(),
        };

        let trabajador: Trabajador = bson::from_document(document).unwrap();
        assert_eq!(trabajador.status, TrabajadorStatus::Pending);
        assert_eq!(trabajador.average_rating, None);
        assert_eq!(trabajador.total_reviews, 0);

        let response = TrabajadorResponse::from(trabajador);
        assert_eq!(response.id, id.to_hex());
        assert_eq!(response.status, "pending");
    }

    #[test]
    fn public_view_hides_contact_details() {
        let trabajador = Trabajador {
            id: Some(ObjectId::new()),
            nombre: "Luis".to_string(),
            apellido: "Gómez".to_string(),
            email: "luis@example.com".to_string(),
            telefono: "+5491199887766".to_string(),
            occupation: "electricista".to_string(),
            hourly_rate: 4000.0,
            descripcion: None,
            status: TrabajadorStatus::Approved,
            average_rating: Some(4.5),
            total_reviews: 2,
            rejection_reason: Some("old note".to_string()),
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        let json = serde_json::to_value(TrabajadorPublicResponse::from(trabajador)).unwrap();
        let fields = json.as_object().unwrap();
        assert!(!fields.contains_key("email"));
        assert!(!fields.contains_key("telefono"));
        assert!(!fields.contains_key("rejectionReason"));
        assert_eq!(json["averageRating"], 4.5);
        assert_eq!(json["occupation"], "electricista");
    }
}
