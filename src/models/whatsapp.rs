use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direccion {
    Entrante,
    Saliente,
}

/// Log row for every WhatsApp message sent or received.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub telefono: String,
    pub mensaje: String,
    pub solicitud_id: Option<ObjectId>,
    pub trabajador_id: Option<ObjectId>,
    pub direccion: Direccion,
    pub twilio_sid: Option<String>,
    pub created_at: DateTime,
}

/// Fields of the Twilio inbound-message callback this service reads.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundWhatsApp {
    pub from: String,
    pub body: String,
    pub message_sid: Option<String>,
}

impl InboundWhatsApp {
    /// `None` when the sender is missing or blank.
    pub fn from_params(params: &BTreeMap<String, String>) -> Option<Self> {
        let from = params.get("From").map(|f| f.trim()).filter(|f| !f.is_empty())?;

        Some(InboundWhatsApp {
            from: from.to_string(),
            body: params.get("Body").cloned().unwrap_or_default(),
            message_sid: params.get("MessageSid").cloned(),
        })
    }
}
