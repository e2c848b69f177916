use std::io::Cursor;

use log::{error, info, warn};
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOneOptions, ReturnDocument};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder, Response};
use rocket::{Request, State};
use rocket_okapi::openapi;

use crate::config::Config;
use crate::db::{DbConn, SOLICITUDES, TRABAJADORES, USUARIOS, WHATSAPP_MESSAGES};
use crate::guards::TwilioSignature;
use crate::models::{
    Direccion, InboundWhatsApp, Solicitud, SolicitudEstado, Trabajador, Usuario, WhatsAppMessage,
};
use crate::services::twilio::{parse_form_body, twiml_message, validate_signature};
use crate::services::whatsapp::{cliente_notification, HELP_TEXT, NO_SOLICITUD_TEXT};
use crate::services::{TwilioService, WhatsAppCommand};
use crate::utils::{normalize_phone, ApiError};

/// TwiML document answered to Twilio.
pub struct TwiML(pub String);

impl<'r> Responder<'r, 'static> for TwiML {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .status(Status::Ok)
            .header(ContentType::XML)
            .sized_body(self.0.len(), Cursor::new(self.0))
            .ok()
    }
}

/// Inbound WhatsApp replies from workers, delivered by Twilio.
#[openapi(skip)]
#[post("/whatsapp/webhook", format = "form", data = "<body>")]
pub async fn whatsapp_webhook(
    db: &State<DbConn>,
    signature: TwilioSignature,
    body: String,
) -> Result<TwiML, ApiError> {
    let params = parse_form_body(&body);

    if let Some(settings) = Config::twilio() {
        if let Some(url) = settings.webhook_url.as_deref() {
            let valid = signature
                .0
                .as_deref()
                .is_some_and(|sig| validate_signature(&settings.auth_token, url, &params, sig));
            if !valid {
                warn!("Rejected WhatsApp webhook with invalid signature");
                return Err(ApiError::forbidden("Invalid Twilio signature"));
            }
        }
    }

    let inbound = InboundWhatsApp::from_params(&params)
        .ok_or_else(|| ApiError::bad_request("Missing sender"))?;

    let reply = handle_reply(db, &inbound).await?;
    Ok(TwiML(twiml_message(&reply)))
}

/// Outcome of an inbound reply, before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    NoSolicitud,
    Help,
    Transition(ObjectId, WhatsAppCommand),
}

/// Only rows tied to both a solicitud and a worker count as worker history.
fn decide(last: Option<&WhatsAppMessage>, body: &str) -> Reply {
    let Some(solicitud_id) = last
        .filter(|m| m.trabajador_id.is_some())
        .and_then(|m| m.solicitud_id)
    else {
        return Reply::NoSolicitud;
    };

    match WhatsAppCommand::parse(body) {
        Some(command) => Reply::Transition(solicitud_id, command),
        None => Reply::Help,
    }
}

async fn handle_reply(db: &DbConn, inbound: &InboundWhatsApp) -> Result<String, ApiError> {
    let telefono = normalize_phone(&inbound.from);

    let last = last_worker_message(db, &telefono).await?;
    log_inbound(db, &telefono, inbound, last.as_ref()).await;

    let (solicitud_id, command) = match decide(last.as_ref(), &inbound.body) {
        Reply::NoSolicitud => {
            info!("WhatsApp reply from {} has no associated solicitud", telefono);
            return Ok(NO_SOLICITUD_TEXT.to_string());
        }
        Reply::Help => return Ok(HELP_TEXT.to_string()),
        Reply::Transition(solicitud_id, command) => (solicitud_id, command),
    };

    let estado = command.target_estado();
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let solicitud = db
        .collection::<Solicitud>(SOLICITUDES)
        .find_one_and_update(
            doc! { "_id": solicitud_id },
            doc! { "$set": { "estado": estado, "updatedAt": DateTime::now() } },
            options,
        )
        .await
        .map_err(|e| ApiError::database("Failed to update solicitud", e))?;

    let Some(solicitud) = solicitud else {
        warn!("Solicitud {} referenced by {} no longer exists", solicitud_id, telefono);
        return Ok(NO_SOLICITUD_TEXT.to_string());
    };

    info!(
        "Solicitud {} set to {} by {} via WhatsApp",
        solicitud_id,
        estado,
        command.keyword()
    );

    notify_cliente(db, &solicitud, estado).await;

    Ok(command.acknowledgement().to_string())
}

fn worker_history_filter(telefono: &str) -> Document {
    doc! {
        "telefono": telefono,
        "solicitudId": { "$ne": Bson::Null },
        "trabajadorId": { "$ne": Bson::Null },
    }
}

/// Most recent message exchanged with this number as a worker of some solicitud.
async fn last_worker_message(
    db: &DbConn,
    telefono: &str,
) -> Result<Option<WhatsAppMessage>, ApiError> {
    let options = FindOneOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .build();

    db.collection::<WhatsAppMessage>(WHATSAPP_MESSAGES)
        .find_one(worker_history_filter(telefono), options)
        .await
        .map_err(|e| ApiError::database("Failed to look up WhatsApp history", e))
}

async fn log_inbound(
    db: &DbConn,
    telefono: &str,
    inbound: &InboundWhatsApp,
    last: Option<&WhatsAppMessage>,
) {
    let row = WhatsAppMessage {
        id: None,
        telefono: telefono.to_string(),
        mensaje: inbound.body.clone(),
        solicitud_id: last.and_then(|m| m.solicitud_id),
        trabajador_id: last.and_then(|m| m.trabajador_id),
        direccion: Direccion::Entrante,
        twilio_sid: inbound.message_sid.clone(),
        created_at: DateTime::now(),
    };

    if let Err(e) = db
        .collection::<WhatsAppMessage>(WHATSAPP_MESSAGES)
        .insert_one(&row, None)
        .await
    {
        error!("Failed to log inbound WhatsApp message: {}", e);
    }
}

/// Tells the client about the new estado. Logged without `trabajadorId` so the
/// client's own replies are never taken as worker commands.
async fn notify_cliente(db: &DbConn, solicitud: &Solicitud, estado: SolicitudEstado) {
    let usuario = match db
        .collection::<Usuario>(USUARIOS)
        .find_one(doc! { "_id": solicitud.usuario_id }, None)
        .await
    {
        Ok(Some(usuario)) => usuario,
        Ok(None) => {
            warn!("Usuario {} not found, skipping notification", solicitud.usuario_id);
            return;
        }
        Err(e) => {
            error!("Failed to load usuario {}: {}", solicitud.usuario_id, e);
            return;
        }
    };

    let Some(telefono) = usuario.telefono.as_deref() else {
        return;
    };

    let trabajador_nombre = db
        .collection::<Trabajador>(TRABAJADORES)
        .find_one(doc! { "_id": solicitud.trabajador_id }, None)
        .await
        .ok()
        .flatten()
        .map(|t| t.nombre)
        .unwrap_or_else(|| "Tu trabajador".to_string());

    let text = cliente_notification(estado, &trabajador_nombre, solicitud);
    TwilioService::notify(db, telefono, &text, solicitud.id, None).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(solicitud_id: Option<ObjectId>, trabajador_id: Option<ObjectId>) -> WhatsAppMessage {
        WhatsAppMessage {
            id: Some(ObjectId::new()),
            telefono: "+5491122334455".to_string(),
            mensaje: "Nueva solicitud".to_string(),
            solicitud_id,
            trabajador_id,
            direccion: Direccion::Saliente,
            twilio_sid: Some("SM1".to_string()),
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn keywords_move_the_solicitud() {
        let solicitud_id = ObjectId::new();
        let last = row(Some(solicitud_id), Some(ObjectId::new()));

        assert_eq!(
            decide(Some(&last), "confirmar"),
            Reply::Transition(solicitud_id, WhatsAppCommand::Confirmar)
        );
        assert_eq!(
            decide(Some(&last), "¡Llegué!"),
            Reply::Transition(solicitud_id, WhatsAppCommand::Llegue)
        );

        let Reply::Transition(_, command) = decide(Some(&last), "RECHAZAR") else {
            panic!("expected a transition");
        };
        assert_eq!(command.target_estado(), SolicitudEstado::Rechazada);
    }

    #[test]
    fn finalizado_is_accepted_without_prior_steps() {
        // The row was logged when the solicitud was still pendiente.
        let solicitud_id = ObjectId::new();
        let last = row(Some(solicitud_id), Some(ObjectId::new()));

        let reply = decide(Some(&last), "FINALIZADO");
        assert_eq!(reply, Reply::Transition(solicitud_id, WhatsAppCommand::Finalizado));

        let Reply::Transition(_, command) = reply else {
            panic!("expected a transition");
        };
        assert_eq!(command.target_estado(), SolicitudEstado::Completada);
    }

    #[test]
    fn unknown_text_gets_help() {
        let last = row(Some(ObjectId::new()), Some(ObjectId::new()));
        assert_eq!(decide(Some(&last), "hola, a qué hora?"), Reply::Help);
        assert_eq!(decide(Some(&last), ""), Reply::Help);
    }

    #[test]
    fn no_history_means_no_solicitud() {
        assert_eq!(decide(None, "CONFIRMAR"), Reply::NoSolicitud);
        assert_eq!(decide(None, "hola"), Reply::NoSolicitud);

        let unlinked = row(None, Some(ObjectId::new()));
        assert_eq!(decide(Some(&unlinked), "CONFIRMAR"), Reply::NoSolicitud);
    }

    #[test]
    fn client_rows_are_not_worker_commands() {
        let cliente_row = row(Some(ObjectId::new()), None);
        assert_eq!(decide(Some(&cliente_row), "CONFIRMAR"), Reply::NoSolicitud);

        let filter = worker_history_filter("+5491122334455");
        assert_eq!(filter.get_str("telefono").unwrap(), "+5491122334455");
        assert_eq!(
            filter.get_document("trabajadorId").unwrap(),
            &doc! { "$ne": Bson::Null }
        );
        assert_eq!(
            filter.get_document("solicitudId").unwrap(),
            &doc! { "$ne": Bson::Null }
        );
    }
}
