//! Keyword replies a worker can send over WhatsApp, and the texts exchanged
//! with workers and clients around a solicitud.

use crate::models::{Solicitud, SolicitudEstado, TrabajadorStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhatsAppCommand {
    Confirmar,
    Rechazar,
    Llegue,
    Finalizado,
}

impl WhatsAppCommand {
    /// Reads the first word of a reply. Case, accents and punctuation are ignored.
    pub fn parse(body: &str) -> Option<Self> {
        let word = body.split_whitespace().next()?;
        let word: String = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_uppercase()
            .chars()
            .map(strip_accent)
            .collect();

        match word.as_str() {
            "CONFIRMAR" => Some(WhatsAppCommand::Confirmar),
            "RECHAZAR" => Some(WhatsAppCommand::Rechazar),
            "LLEGUE" => Some(WhatsAppCommand::Llegue),
            "FINALIZADO" => Some(WhatsAppCommand::Finalizado),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            WhatsAppCommand::Confirmar => "CONFIRMAR",
            WhatsAppCommand::Rechazar => "RECHAZAR",
            WhatsAppCommand::Llegue => "LLEGUE",
            WhatsAppCommand::Finalizado => "FINALIZADO",
        }
    }

    pub fn target_estado(&self) -> SolicitudEstado {
        match self {
            WhatsAppCommand::Confirmar => SolicitudEstado::Confirmada,
            WhatsAppCommand::Rechazar => SolicitudEstado::Rechazada,
            WhatsAppCommand::Llegue => SolicitudEstado::EnProgreso,
            WhatsAppCommand::Finalizado => SolicitudEstado::Completada,
        }
    }

    /// Reply sent back to the worker once the estado is stored.
    pub fn acknowledgement(&self) -> &'static str {
        match self {
            WhatsAppCommand::Confirmar => {
                "¡Listo! Confirmaste la solicitud. Le avisamos al cliente. Cuando llegues, responde LLEGUE."
            }
            WhatsAppCommand::Rechazar => {
                "Rechazaste la solicitud. Le avisamos al cliente."
            }
            WhatsAppCommand::Llegue => {
                "Registramos tu llegada. Cuando termines el trabajo, responde FINALIZADO."
            }
            WhatsAppCommand::Finalizado => {
                "¡Gracias! Marcamos el trabajo como finalizado."
            }
        }
    }
}

fn strip_accent(c: char) -> char {
    match c {
        'Á' | 'À' => 'A',
        'É' | 'È' => 'E',
        'Í' | 'Ì' => 'I',
        'Ó' | 'Ò' => 'O',
        'Ú' | 'Ù' | 'Ü' => 'U',
        other => other,
    }
}

pub const HELP_TEXT: &str = "No entendimos tu respuesta. Responde CONFIRMAR para aceptar, \
RECHAZAR para declinar, LLEGUE cuando estés en el lugar o FINALIZADO al terminar.";

pub const NO_SOLICITUD_TEXT: &str =
    "No encontramos una solicitud activa asociada a este número.";

/// First message to the worker about a new solicitud.
pub fn nueva_solicitud_text(solicitud: &Solicitud, cliente: &str) -> String {
    format!(
        "Nueva solicitud de {}:\n{}\nFecha: {} a las {}\n\n\
         Responde CONFIRMAR para aceptar o RECHAZAR para declinar.",
        cliente, solicitud.descripcion, solicitud.fecha, solicitud.hora
    )
}

/// Notice to the client after the worker changed the estado.
pub fn cliente_notification(estado: SolicitudEstado, trabajador: &str, solicitud: &Solicitud) -> String {
    match estado {
        SolicitudEstado::Confirmada => format!(
            "{} confirmó tu solicitud para el {} a las {}.",
            trabajador, solicitud.fecha, solicitud.hora
        ),
        SolicitudEstado::Rechazada => format!(
            "{} no puede tomar tu solicitud del {}. Puedes elegir otro trabajador.",
            trabajador, solicitud.fecha
        ),
        SolicitudEstado::EnProgreso => format!("{} llegó y comenzó el trabajo.", trabajador),
        SolicitudEstado::Completada => format!(
            "{} finalizó el trabajo. ¡No olvides dejar tu reseña!",
            trabajador
        ),
        SolicitudEstado::Pendiente => format!(
            "Tu solicitud con {} volvió a estar pendiente.",
            trabajador
        ),
    }
}

/// Notice to the worker when the client changed the estado from the app.
pub fn trabajador_notification(estado: SolicitudEstado, solicitud: &Solicitud) -> String {
    format!(
        "La solicitud del {} a las {} ahora está: {}.",
        solicitud.fecha,
        solicitud.hora,
        estado.as_str().replace('_', " ")
    )
}

/// Notice to the worker after an admin decision.
pub fn status_notification(status: TrabajadorStatus, nombre: &str, reason: Option<&str>) -> String {
    match status {
        TrabajadorStatus::Approved => format!(
            "¡Hola {}! Tu perfil fue aprobado. Ya puedes recibir solicitudes por este medio.",
            nombre
        ),
        TrabajadorStatus::Rejected => match reason {
            Some(reason) => format!("Hola {}, tu postulación fue rechazada: {}", nombre, reason),
            None => format!("Hola {}, tu postulación fue rechazada.", nombre),
        },
        TrabajadorStatus::Pending => format!("Hola {}, tu postulación está en revisión.", nombre),
    }
}
