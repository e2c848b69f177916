use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use data_encoding::BASE64;
use hmac::{Hmac, Mac};
use log::{error, info, warn};
use mongodb::bson::{oid::ObjectId, DateTime};
use reqwest::{Client, StatusCode};
use rocket::http::RawStr;
use serde::Deserialize;
use sha1::Sha1;

use crate::config::{Config, TwilioSettings};
use crate::db::{DbConn, WHATSAPP_MESSAGES};
use crate::models::{Direccion, WhatsAppMessage};

const TWILIO_BASE: &str = "https://api.twilio.com/2010-04-01";
const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 500;

static CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
});

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

pub struct TwilioService;

impl TwilioService {
    /// Sends a WhatsApp message and returns its SID.
    ///
    /// Returns `Ok(None)` without sending when Twilio is not configured.
    /// Network errors, 429 and 5xx responses are retried with exponential backoff.
    pub async fn send_whatsapp(to: &str, body: &str) -> Result<Option<String>, String> {
        let Some(settings) = Config::twilio() else {
            warn!("Twilio not configured. Skipping WhatsApp message to {}", to);
            return Ok(None);
        };

        Self::send_with(&settings, to, body).await.map(Some)
    }

    async fn send_with(settings: &TwilioSettings, to: &str, body: &str) -> Result<String, String> {
        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_BASE, settings.account_sid);
        let params = [
            ("From", whatsapp_address(&settings.whatsapp_from)),
            ("To", whatsapp_address(to)),
            ("Body", body.to_string()),
        ];

        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = CLIENT
                .post(&url)
                .basic_auth(&settings.account_sid, Some(&settings.auth_token))
                .form(&params)
                .send()
                .await;

            let retry_reason = match result {
                Ok(res) if res.status().is_success() => {
                    let resource: MessageResource = res
                        .json()
                        .await
                        .map_err(|e| format!("Invalid Twilio response: {}", e))?;
                    return Ok(resource.sid);
                }
                Ok(res) => {
                    let status = res.status();
                    let text = res.text().await.unwrap_or_default();
                    if !is_retryable(status) || attempt >= MAX_ATTEMPTS {
                        return Err(format!("Twilio returned {}: {}", status, text));
                    }
                    format!("status {}", status)
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(format!("Twilio request failed: {}", e));
                    }
                    e.to_string()
                }
            };

            let delay = backoff_delay(attempt);
            warn!(
                "Twilio send attempt {}/{} failed ({}), retrying in {:?}",
                attempt, MAX_ATTEMPTS, retry_reason, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Sends a message and records it in `whatsapp_messages`.
    ///
    /// Never fails the caller. Returns whether Twilio accepted the message;
    /// the row is logged even when Twilio is not configured.
    pub async fn notify(
        db: &DbConn,
        telefono: &str,
        body: &str,
        solicitud_id: Option<ObjectId>,
        trabajador_id: Option<ObjectId>,
    ) -> bool {
        let telefono = crate::utils::normalize_phone(telefono);
        if !crate::utils::validate_phone(&telefono) {
            warn!("Not sending WhatsApp message to invalid number {:?}", telefono);
            return false;
        }

        let twilio_sid = match Self::send_whatsapp(&telefono, body).await {
            Ok(sid) => sid,
            Err(e) => {
                error!("Failed to send WhatsApp message to {}: {}", telefono, e);
                return false;
            }
        };

        let sent = twilio_sid.is_some();
        if let Some(sid) = &twilio_sid {
            info!("WhatsApp message {} sent to {}", sid, telefono);
        }

        let row = WhatsAppMessage {
            id: None,
            telefono,
            mensaje: body.to_string(),
            solicitud_id,
            trabajador_id,
            direccion: Direccion::Saliente,
            twilio_sid,
            created_at: DateTime::now(),
        };

        if let Err(e) = db
            .collection::<WhatsAppMessage>(WHATSAPP_MESSAGES)
            .insert_one(&row, None)
            .await
        {
            error!("Failed to log outbound WhatsApp message: {}", e);
        }

        sent
    }
}

/// Prefixes the `whatsapp:` channel unless already present.
pub fn whatsapp_address(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with("whatsapp:") {
        phone.to_string()
    } else {
        format!("whatsapp:{}", phone)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// Decodes an `application/x-www-form-urlencoded` body into sorted pairs.
pub fn parse_form_body(body: &str) -> BTreeMap<String, String> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                RawStr::new(key).url_decode_lossy().into_owned(),
                RawStr::new(value).url_decode_lossy().into_owned(),
            )
        })
        .collect()
}

/// The string Twilio signs: the full URL followed by every parameter
/// name and value, sorted by name.
fn signature_payload(url: &str, params: &BTreeMap<String, String>) -> String {
    let mut payload = url.to_string();
    for (key, value) in params {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload
}

#[cfg(test)]
pub(crate) fn compute_signature(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(auth_token.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signature_payload(url, params).as_bytes());
    BASE64.encode(&mac.finalize().into_bytes())
}

/// Checks an `X-Twilio-Signature` header in constant time.
pub fn validate_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    signature: &str,
) -> bool {
    let Ok(expected) = BASE64.decode(signature.trim().as_bytes()) else {
        return false;
    };
    let Ok(mut mac) = <Hmac<Sha1> as Mac>::new_from_slice(auth_token.as_bytes()) else {
        return false;
    };
    mac.update(signature_payload(url, params).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Wraps a reply in a TwiML `<Message>`.
pub fn twiml_message(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>{}</Message></Response>"#,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/api/whatsapp/webhook";

    fn params() -> BTreeMap<String, String> {
        parse_form_body("From=whatsapp%3A%2B5491122334455&Body=Confirmar&MessageSid=SM123")
    }

    #[test]
    fn decodes_form_bodies() {
        let params = parse_form_body("From=whatsapp%3A%2B5491122334455&Body=Ya+llegu%C3%A9&&Empty");
        assert_eq!(params["From"], "whatsapp:+5491122334455");
        assert_eq!(params["Body"], "Ya llegué");
        assert_eq!(params["Empty"], "");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn payload_sorts_parameters_by_name() {
        assert_eq!(
            signature_payload(URL, &params()),
            format!("{}BodyConfirmarFromwhatsapp:+5491122334455MessageSidSM123", URL)
        );
    }

    #[test]
    fn accepts_matching_signature() {
        let signature = compute_signature("token", URL, &params());
        assert!(validate_signature("token", URL, &params(), &signature));
    }

    #[test]
    fn rejects_tampered_requests() {
        let signature = compute_signature("token", URL, &params());

        let mut tampered = params();
        tampered.insert("Body".to_string(), "RECHAZAR".to_string());
        assert!(!validate_signature("token", URL, &tampered, &signature));
        assert!(!validate_signature("other-token", URL, &params(), &signature));
        assert!(!validate_signature("token", "https://evil.example/", &params(), &signature));
        assert!(!validate_signature("token", URL, &params(), "not base64!"));
    }

    #[test]
    fn retries_only_throttling_and_server_errors() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn addresses_use_whatsapp_channel() {
        assert_eq!(whatsapp_address("+5491122334455"), "whatsapp:+5491122334455");
        assert_eq!(whatsapp_address("whatsapp:+14155238886"), "whatsapp:+14155238886");
    }

    #[test]
    fn twiml_escapes_text() {
        assert_eq!(
            twiml_message("A & <B>"),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>A &amp; &lt;B&gt;</Message></Response>"#
        );
    }
}
