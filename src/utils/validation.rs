use chrono::{NaiveDate, NaiveTime};
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use std::sync::LazyLock;

use crate::utils::ApiError;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{7,14}$").unwrap());

/// E.164-style number, leading `+` optional.
pub fn validate_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// `YYYY-MM-DD`, must be a real calendar date.
pub fn validate_fecha(fecha: &str) -> bool {
    fecha.len() == 10 && NaiveDate::parse_from_str(fecha, "%Y-%m-%d").is_ok()
}

/// `HH:MM`, 24-hour clock.
pub fn validate_hora(hora: &str) -> bool {
    hora.len() == 5 && NaiveTime::parse_from_str(hora, "%H:%M").is_ok()
}

/// Strips the `whatsapp:` channel prefix, spaces and dashes, and makes the
/// leading `+` explicit so stored and inbound numbers compare equal.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_channel = trimmed.strip_prefix("whatsapp:").unwrap_or(trimmed);
    let compact: String = without_channel
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if compact.is_empty() || compact.starts_with('+') {
        compact
    } else {
        format!("+{}", compact)
    }
}

pub fn parse_object_id(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} ID", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phones() {
        assert!(validate_phone("+5491122334455"));
        assert!(validate_phone("14155238886"));
        assert!(!validate_phone("+0123"));
        assert!(!validate_phone("whatsapp:+5491122334455"));
    }

    #[test]
    fn fechas_must_exist() {
        assert!(validate_fecha("2024-02-29"));
        assert!(!validate_fecha("2023-02-29"));
        assert!(!validate_fecha("2024-2-9"));
        assert!(!validate_fecha("29/02/2024"));
    }

    #[test]
    fn horas_are_24h() {
        assert!(validate_hora("09:30"));
        assert!(validate_hora("23:59"));
        assert!(!validate_hora("24:00"));
        assert!(!validate_hora("9:30"));
    }

    #[test]
    fn normalizes_whatsapp_senders() {
        assert_eq!(normalize_phone("whatsapp:+54 9 11 2233-4455"), "+5491122334455");
        assert_eq!(normalize_phone(" +14155238886 "), "+14155238886");
        assert_eq!(normalize_phone("5491122334455"), "+5491122334455");
        assert_eq!(normalize_phone("  "), "");
    }

    #[test]
    fn object_ids() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "trabajador").unwrap(), id);

        let err = parse_object_id("nope", "trabajador").unwrap_err();
        assert_eq!(err.message, "Invalid trabajador ID");
    }
}
