use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use serde::Deserialize;
use std::env;

/// Credentials for the Twilio WhatsApp sender.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, with or without the `whatsapp:` prefix.
    pub whatsapp_from: String,
    /// Public URL Twilio posts to; required for signature validation.
    pub webhook_url: Option<String>,
}

pub struct Config;

impl Config {
    fn figment() -> Figment {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(&profile)
            .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
    }

    pub fn mongodb_database() -> String {
        Self::figment()
            .extract_inner("mongodb_database")
            .unwrap_or_else(|_| "servicios".to_string())
    }

    pub fn is_development() -> bool {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
        profile == "development"
    }

    pub fn twilio() -> Option<TwilioSettings> {
        Self::twilio_from(&Self::figment())
    }

    pub fn is_twilio_enabled() -> bool {
        Self::twilio().is_some()
    }

    fn twilio_from(figment: &Figment) -> Option<TwilioSettings> {
        let account_sid = non_empty(figment, "twilio_account_sid")?;
        let auth_token = non_empty(figment, "twilio_auth_token")?;
        let whatsapp_from = non_empty(figment, "twilio_whatsapp_from")?;

        Some(TwilioSettings {
            account_sid,
            auth_token,
            whatsapp_from,
            webhook_url: non_empty(figment, "twilio_webhook_url"),
        })
    }
}

fn non_empty(figment: &Figment, key: &str) -> Option<String> {
    figment
        .extract_inner::<String>(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::Serialized;
    use serde_json::json;

    #[test]
    fn twilio_requires_sid_token_and_sender() {
        let figment = Figment::from(Serialized::defaults(json!({
            "twilio_account_sid": "AC123",
            "twilio_auth_token": "secret",
        })));
        assert_eq!(Config::twilio_from(&figment), None);

        let figment = figment.merge(Serialized::defaults(json!({
            "twilio_whatsapp_from": "whatsapp:+14155238886",
        })));
        let settings = Config::twilio_from(&figment).unwrap();
        assert_eq!(settings.account_sid, "AC123");
        assert_eq!(settings.whatsapp_from, "whatsapp:+14155238886");
        assert_eq!(settings.webhook_url, None);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let figment = Figment::from(Serialized::defaults(json!({
            "twilio_account_sid": "AC123",
            "twilio_auth_token": "   ",
            "twilio_whatsapp_from": "+14155238886",
        })));
        assert_eq!(Config::twilio_from(&figment), None);
    }

    #[test]
    fn webhook_url_is_optional() {
        let figment = Figment::from(Serialized::defaults(json!({
            "twilio_account_sid": "AC123",
            "twilio_auth_token": "secret",
            "twilio_whatsapp_from": "+14155238886",
            "twilio_webhook_url": "https://example.com/api/whatsapp/webhook",
        })));
        let settings = Config::twilio_from(&figment).unwrap();
        assert_eq!(
            settings.webhook_url.as_deref(),
            Some("https://example.com/api/whatsapp/webhook")
        );
    }
}
