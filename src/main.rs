#[macro_use]
extern crate rocket;

mod config;
mod db;
mod guards;
mod models;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod tests;

use dotenvy::dotenv;
use rocket::http::Status;
use rocket::serde::json::{json, Value};
use rocket::{Build, Request, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

/* ----------------------------- ERRORS ----------------------------- */

fn error_json(message: &str) -> Value {
    json!({
        "success": false,
        "error": message
    })
}

#[catch(400)]
fn bad_request() -> Value {
    error_json("Malformed request")
}

#[catch(401)]
fn unauthorized() -> Value {
    error_json("Missing or invalid bearer token")
}

#[catch(403)]
fn forbidden() -> Value {
    error_json("Forbidden")
}

#[catch(404)]
fn not_found(req: &Request) -> Value {
    error_json(&format!("Resource not found: {}", req.uri().path()))
}

#[catch(422)]
fn unprocessable() -> Value {
    error_json("Request body could not be parsed")
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Value {
    error_json(status.reason().unwrap_or("Internal server error"))
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

/// Routes and catchers, without the database fairing.
fn app() -> Rocket<Build> {
    rocket::build()
        .mount(
            "/api",
            openapi_get_routes![
                routes::health::health,
                // WhatsApp
                routes::whatsapp::whatsapp_webhook,
                // Solicitudes
                routes::solicitud::create_solicitud,
                routes::solicitud::list_solicitudes,
                routes::solicitud::get_solicitud,
                routes::solicitud::update_estado,
                // Mensajes
                routes::mensaje::create_mensaje,
                routes::mensaje::list_mensajes,
                // Reviews
                routes::review::create_review,
                routes::review::list_trabajador_reviews,
                // Trabajadores
                routes::trabajador::list_trabajadores,
                routes::trabajador::get_trabajador,
                // Admin
                routes::admin::list_applications,
                routes::admin::update_application_status,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![bad_request, unauthorized, forbidden, not_found, unprocessable, default_catcher],
        )
}

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    log::info!("🚀 Servicios API running");
    if config::Config::is_development() {
        log::info!("📚 Swagger UI → http://localhost:8000/api/docs");
    }
    if !config::Config::is_twilio_enabled() {
        log::warn!("Twilio not configured: WhatsApp notifications are disabled");
    }

    app().attach(db::init())
}
