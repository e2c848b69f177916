//! Route-level tests. The MongoDB handle points at an unreachable port, so
//! only the paths that answer before touching the database are exercised.

use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{json, Value};

use crate::config::Config;
use crate::services::jwt::Role;
use crate::services::jwt::tests::mint;

async fn client() -> Client {
    let mongo = mongodb::Client::with_uri_str(
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
    )
    .await
    .expect("valid mongodb uri");

    let rocket = crate::app().manage(mongo.database("servicios_test"));
    Client::tracked(rocket).await.expect("valid rocket instance")
}

fn bearer(role: Role) -> Header<'static> {
    let token = mint(
        &mongodb::bson::oid::ObjectId::new().to_hex(),
        role,
        &Config::jwt_secret(),
        600,
    );
    Header::new("Authorization", format!("Bearer {}", token))
}

async fn json_body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.expect("json body")
}

#[rocket::async_test]
async fn health_reports_ok() {
    let client = client().await;
    let response = client.get("/api/health").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "data": { "status": "ok" } })
    );
}

#[rocket::async_test]
async fn unknown_routes_return_json_404() {
    let client = client().await;
    let response = client.get("/api/nowhere").dispatch().await;

    assert_eq!(response.status(), Status::NotFound);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Resource not found: /api/nowhere");
}

#[rocket::async_test]
async fn protected_routes_require_a_bearer_token() {
    let client = client().await;

    let response = client.get("/api/solicitudes").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(json_body(response).await["error"], "Missing or invalid bearer token");

    let response = client
        .get("/api/solicitudes")
        .header(Header::new("Authorization", "Bearer not-a-jwt"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let client = client().await;
    let token = mint(
        &mongodb::bson::oid::ObjectId::new().to_hex(),
        Role::Usuario,
        "some-other-secret",
        600,
    );

    let response = client
        .get("/api/solicitudes")
        .header(Header::new("Authorization", format!("Bearer {}", token)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn admin_routes_refuse_regular_users() {
    let client = client().await;
    let response = client
        .get("/api/admin/trabajadores")
        .header(bearer(Role::Usuario))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(json_body(response).await["error"], "Forbidden");
}

#[rocket::async_test]
async fn admin_cannot_set_status_back_to_pending() {
    let client = client().await;
    let response = client
        .put(format!(
            "/api/admin/trabajadores/{}/status",
            mongodb::bson::oid::ObjectId::new().to_hex()
        ))
        .header(ContentType::JSON)
        .header(bearer(Role::Admin))
        .body(json!({ "status": "pending" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(
        json_body(response).await,
        json!({ "success": false, "error": "Status must be 'approved' or 'rejected'" })
    );
}

#[rocket::async_test]
async fn review_rating_is_bounded() {
    let client = client().await;
    let response = client
        .post("/api/reviews")
        .header(ContentType::JSON)
        .header(bearer(Role::Usuario))
        .body(
            json!({
                "trabajadorId": mongodb::bson::oid::ObjectId::new().to_hex(),
                "rating": 6,
            })
            .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(json_body(response).await["error"], "Rating must be between 1 and 5");
}

#[rocket::async_test]
async fn incomplete_json_bodies_are_unprocessable() {
    let client = client().await;
    let response = client
        .post("/api/reviews")
        .header(ContentType::JSON)
        .header(bearer(Role::Usuario))
        .body(json!({ "rating": 5 }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert_eq!(json_body(response).await["success"], false);
}

#[rocket::async_test]
async fn solicitud_requires_valid_fecha() {
    let client = client().await;
    let response = client
        .post("/api/solicitudes")
        .header(ContentType::JSON)
        .header(bearer(Role::Usuario))
        .body(
            json!({
                "trabajadorId": mongodb::bson::oid::ObjectId::new().to_hex(),
                "descripcion": "Cambiar cerradura",
                "fecha": "mañana",
                "hora": "10:00",
            })
            .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(json_body(response).await["error"], "Fecha must be YYYY-MM-DD");
}

#[rocket::async_test]
async fn estado_updates_reject_unknown_values() {
    let client = client().await;
    let response = client
        .put(format!(
            "/api/solicitudes/{}/estado",
            mongodb::bson::oid::ObjectId::new().to_hex()
        ))
        .header(ContentType::JSON)
        .header(bearer(Role::Usuario))
        .body(json!({ "estado": "cancelada" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(json_body(response).await["error"], "Invalid estado");
}

#[rocket::async_test]
async fn invalid_object_ids_are_bad_requests() {
    let client = client().await;
    let response = client.get("/api/trabajadores/not-an-id").dispatch().await;

    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(json_body(response).await["error"], "Invalid trabajador ID");
}

#[rocket::async_test]
async fn webhook_requires_a_sender() {
    let client = client().await;
    let response = client
        .post("/api/whatsapp/webhook")
        .header(ContentType::Form)
        .body("Body=CONFIRMAR&MessageSid=SM123")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(json_body(response).await["error"], "Missing sender");
}

#[rocket::async_test]
async fn openapi_document_lists_the_routes() {
    let client = client().await;
    let response = client.get("/api/openapi.json").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let document = json_body(response).await;
    let paths = document["paths"].as_object().expect("paths object");
    assert!(paths.keys().any(|p| p.contains("solicitudes")));
    assert!(!paths.keys().any(|p| p.contains("webhook")));
}
