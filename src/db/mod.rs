use log::{error, info, warn};
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use rocket::fairing::AdHoc;

pub const TRABAJADORES: &str = "trabajadores";
pub const USUARIOS: &str = "usuarios";
pub const SOLICITUDES: &str = "solicitudes";
pub const MENSAJES: &str = "mensajes";
pub const REVIEWS: &str = "reviews";
pub const WHATSAPP_MESSAGES: &str = "whatsapp_messages";

pub fn init() -> AdHoc {
    AdHoc::on_ignite("MongoDB", |rocket| async {
        match connect().await {
            Ok(database) => {
                info!("✓ MongoDB connected successfully");
                ensure_indexes(&database).await;
                rocket.manage(database)
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                rocket
            }
        }
    })
}

async fn connect() -> Result<Database, mongodb::error::Error> {
    let uri = crate::config::Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;

    Ok(client.database(&crate::config::Config::mongodb_database()))
}

fn index(keys: Document, unique: bool) -> IndexModel {
    let options = IndexOptions::builder().unique(unique).build();
    IndexModel::builder().keys(keys).options(options).build()
}

/// Creates the indexes the handlers rely on. Failures are logged and skipped.
async fn ensure_indexes(db: &Database) {
    let indexes = [
        (TRABAJADORES, index(doc! { "email": 1 }, true)),
        (USUARIOS, index(doc! { "email": 1 }, true)),
        (REVIEWS, index(doc! { "trabajadorId": 1, "usuarioId": 1 }, true)),
        (WHATSAPP_MESSAGES, index(doc! { "telefono": 1, "createdAt": -1 }, false)),
        (SOLICITUDES, index(doc! { "usuarioId": 1, "createdAt": -1 }, false)),
        (MENSAJES, index(doc! { "solicitudId": 1, "createdAt": 1 }, false)),
    ];

    for (collection, model) in indexes {
        if let Err(e) = db
            .collection::<Document>(collection)
            .create_index(model, None)
            .await
        {
            warn!("Could not create index on {}: {}", collection, e);
        }
    }
}

pub type DbConn = Database;
