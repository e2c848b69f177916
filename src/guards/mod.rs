pub mod admin;
pub mod auth;
pub mod twilio;

pub use admin::AdminGuard;
pub use auth::AuthGuard;
pub use twilio::TwilioSignature;
