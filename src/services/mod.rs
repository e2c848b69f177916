pub mod jwt;
pub mod twilio;
pub mod whatsapp;

pub use jwt::JwtService;
pub use twilio::TwilioService;
pub use whatsapp::WhatsAppCommand;
