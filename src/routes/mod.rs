pub mod admin;
pub mod health;
pub mod mensaje;
pub mod review;
pub mod solicitud;
pub mod trabajador;
pub mod whatsapp;
