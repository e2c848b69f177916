pub mod trabajador;
pub mod usuario;
pub mod solicitud;
pub mod mensaje;
pub mod review;
pub mod whatsapp;

pub use trabajador::*;
pub use usuario::*;
pub use solicitud::*;
pub use mensaje::*;
pub use review::*;
pub use whatsapp::*;
