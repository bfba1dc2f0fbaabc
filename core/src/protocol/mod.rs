//! Link-device vocabulary shared by both roles

pub mod constants;
mod auth;
mod state;
mod uri;

pub use auth::{AuthError, AuthResult};
pub use state::{LinkDeviceState, Transition};
pub use uri::{AuthUri, ExportSideInputError};
