//! Passive display surfaces driven by the controllers

use crate::protocol::{AuthError, ExportSideInputError};

/// Outcome shown once the identity transfer starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkResult {
    InProgress,
    Done,
    Failed(AuthError),
}

/// View of the new device
pub trait ImportSideView: Send + Sync {
    /// Show the token to transmit to the other device; `None` shows an empty prompt
    fn show_authentication_uri(&self, uri: Option<&str>);

    /// The user has to act on the exporting device
    fn show_action_required(&self);

    /// Identity confirmation, with a password field when `need_password`
    fn show_authentication(&self, need_password: bool, jami_id: &str, registered_name: Option<&str>);

    fn show_result(&self, result: LinkResult);
}

/// View of the provisioned device
pub trait ExportSideView: Send + Sync {
    /// URI entry, optionally annotated with the last error
    fn show_input(&self, error: Option<ExportSideInputError>);

    /// Address of the device asking for the identity
    fn show_ip(&self, ip: Option<&str>);

    fn show_password_protection(&self);

    fn show_result(&self, result: LinkResult);
}
