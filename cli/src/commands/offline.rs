//! Daemon stand-in for commands that run without a link session.

use jamilink_core::{AuthUri, DaemonCommands, Error, Result};

/// Accepts URIs for inspection and refuses everything else
#[derive(Default)]
pub struct OfflineDaemon;

impl DaemonCommands for OfflineDaemon {
    fn submit_authentication_uri(&self, account_id: &str, uri: &AuthUri) -> Result<()> {
        tracing::debug!("offline: {} would link with {}", account_id, uri);
        Ok(())
    }

    fn confirm_identity(&self, _: &str, _: Option<u32>) -> Result<()> {
        Err(Error::Daemon("no daemon connected".to_string()))
    }

    fn submit_password(&self, _: &str, _: Option<u32>, _: &str) -> Result<()> {
        Err(Error::Daemon("no daemon connected".to_string()))
    }

    fn cancel_session(&self, _: &str, _: Option<u32>) -> Result<()> {
        Err(Error::Daemon("no daemon connected".to_string()))
    }
}
