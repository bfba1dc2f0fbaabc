//! Commands sent from the controllers to the native daemon
//!
//! Every command is fire-and-forget: the outcome comes back later as a
//! signal. An `Err` only means the command could not be handed over.

pub mod loopback;

use crate::protocol::AuthUri;
use crate::Result;

pub use loopback::{ArchiveIdentity, LoopbackDaemon};

/// Command surface of the daemon's link-device API
pub trait DaemonCommands: Send + Sync {
    /// Export side: start linking with the device that produced `uri`
    fn submit_authentication_uri(&self, account_id: &str, uri: &AuthUri) -> Result<()>;

    /// Export side: the user confirmed the peer device
    fn confirm_identity(&self, account_id: &str, operation_id: Option<u32>) -> Result<()>;

    /// Import side: unlock the archive being transferred
    fn submit_password(&self, account_id: &str, operation_id: Option<u32>, password: &str) -> Result<()>;

    /// Either side: tear the session down
    fn cancel_session(&self, account_id: &str, operation_id: Option<u32>) -> Result<()>;
}
