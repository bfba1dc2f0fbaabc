//! Jamilink Core - device-linking state machine for Jami clients
//!
//! This library drives the client side of linking a new device to an
//! existing account: the importing device publishes a token, the exporting
//! device consumes it, and both follow the daemon's phase signals through
//! authentication to the identity transfer.

pub mod daemon;
pub mod presenter;
pub mod protocol;
pub mod session;
pub mod signal;
pub mod view;

mod error;

use std::time::Duration;

pub use error::{Error, Result};

use protocol::constants::DEFAULT_PHASE_TIMEOUT_SECS;
use protocol::LinkDeviceState;

/// Configuration for link-device flows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound for waiting on the peer to connect
    pub connecting_timeout: Option<Duration>,
    /// Upper bound for the mutual authentication phase
    pub authenticating_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connecting_timeout: Some(Duration::from_secs(DEFAULT_PHASE_TIMEOUT_SECS)),
            authenticating_timeout: Some(Duration::from_secs(DEFAULT_PHASE_TIMEOUT_SECS)),
        }
    }
}

impl Config {
    /// No phase is ever timed out
    pub fn unbounded() -> Self {
        Self {
            connecting_timeout: None,
            authenticating_timeout: None,
        }
    }

    /// Time bound for `phase`, if it has one
    pub fn phase_timeout(&self, phase: LinkDeviceState) -> Option<Duration> {
        match phase {
            LinkDeviceState::Connecting => self.connecting_timeout,
            LinkDeviceState::Authenticating => self.authenticating_timeout,
            _ => None,
        }
    }
}

// Re-export key types for convenience
pub use daemon::{DaemonCommands, LoopbackDaemon};
pub use presenter::{ExportSidePresenter, ImportSidePresenter};
pub use protocol::{AuthError, AuthResult, AuthUri, ExportSideInputError};
pub use session::SignalRouter;
pub use signal::{Role, Signal, SignalHandler};
pub use view::{ExportSideView, ImportSideView, LinkResult};
