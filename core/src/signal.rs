//! Daemon signal contract
//!
//! The daemon reports every phase change of a link-device session as one
//! [`Signal`]. A controller implements [`SignalHandler`] and matches only the
//! arms its role supports; anything else is reported as
//! [`Error::UnsupportedSignal`](crate::Error::UnsupportedSignal).

use std::fmt;

use crate::protocol::{AuthError, AuthResult, LinkDeviceState};
use crate::Result;

/// Which half of the handshake a controller drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// New device receiving the identity
    Import,
    /// Provisioned device giving its identity away
    Export,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Import => f.write_str("import"),
            Role::Export => f.write_str("export"),
        }
    }
}

/// One phase transition reported by the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    None,
    TokenAvailable {
        token: String,
    },
    Connecting {
        ip: Option<String>,
    },
    Authenticating {
        need_password: bool,
        jami_id: Option<String>,
        registered_name: Option<String>,
    },
    Importing,
    Done,
    Error(AuthError),
}

impl Signal {
    /// Phase this signal moves the session to
    pub fn state(&self) -> LinkDeviceState {
        match self {
            Signal::None => LinkDeviceState::None,
            Signal::TokenAvailable { .. } => LinkDeviceState::TokenAvailable,
            Signal::Connecting { .. } => LinkDeviceState::Connecting,
            Signal::Authenticating { .. } => LinkDeviceState::Authenticating,
            Signal::Importing => LinkDeviceState::Importing,
            Signal::Done => LinkDeviceState::Done,
            Signal::Error(_) => LinkDeviceState::Error,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Signal::None => "none",
            Signal::TokenAvailable { .. } => "token-available",
            Signal::Connecting { .. } => "connecting",
            Signal::Authenticating { .. } => "authenticating",
            Signal::Importing => "importing",
            Signal::Done => "done",
            Signal::Error(_) => "error",
        }
    }
}

/// Receiver of daemon signals for one link-device flow
pub trait SignalHandler: Send + Sync {
    fn role(&self) -> Role;

    /// Account the flow runs for; signals for other accounts are not ours
    fn account_id(&self) -> &str;

    fn current_state(&self) -> LinkDeviceState;

    /// Apply one phase transition
    fn on_signal(&self, signal: Signal) -> Result<()>;

    /// Decode a raw daemon record and apply it
    fn on_auth_result(&self, result: &AuthResult) -> Result<()>;

    /// The current phase outlived its time bound
    fn expire_phase(&self, phase: LinkDeviceState) -> Result<()>;

    /// Stop rendering; the flow no longer owns its view
    fn detach(&self);
}
