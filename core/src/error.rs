use thiserror::Error;

use crate::protocol::{ExportSideInputError, LinkDeviceState};
use crate::signal::Role;

/// Jamilink error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(ExportSideInputError),

    #[error("{role} side cannot handle {signal} signal")]
    UnsupportedSignal { role: Role, signal: &'static str },

    #[error("Unexpected transition from {from} to {to}")]
    UnexpectedTransition {
        from: LinkDeviceState,
        to: LinkDeviceState,
    },

    #[error("Missing detail '{0}' in auth result")]
    MissingDetail(&'static str),

    #[error("Invalid detail '{key}': {value:?}")]
    InvalidDetail { key: &'static str, value: String },

    #[error("Daemon error: {0}")]
    Daemon(String),

    #[error("Controller is detached from its session")]
    Detached,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_part() {
        let unsupported = Error::UnsupportedSignal {
            role: Role::Export,
            signal: "token-available",
        };
        assert_eq!(unsupported.to_string(), "export side cannot handle token-available signal");

        let backward = Error::UnexpectedTransition {
            from: LinkDeviceState::Importing,
            to: LinkDeviceState::Connecting,
        };
        assert_eq!(backward.to_string(), "Unexpected transition from IMPORTING to CONNECTING");

        assert_eq!(
            Error::MissingDetail("jamiId").to_string(),
            "Missing detail 'jamiId' in auth result"
        );
    }
}
