//! Auth results reported by the daemon

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{
    DETAIL_ERROR, DETAIL_IP, DETAIL_JAMI_ID, DETAIL_NEED_PASSWORD, DETAIL_REGISTERED_NAME,
    DETAIL_TOKEN,
};
use super::LinkDeviceState;
use crate::signal::Signal;
use crate::{Error, Result};

/// Failure classification reported alongside an error signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthError {
    Network,
    Authentication,
    Unknown,
}

impl AuthError {
    /// Map the daemon's lowercase error tag
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "network" => AuthError::Network,
            "authentication" => AuthError::Authentication,
            _ => AuthError::Unknown,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            AuthError::Network => "network",
            AuthError::Authentication => "authentication",
            AuthError::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One signal emitted by the daemon for a link-device session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub account_id: String,
    pub state: LinkDeviceState,
    #[serde(default)]
    pub details: HashMap<String, String>,
    #[serde(default)]
    pub operation_id: Option<u32>,
}

impl AuthResult {
    pub fn new(account_id: impl Into<String>, state: LinkDeviceState) -> Self {
        Self {
            account_id: account_id.into(),
            state,
            details: HashMap::new(),
            operation_id: None,
        }
    }

    /// Attach a detail entry
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_operation(mut self, operation_id: u32) -> Self {
        self.operation_id = Some(operation_id);
        self
    }

    /// Look up a detail, treating empty values as absent
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<&str> {
        self.detail(key).ok_or(Error::MissingDetail(key))
    }

    fn flag(&self, key: &'static str) -> Result<bool> {
        match self.detail(key) {
            None | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(Error::InvalidDetail {
                key,
                value: other.to_string(),
            }),
        }
    }

    /// Decode this record into a typed signal, validating phase-specific details
    pub fn signal(&self) -> Result<Signal> {
        let owned = |value: Option<&str>| value.map(str::to_string);

        let signal = match self.state {
            LinkDeviceState::None => Signal::None,
            LinkDeviceState::TokenAvailable => Signal::TokenAvailable {
                token: self.required(DETAIL_TOKEN)?.to_string(),
            },
            LinkDeviceState::Connecting => Signal::Connecting {
                ip: owned(self.detail(DETAIL_IP)),
            },
            LinkDeviceState::Authenticating => Signal::Authenticating {
                need_password: self.flag(DETAIL_NEED_PASSWORD)?,
                jami_id: owned(self.detail(DETAIL_JAMI_ID)),
                registered_name: owned(self.detail(DETAIL_REGISTERED_NAME)),
            },
            LinkDeviceState::Importing => Signal::Importing,
            LinkDeviceState::Done => Signal::Done,
            LinkDeviceState::Error => Signal::Error(
                self.detail(DETAIL_ERROR)
                    .map(AuthError::from_tag)
                    .unwrap_or(AuthError::Unknown),
            ),
        };
        Ok(signal)
    }
}
