//! Authentication URI validation

use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{AUTH_URI_ACCOUNT_LEN, AUTH_URI_CODE_LEN, AUTH_URI_LENGTH, AUTH_URI_SCHEME};

/// Errors reported to the export side about the URI it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportSideInputError {
    /// Malformed URI, detected locally
    InvalidInput,
    /// The daemon could not find the importing device
    NotFoundOnNetwork,
}

impl fmt::Display for ExportSideInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportSideInputError::InvalidInput => f.write_str("malformed authentication uri"),
            ExportSideInputError::NotFoundOnNetwork => f.write_str("device not found on network"),
        }
    }
}

/// A validated `jami-auth://` URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthUri(String);

impl AuthUri {
    /// Accepts exactly 59 characters starting with `jami-auth://`
    pub fn parse(input: &str) -> Result<Self, ExportSideInputError> {
        if input.is_empty()
            || !input.starts_with(AUTH_URI_SCHEME)
            || input.chars().count() != AUTH_URI_LENGTH
        {
            return Err(ExportSideInputError::InvalidInput);
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the `<account>/<code>` payload the daemon generates.
    ///
    /// Returns `None` when the payload has another shape; such URIs are
    /// still valid, the daemon decides what they mean.
    pub fn parts(&self) -> Option<(&str, &str)> {
        let payload = &self.0[AUTH_URI_SCHEME.len()..];
        let (account, code) = payload.split_once('/')?;
        let account_ok = account.len() == AUTH_URI_ACCOUNT_LEN
            && account.chars().all(|c| c.is_ascii_hexdigit());
        let code_ok = code.len() == AUTH_URI_CODE_LEN && code.chars().all(|c| c.is_ascii_digit());
        (account_ok && code_ok).then_some((account, code))
    }
}

impl fmt::Display for AuthUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AuthUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
