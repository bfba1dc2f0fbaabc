//! Centralized protocol constants
//!
//! Detail keys and URI shape shared with the daemon's link-device signals.

/// Scheme prefix of an authentication URI
pub const AUTH_URI_SCHEME: &str = "jami-auth://";

/// Exact length of a well-formed authentication URI
pub const AUTH_URI_LENGTH: usize = 59;

/// Hex digits of the account id embedded in an authentication URI
pub const AUTH_URI_ACCOUNT_LEN: usize = 40;

/// Digits of the one-time code embedded in an authentication URI
pub const AUTH_URI_CODE_LEN: usize = 6;

/// Detail key: token produced for the import side
pub const DETAIL_TOKEN: &str = "token";

/// Detail key: address of the peer device
pub const DETAIL_IP: &str = "ip";

/// Detail key: account id of the identity being linked
pub const DETAIL_JAMI_ID: &str = "jamiId";

/// Detail key: registered name of the identity being linked
pub const DETAIL_REGISTERED_NAME: &str = "registeredName";

/// Detail key: whether the archive is password protected ("true"/"false")
pub const DETAIL_NEED_PASSWORD: &str = "needPassword";

/// Detail key: lowercase error tag on failure
pub const DETAIL_ERROR: &str = "error";

/// Default upper bound for the connecting and authenticating phases, in seconds
pub const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 120;
