//! In-process daemon linking two local accounts
//!
//! Plays the daemon's part of the handshake for an import account and an
//! export account living in the same process. Signals are delivered on the
//! unbounded channel returned by [`LoopbackDaemon::register_account`].

use std::collections::HashMap;
use std::fmt::Write as _;

use parking_lot::Mutex;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use super::DaemonCommands;
use crate::protocol::constants::{
    AUTH_URI_ACCOUNT_LEN, AUTH_URI_SCHEME, DETAIL_ERROR, DETAIL_IP, DETAIL_JAMI_ID,
    DETAIL_NEED_PASSWORD, DETAIL_REGISTERED_NAME, DETAIL_TOKEN,
};
use crate::protocol::{AuthError, AuthResult, AuthUri, LinkDeviceState};
use crate::{Error, Result};

/// Address reported to the export side for in-process peers
const LOOPBACK_PEER_IP: &str = "127.0.0.1";

/// Identity held by an exporting account
#[derive(Debug, Clone)]
pub struct ArchiveIdentity {
    pub jami_id: String,
    pub registered_name: Option<String>,
    pub password: Option<String>,
}

impl ArchiveIdentity {
    /// Derive a 40-hex account id from a display name
    pub fn from_name(name: &str, password: Option<String>) -> Self {
        Self {
            jami_id: derive_jami_id(name.as_bytes()),
            registered_name: Some(name.to_string()),
            password,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Connecting,
    Authenticating,
}

#[derive(Debug)]
struct Link {
    import_account: String,
    export_account: String,
    identity: ArchiveIdentity,
    stage: Stage,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, mpsc::UnboundedSender<AuthResult>>,
    identities: HashMap<String, ArchiveIdentity>,
    /// token -> import account waiting for an exporter
    pending: HashMap<String, String>,
    links: HashMap<u32, Link>,
}

/// Loopback implementation of [`DaemonCommands`]
#[derive(Default)]
pub struct LoopbackDaemon {
    inner: Mutex<Inner>,
}

impl LoopbackDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its signal channel.
    ///
    /// Accounts with an identity can export it; the others can only import.
    pub fn register_account(
        &self,
        account_id: &str,
        identity: Option<ArchiveIdentity>,
    ) -> mpsc::UnboundedReceiver<AuthResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        inner.accounts.insert(account_id.to_string(), tx);
        if let Some(identity) = identity {
            inner.identities.insert(account_id.to_string(), identity);
        }
        rx
    }

    /// Start an import session and publish its token to the import account
    pub fn open_import_session(&self, account_id: &str) -> Result<AuthUri> {
        let mut inner = self.inner.lock();
        if !inner.accounts.contains_key(account_id) {
            return Err(Error::Daemon(format!("unknown account {}", account_id)));
        }

        let token = generate_token(account_id);
        let uri = AuthUri::parse(&token)
            .map_err(|e| Error::Daemon(format!("generated token rejected: {}", e)))?;

        inner.pending.insert(token.clone(), account_id.to_string());
        emit(
            &inner,
            AuthResult::new(account_id, LinkDeviceState::TokenAvailable).with_detail(DETAIL_TOKEN, token),
        );
        tracing::info!("import session opened for {}", account_id);
        Ok(uri)
    }

    /// Number of sessions still in flight, pending tokens included
    pub fn open_sessions(&self) -> usize {
        let inner = self.inner.lock();
        inner.pending.len() + inner.links.len()
    }
}

impl DaemonCommands for LoopbackDaemon {
    fn submit_authentication_uri(&self, account_id: &str, uri: &AuthUri) -> Result<()> {
        let mut inner = self.inner.lock();
        let identity = inner
            .identities
            .get(account_id)
            .cloned()
            .ok_or_else(|| Error::Daemon(format!("account {} has no identity to export", account_id)))?;

        let Some(import_account) = inner.pending.remove(uri.as_str()) else {
            tracing::info!("no import session matches uri from {}", account_id);
            emit(
                &inner,
                AuthResult::new(account_id, LinkDeviceState::Error)
                    .with_detail(DETAIL_ERROR, AuthError::Network.as_tag()),
            );
            return Ok(());
        };

        let operation_id = loop {
            let id = rand::thread_rng().gen_range(1..u32::MAX);
            if !inner.links.contains_key(&id) {
                break id;
            }
        };

        emit(
            &inner,
            AuthResult::new(account_id, LinkDeviceState::Connecting)
                .with_detail(DETAIL_IP, LOOPBACK_PEER_IP)
                .with_operation(operation_id),
        );
        emit(
            &inner,
            AuthResult::new(import_account.as_str(), LinkDeviceState::Connecting).with_operation(operation_id),
        );

        inner.links.insert(
            operation_id,
            Link {
                import_account,
                export_account: account_id.to_string(),
                identity,
                stage: Stage::Connecting,
            },
        );
        Ok(())
    }

    fn confirm_identity(&self, account_id: &str, operation_id: Option<u32>) -> Result<()> {
        let mut inner = self.inner.lock();
        let id = find_link(&inner, account_id, operation_id)?;
        let link = inner
            .links
            .get_mut(&id)
            .ok_or_else(|| Error::Daemon(format!("unknown operation {}", id)))?;

        if link.export_account != account_id || link.stage != Stage::Connecting {
            return Err(Error::Daemon(format!("operation {} is not awaiting confirmation", id)));
        }
        link.stage = Stage::Authenticating;

        let need_password = link.identity.password.is_some().to_string();
        let mut import_result = AuthResult::new(link.import_account.as_str(), LinkDeviceState::Authenticating)
            .with_detail(DETAIL_NEED_PASSWORD, need_password.clone())
            .with_detail(DETAIL_JAMI_ID, link.identity.jami_id.clone())
            .with_operation(id);
        if let Some(name) = &link.identity.registered_name {
            import_result = import_result.with_detail(DETAIL_REGISTERED_NAME, name.clone());
        }
        let export_result = AuthResult::new(account_id, LinkDeviceState::Authenticating)
            .with_detail(DETAIL_NEED_PASSWORD, need_password)
            .with_operation(id);

        emit(&inner, export_result);
        emit(&inner, import_result);
        Ok(())
    }

    fn submit_password(&self, account_id: &str, operation_id: Option<u32>, password: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let id = find_link(&inner, account_id, operation_id)?;
        let ready = inner
            .links
            .get(&id)
            .map(|link| link.import_account == account_id && link.stage == Stage::Authenticating)
            .unwrap_or(false);
        if !ready {
            return Err(Error::Daemon(format!("operation {} is not awaiting a password", id)));
        }

        let Some(link) = inner.links.remove(&id) else {
            return Err(Error::Daemon(format!("unknown operation {}", id)));
        };
        let accepted = match &link.identity.password {
            Some(expected) => expected == password,
            None => true,
        };

        let sides = [link.export_account.as_str(), link.import_account.as_str()];
        if accepted {
            for state in [LinkDeviceState::Importing, LinkDeviceState::Done] {
                for account in sides {
                    emit(&inner, AuthResult::new(account, state).with_operation(id));
                }
            }
            tracing::info!("operation {} linked {} to {}", id, link.export_account, link.import_account);
        } else {
            for account in sides {
                emit(
                    &inner,
                    AuthResult::new(account, LinkDeviceState::Error)
                        .with_detail(DETAIL_ERROR, AuthError::Authentication.as_tag())
                        .with_operation(id),
                );
            }
            tracing::info!("operation {} rejected: wrong password", id);
        }
        Ok(())
    }

    fn cancel_session(&self, account_id: &str, operation_id: Option<u32>) -> Result<()> {
        let mut inner = self.inner.lock();

        let id = operation_id.or_else(|| {
            inner
                .links
                .iter()
                .find(|(_, link)| link.import_account == account_id || link.export_account == account_id)
                .map(|(id, _)| *id)
        });

        if let Some(link) = id.and_then(|id| inner.links.remove(&id)) {
            let peer = if link.import_account == account_id {
                link.export_account
            } else {
                link.import_account
            };
            emit(&inner, AuthResult::new(account_id, LinkDeviceState::None));
            emit(
                &inner,
                AuthResult::new(peer, LinkDeviceState::Error).with_detail(DETAIL_ERROR, AuthError::Network.as_tag()),
            );
            return Ok(());
        }

        let before = inner.pending.len();
        inner.pending.retain(|_, account| account.as_str() != account_id);
        if inner.pending.len() != before {
            emit(&inner, AuthResult::new(account_id, LinkDeviceState::None));
        } else {
            tracing::debug!("cancel from {}: nothing in flight", account_id);
        }
        Ok(())
    }
}

fn find_link(inner: &Inner, account_id: &str, operation_id: Option<u32>) -> Result<u32> {
    match operation_id {
        Some(id) => Ok(id),
        None => inner
            .links
            .iter()
            .find(|(_, link)| link.import_account == account_id || link.export_account == account_id)
            .map(|(id, _)| *id)
            .ok_or_else(|| Error::Daemon(format!("no link in progress for {}", account_id))),
    }
}

fn emit(inner: &Inner, result: AuthResult) {
    match inner.accounts.get(&result.account_id) {
        Some(tx) => {
            let account = result.account_id.clone();
            if tx.send(result).is_err() {
                tracing::warn!("signal channel for {} is closed", account);
            }
        }
        None => tracing::warn!("no signal channel for {}", result.account_id),
    }
}

fn derive_jami_id(seed: &[u8]) -> String {
    let digest = Sha256::digest(seed);
    let mut id = String::with_capacity(AUTH_URI_ACCOUNT_LEN);
    for byte in &digest[..AUTH_URI_ACCOUNT_LEN / 2] {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

/// `jami-auth://<40 hex>/<6 digits>`
fn generate_token(account_id: &str) -> String {
    let mut rng = rand::thread_rng();
    let nonce: [u8; 16] = rng.gen();
    let mut seed = account_id.as_bytes().to_vec();
    seed.extend_from_slice(&nonce);
    let code: u32 = rng.gen_range(0..1_000_000);
    format!("{}{}/{:06}", AUTH_URI_SCHEME, derive_jami_id(&seed), code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;

    fn drain(rx: &mut mpsc::UnboundedReceiver<AuthResult>) -> Vec<AuthResult> {
        let mut results = Vec::new();
        while let Ok(result) = rx.try_recv() {
            results.push(result);
        }
        results
    }

    fn states(results: &[AuthResult]) -> Vec<LinkDeviceState> {
        results.iter().map(|r| r.state).collect()
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token("new-device");
        let uri = AuthUri::parse(&token).unwrap();
        assert!(uri.parts().is_some());
    }

    #[test]
    fn test_full_link() {
        let daemon = LoopbackDaemon::new();
        let mut import_rx = daemon.register_account("import", None);
        let mut export_rx = daemon.register_account(
            "export",
            Some(ArchiveIdentity::from_name("alice", Some("hunter2".to_string()))),
        );

        let uri = daemon.open_import_session("import").unwrap();
        daemon.submit_authentication_uri("export", &uri).unwrap();

        let export_results = drain(&mut export_rx);
        assert_eq!(states(&export_results), vec![LinkDeviceState::Connecting]);
        let op = export_results[0].operation_id;
        assert!(op.is_some());

        daemon.confirm_identity("export", op).unwrap();
        daemon.submit_password("import", None, "hunter2").unwrap();

        let import_results = drain(&mut import_rx);
        assert_eq!(
            states(&import_results),
            vec![
                LinkDeviceState::TokenAvailable,
                LinkDeviceState::Connecting,
                LinkDeviceState::Authenticating,
                LinkDeviceState::Importing,
                LinkDeviceState::Done,
            ]
        );
        match import_results[2].signal().unwrap() {
            Signal::Authenticating {
                need_password,
                registered_name,
                ..
            } => {
                assert!(need_password);
                assert_eq!(registered_name.as_deref(), Some("alice"));
            }
            other => panic!("wrong signal: {:?}", other),
        }
        assert_eq!(
            states(&drain(&mut export_rx)),
            vec![
                LinkDeviceState::Authenticating,
                LinkDeviceState::Importing,
                LinkDeviceState::Done,
            ]
        );
        assert_eq!(daemon.open_sessions(), 0);
    }

    #[test]
    fn test_wrong_password_fails_both_sides() {
        let daemon = LoopbackDaemon::new();
        let mut import_rx = daemon.register_account("import", None);
        let mut export_rx = daemon.register_account(
            "export",
            Some(ArchiveIdentity::from_name("alice", Some("hunter2".to_string()))),
        );

        let uri = daemon.open_import_session("import").unwrap();
        daemon.submit_authentication_uri("export", &uri).unwrap();
        daemon.confirm_identity("export", None).unwrap();
        daemon.submit_password("import", None, "nope").unwrap();

        let last = drain(&mut import_rx).pop().unwrap();
        assert_eq!(last.signal().unwrap(), Signal::Error(AuthError::Authentication));
        let last = drain(&mut export_rx).pop().unwrap();
        assert_eq!(last.signal().unwrap(), Signal::Error(AuthError::Authentication));
    }

    #[test]
    fn test_unknown_uri_reports_network_error() {
        let daemon = LoopbackDaemon::new();
        let mut export_rx =
            daemon.register_account("export", Some(ArchiveIdentity::from_name("alice", None)));
        let uri = AuthUri::parse(&generate_token("nobody")).unwrap();

        daemon.submit_authentication_uri("export", &uri).unwrap();
        let results = drain(&mut export_rx);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].signal().unwrap(), Signal::Error(AuthError::Network));
    }

    #[test]
    fn test_cancel_notifies_peer() {
        let daemon = LoopbackDaemon::new();
        let mut import_rx = daemon.register_account("import", None);
        let mut export_rx =
            daemon.register_account("export", Some(ArchiveIdentity::from_name("alice", None)));

        let uri = daemon.open_import_session("import").unwrap();
        daemon.submit_authentication_uri("export", &uri).unwrap();
        drain(&mut import_rx);
        drain(&mut export_rx);

        daemon.cancel_session("import", None).unwrap();
        assert_eq!(states(&drain(&mut import_rx)), vec![LinkDeviceState::None]);
        assert_eq!(states(&drain(&mut export_rx)), vec![LinkDeviceState::Error]);
        assert_eq!(daemon.open_sessions(), 0);
    }

    #[test]
    fn test_confirm_without_link_fails() {
        let daemon = LoopbackDaemon::new();
        let _rx = daemon.register_account("export", Some(ArchiveIdentity::from_name("alice", None)));
        assert!(daemon.confirm_identity("export", None).is_err());
    }
}
