//! New-device half of the handshake

use std::sync::Arc;

use super::PresenterCore;
use crate::daemon::DaemonCommands;
use crate::protocol::constants::DETAIL_JAMI_ID;
use crate::protocol::{AuthError, AuthResult, LinkDeviceState};
use crate::signal::{Role, Signal, SignalHandler};
use crate::view::{ImportSideView, LinkResult};
use crate::{Error, Result};

/// Drives the import side: shows the token, waits for the exporting device,
/// then collects the archive password and reports the transfer.
pub struct ImportSidePresenter {
    core: PresenterCore<dyn ImportSideView>,
}

impl ImportSidePresenter {
    pub fn new(
        account_id: impl Into<String>,
        daemon: Arc<dyn DaemonCommands>,
        view: Arc<dyn ImportSideView>,
    ) -> Self {
        Self {
            core: PresenterCore::new(Role::Import, account_id.into(), daemon, view),
        }
    }

    /// Forward the password typed by the user.
    ///
    /// No local state changes; the daemon answers with a new signal.
    pub fn on_authentication(&self, password: &str) -> Result<()> {
        let _gate = self.core.lock();
        self.core.ensure_attached()?;
        tracing::info!("submitting archive password for {}", self.core.account_id);
        self.core
            .daemon
            .submit_password(&self.core.account_id, self.core.operation_id(), password)
    }

    /// Ask the daemon to tear the session down
    pub fn on_cancel(&self) -> Result<()> {
        let _gate = self.core.lock();
        self.core.ensure_attached()?;
        tracing::info!("cancelling import for {}", self.core.account_id);
        self.core.mark_cancelled();
        self.core
            .daemon
            .cancel_session(&self.core.account_id, self.core.operation_id())
    }

    pub fn operation_id(&self) -> Option<u32> {
        self.core.operation_id()
    }

    fn apply(&self, signal: Signal, operation_id: Option<u32>) -> Result<()> {
        let _gate = self.core.lock();
        if !self.core.admits(signal.state()) {
            return Ok(());
        }

        // A bad record leaves the phase alone.
        if let Signal::Authenticating { jami_id: None, .. } = &signal {
            return Err(Error::MissingDetail(DETAIL_JAMI_ID));
        }

        if !self.core.advance(&signal, operation_id)? {
            return Ok(());
        }

        match signal {
            Signal::None => self.core.render(|view| view.show_authentication_uri(None)),
            Signal::TokenAvailable { token } => {
                self.core.render(|view| view.show_authentication_uri(Some(&token)))
            }
            Signal::Connecting { .. } => self.core.render(|view| view.show_action_required()),
            Signal::Authenticating {
                need_password,
                jami_id,
                registered_name,
            } => {
                let jami_id = jami_id.unwrap_or_default();
                self.core.render(|view| {
                    view.show_authentication(need_password, &jami_id, registered_name.as_deref())
                })
            }
            Signal::Importing => self.core.render(|view| view.show_result(LinkResult::InProgress)),
            Signal::Done => self.core.render(|view| view.show_result(LinkResult::Done)),
            Signal::Error(error) => {
                tracing::warn!("import for {} failed: {}", self.core.account_id, error);
                self.core.render(|view| view.show_result(LinkResult::Failed(error)))
            }
        }
        Ok(())
    }
}

impl SignalHandler for ImportSidePresenter {
    fn role(&self) -> Role {
        Role::Import
    }

    fn account_id(&self) -> &str {
        &self.core.account_id
    }

    fn current_state(&self) -> LinkDeviceState {
        self.core.state()
    }

    fn on_signal(&self, signal: Signal) -> Result<()> {
        self.apply(signal, None)
    }

    fn on_auth_result(&self, result: &AuthResult) -> Result<()> {
        let _gate = self.core.lock();
        if !self.core.admits(result.state) {
            return Ok(());
        }
        self.apply(result.signal()?, result.operation_id)
    }

    fn expire_phase(&self, phase: LinkDeviceState) -> Result<()> {
        let _gate = self.core.lock();
        if self.core.state() != phase {
            return Ok(());
        }
        tracing::warn!("import for {} timed out while {}", self.core.account_id, phase);
        let cancelled = self
            .core
            .daemon
            .cancel_session(&self.core.account_id, self.core.operation_id());
        self.on_signal(Signal::Error(AuthError::Network))?;
        cancelled
    }

    fn detach(&self) {
        self.core.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AuthUri;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct NullDaemon {
        passwords: Mutex<Vec<String>>,
        cancels: Mutex<u32>,
    }

    impl DaemonCommands for NullDaemon {
        fn submit_authentication_uri(&self, _: &str, _: &AuthUri) -> Result<()> {
            Ok(())
        }
        fn confirm_identity(&self, _: &str, _: Option<u32>) -> Result<()> {
            Ok(())
        }
        fn submit_password(&self, _: &str, _: Option<u32>, password: &str) -> Result<()> {
            self.passwords.lock().push(password.to_string());
            Ok(())
        }
        fn cancel_session(&self, _: &str, _: Option<u32>) -> Result<()> {
            *self.cancels.lock() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct SilentView;

    impl ImportSideView for SilentView {
        fn show_authentication_uri(&self, _: Option<&str>) {}
        fn show_action_required(&self) {}
        fn show_authentication(&self, _: bool, _: &str, _: Option<&str>) {}
        fn show_result(&self, _: LinkResult) {}
    }

    fn presenter() -> (ImportSidePresenter, Arc<NullDaemon>) {
        let daemon = Arc::new(NullDaemon::default());
        let presenter = ImportSidePresenter::new("acc", daemon.clone(), Arc::new(SilentView));
        (presenter, daemon)
    }

    #[test]
    fn test_password_is_forwarded_without_state_change() {
        let (presenter, daemon) = presenter();
        presenter.on_authentication("secret").unwrap();
        assert_eq!(*daemon.passwords.lock(), vec!["secret".to_string()]);
        assert_eq!(presenter.current_state(), LinkDeviceState::None);
    }

    #[test]
    fn test_missing_jami_id_rejected() {
        let (presenter, _) = presenter();
        let result = presenter.on_signal(Signal::Authenticating {
            need_password: false,
            jami_id: None,
            registered_name: None,
        });
        assert!(matches!(result, Err(Error::MissingDetail("jamiId"))));
        assert_eq!(presenter.current_state(), LinkDeviceState::None);
    }

    #[test]
    fn test_backward_signal_rejected() {
        let (presenter, _) = presenter();
        presenter.on_signal(Signal::Importing).unwrap();
        let result = presenter.on_signal(Signal::Connecting { ip: None });
        assert!(matches!(result, Err(Error::UnexpectedTransition { .. })));
        assert_eq!(presenter.current_state(), LinkDeviceState::Importing);
    }

    #[test]
    fn test_expire_phase_cancels_and_fails() {
        let (presenter, daemon) = presenter();
        presenter.on_signal(Signal::Connecting { ip: None }).unwrap();
        presenter.expire_phase(LinkDeviceState::Connecting).unwrap();
        assert_eq!(presenter.current_state(), LinkDeviceState::Error);
        assert_eq!(*daemon.cancels.lock(), 1);

        // already moved on: nothing to expire
        presenter.expire_phase(LinkDeviceState::Connecting).unwrap();
        assert_eq!(*daemon.cancels.lock(), 1);
    }

    #[test]
    fn test_operation_recorded_from_result() {
        let (presenter, _) = presenter();
        let result = AuthResult::new("acc", LinkDeviceState::Connecting).with_operation(42);
        presenter.on_auth_result(&result).unwrap();
        assert_eq!(presenter.operation_id(), Some(42));
    }

    #[test]
    fn test_commands_fail_after_detach() {
        let (presenter, daemon) = presenter();
        presenter.detach();
        assert!(matches!(presenter.on_cancel(), Err(Error::Detached)));
        assert_eq!(*daemon.cancels.lock(), 0);
        // signals are dropped quietly
        presenter.on_signal(Signal::Done).unwrap();
        assert_eq!(presenter.current_state(), LinkDeviceState::None);
    }

    #[test]
    fn test_detached_drops_malformed_signals() {
        let (presenter, _) = presenter();
        presenter.detach();
        presenter
            .on_signal(Signal::Authenticating {
                need_password: false,
                jami_id: None,
                registered_name: None,
            })
            .unwrap();
        // token-available without its token
        presenter
            .on_auth_result(&AuthResult::new("acc", LinkDeviceState::TokenAvailable))
            .unwrap();
        assert_eq!(presenter.current_state(), LinkDeviceState::None);
    }

    #[test]
    fn test_finished_flow_keeps_its_operation() {
        let (presenter, _) = presenter();
        presenter
            .on_auth_result(&AuthResult::new("acc", LinkDeviceState::Done).with_operation(7))
            .unwrap();
        presenter
            .on_auth_result(&AuthResult::new("acc", LinkDeviceState::Error).with_operation(8))
            .unwrap();
        assert_eq!(presenter.operation_id(), Some(7));
        assert_eq!(presenter.current_state(), LinkDeviceState::Done);
    }

    #[test]
    fn test_cancelled_flow_keeps_its_operation() {
        let (presenter, _) = presenter();
        presenter
            .on_auth_result(&AuthResult::new("acc", LinkDeviceState::Connecting).with_operation(3))
            .unwrap();
        presenter.on_cancel().unwrap();
        presenter
            .on_auth_result(&AuthResult::new("acc", LinkDeviceState::Authenticating).with_operation(4))
            .unwrap();
        assert_eq!(presenter.operation_id(), Some(3));
    }
}
