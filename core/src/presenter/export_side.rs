//! Provisioned-device half of the handshake

use std::sync::Arc;

use parking_lot::Mutex;

use super::PresenterCore;
use crate::daemon::DaemonCommands;
use crate::protocol::{AuthError, AuthResult, AuthUri, ExportSideInputError, LinkDeviceState};
use crate::signal::{Role, Signal, SignalHandler};
use crate::view::{ExportSideView, LinkResult};
use crate::{Error, Result};

/// Drives the export side: validates the URI produced by the new device,
/// shows the peer address for confirmation and reports the transfer.
pub struct ExportSidePresenter {
    core: PresenterCore<dyn ExportSideView>,
    /// URI handed to the daemon and not yet answered
    submitted: Mutex<Option<AuthUri>>,
}

impl ExportSidePresenter {
    pub fn new(
        account_id: impl Into<String>,
        daemon: Arc<dyn DaemonCommands>,
        view: Arc<dyn ExportSideView>,
    ) -> Self {
        Self {
            core: PresenterCore::new(Role::Export, account_id.into(), daemon, view),
            submitted: Mutex::new(None),
        }
    }

    /// Validate a scanned or typed URI and hand it to the daemon.
    ///
    /// Malformed input is reported to the view as
    /// [`ExportSideInputError::InvalidInput`] and never reaches the daemon.
    pub fn on_authentication_uri(&self, input: &str) -> Result<()> {
        let _gate = self.core.lock();
        self.core.ensure_attached()?;

        let uri = match AuthUri::parse(input) {
            Ok(uri) => uri,
            Err(error) => {
                tracing::warn!("rejected authentication uri for {}: {}", self.core.account_id, error);
                self.core.render(|view| view.show_input(Some(error)));
                return Err(Error::InvalidInput(error));
            }
        };

        tracing::info!("submitting authentication uri for {}", self.core.account_id);
        self.core
            .daemon
            .submit_authentication_uri(&self.core.account_id, &uri)?;
        *self.submitted.lock() = Some(uri);
        Ok(())
    }

    /// The user confirmed the device shown by `show_ip`
    pub fn on_identity_confirmation(&self) -> Result<()> {
        let _gate = self.core.lock();
        self.core.ensure_attached()?;
        tracing::info!("identity confirmed for {}", self.core.account_id);
        self.core
            .daemon
            .confirm_identity(&self.core.account_id, self.core.operation_id())
    }

    /// Ask the daemon to tear the session down
    pub fn on_cancel(&self) -> Result<()> {
        let _gate = self.core.lock();
        self.core.ensure_attached()?;
        tracing::info!("cancelling export for {}", self.core.account_id);
        self.core.mark_cancelled();
        self.core
            .daemon
            .cancel_session(&self.core.account_id, self.core.operation_id())
    }

    pub fn operation_id(&self) -> Option<u32> {
        self.core.operation_id()
    }

    /// A network failure before any connection means the daemon never found
    /// the importing device; the user can try another URI.
    fn peer_not_found(&self, error: AuthError) -> bool {
        error == AuthError::Network
            && self.core.state() == LinkDeviceState::None
            && self.submitted.lock().is_some()
    }

    fn apply(&self, signal: Signal, operation_id: Option<u32>) -> Result<()> {
        let _gate = self.core.lock();

        if let Signal::TokenAvailable { .. } = signal {
            return Err(self.core.unsupported(&signal));
        }
        if !self.core.admits(signal.state()) {
            return Ok(());
        }

        if let Signal::Error(error) = signal {
            if self.peer_not_found(error) {
                tracing::warn!("import device not found for {}", self.core.account_id);
                *self.submitted.lock() = None;
                self.core
                    .render(|view| view.show_input(Some(ExportSideInputError::NotFoundOnNetwork)));
                return Ok(());
            }
        }

        if !self.core.advance(&signal, operation_id)? {
            return Ok(());
        }

        match &signal {
            Signal::None => {
                *self.submitted.lock() = None;
                self.core.render(|view| view.show_input(None))
            }
            Signal::Connecting { ip } => self.core.render(|view| view.show_ip(ip.as_deref())),
            Signal::Authenticating { .. } => self.core.render(|view| view.show_password_protection()),
            Signal::Importing => self.core.render(|view| view.show_result(LinkResult::InProgress)),
            Signal::Done => self.core.render(|view| view.show_result(LinkResult::Done)),
            Signal::Error(error) => {
                let error = *error;
                tracing::warn!("export for {} failed: {}", self.core.account_id, error);
                self.core.render(|view| view.show_result(LinkResult::Failed(error)))
            }
            Signal::TokenAvailable { .. } => return Err(self.core.unsupported(&signal)),
        }
        Ok(())
    }
}

impl SignalHandler for ExportSidePresenter {
    fn role(&self) -> Role {
        Role::Export
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
        tracing::warn!("export for {} timed out while {}", self.core.account_id, phase);
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

    #[derive(Default)]
    struct CountingDaemon {
        uris: Mutex<Vec<String>>,
    }

    impl DaemonCommands for CountingDaemon {
        fn submit_authentication_uri(&self, _: &str, uri: &AuthUri) -> Result<()> {
            self.uris.lock().push(uri.to_string());
            Ok(())
        }
        fn confirm_identity(&self, _: &str, _: Option<u32>) -> Result<()> {
            Ok(())
        }
        fn submit_password(&self, _: &str, _: Option<u32>, _: &str) -> Result<()> {
            Ok(())
        }
        fn cancel_session(&self, _: &str, _: Option<u32>) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct InputView {
        inputs: Mutex<Vec<Option<ExportSideInputError>>>,
    }

    impl ExportSideView for InputView {
        fn show_input(&self, error: Option<ExportSideInputError>) {
            self.inputs.lock().push(error);
        }
        fn show_ip(&self, _: Option<&str>) {}
        fn show_password_protection(&self) {}
        fn show_result(&self, _: LinkResult) {}
    }

    const URI: &str = "jami-auth://0123456789abcdef0123456789abcdef01234567/654321";

    fn presenter() -> (ExportSidePresenter, Arc<CountingDaemon>, Arc<InputView>) {
        let daemon = Arc::new(CountingDaemon::default());
        let view = Arc::new(InputView::default());
        let presenter = ExportSidePresenter::new("acc", daemon.clone(), view.clone());
        (presenter, daemon, view)
    }

    #[test]
    fn test_valid_uri_forwarded() {
        let (presenter, daemon, view) = presenter();
        presenter.on_authentication_uri(URI).unwrap();
        assert_eq!(*daemon.uris.lock(), vec![URI.to_string()]);
        assert!(view.inputs.lock().is_empty());
    }

    #[test]
    fn test_not_found_only_after_submission() {
        let (presenter, _, view) = presenter();

        // nothing submitted: a network error is a plain failure
        presenter.on_signal(Signal::Error(AuthError::Network)).unwrap();
        assert_eq!(presenter.current_state(), LinkDeviceState::Error);
        assert!(view.inputs.lock().is_empty());
    }

    #[test]
    fn test_not_found_is_recoverable() {
        let (presenter, daemon, view) = presenter();
        presenter.on_authentication_uri(URI).unwrap();
        presenter.on_signal(Signal::Error(AuthError::Network)).unwrap();

        assert_eq!(presenter.current_state(), LinkDeviceState::None);
        assert_eq!(
            *view.inputs.lock(),
            vec![Some(ExportSideInputError::NotFoundOnNetwork)]
        );

        // user retries with another uri
        presenter.on_authentication_uri(URI).unwrap();
        assert_eq!(daemon.uris.lock().len(), 2);
    }

    #[test]
    fn test_authentication_error_after_submission_is_terminal() {
        let (presenter, _, _) = presenter();
        presenter.on_authentication_uri(URI).unwrap();
        presenter
            .on_signal(Signal::Error(AuthError::Authentication))
            .unwrap();
        assert_eq!(presenter.current_state(), LinkDeviceState::Error);
    }

    #[test]
    fn test_token_record_is_unsupported() {
        let (presenter, _, view) = presenter();
        let record = AuthResult::new("acc", LinkDeviceState::TokenAvailable)
            .with_detail(crate::protocol::constants::DETAIL_TOKEN, URI)
            .with_operation(5);
        let outcome = presenter.on_auth_result(&record);
        assert!(matches!(
            outcome,
            Err(Error::UnsupportedSignal {
                role: Role::Export,
                signal: "token-available",
            })
        ));
        assert_eq!(presenter.current_state(), LinkDeviceState::None);
        assert_eq!(presenter.operation_id(), None);
        assert!(view.inputs.lock().is_empty());
    }

    #[test]
    fn test_detached_skips_not_found() {
        let (presenter, _, view) = presenter();
        presenter.on_authentication_uri(URI).unwrap();
        presenter.detach();
        presenter.on_signal(Signal::Error(AuthError::Network)).unwrap();
        assert!(view.inputs.lock().is_empty());
    }
}
