//! Controllers driving each half of the link-device handshake

mod export_side;
mod import_side;

use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::daemon::DaemonCommands;
use crate::protocol::{LinkDeviceState, Transition};
use crate::signal::{Role, Signal};
use crate::{Error, Result};

pub use export_side::ExportSidePresenter;
pub use import_side::ImportSidePresenter;

#[derive(Debug, Default)]
struct SessionState {
    state: LinkDeviceState,
    operation_id: Option<u32>,
    cancelled: bool,
    detached: bool,
}

impl SessionState {
    /// Why a signal moving to `to` is dropped unseen, if it is
    fn drops(&self, to: LinkDeviceState) -> Option<&'static str> {
        if self.detached {
            return Some("detached");
        }
        let transition = self.state.check_transition(to);
        if self.cancelled && transition != Transition::Reset {
            return Some("cancelled");
        }
        if transition == Transition::Late {
            return Some("already finished");
        }
        None
    }
}

/// State and collaborators shared by both presenters.
///
/// `gate` serialises the signal path against the command path. `session`
/// is only held for short reads and writes, never across a view call, so a
/// view may read the current state while it renders.
struct PresenterCore<V: ?Sized> {
    role: Role,
    account_id: String,
    daemon: Arc<dyn DaemonCommands>,
    view: RwLock<Option<Arc<V>>>,
    session: RwLock<SessionState>,
    gate: ReentrantMutex<()>,
}

impl<V: ?Sized> PresenterCore<V> {
    fn new(role: Role, account_id: String, daemon: Arc<dyn DaemonCommands>, view: Arc<V>) -> Self {
        Self {
            role,
            account_id,
            daemon,
            view: RwLock::new(Some(view)),
            session: RwLock::new(SessionState::default()),
            gate: ReentrantMutex::new(()),
        }
    }

    fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.gate.lock()
    }

    fn state(&self) -> LinkDeviceState {
        self.session.read().state
    }

    fn operation_id(&self) -> Option<u32> {
        self.session.read().operation_id
    }

    fn is_detached(&self) -> bool {
        self.session.read().detached
    }

    /// Guard for the command path
    fn ensure_attached(&self) -> Result<()> {
        if self.is_detached() {
            return Err(Error::Detached);
        }
        Ok(())
    }

    fn mark_cancelled(&self) {
        self.session.write().cancelled = true;
    }

    /// Whether a signal moving to `to` would be acted on.
    ///
    /// Checked before a record's details are decoded, so a controller that
    /// is detached, cancelled or finished drops it without complaint.
    fn admits(&self, to: LinkDeviceState) -> bool {
        match self.session.read().drops(to) {
            Some(reason) => {
                tracing::debug!("{} side of {} {}, dropping {} signal", self.role, self.account_id, reason, to);
                false
            }
            None => true,
        }
    }

    /// Move to the signal's phase if the transition policy allows it, binding
    /// `operation_id` when the signal is taken.
    ///
    /// Returns whether the view should be rendered for the new phase.
    fn advance(&self, signal: &Signal, operation_id: Option<u32>) -> Result<bool> {
        let to = signal.state();
        let mut session = self.session.write();

        if let Some(reason) = session.drops(to) {
            tracing::debug!("{} side of {} {}, dropping {} signal", self.role, self.account_id, reason, signal.name());
            return Ok(false);
        }

        let transition = session.state.check_transition(to);
        if transition == Transition::Backward {
            tracing::warn!(
                "{} side of {}: refusing to move back from {} to {}",
                self.role,
                self.account_id,
                session.state,
                to
            );
            return Err(Error::UnexpectedTransition {
                from: session.state,
                to,
            });
        }

        if transition == Transition::Reset {
            session.cancelled = false;
            session.operation_id = None;
        }
        if session.state != to {
            tracing::info!("{} side of {}: {} -> {}", self.role, self.account_id, session.state, to);
        }
        session.state = to;

        if let Some(operation_id) = operation_id {
            if session.operation_id != Some(operation_id) {
                tracing::debug!("{} side of {} bound to operation {}", self.role, self.account_id, operation_id);
                session.operation_id = Some(operation_id);
            }
        }
        Ok(true)
    }

    /// Reject a signal this role never receives
    fn unsupported(&self, signal: &Signal) -> Error {
        tracing::error!(
            "{} side of {} received {} signal, which only the other role handles",
            self.role,
            self.account_id,
            signal.name()
        );
        Error::UnsupportedSignal {
            role: self.role,
            signal: signal.name(),
        }
    }

    /// Run `render` against the view if it is still attached
    fn render(&self, render: impl FnOnce(&V)) {
        let view = self.view.read().clone();
        if let Some(view) = view {
            render(view.as_ref());
        }
    }

    fn detach(&self) {
        let _gate = self.lock();
        self.session.write().detached = true;
        if self.view.write().take().is_some() {
            tracing::debug!("{} side of {} detached from its view", self.role, self.account_id);
        }
    }
}
