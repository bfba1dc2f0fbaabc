//! Routing of daemon signals to the active controller

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::protocol::{AuthResult, LinkDeviceState};
use crate::signal::SignalHandler;
use crate::{Config, Result};

struct ActiveFlow {
    generation: u64,
    handler: Arc<dyn SignalHandler>,
    phase: LinkDeviceState,
    since: Instant,
    expired: bool,
}

/// Delivers daemon signals to the one controller currently running a flow.
///
/// Signals for other accounts, or arriving when no flow is active, are
/// dropped. A controller replaced by [`activate`](Self::activate) is detached
/// and never sees another signal.
pub struct SignalRouter {
    config: Config,
    active: Mutex<Option<ActiveFlow>>,
    next_generation: AtomicU64,
}

impl SignalRouter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active: Mutex::new(None),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Make `handler` the active controller, detaching the previous one
    pub fn activate(&self, handler: Arc<dyn SignalHandler>) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "activating {} flow for {} (generation {})",
            handler.role(),
            handler.account_id(),
            generation
        );

        let previous = self.active.lock().replace(ActiveFlow {
            generation,
            phase: handler.current_state(),
            handler,
            since: Instant::now(),
            expired: false,
        });

        if let Some(previous) = previous {
            tracing::debug!("superseding generation {}", previous.generation);
            previous.handler.detach();
        }
        generation
    }

    /// End the flow started under `generation`, if it is still the active one
    pub fn finish(&self, generation: u64) {
        let finished = {
            let mut active = self.active.lock();
            match active.as_ref() {
                Some(flow) if flow.generation == generation => active.take(),
                _ => None,
            }
        };
        if let Some(flow) = finished {
            tracing::info!("finished {} flow for {}", flow.handler.role(), flow.handler.account_id());
            flow.handler.detach();
        }
    }

    /// Phase of the active controller, if any
    pub fn active_state(&self) -> Option<LinkDeviceState> {
        self.active
            .lock()
            .as_ref()
            .map(|flow| flow.handler.current_state())
    }

    /// Route one daemon record to the active controller
    pub fn dispatch(&self, result: &AuthResult) -> Result<()> {
        let target = {
            let active = self.active.lock();
            active
                .as_ref()
                .filter(|flow| flow.handler.account_id() == result.account_id)
                .map(|flow| (flow.generation, flow.handler.clone()))
        };

        let Some((generation, handler)) = target else {
            tracing::debug!("no active flow for {}, dropping {} signal", result.account_id, result.state);
            return Ok(());
        };

        // Handler runs outside the router lock; it may render and the view
        // may query the router.
        let outcome = handler.on_auth_result(result);
        self.track_phase(generation);
        outcome
    }

    fn track_phase(&self, generation: u64) {
        let mut active = self.active.lock();
        if let Some(flow) = active.as_mut().filter(|flow| flow.generation == generation) {
            let phase = flow.handler.current_state();
            if phase != flow.phase {
                flow.phase = phase;
                flow.since = Instant::now();
                flow.expired = false;
            }
        }
    }

    /// When the active phase runs out of time, if it is bounded
    fn deadline(&self) -> Option<Instant> {
        let active = self.active.lock();
        let flow = active.as_ref().filter(|flow| !flow.expired)?;
        let timeout = self.config.phase_timeout(flow.phase)?;
        Some(flow.since + timeout)
    }

    fn expire(&self) {
        let target = {
            let mut active = self.active.lock();
            active.as_mut().map(|flow| {
                flow.expired = true;
                (flow.generation, flow.phase, flow.handler.clone())
            })
        };

        if let Some((generation, phase, handler)) = target {
            if let Err(e) = handler.expire_phase(phase) {
                tracing::warn!("expiring {} for {}: {}", phase, handler.account_id(), e);
            }
            self.track_phase(generation);
        }
    }

    /// Consume daemon records until the channel closes, enforcing phase timeouts
    pub async fn run(&self, mut signals: mpsc::UnboundedReceiver<AuthResult>) {
        loop {
            let next = match self.deadline() {
                Some(deadline) => tokio::select! {
                    result = signals.recv() => result,
                    _ = tokio::time::sleep_until(deadline) => {
                        self.expire();
                        continue;
                    }
                },
                None => signals.recv().await,
            };

            let Some(result) = next else {
                tracing::debug!("signal channel closed");
                break;
            };

            if let Err(e) = self.dispatch(&result) {
                tracing::warn!("signal for {} not applied: {}", result.account_id, e);
            }
        }
    }
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
