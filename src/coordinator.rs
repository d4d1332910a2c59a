//! Worker setup coordination
//!
//! Selects the best available execution model, runs the model-specific
//! setup path, and exposes a single-resolution setup future yielding a
//! live worker handle. A failed setup is terminal; callers construct a new
//! coordinator to retry.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::error::ForemanError;
use crate::host::{Registration, SetupSignal, WorkerHost};
use crate::options::SetupOptions;
use crate::setup::{SetupCell, SetupPhase};
use crate::worker::{SpawnOptions, WorkerHandle, WorkerKind, WorkerState};

/// Overridable setup validation hooks.
///
/// Both hooks default to no-ops. Returning an error aborts setup and fails
/// the setup future with the error's message.
pub trait SetupHooks: Send + Sync {
    /// Called for every state change observed while an installable worker
    /// sets up, before the state is acted on.
    fn on_state_changed(&self, state: WorkerState) -> anyhow::Result<()> {
        let _ = state;
        Ok(())
    }

    /// Called when the registration reports a new incoming worker version.
    fn on_update_found(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hooks accepting every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SetupHooks for AcceptAll {}

/// Coordinates worker selection and setup, then mediates access to the
/// live worker handle.
#[derive(Debug)]
pub struct WorkerCoordinator {
    kind: WorkerKind,
    cell: SetupCell,
}

impl WorkerCoordinator {
    /// Select an execution model and begin setup.
    ///
    /// Fails synchronously when none of the accepted kinds is backed by a
    /// host facility, or when synchronous worker construction fails. Every
    /// later failure is delivered through the setup future. Must be called
    /// from within a Tokio runtime.
    pub fn connect(
        host: Arc<dyn WorkerHost>,
        options: SetupOptions,
    ) -> Result<Self, ForemanError> {
        Self::connect_with_hooks(host, options, Arc::new(AcceptAll))
    }

    /// [`WorkerCoordinator::connect`] with custom setup hooks.
    #[instrument(skip(host, hooks), fields(url = %options.url))]
    pub fn connect_with_hooks(
        host: Arc<dyn WorkerHost>,
        options: SetupOptions,
        hooks: Arc<dyn SetupHooks>,
    ) -> Result<Self, ForemanError> {
        let kind = options
            .accepted
            .iter()
            .copied()
            .find(|kind| host.supports(*kind))
            .ok_or(ForemanError::UnsupportedModel)?;

        debug!(%kind, "selected worker execution model");

        let cell = SetupCell::new();
        match kind {
            WorkerKind::Installable => {
                let cell_for_setup = cell.clone();
                tokio::spawn(async move {
                    run_installable_setup(host, options, hooks, cell_for_setup).await;
                });
            }
            WorkerKind::Shared => {
                let spawn = spawn_options(&options);
                let port = host.spawn_shared(&options.url, &spawn)?;
                port.start();
                cell.resolve(Some(port));
            }
            WorkerKind::Dedicated => {
                let spawn = spawn_options(&options);
                let handle = host.spawn_dedicated(&options.url, &spawn)?;
                cell.resolve(Some(handle));
            }
        }

        Ok(Self { kind, cell })
    }

    /// Execution model selected for this coordinator.
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Send a message to the worker once setup completed.
    ///
    /// A failed setup rejects with the stored failure.
    pub async fn post_message(&self, message: Value) -> Result<(), ForemanError> {
        match self.cell.wait().await? {
            Some(handle) => handle.post(message),
            None => Err(ForemanError::HandleUnavailable),
        }
    }

    /// Wait for setup and return the live worker handle.
    pub async fn handle(&self) -> Result<WorkerHandle, ForemanError> {
        self.cell
            .wait()
            .await?
            .ok_or(ForemanError::HandleUnavailable)
    }

    /// Wait for setup completion without touching the handle.
    pub async fn setup(&self) -> Result<(), ForemanError> {
        self.cell.wait().await.map(|_| ())
    }

    /// Snapshot of the current setup phase.
    pub fn phase(&self) -> SetupPhase {
        self.cell.phase()
    }

    /// Observe setup phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<SetupPhase> {
        self.cell.subscribe()
    }
}

fn spawn_options(options: &SetupOptions) -> SpawnOptions {
    SpawnOptions {
        name: options.scope_or_name.clone(),
        credentials_include: true,
    }
}

/// Installable setup path: register, inspect, then consume lifecycle
/// signals under a timeout. Returning disarms the timer and detaches the
/// signal observers; the cell guards against any late double resolution.
async fn run_installable_setup(
    host: Arc<dyn WorkerHost>,
    options: SetupOptions,
    hooks: Arc<dyn SetupHooks>,
    cell: SetupCell,
) {
    let registration = match host
        .register(&options.url, options.scope_or_name.as_deref())
        .await
    {
        Ok(registration) => registration,
        Err(error) => {
            warn!(%error, "worker registration failed");
            cell.fail(error);
            return;
        }
    };

    if registration.tracked().is_none() {
        cell.fail(ForemanError::RegistrationFailed {
            details: "registration produced no worker instance".into(),
        });
        return;
    }

    let Registration { mut signals, .. } = registration;
    let timer = tokio::time::sleep(options.setup_timeout);
    tokio::pin!(timer);
    let mut signals_open = true;

    loop {
        tokio::select! {
            () = &mut timer => {
                warn!(timeout = ?options.setup_timeout, "worker setup timed out");
                cell.fail(ForemanError::SetupTimeout);
                return;
            }
            signal = signals.recv(), if signals_open => {
                let Some(signal) = signal else {
                    // Host dropped its signal sender without a terminal
                    // state; only the timer can resolve setup now.
                    signals_open = false;
                    continue;
                };
                if handle_signal(signal, &host, &hooks, &cell) {
                    return;
                }
            }
        }
    }
}

/// Process one lifecycle signal. Returns true once setup resolved.
fn handle_signal(
    signal: SetupSignal,
    host: &Arc<dyn WorkerHost>,
    hooks: &Arc<dyn SetupHooks>,
    cell: &SetupCell,
) -> bool {
    match signal {
        SetupSignal::StateChanged { state } => {
            debug!(%state, "worker state changed");
            if let Err(error) = hooks.on_state_changed(state) {
                cell.fail(ForemanError::SetupFailed {
                    details: error.to_string(),
                });
                return true;
            }
            match state {
                WorkerState::Activated => {
                    cell.resolve(host.controller());
                    true
                }
                WorkerState::Redundant => {
                    cell.fail(ForemanError::Redundant);
                    true
                }
                WorkerState::Installing | WorkerState::Waiting => false,
            }
        }
        SetupSignal::UpdateFound => {
            debug!("worker update found");
            // An update discovery counts as a finished setup even though no
            // controlling worker was captured; handle reads report
            // `handle-unavailable` afterwards.
            match hooks.on_update_found() {
                Err(error) => {
                    cell.fail(ForemanError::UpdateFailed {
                        details: error.to_string(),
                    });
                }
                Ok(()) => {
                    cell.resolve(None);
                }
            }
            true
        }
    }
}
