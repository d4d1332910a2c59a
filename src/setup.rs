//! Single-resolution setup state machine
//!
//! The outcome of a worker setup attempt transitions exactly once from
//! pending to ready or failed. Late timers and stale observers lose the
//! race and become inert instead of resolving a second time.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ForemanError;
use crate::worker::WorkerHandle;

/// Observable phase of a worker setup attempt.
#[derive(Clone, Default)]
pub enum SetupPhase {
    /// Setup is still in flight.
    #[default]
    Pending,
    /// Setup finished. The handle is absent when resolution happened before
    /// a controlling worker was captured.
    Ready(Option<WorkerHandle>),
    /// Setup failed. Terminal; a new coordinator is needed to retry.
    Failed(ForemanError),
}

impl SetupPhase {
    /// True while no resolution has happened.
    pub fn is_pending(&self) -> bool {
        matches!(self, SetupPhase::Pending)
    }
}

impl fmt::Debug for SetupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupPhase::Pending => write!(f, "Pending"),
            SetupPhase::Ready(Some(_)) => write!(f, "Ready(handle)"),
            SetupPhase::Ready(None) => write!(f, "Ready(no handle)"),
            SetupPhase::Failed(error) => write!(f, "Failed({error})"),
        }
    }
}

/// Shared cell holding the setup outcome.
///
/// Cloning the cell shares the same underlying state. Only the first
/// transition out of `Pending` wins; every later attempt reports a lost
/// race through its return value and changes nothing.
#[derive(Clone, Debug)]
pub struct SetupCell {
    tx: Arc<watch::Sender<SetupPhase>>,
}

impl SetupCell {
    /// Fresh cell in the pending phase.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SetupPhase::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current phase.
    pub fn phase(&self) -> SetupPhase {
        self.tx.borrow().clone()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<SetupPhase> {
        self.tx.subscribe()
    }

    /// Resolve successfully. Returns false if a resolution already won.
    pub fn resolve(&self, handle: Option<WorkerHandle>) -> bool {
        self.transition(SetupPhase::Ready(handle))
    }

    /// Fail the setup. Returns false if a resolution already won.
    pub fn fail(&self, error: ForemanError) -> bool {
        self.transition(SetupPhase::Failed(error))
    }

    fn transition(&self, next: SetupPhase) -> bool {
        let mut next = Some(next);
        let mut won = false;
        self.tx.send_if_modified(|phase| {
            if phase.is_pending() {
                *phase = next.take().expect("transition value consumed once");
                won = true;
                true
            } else {
                false
            }
        });
        won
    }

    /// Wait until the setup resolved, yielding the captured handle or the
    /// stored failure.
    pub async fn wait(&self) -> Result<Option<WorkerHandle>, ForemanError> {
        let mut rx = self.tx.subscribe();
        let phase = rx
            .wait_for(|phase| !phase.is_pending())
            .await
            .expect("setup cell sender held for the wait duration");
        match &*phase {
            SetupPhase::Ready(handle) => Ok(handle.clone()),
            SetupPhase::Failed(error) => Err(error.clone()),
            SetupPhase::Pending => unreachable!("wait_for filters out pending"),
        }
    }
}

impl Default for SetupCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_transition_wins() {
        let cell = SetupCell::new();
        assert!(cell.fail(ForemanError::SetupTimeout));
        assert!(!cell.resolve(None));
        assert!(!cell.fail(ForemanError::Redundant));

        match cell.phase() {
            SetupPhase::Failed(error) => assert_eq!(error, ForemanError::SetupTimeout),
            other => panic!("expected failed phase, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wait_observes_resolution() {
        let cell = SetupCell::new();
        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.wait().await })
        };
        assert!(cell.resolve(None));
        let outcome = waiter.await.expect("wait task completes");
        assert!(matches!(outcome, Ok(None)));
    }

    #[tokio::test]
    async fn wait_returns_stored_failure_to_every_caller() {
        let cell = SetupCell::new();
        cell.fail(ForemanError::Redundant);
        assert!(matches!(cell.wait().await, Err(ForemanError::Redundant)));
        assert!(matches!(cell.wait().await, Err(ForemanError::Redundant)));
    }
}
