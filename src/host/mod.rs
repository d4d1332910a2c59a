//! Host capability surface consumed by the coordinator
//!
//! A [`WorkerHost`] answers capability checks and constructs workers.
//! Two implementations ship with the crate:
//!
//! - [`InProcessHost`] - runs worker programs as local tasks
//! - [`MockHost`] - scriptable host for test suites

mod local;
mod mock;

pub use local::{InProcessHost, MessageFn, WorkerProgram};
pub use mock::{MockHost, MockPort, RegistrationScript};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ForemanError;
use crate::worker::{SpawnOptions, WorkerHandle, WorkerKind, WorkerState};

/// Signals observed while an installable worker goes through setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetupSignal {
    /// The tracked worker moved to a new lifecycle state.
    StateChanged { state: WorkerState },
    /// The registration discovered a new incoming worker version.
    UpdateFound,
}

/// A worker instance attached to a registration slot.
#[derive(Debug, Clone)]
pub struct RegisteredWorker {
    /// Lifecycle state at the time the registration was inspected.
    pub state: WorkerState,
}

/// Outcome of registering an installable worker.
///
/// Carries the three inspection slots plus the lifecycle signal stream for
/// the tracked worker and its registration. The receiver is consumed by the
/// coordinator; dropping it detaches the observers.
pub struct Registration {
    /// Worker currently serving the scope.
    pub active: Option<RegisteredWorker>,
    /// Worker still installing.
    pub installing: Option<RegisteredWorker>,
    /// Worker installed and waiting to take over.
    pub waiting: Option<RegisteredWorker>,
    /// Lifecycle signals for the tracked worker and its registration.
    pub signals: mpsc::UnboundedReceiver<SetupSignal>,
}

impl Registration {
    /// The worker instance setup tracks: active, else installing, else
    /// waiting.
    pub fn tracked(&self) -> Option<&RegisteredWorker> {
        self.active
            .as_ref()
            .or(self.installing.as_ref())
            .or(self.waiting.as_ref())
    }
}

/// Capabilities a worker host exposes to the coordinator.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Whether the host provides the native facility for the given kind.
    fn supports(&self, kind: WorkerKind) -> bool;

    /// Register an installable worker at `url`, optionally bound to a
    /// scope.
    async fn register(
        &self,
        url: &str,
        scope: Option<&str>,
    ) -> Result<Registration, ForemanError>;

    /// Worker currently controlling this client, if any.
    fn controller(&self) -> Option<WorkerHandle>;

    /// Construct a shared worker and return its not-yet-started port.
    fn spawn_shared(
        &self,
        url: &str,
        options: &SpawnOptions,
    ) -> Result<WorkerHandle, ForemanError>;

    /// Construct a dedicated worker.
    fn spawn_dedicated(
        &self,
        url: &str,
        options: &SpawnOptions,
    ) -> Result<WorkerHandle, ForemanError>;
}
