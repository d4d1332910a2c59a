//! Foreman - worker setup coordination and in-memory storage fallback

pub mod coordinator;
pub mod error;
pub mod host;
pub mod options;
pub mod setup;
pub mod store;
pub mod worker;

pub use coordinator::{AcceptAll, SetupHooks, WorkerCoordinator};
pub use error::ForemanError;
pub use host::{
    InProcessHost, MessageFn, MockHost, MockPort, Registration, RegisteredWorker,
    RegistrationScript, SetupSignal, WorkerHost, WorkerProgram,
};
pub use options::{SetupOptions, DEFAULT_SETUP_TIMEOUT};
pub use setup::{SetupCell, SetupPhase};
pub use store::{IterateCallback, MemoryDriver, MemoryStore, StorageDriver};
pub use worker::{OutboundPort, SpawnOptions, WorkerHandle, WorkerKind, WorkerState};
