//! Worker execution models, lifecycle states, and live handles

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ForemanError;

/// Worker hosting strategies supported by a host.
///
/// Exactly one kind is selected per coordinator, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerKind {
    /// Installable worker registered against a scope. Registration is
    /// asynchronous and goes through a lifecycle before activation.
    Installable,
    /// Worker shared between clients, reached through a port.
    Shared,
    /// Dedicated worker owned by a single client.
    Dedicated,
}

impl WorkerKind {
    /// Default preference order used when the caller accepts any kind.
    pub const PREFERENCE: [WorkerKind; 3] = [
        WorkerKind::Installable,
        WorkerKind::Shared,
        WorkerKind::Dedicated,
    ];
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Installable => write!(f, "installable-worker"),
            WorkerKind::Shared => write!(f, "shared-worker"),
            WorkerKind::Dedicated => write!(f, "dedicated-worker"),
        }
    }
}

/// Lifecycle states reported for an installable worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Waiting,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Waiting => write!(f, "waiting"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Outbound message channel of a live worker.
///
/// Shared-worker ports buffer messages until [`OutboundPort::start`] is
/// called; for the other kinds `start` is a no-op.
pub trait OutboundPort: Send + Sync {
    /// Deliver a message to the worker.
    fn post(&self, message: Value) -> Result<(), ForemanError>;

    /// Open the channel. Only meaningful for shared-worker ports.
    fn start(&self) {}
}

/// Cloneable handle used to send messages once setup completed.
pub type WorkerHandle = Arc<dyn OutboundPort>;

/// Options forwarded to the host when constructing a worker.
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Worker name, when the caller provided one.
    pub name: Option<String>,
    /// Send credentials along with the worker script request.
    pub credentials_include: bool,
}
