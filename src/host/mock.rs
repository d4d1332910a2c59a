//! Mock host for testing
//!
//! Answers capability checks from a configurable set, serves scripted
//! registrations (FIFO), and records every call for assertions. No real
//! worker is ever constructed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Registration, RegisteredWorker, SetupSignal, WorkerHost};
use crate::error::ForemanError;
use crate::worker::{OutboundPort, SpawnOptions, WorkerHandle, WorkerKind, WorkerState};

/// Scripted outcome for one `register` call.
///
/// Slot fields mirror the registration inspection slots; the signal
/// receiver is handed to the coordinator while the test keeps the sender.
pub struct RegistrationScript {
    pub active: Option<WorkerState>,
    pub installing: Option<WorkerState>,
    pub waiting: Option<WorkerState>,
    pub signals: mpsc::UnboundedReceiver<SetupSignal>,
}

impl RegistrationScript {
    /// Registration with an installing worker; returns the signal sender
    /// the test drives the lifecycle with.
    pub fn installing() -> (Self, mpsc::UnboundedSender<SetupSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                active: None,
                installing: Some(WorkerState::Installing),
                waiting: None,
                signals: rx,
            },
            tx,
        )
    }

    /// Registration with an already-active worker.
    pub fn active() -> (Self, mpsc::UnboundedSender<SetupSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                active: Some(WorkerState::Activated),
                installing: None,
                waiting: None,
                signals: rx,
            },
            tx,
        )
    }

    /// Registration that produced no worker instance in any slot.
    pub fn empty() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self {
            active: None,
            installing: None,
            waiting: None,
            signals: rx,
        }
    }
}

/// Recording port returned by mock spawns and used as a mock controller.
#[derive(Default)]
pub struct MockPort {
    posted: Mutex<Vec<Value>>,
    started: AtomicBool,
}

impl MockPort {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Messages posted through this port, in order.
    pub fn posted(&self) -> Vec<Value> {
        self.posted.lock().clone()
    }

    /// Whether `start` was called at least once.
    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

impl OutboundPort for MockPort {
    fn post(&self, message: Value) -> Result<(), ForemanError> {
        self.posted.lock().push(message);
        Ok(())
    }

    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }
}

/// Mock host with configurable capabilities and scripted registrations.
pub struct MockHost {
    supported: Vec<WorkerKind>,
    scripts: Mutex<VecDeque<RegistrationScript>>,
    /// Recorded `register` calls: (url, scope)
    registered: Mutex<Vec<(String, Option<String>)>>,
    /// Recorded spawn calls: (kind, url, options)
    spawned: Mutex<Vec<(WorkerKind, String, SpawnOptions)>>,
    controller: Mutex<Option<WorkerHandle>>,
    last_port: Mutex<Option<Arc<MockPort>>>,
}

impl MockHost {
    /// Host supporting every worker kind.
    pub fn new() -> Self {
        Self::supporting(WorkerKind::PREFERENCE)
    }

    /// Host supporting exactly the given kinds.
    pub fn supporting(kinds: impl IntoIterator<Item = WorkerKind>) -> Self {
        Self {
            supported: kinds.into_iter().collect(),
            scripts: Mutex::new(VecDeque::new()),
            registered: Mutex::new(Vec::new()),
            spawned: Mutex::new(Vec::new()),
            controller: Mutex::new(None),
            last_port: Mutex::new(None),
        }
    }

    /// Queue a scripted registration outcome (FIFO).
    pub fn queue_registration(&self, script: RegistrationScript) {
        self.scripts.lock().push_back(script);
    }

    /// Set the worker reported as controlling this client.
    pub fn set_controller(&self, handle: WorkerHandle) {
        *self.controller.lock() = Some(handle);
    }

    /// All `register` calls made so far: (url, scope).
    pub fn registrations(&self) -> Vec<(String, Option<String>)> {
        self.registered.lock().clone()
    }

    /// All spawn calls made so far: (kind, url, options).
    pub fn spawns(&self) -> Vec<(WorkerKind, String, SpawnOptions)> {
        self.spawned.lock().clone()
    }

    /// Port handed out by the most recent spawn.
    pub fn last_port(&self) -> Option<Arc<MockPort>> {
        self.last_port.lock().clone()
    }

    fn spawn(&self, kind: WorkerKind, url: &str, options: &SpawnOptions) -> WorkerHandle {
        self.spawned
            .lock()
            .push((kind, url.to_string(), options.clone()));
        let port = MockPort::new();
        *self.last_port.lock() = Some(Arc::clone(&port));
        port
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerHost for MockHost {
    fn supports(&self, kind: WorkerKind) -> bool {
        self.supported.contains(&kind)
    }

    async fn register(
        &self,
        url: &str,
        scope: Option<&str>,
    ) -> Result<Registration, ForemanError> {
        self.registered
            .lock()
            .push((url.to_string(), scope.map(String::from)));

        let script = self.scripts.lock().pop_front().ok_or_else(|| {
            ForemanError::RegistrationFailed {
                details: "no scripted registration queued".into(),
            }
        })?;

        let slot = |state: Option<WorkerState>| state.map(|state| RegisteredWorker { state });
        Ok(Registration {
            active: slot(script.active),
            installing: slot(script.installing),
            waiting: slot(script.waiting),
            signals: script.signals,
        })
    }

    fn controller(&self) -> Option<WorkerHandle> {
        self.controller.lock().clone()
    }

    fn spawn_shared(
        &self,
        url: &str,
        options: &SpawnOptions,
    ) -> Result<WorkerHandle, ForemanError> {
        Ok(self.spawn(WorkerKind::Shared, url, options))
    }

    fn spawn_dedicated(
        &self,
        url: &str,
        options: &SpawnOptions,
    ) -> Result<WorkerHandle, ForemanError> {
        Ok(self.spawn(WorkerKind::Dedicated, url, options))
    }
}
