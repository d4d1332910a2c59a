//! In-process worker host
//!
//! Runs registered worker programs as local tasks. Useful wherever no
//! native worker facility exists: the setup lifecycle, port semantics, and
//! message delivery all behave like the real thing, backed by channels.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::{Registration, RegisteredWorker, SetupSignal, WorkerHost};
use crate::error::ForemanError;
use crate::worker::{OutboundPort, SpawnOptions, WorkerHandle, WorkerKind, WorkerState};

/// Message-driven worker body run by the in-process host.
#[async_trait]
pub trait WorkerProgram: Send + Sync + 'static {
    /// Consume the worker inbox until it closes.
    async fn run(self: Arc<Self>, inbox: mpsc::UnboundedReceiver<Value>);
}

/// Adapter running a plain function for every delivered message.
pub struct MessageFn<F>(F);

impl<F> MessageFn<F>
where
    F: Fn(Value) + Send + Sync + 'static,
{
    pub fn new(handler: F) -> Self {
        Self(handler)
    }
}

#[async_trait]
impl<F> WorkerProgram for MessageFn<F>
where
    F: Fn(Value) + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<Value>) {
        while let Some(message) = inbox.recv().await {
            (self.0)(message);
        }
    }
}

/// Port state: shared-worker ports buffer until started.
enum PortState {
    Buffering(Vec<Value>),
    Open,
}

/// Channel-backed outbound port.
struct ChannelPort {
    tx: mpsc::UnboundedSender<Value>,
    state: Mutex<PortState>,
}

impl ChannelPort {
    fn open(tx: mpsc::UnboundedSender<Value>) -> Self {
        Self {
            tx,
            state: Mutex::new(PortState::Open),
        }
    }

    fn buffering(tx: mpsc::UnboundedSender<Value>) -> Self {
        Self {
            tx,
            state: Mutex::new(PortState::Buffering(Vec::new())),
        }
    }
}

impl OutboundPort for ChannelPort {
    fn post(&self, message: Value) -> Result<(), ForemanError> {
        let mut state = self.state.lock();
        match &mut *state {
            PortState::Buffering(queue) => {
                queue.push(message);
                Ok(())
            }
            PortState::Open => self
                .tx
                .send(message)
                .map_err(|_| ForemanError::ChannelClosed),
        }
    }

    fn start(&self) {
        let mut state = self.state.lock();
        if let PortState::Buffering(queue) = &mut *state {
            for message in queue.drain(..) {
                let _ = self.tx.send(message);
            }
            *state = PortState::Open;
        }
    }
}

/// Host running workers as in-process tasks.
///
/// Worker programs are registered per URL. Must be used from within a Tokio
/// runtime; worker bodies run as spawned tasks on it.
#[derive(Default)]
pub struct InProcessHost {
    programs: DashMap<String, Arc<dyn WorkerProgram>>,
    controller: Arc<Mutex<Option<WorkerHandle>>>,
}

impl InProcessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the program backing `url`, replacing any previous one.
    pub fn register_program(&self, url: impl Into<String>, program: Arc<dyn WorkerProgram>) {
        self.programs.insert(url.into(), program);
    }

    /// Builder-style variant of [`InProcessHost::register_program`].
    pub fn with_program(self, url: impl Into<String>, program: Arc<dyn WorkerProgram>) -> Self {
        self.register_program(url, program);
        self
    }

    fn program(&self, url: &str) -> Option<Arc<dyn WorkerProgram>> {
        self.programs.get(url).map(|entry| Arc::clone(entry.value()))
    }
}

#[async_trait]
impl WorkerHost for InProcessHost {
    fn supports(&self, _kind: WorkerKind) -> bool {
        true
    }

    async fn register(
        &self,
        url: &str,
        scope: Option<&str>,
    ) -> Result<Registration, ForemanError> {
        let program = self.program(url).ok_or_else(|| ForemanError::RegistrationFailed {
            details: format!("no worker script registered for '{url}'"),
        })?;

        debug!(url, ?scope, "registering installable worker");

        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let port: WorkerHandle = Arc::new(ChannelPort::open(inbox_tx));
        let controller = Arc::clone(&self.controller);

        // Simulated lifecycle. The controller slot is published before the
        // activation signal so it is readable by the time setup observes it.
        tokio::spawn(async move {
            let _ = signal_tx.send(SetupSignal::StateChanged {
                state: WorkerState::Waiting,
            });
            tokio::task::yield_now().await;

            *controller.lock() = Some(Arc::clone(&port));
            tokio::spawn(program.run(inbox));

            let _ = signal_tx.send(SetupSignal::StateChanged {
                state: WorkerState::Activated,
            });
        });

        Ok(Registration {
            active: None,
            installing: Some(RegisteredWorker {
                state: WorkerState::Installing,
            }),
            waiting: None,
            signals,
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
        let program = self.program(url).ok_or_else(|| ForemanError::SpawnFailed {
            details: format!("no worker script registered for '{url}'"),
        })?;

        debug!(url, name = ?options.name, "constructing shared worker");

        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        tokio::spawn(program.run(inbox));
        Ok(Arc::new(ChannelPort::buffering(inbox_tx)))
    }

    fn spawn_dedicated(
        &self,
        url: &str,
        options: &SpawnOptions,
    ) -> Result<WorkerHandle, ForemanError> {
        let program = self.program(url).ok_or_else(|| ForemanError::SpawnFailed {
            details: format!("no worker script registered for '{url}'"),
        })?;

        debug!(url, name = ?options.name, "constructing dedicated worker");

        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        tokio::spawn(program.run(inbox));
        Ok(Arc::new(ChannelPort::open(inbox_tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn buffering_port_releases_on_start() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let port = ChannelPort::buffering(tx);

        port.post(json!({"seq": 1})).unwrap();
        port.post(json!({"seq": 2})).unwrap();
        assert!(rx.try_recv().is_err(), "messages must buffer until start");

        port.start();
        assert_eq!(rx.try_recv().unwrap(), json!({"seq": 1}));
        assert_eq!(rx.try_recv().unwrap(), json!({"seq": 2}));
    }

    #[tokio::test]
    async fn open_port_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let port = ChannelPort::open(tx);
        drop(rx);

        let error = port.post(json!(null)).unwrap_err();
        assert_eq!(error, ForemanError::ChannelClosed);
    }
}
