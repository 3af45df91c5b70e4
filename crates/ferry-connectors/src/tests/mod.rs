//! Crate-level test doubles and BDD tests.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use ferry_protocol::{MessageContext, Value};
use ferry_worker::{ConnectorServer, OperationTable, ServerHandle};
use tempfile::TempDir;

use crate::definition::ConnectorDefinition;
use crate::error::ConnectorError;
use crate::process::{Liveness, ProcessLauncher, WorkerProcess};
use crate::settings::ManagerSettings;
use crate::store::DefinitionStore;


/// Executable name every fake definition points at.
pub(crate) const FAKE_EXECUTABLE: &str = "fake-connector";

/// Shared, inspectable state of one fake worker process.
#[derive(Debug, Default)]
pub(crate) struct FakeState {
    exit: Mutex<Option<Option<i32>>>,
    interrupts: AtomicUsize,
    kills: AtomicUsize,
    ignore_interrupt: AtomicBool,
}

impl FakeState {
    /// Simulates the process exiting on its own.
    pub(crate) fn exit_with(&self, code: Option<i32>) {
        *self.exit.lock().unwrap_or_else(PoisonError::into_inner) = Some(code);
    }

    pub(crate) fn has_exited(&self) -> bool {
        self.exit_code().is_some()
    }

    fn exit_code(&self) -> Option<Option<i32>> {
        *self.exit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub(crate) fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FakeProcess {
    pid: u32,
    state: Arc<FakeState>,
}

impl WorkerProcess for FakeProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn poll(&mut self) -> std::io::Result<Liveness> {
        Ok(self
            .state
            .exit_code()
            .map_or(Liveness::Running, |code| Liveness::Exited { code }))
    }

    fn interrupt(&mut self) -> std::io::Result<()> {
        self.state.interrupts.fetch_add(1, Ordering::SeqCst);
        if !self.state.ignore_interrupt.load(Ordering::SeqCst) {
            self.state.exit_with(None);
        }
        Ok(())
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.state.kills.fetch_add(1, Ordering::SeqCst);
        self.state.exit_with(None);
        Ok(())
    }

    fn wait(&mut self) -> std::io::Result<Liveness> {
        if !self.state.has_exited() {
            self.state.exit_with(None);
        }
        self.poll()
    }
}

/// Launcher that records every spawn without starting real processes.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeLauncher {
    spawned: Arc<Mutex<Vec<Arc<FakeState>>>>,
    ignore_interrupt: bool,
    spawn_delay: Duration,
}

impl FakeLauncher {
    /// Launched processes ignore SIGINT and must be killed.
    pub(crate) fn stubborn() -> Self {
        Self {
            ignore_interrupt: true,
            ..Self::default()
        }
    }

    /// Each launch sleeps first, widening the window for racing callers.
    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            spawn_delay: delay,
            ..Self::default()
        }
    }

    pub(crate) fn spawn_count(&self) -> usize {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn process(&self, index: usize) -> Arc<FakeState> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
            .expect("no process launched at index")
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &self,
        _definition: &ConnectorDefinition,
        _executable: &Path,
    ) -> Result<Box<dyn WorkerProcess>, ConnectorError> {
        if !self.spawn_delay.is_zero() {
            thread::sleep(self.spawn_delay);
        }
        let state = Arc::new(FakeState::default());
        state
            .ignore_interrupt
            .store(self.ignore_interrupt, Ordering::SeqCst);
        let mut spawned = self.spawned.lock().unwrap_or_else(PoisonError::into_inner);
        spawned.push(Arc::clone(&state));
        let pid = 40_000 + u32::try_from(spawned.len()).expect("pid fits");
        Ok(Box::new(FakeProcess { pid, state }))
    }
}

/// Creates a connectors directory containing the fake executable.
pub(crate) fn connectors_dir() -> TempDir {
    let dir = TempDir::new().expect("create connectors dir");
    fs::write(dir.path().join(FAKE_EXECUTABLE), b"").expect("write fake executable");
    dir
}

/// Settings with no readiness delay and a short shutdown grace.
pub(crate) fn fast_settings(dir: &TempDir) -> ManagerSettings {
    ManagerSettings::new(dir.path())
        .with_readiness_delay(Duration::ZERO)
        .with_connect_timeout(Duration::from_secs(2))
        .with_shutdown_grace(Duration::from_millis(100))
}

/// Builds a store holding one fake definition per `(name, port)` pair.
pub(crate) fn fake_store(entries: &[(&str, u16)]) -> Arc<DefinitionStore> {
    Arc::new(DefinitionStore::from_definitions(entries.iter().map(
        |(name, port)| ConnectorDefinition::new(*name, FAKE_EXECUTABLE, *port),
    )))
}

/// Operation table used by in-process workers.
///
/// * `echo` returns the input context unchanged.
/// * `config` records the effective configuration as the `config` property.
/// * `fail` reports a business failure.
pub(crate) fn test_operations() -> OperationTable {
    OperationTable::new()
        .with_operation("echo", |request| Ok(request.message_context().clone()))
        .with_operation("config", |request| {
            Ok(request.message_context().clone().with_property(
                "config",
                Value::Map(request.connector_config().clone()),
            ))
        })
        .with_operation("fail", |_request| Err(String::from("file not found")))
}

/// Starts an in-process worker on an ephemeral loopback port.
pub(crate) fn start_worker() -> ServerHandle {
    ConnectorServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        .expect("bind worker")
        .start(test_operations())
        .expect("start worker")
}

/// Builds a context with the given id and a small payload.
pub(crate) fn context(id: &str) -> MessageContext {
    MessageContext::new(id).with_payload(format!("payload for {id}").into_bytes())
}
