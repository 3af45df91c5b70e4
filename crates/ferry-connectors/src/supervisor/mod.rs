//! Lazy lifecycle management for connector worker processes.
//!
//! The [`ProcessSupervisor`] owns the table of running instances, keyed by
//! connector name. A worker is started the first time its connector is
//! requested and reused until it is observed to exit, at which point the
//! next request starts a replacement. Concurrent first requests for the same
//! name are serialised on the table's write lock so exactly one process is
//! spawned.
//!
//! The readiness grace that follows a spawn is waited out after the write
//! lock is released, so requests for other connectors are never blocked by
//! a worker that is still starting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::{Duration, Instant};
use std::{fmt, io};

use tracing::{debug, info, warn};

use crate::definition::ConnectorDefinition;
use crate::error::ConnectorError;
use crate::process::{Liveness, ProcessLauncher, WorkerProcess, resolve_executable};
use crate::settings::ManagerSettings;
use crate::store::DefinitionStore;

/// Tracing target for supervisor operations.
const SUPERVISOR_TARGET: &str = "ferry_connectors::supervisor";

/// Interval between liveness checks while waiting for a worker to exit.
const TERMINATION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Externally observable state of a connector's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// No worker has been started, or it was shut down.
    Absent,
    /// The worker was spawned and its readiness grace has not elapsed.
    Starting,
    /// The worker is alive and past its readiness grace.
    Running,
    /// The worker exited; it will be replaced on the next request.
    Exited {
        /// Exit code, when the process exited normally.
        code: Option<i32>,
    },
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::Starting => f.write_str("starting"),
            Self::Running => f.write_str("running"),
            Self::Exited { code: Some(code) } => write!(f, "exited ({code})"),
            Self::Exited { code: None } => f.write_str("exited (signal)"),
        }
    }
}

#[derive(Debug)]
enum Lifecycle {
    Live(Box<dyn WorkerProcess>),
    Exited { code: Option<i32> },
}

/// A started worker process and the bookkeeping needed to talk to it.
#[derive(Debug)]
pub struct RunningInstance {
    definition: Arc<ConnectorDefinition>,
    pid: u32,
    ready_at: Instant,
    lifecycle: Mutex<Lifecycle>,
    invocation: Mutex<()>,
}

impl RunningInstance {
    fn new(
        definition: Arc<ConnectorDefinition>,
        process: Box<dyn WorkerProcess>,
        ready_at: Instant,
    ) -> Self {
        Self {
            definition,
            pid: process.id(),
            ready_at,
            lifecycle: Mutex::new(Lifecycle::Live(process)),
            invocation: Mutex::new(()),
        }
    }

    /// Returns the connector name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Returns the definition the worker was started from.
    #[must_use]
    pub fn definition(&self) -> &ConnectorDefinition {
        &self.definition
    }

    /// Returns the OS process id.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns the port the worker listens on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.definition.port()
    }

    /// Checks the worker without blocking and reports its state.
    #[must_use]
    pub fn state(&self) -> InstanceState {
        let mut lifecycle = self.lock_lifecycle();
        let polled = match &mut *lifecycle {
            Lifecycle::Exited { code } => return InstanceState::Exited { code: *code },
            Lifecycle::Live(process) => process.poll(),
        };

        match polled {
            Ok(Liveness::Running) => self.running_state(),
            Ok(Liveness::Exited { code }) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    connector = self.name(),
                    pid = self.pid,
                    ?code,
                    "connector process exited"
                );
                *lifecycle = Lifecycle::Exited { code };
                InstanceState::Exited { code }
            }
            Err(error) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    connector = self.name(),
                    pid = self.pid,
                    %error,
                    "could not poll connector process; assuming it is alive"
                );
                self.running_state()
            }
        }
    }

    /// Returns `true` until the worker has been observed to exit.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        matches!(
            self.state(),
            InstanceState::Starting | InstanceState::Running
        )
    }

    fn running_state(&self) -> InstanceState {
        if Instant::now() < self.ready_at {
            InstanceState::Starting
        } else {
            InstanceState::Running
        }
    }

    /// Blocks until the readiness grace that followed the spawn has elapsed.
    pub(crate) fn await_readiness(&self) {
        let remaining = self.ready_at.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            debug!(
                target: SUPERVISOR_TARGET,
                connector = self.name(),
                wait_ms = remaining.as_millis(),
                "waiting for connector readiness"
            );
            thread::sleep(remaining);
        }
    }

    /// Serialises request/response exchanges with this worker.
    pub(crate) fn lock_invocation(&self) -> MutexGuard<'_, ()> {
        self.invocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Interrupts the worker, kills it if it outlives `grace`, and reaps it.
    fn terminate(&self, grace: Duration) -> Result<(), ConnectorError> {
        let mut lifecycle = self.lock_lifecycle();
        let Lifecycle::Live(process) = &mut *lifecycle else {
            return Ok(());
        };

        let liveness = stop_process(process.as_mut(), self.name(), grace).map_err(|source| {
            ConnectorError::Terminate {
                name: self.name().to_owned(),
                pid: self.pid,
                source: Arc::new(source),
            }
        })?;
        let code = match liveness {
            Liveness::Exited { code } => code,
            Liveness::Running => None,
        };
        info!(
            target: SUPERVISOR_TARGET,
            connector = self.name(),
            pid = self.pid,
            ?code,
            "connector process stopped"
        );
        *lifecycle = Lifecycle::Exited { code };
        Ok(())
    }
}

fn stop_process(
    process: &mut dyn WorkerProcess,
    name: &str,
    grace: Duration,
) -> io::Result<Liveness> {
    let current = process.poll()?;
    if matches!(current, Liveness::Exited { .. }) {
        return Ok(current);
    }

    match process.interrupt() {
        Ok(()) => {
            if let Some(exited) = wait_for_exit(process, grace)? {
                return Ok(exited);
            }
            warn!(
                target: SUPERVISOR_TARGET,
                connector = name,
                pid = process.id(),
                grace_ms = grace.as_millis(),
                "connector ignored interrupt; killing"
            );
        }
        Err(error) => {
            warn!(
                target: SUPERVISOR_TARGET,
                connector = name,
                pid = process.id(),
                %error,
                "could not interrupt connector; killing"
            );
        }
    }

    process.kill()?;
    process.wait()
}

fn wait_for_exit(process: &mut dyn WorkerProcess, grace: Duration) -> io::Result<Option<Liveness>> {
    let started = Instant::now();
    loop {
        let liveness = process.poll()?;
        if matches!(liveness, Liveness::Exited { .. }) {
            return Ok(Some(liveness));
        }
        let elapsed = started.elapsed();
        if elapsed >= grace {
            return Ok(None);
        }
        thread::sleep(TERMINATION_POLL_INTERVAL.min(grace.saturating_sub(elapsed)));
    }
}

/// Starts, tracks, and stops connector workers.
pub struct ProcessSupervisor<L> {
    store: Arc<DefinitionStore>,
    launcher: L,
    settings: ManagerSettings,
    instances: RwLock<HashMap<String, Arc<RunningInstance>>>,
}

impl<L> fmt::Debug for ProcessSupervisor<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("settings", &self.settings)
            .field("instances", &self.read_instances().len())
            .finish_non_exhaustive()
    }
}

impl<L> ProcessSupervisor<L> {
    /// Creates a supervisor with an empty instance table.
    #[must_use]
    pub fn new(store: Arc<DefinitionStore>, launcher: L, settings: ManagerSettings) -> Self {
        Self {
            store,
            launcher,
            settings,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the definitions this supervisor can start.
    #[must_use]
    pub fn definitions(&self) -> &DefinitionStore {
        &self.store
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Returns the launcher used to start workers.
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Returns the recorded instance for `name`, if any.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<Arc<RunningInstance>> {
        self.read_instances().get(name).cloned()
    }

    /// Reports the state of the worker for `name`.
    #[must_use]
    pub fn state(&self, name: &str) -> InstanceState {
        self.instance(name)
            .map_or(InstanceState::Absent, |instance| instance.state())
    }

    /// Counts the recorded workers that have not been observed to exit.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.read_instances()
            .values()
            .filter(|instance| instance.is_alive())
            .count()
    }

    /// Stops every recorded worker and empties the table.
    ///
    /// Each worker is interrupted, given the configured grace period to exit,
    /// then killed if still alive. Failures are logged and do not stop the
    /// remaining workers from being shut down. Calling this again is a no-op.
    ///
    /// Returns the number of instances that were removed from the table.
    pub fn shutdown_all(&self) -> usize {
        let mut instances = self.write_instances();
        let drained: Vec<Arc<RunningInstance>> =
            instances.drain().map(|(_, instance)| instance).collect();
        if drained.is_empty() {
            return 0;
        }

        info!(
            target: SUPERVISOR_TARGET,
            instances = drained.len(),
            "shutting down connector processes"
        );
        for instance in &drained {
            if let Err(error) = instance.terminate(self.settings.shutdown_grace()) {
                warn!(
                    target: SUPERVISOR_TARGET,
                    connector = instance.name(),
                    pid = instance.pid(),
                    %error,
                    "failed to stop connector process"
                );
            }
        }
        drained.len()
    }

    fn read_instances(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<RunningInstance>>> {
        self.instances.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_instances(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<RunningInstance>>> {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: ProcessLauncher> ProcessSupervisor<L> {
    /// Returns a live instance for `name`, starting the worker if needed.
    ///
    /// A freshly started worker is only returned once its readiness grace
    /// has elapsed. Failures record nothing, so the next call retries.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::DefinitionNotFound`],
    /// [`ConnectorError::ExecutableNotFound`], or
    /// [`ConnectorError::SpawnFailed`] when the worker cannot be started.
    pub fn ensure_running(&self, name: &str) -> Result<Arc<RunningInstance>, ConnectorError> {
        let existing = self
            .read_instances()
            .get(name)
            .filter(|instance| instance.is_alive())
            .cloned();

        let instance = match existing {
            Some(instance) => instance,
            None => self.start_or_reuse(name)?,
        };
        instance.await_readiness();
        Ok(instance)
    }

    fn start_or_reuse(&self, name: &str) -> Result<Arc<RunningInstance>, ConnectorError> {
        let mut instances = self.write_instances();
        if let Some(instance) = instances.get(name).filter(|instance| instance.is_alive()) {
            return Ok(Arc::clone(instance));
        }
        if let Some(stale) = instances.remove(name) {
            info!(
                target: SUPERVISOR_TARGET,
                connector = name,
                pid = stale.pid(),
                state = %stale.state(),
                "replacing exited connector process"
            );
        }

        let instance = Arc::new(self.spawn(name)?);
        instances.insert(name.to_owned(), Arc::clone(&instance));
        Ok(instance)
    }

    fn spawn(&self, name: &str) -> Result<RunningInstance, ConnectorError> {
        let definition = self.store.lookup(name)?;
        let executable = resolve_executable(&definition, self.settings.connectors_dir())?;
        let process = self.launcher.launch(&definition, &executable)?;

        let now = Instant::now();
        let ready_at = now
            .checked_add(self.settings.readiness_delay())
            .unwrap_or(now);
        let instance = RunningInstance::new(definition, process, ready_at);
        info!(
            target: SUPERVISOR_TARGET,
            connector = name,
            pid = instance.pid(),
            port = instance.port(),
            executable = %executable.display(),
            "started connector process"
        );
        Ok(instance)
    }
}

impl<L> Drop for ProcessSupervisor<L> {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
