//! Worker process launching and OS handle management.
//!
//! [`OsLauncher`] implements the [`ProcessLauncher`] trait by spawning the
//! connector executable with its port as the only argument and inheriting
//! the host's standard output and error streams. The returned
//! [`WorkerProcess`] handle is the only place that touches the raw OS child;
//! the supervisor centralises every liveness check through it.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;

use tracing::debug;

use crate::definition::ConnectorDefinition;
use crate::error::ConnectorError;

/// Tracing target for worker process operations.
const PROCESS_TARGET: &str = "ferry_connectors::process";

/// Observed liveness of a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The process has not been observed to exit.
    Running,
    /// The process exited; `code` is `None` when it was killed by a signal.
    Exited {
        /// Exit code, when the process exited normally.
        code: Option<i32>,
    },
}

impl Liveness {
    fn from_status(status: ExitStatus) -> Self {
        Self::Exited {
            code: status.code(),
        }
    }
}

/// Handle to a launched worker process.
pub trait WorkerProcess: Send + fmt::Debug {
    /// Returns the OS process id.
    fn id(&self) -> u32;

    /// Checks for exit without blocking, reaping the process if it exited.
    ///
    /// # Errors
    ///
    /// Returns the underlying OS error if the status cannot be queried.
    fn poll(&mut self) -> io::Result<Liveness>;

    /// Requests graceful termination (SIGINT on unix).
    ///
    /// # Errors
    ///
    /// Returns an error when the signal cannot be delivered or graceful
    /// termination is unsupported on this platform.
    fn interrupt(&mut self) -> io::Result<()>;

    /// Forcefully terminates the process.
    ///
    /// # Errors
    ///
    /// Returns the underlying OS error if the kill fails.
    fn kill(&mut self) -> io::Result<()>;

    /// Blocks until the process exits and reaps it.
    ///
    /// # Errors
    ///
    /// Returns the underlying OS error if waiting fails.
    fn wait(&mut self) -> io::Result<Liveness>;
}

/// Trait abstracting worker process creation for testability.
///
/// The production implementation is [`OsLauncher`]. Tests can implement this
/// trait to count spawns or inject launch failures without starting real
/// processes.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLauncher: Send + Sync {
    /// Starts the worker for `definition` from the resolved `executable`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::SpawnFailed`] if the process cannot be
    /// started.
    fn launch(
        &self,
        definition: &ConnectorDefinition,
        executable: &Path,
    ) -> Result<Box<dyn WorkerProcess>, ConnectorError>;
}

/// Launches workers as child processes of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsLauncher;

impl ProcessLauncher for OsLauncher {
    fn launch(
        &self,
        definition: &ConnectorDefinition,
        executable: &Path,
    ) -> Result<Box<dyn WorkerProcess>, ConnectorError> {
        let mut command = Command::new(executable);
        command.arg(port_argument(definition.port()));
        command.stdin(Stdio::null());
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());

        debug!(
            target: PROCESS_TARGET,
            connector = definition.name(),
            executable = %executable.display(),
            port = definition.port(),
            "spawning connector process"
        );

        let child = command
            .spawn()
            .map_err(|source| ConnectorError::SpawnFailed {
                name: definition.name().to_owned(),
                message: format!("could not execute {}", executable.display()),
                source: Some(Arc::new(source)),
            })?;
        Ok(Box::new(ChildProcess { child }))
    }
}

/// Formats the port argument passed to every worker.
#[must_use]
pub fn port_argument(port: u16) -> String {
    format!("--port={port}")
}

/// Resolves a definition's executable against the connectors directory.
///
/// Relative paths are joined onto `connectors_dir`. When the resulting path
/// does not exist, the platform executable suffix (`.exe` on Windows) is
/// tried before giving up.
///
/// # Errors
///
/// Returns [`ConnectorError::ExecutableNotFound`] if no candidate exists.
pub fn resolve_executable(
    definition: &ConnectorDefinition,
    connectors_dir: &Path,
) -> Result<PathBuf, ConnectorError> {
    let candidate = connectors_dir.join(definition.executable());
    if candidate.is_file() {
        return Ok(candidate);
    }

    let suffix = std::env::consts::EXE_SUFFIX;
    if !suffix.is_empty() {
        let mut with_suffix = candidate.clone().into_os_string();
        with_suffix.push(suffix);
        let with_suffix = PathBuf::from(with_suffix);
        if with_suffix.is_file() {
            return Ok(with_suffix);
        }
    }

    Err(ConnectorError::ExecutableNotFound {
        name: definition.name().to_owned(),
        path: candidate,
    })
}

/// [`WorkerProcess`] backed by a [`std::process::Child`].
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    /// Wraps an already spawned child.
    #[must_use]
    pub const fn new(child: Child) -> Self {
        Self { child }
    }
}

impl WorkerProcess for ChildProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn poll(&mut self) -> io::Result<Liveness> {
        Ok(self
            .child
            .try_wait()?
            .map_or(Liveness::Running, Liveness::from_status))
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> io::Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let pid = i32::try_from(self.child.id())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        kill(Pid::from_raw(pid), Signal::SIGINT).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "graceful interrupt is not supported on this platform",
        ))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn wait(&mut self) -> io::Result<Liveness> {
        self.child.wait().map(Liveness::from_status)
    }
}
