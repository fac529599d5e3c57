//! Program execution and output capture.
//!
//! The runner never knows how a fixture is compiled; it only spawns an [`Invocation`] and collects an
//! [`ExecutionResult`]. [`ProgramExecutor`] is the seam for substituting another strategy (tests use a canned
//! executor).

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Exit codes a POSIX shell uses when it could not start the requested command.
const SHELL_NOT_EXECUTABLE: i32 = 126;
const SHELL_NOT_FOUND: i32 = 127;

/// How often a timed invocation polls its child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why a program could not be run to completion.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("shell could not launch '{command}' (exit {code}){}", stderr_suffix(.stderr))]
    NotLaunched { command: String, code: i32, stderr: String },

    #[error("'{program}' timed out after {:.1}s", .timeout.as_secs_f64())]
    TimedOut { program: String, timeout: Duration },

    #[error("failed while waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Exited(i32),
    /// Killed by a signal (the number, where the platform reports one).
    Signaled(Option<i32>),
}

impl ExitState {
    pub fn success(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitState::Exited(code),
            None => ExitState::Signaled(signal_of(status)),
        }
    }
}

impl std::fmt::Display for ExitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitState::Exited(code) => write!(f, "exit code {code}"),
            ExitState::Signaled(Some(sig)) => write!(f, "signal {sig}"),
            ExitState::Signaled(None) => write!(f, "terminated by signal"),
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// Captured result of one program run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Standard output split into lines (terminators removed).
    pub stdout_lines: Vec<String>,
    /// Standard error, kept for diagnostics only.
    pub stderr: String,
    pub status: ExitState,
    pub duration: Duration,
}

impl ExecutionResult {
    /// Build a result from raw stdout text.
    pub fn from_output(stdout: &str, stderr: &str, status: ExitState, duration: Duration) -> Self {
        Self {
            stdout_lines: stdout.lines().map(str::to_string).collect(),
            stderr: stderr.to_string(),
            status,
            duration,
        }
    }

    /// A successful run that printed `stdout`.
    pub fn succeeded(stdout: &str) -> Self {
        Self::from_output(stdout, "", ExitState::Exited(0), Duration::ZERO)
    }
}

/// A program to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// Set for commands wrapped by [`Invocation::shell`]; enables shell launch-failure detection.
    pub via_shell: bool,
    /// Human-readable form for logs and errors.
    pub display: String,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref().to_os_string();
        Self {
            display: program.to_string_lossy().into_owned(),
            program,
            args: Vec::new(),
            current_dir: None,
            timeout: None,
            via_shell: false,
        }
    }

    /// Run `command` through the platform shell.
    pub fn shell(command: &str) -> Self {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        let mut invocation = Self::new(shell).arg(flag).arg(command);
        invocation.via_shell = true;
        invocation.display = command.to_string();
        invocation
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        let arg = arg.as_ref().to_os_string();
        if !self.via_shell {
            self.display.push(' ');
            self.display.push_str(&arg.to_string_lossy());
        }
        self.args.push(arg);
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Execution boundary: `(invocation) -> ExecutionResult`.
pub trait ProgramExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecutionError>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl ProgramExecutor for SystemExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecutionError> {
        run(invocation)
    }
}

/// Spawn the program, block until it exits, and capture its output.
///
/// ## Errors
/// - [`ExecutionError::Spawn`] if the program cannot be started.
/// - [`ExecutionError::NotLaunched`] if a shell invocation reports "not found" / "not executable".
/// - [`ExecutionError::TimedOut`] if the invocation's timeout elapses; the child is killed.
#[tracing::instrument(skip_all, fields(command = %invocation.display))]
pub fn run(invocation: &Invocation) -> Result<ExecutionResult, ExecutionError> {
    let start = Instant::now();

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &invocation.current_dir {
        command.current_dir(dir);
    }
    if invocation.timeout.is_some() {
        isolate_process_group(&mut command);
    }

    tracing::debug!("spawning");
    let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
        program: invocation.display.clone(),
        source,
    })?;

    // Drain both pipes concurrently so a chatty child cannot block on a full buffer.
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match invocation.timeout {
        Some(timeout) => wait_with_timeout(&mut child, timeout, &invocation.display),
        None => child.wait().map_err(|source| ExecutionError::Wait {
            program: invocation.display.clone(),
            source,
        }),
    };

    // Readers are joined on every path, including a timeout.
    let stdout = join_reader(stdout_reader, &invocation.display);
    let stderr = join_reader(stderr_reader, &invocation.display);
    let status = status?;
    let stdout = stdout?;
    let stderr = stderr?;
    let stdout = String::from_utf8_lossy(&stdout);
    let stderr = String::from_utf8_lossy(&stderr);

    let status = ExitState::from_status(status);
    tracing::debug!(%status, elapsed_ms = start.elapsed().as_millis() as u64, "finished");

    if invocation.via_shell && !cfg!(windows) {
        if let ExitState::Exited(code @ (SHELL_NOT_EXECUTABLE | SHELL_NOT_FOUND)) = status {
            return Err(ExecutionError::NotLaunched {
                command: invocation.display.clone(),
                code,
                stderr: stderr.into_owned(),
            });
        }
    }

    Ok(ExecutionResult::from_output(&stdout, &stderr, status, start.elapsed()))
}

fn wait_with_timeout(child: &mut Child, timeout: Duration, program: &str) -> Result<ExitStatus, ExecutionError> {
    let deadline = Instant::now() + timeout;
    loop {
        let polled = child.try_wait().map_err(|source| ExecutionError::Wait {
            program: program.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            tracing::warn!(command = program, "timed out, killing process group");
            if let Err(err) = kill_process_group(child) {
                tracing::warn!(command = program, %err, "failed to kill timed-out command");
            }
            if let Err(err) = child.wait() {
                tracing::warn!(command = program, %err, "failed to reap timed-out command");
            }
            return Err(ExecutionError::TimedOut {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// A timed child leads its own process group so a timeout can take down everything it forked.
#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

/// SIGKILL the child's process group through kill(1); falls back to killing the child alone.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let group = format!("-{}", child.id());
    let status = Command::new("kill")
        .args(["-s", "KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            tracing::debug!(%status, "kill(1) failed, killing child only");
            child.kill()
        }
        Err(err) => {
            tracing::debug!(%err, "kill(1) unavailable, killing child only");
            child.kill()
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

type Reader = Option<JoinHandle<io::Result<Vec<u8>>>>;

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Reader {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_reader(reader: Reader, program: &str) -> Result<Vec<u8>, ExecutionError> {
    let Some(handle) = reader else {
        return Ok(Vec::new());
    };
    let joined = handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")));
    joined.map_err(|source| ExecutionError::Wait {
        program: program.to_string(),
        source,
    })
}
