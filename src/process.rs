//! Bounded-time execution of external commands.
//!
//! Every external tool the harness drives (compiler, C toolchain, WebAssembly runtime, interpreter,
//! solver, the synthesized artifact itself) goes through [`ProcessInvoker`]. A timeout is an ordinary
//! [`Invocation::TimedOut`] value rather than an error, so the caller can classify it and move on to the
//! next unit. Nothing here retries.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Errors that prevent a command from producing any outcome at all.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// A program plus its arguments.
///
/// Tool configurations store a prefix (for example `wasmtime run --invoke main`) and extend a clone of it
/// per unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code; `128 + signal` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of a bounded wait on a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Completed(ProcessOutput),
    TimedOut { after: Duration },
}

/// Execute a command under a wall-clock bound.
///
/// Abstracted so pipelines can be exercised against scripted outcomes without spawning anything.
pub trait ProcessInvoker {
    fn invoke(&self, command: &CommandLine, timeout: Duration) -> Result<Invocation, InvokeError>;
}

/// Spawns real processes (current behavior).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInvoker;

impl ProcessInvoker for SystemInvoker {
    fn invoke(&self, command: &CommandLine, timeout: Duration) -> Result<Invocation, InvokeError> {
        let program = command.program.display().to_string();
        tracing::debug!(%command, timeout_ms = timeout.as_millis() as u64, "spawning");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: program.clone(),
                source,
            })?;

        let deadline = Instant::now().checked_add(timeout);
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait_with_deadline(&mut child, deadline).map_err(|source| InvokeError::Wait {
            program: program.clone(),
            source,
        })?;
        // Grandchildren can hold the pipes open past the child's exit; collection has the same deadline.
        let collected = status.and_then(|status| {
            let stdout = collect_output(stdout, deadline)?;
            let stderr = collect_output(stderr, deadline)?;
            Some((status, stdout, stderr))
        });
        let Some((status, stdout, stderr)) = collected else {
            tracing::debug!(%command, "timed out");
            return Ok(Invocation::TimedOut { after: timeout });
        };

        Ok(Invocation::Completed(ProcessOutput {
            exit_code: exit_code(&status),
            stdout,
            stderr,
        }))
    }
}

/// Poll until the child exits or `deadline` passes. On timeout the child is killed and reaped and `None`
/// is returned.
fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Drain a pipe on its own thread; the buffer arrives once every writer has closed it.
fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// `None` when the pipe is still open at `deadline`. The reader thread is left detached.
fn collect_output(reader: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };
    let received = match deadline {
        Some(deadline) => reader.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => reader.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

fn exit_signal(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}

fn exit_code(status: &ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => exit_signal(status).map(|s| 128 + s).unwrap_or(1),
    }
}

/// Resolve a program the way the shell would: paths containing a separator are taken as-is, bare names
/// are searched on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    find_in_path(program.as_os_str())
}

/// First executable named `prog` on `PATH`.
pub fn find_in_path(prog: &OsStr) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(prog))
        .find(|cand| cand.is_file() && is_executable(cand))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn captures_exit_code_and_streams() {
        let out = SystemInvoker
            .invoke(&sh("echo out; echo err >&2; exit 3"), Duration::from_secs(10))
            .unwrap();
        let Invocation::Completed(out) = out else {
            panic!("expected completion, got {out:?}");
        };
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert!(!out.success());
    }

    #[test]
    fn signal_exit_is_normalized() {
        let out = SystemInvoker.invoke(&sh("kill -ABRT $$"), Duration::from_secs(10)).unwrap();
        let Invocation::Completed(out) = out else {
            panic!("expected completion, got {out:?}");
        };
        assert_eq!(out.exit_code, 134);
    }

    #[test]
    fn timeout_is_an_outcome_not_an_error() {
        let started = Instant::now();
        let out = SystemInvoker.invoke(&sh("exec sleep 5"), Duration::from_millis(100)).unwrap();
        assert!(matches!(out, Invocation::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = SystemInvoker
            .invoke(&CommandLine::new("/nonexistent/sir-conform-tool"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, InvokeError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/sir-conform-tool"));
    }

    #[test]
    fn command_line_display() {
        let cmd = CommandLine::new("wasmtime").arg("run").args(["--invoke", "main"]);
        assert_eq!(cmd.to_string(), "wasmtime run --invoke main");
    }

    #[test]
    fn background_writer_does_not_outlive_the_timeout() {
        let started = Instant::now();
        let out = SystemInvoker
            .invoke(&sh("sleep 4 & exit 0"), Duration::from_millis(200))
            .unwrap();
        assert!(matches!(out, Invocation::TimedOut { .. }), "{out:?}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn detached_background_process_does_not_block_collection() {
        let out = SystemInvoker
            .invoke(&sh("echo done; sleep 4 >/dev/null 2>&1 & exit 0"), Duration::from_secs(2))
            .unwrap();
        let Invocation::Completed(out) = out else {
            panic!("expected completion, got {out:?}");
        };
        assert_eq!(out.stdout, "done\n");
    }

    #[test]
    fn resolves_bare_names_on_path() {
        assert!(resolve_program(Path::new("sh")).is_some());
        assert!(resolve_program(Path::new("definitely-not-a-real-tool-name")).is_none());
        assert!(resolve_program(Path::new("./no/such/file")).is_none());
    }
}
