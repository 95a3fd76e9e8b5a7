//! Run command strings through the platform shell.
//!
//! Three modes: interactive (terminal attached), silent capture, and streaming
//! capture (dimmed passthrough plus capture, interruptible with Ctrl-C).

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossterm::style::{Attribute, SetAttribute};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::exit_codes;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    /// Inherit stdin/stdout/stderr; nothing is captured.
    Interactive,
    /// Merge stdout and stderr into one buffer; print nothing.
    Silent,
    /// Like `Silent`, but also echo dimmed output to the terminal.
    Streaming,
}

impl ShellMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ShellMode::Interactive => "interactive",
            ShellMode::Silent => "silent",
            ShellMode::Streaming => "streaming",
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellExecutionError {
    #[error("failed to start shell for {command:?}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{}", exit_message(*code))]
    Exit {
        /// `None` when the child was killed by a signal.
        code: Option<i32>,
        mode: ShellMode,
        /// Captured output (empty for interactive runs).
        output: String,
    },
    #[error("interrupted")]
    Interrupted { output: String },
}

fn exit_message(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("command exited with status {code}"),
        None => "command terminated by signal".to_string(),
    }
}

impl ShellExecutionError {
    /// Whatever the command printed before failing.
    pub fn output(&self) -> &str {
        match self {
            ShellExecutionError::Spawn { .. } => "",
            ShellExecutionError::Exit { output, .. } | ShellExecutionError::Interrupted { output } => {
                output
            }
        }
    }
}

/// Executes shell commands for exec steps and the agentic shell tool.
pub trait Shell {
    /// Returns trimmed captured output (empty for interactive runs).
    ///
    /// Failures are `ShellExecutionError` inside `anyhow::Error`.
    fn run(&self, command: &str, mode: ShellMode) -> Result<String>;
}

/// `bash -c` (or `cmd /C` on Windows).
pub struct SystemShell {
    output_limit_bytes: usize,
}

impl SystemShell {
    pub fn new(output_limit_bytes: usize) -> Self {
        Self { output_limit_bytes }
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl Shell for SystemShell {
    #[instrument(skip_all, fields(mode = mode.as_str()))]
    fn run(&self, command: &str, mode: ShellMode) -> Result<String> {
        debug!(command, "running shell command");
        match mode {
            ShellMode::Interactive => run_interactive(command),
            ShellMode::Silent | ShellMode::Streaming => {
                run_captured(command, mode, self.output_limit_bytes)
            }
        }
    }
}

fn spawn(mut cmd: Command, command: &str) -> Result<Child> {
    match cmd.spawn() {
        Ok(child) => Ok(child),
        Err(source) => {
            error!(err = %source, "failed to spawn shell");
            Err(ShellExecutionError::Spawn {
                command: command.to_string(),
                source,
            }
            .into())
        }
    }
}

fn run_interactive(command: &str) -> Result<String> {
    let mut cmd = shell_command(command);
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    let mut child = spawn(cmd, command)?;
    let status = child.wait().context("wait for shell")?;
    check_status(status, ShellMode::Interactive, String::new())?;
    Ok(String::new())
}

fn check_status(status: ExitStatus, mode: ShellMode, output: String) -> Result<String> {
    if status.success() {
        return Ok(output);
    }
    debug!(exit_code = ?status.code(), "shell command failed");
    Err(ShellExecutionError::Exit {
        code: status.code(),
        mode,
        output,
    }
    .into())
}

/// Captured bytes shared by both pipe readers, bounded by `limit`.
struct Capture {
    buf: Mutex<Vec<u8>>,
    limit: usize,
}

impl Capture {
    fn push(&self, bytes: &[u8]) -> usize {
        let Ok(mut buf) = self.buf.lock() else {
            return bytes.len();
        };
        let remaining = self.limit.saturating_sub(buf.len());
        let keep = bytes.len().min(remaining);
        buf.extend_from_slice(&bytes[..keep]);
        bytes.len() - keep
    }

    fn text(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).trim().to_string(),
            Err(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Terminal {
    Stdout,
    Stderr,
}

/// Echo target for streaming mode. Dims the stream on first write.
struct Tee {
    terminal: Terminal,
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl Tee {
    fn write(&self, bytes: &[u8]) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let result = match self.terminal {
            Terminal::Stdout => write_dimmed(&mut io::stdout().lock(), bytes, &self.started),
            Terminal::Stderr => write_dimmed(&mut io::stderr().lock(), bytes, &self.started),
        };
        if let Err(err) = result {
            warn!(err = %err, "failed to echo shell output");
        }
    }
}

fn write_dimmed(out: &mut impl Write, bytes: &[u8], started: &AtomicBool) -> io::Result<()> {
    if !started.swap(true, Ordering::SeqCst) {
        crossterm::queue!(out, SetAttribute(Attribute::Dim))?;
    }
    out.write_all(bytes)?;
    out.flush()
}

/// Resets terminal styling on every exit path of a streaming run.
struct DimGuard {
    stdout_started: Arc<AtomicBool>,
    stderr_started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl Drop for DimGuard {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if self.stdout_started.load(Ordering::SeqCst) {
            let mut out = io::stdout();
            let _ = crossterm::execute!(out, SetAttribute(Attribute::Reset));
        }
        if self.stderr_started.load(Ordering::SeqCst) {
            let mut err = io::stderr();
            let _ = crossterm::execute!(err, SetAttribute(Attribute::Reset));
        }
    }
}

fn pump<R: Read>(mut reader: R, capture: &Capture, tee: Option<&Tee>) -> Result<usize> {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut dropped = 0usize;
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        if let Some(tee) = tee {
            tee.write(&chunk[..n]);
        }
        dropped += capture.push(&chunk[..n]);
    }
    Ok(dropped)
}

fn join_reader(handle: thread::JoinHandle<Result<usize>>) -> Result<usize> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn run_captured(command: &str, mode: ShellMode, output_limit_bytes: usize) -> Result<String> {
    let streaming = mode == ShellMode::Streaming;
    let interrupts = streaming.then(Interrupts::get);

    let mut cmd = shell_command(command);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = spawn(cmd, command)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let capture = Arc::new(Capture {
        buf: Mutex::new(Vec::new()),
        limit: output_limit_bytes,
    });
    let guard = DimGuard {
        stdout_started: Arc::new(AtomicBool::new(false)),
        stderr_started: Arc::new(AtomicBool::new(false)),
        stopped: Arc::new(AtomicBool::new(false)),
    };
    let tee_for = |terminal: Terminal, started: &Arc<AtomicBool>| {
        streaming.then(|| Tee {
            terminal,
            started: Arc::clone(started),
            stopped: Arc::clone(&guard.stopped),
        })
    };
    let stdout_tee = tee_for(Terminal::Stdout, &guard.stdout_started);
    let stderr_tee = tee_for(Terminal::Stderr, &guard.stderr_started);

    let out_capture = Arc::clone(&capture);
    let stdout_handle =
        thread::spawn(move || pump(stdout, &out_capture, stdout_tee.as_ref()));
    let err_capture = Arc::clone(&capture);
    let stderr_handle =
        thread::spawn(move || pump(stderr, &err_capture, stderr_tee.as_ref()));

    let _armed = interrupts.map(Interrupts::listen);
    let status = loop {
        if let Some(status) = child.wait_timeout(POLL_INTERVAL).context("wait for shell")? {
            break status;
        }
        if interrupts.is_some_and(Interrupts::triggered) {
            warn!("interrupt received, killing shell command");
            child.kill().context("kill shell")?;
            break child.wait().context("wait for shell after kill")?;
        }
    };

    // The child shares our process group, so Ctrl-C usually ends it before the flag is polled.
    if interrupts.is_some_and(Interrupts::triggered) {
        drop(guard);
        // Readers may stay blocked on pipes inherited by grandchildren; leave them.
        return settle(status, true, mode, capture.text());
    }

    let stdout_dropped = join_reader(stdout_handle).context("join stdout")?;
    let stderr_dropped = join_reader(stderr_handle).context("join stderr")?;
    drop(guard);
    if stdout_dropped > 0 || stderr_dropped > 0 {
        warn!(stdout_dropped, stderr_dropped, "shell output truncated");
    }

    debug!(exit_code = ?status.code(), "shell command finished");
    settle(status, false, mode, capture.text())
}

/// An interrupted run reports `Interrupted` whatever status the child died with.
fn settle(
    status: ExitStatus,
    interrupted: bool,
    mode: ShellMode,
    output: String,
) -> Result<String> {
    if interrupted {
        debug!(exit_code = ?status.code(), "shell command interrupted");
        return Err(ShellExecutionError::Interrupted { output }.into());
    }
    check_status(status, mode, output)
}

/// Process-wide SIGINT/SIGTERM bookkeeping.
///
/// Outside streaming runs a signal terminates the process with the usual
/// interrupt status. During a streaming run the signal only sets a flag that
/// the wait loop polls.
struct Interrupts {
    received: Arc<AtomicBool>,
    exit_on_signal: Arc<AtomicBool>,
}

static INTERRUPTS: OnceLock<Interrupts> = OnceLock::new();

impl Interrupts {
    fn get() -> &'static Interrupts {
        INTERRUPTS.get_or_init(|| {
            let interrupts = Interrupts {
                received: Arc::new(AtomicBool::new(false)),
                exit_on_signal: Arc::new(AtomicBool::new(true)),
            };
            if let Err(err) = interrupts.register() {
                warn!(err = %err, "failed to install interrupt handler");
            }
            interrupts
        })
    }

    #[cfg(unix)]
    fn register(&self) -> io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::flag;

        for signal in [SIGINT, SIGTERM] {
            flag::register_conditional_shutdown(
                signal,
                exit_codes::INTERRUPTED,
                Arc::clone(&self.exit_on_signal),
            )?;
            flag::register(signal, Arc::clone(&self.received))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn register(&self) -> io::Result<()> {
        let _ = exit_codes::INTERRUPTED;
        Ok(())
    }

    /// Route signals to the wait loop until the returned guard drops.
    fn listen(&'static self) -> Listening {
        self.received.store(false, Ordering::SeqCst);
        self.exit_on_signal.store(false, Ordering::SeqCst);
        Listening { interrupts: self }
    }

    fn triggered(&self) -> bool {
        self.received.load(Ordering::SeqCst)
    }
}

struct Listening {
    interrupts: &'static Interrupts,
}

impl Drop for Listening {
    fn drop(&mut self) {
        self.interrupts.received.store(false, Ordering::SeqCst);
        self.interrupts.exit_on_signal.store(true, Ordering::SeqCst);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell() -> SystemShell {
        SystemShell::new(1_000_000)
    }

    #[test]
    fn silent_merges_and_trims_output() {
        let out = shell()
            .run("echo out; echo err 1>&2", ShellMode::Silent)
            .expect("run");
        assert!(out.contains("out"));
        assert!(out.contains("err"));
        assert_eq!(out, out.trim());
    }

    #[test]
    fn streaming_returns_captured_output() {
        let out = shell()
            .run("printf 'a\\nb\\n'", ShellMode::Streaming)
            .expect("run");
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn nonzero_exit_carries_code_and_output() {
        let err = shell()
            .run("echo partial; exit 3", ShellMode::Silent)
            .expect_err("fails");
        let Some(ShellExecutionError::Exit { code, mode, output }) =
            err.downcast_ref::<ShellExecutionError>()
        else {
            panic!("expected exit error, got {err:#}");
        };
        assert_eq!(*code, Some(3));
        assert_eq!(*mode, ShellMode::Silent);
        assert_eq!(output, "partial");
        assert_eq!(err.to_string(), "command exited with status 3");
    }

    #[test]
    fn capture_is_bounded_by_limit() {
        let out = SystemShell::new(4)
            .run("printf 'abcdefgh'", ShellMode::Silent)
            .expect("run");
        assert_eq!(out, "abcd");
    }

    #[test]
    fn metacharacters_are_honored() {
        let out = shell()
            .run("echo one | tr a-z A-Z && echo two", ShellMode::Silent)
            .expect("run");
        assert_eq!(out, "ONE\ntwo");
    }

    /// Verifies a child killed by Ctrl-C is reported as an interrupt, not an exit.
    #[test]
    fn interrupted_child_settles_as_interrupt() {
        use std::os::unix::process::ExitStatusExt;

        let sigint = ExitStatus::from_raw(2);

        let err = settle(sigint, true, ShellMode::Streaming, "start".to_string())
            .expect_err("interrupted");
        let Some(ShellExecutionError::Interrupted { output }) =
            err.downcast_ref::<ShellExecutionError>()
        else {
            panic!("expected interrupt, got {err:#}");
        };
        assert_eq!(output, "start");

        let err = settle(sigint, false, ShellMode::Streaming, String::new()).expect_err("signal");
        assert!(matches!(
            err.downcast_ref::<ShellExecutionError>(),
            Some(ShellExecutionError::Exit { code: None, .. })
        ));
    }
}
