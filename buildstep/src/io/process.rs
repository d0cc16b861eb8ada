//! Supervised child processes: streamed stdout, bounded wait, outcome classification.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::StepError;

/// How long to wait for exit once the child's stdout has closed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Prefix for every echoed output line.
pub const DEFAULT_TAG: &str = "[make] ";
/// Longest line held in memory; longer lines are echoed in pieces of this size.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Raw outcome of one child process invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// `None` when the child was still running after the wait, or was ended by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Map a raw outcome onto the failure taxonomy.
///
/// A hang takes precedence over everything else; any exit other than `0`
/// (including signal termination) is a `CommandFailed`.
pub fn classify(command: &[String], result: CommandResult) -> Result<(), StepError> {
    if result.timed_out {
        return Err(StepError::HungProcess {
            command: command_line(command),
        });
    }
    match result.exit_code {
        Some(0) => Ok(()),
        exit_code => Err(StepError::CommandFailed {
            command: command_line(command),
            exit_code,
        }),
    }
}

pub fn command_line(command: &[String]) -> String {
    command.join(" ")
}

/// Abstraction over command execution so step actions can be driven by scripted runners in tests.
pub trait CommandRunner {
    /// Run `command` in `workdir`, succeeding only on exit code `0`.
    fn run(&self, workdir: &Path, command: &[String]) -> Result<(), StepError>;
}

/// Runs commands as real child processes.
///
/// Stdout is piped and echoed line by line to the echo sink, each line
/// prefixed with the tag. Stderr is inherited from the parent.
pub struct ProcessRunner {
    timeout: Duration,
    tag: String,
    kill_on_hang: bool,
    max_line_bytes: usize,
    echo: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("timeout", &self.timeout)
            .field("tag", &self.tag)
            .field("kill_on_hang", &self.kill_on_hang)
            .field("max_line_bytes", &self.max_line_bytes)
            .finish_non_exhaustive()
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            tag: DEFAULT_TAG.to_string(),
            kill_on_hang: false,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            echo: Mutex::new(Box::new(io::stdout())),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Kill children that outlive the wait. The run still fails with `HungProcess`.
    pub fn kill_on_hang(mut self, kill: bool) -> Self {
        self.kill_on_hang = kill;
        self
    }

    /// Redirect echoed output away from the process stdout.
    pub fn with_echo(mut self, echo: impl Write + Send + 'static) -> Self {
        self.echo = Mutex::new(Box::new(echo));
        self
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max.max(1);
        self
    }

    /// Spawn `command`, drain its stdout, then wait up to the timeout for it to exit.
    ///
    /// Draining blocks until the child closes stdout; the timeout only bounds
    /// the wait that follows.
    #[instrument(skip_all, fields(command = %command_line(command), timeout_secs = self.timeout.as_secs_f64()))]
    pub fn execute(&self, workdir: &Path, command: &[String]) -> Result<CommandResult, StepError> {
        let line = command_line(command);
        let (program, args) = command.split_first().ok_or_else(|| {
            StepError::io(
                "refusing to run an empty command",
                io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
            )
        })?;

        debug!("spawning child process");
        let mut child = match Command::new(program)
            .args(args)
            .current_dir(workdir)
            // Non-interactive: a child reading stdin sees EOF instead of blocking.
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn command");
                return Err(StepError::io(format!("spawn `{line}`"), e));
            }
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            StepError::io(
                format!("capture stdout of `{line}`"),
                io::Error::other("stdout was not piped"),
            )
        })?;
        let lines = self
            .echo_lines(stdout)
            .map_err(|e| StepError::io(format!("read output of `{line}`"), e))?;
        debug!(lines, "child closed stdout");

        let status = child
            .wait_timeout(self.timeout)
            .map_err(|e| StepError::io(format!("wait for `{line}`"), e))?;

        let result = match status {
            Some(status) => CommandResult {
                exit_code: status.code(),
                timed_out: false,
            },
            None if self.kill_on_hang => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "command hung, killing");
                child
                    .kill()
                    .map_err(|e| StepError::io(format!("kill `{line}`"), e))?;
                child
                    .wait()
                    .map_err(|e| StepError::io(format!("wait for `{line}` after kill"), e))?;
                CommandResult {
                    exit_code: None,
                    timed_out: true,
                }
            }
            None => {
                warn!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    pid = child.id(),
                    "command hung, leaving it running"
                );
                CommandResult {
                    exit_code: None,
                    timed_out: true,
                }
            }
        };

        debug!(exit_code = ?result.exit_code, timed_out = result.timed_out, "command finished");
        Ok(result)
    }

    /// Echo every line of `reader` with the tag prefix; returns the number of lines echoed.
    ///
    /// At most `max_line_bytes` of a line are buffered. A longer line is echoed
    /// as several tagged pieces.
    fn echo_lines<R: Read>(&self, reader: R) -> io::Result<usize> {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        let mut count = 0usize;
        loop {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                if !line.is_empty() {
                    self.echo_line(&mut line);
                    count += 1;
                }
                break;
            }

            let until_newline = available
                .iter()
                .position(|b| *b == b'\n')
                .map_or(available.len(), |i| i + 1);
            let take = until_newline.min(self.max_line_bytes - line.len());
            line.extend_from_slice(&available[..take]);
            reader.consume(take);

            if line.ends_with(b"\n") || line.len() >= self.max_line_bytes {
                self.echo_line(&mut line);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Write one tagged line and clear the buffer.
    ///
    /// Failures are logged, not returned: draining must continue so the child
    /// never blocks on a full pipe.
    fn echo_line(&self, line: &mut Vec<u8>) {
        if !line.ends_with(b"\n") {
            line.push(b'\n');
        }
        let mut echo = self.echo.lock().unwrap_or_else(|poisoned| {
            warn!("echo sink lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        });
        if let Err(e) = write_tagged(&mut **echo, &self.tag, line) {
            warn!(err = %e, "failed to echo command output");
        }
        line.clear();
    }
}

fn write_tagged(out: &mut dyn Write, tag: &str, line: &[u8]) -> io::Result<()> {
    out.write_all(tag.as_bytes())?;
    out.write_all(line)?;
    out.flush()
}

impl CommandRunner for ProcessRunner {
    fn run(&self, workdir: &Path, command: &[String]) -> Result<(), StepError> {
        let result = self.execute(workdir, command)?;
        classify(command, result)
    }
}
