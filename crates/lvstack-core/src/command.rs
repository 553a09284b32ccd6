//! Execution boundary for the external tools lvstack drives.
//!
//! Every component talks to the host through `CommandRunner`, so inspection
//! and teardown logic stays testable with scripted fakes.

use crate::error::{LvStackError, LvStackResult};
use log::debug;
use std::fmt;
use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `-1` when the process was terminated by a signal.
    pub status: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Prefer stderr, fall back to stdout, both trimmed.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

/// Runs a program with an argv vector and waits for it to finish.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> LvStackResult<CommandOutput>;
}

impl<T> CommandRunner for &T
where
    T: CommandRunner + ?Sized,
{
    fn run(&self, program: &str, args: &[&str]) -> LvStackResult<CommandOutput> {
        (**self).run(program, args)
    }
}

impl<T> CommandRunner for Arc<T>
where
    T: CommandRunner + ?Sized,
{
    fn run(&self, program: &str, args: &[&str]) -> LvStackResult<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Host implementation backed by `std::process::Command`.
///
/// Without a timeout the runner blocks until the child exits.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn wait(
        &self,
        command: &str,
        mut child: Child,
        stdout_pipe: Option<ChildStdout>,
        stderr_pipe: Option<ChildStderr>,
    ) -> LvStackResult<CommandOutput> {
        let stdout_handle = spawn_output_reader(stdout_pipe);
        let stderr_handle = spawn_output_reader(stderr_pipe);

        let exit_status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let start = Instant::now();
                let mut exit_status = None;
                while start.elapsed() <= timeout {
                    if let Some(status) = child.try_wait()? {
                        exit_status = Some(status);
                        break;
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                match exit_status {
                    Some(status) => status,
                    None => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(LvStackError::Timeout {
                            command: command.to_string(),
                            after: timeout,
                        });
                    }
                }
            }
        };

        let stdout = stdout_handle
            .join()
            .map_err(|_| LvStackError::Provider("stdout reader thread panicked".into()))??;
        let stderr = stderr_handle
            .join()
            .map_err(|_| LvStackError::Provider("stderr reader thread panicked".into()))??;

        Ok(CommandOutput {
            stdout,
            stderr,
            status: exit_status.code().unwrap_or(-1),
        })
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> LvStackResult<CommandOutput> {
        let line = command_line(program, args);
        debug!("running command: {line}");
        let mut command = Command::new(program);
        command.args(args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn()?;
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let output = self.wait(&line, child, stdout_pipe, stderr_pipe)?;
        debug!(
            "{} exited with code {}; stdout: {:?}",
            program,
            output.status,
            output.stdout.trim_end()
        );
        Ok(output)
    }
}

fn spawn_output_reader<R>(pipe: Option<R>) -> thread::JoinHandle<LvStackResult<String>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || -> LvStackResult<String> {
        if let Some(mut reader) = pipe {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(String::from_utf8_lossy(&buf).to_string())
        } else {
            Ok(String::new())
        }
    })
}

/// Render a program and its arguments the way an operator would type them.
pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// One external command that did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Entity the command acted on (unit, group, member, or device).
    pub target: String,
    pub command: String,
    /// `None` when the command could not be launched at all.
    pub status: Option<i32>,
    pub diagnostic: String,
}

impl CommandFailure {
    pub fn from_output(target: impl Into<String>, command: String, output: &CommandOutput) -> Self {
        Self {
            target: target.into(),
            command,
            status: Some(output.status),
            diagnostic: output.diagnostic(),
        }
    }

    pub fn launch(target: impl Into<String>, command: String, err: &LvStackError) -> Self {
        Self {
            target: target.into(),
            command,
            status: None,
            diagnostic: err.to_string(),
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "`{}` exited with code {code}", self.command)?,
            None => write!(f, "`{}` could not be run", self.command)?,
        }
        if !self.diagnostic.is_empty() {
            write!(f, ": {}", self.diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

/// Run a command and turn anything but exit code 0 into a `CommandFailure`.
pub(crate) fn run_checked<R>(
    runner: &R,
    target: &str,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, CommandFailure>
where
    R: CommandRunner + ?Sized,
{
    let line = command_line(program, args);
    match runner.run(program, args) {
        Ok(output) if output.success() => Ok(output),
        Ok(output) => Err(CommandFailure::from_output(target, line, &output)),
        Err(err) => Err(CommandFailure::launch(target, line, &err)),
    }
}
