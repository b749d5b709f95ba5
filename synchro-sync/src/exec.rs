//! External command execution.
//!
//! Every archive, transfer, extract, cleanup and notification step is an
//! external program. The engine only sees the [`CommandRunner`] trait; the
//! production implementation is [`SystemRunner`], which blocks until the
//! child exits and hands each output line to the caller as soon as it is read.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use serde::Serialize;

use crate::error::{io_err, SyncError};

/// Output lines buffered between the reader threads and `on_line`.
const OUTPUT_BACKLOG: usize = 256;

/// An argv vector for one external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(argv.into_iter().map(Into::into).collect())
    }

    pub fn argv(&self) -> &[String] {
        &self.0
    }

    pub fn program(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn into_argv(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Capability to run external commands.
///
/// Implementations must call `on_line` for every non-empty output line
/// (stdout and stderr), with trailing newlines stripped, and return
/// [`SyncError::CommandFailed`] on a non-zero exit.
pub trait CommandRunner {
    fn run(&self, command: &CommandLine, on_line: &mut dyn FnMut(&str)) -> Result<(), SyncError>;

    /// Like [`CommandRunner::run`], with `input` written to the child's stdin.
    fn run_with_input(
        &self,
        command: &CommandLine,
        input: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), SyncError>;
}

/// Runs commands as blocking child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine, on_line: &mut dyn FnMut(&str)) -> Result<(), SyncError> {
        spawn_and_stream(command, None, on_line)
    }

    fn run_with_input(
        &self,
        command: &CommandLine,
        input: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), SyncError> {
        spawn_and_stream(command, Some(input), on_line)
    }
}

fn spawn_and_stream(
    command: &CommandLine,
    input: Option<&str>,
    on_line: &mut dyn FnMut(&str),
) -> Result<(), SyncError> {
    let Some((program, args)) = command.argv().split_first() else {
        return Err(SyncError::CommandFailed {
            command: String::new(),
            code: None,
        });
    };

    tracing::debug!(command = %command, "spawning");
    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| io_err(program, e))?;

    let (tx, rx) = mpsc::sync_channel::<io::Result<String>>(OUTPUT_BACKLOG);
    let readers: Vec<JoinHandle<()>> = [
        child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
    ]
    .into_iter()
    .flatten()
    .map(|stream| {
        let tx = tx.clone();
        thread::spawn(move || {
            // Sends only fail once the receiver is gone, and then nobody is listening.
            if let Err(err) = for_each_line(stream, &mut |line| {
                let _ = tx.send(Ok(line.to_owned()));
            }) {
                let _ = tx.send(Err(err));
            }
        })
    })
    .collect();
    drop(tx);

    // stdin is fed from its own thread; dropping the handle closes it.
    let writer = match (input, child.stdin.take()) {
        (Some(input), Some(mut stdin)) => {
            let input = input.to_owned();
            Some(thread::spawn(move || stdin.write_all(input.as_bytes())))
        }
        _ => None,
    };

    let mut failure = None;
    // stdout and stderr lines reach `on_line` in arrival order.
    for message in rx {
        match message {
            Ok(line) => on_line(&line),
            Err(err) => {
                failure.get_or_insert(err);
            }
        }
    }
    for reader in readers {
        if reader.join().is_err() {
            failure.get_or_insert_with(|| thread_panicked("output reader"));
        }
    }
    if let Some(writer) = writer {
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                failure.get_or_insert(err);
            }
            Err(_) => {
                failure.get_or_insert_with(|| thread_panicked("input writer"));
            }
        }
    }

    let status = child.wait().map_err(|e| io_err(program, e))?;
    if let Some(err) = failure {
        return Err(io_err(program, err));
    }
    if !status.success() {
        return Err(SyncError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
        });
    }
    Ok(())
}

fn thread_panicked(which: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{which} thread panicked"))
}

fn for_each_line(stream: impl Read, on_line: &mut dyn FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        if !line.is_empty() {
            on_line(line);
        }
    }
}
