// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tend_core::ProcessOutputSource;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::shell::Shell;

/// Receives each line of process output, without its line terminator.
pub type OutputSink<'a> = &'a mut (dyn FnMut(ProcessOutputSource, &str) + Send);

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("process was canceled")]
    Cancelled,
}

/// A fully resolved process to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Added to the agent's own environment
    pub env: HashMap<String, String>,
}

impl Invocation {
    /// Run `bootstrap` through `shell` inside `working_dir`.
    pub fn script(shell: &dyn Shell, bootstrap: &Path, arguments: &[String], working_dir: &Path) -> Self {
        Self {
            program: shell.full_path().to_path_buf(),
            args: shell.format_arguments(bootstrap, arguments),
            working_dir: working_dir.to_path_buf(),
            env: HashMap::new(),
        }
    }
}

/// Spawns processes and streams their output.
///
/// Returns the exit code, or [`RunError::Cancelled`] once the process has been
/// killed after `cancel` fired.
#[async_trait]
pub trait ProcessRunner: Send + Sync + 'static {
    async fn run(
        &self,
        invocation: &Invocation,
        sink: OutputSink<'_>,
        cancel: CancellationToken,
    ) -> Result<i32, RunError>;
}

/// Runs processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        sink: OutputSink<'_>,
        cancel: CancellationToken,
    ) -> Result<i32, RunError> {
        let program = invocation.program.display().to_string();
        let working_dir = invocation.working_dir.display().to_string();
        sink(
            ProcessOutputSource::Debug,
            &format!(
                "Starting {program} in working directory '{working_dir}' with the agent's environment plus {} custom variable(s)",
                invocation.env.len()
            ),
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn { program: program.clone(), source })?;

        tracing::debug!(program = %program, pid = ?child.id(), "spawned process");

        if cancel.is_cancelled() {
            return Err(kill(&mut child).await);
        }

        let stdout = child.stdout.take().map(BufReader::new);
        let stderr = child.stderr.take().map(BufReader::new);
        if let Err(e) = pump(stdout, stderr, sink, &cancel).await {
            if matches!(e, RunError::Cancelled) {
                return Err(kill(&mut child).await);
            }
            return Err(e);
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => return Err(kill(&mut child).await),
        };
        // Killed by a signal outside our control
        let code = status.code().unwrap_or(-1);
        sink(
            ProcessOutputSource::Debug,
            &format!("Process {program} in {working_dir} exited with code {code}"),
        );
        tracing::debug!(program = %program, code, "process exited");
        Ok(code)
    }
}

async fn kill(child: &mut Child) -> RunError {
    tracing::info!("killing process after cancellation");
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "failed to kill process");
    }
    let _ = child.wait().await;
    RunError::Cancelled
}

/// Forward both pipes line by line until they close or `cancel` fires.
async fn pump<O, E>(
    stdout: Option<O>,
    stderr: Option<E>,
    sink: OutputSink<'_>,
    cancel: &CancellationToken,
) -> Result<(), RunError>
where
    O: AsyncBufRead + Unpin,
    E: AsyncBufRead + Unpin,
{
    let (mut out_open, mut err_open) = (stdout.is_some(), stderr.is_some());
    let (mut out, mut err) = (stdout, stderr);
    let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());

    while out_open || err_open {
        tokio::select! {
            read = read_line(&mut out, &mut out_buf), if out_open => {
                out_open = emit(read?, &mut out_buf, ProcessOutputSource::StdOut, sink);
            }
            read = read_line(&mut err, &mut err_buf), if err_open => {
                err_open = emit(read?, &mut err_buf, ProcessOutputSource::StdErr, sink);
            }
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
        }
    }
    Ok(())
}

// `read_until` keeps partial reads in `buf`, so dropping this future in a
// select arm loses nothing.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut Option<R>, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    match reader {
        Some(reader) => reader.read_until(b'\n', buf).await,
        None => Ok(0),
    }
}

/// Send one completed line to the sink. Returns whether the pipe is still open.
fn emit(read: usize, buf: &mut Vec<u8>, source: ProcessOutputSource, sink: OutputSink<'_>) -> bool {
    if read == 0 && buf.is_empty() {
        return false;
    }
    let mut line = buf.as_slice();
    if let Some(stripped) = line.strip_suffix(b"\n") {
        line = stripped.strip_suffix(b"\r").unwrap_or(stripped);
    }
    sink(source, &String::from_utf8_lossy(line));
    buf.clear();
    read != 0
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
