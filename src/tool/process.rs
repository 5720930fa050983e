//! Subprocess execution of tool invocations.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::config::FunzConfig;
use crate::error::{Error, Result};

use super::args::Invocation;

const READ_CHUNK: usize = 8 * 1024;

/// Captured output of a buffered call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes tool invocations.
///
/// [`ProcessExecutor`] is the real implementation; tests and embedders can
/// substitute their own.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run to completion and return the captured output.
    ///
    /// Fails with [`Error::ToolFailed`] on non-zero exit, embedding stderr.
    async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput>;

    /// Run to completion, passing stdout to `on_progress` as it arrives.
    ///
    /// Chunks are delivered as read; they are not split on line boundaries.
    /// Stderr is collected and reported only through
    /// [`Error::SimulationFailed`] when the exit code is non-zero.
    async fn stream(
        &self,
        invocation: &Invocation,
        on_progress: &mut (dyn for<'p> FnMut(&'p str) + Send),
    ) -> Result<()>;

    /// Run `<python> -m <namespace> --version` and report whether it succeeded.
    async fn probe_version(&self) -> bool;
}

/// Runs invocations as `<python> -m <namespace>.<module> ...` in the
/// workspace root.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    config: Arc<FunzConfig>,
}

impl ProcessExecutor {
    /// Create an executor over shared configuration.
    pub fn new(config: Arc<FunzConfig>) -> Self {
        Self { config }
    }

    fn command(&self, args: &[String]) -> (String, Command) {
        let program = self.config.resolve_python();
        let mut cmd = Command::new(&program);
        cmd.args(args)
            .current_dir(&self.config.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        (program, cmd)
    }

    fn spawn(&self, invocation: &Invocation) -> Result<(String, Child)> {
        let args = invocation.interpreter_args(&self.config.tool_namespace);
        let (program, mut cmd) = self.command(&args);

        tracing::debug!(
            subcommand = %invocation.subcommand,
            program = %program,
            args = ?args,
            "spawning funz tool"
        );

        let child = cmd.spawn().map_err(|source| Error::Spawn {
            program: program.clone(),
            source,
        })?;
        Ok((program, child))
    }
}

#[async_trait]
impl ToolExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let (_, mut child) = self.spawn(invocation)?;
        let limit = self.config.max_buffer_bytes;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::SubprocessComm("Failed to get stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::SubprocessComm("Failed to get stderr handle".to_string()))?;

        // Stderr is drained on its own task so a chatty child never blocks
        // while stdout is being read.
        let stderr_task = tokio::spawn(read_capped(stderr, limit, true));

        let stdout = match read_capped(stdout, limit, false).await {
            Ok(captured) => captured,
            Err(e) => {
                abandon(&mut child, stderr_task).await;
                return Err(Error::SubprocessComm(format!("Failed to read stdout: {e}")));
            }
        };

        if stdout.overflowed {
            let _ = child.kill().await;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::SubprocessComm(format!("Failed to wait for tool: {e}")))?;

        let stderr = stderr_task
            .await
            .map_err(|e| Error::SubprocessComm(format!("stderr reader failed: {e}")))?
            .map_err(|e| Error::SubprocessComm(format!("Failed to read stderr: {e}")))?;

        let stderr_text = String::from_utf8_lossy(&stderr.bytes).into_owned();
        let subcommand = invocation.subcommand.name();

        if stdout.overflowed {
            return Err(Error::tool_failed(
                subcommand,
                "stdout maxBuffer length exceeded",
                stderr_text,
            ));
        }
        if stderr.overflowed {
            return Err(Error::tool_failed(
                subcommand,
                "stderr maxBuffer length exceeded",
                stderr_text,
            ));
        }
        if !status.success() {
            return Err(Error::tool_failed(subcommand, status.to_string(), stderr_text));
        }

        tracing::debug!(
            subcommand,
            stdout_bytes = stdout.bytes.len(),
            "funz tool finished"
        );

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
            stderr: stderr_text,
        })
    }

    async fn stream(
        &self,
        invocation: &Invocation,
        on_progress: &mut (dyn for<'p> FnMut(&'p str) + Send),
    ) -> Result<()> {
        let (_, mut child) = self.spawn(invocation)?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::SubprocessComm("Failed to get stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::SubprocessComm("Failed to get stderr handle".to_string()))?;

        let stderr_task = tokio::spawn(read_capped(stderr, usize::MAX, true));

        let mut decoder = Utf8Chunks::default();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = match stdout.read(&mut chunk).await {
                Ok(n) => n,
                Err(e) => {
                    abandon(&mut child, stderr_task).await;
                    return Err(Error::SubprocessComm(format!("Failed to read stdout: {e}")));
                }
            };
            if n == 0 {
                break;
            }
            let text = decoder.push(&chunk[..n]);
            if !text.is_empty() {
                on_progress(&text);
            }
        }
        let rest = decoder.finish();
        if !rest.is_empty() {
            on_progress(&rest);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::SubprocessComm(format!("Failed to wait for tool: {e}")))?;

        let stderr = stderr_task
            .await
            .map_err(|e| Error::SubprocessComm(format!("stderr reader failed: {e}")))?
            .map_err(|e| Error::SubprocessComm(format!("Failed to read stderr: {e}")))?;

        if status.success() {
            tracing::info!(subcommand = %invocation.subcommand, "funz run completed");
            Ok(())
        } else {
            Err(Error::SimulationFailed {
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr.bytes).into_owned(),
            })
        }
    }

    async fn probe_version(&self) -> bool {
        let args = vec![
            "-m".to_string(),
            self.config.tool_namespace.clone(),
            "--version".to_string(),
        ];
        let (program, mut cmd) = self.command(&args);
        match cmd.output().await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::debug!(program = %program, error = %e, "funz version probe failed");
                false
            }
        }
    }
}

struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Kill and reap a child whose stdout can no longer be read, and stop
/// draining its stderr.
async fn abandon(child: &mut Child, stderr_task: JoinHandle<std::io::Result<Captured>>) {
    stderr_task.abort();
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "failed to kill funz tool");
    }
}

/// Read a pipe to EOF keeping at most `limit` bytes.
///
/// With `drain` set, reading continues past the limit (discarding data) so
/// the writer is never blocked; otherwise reading stops at the limit.
async fn read_capped<R>(mut reader: R, limit: usize, drain: bool) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let mut overflowed = false;
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(bytes.len());
        if n > room {
            bytes.extend_from_slice(&chunk[..room]);
            overflowed = true;
            if !drain {
                break;
            }
        } else {
            bytes.extend_from_slice(&chunk[..n]);
        }
    }

    Ok(Captured { bytes, overflowed })
}

/// Incremental UTF-8 decoding that never splits a multi-byte character
/// across two progress chunks.
#[derive(Default)]
struct Utf8Chunks {
    pending: Vec<u8>,
}

impl Utf8Chunks {
    fn push(&mut self, data: &[u8]) -> String {
        self.pending.extend_from_slice(data);

        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // An incomplete sequence at the end is held back for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };

        let rest = self.pending.split_off(complete);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}
