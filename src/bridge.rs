//! Inference invocation bridge: one worker process per prediction request.
//!
//! Each call to [`InferenceBridge::invoke`] launches the configured worker
//! with the serialized request as its final argument, drains stdout and
//! stderr concurrently with the exit wait, and classifies every way the run
//! can go wrong into a typed [`BridgeError`]. No invocation state survives
//! the call, and concurrent invocations are fully independent up to the
//! admission bound.

use std::process::Stdio;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use crate::decode::{self, DecodeError, PredictionResult};
use crate::request::PredictionRequest;

/// Errors from one worker invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error("failed to launch inference worker: {program}")]
    #[diagnostic(
        code(prognos::bridge::launch),
        help(
            "Check that the worker program exists and is executable. Set \
             [worker] program in config.toml or the PROGNOS_WORKER \
             environment variable."
        )
    )]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("inference worker exited with {status}")]
    #[diagnostic(
        code(prognos::bridge::worker_failed),
        help("The worker signaled failure; its stderr output is attached as `stderr`.")
    )]
    WorkerFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("inference worker did not finish within {timeout_secs}s")]
    #[diagnostic(
        code(prognos::bridge::timeout),
        help(
            "The worker was killed after exceeding [worker] timeout_secs. \
             Raise the limit if the model legitimately needs longer."
        )
    )]
    Timeout { timeout_secs: u64 },

    #[error("too many concurrent predictions in flight")]
    #[diagnostic(
        code(prognos::bridge::overloaded),
        help(
            "All [worker] max_concurrent invocation slots are taken. \
             Retry later or raise the limit."
        )
    )]
    Overloaded,

    #[error("prediction cancelled before the worker finished")]
    #[diagnostic(code(prognos::bridge::cancelled))]
    Cancelled,

    #[error("failed to capture worker output")]
    #[diagnostic(code(prognos::bridge::capture))]
    Capture {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to observe worker exit status")]
    #[diagnostic(code(prognos::bridge::wait))]
    Wait {
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Decode(#[from] DecodeError),
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Worker program plus base arguments, injected at construction.
///
/// The serialized request is appended as the final argument at invoke time.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        WorkerCommand {
            program: program.into(),
            args,
        }
    }
}

/// Launches and resolves one worker process per prediction request.
pub struct InferenceBridge {
    command: WorkerCommand,
    timeout: Duration,
    permits: Semaphore,
}

impl InferenceBridge {
    pub fn new(command: WorkerCommand, timeout: Duration, max_concurrent: usize) -> Self {
        InferenceBridge {
            command,
            timeout,
            permits: Semaphore::new(max_concurrent),
        }
    }

    /// Run one invocation with no external cancellation signal.
    pub async fn invoke(&self, request: &PredictionRequest) -> BridgeResult<PredictionResult> {
        // The sender is dropped immediately; a closed channel never cancels.
        let (_tx, rx) = watch::channel(false);
        self.invoke_cancellable(request, rx).await
    }

    /// Run one invocation, killing the worker if `cancel` flips to `true`.
    ///
    /// Admission is non-queueing: if no permit is free the call fails fast
    /// with [`BridgeError::Overloaded`] and nothing is spawned.
    pub async fn invoke_cancellable(
        &self,
        request: &PredictionRequest,
        cancel: watch::Receiver<bool>,
    ) -> BridgeResult<PredictionResult> {
        let _permit = self
            .permits
            .try_acquire()
            .map_err(|_| BridgeError::Overloaded)?;

        let arg = request.worker_arg();
        debug!(program = %self.command.program, "spawning inference worker");

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(&arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::Launch {
                program: self.command.program.clone(),
                source: e,
            })?;

        let mut stdout = child.stdout.take().expect("stdout is piped");
        let mut stderr = child.stderr.take().expect("stderr is piped");

        // Both drains must run concurrently with each other and with the
        // exit wait; a sequential read deadlocks once a pipe buffer fills.
        let drained = {
            let drain = async {
                let mut out_buf = Vec::new();
                let mut err_buf = Vec::new();
                let (out_res, err_res, status_res) = tokio::join!(
                    stdout.read_to_end(&mut out_buf),
                    stderr.read_to_end(&mut err_buf),
                    child.wait(),
                );
                out_res.map_err(|e| BridgeError::Capture { source: e })?;
                err_res.map_err(|e| BridgeError::Capture { source: e })?;
                let status = status_res.map_err(|e| BridgeError::Wait { source: e })?;
                Ok::<_, BridgeError>((out_buf, err_buf, status))
            };
            tokio::pin!(drain);
            tokio::select! {
                res = tokio::time::timeout(self.timeout, &mut drain) => Some(res),
                _ = cancelled(cancel) => None,
            }
        };

        let (out_buf, err_buf, status) = match drained {
            None => {
                let _ = child.kill().await;
                debug!("worker killed on cancellation");
                return Err(BridgeError::Cancelled);
            }
            Some(Err(_elapsed)) => {
                let _ = child.kill().await;
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "worker killed after timeout"
                );
                return Err(BridgeError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
            Some(Ok(result)) => result?,
        };

        if !status.success() {
            // Stdout from a failed worker is not trustworthy; discard it.
            let stderr = String::from_utf8_lossy(&err_buf).trim().to_string();
            warn!(%status, "inference worker failed");
            return Err(BridgeError::WorkerFailed { status, stderr });
        }

        debug!(
            stdout_bytes = out_buf.len(),
            stderr_bytes = err_buf.len(),
            "worker exited cleanly"
        );
        Ok(decode::decode(&out_buf)?)
    }
}

/// Resolves once the watch flag flips to `true`; pends forever if the sender
/// is dropped without signalling.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
