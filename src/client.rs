//! Daemon discovery and the HTTP client used by the CLI.
//!
//! A running `prognosd` writes a JSON PID file under the XDG runtime dir;
//! [`discover_server`] validates it (process alive, `/health` answers) and
//! the CLI then talks to the daemon through [`RemoteClient`] instead of
//! spawning the worker locally.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{FailureResponse, PredictBody, PredictResponse, SymptomsResponse};
use crate::catalog::{SymptomCatalog, SymptomId};
use crate::decode::PredictionResult;
use crate::paths::PrognosPaths;

// ---------------------------------------------------------------------------
// Server discovery
// ---------------------------------------------------------------------------

/// Information about a running prognosd instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub pid: u32,
    pub port: u16,
    pub bind: String,
}

impl ServerInfo {
    /// Base URL for HTTP requests.
    pub fn base_url(&self) -> String {
        let host = if self.bind == "0.0.0.0" {
            "127.0.0.1"
        } else {
            &self.bind
        };
        format!("http://{host}:{}", self.port)
    }
}

/// Discover a running prognosd server via its PID file.
///
/// Returns `Some(ServerInfo)` when:
/// 1. The PID file exists and parses correctly
/// 2. The process is still alive (`kill(pid, 0)` succeeds)
/// 3. The server responds to `GET /health`
pub fn discover_server(paths: &PrognosPaths) -> Option<ServerInfo> {
    let pid_path = paths.pid_file();
    let contents = std::fs::read_to_string(&pid_path).ok()?;
    let info: ServerInfo = serde_json::from_str(&contents).ok()?;

    if !process_alive(info.pid) {
        // Stale PID file — clean up.
        let _ = std::fs::remove_file(&pid_path);
        return None;
    }

    let url = format!("{}/health", info.base_url());
    match ureq::get(&url)
        .timeout(std::time::Duration::from_secs(2))
        .call()
    {
        Ok(resp) if resp.status() == 200 => Some(info),
        _ => None,
    }
}

/// Write a PID file for the current prognosd process.
pub fn write_pid_file(paths: &PrognosPaths, port: u16, bind: &str) -> std::io::Result<()> {
    let info = ServerInfo {
        pid: std::process::id(),
        port,
        bind: bind.to_string(),
    };
    let json = serde_json::to_string_pretty(&info).expect("ServerInfo is always serializable");
    std::fs::write(paths.pid_file(), json)
}

/// Remove the PID file on shutdown.
pub fn remove_pid_file(paths: &PrognosPaths) {
    let _ = std::fs::remove_file(paths.pid_file());
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    // SAFETY: kill with signal 0 doesn't actually send a signal;
    // it only checks whether the process exists.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    // On non-unix, fall back to trusting the PID file.
    true
}

// ---------------------------------------------------------------------------
// Client error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error("remote request failed: {message}")]
    #[diagnostic(code(prognos::client::request), help("Is prognosd running?"))]
    Request { message: String },

    #[error("unexpected response from server: {message}")]
    #[diagnostic(code(prognos::client::response), help("Server version mismatch?"))]
    Response { message: String },

    #[error("server rejected the request ({status}): {message}")]
    #[diagnostic(code(prognos::client::server))]
    Server {
        status: u16,
        message: String,
        details: Option<String>,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

// ---------------------------------------------------------------------------
// RemoteClient
// ---------------------------------------------------------------------------

/// HTTP client to a running prognosd server.
pub struct RemoteClient {
    base_url: String,
    http: ureq::Agent,
}

impl RemoteClient {
    /// Connect to a discovered server.
    pub fn new(info: &ServerInfo) -> Self {
        RemoteClient {
            base_url: info.base_url(),
            http: ureq::Agent::new(),
        }
    }

    /// `GET /symptoms` as a typed catalog.
    pub fn symptoms(&self) -> ClientResult<SymptomCatalog> {
        let url = format!("{}/symptoms", self.base_url);
        let resp = self.http.get(&url).call().map_err(map_ureq_error)?;
        let body: SymptomsResponse = resp.into_json().map_err(|e| ClientError::Response {
            message: format!("failed to parse JSON: {e}"),
        })?;
        Ok(body.symptoms)
    }

    /// `POST /predict` as a typed prediction result.
    pub fn predict(&self, symptoms: &[SymptomId]) -> ClientResult<PredictionResult> {
        let url = format!("{}/predict", self.base_url);
        let body = PredictBody {
            symptoms: symptoms.to_vec(),
        };
        let resp = self
            .http
            .post(&url)
            .send_json(&body)
            .map_err(map_ureq_error)?;
        let body: PredictResponse = resp.into_json().map_err(|e| ClientError::Response {
            message: format!("failed to parse JSON: {e}"),
        })?;
        Ok(PredictionResult {
            label: body.prediction,
            confidence: body.confidence,
        })
    }
}

/// Non-2xx responses carry the uniform failure body; surface it typed.
fn map_ureq_error(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, resp) => match resp.into_json::<FailureResponse>() {
            Ok(body) => ClientError::Server {
                status,
                message: body.error,
                details: body.details,
            },
            Err(e) => ClientError::Response {
                message: format!("non-JSON error body (status {status}): {e}"),
            },
        },
        ureq::Error::Transport(t) => ClientError::Request {
            message: t.to_string(),
        },
    }
}
