//! Service configuration, persisted as TOML with environment overrides.
//!
//! Resolution order: the explicit `--config` path if given, else
//! `$XDG_CONFIG_HOME/prognos/config.toml`, else defaults; then `PROGNOS_*`
//! environment variables on top. The worker launch configuration is injected
//! into the bridge from here, never read from ambient state at call time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::bridge::WorkerCommand;
use crate::paths::PrognosPaths;

/// Errors from configuration loading.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(prognos::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(prognos::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(prognos::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to the symptom catalog (a JSON array of id strings).
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    /// Optional directory of static assets served for unmatched routes.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// Worker launch configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// How the inference worker is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Program to execute.
    #[serde(default = "default_worker_program")]
    pub program: String,
    /// Base arguments; the serialized request is appended as the final one.
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,
    /// Bound on one invocation's wall time before the worker is killed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Admission bound on concurrent invocations.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("symptoms.json")
}
fn default_worker_program() -> String {
    if cfg!(windows) { "python" } else { "python3" }.into()
}
fn default_worker_args() -> Vec<String> {
    vec!["predict.py".into()]
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent() -> usize {
    8
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            program: default_worker_program(),
            args: default_worker_args(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            bind: default_bind(),
            port: default_port(),
            catalog_path: default_catalog_path(),
            static_dir: None,
            worker: WorkerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Resolve the effective config: explicit file, else the XDG location if
    /// present, else defaults; then environment overrides.
    pub fn resolve(paths: &PrognosPaths, explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let path = paths.config_file();
                if path.exists() {
                    Self::load(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `PROGNOS_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = get("PROGNOS_BIND") {
            self.bind = bind;
        }
        if let Some(port) = get("PROGNOS_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!(%port, "ignoring non-numeric PROGNOS_PORT"),
            }
        }
        if let Some(catalog) = get("PROGNOS_CATALOG") {
            self.catalog_path = PathBuf::from(catalog);
        }
        if let Some(program) = get("PROGNOS_WORKER") {
            self.worker.program = program;
        }
    }

    /// The injected worker launch value for the bridge.
    pub fn worker_command(&self) -> WorkerCommand {
        WorkerCommand::new(self.worker.program.clone(), self.worker.args.clone())
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.timeout_secs)
    }

    /// Startup checks that produce warnings, never hard failures: the
    /// service starts regardless and reports problems per request.
    pub fn preflight_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.catalog_path.is_file() {
            warnings.push(format!(
                "symptom catalog not found: {}",
                self.catalog_path.display()
            ));
        }
        let program = Path::new(&self.worker.program);
        if program.components().count() > 1 && !program.is_file() {
            warnings.push(format!(
                "worker program not found: {}",
                self.worker.program
            ));
        }
        if let Some(first) = self.worker.args.first() {
            let script = Path::new(first);
            if script.extension().is_some() && !script.is_file() {
                warnings.push(format!("worker script not found: {first}"));
            }
        }
        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                warnings.push(format!("static_dir is not a directory: {}", dir.display()));
            }
        }
        warnings
    }
}
