//! Rich diagnostic error types for prognos.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives; this module provides the transparent top-level wrapper so the
//! full diagnostic chain (error codes, help text, sources) reaches the user.

use miette::Diagnostic;
use thiserror::Error;

use crate::bridge::BridgeError;
use crate::catalog::CatalogError;
use crate::client::ClientError;
use crate::config::ConfigError;
use crate::decode::DecodeError;
use crate::paths::PathError;
use crate::request::RequestError;

/// Top-level error type for the prognos service.
#[derive(Debug, Error, Diagnostic)]
pub enum PrognosError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),
}

/// Convenience alias for functions returning prognos results.
pub type PrognosResult<T> = std::result::Result<T, PrognosError>;
