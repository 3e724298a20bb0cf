//! # prognos
//!
//! A symptom-to-condition prediction service that delegates inference to an
//! external, opaque worker process invoked once per request.
//!
//! ## Architecture
//!
//! - **Catalog** (`catalog`): the ordered JSON list of valid symptom ids
//! - **Validation** (`request`): structural checks on the inbound payload
//! - **Bridge** (`bridge`): spawns the worker, drains stdout/stderr
//!   concurrently, classifies every failure mode into a typed outcome
//! - **Decoder** (`decode`): parses the worker's stdout into a prediction
//! - **HTTP surface** (`server`, feature `server`): axum routes mapping
//!   outcomes to status codes with a uniform failure body
//!
//! ## Library usage
//!
//! ```
//! use prognos::request::PredictionRequest;
//!
//! let req = PredictionRequest::parse(br#"{"symptoms":["fever","cough"]}"#).unwrap();
//! assert_eq!(req.worker_arg(), r#"["fever","cough"]"#);
//! ```

pub mod api;
pub mod bridge;
pub mod catalog;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod paths;
pub mod request;
#[cfg(feature = "server")]
pub mod server;
