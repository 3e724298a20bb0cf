//! Result decoder for the worker's stdout payload.
//!
//! Only ever sees a complete stdout buffer from a worker that exited
//! successfully. Anything that does not parse into a label plus a numeric
//! confidence is a malformed result, with the raw text attached for diagnosis.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from decoding worker output.
#[derive(Debug, Error, Diagnostic)]
pub enum DecodeError {
    #[error("worker output is not valid JSON: {message}")]
    #[diagnostic(
        code(prognos::decode::not_json),
        help(
            "The worker must print a single JSON object on stdout, e.g. \
             {{\"disease\":\"Flu\",\"confidence\":0.92}}. The raw output is \
             attached as `raw`."
        )
    )]
    NotJson { message: String, raw: String },

    #[error("worker output has the wrong shape: {reason}")]
    #[diagnostic(
        code(prognos::decode::bad_shape),
        help(
            "The output object needs a string \"disease\" field and a numeric \
             \"confidence\" field. The raw output is attached as `raw`."
        )
    )]
    BadShape { reason: String, raw: String },
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// A decoded prediction: condition label plus confidence score.
///
/// The confidence is expected in [0, 1] but is not re-validated beyond being
/// numeric; the worker owns that contract.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: f64,
}

/// Parse the worker's stdout bytes into a [`PredictionResult`].
pub fn decode(raw: &[u8]) -> DecodeResult<PredictionResult> {
    let text = String::from_utf8_lossy(raw).trim().to_string();

    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| DecodeError::NotJson {
            message: e.to_string(),
            raw: text.clone(),
        })?;

    let label = value
        .get("disease")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| DecodeError::BadShape {
            reason: "missing or non-string \"disease\" field".into(),
            raw: text.clone(),
        })?;

    let confidence = value
        .get("confidence")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| DecodeError::BadShape {
            reason: "missing or non-numeric \"confidence\" field".into(),
            raw: text.clone(),
        })?;

    Ok(PredictionResult {
        label: label.to_string(),
        confidence,
    })
}
