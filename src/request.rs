//! Prediction request validation.
//!
//! Validates the inbound payload against structural rules only: a JSON object
//! with a non-empty `symptoms` array of string tokens. Whether each id exists
//! in the catalog is deliberately left to the worker.

use miette::Diagnostic;
use thiserror::Error;

use crate::catalog::SymptomId;

/// Errors from request validation. All map to a client-error outcome.
#[derive(Debug, Error, Diagnostic)]
pub enum RequestError {
    #[error("request body is not valid JSON: {message}")]
    #[diagnostic(
        code(prognos::request::not_json),
        help("Send a JSON object like {{\"symptoms\":[\"fever\",\"cough\"]}}.")
    )]
    NotJson { message: String },

    #[error("request body has no \"symptoms\" field")]
    #[diagnostic(
        code(prognos::request::missing_symptoms),
        help("The body must be a JSON object with a \"symptoms\" array.")
    )]
    MissingSymptoms,

    #[error("the \"symptoms\" field is not an array")]
    #[diagnostic(
        code(prognos::request::not_a_list),
        help("Pass the symptom ids as a JSON array of strings.")
    )]
    NotAList,

    #[error("the symptom list is empty")]
    #[diagnostic(
        code(prognos::request::empty),
        help("Select at least one symptom before requesting a prediction.")
    )]
    Empty,

    #[error("symptom at index {index} is not a string")]
    #[diagnostic(
        code(prognos::request::not_a_string),
        help("Every element of the \"symptoms\" array must be a string token.")
    )]
    NotAString { index: usize },
}

pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// A validated, non-empty, order-preserving list of symptom ids.
///
/// Duplicates are not rejected here; that policy belongs to the worker.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    symptoms: Vec<SymptomId>,
}

impl PredictionRequest {
    /// Build a request from already-typed ids. Fails only on an empty list.
    pub fn new(symptoms: Vec<SymptomId>) -> RequestResult<Self> {
        if symptoms.is_empty() {
            return Err(RequestError::Empty);
        }
        Ok(PredictionRequest { symptoms })
    }

    /// Validate a raw request body. Rules are applied in order and the first
    /// violation short-circuits; no partial request is ever produced.
    pub fn parse(raw: &[u8]) -> RequestResult<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| RequestError::NotJson {
                message: e.to_string(),
            })?;

        let field = value.get("symptoms").ok_or(RequestError::MissingSymptoms)?;
        let list = field.as_array().ok_or(RequestError::NotAList)?;
        if list.is_empty() {
            return Err(RequestError::Empty);
        }

        let mut symptoms = Vec::with_capacity(list.len());
        for (index, element) in list.iter().enumerate() {
            let token = element
                .as_str()
                .ok_or(RequestError::NotAString { index })?;
            symptoms.push(SymptomId::new(token));
        }
        Ok(PredictionRequest { symptoms })
    }

    pub fn symptoms(&self) -> &[SymptomId] {
        &self.symptoms
    }

    /// The single argument handed to the worker: the symptom list as a
    /// self-contained JSON array.
    pub fn worker_arg(&self) -> String {
        serde_json::to_string(&self.symptoms).expect("symptom list is always serializable")
    }
}
