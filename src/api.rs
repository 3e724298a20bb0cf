//! Wire body types shared by the server and the CLI client.
//!
//! Every failure path produces the same `{success:false, error, details?}`
//! shape; success shapes carry `success: true` plus the payload.

use serde::{Deserialize, Serialize};

use crate::catalog::{SymptomCatalog, SymptomId};

/// Body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictBody {
    pub symptoms: Vec<SymptomId>,
}

/// Success body of `GET /symptoms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomsResponse {
    pub success: bool,
    pub symptoms: SymptomCatalog,
}

/// Success body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: String,
    pub confidence: f64,
}

/// Uniform failure body for every error outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FailureResponse {
    pub fn new(error: impl Into<String>) -> Self {
        FailureResponse {
            success: false,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        // An absent diagnostic is never itself an error.
        if !details.is_empty() {
            self.details = Some(details);
        }
        self
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
