//! Symptom catalog accessor.
//!
//! The catalog is a flat JSON array of symptom id strings shipped alongside
//! the service. It is read in full and parsed on every request; a partially
//! read or malformed catalog is never returned.

use std::collections::HashSet;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from catalog loading.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("failed to read symptom catalog: {path}")]
    #[diagnostic(
        code(prognos::catalog::read),
        help(
            "Ensure the catalog file exists and is readable. The service looks \
             for it at the path given by `catalog_path` in config.toml or the \
             PROGNOS_CATALOG environment variable."
        )
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse symptom catalog: {path}")]
    #[diagnostic(
        code(prognos::catalog::parse),
        help("The catalog must be a JSON array of symptom id strings.")
    )]
    Parse { path: String, message: String },

    #[error("duplicate symptom id in catalog: \"{id}\"")]
    #[diagnostic(
        code(prognos::catalog::duplicate),
        help("Symptom ids must be unique within the catalog. Remove the duplicate entry.")
    )]
    Duplicate { id: String },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Opaque string token identifying one symptom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SymptomId(String);

impl SymptomId {
    pub fn new(id: impl Into<String>) -> Self {
        SymptomId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SymptomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered sequence of unique symptom ids.
///
/// Order is significant for display; prediction semantics do not depend on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomCatalog(Vec<SymptomId>);

impl SymptomCatalog {
    /// Read the catalog resource in full and parse it.
    pub async fn load(path: &Path) -> CatalogResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| CatalogError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&bytes, path)
    }

    fn parse(bytes: &[u8], path: &Path) -> CatalogResult<Self> {
        let ids: Vec<SymptomId> =
            serde_json::from_slice(bytes).map_err(|e| CatalogError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut seen = HashSet::new();
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(CatalogError::Duplicate {
                    id: id.as_str().to_string(),
                });
            }
        }
        Ok(SymptomCatalog(ids))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymptomId> {
        self.0.iter()
    }

    pub fn contains(&self, id: &SymptomId) -> bool {
        self.0.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_parses_flat_json_array() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("symptoms.json");
        std::fs::write(&path, r#"["fever","cough","fatigue"]"#).unwrap();

        let catalog = SymptomCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.len(), 3);
        let ids: Vec<&str> = catalog.iter().map(|s| s.as_str()).collect();
        assert_eq!(ids, vec!["fever", "cough", "fatigue"]);
    }

    #[tokio::test]
    async fn load_missing_file_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        let err = SymptomCatalog::load(&path).await.unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[test]
    fn parse_rejects_non_array() {
        let err =
            SymptomCatalog::parse(br#"{"symptoms":[]}"#, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn parse_rejects_duplicate_ids() {
        let err =
            SymptomCatalog::parse(br#"["fever","cough","fever"]"#, Path::new("x.json"))
                .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { ref id } if id == "fever"));
    }

    #[test]
    fn parse_preserves_order() {
        let catalog =
            SymptomCatalog::parse(br#"["b","a","c"]"#, Path::new("x.json")).unwrap();
        let ids: Vec<&str> = catalog.iter().map(|s| s.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(catalog.contains(&SymptomId::new("a")));
        assert!(!catalog.contains(&SymptomId::new("z")));
    }
}
