//! Error types for registry operations.
//!
//! Provides a unified error type covering all failure modes: I/O,
//! serialization, document validation, reference resolution and checksum
//! verification.

use std::path::PathBuf;

use object_schema_core::{SchemaError, ValidationError};
use thiserror::Error;

/// Errors that can occur while loading or resolving schema documents.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Building a definition from a document failed.
    #[error("schema error: {0}")]
    SchemaError(#[from] SchemaError),

    /// One or more documents failed structural validation.
    #[error("invalid schema documents: {}", join_errors(.0))]
    InvalidDocuments(Vec<ValidationError>),

    /// A document references a schema that is not loaded.
    #[error("{schema} references unknown schema {reference}")]
    UnresolvedReference { schema: String, reference: String },

    /// Documents reference each other in a loop.
    #[error("cyclic reference: {0}")]
    CyclicReference(String),

    /// Checksum mismatch between expected and actual values.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// A file extension that no loader understands.
    #[error("unsupported document format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ValidationError>> for RegistryError {
    fn from(errors: Vec<ValidationError>) -> Self {
        match errors.as_slice() {
            [ValidationError::UnknownReference { schema, reference }] => {
                RegistryError::UnresolvedReference {
                    schema: schema.clone(),
                    reference: reference.clone(),
                }
            }
            [ValidationError::ReferenceCycle(cycle)] => RegistryError::CyclicReference(cycle.clone()),
            _ => RegistryError::InvalidDocuments(errors),
        }
    }
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
