//! Document and package validation.
//!
//! Validates structural invariants of schema documents and definition
//! packages, catching empty or duplicate names, malformed declarations,
//! dangling references and reference cycles before anything is built.
//!
//! # Examples
//!
//! ```
//! use object_schema_core::*;
//! use serde_json::json;
//!
//! let doc = SchemaDocument::new("Point").with_field("x", json!("Number"));
//! assert!(validate_document(&doc).is_empty());
//!
//! // Invalid: dotted field name
//! let bad = SchemaDocument::new("Point").with_field("a.b", json!("Number"));
//! assert!(!validate_document(&bad).is_empty());
//! ```

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::declare::parse_declaration;
use crate::field::is_valid_field_name;
use crate::types::PrimitiveType;
use crate::{DefinitionPackage, SchemaDocument, SchemaError};

/// Document/package validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Package version string is empty.
    #[error("package version cannot be empty")]
    EmptyPackageVersion,
    /// Schema name is empty or whitespace-only.
    #[error("schema name cannot be empty")]
    EmptySchemaName,
    /// Schema name collides with a primitive type name.
    #[error("schema name is reserved for a primitive type: {0}")]
    ReservedSchemaName(String),
    /// Two documents share a name.
    #[error("duplicate schema in package: {0}")]
    DuplicateSchema(String),
    /// A field name is not an identifier.
    #[error("invalid field name in {schema}: {field:?}")]
    InvalidFieldName { schema: String, field: String },
    /// A declaration has an unusable shape.
    #[error("invalid declaration for {schema}.{field}: {reason}")]
    InvalidDeclaration {
        schema: String,
        field: String,
        reason: String,
    },
    /// A document references a schema that is not part of the set.
    #[error("{schema} references unknown schema {reference}")]
    UnknownReference { schema: String, reference: String },
    /// Documents reference each other in a loop (e.g. `A -> B -> A`).
    #[error("reference cycle detected: {0}")]
    ReferenceCycle(String),
}

/// Validates a full definition package.
///
/// Checks for an empty version string, then validates the documents as a
/// set with [`validate_documents`].
///
/// # Examples
///
/// ```
/// use object_schema_core::*;
///
/// let mut package = DefinitionPackage::new("1.0.0", "2024-01-01T00:00:00Z");
/// package.schemas.push(SchemaDocument::new("Point"));
/// assert!(validate_package(&package).is_empty());
///
/// // Duplicate schema → error
/// package.schemas.push(SchemaDocument::new("Point"));
/// let errors = validate_package(&package);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateSchema(_))));
/// ```
pub fn validate_package(package: &DefinitionPackage) -> Vec<ValidationError> {
    if package.version.trim().is_empty() {
        return vec![ValidationError::EmptyPackageVersion];
    }
    validate_documents(&package.schemas)
}

/// Validates documents that are meant to resolve against each other.
///
/// Each document is validated on its own first; then every reference must
/// name a document of the set and the reference graph must be acyclic.
/// Stops at the first failing stage.
pub fn validate_documents(documents: &[SchemaDocument]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    for doc in documents {
        errors.extend(validate_document(doc));
        if !errors.is_empty() {
            return errors;
        }
        if !seen.insert(doc.name.as_str()) {
            errors.push(ValidationError::DuplicateSchema(doc.name.clone()));
            return errors;
        }
    }

    for doc in documents {
        for reference in doc.references() {
            if !seen.contains(reference.as_str()) {
                errors.push(ValidationError::UnknownReference {
                    schema: doc.name.clone(),
                    reference,
                });
                return errors;
            }
        }
    }

    if let Some(cycle) = find_reference_cycle(documents) {
        errors.push(ValidationError::ReferenceCycle(cycle.join(" -> ")));
    }

    errors
}

/// Validates a single document in isolation.
///
/// Checks the name, every field name, and the shape of every declaration.
/// References to other documents are not checked here.
pub fn validate_document(doc: &SchemaDocument) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let name = doc.name.trim();
    if name.is_empty() {
        errors.push(ValidationError::EmptySchemaName);
        return errors;
    }
    if PrimitiveType::from_name(name).is_some() {
        errors.push(ValidationError::ReservedSchemaName(name.to_string()));
        return errors;
    }

    for (field, decl) in &doc.fields {
        if !is_valid_field_name(field) {
            errors.push(ValidationError::InvalidFieldName {
                schema: doc.name.clone(),
                field: field.clone(),
            });
            return errors;
        }
        if let Err(SchemaError::InvalidDeclaration { reason, .. }) = parse_declaration(field, decl) {
            errors.push(ValidationError::InvalidDeclaration {
                schema: doc.name.clone(),
                field: field.clone(),
                reason,
            });
            return errors;
        }
    }

    errors
}

/// Returns the first reference cycle among `documents`, as the list of
/// names along the loop with the starting name repeated at the end.
pub fn find_reference_cycle(documents: &[SchemaDocument]) -> Option<Vec<String>> {
    let graph: HashMap<&str, Vec<String>> = documents
        .iter()
        .map(|doc| (doc.name.as_str(), doc.references()))
        .collect();

    let mut done: HashSet<&str> = HashSet::new();
    for doc in documents {
        let mut path = Vec::new();
        if let Some(cycle) = visit(doc.name.as_str(), &graph, &mut path, &mut done) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    name: &'a str,
    graph: &'a HashMap<&'a str, Vec<String>>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if let Some(start) = path.iter().position(|seen| *seen == name) {
        let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
        cycle.push(name.to_string());
        return Some(cycle);
    }
    if done.contains(name) {
        return None;
    }

    path.push(name);
    if let Some(references) = graph.get(name) {
        for reference in references {
            if let Some(cycle) = visit(reference.as_str(), graph, path, done) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    done.insert(name);
    None
}
