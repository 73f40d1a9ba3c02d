//! Turns a set of schema documents into built definitions.
//!
//! Documents may reference each other as parents or field types in any
//! order. Resolution validates the set, then builds every document after
//! the documents it references, so each [`SchemaDocument::build`] lookup
//! finds an already-built definition.

use std::collections::{BTreeMap, HashMap};

use object_schema_core::declare::{RawDecl, RawSpec, parse_declaration};
use object_schema_core::{SchemaDocument, SchemaRef, validate_documents};
use tracing::debug;

use crate::config::RegistryDefaults;
use crate::error::{RegistryError, Result};

/// Builds every document of `documents`.
///
/// # Errors
///
/// - [`RegistryError::UnresolvedReference`] when a parent or field type names
///   a document that is not part of the set.
/// - [`RegistryError::CyclicReference`] when documents reference each other
///   in a loop.
/// - [`RegistryError::InvalidDocuments`] for any other structural problem.
///
/// # Examples
///
/// ```
/// use object_schema_core::SchemaDocument;
/// use object_schema_registry::resolve_documents;
/// use serde_json::json;
///
/// let docs = vec![
///     SchemaDocument::new("User").with_parent("Resource"),
///     SchemaDocument::new("Resource").with_field("id", json!("String")),
/// ];
/// let schemas = resolve_documents(&docs).unwrap();
/// assert_eq!(schemas["User"].field_names(), vec!["id"]);
/// ```
pub fn resolve_documents(documents: &[SchemaDocument]) -> Result<BTreeMap<String, SchemaRef>> {
    let errors = validate_documents(documents);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let by_name: HashMap<&str, &SchemaDocument> =
        documents.iter().map(|doc| (doc.name.as_str(), doc)).collect();
    let mut built: BTreeMap<String, SchemaRef> = BTreeMap::new();
    for doc in documents {
        resolve_one(doc, &by_name, &mut built)?;
    }
    Ok(built)
}

fn resolve_one(
    doc: &SchemaDocument,
    by_name: &HashMap<&str, &SchemaDocument>,
    built: &mut BTreeMap<String, SchemaRef>,
) -> Result<()> {
    if built.contains_key(&doc.name) {
        return Ok(());
    }
    for reference in doc.references() {
        let dependency =
            by_name
                .get(reference.as_str())
                .ok_or_else(|| RegistryError::UnresolvedReference {
                    schema: doc.name.clone(),
                    reference: reference.clone(),
                })?;
        resolve_one(dependency, by_name, built)?;
    }

    let schema = doc.build(|name| built.get(name).cloned())?;
    debug!(
        schema = %doc.name,
        parent = ?doc.extends,
        fields = schema.field_names().len(),
        "Resolved schema document"
    );
    built.insert(doc.name.clone(), schema);
    Ok(())
}

/// Fills in identifier and default-sort names on root documents that
/// neither set them nor flag a field for them.
///
/// Derived documents inherit from their parent and are left alone.
pub fn apply_defaults(documents: &mut [SchemaDocument], defaults: &RegistryDefaults) {
    for doc in documents.iter_mut().filter(|doc| doc.extends.is_none()) {
        if doc.identifier.is_none() && !flags_any_field(doc, |spec| spec.identifier) {
            doc.identifier.clone_from(&defaults.identifier);
        }
        if doc.default_sort.is_none() && !flags_any_field(doc, |spec| spec.default_sort) {
            doc.default_sort.clone_from(&defaults.default_sort);
        }
    }
}

fn flags_any_field(doc: &SchemaDocument, flag: fn(&RawSpec) -> bool) -> bool {
    doc.fields.iter().any(|(field, decl)| {
        parse_declaration(field, decl).is_ok_and(|decl| is_flagged(&decl, flag))
    })
}

fn is_flagged(decl: &RawDecl, flag: fn(&RawSpec) -> bool) -> bool {
    match decl {
        RawDecl::Array(inner) => is_flagged(inner, flag),
        RawDecl::Object(spec) => flag(spec),
        RawDecl::Absent | RawDecl::Named(_) => false,
    }
}
