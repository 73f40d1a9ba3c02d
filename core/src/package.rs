//! Schema definitions and definition packages as serializable data.
//!
//! A [`SchemaDocument`] is the JSON/YAML form of one definition. A
//! [`DefinitionPackage`] bundles documents under a version so they can be
//! shipped and loaded together.

use serde::{Deserialize, Serialize};

use crate::declare::parse_declaration;
use crate::error::Result;
use crate::schema::{SchemaDefinition, SchemaRef};

/// A schema definition described as data.
///
/// Field declarations are kept as raw JSON in declaration order; see
/// [`crate::declare`] for the accepted forms. Documents are turned into
/// definitions with [`SchemaDocument::build`] once every type they reference
/// is available.
///
/// # Examples
///
/// ```
/// use object_schema_core::SchemaDocument;
/// use serde_json::json;
///
/// let doc: SchemaDocument = serde_json::from_value(json!({
///     "name": "Point",
///     "fields": {"x": "Number", "y": {"type": "Number", "default": 0}}
/// }))
/// .unwrap();
///
/// let point = doc.build(|_| None).unwrap();
/// assert_eq!(point.field_names(), vec!["x", "y"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Definition name, unique within a registry.
    pub name: String,
    /// Name of the parent definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Identifier field name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Default sort field name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field declarations, in declaration order.
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SchemaDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            namespace: None,
            identifier: None,
            default_sort: None,
            description: None,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, decl: serde_json::Value) -> Self {
        self.fields.insert(name.into(), decl);
        self
    }

    /// Names of other definitions this document depends on: its parent
    /// first, then field types in declaration order, without duplicates.
    ///
    /// Declarations that fail to parse contribute nothing here; they are
    /// reported by validation and by [`build`](Self::build).
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = self.extends.iter().cloned().collect();
        for (field, decl) in &self.fields {
            let Ok(parsed) = parse_declaration(field, decl) else {
                continue;
            };
            for name in parsed.referenced_types() {
                if !refs.iter().any(|known| known == name) {
                    refs.push(name.to_string());
                }
            }
        }
        refs
    }

    /// Builds the definition, resolving type and parent names with `lookup`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::InvalidDeclaration`](crate::SchemaError::InvalidDeclaration)
    /// for malformed declarations,
    /// [`SchemaError::UnknownType`](crate::SchemaError::UnknownType) for
    /// names `lookup` cannot resolve (the parent included), and any builder
    /// error.
    pub fn build<F>(&self, lookup: F) -> Result<SchemaRef>
    where
        F: Fn(&str) -> Option<SchemaRef>,
    {
        let mut builder = SchemaDefinition::builder(&self.name);

        if let Some(parent) = &self.extends {
            let parent = lookup(parent.as_str()).ok_or_else(|| crate::SchemaError::UnknownType {
                field: "extends".to_string(),
                type_name: parent.clone(),
            })?;
            builder = builder.extends(&parent);
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.namespace(namespace);
        }
        if let Some(identifier) = &self.identifier {
            builder = builder.identifier(identifier);
        }
        if let Some(default_sort) = &self.default_sort {
            builder = builder.default_sort(default_sort);
        }
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }

        for (field, decl) in &self.fields {
            let decl = parse_declaration(field, decl)?.into_field_decl(field, &lookup)?;
            builder = builder.field(field, decl);
        }

        builder.build()
    }
}

/// Serializable bundle of schema documents for distribution.
///
/// # Examples
///
/// ```
/// use object_schema_core::*;
///
/// let mut package = DefinitionPackage::new("1.0.0", "2024-01-15T10:30:00Z");
/// package.name = Some("shop".into());
/// package.schemas.push(SchemaDocument::new("Product"));
/// package.schemas.push(SchemaDocument::new("Order"));
///
/// assert_eq!(package.schema_count(), 2);
/// assert!(package.find("Order").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionPackage {
    /// Document contract version (populated from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Package format version (semver string).
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// ISO-8601 timestamp for package creation.
    pub generated_at: String,
    /// SHA-256 of the canonical JSON of `schemas`.
    pub bundle_hash: Option<String>,
    pub schemas: Vec<SchemaDocument>,
}

impl DefinitionPackage {
    /// Creates an empty package stamped with the current contract version.
    pub fn new(version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::SCHEMA_CONTRACT_VERSION.to_string()),
            version: version.into(),
            name: None,
            description: None,
            generated_at: generated_at.into(),
            bundle_hash: None,
            schemas: Vec::new(),
        }
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn find(&self, name: &str) -> Option<&SchemaDocument> {
        self.schemas.iter().find(|doc| doc.name == name)
    }
}
