//! Typed object schemas with casting, inheritance and plain-data export.
//!
//! This crate defines the building blocks for declaring object shapes and
//! materializing raw data against them:
//!
//! - [`PrimitiveType`] and [`Value`]: the fixed primitive type registry and
//!   the value model every field holds. Each primitive casts any raw value
//!   without failing.
//! - [`FieldDescriptor`]: the canonical description of a field, produced by
//!   [`normalize_field`] from any [`FieldDecl`] shorthand.
//! - [`SchemaDefinition`]: a frozen, inheritable field table built with
//!   [`SchemaDefinition::builder`] and shared as [`SchemaRef`].
//! - [`Instance`]: one object of a definition, constructed from raw data,
//!   mutated through casting setters and exported back with
//!   [`Instance::to_object`].
//! - [`SchemaDocument`] / [`DefinitionPackage`]: definitions as JSON/YAML
//!   data, checked by [`validate_document`] and [`validate_package`].
//! - [`build_validation_tree`]: adapter seam that turns descriptor
//!   `validations` into a tree of caller-built validators.
//!
//! # Example
//!
//! ```
//! use object_schema_core::*;
//! use serde_json::json;
//!
//! let address = SchemaDefinition::builder("Address")
//!     .field("city", PrimitiveType::String)
//!     .build()
//!     .unwrap();
//! let person = SchemaDefinition::builder("Person")
//!     .field("name", PrimitiveType::String)
//!     .field("born", PrimitiveType::Date)
//!     .field("address", FieldSpec::of(&address).nullable())
//!     .field("scores", [PrimitiveType::Number])
//!     .build()
//!     .unwrap();
//!
//! let ada = Instance::from_json(
//!     &person,
//!     &json!({"name": "Ada", "born": "1815-12-10", "address": null, "scores": ["1", 2]}),
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     ada.to_json(),
//!     json!({
//!         "name": "Ada",
//!         "born": "1815-12-10T00:00:00.000Z",
//!         "address": null,
//!         "scores": [1, 2]
//!     })
//! );
//! assert_eq!(person.get_field("address.city").unwrap().name, "city");
//! ```

mod cast;
pub mod declare;
mod error;
mod field;
mod instance;
mod package;
mod schema;
mod types;
mod validate;
mod validation;

/// Version of the declaration document contract stamped into packages.
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

pub use cast::{cast_field, cast_value, export_field};
pub use declare::{RawDecl, RawSpec, declaration_to_field, parse_declaration, resolve_type};
pub use error::{Result, SchemaError};
pub use field::{
    DefaultValue, FieldDecl, FieldDescriptor, FieldSpec, FieldType, FlagMeta, Getter, Setter,
    Validations, is_valid_field_name, normalize_field,
};
pub use instance::Instance;
pub use package::{DefinitionPackage, SchemaDocument};
pub use schema::{
    FieldOptions, FieldPatch, FieldsInfo, SchemaBuilder, SchemaDefinition, SchemaRef, Transform,
};
pub use types::{DateValue, ObjectMap, PrimitiveType, Value, format_number};
pub use validate::{
    ValidationError, find_reference_cycle, validate_document, validate_documents,
    validate_package,
};
pub use validation::{
    EACH, ValidationModifiers, ValidationTree, ValidatorFactory, build_validation_tree,
};
