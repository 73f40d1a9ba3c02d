//! Error types for schema definition and instance operations.

use thiserror::Error;

/// Errors raised while building definitions or manipulating instances.
///
/// Coercion never produces an error; primitive casts are total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A setter or adder named a field that is not declared anywhere in the
    /// definition chain.
    #[error("Field {field} does not exist in {schema}")]
    UnknownField { schema: String, field: String },

    /// `add` was called on a field that is not an array field.
    #[error("Field {field} in {schema} is not array")]
    NotArrayField { schema: String, field: String },

    /// An explicit `null` reached a nested-schema field that is not nullable.
    #[error("Field {field} of type {schema} is not nullable but received null")]
    NonNullableNullAssignment { field: String, schema: String },

    /// An instance was constructed from a literal `null` source.
    #[error("cannot construct {schema} from null")]
    NullSource { schema: String },

    /// The builder received the same field name twice.
    #[error("duplicate field {field} in {schema}")]
    DuplicateField { schema: String, field: String },

    /// The builder received a field name that is not an identifier.
    #[error("invalid field name {field:?} in {schema}")]
    InvalidFieldName { schema: String, field: String },

    /// A declaration referenced a type that is neither primitive nor known.
    #[error("unknown type {type_name} for field {field}")]
    UnknownType { field: String, type_name: String },

    /// A declaration document had a shape that cannot describe a field.
    #[error("invalid declaration for field {field}: {reason}")]
    InvalidDeclaration { field: String, reason: String },
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
