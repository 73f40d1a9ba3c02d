//! The value caster, in both directions.
//!
//! Import ([`cast_field`]) turns raw input into the value stored on an
//! instance. Export ([`export_field`]) turns a stored value back into plain
//! data. Both honour the field's array-ness first and then work per element.

use crate::error::{Result, SchemaError};
use crate::field::{DefaultValue, FieldDescriptor, FieldType};
use crate::instance::Instance;
use crate::schema::{FieldOptions, SchemaRef};
use crate::types::{PrimitiveType, Value};

/// Casts the raw input of one field, array-ness included.
///
/// Array fields accept only sequences; any other input, absent included,
/// becomes an empty sequence. Declared defaults never apply to array fields.
///
/// # Errors
///
/// [`SchemaError::NonNullableNullAssignment`] when `null` reaches a nested
/// schema field (or element) that is not nullable.
pub fn cast_field(value: Option<Value>, field: &FieldDescriptor) -> Result<Option<Value>> {
    if !field.is_array {
        return cast_value(value, field);
    }

    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| cast_value(Some(item), field).map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>>>()
            .map(|items| Some(Value::Array(items))),
        _ => Ok(Some(Value::Array(Vec::new()))),
    }
}

/// Casts a single value (or array element) against the field's type.
///
/// Absent input stays absent unless the field declares a default.
pub fn cast_value(value: Option<Value>, field: &FieldDescriptor) -> Result<Option<Value>> {
    match &field.field_type {
        FieldType::Schema(schema) => cast_nested(value, field, schema).map(Some),
        FieldType::Primitive(ty) => Ok(cast_primitive(value, field, *ty)),
    }
}

fn cast_nested(value: Option<Value>, field: &FieldDescriptor, schema: &SchemaRef) -> Result<Value> {
    match value {
        Some(Value::Null) if field.nullable => Ok(Value::Null),
        Some(Value::Null) => Err(SchemaError::NonNullableNullAssignment {
            field: field.name.clone(),
            schema: schema.name().to_string(),
        }),
        source => Instance::new(schema, source.as_ref()).map(Value::from),
    }
}

fn cast_primitive(value: Option<Value>, field: &FieldDescriptor, ty: PrimitiveType) -> Option<Value> {
    let value = value.or_else(|| field.default.as_ref().map(DefaultValue::produce))?;

    if ty.is(&value) {
        Some(value)
    } else if field.nullable && value.is_null() {
        Some(Value::Null)
    } else {
        Some(ty.cast(value))
    }
}

/// Exports one stored field value as plain data.
///
/// Array fields always export a sequence. Absent nested values stay absent.
pub fn export_field(value: Option<&Value>, field: &FieldDescriptor) -> Option<Value> {
    if !field.is_array {
        return export_value(value, field);
    }

    let items = match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| export_value(Some(item), field).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    };
    Some(Value::Array(items))
}

fn export_value(value: Option<&Value>, field: &FieldDescriptor) -> Option<Value> {
    match (&field.field_type, value) {
        (FieldType::Schema(_), None) => None,
        (FieldType::Schema(_), Some(Value::Null)) => Some(Value::Null),
        (FieldType::Schema(_), Some(Value::Instance(instance))) => {
            Some(instance.to_object(FieldOptions::default()))
        }
        (FieldType::Schema(_), Some(other)) => Some(Value::from(other.to_json())),
        (_, Some(Value::Date(date))) => {
            Some(date.to_iso_string().map_or(Value::Null, Value::String))
        }
        (FieldType::Primitive(ty), value) => cast_primitive(value.cloned(), field, *ty),
    }
}
