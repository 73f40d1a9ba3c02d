//! Schema instances: materialized objects of a definition.
//!
//! An [`Instance`] owns its field values, nested instances included. It is
//! created from raw data, mutated through casting setters (or through direct
//! assignment followed by [`Instance::cast`]), and exported back to plain data
//! with [`Instance::to_object`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::cast::{cast_field, cast_value, export_field};
use crate::error::{Result, SchemaError};
use crate::field::FieldDescriptor;
use crate::schema::{FieldOptions, SchemaRef};
use crate::types::{ObjectMap, Value};

/// One materialized object of a [`SchemaDefinition`](crate::SchemaDefinition).
///
/// # Examples
///
/// ```
/// use object_schema_core::{FieldSpec, Instance, PrimitiveType, SchemaDefinition};
/// use serde_json::json;
///
/// let user = SchemaDefinition::builder("User")
///     .field("name", PrimitiveType::String)
///     .field("age", PrimitiveType::Number)
///     .field("tags", [PrimitiveType::String])
///     .build()
///     .unwrap();
///
/// let mut alice = Instance::from_json(&user, &json!({"name": "Alice", "age": "30"})).unwrap();
/// alice.add("tags", "admin").unwrap();
///
/// assert_eq!(alice.to_json(), json!({"name": "Alice", "age": 30, "tags": ["admin"]}));
/// assert!(alice.is_new());
/// ```
#[derive(Clone)]
pub struct Instance {
    schema: SchemaRef,
    values: BTreeMap<String, Value>,
}

impl Instance {
    /// Constructs an instance, casting every visible field from `source`.
    ///
    /// `None` (or a source that is not a mapping) constructs from an empty
    /// source, applying defaults. Another instance is read field by field.
    ///
    /// # Errors
    ///
    /// [`SchemaError::NullSource`] when `source` is `null`, and any error
    /// raised while casting a nested field.
    pub fn new(schema: &SchemaRef, source: Option<&Value>) -> Result<Self> {
        if matches!(source, Some(Value::Null)) {
            return Err(SchemaError::NullSource {
                schema: schema.name().to_string(),
            });
        }

        let mut values = BTreeMap::new();
        for field in schema.fields(FieldOptions::default()) {
            let raw = source.and_then(|source| source.get(&field.name)).cloned();
            if let Some(value) = cast_field(raw, field)? {
                values.insert(field.name.clone(), value);
            }
        }

        Ok(Self {
            schema: Arc::clone(schema),
            values,
        })
    }

    /// Constructs an instance from parsed JSON.
    pub fn from_json(schema: &SchemaRef, json: &serde_json::Value) -> Result<Self> {
        Self::new(schema, Some(&Value::from(json)))
    }

    /// Clones `value` when it is already an instance of `schema` (or of a
    /// derived definition), otherwise constructs from it.
    pub fn from_value(schema: &SchemaRef, value: &Value) -> Result<Self> {
        match value {
            Value::Instance(instance) if instance.schema.is_or_extends(schema) => {
                instance.try_clone()
            }
            other => Self::new(schema, Some(other)),
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Returns the stored value of `name`; `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Returns the nested instance stored under `name`, if any.
    pub fn nested(&self, name: &str) -> Option<&Instance> {
        self.get(name).and_then(Value::as_instance)
    }

    pub fn nested_mut(&mut self, name: &str) -> Option<&mut Instance> {
        self.get_mut(name).and_then(Value::as_instance_mut)
    }

    /// Stored values, keyed by field name.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Stores `value` as-is, without casting.
    ///
    /// Call [`cast`](Self::cast) afterwards to bring the instance back in
    /// line with its definition.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Casts `value` and stores it under the declared field `name`.
    ///
    /// A virtual field with a setter hands the raw value to it instead.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] when `name` is not declared anywhere in
    /// the definition chain; casting errors for nested fields, and whatever
    /// a virtual setter returns.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let field = self.declared(name)?;
        if let Some(setter) = field.setter.as_ref().filter(|_| field.is_virtual) {
            setter(self, value.into())?;
            return Ok(self);
        }
        match cast_field(Some(value.into()), &field)? {
            Some(value) => self.values.insert(field.name.clone(), value),
            None => self.values.remove(&field.name),
        };
        Ok(self)
    }

    /// Removes the stored value of `name`.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        self.values.remove(name);
        self
    }

    /// Casts `value` as one element and appends it to the array field `name`.
    ///
    /// A missing or non-sequence current value starts a new sequence.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] or [`SchemaError::NotArrayField`].
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let field = self.declared(name)?;
        if !field.is_array {
            return Err(SchemaError::NotArrayField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            });
        }

        let item = cast_value(Some(value.into()), &field)?.unwrap_or_default();
        match self.values.get_mut(name).and_then(Value::as_array_mut) {
            Some(items) => items.push(item),
            None => {
                self.values.insert(name.to_string(), Value::Array(vec![item]));
            }
        }
        Ok(self)
    }

    /// Re-casts every visible field from the value it currently holds.
    ///
    /// The instance is left untouched when casting fails.
    pub fn cast(&mut self) -> Result<&mut Self> {
        let mut values = self.values.clone();
        for field in self.schema.fields(FieldOptions::default()) {
            let current = values.remove(&field.name);
            if let Some(value) = cast_field(current, field)? {
                values.insert(field.name.clone(), value);
            }
        }
        self.values = values;
        Ok(self)
    }

    /// Exports a plain-data snapshot.
    ///
    /// Keys follow field iteration order and absent fields are omitted. With `options.virtuals`, virtual fields are
    /// included, computed through their getter when they declare one. The
    /// definition's transform, if any, is applied last.
    pub fn to_object(&self, options: FieldOptions) -> Value {
        let mut out = ObjectMap::new();
        for field in self.schema.fields(options) {
            let computed = match &field.getter {
                Some(getter) if field.is_virtual => getter(self),
                _ => None,
            };
            let current = computed.as_ref().or_else(|| self.values.get(&field.name));
            if let Some(value) = export_field(current, field) {
                out.insert(field.name.clone(), value);
            }
        }

        let object = Value::Object(out);
        match self.schema.transform() {
            Some(transform) => transform(object, &options),
            None => object,
        }
    }

    /// Exports and converts to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_object(FieldOptions::default()).to_json()
    }

    /// Deep copy through export and reconstruction.
    pub fn try_clone(&self) -> Result<Self> {
        Self::new(&self.schema, Some(&self.to_object(FieldOptions::default())))
    }

    /// Calls `callback` with every visible field and its stored value.
    pub fn each_field(
        &self,
        options: FieldOptions,
        mut callback: impl FnMut(&FieldDescriptor, Option<&Value>),
    ) {
        for field in self.schema.fields(options) {
            callback(field, self.values.get(&field.name));
        }
    }

    /// The value of the identifier field.
    pub fn id(&self) -> Option<&Value> {
        self.get(self.schema.identifier())
    }

    /// `true` until the identifier field holds a truthy value.
    pub fn is_new(&self) -> bool {
        !self.id().is_some_and(Value::is_truthy)
    }

    fn declared(&self, name: &str) -> Result<Arc<FieldDescriptor>> {
        self.schema
            .field(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("schema", &self.schema.name())
            .field("values", &self.values)
            .finish()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_object(FieldOptions::default()).serialize(serializer)
    }
}
