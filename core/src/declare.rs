//! JSON/YAML field declarations.
//!
//! Declaration documents describe fields as data instead of builder calls.
//! Parsing happens in two steps: [`parse_declaration`] checks the shape and
//! yields a [`RawDecl`] whose type names are still unresolved, then
//! [`RawDecl::into_field_decl`] resolves those names (primitives first, then
//! through a caller-supplied lookup) into a [`FieldDecl`].
//!
//! Accepted forms:
//!
//! | JSON                         | Meaning                         |
//! |------------------------------|---------------------------------|
//! | `null`                       | `Any` field                     |
//! | `"Number"` / `"Address"`     | primitive or schema type        |
//! | `["String"]` / `[]`          | array shorthand                 |
//! | `{"type": "Date", ...}`      | descriptor object               |

use crate::error::{Result, SchemaError};
use crate::field::{FieldDecl, FieldSpec, FieldType, FlagMeta, Validations};
use crate::schema::SchemaRef;
use crate::types::{PrimitiveType, Value};

/// A parsed declaration whose type names are not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDecl {
    Absent,
    Named(String),
    Array(Box<RawDecl>),
    Object(Box<RawSpec>),
}

/// A parsed descriptor object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSpec {
    pub type_name: Option<String>,
    pub is_array: bool,
    pub default: Option<serde_json::Value>,
    pub nullable: bool,
    pub is_virtual: bool,
    pub validations: Option<Validations>,
    pub order: Option<f64>,
    pub listable: FlagMeta,
    pub sortable: FlagMeta,
    pub filtrable: FlagMeta,
    pub identifier: bool,
    pub default_sort: bool,
    pub meta: serde_json::Map<String, serde_json::Value>,
}

/// Parses the declaration of `field`, checking its shape only.
///
/// # Examples
///
/// ```
/// use object_schema_core::{RawDecl, parse_declaration};
/// use serde_json::json;
///
/// let decl = parse_declaration("tags", &json!(["String"])).unwrap();
/// assert_eq!(decl, RawDecl::Array(Box::new(RawDecl::Named("String".into()))));
///
/// assert!(parse_declaration("count", &json!(3)).is_err());
/// ```
pub fn parse_declaration(field: &str, json: &serde_json::Value) -> Result<RawDecl> {
    match json {
        serde_json::Value::Null => Ok(RawDecl::Absent),
        serde_json::Value::String(name) if name.trim().is_empty() => {
            Err(invalid(field, "type name cannot be empty"))
        }
        serde_json::Value::String(name) => Ok(RawDecl::Named(name.clone())),
        serde_json::Value::Array(items) => {
            let inner = match items.first() {
                Some(first) => parse_declaration(field, first)?,
                None => RawDecl::Absent,
            };
            Ok(RawDecl::Array(Box::new(inner)))
        }
        serde_json::Value::Object(map) => parse_spec(field, map).map(|spec| RawDecl::Object(Box::new(spec))),
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => Err(invalid(
            field,
            "expected a type name, an array shorthand or a descriptor object",
        )),
    }
}

fn parse_spec(field: &str, map: &serde_json::Map<String, serde_json::Value>) -> Result<RawSpec> {
    let mut spec = RawSpec::default();

    for (key, value) in map {
        match key.as_str() {
            "type" => match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(name) if !name.trim().is_empty() => {
                    spec.type_name = Some(name.clone());
                }
                serde_json::Value::Array(items) => {
                    spec.is_array = true;
                    match items.first() {
                        None | Some(serde_json::Value::Null) => {}
                        Some(serde_json::Value::String(name)) if !name.trim().is_empty() => {
                            spec.type_name = Some(name.clone());
                        }
                        Some(_) => return Err(invalid(field, "`type` array must hold one type name")),
                    }
                }
                _ => return Err(invalid(field, "`type` must be a type name or [type name]")),
            },
            "isArray" | "is_array" => spec.is_array |= expect_bool(field, key, value)?,
            "default" => spec.default = Some(value.clone()),
            "nullable" => spec.nullable = expect_bool(field, key, value)?,
            "virtual" => spec.is_virtual = expect_bool(field, key, value)?,
            "identifier" => spec.identifier = expect_bool(field, key, value)?,
            "defaultSort" | "default_sort" => spec.default_sort = expect_bool(field, key, value)?,
            "validations" => match value {
                serde_json::Value::Null => {}
                serde_json::Value::Object(validations) => spec.validations = Some(validations.clone()),
                _ => return Err(invalid(field, "`validations` must be an object")),
            },
            "order" => match value {
                serde_json::Value::Null => {}
                serde_json::Value::Number(order) => spec.order = order.as_f64(),
                _ => return Err(invalid(field, "`order` must be a number")),
            },
            "listable" => spec.listable = expect_flag(field, key, value)?,
            "sortable" => spec.sortable = expect_flag(field, key, value)?,
            "filtrable" => spec.filtrable = expect_flag(field, key, value)?,
            _ => {
                spec.meta.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(spec)
}

fn expect_bool(field: &str, key: &str, value: &serde_json::Value) -> Result<bool> {
    match value {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::Null => Ok(false),
        _ => Err(invalid(field, &format!("`{key}` must be a boolean"))),
    }
}

fn expect_flag(field: &str, key: &str, value: &serde_json::Value) -> Result<FlagMeta> {
    match value {
        serde_json::Value::Null => Ok(FlagMeta::default()),
        serde_json::Value::Bool(b) => Ok(FlagMeta::Enabled(*b)),
        serde_json::Value::Object(options) => Ok(FlagMeta::Options(options.clone())),
        _ => Err(invalid(field, &format!("`{key}` must be a boolean or an object"))),
    }
}

fn invalid(field: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidDeclaration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Resolves a type name: primitive names first, then `lookup`.
pub fn resolve_type<F>(field: &str, name: &str, lookup: &F) -> Result<FieldType>
where
    F: Fn(&str) -> Option<SchemaRef>,
{
    if let Some(primitive) = PrimitiveType::from_name(name) {
        return Ok(FieldType::Primitive(primitive));
    }
    lookup(name)
        .map(FieldType::Schema)
        .ok_or_else(|| SchemaError::UnknownType {
            field: field.to_string(),
            type_name: name.to_string(),
        })
}

impl RawDecl {
    /// Non-primitive type names this declaration refers to.
    pub fn referenced_types(&self) -> Vec<&str> {
        let name = match self {
            RawDecl::Absent => None,
            RawDecl::Named(name) => Some(name.as_str()),
            RawDecl::Array(inner) => return inner.referenced_types(),
            RawDecl::Object(spec) => spec.type_name.as_deref(),
        };
        name.filter(|name| PrimitiveType::from_name(name).is_none())
            .into_iter()
            .collect()
    }

    /// Resolves type names and produces a builder declaration.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownType`] when a name is neither primitive nor
    /// found by `lookup`.
    pub fn into_field_decl<F>(self, field: &str, lookup: &F) -> Result<FieldDecl>
    where
        F: Fn(&str) -> Option<SchemaRef>,
    {
        match self {
            RawDecl::Absent => Ok(FieldDecl::Absent),
            RawDecl::Named(name) => resolve_type(field, &name, lookup).map(FieldDecl::Type),
            RawDecl::Array(inner) => Ok(FieldDecl::array_of(inner.into_field_decl(field, lookup)?)),
            RawDecl::Object(spec) => spec.into_field_spec(field, lookup).map(FieldDecl::Spec),
        }
    }
}

impl RawSpec {
    fn into_field_spec<F>(self, field: &str, lookup: &F) -> Result<FieldSpec>
    where
        F: Fn(&str) -> Option<SchemaRef>,
    {
        let mut spec = FieldSpec::new();
        if let Some(name) = &self.type_name {
            spec = spec.with_type(resolve_type(field, name, lookup)?);
        }
        if self.is_array {
            spec = spec.array();
        }
        if let Some(default) = self.default {
            spec = spec.default_value(Value::from(default));
        }
        if self.nullable {
            spec = spec.nullable();
        }
        if self.is_virtual {
            spec = spec.virtual_field();
        }
        if let Some(validations) = self.validations {
            spec = spec.validations(validations);
        }
        if let Some(order) = self.order {
            spec = spec.order(order);
        }
        spec = spec
            .listable(self.listable)
            .sortable(self.sortable)
            .filtrable(self.filtrable);
        if self.identifier {
            spec = spec.identifier();
        }
        if self.default_sort {
            spec = spec.default_sort();
        }
        for (key, value) in self.meta {
            spec = spec.meta(key, value);
        }
        Ok(spec)
    }
}

/// Parses and resolves a declaration in one step.
pub fn declaration_to_field<F>(field: &str, json: &serde_json::Value, lookup: &F) -> Result<FieldDecl>
where
    F: Fn(&str) -> Option<SchemaRef>,
{
    parse_declaration(field, json)?.into_field_decl(field, lookup)
}
