//! Field descriptors and the declaration normalizer.
//!
//! A field can be declared in several shorthand forms ([`FieldDecl`]). The
//! normalizer turns every form into one canonical [`FieldDescriptor`], which
//! is immutable once created and handed out behind [`Arc`].

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instance::Instance;
use crate::schema::SchemaRef;
use crate::types::{PrimitiveType, Value};

/// Opaque validator arguments keyed by validator name.
pub type Validations = serde_json::Map<String, serde_json::Value>;

/// Computes a virtual field's value from the instance holding it.
pub type Getter = Arc<dyn Fn(&Instance) -> Option<Value> + Send + Sync>;

/// Receives a value assigned to a virtual field, usually to spread it over
/// stored fields.
pub type Setter = Arc<dyn Fn(&mut Instance, Value) -> Result<()> + Send + Sync>;

type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex must compile"));

/// Returns `true` when `name` can be used as a field name.
pub fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME.is_match(name)
}

/// The type of a field: a primitive or another schema definition.
#[derive(Clone)]
pub enum FieldType {
    Primitive(PrimitiveType),
    Schema(SchemaRef),
}

impl FieldType {
    /// The primitive name, or the referenced definition's name.
    pub fn name(&self) -> &str {
        match self {
            FieldType::Primitive(ty) => ty.name(),
            FieldType::Schema(schema) => schema.name(),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            FieldType::Primitive(ty) => Some(*ty),
            FieldType::Schema(_) => None,
        }
    }

    pub fn as_schema(&self) -> Option<&SchemaRef> {
        match self {
            FieldType::Primitive(_) => None,
            FieldType::Schema(schema) => Some(schema),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, FieldType::Schema(_))
    }
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Primitive(PrimitiveType::Any)
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Primitive(a), FieldType::Primitive(b)) => a == b,
            (FieldType::Schema(a), FieldType::Schema(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(ty) => write!(f, "{ty:?}"),
            FieldType::Schema(schema) => write!(f, "Schema({})", schema.name()),
        }
    }
}

impl From<PrimitiveType> for FieldType {
    fn from(ty: PrimitiveType) -> Self {
        FieldType::Primitive(ty)
    }
}

impl From<SchemaRef> for FieldType {
    fn from(schema: SchemaRef) -> Self {
        FieldType::Schema(schema)
    }
}

impl From<&SchemaRef> for FieldType {
    fn from(schema: &SchemaRef) -> Self {
        FieldType::Schema(Arc::clone(schema))
    }
}

/// A default applied when the raw input for a field is absent.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value, cloned on every use.
    Value(Value),
    /// A producer invoked on every use.
    Producer(Producer),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// A `listable` / `sortable` / `filtrable` flag: either a plain boolean or
/// an options object (which counts as enabled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagMeta {
    Enabled(bool),
    Options(serde_json::Map<String, serde_json::Value>),
}

impl FlagMeta {
    pub fn is_enabled(&self) -> bool {
        match self {
            FlagMeta::Enabled(enabled) => *enabled,
            FlagMeta::Options(_) => true,
        }
    }

    pub fn options(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            FlagMeta::Enabled(_) => None,
            FlagMeta::Options(options) => Some(options),
        }
    }
}

impl Default for FlagMeta {
    fn default() -> Self {
        FlagMeta::Enabled(false)
    }
}

impl From<bool> for FlagMeta {
    fn from(enabled: bool) -> Self {
        FlagMeta::Enabled(enabled)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for FlagMeta {
    fn from(options: serde_json::Map<String, serde_json::Value>) -> Self {
        FlagMeta::Options(options)
    }
}

/// The canonical, immutable description of one field.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub is_array: bool,
    pub default: Option<DefaultValue>,
    pub nullable: bool,
    pub is_virtual: bool,
    /// Computes the value of a virtual field on export.
    pub getter: Option<Getter>,
    /// Handles assignments to a virtual field in place of storing them.
    pub setter: Option<Setter>,
    /// Passed through to validation adapters, never interpreted here.
    pub validations: Option<Validations>,
    /// Sort key for field iteration; missing means `0`.
    pub order: Option<f64>,
    pub listable: FlagMeta,
    pub sortable: FlagMeta,
    pub filtrable: FlagMeta,
    pub identifier: bool,
    pub default_sort: bool,
    /// Any other declaration keys, relayed verbatim.
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl FieldDescriptor {
    /// An `Any`-typed descriptor with no flags set.
    pub fn new(name: impl Into<String>) -> Self {
        normalize_field(name, FieldDecl::Absent)
    }

    /// The nested definition when this is a schema-typed field.
    pub fn nested_schema(&self) -> Option<&SchemaRef> {
        self.field_type.as_schema()
    }

    pub fn sort_key(&self) -> f64 {
        self.order.unwrap_or(0.0)
    }

    /// Human-readable type, wrapped in brackets for array fields.
    pub fn type_label(&self) -> String {
        if self.is_array {
            format!("[{}]", self.field_type.name())
        } else {
            self.field_type.name().to_string()
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("is_array", &self.is_array)
            .field("default", &self.default)
            .field("nullable", &self.nullable)
            .field("is_virtual", &self.is_virtual)
            .field("getter", &self.getter.as_ref().map(|_| ".."))
            .field("setter", &self.setter.as_ref().map(|_| ".."))
            .field("validations", &self.validations)
            .field("order", &self.order)
            .field("listable", &self.listable)
            .field("sortable", &self.sortable)
            .field("filtrable", &self.filtrable)
            .field("identifier", &self.identifier)
            .field("default_sort", &self.default_sort)
            .field("meta", &self.meta)
            .finish()
    }
}

/// The descriptor-object declaration form.
///
/// # Examples
///
/// ```
/// use object_schema_core::{FieldSpec, PrimitiveType, normalize_field};
///
/// let spec = FieldSpec::of(PrimitiveType::Number)
///     .default_value(1.5)
///     .order(2.0)
///     .sortable(true);
/// let field = normalize_field("price", spec);
///
/// assert_eq!(field.name, "price");
/// assert!(field.sortable.is_enabled());
/// assert!(!field.is_array);
/// ```
#[derive(Clone, Default)]
pub struct FieldSpec {
    field_type: Option<FieldType>,
    is_array: bool,
    default: Option<DefaultValue>,
    nullable: bool,
    is_virtual: bool,
    getter: Option<Getter>,
    setter: Option<Setter>,
    validations: Option<Validations>,
    order: Option<f64>,
    listable: FlagMeta,
    sortable: FlagMeta,
    filtrable: FlagMeta,
    identifier: bool,
    default_sort: bool,
    meta: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("field_type", &self.field_type)
            .field("is_array", &self.is_array)
            .field("default", &self.default)
            .field("nullable", &self.nullable)
            .field("is_virtual", &self.is_virtual)
            .field("getter", &self.getter.as_ref().map(|_| ".."))
            .field("setter", &self.setter.as_ref().map(|_| ".."))
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(field_type: impl Into<FieldType>) -> Self {
        Self {
            field_type: Some(field_type.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, field_type: impl Into<FieldType>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Sets a default produced fresh for every construction.
    pub fn default_with(mut self, producer: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn virtual_field(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Marks the field virtual and computes its exported value with `getter`.
    pub fn getter(
        mut self,
        getter: impl Fn(&Instance) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.is_virtual = true;
        self.getter = Some(Arc::new(getter));
        self
    }

    /// Marks the field virtual and routes [`Instance::set`] on it to `setter`.
    pub fn setter(
        mut self,
        setter: impl Fn(&mut Instance, Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.is_virtual = true;
        self.setter = Some(Arc::new(setter));
        self
    }

    pub fn validation(mut self, name: impl Into<String>, args: serde_json::Value) -> Self {
        self.validations
            .get_or_insert_with(Validations::new)
            .insert(name.into(), args);
        self
    }

    pub fn validations(mut self, validations: Validations) -> Self {
        self.validations = Some(validations);
        self
    }

    pub fn order(mut self, order: f64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn listable(mut self, flag: impl Into<FlagMeta>) -> Self {
        self.listable = flag.into();
        self
    }

    pub fn sortable(mut self, flag: impl Into<FlagMeta>) -> Self {
        self.sortable = flag.into();
        self
    }

    pub fn filtrable(mut self, flag: impl Into<FlagMeta>) -> Self {
        self.filtrable = flag.into();
        self
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn default_sort(mut self) -> Self {
        self.default_sort = true;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// Every accepted way of declaring a field.
///
/// Most callers never name this type: the builder takes
/// `impl Into<FieldDecl>`, so a [`PrimitiveType`], a [`SchemaRef`], a
/// [`FieldSpec`] or a one-element array of any of those (the array
/// shorthand) can be passed directly.
#[derive(Debug, Clone, Default)]
pub enum FieldDecl {
    /// No declaration: an `Any` field.
    #[default]
    Absent,
    /// A bare type.
    Type(FieldType),
    /// Array shorthand; only the first element is consulted.
    Array(Vec<FieldDecl>),
    /// A full descriptor object.
    Spec(FieldSpec),
}

impl FieldDecl {
    /// Array shorthand for `inner`.
    pub fn array_of(inner: impl Into<FieldDecl>) -> Self {
        FieldDecl::Array(vec![inner.into()])
    }
}

impl From<PrimitiveType> for FieldDecl {
    fn from(ty: PrimitiveType) -> Self {
        FieldDecl::Type(FieldType::Primitive(ty))
    }
}

impl From<SchemaRef> for FieldDecl {
    fn from(schema: SchemaRef) -> Self {
        FieldDecl::Type(FieldType::Schema(schema))
    }
}

impl From<&SchemaRef> for FieldDecl {
    fn from(schema: &SchemaRef) -> Self {
        FieldDecl::Type(FieldType::Schema(Arc::clone(schema)))
    }
}

impl From<FieldType> for FieldDecl {
    fn from(field_type: FieldType) -> Self {
        FieldDecl::Type(field_type)
    }
}

impl From<FieldSpec> for FieldDecl {
    fn from(spec: FieldSpec) -> Self {
        FieldDecl::Spec(spec)
    }
}

impl From<()> for FieldDecl {
    fn from(_: ()) -> Self {
        FieldDecl::Absent
    }
}

impl From<Vec<FieldDecl>> for FieldDecl {
    fn from(items: Vec<FieldDecl>) -> Self {
        FieldDecl::Array(items)
    }
}

impl<T: Into<FieldDecl>, const N: usize> From<[T; N]> for FieldDecl {
    fn from(items: [T; N]) -> Self {
        FieldDecl::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Normalizes a declaration into a canonical descriptor named `name`.
///
/// Array shorthands recurse into their first element (an empty shorthand
/// yields an `Any` array); nested shorthands collapse into one array level.
///
/// # Examples
///
/// ```
/// use object_schema_core::{FieldDecl, PrimitiveType, normalize_field};
///
/// let tags = normalize_field("tags", [PrimitiveType::String]);
/// assert!(tags.is_array);
/// assert_eq!(tags.type_label(), "[String]");
///
/// let anything = normalize_field("blob", FieldDecl::Absent);
/// assert_eq!(anything.type_label(), "Any");
/// ```
pub fn normalize_field(name: impl Into<String>, decl: impl Into<FieldDecl>) -> FieldDescriptor {
    normalize(name.into(), decl.into(), false)
}

fn normalize(name: String, decl: FieldDecl, force_array: bool) -> FieldDescriptor {
    let spec = match decl {
        FieldDecl::Absent => FieldSpec::default(),
        FieldDecl::Type(field_type) => FieldSpec::of(field_type),
        FieldDecl::Array(items) => {
            let inner = items.into_iter().next().unwrap_or_default();
            return normalize(name, inner, true);
        }
        FieldDecl::Spec(spec) => spec,
    };

    FieldDescriptor {
        name,
        field_type: spec.field_type.unwrap_or_default(),
        is_array: spec.is_array || force_array,
        default: spec.default,
        nullable: spec.nullable,
        is_virtual: spec.is_virtual,
        getter: spec.getter,
        setter: spec.setter,
        validations: spec.validations,
        order: spec.order,
        listable: spec.listable,
        sortable: spec.sortable,
        filtrable: spec.filtrable,
        identifier: spec.identifier,
        default_sort: spec.default_sort,
        meta: spec.meta,
    }
}
