//! Schema definitions: named, inheritable field tables.
//!
//! A [`SchemaDefinition`] is built once through [`SchemaBuilder`] and then
//! frozen. Definitions are shared as [`SchemaRef`] (`Arc<SchemaDefinition>`),
//! so field types can reference other definitions and derived definitions can
//! link to their parent without copying it.
//!
//! Lookup is own-first: a derived definition checks its own declarations and
//! falls through to the parent chain for anything it does not shadow.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::field::{FieldDecl, FieldDescriptor, FlagMeta, is_valid_field_name, normalize_field};
use crate::types::Value;

/// Shared handle to a frozen definition.
pub type SchemaRef = Arc<SchemaDefinition>;

/// Post-processes an exported object.
pub type Transform = Arc<dyn Fn(Value, &FieldOptions) -> Value + Send + Sync>;

const DEFAULT_IDENTIFIER: &str = "id";
const DEFAULT_SORT: &str = "createdAt";

/// Options for field iteration and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldOptions {
    /// Include virtual fields.
    pub virtuals: bool,
}

impl FieldOptions {
    pub fn with_virtuals() -> Self {
        Self { virtuals: true }
    }

    fn includes(&self, field: &FieldDescriptor) -> bool {
        self.virtuals || !field.is_virtual
    }
}

/// Fields partitioned by their listing metadata.
#[derive(Debug, Clone, Default)]
pub struct FieldsInfo {
    pub listable: Vec<Arc<FieldDescriptor>>,
    pub sortable: Vec<Arc<FieldDescriptor>>,
    pub filtrable: Vec<Arc<FieldDescriptor>>,
}

impl FieldsInfo {
    fn collect<'a>(fields: impl IntoIterator<Item = &'a Arc<FieldDescriptor>>) -> Self {
        let mut info = Self::default();
        for field in fields {
            if field.listable.is_enabled() {
                info.listable.push(Arc::clone(field));
            }
            if field.sortable.is_enabled() {
                info.sortable.push(Arc::clone(field));
            }
            if field.filtrable.is_enabled() {
                info.filtrable.push(Arc::clone(field));
            }
        }
        info
    }

    pub fn listable_names(&self) -> Vec<&str> {
        self.listable.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn sortable_names(&self) -> Vec<&str> {
        self.sortable.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn filtrable_names(&self) -> Vec<&str> {
        self.filtrable.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Per-field metadata overrides for [`SchemaDefinition::fields_info_extended`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub name: String,
    pub order: Option<f64>,
    pub listable: Option<FlagMeta>,
    pub sortable: Option<FlagMeta>,
    pub filtrable: Option<FlagMeta>,
}

impl FieldPatch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn order(mut self, order: f64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn listable(mut self, flag: impl Into<FlagMeta>) -> Self {
        self.listable = Some(flag.into());
        self
    }

    pub fn sortable(mut self, flag: impl Into<FlagMeta>) -> Self {
        self.sortable = Some(flag.into());
        self
    }

    pub fn filtrable(mut self, flag: impl Into<FlagMeta>) -> Self {
        self.filtrable = Some(flag.into());
        self
    }

    fn apply(&self, field: &mut FieldDescriptor) {
        if let Some(order) = self.order {
            field.order = Some(order);
        }
        if let Some(flag) = &self.listable {
            field.listable = flag.clone();
        }
        if let Some(flag) = &self.sortable {
            field.sortable = flag.clone();
        }
        if let Some(flag) = &self.filtrable {
            field.filtrable = flag.clone();
        }
    }
}

/// A frozen schema definition.
///
/// # Examples
///
/// ```
/// use object_schema_core::{PrimitiveType, SchemaDefinition};
///
/// let point = SchemaDefinition::builder("Point")
///     .field("x", PrimitiveType::Number)
///     .field("y", PrimitiveType::Number)
///     .build()
///     .unwrap();
/// let rect = SchemaDefinition::builder("Rect")
///     .extends(&point)
///     .field("width", PrimitiveType::Number)
///     .field("height", PrimitiveType::Number)
///     .build()
///     .unwrap();
///
/// assert_eq!(rect.field_names(), vec!["width", "height", "x", "y"]);
/// assert!(rect.is_or_extends(&point));
/// assert_eq!(rect.ns("width"), "Rect.width");
/// ```
pub struct SchemaDefinition {
    name: String,
    namespace: String,
    description: Option<String>,
    parent: Option<SchemaRef>,
    own_fields: Vec<Arc<FieldDescriptor>>,
    own_index: HashMap<String, usize>,
    /// Own fields then inherited non-shadowed fields, stable-sorted by order.
    resolved: Vec<Arc<FieldDescriptor>>,
    identifier: String,
    default_sort: String,
    transform: Option<Transform>,
    fields_info: OnceLock<FieldsInfo>,
}

impl SchemaDefinition {
    /// Starts a builder for a definition named `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource namespace; defaults to the definition name.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns `"<namespace>.<field>"`.
    pub fn ns(&self, field: &str) -> String {
        format!("{}.{field}", self.namespace)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parent(&self) -> Option<&SchemaRef> {
        self.parent.as_ref()
    }

    /// Name of the identifier field (default `id`).
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Name of the default sort field (default `createdAt`).
    pub fn default_sort(&self) -> &str {
        &self.default_sort
    }

    /// The export transform, own or inherited.
    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Fields declared directly on this definition, in declaration order.
    pub fn own_fields(&self) -> &[Arc<FieldDescriptor>] {
        &self.own_fields
    }

    /// Looks up a field by exact name, own declarations first.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        match self.own_index.get(name) {
            Some(&index) => self.own_fields.get(index),
            None => self.parent.as_ref().and_then(|parent| parent.field(name)),
        }
    }

    /// Resolves a dotted path (`"a.b.c"`) through nested schema fields.
    ///
    /// Returns `None` when any segment is unknown or when the path continues
    /// past a field that is not schema-typed.
    pub fn get_field(&self, path: &str) -> Option<&Arc<FieldDescriptor>> {
        let segments: Vec<&str> = path.split('.').collect();
        self.field_path(&segments)
    }

    /// Resolves a path given as segments.
    pub fn field_path(&self, segments: &[&str]) -> Option<&Arc<FieldDescriptor>> {
        let (first, rest) = segments.split_first()?;
        let field = self.field(first)?;
        if rest.is_empty() {
            return Some(field);
        }
        field.nested_schema()?.field_path(rest)
    }

    /// Iterates visible fields in resolved order.
    pub fn fields(&self, options: FieldOptions) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.resolved.iter().filter(move |field| options.includes(field))
    }

    /// Calls `callback` for every visible field in resolved order.
    pub fn each_field(&self, options: FieldOptions, mut callback: impl FnMut(&FieldDescriptor)) {
        for field in self.fields(options) {
            callback(field);
        }
    }

    /// All field names, virtual ones included, in resolved order.
    pub fn field_names(&self) -> Vec<&str> {
        self.resolved.iter().map(|field| field.name.as_str()).collect()
    }

    /// Listable / sortable / filtrable buckets, computed once per definition.
    pub fn fields_info(&self) -> &FieldsInfo {
        self.fields_info
            .get_or_init(|| FieldsInfo::collect(&self.resolved))
    }

    /// Buckets computed over the fields merged with `patches`.
    ///
    /// A patch naming an undeclared field adds a metadata-only `Any` field.
    pub fn fields_info_extended(&self, patches: &[FieldPatch]) -> FieldsInfo {
        let mut merged: Vec<Arc<FieldDescriptor>> = self.resolved.clone();
        for patch in patches {
            match merged.iter_mut().find(|field| field.name == patch.name) {
                Some(existing) => {
                    let mut field = FieldDescriptor::clone(existing);
                    patch.apply(&mut field);
                    *existing = Arc::new(field);
                }
                None => {
                    let mut field = FieldDescriptor::new(&patch.name);
                    patch.apply(&mut field);
                    merged.push(Arc::new(field));
                }
            }
        }
        merged.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
        FieldsInfo::collect(&merged)
    }

    /// Returns `true` when this definition is `other` or derives from it.
    pub fn is_or_extends(&self, other: &SchemaDefinition) -> bool {
        let mut current = Some(self);
        while let Some(schema) = current {
            if std::ptr::eq(schema, other) {
                return true;
            }
            current = schema.parent.as_deref();
        }
        false
    }
}

impl fmt::Debug for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDefinition")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .field("fields", &self.field_names())
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

struct PendingField {
    name: String,
    decl: FieldDecl,
    force_virtual: bool,
}

/// Fluent builder for [`SchemaDefinition`].
pub struct SchemaBuilder {
    name: String,
    namespace: Option<String>,
    description: Option<String>,
    parent: Option<SchemaRef>,
    fields: Vec<PendingField>,
    identifier: Option<String>,
    default_sort: Option<String>,
    transform: Option<Transform>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            description: None,
            parent: None,
            fields: Vec::new(),
            identifier: None,
            default_sort: None,
            transform: None,
        }
    }

    /// Inherits every field of `parent` not redeclared here.
    pub fn extends(mut self, parent: &SchemaRef) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, decl: impl Into<FieldDecl>) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            decl: decl.into(),
            force_virtual: false,
        });
        self
    }

    /// Declares a virtual field, excluded from iteration unless requested.
    pub fn virtual_field(mut self, name: impl Into<String>, decl: impl Into<FieldDecl>) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            decl: decl.into(),
            force_virtual: true,
        });
        self
    }

    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = Some(field.into());
        self
    }

    pub fn default_sort(mut self, field: impl Into<String>) -> Self {
        self.default_sort = Some(field.into());
        self
    }

    /// Sets the hook applied to every exported object of this definition.
    pub fn transform(
        mut self,
        transform: impl Fn(Value, &FieldOptions) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Normalizes every declaration and freezes the definition.
    ///
    /// # Errors
    ///
    /// [`SchemaError::InvalidFieldName`] for names that are not identifiers,
    /// [`SchemaError::DuplicateField`] when a name is declared twice.
    pub fn build(self) -> Result<SchemaRef> {
        let mut own_fields = Vec::with_capacity(self.fields.len());
        let mut own_index = HashMap::with_capacity(self.fields.len());

        for pending in self.fields {
            if !is_valid_field_name(&pending.name) {
                return Err(SchemaError::InvalidFieldName {
                    schema: self.name,
                    field: pending.name,
                });
            }
            if own_index.contains_key(&pending.name) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name,
                    field: pending.name,
                });
            }

            let mut descriptor = normalize_field(pending.name, pending.decl);
            if pending.force_virtual {
                descriptor.is_virtual = true;
            }
            own_index.insert(descriptor.name.clone(), own_fields.len());
            own_fields.push(Arc::new(descriptor));
        }

        let mut resolved = own_fields.clone();
        if let Some(parent) = &self.parent {
            let shadowed: HashSet<&str> = own_index.keys().map(String::as_str).collect();
            resolved.extend(
                parent
                    .resolved
                    .iter()
                    .filter(|field| !shadowed.contains(field.name.as_str()))
                    .cloned(),
            );
        }
        resolved.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

        let flagged = |pick: fn(&FieldDescriptor) -> bool| {
            own_fields
                .iter()
                .rev()
                .find(|field| pick(field))
                .map(|field| field.name.clone())
        };
        let identifier = self
            .identifier
            .or_else(|| flagged(|field| field.identifier))
            .or_else(|| self.parent.as_ref().map(|parent| parent.identifier.clone()))
            .unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string());
        let default_sort = self
            .default_sort
            .or_else(|| flagged(|field| field.default_sort))
            .or_else(|| self.parent.as_ref().map(|parent| parent.default_sort.clone()))
            .unwrap_or_else(|| DEFAULT_SORT.to_string());
        let transform = self
            .transform
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.transform.clone()));

        debug!(
            schema = %self.name,
            parent = ?self.parent.as_ref().map(|parent| parent.name()),
            own_fields = own_fields.len(),
            fields = resolved.len(),
            "Built schema definition"
        );

        Ok(Arc::new(SchemaDefinition {
            namespace: self.namespace.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            description: self.description,
            parent: self.parent,
            own_fields,
            own_index,
            resolved,
            identifier,
            default_sort,
            transform,
            fields_info: OnceLock::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::types::PrimitiveType;

    fn point() -> SchemaRef {
        SchemaDefinition::builder("Point")
            .field("x", PrimitiveType::Number)
            .field("y", PrimitiveType::Number)
            .build()
            .unwrap()
    }

    #[test]
    fn test_inherited_field_order() {
        let point = point();
        let rect = SchemaDefinition::builder("Rect")
            .extends(&point)
            .field("width", PrimitiveType::Number)
            .field("height", PrimitiveType::Number)
            .build()
            .unwrap();

        assert_eq!(rect.field_names(), vec!["width", "height", "x", "y"]);
        assert_eq!(point.field_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_shadowing_own_declaration_wins() {
        let point = point();
        let labelled = SchemaDefinition::builder("Labelled")
            .extends(&point)
            .field("y", PrimitiveType::String)
            .build()
            .unwrap();

        assert_eq!(labelled.field_names(), vec!["y", "x"]);
        assert_eq!(
            labelled.field("y").unwrap().field_type.as_primitive(),
            Some(PrimitiveType::String)
        );
        assert_eq!(
            labelled.field("x").unwrap().field_type.as_primitive(),
            Some(PrimitiveType::Number)
        );
        assert_eq!(
            point.field("y").unwrap().field_type.as_primitive(),
            Some(PrimitiveType::Number)
        );
    }

    #[test]
    fn test_order_sorts_stably() {
        let schema = SchemaDefinition::builder("Ordered")
            .field("c", FieldSpec::new().order(2.0))
            .field("a", FieldSpec::new())
            .field("b", FieldSpec::new().order(-1.0))
            .field("d", FieldSpec::new())
            .build()
            .unwrap();

        assert_eq!(schema.field_names(), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_dotted_path_lookup() {
        let point = point();
        let rect = SchemaDefinition::builder("Rect")
            .field("origin", &point)
            .field("label", PrimitiveType::String)
            .build()
            .unwrap();

        assert_eq!(rect.get_field("origin.x").unwrap().name, "x");
        assert_eq!(rect.get_field("origin").unwrap().name, "origin");
        assert!(rect.get_field("label.length").is_none());
        assert!(rect.get_field("origin.z").is_none());
        assert!(rect.get_field("missing").is_none());
        assert!(rect.get_field("").is_none());
    }

    #[test]
    fn test_virtual_fields_filtered_by_default() {
        let schema = SchemaDefinition::builder("User")
            .field("first", PrimitiveType::String)
            .virtual_field("full", PrimitiveType::String)
            .build()
            .unwrap();

        let plain: Vec<_> = schema.fields(FieldOptions::default()).map(|f| f.name.clone()).collect();
        let all: Vec<_> = schema.fields(FieldOptions::with_virtuals()).map(|f| f.name.clone()).collect();
        assert_eq!(plain, vec!["first"]);
        assert_eq!(all, vec!["first", "full"]);
        assert_eq!(schema.field_names(), vec!["first", "full"]);
    }

    #[test]
    fn test_builder_rejects_bad_names() {
        let duplicate = SchemaDefinition::builder("Dup")
            .field("a", PrimitiveType::Any)
            .field("a", PrimitiveType::String)
            .build()
            .unwrap_err();
        assert_eq!(
            duplicate,
            SchemaError::DuplicateField {
                schema: "Dup".to_string(),
                field: "a".to_string()
            }
        );

        let dotted = SchemaDefinition::builder("Dotted")
            .field("a.b", PrimitiveType::Any)
            .build()
            .unwrap_err();
        assert!(matches!(dotted, SchemaError::InvalidFieldName { .. }));
    }

    #[test]
    fn test_identifier_and_namespace_resolution() {
        let base = SchemaDefinition::builder("Resource")
            .field("uuid", FieldSpec::of(PrimitiveType::String).identifier())
            .field("updatedAt", FieldSpec::of(PrimitiveType::Date).default_sort())
            .build()
            .unwrap();
        let derived = SchemaDefinition::builder("Post")
            .extends(&base)
            .namespace("blog")
            .build()
            .unwrap();
        let plain = point();

        assert_eq!(base.identifier(), "uuid");
        assert_eq!(derived.identifier(), "uuid");
        assert_eq!(derived.default_sort(), "updatedAt");
        assert_eq!(plain.identifier(), "id");
        assert_eq!(plain.default_sort(), "createdAt");
        assert_eq!(derived.ns("title"), "blog.title");
        assert_eq!(plain.namespace(), "Point");
    }

    #[test]
    fn test_fields_info_buckets() {
        let schema = SchemaDefinition::builder("Product")
            .field("name", FieldSpec::of(PrimitiveType::String).listable(true).sortable(true))
            .field("price", FieldSpec::of(PrimitiveType::Number).filtrable(true))
            .field("secret", PrimitiveType::String)
            .build()
            .unwrap();

        let info = schema.fields_info();
        assert_eq!(info.listable_names(), vec!["name"]);
        assert_eq!(info.sortable_names(), vec!["name"]);
        assert_eq!(info.filtrable_names(), vec!["price"]);
        assert!(std::ptr::eq(info, schema.fields_info()));

        let extended = schema.fields_info_extended(&[
            FieldPatch::new("secret").listable(true).order(-1.0),
            FieldPatch::new("computed").sortable(true),
            FieldPatch::new("name").listable(false),
        ]);
        assert_eq!(extended.listable_names(), vec!["secret"]);
        assert_eq!(extended.sortable_names(), vec!["name", "computed"]);
        assert_eq!(schema.fields_info().listable_names(), vec!["name"]);
    }

    #[test]
    fn test_is_or_extends_walks_parent_chain() {
        let point = point();
        let rect = SchemaDefinition::builder("Rect").extends(&point).build().unwrap();
        let square = SchemaDefinition::builder("Square").extends(&rect).build().unwrap();
        let other = point_clone_named("Point");

        assert!(square.is_or_extends(&point));
        assert!(square.is_or_extends(&square));
        assert!(!point.is_or_extends(&rect));
        assert!(!square.is_or_extends(&other));
    }

    fn point_clone_named(name: &str) -> SchemaRef {
        SchemaDefinition::builder(name)
            .field("x", PrimitiveType::Number)
            .build()
            .unwrap()
    }

    #[test]
    fn test_definitions_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRef>();
    }
}
