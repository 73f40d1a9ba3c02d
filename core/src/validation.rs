//! Validation-tree adapter.
//!
//! Field descriptors carry an opaque `validations` map (validator name to
//! arguments). This module turns those maps into a tree of validators built
//! by a caller-supplied [`ValidatorFactory`], keyed by field path. Array
//! fields get an extra `$each` level, so a validator declared on
//! `lines.amount` where `lines` is an array field ends up under
//! `lines.$each.amount`.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::field::Validations;
use crate::schema::SchemaDefinition;

/// Key under which per-element validators of array fields are placed.
pub const EACH: &str = "$each";

/// Per-path argument overrides, keyed by dotted field path.
pub type ValidationModifiers = BTreeMap<String, Validations>;

/// Builds validators from their declared name and arguments.
pub trait ValidatorFactory {
    type Validator;

    /// Returns `None` when `name` is not a validator this factory knows.
    fn validator(&self, name: &str, args: &serde_json::Value) -> Option<Self::Validator>;
}

/// A node of the validation tree: validators for this path plus children.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationTree<V> {
    pub validators: BTreeMap<String, V>,
    pub children: BTreeMap<String, ValidationTree<V>>,
}

impl<V> Default for ValidationTree<V> {
    fn default() -> Self {
        Self {
            validators: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

impl<V> ValidationTree<V> {
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.children.is_empty()
    }

    /// Follows `path` segments down the tree.
    pub fn at(&self, path: &[&str]) -> Option<&ValidationTree<V>> {
        path.iter()
            .try_fold(self, |node, segment| node.children.get(*segment))
    }

    fn entry(&mut self, path: &[String]) -> &mut ValidationTree<V> {
        path.iter().fold(self, |node, segment| {
            node.children.entry(segment.clone()).or_default()
        })
    }

    fn merge(&mut self, other: ValidationTree<V>) {
        self.validators.extend(other.validators);
        for (key, child) in other.children {
            self.children.entry(key).or_default().merge(child);
        }
    }
}

impl<V: Serialize> Serialize for ValidationTree<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.validators.len() + self.children.len()))?;
        for (name, validator) in &self.validators {
            map.serialize_entry(name, validator)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

/// Builds the validation tree for `paths` of `schema`.
///
/// Paths that do not resolve, or whose field has no validations, are skipped.
/// A modifier entry for a path overrides the declared arguments of the same
/// validator name. Validators whose final arguments are falsy are left out.
///
/// # Examples
///
/// ```
/// use object_schema_core::{
///     FieldSpec, PrimitiveType, SchemaDefinition, ValidationModifiers, ValidatorFactory,
///     build_validation_tree,
/// };
/// use serde_json::json;
///
/// struct Describe;
/// impl ValidatorFactory for Describe {
///     type Validator = String;
///     fn validator(&self, name: &str, args: &serde_json::Value) -> Option<String> {
///         Some(format!("{name}({args})"))
///     }
/// }
///
/// let line = SchemaDefinition::builder("Line")
///     .field("amount", FieldSpec::of(PrimitiveType::Number).validation("min", json!(0)))
///     .build()
///     .unwrap();
/// let order = SchemaDefinition::builder("Order")
///     .field("lines", [&line])
///     .build()
///     .unwrap();
///
/// let tree = build_validation_tree(&order, &["lines.amount"], &ValidationModifiers::new(), &Describe);
/// let amount = tree.at(&["lines", "$each", "amount"]).unwrap();
/// assert_eq!(amount.validators["min"], "min(0)");
/// ```
pub fn build_validation_tree<F: ValidatorFactory>(
    schema: &SchemaDefinition,
    paths: &[&str],
    modifiers: &ValidationModifiers,
    factory: &F,
) -> ValidationTree<F::Validator> {
    let mut tree = ValidationTree::default();

    for path in paths {
        let Some(field) = schema.get_field(path) else {
            continue;
        };
        let Some(validations) = &field.validations else {
            continue;
        };
        let Some(tree_path) = tree_path(schema, path) else {
            continue;
        };

        let node = validators_for(validations, modifiers.get(*path), factory);
        tree.entry(&tree_path).merge(node);
    }

    tree
}

/// Maps a dotted field path to tree segments, adding `$each` after every
/// array-typed segment that is followed by more segments.
fn tree_path(schema: &SchemaDefinition, path: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = Some(schema);
    let mut parent_is_array = false;

    for segment in path.split('.') {
        if parent_is_array {
            segments.push(EACH.to_string());
        }
        segments.push(segment.to_string());

        let field = current?.field(segment)?;
        parent_is_array = field.is_array;
        current = field.nested_schema().map(|nested| &**nested);
    }

    Some(segments)
}

fn validators_for<F: ValidatorFactory>(
    validations: &Validations,
    modifier: Option<&Validations>,
    factory: &F,
) -> ValidationTree<F::Validator> {
    let mut node = ValidationTree::default();

    for (name, declared) in validations {
        let args = modifier
            .and_then(|modifier| modifier.get(name))
            .filter(|args| is_truthy(args))
            .unwrap_or(declared);

        if name == EACH {
            if let Some(each) = args.as_object() {
                node.children
                    .insert(EACH.to_string(), validators_for(each, None, factory));
            }
            continue;
        }

        if !is_truthy(args) {
            continue;
        }
        if let Some(validator) = factory.validator(name, args) {
            node.validators.insert(name.clone(), validator);
        }
    }

    node
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::field::FieldSpec;
    use crate::types::PrimitiveType;

    struct Echo;

    impl ValidatorFactory for Echo {
        type Validator = serde_json::Value;

        fn validator(&self, name: &str, args: &serde_json::Value) -> Option<serde_json::Value> {
            (name != "unknown").then(|| args.clone())
        }
    }

    fn order_schema() -> crate::schema::SchemaRef {
        let name = SchemaDefinition::builder("Name")
            .field("first", FieldSpec::of(PrimitiveType::String).validation("required", json!(true)))
            .build()
            .unwrap();
        SchemaDefinition::builder("Order")
            .field(
                "code",
                FieldSpec::of(PrimitiveType::String)
                    .validation("required", json!(true))
                    .validation("minLength", json!(3))
                    .validation("pattern", json!(null))
                    .validation("unknown", json!(1)),
            )
            .field(
                "names",
                FieldSpec::of(&name)
                    .array()
                    .validation("minItems", json!(1))
                    .validation("$each", json!({"present": true, "skip": false})),
            )
            .field("plain", PrimitiveType::Number)
            .build()
            .unwrap()
    }

    #[test]
    fn test_declared_validators_are_built() {
        let tree = build_validation_tree(&order_schema(), &["code"], &ValidationModifiers::new(), &Echo);
        let code = tree.at(&["code"]).unwrap();

        assert_eq!(code.validators.len(), 2);
        assert_eq!(code.validators["required"], json!(true));
        assert_eq!(code.validators["minLength"], json!(3));
    }

    #[test]
    fn test_each_marker_for_array_ancestors() {
        let tree = build_validation_tree(
            &order_schema(),
            &["names", "names.first"],
            &ValidationModifiers::new(),
            &Echo,
        );

        let names = tree.at(&["names"]).unwrap();
        assert_eq!(names.validators["minItems"], json!(1));
        let each = names.children.get(EACH).unwrap();
        assert_eq!(each.validators.get("present"), Some(&json!(true)));
        assert!(!each.validators.contains_key("skip"));
        assert_eq!(each.children["first"].validators["required"], json!(true));
    }

    #[test]
    fn test_modifiers_override_arguments() {
        let mut modifiers = ValidationModifiers::new();
        modifiers.insert(
            "code".to_string(),
            json!({"minLength": 5, "required": false}).as_object().cloned().unwrap(),
        );

        let tree = build_validation_tree(&order_schema(), &["code"], &modifiers, &Echo);
        let code = tree.at(&["code"]).unwrap();
        assert_eq!(code.validators["minLength"], json!(5));
        assert_eq!(code.validators["required"], json!(true));
    }

    #[test]
    fn test_unresolvable_or_plain_paths_are_skipped() {
        let tree = build_validation_tree(
            &order_schema(),
            &["missing", "plain", "code.deeper"],
            &ValidationModifiers::new(),
            &Echo,
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_tree_serializes_as_nested_object() {
        let tree = build_validation_tree(
            &order_schema(),
            &["names.first"],
            &ValidationModifiers::new(),
            &Echo,
        );
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"names": {"$each": {"first": {"required": true}}}})
        );
    }
}
