use std::io::Write;
use std::path::Path;

use object_schema_core::{
    DefinitionPackage, FieldOptions, Instance, SchemaDocument, Value, build_validation_tree,
};
use object_schema_registry::{
    RegistryConfig, RegistryError, SchemaRegistry, bundle_hash, read_dir_documents,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn shop_documents() -> Vec<SchemaDocument> {
    let mut resource = SchemaDocument::new("Resource")
        .with_field("id", json!({"type": "String", "identifier": true}))
        .with_field("createdAt", json!({"type": "Date", "sortable": true}));
    resource.namespace = Some("shop".to_string());

    vec![
        SchemaDocument::new("Order")
            .with_parent("Resource")
            .with_field("customer", json!({"type": "Customer", "nullable": true}))
            .with_field("lines", json!([{"type": "Line"}]))
            .with_field(
                "total",
                json!({"type": "Number", "default": 0, "validations": {"min": 1, "max": 0}}),
            ),
        SchemaDocument::new("Line")
            .with_field("sku", json!({"type": "String", "validations": {"required": true}}))
            .with_field("qty", json!({"type": "Number", "default": 1})),
        SchemaDocument::new("Customer")
            .with_parent("Resource")
            .with_field("name", json!("String"))
            .with_field("tags", json!(["String"])),
        resource,
    ]
}

fn write_document(dir: &Path, doc: &SchemaDocument) {
    let path = dir.join(format!("{}.json", doc.name.to_lowercase()));
    let mut f = std::fs::File::create(path).unwrap();
    serde_json::to_writer_pretty(&mut f, doc).unwrap();
    f.flush().unwrap();
}

fn write_package(path: &Path, docs: Vec<SchemaDocument>) {
    let generated_at = chrono::Utc::now().to_rfc3339();
    let mut package = DefinitionPackage::new("1.0.0", generated_at);
    package.schemas = docs;
    package.bundle_hash = Some(bundle_hash(&package.schemas).unwrap());
    let mut f = std::fs::File::create(path).unwrap();
    serde_json::to_writer_pretty(&mut f, &package).unwrap();
    f.flush().unwrap();
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_directory_loading_resolves_cross_references() {
    let dir = tempfile::tempdir().unwrap();
    for doc in shop_documents() {
        write_document(dir.path(), &doc);
    }

    let registry = SchemaRegistry::from_dir(dir.path()).unwrap();
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["Customer", "Line", "Order", "Resource"]
    );

    let order = registry.get("Order").unwrap();
    assert_eq!(
        order.field_names(),
        vec!["customer", "lines", "total", "id", "createdAt"]
    );
    assert_eq!(order.identifier(), "id");
    assert_eq!(order.namespace(), "Order");
    assert_eq!(registry.get("Resource").unwrap().ns("id"), "shop.id");
    assert!(order.is_or_extends(registry.get("Resource").unwrap()));
}

#[test]
fn test_directory_documents_are_read_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    for doc in shop_documents() {
        write_document(dir.path(), &doc);
    }
    let names: Vec<String> = read_dir_documents(dir.path())
        .unwrap()
        .into_iter()
        .map(|doc| doc.name)
        .collect();
    assert_eq!(names, vec!["Customer", "Line", "Order", "Resource"]);
}

#[test]
fn test_directory_with_cycle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_document(dir.path(), &SchemaDocument::new("A").with_field("b", json!("B")));
    write_document(dir.path(), &SchemaDocument::new("B").with_parent("A"));

    let err = SchemaRegistry::from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, RegistryError::CyclicReference(_)));
    assert!(err.to_string().contains("A -> B -> A"));
}

// ---------------------------------------------------------------------------
// Bundle loading
// ---------------------------------------------------------------------------

#[test]
fn test_bundle_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    write_package(&path, shop_documents());

    let registry = SchemaRegistry::from_bundle(&path).unwrap();
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.documents().len(), 4);
    assert!(registry.document("Line").is_some());
}

#[test]
fn test_bundle_with_empty_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    let mut package = DefinitionPackage::new("", "2024-01-01T00:00:00Z");
    package.schemas = shop_documents();
    std::fs::write(&path, serde_json::to_string(&package).unwrap()).unwrap();

    let err = SchemaRegistry::from_bundle(&path).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidDocuments(_)));
}

// ---------------------------------------------------------------------------
// Config-driven loading
// ---------------------------------------------------------------------------

#[test]
fn test_config_fallback_chain() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("dist")).unwrap();
    write_package(&root.path().join("dist/package.json"), shop_documents());

    let config_path = root.path().join(".object-schema.yml");
    std::fs::write(
        &config_path,
        r#"
version: "1.0"
sources:
  - dir: missing/
  - bundle: dist/package.json
defaults:
  default_sort: total
"#,
    )
    .unwrap();

    let registry = RegistryConfig::load(&config_path)
        .and_then(|config| config.registry())
        .unwrap();
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.get("Line").unwrap().default_sort(), "total");
    assert_eq!(registry.get("Line").unwrap().identifier(), "id");
}

// ---------------------------------------------------------------------------
// End-to-end instances
// ---------------------------------------------------------------------------

#[test]
fn test_instances_from_loaded_definitions() {
    let registry = SchemaRegistry::from_documents(shop_documents()).unwrap();
    let order_schema = registry.get("Order").unwrap();

    let mut order = Instance::from_json(
        order_schema,
        &json!({
            "id": 42,
            "createdAt": "2024-03-01T12:00:00Z",
            "customer": {"id": "c1", "name": "Ada", "tags": ["vip", 7]},
            "lines": [{"sku": "A-1", "qty": "3"}, {"sku": "B-2"}],
            "extra": "dropped"
        }),
    )
    .unwrap();

    assert_eq!(order.id(), Some(&Value::from("42")));
    assert!(!order.is_new());
    order.set("total", "19.5").unwrap();
    order.add("lines", json!({"sku": "C-3", "qty": 2})).unwrap();

    assert_eq!(
        order.to_json(),
        json!({
            "customer": {"name": "Ada", "tags": ["vip", "7"], "id": "c1"},
            "lines": [
                {"sku": "A-1", "qty": 3},
                {"sku": "B-2", "qty": 1},
                {"sku": "C-3", "qty": 2}
            ],
            "total": 19.5,
            "id": "42",
            "createdAt": "2024-03-01T12:00:00.000Z"
        })
    );

    let info = order_schema.fields_info();
    assert_eq!(info.sortable_names(), vec!["createdAt"]);

    let exported = order.to_object(FieldOptions::default());
    let reloaded = Instance::from_value(order_schema, &exported).unwrap();
    assert_eq!(reloaded.to_json(), order.to_json());
}

struct Describe;

impl object_schema_core::ValidatorFactory for Describe {
    type Validator = String;

    fn validator(&self, name: &str, args: &serde_json::Value) -> Option<String> {
        Some(format!("{name}({args})"))
    }
}

#[test]
fn test_validation_tree_from_documents() {
    let registry = SchemaRegistry::from_documents(shop_documents()).unwrap();
    let order = registry.get("Order").unwrap();

    let tree = build_validation_tree(
        order,
        &["total", "lines.sku", "lines.qty"],
        &Default::default(),
        &Describe,
    );
    assert_eq!(
        serde_json::to_value(&tree).unwrap(),
        json!({
            "total": {"min": "min(1)"},
            "lines": {"$each": {"sku": {"required": "required(true)"}}}
        })
    );
}
