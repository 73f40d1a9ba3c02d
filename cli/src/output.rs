//! Output formatting for definitions, fields and exported objects.

use object_schema_core::{FieldDescriptor, FieldOptions, SchemaDefinition, Value};
use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

/// Serializable summary of one field descriptor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub nullable: bool,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations: Option<serde_json::Map<String, serde_json::Value>>,
    pub listable: bool,
    pub sortable: bool,
    pub filtrable: bool,
}

impl FieldSummary {
    pub fn new(field: &FieldDescriptor) -> Self {
        Self {
            name: field.name.clone(),
            type_label: field.type_label(),
            nullable: field.nullable,
            is_virtual: field.is_virtual,
            order: field.order,
            default: field.default.as_ref().map(|default| default.produce().to_json()),
            validations: field.validations.clone(),
            listable: field.listable.is_enabled(),
            sortable: field.sortable.is_enabled(),
            filtrable: field.filtrable.is_enabled(),
        }
    }
}

/// Serializable summary of a definition's fields and listing buckets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    pub namespace: String,
    pub identifier: String,
    pub default_sort: String,
    pub fields: Vec<FieldSummary>,
    pub listable: Vec<String>,
    pub sortable: Vec<String>,
    pub filtrable: Vec<String>,
}

impl SchemaSummary {
    pub fn new(schema: &SchemaDefinition, options: FieldOptions) -> Self {
        let info = schema.fields_info();
        let names = |names: Vec<&str>| -> Vec<String> {
            names.into_iter().map(String::from).collect()
        };
        Self {
            schema: schema.name().to_string(),
            extends: schema.parent().map(|parent| parent.name().to_string()),
            namespace: schema.namespace().to_string(),
            identifier: schema.identifier().to_string(),
            default_sort: schema.default_sort().to_string(),
            fields: schema.fields(options).map(|f| FieldSummary::new(f)).collect(),
            listable: names(info.listable_names()),
            sortable: names(info.sortable_names()),
            filtrable: names(info.filtrable_names()),
        }
    }
}

/// Serializes `value` as pretty JSON or YAML.
///
/// Table output has no generic form; callers render tables themselves.
pub fn format_serialized<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Err("table output is not supported here".to_string()),
    }
}

pub fn format_schema(summary: &SchemaSummary, format: OutputFormat) -> Result<String, String> {
    if format != OutputFormat::Table {
        return format_serialized(summary, format);
    }

    let mut out = format!(
        "Schema: {}  Namespace: {}  Identifier: {}  Default sort: {}\n",
        summary.schema, summary.namespace, summary.identifier, summary.default_sort
    );
    if let Some(ref parent) = summary.extends {
        out.push_str(&format!("  extends {parent}\n"));
    }
    out.push('\n');

    let rows: Vec<Vec<String>> = summary
        .fields
        .iter()
        .map(|field| {
            vec![
                field.name.clone(),
                field.type_label.clone(),
                flags(field),
            ]
        })
        .collect();
    out.push_str(&table(&["FIELD", "TYPE", "FLAGS"], &rows));

    for (label, names) in [
        ("Listable", &summary.listable),
        ("Sortable", &summary.sortable),
        ("Filtrable", &summary.filtrable),
    ] {
        if !names.is_empty() {
            out.push_str(&format!("\n{label}: {}", names.join(", ")));
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

pub fn format_field(summary: &FieldSummary, format: OutputFormat) -> Result<String, String> {
    if format != OutputFormat::Table {
        return format_serialized(summary, format);
    }
    let rows = vec![vec![
        summary.name.clone(),
        summary.type_label.clone(),
        flags(summary),
    ]];
    Ok(table(&["FIELD", "TYPE", "FLAGS"], &rows))
}

/// Renders exported objects, one row per object.
///
/// Columns are the visible fields of `schema` in iteration order.
pub fn format_objects(
    schema: &SchemaDefinition,
    objects: &[Value],
    options: FieldOptions,
    format: OutputFormat,
) -> Result<String, String> {
    if format != OutputFormat::Table {
        let json: Vec<serde_json::Value> = objects.iter().map(Value::to_json).collect();
        return match json.as_slice() {
            [single] => format_serialized(single, format),
            _ => format_serialized(&json, format),
        };
    }

    let columns: Vec<&str> = schema.fields(options).map(|f| f.name.as_str()).collect();
    let rows: Vec<Vec<String>> = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| {
                    object
                        .get(column)
                        .map(Value::to_display_string)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    Ok(table(&columns, &rows))
}

fn flags(field: &FieldSummary) -> String {
    let mut flags = Vec::new();
    if field.nullable {
        flags.push("nullable");
    }
    if field.is_virtual {
        flags.push("virtual");
    }
    if field.listable {
        flags.push("listable");
    }
    if field.sortable {
        flags.push("sortable");
    }
    if field.filtrable {
        flags.push("filtrable");
    }
    flags.join(",")
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header).chain(rows) {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use object_schema_core::{FieldSpec, PrimitiveType};
    use serde_json::json;

    use super::*;

    fn product() -> object_schema_core::SchemaRef {
        SchemaDefinition::builder("Product")
            .field("sku", FieldSpec::of(PrimitiveType::String).listable(true))
            .field("price", FieldSpec::of(PrimitiveType::Number).sortable(true).nullable())
            .field("tags", [PrimitiveType::String])
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_summary_json() {
        let summary = SchemaSummary::new(&product(), FieldOptions::default());
        let json: serde_json::Value =
            serde_json::from_str(&format_schema(&summary, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["schema"], "Product");
        assert_eq!(json["defaultSort"], "createdAt");
        assert_eq!(json["fields"][2]["type"], "[String]");
        assert_eq!(json["listable"], json!(["sku"]));
        assert_eq!(json["sortable"], json!(["price"]));
    }

    #[test]
    fn test_schema_table() {
        let summary = SchemaSummary::new(&product(), FieldOptions::default());
        let out = format_schema(&summary, OutputFormat::Table).unwrap();
        assert!(out.starts_with("Schema: Product"));
        assert!(out.contains("price  Number    nullable,sortable"));
        assert!(out.contains("Sortable: price"));
    }

    #[test]
    fn test_objects_table_columns() {
        let schema = product();
        let objects = vec![
            Value::from(json!({"sku": "A", "price": 2.5, "tags": ["x", "y"]})),
            Value::from(json!({"sku": "B"})),
        ];
        let out =
            format_objects(&schema, &objects, FieldOptions::default(), OutputFormat::Table).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "sku  price  tags");
        assert_eq!(lines[1], "A    2.5    x,y");
        assert_eq!(lines[2], "B");
    }

    #[test]
    fn test_single_object_is_not_wrapped() {
        let schema = product();
        let objects = vec![Value::from(json!({"sku": "A"}))];
        let out =
            format_objects(&schema, &objects, FieldOptions::default(), OutputFormat::Json).unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&out).unwrap(), json!({"sku": "A"}));
    }
}
