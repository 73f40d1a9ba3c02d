use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use object_schema_core::{
    FieldOptions, Instance, SchemaDocument, SchemaRef, ValidationModifiers, ValidatorFactory,
    Value, build_validation_tree, validate_document,
};
use object_schema_registry::{RegistryConfig, SchemaRegistry, read_document, resolve_documents};
use rayon::prelude::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod output;

use output::{FieldSummary, OutputFormat, SchemaSummary};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
const DOCUMENT_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

#[derive(Debug, Parser)]
#[command(name = "object-schema")]
#[command(about = "Validate, bundle and apply declarative object schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate schema documents and resolve their references.
    Validate(ValidateArgs),
    /// Bundle schema documents into a hashed DefinitionPackage file.
    Bundle(BundleArgs),
    /// Cast JSON/YAML data through a schema and print the exported objects.
    Cast(CastArgs),
    /// List the fields of a schema.
    Fields(FieldsArgs),
    /// Resolve a dotted field path.
    Field(FieldArgs),
    /// Print the validation tree for field paths.
    Validations(ValidationsArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema document files and/or directories of documents.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct BundleArgs {
    /// Schema document files and/or directories of documents.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output JSON bundle path.
    #[arg(long)]
    output: PathBuf,
    /// Package version (defaults to the tool version).
    #[arg(long)]
    package_version: Option<String>,
    /// Optional bundle name metadata.
    #[arg(long)]
    name: Option<String>,
    /// Optional bundle description metadata.
    #[arg(long)]
    description: Option<String>,
}

/// Where definitions come from.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct RegistryArgs {
    /// A directory of schema documents or a bundle file.
    #[arg(long)]
    schemas: Option<PathBuf>,
    /// A registry configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CastArgs {
    #[command(flatten)]
    registry: RegistryArgs,
    /// Name of the schema to cast through.
    #[arg(long)]
    schema: String,
    /// JSON/YAML data files, each holding one object or a list of objects.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Include virtual fields in the output.
    #[arg(long)]
    virtuals: bool,
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct FieldsArgs {
    #[command(flatten)]
    registry: RegistryArgs,
    #[arg(long)]
    schema: String,
    /// Include virtual fields.
    #[arg(long)]
    virtuals: bool,
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct FieldArgs {
    #[command(flatten)]
    registry: RegistryArgs,
    #[arg(long)]
    schema: String,
    /// Dotted field path (e.g. `address.city`).
    path: String,
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ValidationsArgs {
    #[command(flatten)]
    registry: RegistryArgs,
    #[arg(long)]
    schema: String,
    /// Dotted field paths to collect validators for.
    #[arg(required = true)]
    paths: Vec<String>,
    /// JSON/YAML file mapping field paths to validator argument overrides.
    #[arg(long)]
    modifiers: Option<PathBuf>,
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Bundle(args) => run_bundle(args),
        Command::Cast(args) => run_cast(args),
        Command::Fields(args) => run_fields(args),
        Command::Field(args) => run_field(args),
        Command::Validations(args) => run_validations(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let paths = collect_document_paths(&args.inputs)?;
    let documents = load_and_validate_documents(&paths)?;
    let schemas = resolve_documents(&documents).map_err(|e| e.to_string())?;
    println!(
        "Validated {} document file(s) for {} schema(s).",
        paths.len(),
        schemas.len()
    );
    Ok(())
}

fn run_bundle(args: BundleArgs) -> Result<(), String> {
    let paths = collect_document_paths(&args.inputs)?;
    let documents = load_and_validate_documents(&paths)?;
    let registry = SchemaRegistry::from_documents(documents).map_err(|e| e.to_string())?;

    let version = args.package_version.unwrap_or_else(|| PACKAGE_VERSION.to_string());
    let mut package = registry
        .to_package(version, chrono::Utc::now().to_rfc3339())
        .map_err(|e| e.to_string())?;
    package.name = args.name;
    package.description = args.description;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }

    let raw = serde_json::to_string_pretty(&package)
        .map_err(|err| format!("Failed to serialize schema bundle: {err}"))?;
    fs::write(&args.output, raw)
        .map_err(|err| format!("Failed to write '{}': {err}", args.output.display()))?;

    println!(
        "Bundled {} schema(s) into '{}'.",
        package.schema_count(),
        args.output.display()
    );
    Ok(())
}

fn run_cast(args: CastArgs) -> Result<(), String> {
    let registry = load_registry(&args.registry)?;
    let schema = find_schema(&registry, &args.schema)?;
    let options = FieldOptions {
        virtuals: args.virtuals,
    };

    let batches: Vec<Vec<Value>> = args
        .inputs
        .par_iter()
        .map(|path| cast_file(schema, path, options))
        .collect::<Result<_, String>>()?;
    let objects: Vec<Value> = batches.into_iter().flatten().collect();

    debug!(schema = %args.schema, objects = objects.len(), "Cast input objects");
    let out = output::format_objects(schema, &objects, options, args.format)?;
    println!("{}", out.trim_end());
    Ok(())
}

fn run_fields(args: FieldsArgs) -> Result<(), String> {
    let registry = load_registry(&args.registry)?;
    let schema = find_schema(&registry, &args.schema)?;
    let options = FieldOptions {
        virtuals: args.virtuals,
    };
    let summary = SchemaSummary::new(schema, options);
    println!("{}", output::format_schema(&summary, args.format)?.trim_end());
    Ok(())
}

fn run_field(args: FieldArgs) -> Result<(), String> {
    let registry = load_registry(&args.registry)?;
    let schema = find_schema(&registry, &args.schema)?;
    let field = schema
        .get_field(&args.path)
        .ok_or_else(|| format!("Field '{}' does not exist in {}", args.path, schema.name()))?;
    let summary = FieldSummary::new(field);
    println!("{}", output::format_field(&summary, args.format)?.trim_end());
    Ok(())
}

/// Describes validators as their name and effective arguments.
struct DescribeValidator;

impl ValidatorFactory for DescribeValidator {
    type Validator = serde_json::Value;

    fn validator(&self, _name: &str, args: &serde_json::Value) -> Option<serde_json::Value> {
        Some(args.clone())
    }
}

fn run_validations(args: ValidationsArgs) -> Result<(), String> {
    let registry = load_registry(&args.registry)?;
    let schema = find_schema(&registry, &args.schema)?;
    let modifiers: ValidationModifiers = match &args.modifiers {
        Some(path) => read_data_file(path)?,
        None => ValidationModifiers::new(),
    };

    let paths: Vec<&str> = args.paths.iter().map(String::as_str).collect();
    let tree = build_validation_tree(schema, &paths, &modifiers, &DescribeValidator);
    let format = match args.format {
        OutputFormat::Table => OutputFormat::Yaml,
        other => other,
    };
    println!("{}", output::format_serialized(&tree, format)?.trim_end());
    Ok(())
}

fn load_registry(args: &RegistryArgs) -> Result<SchemaRegistry, String> {
    match (&args.schemas, &args.config) {
        (Some(path), _) if path.is_dir() => SchemaRegistry::from_dir(path)
            .map_err(|e| format!("Failed to load schemas from '{}': {e}", path.display())),
        (Some(path), _) => SchemaRegistry::from_bundle(path)
            .map_err(|e| format!("Failed to load bundle '{}': {e}", path.display())),
        (None, Some(config)) => RegistryConfig::load(config)
            .and_then(|config| config.registry())
            .map_err(|e| format!("Failed to load registry from '{}': {e}", config.display())),
        (None, None) => Err("Specify a schema source: --schemas or --config".to_string()),
    }
}

fn find_schema<'a>(registry: &'a SchemaRegistry, name: &str) -> Result<&'a SchemaRef, String> {
    registry.get(name).ok_or_else(|| {
        let known: Vec<&str> = registry.names().collect();
        format!("Unknown schema '{name}' (known: {})", known.join(", "))
    })
}

fn cast_file(schema: &SchemaRef, path: &Path, options: FieldOptions) -> Result<Vec<Value>, String> {
    let data: serde_json::Value = read_data_file(path)?;
    let records = match data {
        serde_json::Value::Array(records) => records,
        record => vec![record],
    };

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            Instance::from_json(schema, record)
                .map(|instance| instance.to_object(options))
                .map_err(|e| format!("{}[{index}]: {e}", path.display()))
        })
        .collect()
}

fn read_data_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let file = fs::File::open(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    let reader = BufReader::new(file);
    match path.extension().and_then(OsStr::to_str) {
        Some("yaml" | "yml") => serde_yaml::from_reader(reader)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display())),
        _ => serde_json::from_reader(reader)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display())),
    }
}

fn is_document_path(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
}

fn collect_document_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut paths = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .map_err(|err| format!("Failed to read '{}': {err}", input.display()))?;
            for entry in entries {
                let path = entry
                    .map_err(|err| format!("Failed to read '{}': {err}", input.display()))?
                    .path();
                if is_document_path(&path) {
                    paths.insert(path);
                }
            }
            continue;
        }

        if input.is_file() {
            if !is_document_path(input) {
                return Err(format!(
                    "Schema document '{}' must end in .json, .yaml or .yml",
                    input.display()
                ));
            }
            paths.insert(input.clone());
            continue;
        }

        return Err(format!("Schema path '{}' does not exist", input.display()));
    }

    if paths.is_empty() {
        return Err("No schema documents found".to_string());
    }
    Ok(paths.into_iter().collect())
}

fn load_and_validate_documents(paths: &[PathBuf]) -> Result<Vec<SchemaDocument>, String> {
    let mut documents = Vec::with_capacity(paths.len());

    for path in paths {
        let document = read_document(path)
            .map_err(|err| format!("Failed to load '{}': {err}", path.display()))?;

        let errors = validate_document(&document);
        if let Some(first) = errors.first() {
            return Err(format!(
                "Schema validation failed for '{}': {first}",
                path.display()
            ));
        }

        documents.push(document);
    }

    Ok(documents)
}
