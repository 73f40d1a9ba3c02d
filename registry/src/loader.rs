//! Schema registry loading with builder pattern and fallback chains.
//!
//! Provides [`SchemaRegistry`] for name-based lookup of built definitions
//! and [`RegistryBuilder`] for loading a registry from multiple sources with
//! automatic fallback.
//!
//! # Loading patterns
//!
//! ```no_run
//! use object_schema_registry::SchemaRegistry;
//!
//! // Load from a directory of JSON/YAML documents
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! assert!(registry.get("User").is_some());
//!
//! // Load from a single DefinitionPackage JSON bundle
//! let registry = SchemaRegistry::from_bundle("dist/package.json").unwrap();
//!
//! // Use the builder for a fallback chain
//! let registry = SchemaRegistry::builder()
//!     .from_dir("schemas/")
//!     .from_bundle("dist/package.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::{BTreeMap, HashSet};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use object_schema_core::{DefinitionPackage, SchemaDocument, SchemaRef, validate_package};
use tracing::{debug, warn};

use crate::bundle::{seal_package, verify_package};
use crate::config::RegistryDefaults;
use crate::error::{RegistryError, Result};
use crate::resolve::{apply_defaults, resolve_documents};

/// Describes where a [`SchemaRegistry`] was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrySource {
    /// Built from in-memory documents.
    Documents,
    /// Built from an in-memory [`DefinitionPackage`].
    Package,
    /// Loaded from a directory of individual JSON/YAML documents.
    Directory(PathBuf),
    /// Loaded from a single [`DefinitionPackage`] JSON file.
    Bundle(PathBuf),
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<RegistrySource>),
}

/// Built schema definitions indexed by name.
///
/// Every definition is resolved against the others of the same registry, so
/// nested field types and parents are shared [`SchemaRef`]s.
///
/// # Examples
///
/// ```
/// use object_schema_core::{Instance, SchemaDocument};
/// use object_schema_registry::SchemaRegistry;
/// use serde_json::json;
///
/// let registry = SchemaRegistry::from_documents(vec![
///     SchemaDocument::new("Point")
///         .with_field("x", json!("Number"))
///         .with_field("y", json!("Number")),
/// ])
/// .unwrap();
///
/// let point = registry.get("Point").unwrap();
/// let p = Instance::from_json(point, &json!({"x": "1", "y": 2})).unwrap();
/// assert_eq!(p.to_json(), json!({"x": 1, "y": 2}));
/// ```
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, SchemaRef>,
    documents: Vec<SchemaDocument>,
    source: RegistrySource,
}

impl SchemaRegistry {
    /// Returns a new [`RegistryBuilder`] for configuring a fallback chain.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Resolves in-memory documents.
    ///
    /// # Errors
    ///
    /// Any resolution error; see
    /// [`resolve_documents`](crate::resolve_documents).
    pub fn from_documents(documents: Vec<SchemaDocument>) -> Result<Self> {
        Self::assemble(documents, RegistrySource::Documents)
    }

    /// Resolves the documents of a package after checking its version and
    /// hash.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidChecksum`] when the package hash does not
    /// match, plus any validation or resolution error.
    pub fn from_package(package: &DefinitionPackage) -> Result<Self> {
        check_package(package)?;
        Self::assemble(package.schemas.clone(), RegistrySource::Package)
    }

    /// Loads one document per `*.json`, `*.yaml` or `*.yml` file of a
    /// directory. Other files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IoError`] if the directory or a file cannot be
    /// read, [`RegistryError::JsonError`] / [`RegistryError::YamlError`] if a
    /// file does not parse, plus any resolution error.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let documents = read_dir_documents(path)?;
        Self::assemble(documents, RegistrySource::Directory(path.to_path_buf()))
    }

    /// Loads a single [`DefinitionPackage`] JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IoError`] if the file cannot be read,
    /// [`RegistryError::JsonError`] if parsing fails, plus everything
    /// [`from_package`](Self::from_package) reports.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let package = read_bundle(path)?;
        check_package(&package)?;
        Self::assemble(package.schemas, RegistrySource::Bundle(path.to_path_buf()))
    }

    fn assemble(documents: Vec<SchemaDocument>, source: RegistrySource) -> Result<Self> {
        let schemas = resolve_documents(&documents)?;
        debug!(source = ?source, schemas = schemas.len(), "Loaded schema registry");
        Ok(Self {
            schemas,
            documents,
            source,
        })
    }

    /// Looks up a definition by name.
    pub fn get(&self, name: &str) -> Option<&SchemaRef> {
        self.schemas.get(name)
    }

    /// Looks up the document a definition was built from.
    pub fn document(&self, name: &str) -> Option<&SchemaDocument> {
        self.documents.iter().find(|doc| doc.name == name)
    }

    /// Registers a definition built in code, replacing any definition of the
    /// same name.
    ///
    /// Code-built definitions have no document and are not part of
    /// [`to_package`](Self::to_package).
    ///
    /// # Examples
    ///
    /// ```
    /// use object_schema_core::{PrimitiveType, SchemaDefinition};
    /// use object_schema_registry::SchemaRegistry;
    ///
    /// let mut registry = SchemaRegistry::from_documents(Vec::new()).unwrap();
    /// let tag = SchemaDefinition::builder("Tag")
    ///     .field("label", PrimitiveType::String)
    ///     .build()
    ///     .unwrap();
    /// registry.insert(tag);
    /// assert!(registry.contains("Tag"));
    /// ```
    pub fn insert(&mut self, schema: SchemaRef) {
        self.schemas.insert(schema.name().to_string(), schema);
    }

    /// Returns `true` if the registry holds a definition named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Returns the number of definitions.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if the registry holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns an iterator over definition names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(|s| s.as_str())
    }

    /// The documents this registry was resolved from, in load order.
    pub fn documents(&self) -> &[SchemaDocument] {
        &self.documents
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &RegistrySource {
        &self.source
    }

    /// Packs the loaded documents into a sealed [`DefinitionPackage`].
    pub fn to_package(
        &self,
        version: impl Into<String>,
        generated_at: impl Into<String>,
    ) -> Result<DefinitionPackage> {
        let mut package = DefinitionPackage::new(version, generated_at);
        package.schemas = self.documents.clone();
        seal_package(&mut package)?;
        Ok(package)
    }
}

fn check_package(package: &DefinitionPackage) -> Result<()> {
    let errors = validate_package(package);
    if !errors.is_empty() {
        return Err(errors.into());
    }
    verify_package(package)
}

fn read_bundle(path: &Path) -> Result<DefinitionPackage> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Reads one declaration document from a JSON or YAML file.
///
/// # Errors
///
/// [`RegistryError::UnsupportedFormat`] for any other extension.
pub fn read_document(path: &Path) -> Result<SchemaDocument> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_reader(reader)?),
        Some("yaml" | "yml") => Ok(serde_yaml::from_reader(reader)?),
        _ => Err(RegistryError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Reads every JSON/YAML document of a directory, ordered by file name.
pub fn read_dir_documents(path: &Path) -> Result<Vec<SchemaDocument>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let file_path = entry?.path();
        match file_path.extension().and_then(|e| e.to_str()) {
            Some("json" | "yaml" | "yml") => files.push(file_path),
            _ => debug!(path = %file_path.display(), "Skipping non-document file"),
        }
    }
    files.sort();

    files.iter().map(|file| read_document(file)).collect()
}

/// Builder for constructing a [`SchemaRegistry`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first source that
/// loads and resolves wins; failures are logged and the next source is
/// tried. If all fail, [`RegistryError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use object_schema_registry::SchemaRegistry;
///
/// let registry = SchemaRegistry::builder()
///     .from_dir("/opt/schemas/")
///     .from_bundle("/opt/schemas.json")
///     .exclude(["Legacy".to_string()])
///     .build()
///     .unwrap();
/// ```
pub struct RegistryBuilder {
    sources: Vec<RegistrySource>,
    exclude: HashSet<String>,
    defaults: RegistryDefaults,
}

impl RegistryBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            exclude: HashSet::new(),
            defaults: RegistryDefaults::default(),
        }
    }

    /// Adds a directory of JSON/YAML documents as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Directory(path.into()));
        self
    }

    /// Adds a [`DefinitionPackage`] bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Bundle(path.into()));
        self
    }

    /// Drops documents with these names from every source before resolution.
    pub fn exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(names);
        self
    }

    /// Identifier / default-sort fallbacks for root documents.
    pub fn defaults(mut self, defaults: RegistryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Attempts to load the registry from configured sources in order.
    pub fn build(self) -> Result<SchemaRegistry> {
        if self.sources.is_empty() {
            return Err(RegistryError::NoSourcesAvailable);
        }

        for source in &self.sources {
            let documents = match source {
                RegistrySource::Directory(path) => read_dir_documents(path),
                RegistrySource::Bundle(path) => read_bundle(path)
                    .and_then(|package| check_package(&package).map(|()| package.schemas)),
                _ => continue,
            };

            match documents.and_then(|documents| self.assemble(documents)) {
                Ok(mut registry) => {
                    registry.source = RegistrySource::Multiple(self.sources.clone());
                    return Ok(registry);
                }
                Err(err) => warn!(source = ?source, error = %err, "Schema source failed"),
            }
        }

        Err(RegistryError::NoSourcesAvailable)
    }

    fn assemble(&self, mut documents: Vec<SchemaDocument>) -> Result<SchemaRegistry> {
        documents.retain(|doc| !self.exclude.contains(&doc.name));
        apply_defaults(&mut documents, &self.defaults);
        SchemaRegistry::assemble(documents, RegistrySource::Documents)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn point() -> SchemaDocument {
        SchemaDocument::new("Point")
            .with_field("x", json!("Number"))
            .with_field("y", json!("Number"))
    }

    fn write_json(dir: &Path, doc: &SchemaDocument) {
        let path = dir.join(format!("{}.json", doc.name));
        let mut f = std::fs::File::create(path).unwrap();
        serde_json::to_writer_pretty(&mut f, doc).unwrap();
        f.flush().unwrap();
    }

    fn write_bundle(path: &Path, docs: Vec<SchemaDocument>) {
        let mut package = DefinitionPackage::new("1.0.0", "2024-01-01T00:00:00Z");
        package.schemas = docs;
        seal_package(&mut package).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        serde_json::to_writer_pretty(&mut f, &package).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn test_from_dir_mixed_formats() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), &point());
        std::fs::write(
            dir.path().join("shape.yaml"),
            "name: Shape\nfields:\n  origin: Point\n  label: String\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "# not a schema\n").unwrap();

        let registry = SchemaRegistry::from_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Point", "Shape"]);
        assert_eq!(
            registry.get("Shape").unwrap().field_names(),
            vec!["origin", "label"]
        );
        assert_eq!(
            registry.source(),
            &RegistrySource::Directory(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_from_bundle_verifies_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        write_bundle(&path, vec![point()]);

        let registry = SchemaRegistry::from_bundle(&path).unwrap();
        assert!(registry.contains("Point"));

        let mut package: DefinitionPackage =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        package.schemas[0].fields.remove("y");
        std::fs::write(&path, serde_json::to_string(&package).unwrap()).unwrap();

        let err = SchemaRegistry::from_bundle(&path).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidChecksum(_)));
    }

    #[test]
    fn test_read_document_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point.toml");
        std::fs::write(&path, "name = 'Point'").unwrap();
        assert!(matches!(
            read_document(&path),
            Err(RegistryError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_builder_fallback_first_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("bundle.json");
        write_bundle(&bundle, vec![point()]);

        let registry = SchemaRegistry::builder()
            .from_dir("/nonexistent/dir/")
            .from_bundle(&bundle)
            .build()
            .unwrap();
        assert!(registry.contains("Point"));
        assert!(matches!(registry.source(), RegistrySource::Multiple(sources) if sources.len() == 2));
    }

    #[test]
    fn test_builder_skips_unresolvable_source() {
        let broken = tempfile::tempdir().unwrap();
        write_json(
            broken.path(),
            &SchemaDocument::new("Shape").with_field("origin", json!("Point")),
        );
        let good = tempfile::tempdir().unwrap();
        write_json(good.path(), &point());

        let registry = SchemaRegistry::builder()
            .from_dir(broken.path())
            .from_dir(good.path())
            .build()
            .unwrap();
        assert!(registry.contains("Point"));
        assert!(!registry.contains("Shape"));
    }

    #[test]
    fn test_builder_exclude_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), &point());
        write_json(dir.path(), &SchemaDocument::new("Legacy"));

        let registry = SchemaRegistry::builder()
            .from_dir(dir.path())
            .exclude(["Legacy".to_string()])
            .defaults(RegistryDefaults {
                identifier: Some("x".to_string()),
                default_sort: None,
            })
            .build()
            .unwrap();
        assert!(!registry.contains("Legacy"));
        assert_eq!(registry.get("Point").unwrap().identifier(), "x");
        assert_eq!(registry.get("Point").unwrap().default_sort(), "createdAt");
    }

    #[test]
    fn test_builder_all_fail() {
        let result = SchemaRegistry::builder()
            .from_dir("/nonexistent/dir1/")
            .from_bundle("/nonexistent/bundle1.json")
            .build();
        assert!(matches!(result, Err(RegistryError::NoSourcesAvailable)));
    }

    #[test]
    fn test_to_package_round_trip() {
        let registry = SchemaRegistry::from_documents(vec![point()]).unwrap();
        let package = registry.to_package("2.0.0", "2024-01-01T00:00:00Z").unwrap();
        assert!(package.bundle_hash.is_some());

        let reloaded = SchemaRegistry::from_package(&package).unwrap();
        assert_eq!(reloaded.source(), &RegistrySource::Package);
        assert_eq!(reloaded.document("Point"), Some(&point()));
    }
}
