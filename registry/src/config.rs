//! Registry configuration.
//!
//! Defines the YAML-serializable configuration that lists where schema
//! documents are loaded from, which documents to skip, and the identifier /
//! default-sort fallbacks applied to root definitions.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! sources:
//!   - dir: schemas/
//!   - bundle: dist/package.json
//! exclude:
//!   - Legacy
//! defaults:
//!   identifier: id
//!   default_sort: createdAt
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::{RegistryBuilder, SchemaRegistry};

/// One entry of the loader fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceConfig {
    /// A directory of one-document-per-file JSON/YAML declarations.
    Dir { dir: PathBuf },
    /// A [`DefinitionPackage`](object_schema_core::DefinitionPackage) JSON file.
    Bundle { bundle: PathBuf },
}

impl SourceConfig {
    pub fn path(&self) -> &Path {
        match self {
            SourceConfig::Dir { dir } => dir,
            SourceConfig::Bundle { bundle } => bundle,
        }
    }
}

/// Fallbacks for definitions that neither declare nor inherit a value.
///
/// # Examples
///
/// ```
/// # use object_schema_registry::RegistryDefaults;
/// let defaults = RegistryDefaults {
///     identifier: Some("uuid".into()),
///     default_sort: None,
/// };
/// assert_eq!(defaults.identifier.as_deref(), Some("uuid"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<String>,
}

/// Top-level registry configuration.
///
/// Loaded from a YAML file (typically `.object-schema.yml` in the project
/// root).
///
/// # Examples
///
/// ```no_run
/// use object_schema_registry::RegistryConfig;
///
/// let config = RegistryConfig::load(".object-schema.yml").unwrap();
/// let registry = config.registry().unwrap();
/// println!("{} schemas loaded", registry.len());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Loader fallback chain, tried in order.
    pub sources: Vec<SourceConfig>,
    /// Document names to drop before resolution.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub defaults: RegistryDefaults,
}

impl RegistryConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Relative source paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::RegistryError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: Self = serde_yaml::from_reader(reader)?;

        if let Some(base) = path.parent() {
            for source in &mut config.sources {
                let (SourceConfig::Dir { dir: source_path }
                | SourceConfig::Bundle {
                    bundle: source_path,
                }) = source;
                if source_path.is_relative() {
                    *source_path = base.join(&*source_path);
                }
            }
        }
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::RegistryError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if the document `name` is in the exclusion list.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|excluded| excluded == name)
    }

    /// A [`RegistryBuilder`] preloaded with this configuration.
    pub fn builder(&self) -> RegistryBuilder {
        let mut builder = SchemaRegistry::builder()
            .exclude(self.exclude.iter().cloned())
            .defaults(self.defaults.clone());
        for source in &self.sources {
            builder = match source {
                SourceConfig::Dir { dir } => builder.from_dir(dir),
                SourceConfig::Bundle { bundle } => builder.from_bundle(bundle),
            };
        }
        builder
    }

    /// Loads the registry described by this configuration.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        self.builder().build()
    }
}
