//! Loading, resolving and bundling declarative object schema definitions.
//!
//! This crate turns [`SchemaDocument`](object_schema_core::SchemaDocument)s
//! stored on disk (one JSON/YAML file per document, or a single
//! [`DefinitionPackage`](object_schema_core::DefinitionPackage) bundle) into
//! built, cross-referenced definitions.
//!
//! # Quick start
//!
//! ```no_run
//! use object_schema_registry::{RegistryConfig, SchemaRegistry};
//!
//! // Load documents from a directory
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! if let Some(user) = registry.get("User") {
//!     println!("User has {} fields", user.field_names().len());
//! }
//!
//! // Use the builder for fallback chains
//! let registry = SchemaRegistry::builder()
//!     .from_dir("schemas/")
//!     .from_bundle("dist/package.json")
//!     .build()
//!     .unwrap();
//!
//! // Or describe the chain in a config file
//! let registry = RegistryConfig::load(".object-schema.yml")
//!     .and_then(|config| config.registry())
//!     .unwrap();
//! ```

mod bundle;
mod config;
mod error;
mod loader;
mod resolve;

pub use bundle::{bundle_hash, seal_package, verify_package};
pub use config::{RegistryConfig, RegistryDefaults, SourceConfig};
pub use error::{RegistryError, Result};
pub use loader::{
    RegistryBuilder, RegistrySource, SchemaRegistry, read_dir_documents, read_document,
};
pub use resolve::{apply_defaults, resolve_documents};
