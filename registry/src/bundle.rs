//! Bundle hashing and verification.
//!
//! A bundle's hash is the SHA-256 of the compact JSON encoding of its
//! documents. Field declarations keep their order in that encoding, so the
//! hash changes whenever a document changes in a way that affects field
//! order or content.

use object_schema_core::{DefinitionPackage, SchemaDocument};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// Computes the hex SHA-256 of `documents`.
///
/// # Examples
///
/// ```
/// use object_schema_core::SchemaDocument;
/// use object_schema_registry::bundle_hash;
///
/// let docs = vec![SchemaDocument::new("Point")];
/// let hash = bundle_hash(&docs).unwrap();
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, bundle_hash(&docs).unwrap());
/// ```
pub fn bundle_hash(documents: &[SchemaDocument]) -> Result<String> {
    let bytes = serde_json::to_vec(documents)?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{:x}", hash))
}

/// Stamps `package.bundle_hash` with the hash of its documents.
pub fn seal_package(package: &mut DefinitionPackage) -> Result<()> {
    package.bundle_hash = Some(bundle_hash(&package.schemas)?);
    Ok(())
}

/// Checks `package.bundle_hash` against its documents.
///
/// Packages without a hash pass.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidChecksum`] on mismatch.
pub fn verify_package(package: &DefinitionPackage) -> Result<()> {
    let Some(expected) = &package.bundle_hash else {
        return Ok(());
    };
    let actual = bundle_hash(&package.schemas)?;
    if &actual != expected {
        return Err(RegistryError::InvalidChecksum(format!(
            "expected {expected}, computed {actual}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn package() -> DefinitionPackage {
        let mut package = DefinitionPackage::new("1.0.0", "2024-01-01T00:00:00Z");
        package
            .schemas
            .push(SchemaDocument::new("Point").with_field("x", json!("Number")));
        package
    }

    #[test]
    fn test_seal_then_verify() {
        let mut package = package();
        seal_package(&mut package).unwrap();
        assert!(package.bundle_hash.is_some());
        verify_package(&package).unwrap();
    }

    #[test]
    fn test_tampered_package_fails_verification() {
        let mut package = package();
        seal_package(&mut package).unwrap();
        package.schemas[0].fields.insert("y".into(), json!("Number"));

        let err = verify_package(&package).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidChecksum(_)));
    }

    #[test]
    fn test_field_order_changes_hash() {
        let a = vec![
            SchemaDocument::new("P")
                .with_field("x", json!(null))
                .with_field("y", json!(null)),
        ];
        let b = vec![
            SchemaDocument::new("P")
                .with_field("y", json!(null))
                .with_field("x", json!(null)),
        ];
        assert_ne!(bundle_hash(&a).unwrap(), bundle_hash(&b).unwrap());
    }

    #[test]
    fn test_unsealed_package_passes() {
        verify_package(&package()).unwrap();
    }
}
