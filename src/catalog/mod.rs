//! Field Catalog
//!
//! The schema the filter language is checked against: every known field path,
//! its declared type, and whether it is indexed.
//!
//! - **types**: [`FieldType`] and per-type comparator rules
//! - **mapping**: load a catalog from an index mapping document
//! - **error**: Error types
//!
//! The catalog is built once and shared read-only. Parsing and compiling only
//! need the [`FieldLookup`] view of it.
//!
//! # Example
//!
//! ```rust
//! use filterql::catalog::{FieldCatalog, FieldLookup};
//!
//! let catalog = FieldCatalog::new()
//!     .with_field("status", "keyword")
//!     .with_unindexed_field("notes", "text");
//!
//! assert_eq!(catalog.field_type("status"), Some("keyword"));
//! assert!(!catalog.is_indexed("notes"));
//! ```

pub mod error;
pub mod mapping;
pub mod types;

pub use error::{CatalogError, CatalogResult};
pub use mapping::{load_mapping, parse_mapping};
pub use types::FieldType;

use std::collections::HashMap;

/// Read access to field schema
pub trait FieldLookup {
    /// Whether the path is a known field
    fn contains(&self, path: &str) -> bool;

    /// Declared type name, if the field has one
    fn field_type(&self, path: &str) -> Option<&str>;

    /// Whether the field can be searched on
    fn is_indexed(&self, path: &str) -> bool;
}

/// Schema entry for a single field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// Raw type name from the mapping (absent for object containers)
    pub field_type: Option<String>,
    /// Whether the field is indexed
    pub indexed: bool,
}

/// In-memory field catalog
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: HashMap<String, FieldEntry>,
}

impl FieldCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add an indexed, typed field
    pub fn with_field(mut self, path: impl Into<String>, field_type: impl Into<String>) -> Self {
        self.insert(path.into(), Some(field_type.into()), true);
        self
    }

    /// Builder method: add a typed field that is not indexed
    pub fn with_unindexed_field(
        mut self,
        path: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        self.insert(path.into(), Some(field_type.into()), false);
        self
    }

    /// Builder method: add a field without a declared type
    pub fn with_untyped_field(mut self, path: impl Into<String>) -> Self {
        self.insert(path.into(), None, true);
        self
    }

    pub(crate) fn insert(&mut self, path: String, field_type: Option<String>, indexed: bool) {
        self.fields.insert(path, FieldEntry { field_type, indexed });
    }

    /// All fields, sorted by path
    pub fn fields(&self) -> Vec<(&str, &FieldEntry)> {
        let mut fields: Vec<_> = self
            .fields
            .iter()
            .map(|(path, entry)| (path.as_str(), entry))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        fields
    }

    /// Number of known fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldLookup for FieldCatalog {
    fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    fn field_type(&self, path: &str) -> Option<&str> {
        self.fields.get(path).and_then(|e| e.field_type.as_deref())
    }

    fn is_indexed(&self, path: &str) -> bool {
        self.fields.get(path).map(|e| e.indexed).unwrap_or(false)
    }
}

/// Catalog shared by the query module tests
#[cfg(test)]
pub(crate) fn sample_catalog() -> FieldCatalog {
    FieldCatalog::new()
        .with_field("status", "keyword")
        .with_field("name", "text")
        .with_field("age", "integer")
        .with_field("score", "double")
        .with_field("active", "boolean")
        .with_field("createDate", "date")
        .with_field("location", "geo_point")
        .with_unindexed_field("notes", "text")
        .with_untyped_field("metadata")
        .with_field("profession", "nested")
        .with_field("profession.status", "keyword")
        .with_field("profession.years", "integer")
        .with_field("profession.since", "date")
        .with_field("a", "nested")
        .with_field("a.b", "keyword")
}
