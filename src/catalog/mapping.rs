//! Index mapping loader
//!
//! Reads a mapping document in the shape returned by `GET <index>/_mapping`:
//!
//! ```text
//! { "<index>": { "mappings": { "properties": { "<field>": { "type": "...", ... } } } } }
//! ```
//!
//! Sub-`properties` are walked recursively and flattened into dotted paths.

use serde_json::{Map, Value};
use std::path::Path;

use super::error::{CatalogError, CatalogResult};
use super::FieldCatalog;

/// Load a catalog from a mapping file on disk
pub fn load_mapping(path: &Path) -> CatalogResult<FieldCatalog> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let catalog = parse_mapping(&content)?;
    tracing::info!("Loaded {} fields from {:?}", catalog.len(), path);
    Ok(catalog)
}

/// Build a catalog from a mapping document
pub fn parse_mapping(json: &str) -> CatalogResult<FieldCatalog> {
    let document: Value = serde_json::from_str(json)?;
    let indices = document
        .as_object()
        .ok_or_else(|| CatalogError::InvalidMapping("<root>".to_string()))?;

    let mut catalog = FieldCatalog::new();
    for (index, body) in indices {
        let properties = body
            .get("mappings")
            .and_then(|m| m.get("properties"))
            .and_then(Value::as_object)
            .ok_or_else(|| CatalogError::InvalidMapping(index.clone()))?;

        extract_fields(&mut catalog, properties, "");
    }

    Ok(catalog)
}

fn extract_fields(catalog: &mut FieldCatalog, properties: &Map<String, Value>, prefix: &str) {
    for (name, props) in properties {
        let path = format!("{}{}", prefix, name);
        let field_type = props.get("type").and_then(Value::as_str);
        let indexed = props.get("index").and_then(Value::as_bool) != Some(false)
            && props.get("enabled").and_then(Value::as_bool) != Some(false);
        let children = props.get("properties").and_then(Value::as_object);

        match field_type {
            Some(ty) => catalog.insert(path.clone(), Some(ty.to_string()), indexed),
            // Object containers have no type of their own
            None if children.is_some() => catalog.insert(path.clone(), None, indexed),
            None => {}
        }

        if let Some(children) = children {
            extract_fields(catalog, children, &format!("{}.", path));
        }
    }
}
