//! # filterql
//!
//! Compiles a compact filter language into Elasticsearch-style query documents.
//!
//! ## Features
//!
//! - **Filter expressions**: comparisons, `and`/`or`, parentheses, `/` value lists
//! - **Dates**: `now-1d`, `today`, absolute literals, fixed-offset time zones
//! - **Schema checks**: every field is validated against a field catalog
//! - **Aggregations**: type-checked `avg`, `terms`, `date_histogram` and friends
//!
//! ## Modules
//!
//! - [`catalog`]: Field catalog and mapping loader
//! - [`query`]: Tokenizer, parser, compiler and the [`QueryEngine`] facade
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use filterql::{FieldCatalog, QueryEngine};
//!
//! let catalog = FieldCatalog::new()
//!     .with_field("status", "keyword")
//!     .with_field("createDate", "date");
//!
//! let engine = QueryEngine::new(Arc::new(catalog));
//! let compiled = engine
//!     .compile(r#"status = "active" and createDate >= "now-7d"; queryType = "count""#)
//!     .unwrap();
//!
//! assert!(compiled.query.get("size").is_none());
//! ```

pub mod catalog;
pub mod config;
pub mod query;

pub use catalog::{CatalogError, CatalogResult, FieldCatalog, FieldLookup, FieldType};

pub use query::{
    CompiledQuery, Condition, ErrorReport, LogicGate, Operator, QueryEngine, QueryError,
    QueryOptions, QueryResult, QueryType,
};

pub use config::{Config, ConfigError, LoggingConfig};
