//! Filter Query Language
//!
//! Compiles compact filter expressions into search-engine query documents:
//!
//! - **Token**: Lex raw filter text
//! - **Parser**: Build a validated condition tree
//! - **Date**: Resolve relative and absolute date literals
//! - **Options**: Parse the `key = value` clause after `;`
//! - **Compiler**: Lower the tree into `bool`/`term`/`range`/`nested` clauses
//! - **Engine**: Drive the whole pipeline
//!
//! # Query Language
//!
//! ```text
//! field OP value [and|or field OP value ...] [; key = value, ...]
//!
//! OP     = != > >= < <= :
//! value  bare word, "quoted string", a/b/c list, now-1d, today, "2024-03-13 12:00:00.000"
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use filterql::catalog::FieldCatalog;
//! use filterql::query::QueryEngine;
//!
//! let catalog = FieldCatalog::new()
//!     .with_field("status", "keyword")
//!     .with_field("age", "integer");
//!
//! let engine = QueryEngine::new(Arc::new(catalog));
//! let compiled = engine.compile(r#"status = "active" and age > 30; size = 5"#).unwrap();
//!
//! assert_eq!(compiled.query["size"], 5);
//! ```

pub mod aggregation;
pub mod ast;
pub mod compiler;
pub mod date;
pub mod engine;
pub mod error;
pub mod options;
pub mod parser;
pub mod token;

pub use aggregation::{validate_aggregation, AggregationKind};
pub use ast::{Condition, ConditionValue, Group, Leaf, LogicGate, Operator, Scalar};
pub use compiler::{QueryCompiler, QueryDocument};
pub use date::{resolve_date, DateResolver};
pub use engine::{CompiledQuery, QueryEngine};
pub use error::{ErrorReport, QueryError, QueryResult};
pub use options::{parse_options, QueryOptions, QueryType};
pub use parser::{parse_filter, ExpressionParser, MAX_DEPTH};
pub use token::{tokenize, Token};
