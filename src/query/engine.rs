//! Query Engine
//!
//! Entry point for compiling raw input of the form
//!
//! ```text
//! filterExpression [ ';' key=value (',' key=value)* ]
//! ```
//!
//! A `;` inside a double-quoted value does not split the input.
//!
//! The pipeline is options → date resolver → tokenize → parse → compile, and
//! the first failing stage decides the error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::FieldLookup;
use crate::query::ast::Condition;
use crate::query::compiler::{QueryCompiler, QueryDocument};
use crate::query::date::DateResolver;
use crate::query::error::{QueryError, QueryResult};
use crate::query::options::{split_unquoted, QueryOptions};
use crate::query::parser::ExpressionParser;
use crate::query::token::tokenize;

/// Result of a successful compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    /// Validated condition tree
    pub condition_tree: Condition,
    /// Query document for the search engine
    pub query: QueryDocument,
}

/// Compiles filter strings against a shared catalog
#[derive(Clone)]
pub struct QueryEngine {
    catalog: Arc<dyn FieldLookup + Send + Sync>,
    defaults: QueryOptions,
}

impl QueryEngine {
    /// Create an engine with default options
    pub fn new(catalog: Arc<dyn FieldLookup + Send + Sync>) -> Self {
        Self {
            catalog,
            defaults: QueryOptions::default(),
        }
    }

    /// Builder method: options applied before the input's own option clause
    pub fn with_defaults(mut self, defaults: QueryOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Base options
    pub fn defaults(&self) -> &QueryOptions {
        &self.defaults
    }

    /// Compile raw input
    pub fn compile(&self, input: &str) -> QueryResult<CompiledQuery> {
        self.compile_at(input, Utc::now())
    }

    /// Compile raw input with `now` pinned
    pub fn compile_at(&self, input: &str, now: DateTime<Utc>) -> QueryResult<CompiledQuery> {
        let (filter, clause) = split_input(input)?;

        let options = QueryOptions::from_clause(clause, &self.defaults)?;
        let dates = DateResolver::new(&options.time_zone)?;

        let catalog: &dyn FieldLookup = self.catalog.as_ref();
        let tokens = tokenize(filter);
        let condition_tree = ExpressionParser::new(&tokens, catalog, &dates)
            .with_clock(now)
            .parse()?;

        let query = QueryCompiler::new(catalog).compile(&condition_tree, &options)?;

        tracing::debug!(
            tokens = tokens.len(),
            query_type = %options.query_type,
            time_zone = %options.time_zone,
            "compiled input"
        );

        Ok(CompiledQuery {
            condition_tree,
            query,
        })
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Split input into filter and option clause; `;` inside quotes is kept
pub fn split_input(input: &str) -> QueryResult<(&str, &str)> {
    let mut parts = split_unquoted(input, ';').into_iter();
    let filter = parts.next().unwrap_or_default();
    let clause = parts.next().unwrap_or_default();

    if parts.next().is_some() {
        return Err(QueryError::InvalidQueryFormat(
            "Only one ';' separating filter and options is allowed.".to_string(),
        ));
    }

    Ok((filter.trim(), clause.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;
    use crate::query::options::QueryType;
    use chrono::TimeZone;
    use serde_json::json;

    fn engine() -> QueryEngine {
        QueryEngine::new(Arc::new(sample_catalog()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 20, 0, 0).unwrap()
    }

    fn code(input: &str) -> &'static str {
        engine().compile_at(input, now()).unwrap_err().code()
    }

    #[test]
    fn test_split_input() {
        assert_eq!(split_input("age > 1").unwrap(), ("age > 1", ""));
        assert_eq!(split_input(" age > 1 ; size = 2 ").unwrap(), ("age > 1", "size = 2"));
        assert_eq!(
            split_input("a;b;c").unwrap_err().code(),
            "INVALID_QUERY_FORMAT"
        );
    }

    #[test]
    fn test_semicolon_inside_quotes() {
        assert_eq!(
            split_input(r#"status = "a;b"; size = 1"#).unwrap(),
            (r#"status = "a;b""#, "size = 1")
        );

        let result = engine().compile_at(r#"status = "a;b""#, now()).unwrap();
        assert_eq!(
            result.query["query"]["bool"]["must"][0],
            json!({ "bool": { "must": [ { "term": { "status": { "value": "a;b" } } } ] } })
        );

        let result = engine()
            .compile_at(r#"age > 1; aggregationField = "x;y", size = 2"#, now())
            .unwrap();
        assert_eq!(result.query["size"], 2);

        assert_eq!(code(r#"status = "a;b"; size = 1; size = 2"#), "INVALID_QUERY_FORMAT");
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        for depth in [1_000, 10_000] {
            let input = format!("{}age = 1{}", "(".repeat(depth), ")".repeat(depth));
            assert_eq!(code(&input), "INVALID_QUERY_FORMAT");
        }
    }

    #[test]
    fn test_today_in_offset_zone_end_to_end() {
        let result = engine()
            .compile_at(
                r#"status = "active" and createDate >= "today-2d"; timeZone = "+05:30""#,
                now(),
            )
            .unwrap();

        assert_eq!(
            result.query,
            json!({
                "query": { "bool": { "must": [
                    { "bool": { "must": [ { "term": { "status": { "value": "active" } } } ] } },
                    { "bool": { "must": [
                        { "range": { "createDate": { "gte": "2024-03-12T00:00:00.000+05:30" } } }
                    ] } }
                ] } },
                "size": 10
            })
        );
        assert_eq!(result.condition_tree.leaf_count(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let result = engine().compile_at("a.b = x; queryType = count", now()).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({
                "conditionTree": {
                    "conditions": [ { "field": "a.b", "operator": "=", "value": "x" } ],
                    "logicGate": "and"
                },
                "query": { "query": { "bool": { "must": [ {
                    "nested": {
                        "path": "a",
                        "query": { "bool": { "must": [ { "term": { "a.b": { "value": "x" } } } ] } }
                    }
                } ] } } }
            })
        );
    }

    #[test]
    fn test_aggregation_request() {
        let result = engine()
            .compile_at(
                r#"age > 18; queryType = "aggregation", aggregationType = "date_histogram", aggregationField = "createDate", fixed_interval = "1w", size = 0"#,
                now(),
            )
            .unwrap();

        assert_eq!(
            result.query["aggs"],
            json!({ "agg_name": { "date_histogram": { "field": "createDate", "fixed_interval": "1w" } } })
        );
        assert_eq!(result.query["size"], 0);
    }

    #[test]
    fn test_documented_failures() {
        assert_eq!(code("age > 10/20"), "INVALID_OPERATOR_FOR_VALUE");
        assert_eq!(
            code(r#"; queryType = "aggregation", aggregationType = "avg", aggregationField = "status""#),
            "AGGREGATION_NOT_ALLOWED"
        );
        assert_eq!(code("ghost = 1"), "INVALID_FIELD");
        assert_eq!(code("notes = x"), "FIELD_NOT_INDEXED");
        assert_eq!(code("age > 1; size = -1"), "INVALID_SIZE");
        assert_eq!(code(r#"age > 1; fixed_interval = "abc""#), "INVALID_FIXED_INTERVAL");
        assert_eq!(code("age > 1; interval = 0"), "INVALID_INTERVAL");
        assert_eq!(code("age > 1; queryType = aggregation"), "MISSING_PARAMETERS");
        assert_eq!(code("age > 1; queryType = find"), "INVALID_QUERY_TYPE");
        assert_eq!(code("age > 1; timeZone = IST"), "INVALID_TIMEZONE_FORMAT");
        assert_eq!(code("age > 1; size"), "INVALID_OPTION");
    }

    #[test]
    fn test_options_fail_before_filter() {
        // both halves are broken; the option clause is checked first
        assert_eq!(code("ghost = 1; size = many"), "INVALID_SIZE");
        assert_eq!(code("ghost = 1; timeZone = bad"), "INVALID_TIMEZONE_FORMAT");
    }

    #[test]
    fn test_last_gate_wins_end_to_end() {
        let result = engine().compile_at("age = 1 and score = 2 or status = c", now()).unwrap();
        let should = &result.query["query"]["bool"]["should"];
        assert_eq!(should.as_array().map(Vec::len), Some(3));
        assert!(result.query["query"]["bool"].get("must").is_none());
    }

    #[test]
    fn test_defaults_are_applied_under_clause() {
        let defaults = QueryOptions {
            query_type: QueryType::Count,
            size: 99,
            ..QueryOptions::default()
        };
        let engine = engine().with_defaults(defaults);
        assert_eq!(engine.defaults().size, 99);

        let counted = engine.compile_at("age > 1", now()).unwrap();
        assert!(counted.query.get("size").is_none());

        let searched = engine.compile_at("age > 1; queryType = search", now()).unwrap();
        assert_eq!(searched.query["size"], 99);
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = engine();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.compile_at(&format!("age > {}", i), now()))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
    }

    #[test]
    fn test_empty_input_compiles_to_empty_group() {
        let result = engine().compile_at("", now()).unwrap();
        assert_eq!(result.query, json!({ "query": { "bool": { "must": [] } }, "size": 10 }));
    }
}
