//! Query Compiler
//!
//! Lowers a condition tree into an Elasticsearch-style query document.
//!
//! # Clause table
//!
//! ```text
//! keyword/text/boolean   =   bool.must     [term | terms]
//!                        !=  bool.must_not [term | terms]
//! numeric/date           =   bool.must     [terms]
//!                        !=  bool.must_not [terms]
//!                        > >= < <=  bool.must [range gt|gte|lt|lte]
//! any type               : true   bool.must     [exists]
//!                        : false  bool.must_not [exists]
//! ```
//!
//! Leaves on dotted paths are wrapped in a `nested` query on the parent path.
//! Groups become `bool.must` (and) or `bool.should` (or).

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

use crate::catalog::{FieldLookup, FieldType};
use crate::query::aggregation::{validate_aggregation, AggregationKind};
use crate::query::ast::{Condition, ConditionValue, Group, Leaf, LogicGate, Operator, Scalar};
use crate::query::error::{QueryError, QueryResult};
use crate::query::options::{QueryOptions, QueryType};
use crate::query::parser::MAX_DEPTH;

/// Compiled query document
pub type QueryDocument = Value;

/// Key under which the single aggregation is emitted
pub const AGGREGATION_NAME: &str = "agg_name";

fn fixed_interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+[smhdwMy]$").expect("fixed interval pattern"))
}

/// Compiles condition trees against a catalog
pub struct QueryCompiler<'a> {
    catalog: &'a dyn FieldLookup,
}

impl<'a> QueryCompiler<'a> {
    /// Create a new compiler
    pub fn new(catalog: &'a dyn FieldLookup) -> Self {
        Self { catalog }
    }

    /// Compile a tree and options into a query document
    pub fn compile(&self, tree: &Condition, options: &QueryOptions) -> QueryResult<QueryDocument> {
        validate_options(options)?;

        let query = self.build_query(tree)?;

        let document = match options.query_type {
            QueryType::Count => json!({ "query": query }),
            QueryType::Search => json!({ "query": query, "size": options.size }),
            QueryType::Aggregation => {
                let aggs = self.build_aggregation(options)?;
                json!({ "query": query, "aggs": aggs, "size": options.size })
            }
        };

        tracing::debug!(
            query_type = %options.query_type,
            leaves = tree.leaf_count(),
            "compiled query"
        );

        Ok(document)
    }

    /// Lower a condition (sub)tree to its query clause
    pub fn build_query(&self, condition: &Condition) -> QueryResult<Value> {
        self.build_node(condition, 0)
    }

    fn build_node(&self, condition: &Condition, depth: usize) -> QueryResult<Value> {
        match condition {
            Condition::Group(group) => self.build_group(group, depth),
            Condition::Leaf(leaf) => self.build_leaf(leaf),
        }
    }

    fn build_group(&self, group: &Group, depth: usize) -> QueryResult<Value> {
        // the root group sits at depth 0, one level above the first parenthesis
        if depth > MAX_DEPTH {
            return Err(QueryError::InvalidQueryFormat(
                "Parentheses nested too deeply.".to_string(),
            ));
        }

        let clauses = group
            .conditions
            .iter()
            .map(|c| self.build_node(c, depth + 1))
            .collect::<QueryResult<Vec<_>>>()?;

        let occur = match group.logic_gate {
            LogicGate::And => "must",
            LogicGate::Or => "should",
        };

        Ok(bool_clause(occur, clauses))
    }

    fn build_leaf(&self, leaf: &Leaf) -> QueryResult<Value> {
        let field_type = self.leaf_type(leaf)?;
        let field = leaf.field.as_str();
        let values = leaf.value.as_slice();

        let (occur, clause) = match leaf.operator {
            Operator::Exists => {
                let occur = match values {
                    [Scalar::Bool(true)] => "must",
                    [Scalar::Bool(false)] => "must_not",
                    _ => return Err(invalid_value(leaf, "expected true or false")),
                };
                (occur, json!({ "exists": { "field": field } }))
            }
            Operator::Eq | Operator::Ne => {
                let occur = if leaf.operator == Operator::Eq {
                    "must"
                } else {
                    "must_not"
                };
                let clause = match &leaf.value {
                    ConditionValue::Single(v) if !field_type.is_ordered() => {
                        json!({ "term": { field: { "value": v } } })
                    }
                    _ => json!({ "terms": { field: values } }),
                };
                (occur, clause)
            }
            op => {
                let ConditionValue::Single(v) = &leaf.value else {
                    return Err(QueryError::InvalidOperatorForValue(op.to_string()));
                };
                let bound = op.range_bound().ok_or(QueryError::InvalidOperator)?;

                let mut bounds = Map::new();
                bounds.insert(bound.to_string(), json!(v));
                (
                    "must",
                    json!({ "range": { field: Value::Object(bounds) } }),
                )
            }
        };

        let query = bool_clause(occur, vec![clause]);

        Ok(match leaf.nested_path() {
            Some((path, _)) => json!({ "nested": { "path": path, "query": query } }),
            None => query,
        })
    }

    /// Re-check a leaf against the catalog; trees may be built by hand
    fn leaf_type(&self, leaf: &Leaf) -> QueryResult<FieldType> {
        let field = leaf.field.as_str();
        if !self.catalog.contains(field) {
            return Err(QueryError::InvalidField(field.to_string()));
        }

        let declared = self
            .catalog
            .field_type(field)
            .ok_or_else(|| QueryError::FieldTypeNotDefined(field.to_string()))?;

        if !self.catalog.is_indexed(field) {
            return Err(QueryError::FieldNotIndexed(field.to_string()));
        }

        let field_type = FieldType::from_str(declared)
            .filter(FieldType::is_filterable)
            .ok_or_else(|| QueryError::InvalidFieldType {
                field_type: declared.to_string(),
                field: field.to_string(),
            })?;

        if !field_type.allows(leaf.operator) {
            return Err(QueryError::OperatorNotAllowed {
                operator: leaf.operator.to_string(),
                field_type: declared.to_string(),
            });
        }

        if leaf.value.is_list() && !leaf.operator.accepts_list() {
            return Err(QueryError::InvalidOperatorForValue(leaf.operator.to_string()));
        }

        Ok(field_type)
    }

    fn build_aggregation(&self, options: &QueryOptions) -> QueryResult<Value> {
        let (aggregation, field) = match (
            options.aggregation_type.as_deref().filter(|s| !s.is_empty()),
            options.aggregation_field.as_deref().filter(|s| !s.is_empty()),
        ) {
            (Some(aggregation), Some(field)) => (aggregation, field),
            _ => return Err(QueryError::MissingParameters),
        };

        let kind = validate_aggregation(self.catalog, aggregation, field)?;

        let mut body = Map::new();
        body.insert("field".to_string(), json!(field));
        match kind {
            AggregationKind::DateHistogram => {
                body.insert("fixed_interval".to_string(), json!(options.fixed_interval));
            }
            AggregationKind::Histogram => {
                body.insert("interval".to_string(), json!(options.histogram_interval));
            }
            _ => {}
        }

        Ok(json!({ AGGREGATION_NAME: { kind.name(): Value::Object(body) } }))
    }
}

/// Check interval and size options
pub fn validate_options(options: &QueryOptions) -> QueryResult<()> {
    if !fixed_interval_pattern().is_match(&options.fixed_interval) {
        return Err(QueryError::InvalidFixedInterval);
    }
    if options.size < 0 {
        return Err(QueryError::InvalidSize);
    }
    if options.histogram_interval <= 0 {
        return Err(QueryError::InvalidInterval);
    }
    Ok(())
}

fn bool_clause(occur: &str, clauses: Vec<Value>) -> Value {
    json!({ "bool": { occur: clauses } })
}

fn invalid_value(leaf: &Leaf, reason: &str) -> QueryError {
    QueryError::InvalidValue {
        value: leaf
            .value
            .as_slice()
            .iter()
            .map(Scalar::to_string)
            .collect::<Vec<_>>()
            .join("/"),
        field: leaf.field.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;
    use crate::query::date::DateResolver;
    use crate::query::parser::parse_filter;

    fn compile_with(input: &str, options: &QueryOptions) -> QueryResult<Value> {
        let catalog = sample_catalog();
        let tree = parse_filter(input, &catalog, &DateResolver::utc())?;
        QueryCompiler::new(&catalog).compile(&tree, options)
    }

    fn query_of(input: &str) -> Value {
        let doc = compile_with(input, &QueryOptions::default()).unwrap();
        // unwrap the root `and` group holding a single leaf
        doc["query"]["bool"]["must"][0].clone()
    }

    fn leaf(field: &str, op: Operator, value: ConditionValue) -> Condition {
        Condition::group(vec![Condition::leaf(field, op, value)], LogicGate::And)
    }

    #[test]
    fn test_nested_keyword_equality() {
        assert_eq!(
            query_of(r#"a.b = "x""#),
            json!({
                "nested": {
                    "path": "a",
                    "query": { "bool": { "must": [ { "term": { "a.b": { "value": "x" } } } ] } }
                }
            })
        );
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(
            query_of("status = active"),
            json!({ "bool": { "must": [ { "term": { "status": { "value": "active" } } } ] } })
        );
        assert_eq!(
            query_of("status != active"),
            json!({ "bool": { "must_not": [ { "term": { "status": { "value": "active" } } } ] } })
        );
        assert_eq!(
            query_of("status = a/b"),
            json!({ "bool": { "must": [ { "terms": { "status": ["a", "b"] } } ] } })
        );
        assert_eq!(
            query_of("name != a/b"),
            json!({ "bool": { "must_not": [ { "terms": { "name": ["a", "b"] } } ] } })
        );
    }

    #[test]
    fn test_numeric_equality_uses_terms() {
        assert_eq!(
            query_of("age = 30"),
            json!({ "bool": { "must": [ { "terms": { "age": [30.0] } } ] } })
        );
        assert_eq!(
            query_of("age != 30/40"),
            json!({ "bool": { "must_not": [ { "terms": { "age": [30.0, 40.0] } } ] } })
        );
    }

    #[test]
    fn test_range_operators() {
        for (op, bound) in [(">=", "gte"), ("<=", "lte"), (">", "gt"), ("<", "lt")] {
            assert_eq!(
                query_of(&format!("score {} 1.5", op)),
                json!({ "bool": { "must": [ { "range": { "score": { bound: 1.5 } } } ] } })
            );
        }
    }

    #[test]
    fn test_nested_range() {
        assert_eq!(
            query_of("profession.years > 5"),
            json!({
                "nested": {
                    "path": "profession",
                    "query": { "bool": { "must": [ { "range": { "profession.years": { "gt": 5.0 } } } ] } }
                }
            })
        );
    }

    #[test]
    fn test_date_range_uses_resolved_value() {
        assert_eq!(
            query_of(r#"createDate < "2024-03-13 12:00:00.432""#),
            json!({ "bool": { "must": [
                { "range": { "createDate": { "lt": "2024-03-13T12:00:00.432+00:00" } } }
            ] } })
        );
    }

    #[test]
    fn test_exists_clauses() {
        assert_eq!(
            query_of("active : true"),
            json!({ "bool": { "must": [ { "exists": { "field": "active" } } ] } })
        );
        assert_eq!(
            query_of("profession.status : false"),
            json!({
                "nested": {
                    "path": "profession",
                    "query": { "bool": { "must_not": [ { "exists": { "field": "profession.status" } } ] } }
                }
            })
        );
    }

    #[test]
    fn test_groups() {
        let doc = compile_with("status = a or (age > 1 and age < 9)", &QueryOptions::default()).unwrap();
        let should = &doc["query"]["bool"]["should"];
        assert_eq!(should.as_array().map(Vec::len), Some(2));
        assert_eq!(should[1]["bool"]["must"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_search_and_count_shapes() {
        let search = compile_with("age > 1", &QueryOptions::default()).unwrap();
        assert_eq!(search["size"], 10);
        assert!(search.get("aggs").is_none());

        let count_options = QueryOptions {
            query_type: QueryType::Count,
            ..QueryOptions::default()
        };
        let count = compile_with("age > 1", &count_options).unwrap();
        assert_eq!(count.as_object().map(|o| o.len()), Some(1));
        assert!(count.get("query").is_some());
    }

    #[test]
    fn test_date_histogram_aggregation() {
        let options = QueryOptions {
            query_type: QueryType::Aggregation,
            aggregation_type: Some("date_histogram".to_string()),
            aggregation_field: Some("createDate".to_string()),
            fixed_interval: "1h".to_string(),
            size: 0,
            ..QueryOptions::default()
        };
        let doc = compile_with("age > 1", &options).unwrap();

        assert_eq!(
            doc["aggs"],
            json!({ "agg_name": { "date_histogram": { "field": "createDate", "fixed_interval": "1h" } } })
        );
        assert_eq!(doc["size"], 0);
    }

    #[test]
    fn test_histogram_and_plain_aggregations() {
        let mut options = QueryOptions {
            query_type: QueryType::Aggregation,
            aggregation_type: Some("histogram".to_string()),
            aggregation_field: Some("age".to_string()),
            histogram_interval: 5,
            ..QueryOptions::default()
        };
        let doc = compile_with("", &options).unwrap();
        assert_eq!(doc["aggs"], json!({ "agg_name": { "histogram": { "field": "age", "interval": 5 } } }));

        options.aggregation_type = Some("terms".to_string());
        options.aggregation_field = Some("status".to_string());
        let doc = compile_with("", &options).unwrap();
        assert_eq!(doc["aggs"], json!({ "agg_name": { "terms": { "field": "status" } } }));
    }

    #[test]
    fn test_aggregation_errors() {
        let mut options = QueryOptions {
            query_type: QueryType::Aggregation,
            aggregation_type: Some("avg".to_string()),
            ..QueryOptions::default()
        };
        assert_eq!(compile_with("", &options), Err(QueryError::MissingParameters));

        options.aggregation_field = Some("status".to_string());
        assert_eq!(compile_with("", &options).unwrap_err().code(), "AGGREGATION_NOT_ALLOWED");

        options.aggregation_field = Some("nope".to_string());
        assert_eq!(compile_with("", &options).unwrap_err().code(), "FIELD_NOT_FOUND");
    }

    #[test]
    fn test_option_validation() {
        let bad_interval = QueryOptions {
            fixed_interval: "abc".to_string(),
            ..QueryOptions::default()
        };
        assert_eq!(compile_with("", &bad_interval), Err(QueryError::InvalidFixedInterval));

        let bad_size = QueryOptions {
            size: -1,
            ..QueryOptions::default()
        };
        assert_eq!(compile_with("", &bad_size), Err(QueryError::InvalidSize));

        let bad_histogram = QueryOptions {
            histogram_interval: 0,
            ..QueryOptions::default()
        };
        assert_eq!(compile_with("", &bad_histogram), Err(QueryError::InvalidInterval));

        // validation precedes lowering
        let catalog = sample_catalog();
        let tree = leaf("ghost", Operator::Eq, ConditionValue::Single(Scalar::text("x")));
        assert_eq!(
            QueryCompiler::new(&catalog).compile(&tree, &bad_size),
            Err(QueryError::InvalidSize)
        );
    }

    #[test]
    fn test_fixed_interval_units() {
        for interval in ["1s", "30m", "12h", "1d", "2w", "1M", "1y"] {
            let options = QueryOptions {
                fixed_interval: interval.to_string(),
                ..QueryOptions::default()
            };
            assert!(validate_options(&options).is_ok(), "{interval}");
        }
        for interval in ["d", "1", "1x", "-1d", "1.5d", " 1d"] {
            let options = QueryOptions {
                fixed_interval: interval.to_string(),
                ..QueryOptions::default()
            };
            assert!(validate_options(&options).is_err(), "{interval}");
        }
    }

    #[test]
    fn test_hand_built_trees_are_checked() {
        let catalog = sample_catalog();
        let compiler = QueryCompiler::new(&catalog);
        let options = QueryOptions::default();

        let tree = leaf("ghost", Operator::Eq, ConditionValue::Single(Scalar::text("x")));
        assert_eq!(compiler.compile(&tree, &options).unwrap_err().code(), "INVALID_FIELD");

        let tree = leaf("status", Operator::Gt, ConditionValue::Single(Scalar::text("x")));
        assert_eq!(compiler.compile(&tree, &options).unwrap_err().code(), "OPERATOR_NOT_ALLOWED");

        let tree = leaf(
            "age",
            Operator::Gt,
            ConditionValue::List(vec![Scalar::Number(1.0), Scalar::Number(2.0)]),
        );
        assert_eq!(
            compiler.compile(&tree, &options).unwrap_err().code(),
            "INVALID_OPERATOR_FOR_VALUE"
        );

        let tree = leaf("active", Operator::Exists, ConditionValue::Single(Scalar::text("yes")));
        assert_eq!(compiler.compile(&tree, &options).unwrap_err().code(), "INVALID_VALUE");
    }

    #[test]
    fn test_nesting_limit_on_built_trees() {
        let catalog = sample_catalog();
        let compiler = QueryCompiler::new(&catalog);
        let options = QueryOptions::default();

        let nest = |levels: usize| {
            let mut tree = leaf("age", Operator::Gt, ConditionValue::Single(Scalar::Number(1.0)));
            for _ in 0..levels {
                tree = Condition::group(vec![tree], LogicGate::And);
            }
            tree
        };

        // `leaf` already wraps in the root group
        assert!(compiler.compile(&nest(MAX_DEPTH), &options).is_ok());
        assert_eq!(
            compiler.compile(&nest(MAX_DEPTH + 1), &options).unwrap_err().code(),
            "INVALID_QUERY_FORMAT"
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let catalog = sample_catalog();
        let tree = parse_filter(
            "status = a/b and (profession.years >= 3 or createDate < now)",
            &catalog,
            &DateResolver::utc(),
        )
        .unwrap();
        let compiler = QueryCompiler::new(&catalog);
        let options = QueryOptions::default();

        assert_eq!(
            compiler.compile(&tree, &options).unwrap(),
            compiler.compile(&tree, &options).unwrap()
        );
    }
}
