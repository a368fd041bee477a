//! Option clause
//!
//! The part of the input after `;` configures the request:
//!
//! ```text
//! queryType = "aggregation", aggregationType = "date_histogram",
//! aggregationField = "createDate", fixed_interval = "1d", timeZone = "+05:30"
//! ```
//!
//! Fragments are split on commas outside double quotes, each must be a
//! `key = value` pair, and the pairs are applied onto a base [`QueryOptions`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::query::error::{QueryError, QueryResult};

fn option_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*([A-Za-z0-9_-]+)\s*=\s*("[^"]*"|[A-Za-z0-9_+\-.:]+)\s*$"#)
            .expect("option pattern")
    })
}

/// Shape of the compiled document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// `{query, size}`
    #[default]
    Search,
    /// `{query}`
    Count,
    /// `{query, aggs, size}`
    Aggregation,
}

impl QueryType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "search" => Some(Self::Search),
            "count" => Some(Self::Count),
            "aggregation" => Some(Self::Aggregation),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Count => write!(f, "count"),
            Self::Aggregation => write!(f, "aggregation"),
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Document shape (default `search`)
    pub query_type: QueryType,
    /// Aggregation name, e.g. `avg` or `date_histogram`
    pub aggregation_type: Option<String>,
    /// Field the aggregation runs on
    pub aggregation_field: Option<String>,
    /// Bucket width for `date_histogram` (default `1d`)
    pub fixed_interval: String,
    /// Bucket width for `histogram` (default 10)
    pub histogram_interval: i64,
    /// Number of hits to return (default 10)
    pub size: i64,
    /// `Z` or `±HH:MM` (default `Z`)
    pub time_zone: String,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            query_type: QueryType::Search,
            aggregation_type: None,
            aggregation_field: None,
            fixed_interval: "1d".to_string(),
            histogram_interval: 10,
            size: 10,
            time_zone: "Z".to_string(),
        }
    }
}

impl QueryOptions {
    /// Parse an option clause on top of `base`
    pub fn from_clause(clause: &str, base: &QueryOptions) -> QueryResult<Self> {
        let mut options = base.clone();
        for (key, value) in parse_options(clause)? {
            options.apply(&key, &value)?;
        }
        Ok(options)
    }

    /// Set a single option by its clause key
    pub fn apply(&mut self, key: &str, value: &str) -> QueryResult<()> {
        match key {
            "queryType" => {
                self.query_type = QueryType::from_str(value)
                    .ok_or_else(|| QueryError::InvalidQueryType(value.to_string()))?;
            }
            "aggregationType" => self.aggregation_type = Some(value.to_string()),
            "aggregationField" => self.aggregation_field = Some(value.to_string()),
            "fixed_interval" => self.fixed_interval = value.to_string(),
            "interval" => {
                self.histogram_interval = value.parse().map_err(|_| QueryError::InvalidInterval)?;
            }
            "size" => {
                self.size = value.parse().map_err(|_| QueryError::InvalidSize)?;
            }
            "timeZone" => self.time_zone = value.to_string(),
            _ => {
                tracing::warn!(key, "ignoring unknown option");
            }
        }
        Ok(())
    }
}

/// Split an option clause into `(key, value)` pairs, quotes stripped
pub fn parse_options(clause: &str) -> QueryResult<Vec<(String, String)>> {
    if clause.trim().is_empty() {
        return Ok(Vec::new());
    }

    split_unquoted(clause, ',')
        .into_iter()
        .map(|fragment| {
            let caps = option_pattern()
                .captures(fragment)
                .ok_or_else(|| QueryError::InvalidOption(fragment.trim().to_string()))?;

            let value = caps[2].trim_matches('"').to_string();
            Ok((caps[1].to_string(), value))
        })
        .collect()
}

/// Split on `separator` where it is not inside double quotes
pub(crate) fn split_unquoted(input: &str, separator: char) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == separator && !in_quotes {
            fragments.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    fragments.push(&input[start..]);

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_parse_options() {
        let pairs = parse_options(r#"queryType = "count", size=0 , timeZone = "+05:30""#).unwrap();
        assert_eq!(
            pairs,
            vec![
                pair("queryType", "count"),
                pair("size", "0"),
                pair("timeZone", "+05:30"),
            ]
        );
    }

    #[test]
    fn test_comma_inside_quotes() {
        let pairs = parse_options(r#"aggregationField = "a,b", size = 1"#).unwrap();
        assert_eq!(pairs, vec![pair("aggregationField", "a,b"), pair("size", "1")]);
    }

    #[test]
    fn test_empty_clause() {
        assert!(parse_options("").unwrap().is_empty());
        assert!(parse_options("   ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_fragment() {
        assert_eq!(
            parse_options("size = 10, queryType"),
            Err(QueryError::InvalidOption("queryType".to_string()))
        );
        assert_eq!(
            parse_options("size = 10,"),
            Err(QueryError::InvalidOption(String::new()))
        );
        assert_eq!(
            parse_options("size = 1 0"),
            Err(QueryError::InvalidOption("size = 1 0".to_string()))
        );
    }

    #[test]
    fn test_defaults() {
        let options = QueryOptions::default();
        assert_eq!(options.query_type, QueryType::Search);
        assert_eq!(options.fixed_interval, "1d");
        assert_eq!(options.histogram_interval, 10);
        assert_eq!(options.size, 10);
        assert_eq!(options.time_zone, "Z");
        assert!(options.aggregation_type.is_none());
    }

    #[test]
    fn test_from_clause_applies_on_base() {
        let base = QueryOptions {
            size: 50,
            ..QueryOptions::default()
        };
        let options = QueryOptions::from_clause(
            r#"queryType = "aggregation", aggregationType = "avg", aggregationField = "age", interval = 20"#,
            &base,
        )
        .unwrap();

        assert_eq!(options.query_type, QueryType::Aggregation);
        assert_eq!(options.aggregation_type.as_deref(), Some("avg"));
        assert_eq!(options.aggregation_field.as_deref(), Some("age"));
        assert_eq!(options.histogram_interval, 20);
        assert_eq!(options.size, 50);
    }

    #[test]
    fn test_negative_size_parses_for_later_validation() {
        let options = QueryOptions::from_clause("size = -1", &QueryOptions::default()).unwrap();
        assert_eq!(options.size, -1);
    }

    #[test]
    fn test_invalid_typed_values() {
        let base = QueryOptions::default();
        assert_eq!(
            QueryOptions::from_clause("size = ten", &base),
            Err(QueryError::InvalidSize)
        );
        assert_eq!(
            QueryOptions::from_clause("interval = 1.5", &base),
            Err(QueryError::InvalidInterval)
        );
        assert_eq!(
            QueryOptions::from_clause("queryType = find", &base),
            Err(QueryError::InvalidQueryType("find".to_string()))
        );
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options = QueryOptions::from_clause("pretty = true, size = 3", &QueryOptions::default()).unwrap();
        assert_eq!(options.size, 3);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let options = QueryOptions::from_clause("size = 3, size = 4", &QueryOptions::default()).unwrap();
        assert_eq!(options.size, 4);
    }
}
