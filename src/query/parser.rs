//! Expression Parser
//!
//! Builds a [`Condition`] tree from tokens by recursive descent.
//!
//! # Grammar
//!
//! ```text
//! expression := (logicGate | condition | '(' expression ')')*
//! condition  := FIELD OPERATOR VALUE
//! ```
//!
//! Every parenthesised expression becomes a group. A group has a single gate:
//! the last `and`/`or` seen before it closes, so `a=1 and b=2 or c=3` is one
//! `or` group of three leaves.
//!
//! Each leaf is checked against the catalog as soon as its value is read, and
//! date values are resolved immediately. The first problem aborts the parse.

use chrono::{DateTime, Utc};

use crate::catalog::{FieldLookup, FieldType};
use crate::query::ast::*;
use crate::query::date::DateResolver;
use crate::query::error::{QueryError, QueryResult};
use crate::query::token::{tokenize, Token};

/// Deepest parenthesis nesting accepted
pub const MAX_DEPTH: usize = 128;

/// Progress through the current condition
#[derive(Debug, Clone, Copy)]
enum Pending<'t> {
    NeedField,
    NeedOperator { field: &'t str },
    NeedValue { field: &'t str, operator: Operator },
}

/// Recursive-descent parser over a token slice
pub struct ExpressionParser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    catalog: &'a dyn FieldLookup,
    dates: &'a DateResolver,
    now: DateTime<Utc>,
}

impl<'a> ExpressionParser<'a> {
    /// Create a parser; `now` for relative dates is captured here
    pub fn new(tokens: &'a [Token], catalog: &'a dyn FieldLookup, dates: &'a DateResolver) -> Self {
        Self {
            tokens,
            cursor: 0,
            catalog,
            dates,
            now: Utc::now(),
        }
    }

    /// Pin the instant used for `now` and `today`
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Parse all tokens into a root group
    pub fn parse(mut self) -> QueryResult<Condition> {
        self.parse_expression(0)
    }

    fn next_token(&mut self) -> Option<&'a Token> {
        let tokens = self.tokens;
        let token = tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    fn parse_expression(&mut self, depth: usize) -> QueryResult<Condition> {
        if depth > MAX_DEPTH {
            return Err(QueryError::InvalidQueryFormat(
                "Parentheses nested too deeply.".to_string(),
            ));
        }

        let mut conditions = Vec::new();
        let mut gate = LogicGate::default();
        let mut pending = Pending::NeedField;

        while let Some(token) = self.next_token() {
            pending = match (pending, token) {
                (Pending::NeedField, Token::Gate(g)) => {
                    gate = *g;
                    Pending::NeedField
                }
                (Pending::NeedField, Token::Open) => {
                    conditions.push(self.parse_expression(depth + 1)?);
                    Pending::NeedField
                }
                (Pending::NeedField, Token::Close) => {
                    if depth == 0 {
                        return Err(QueryError::InvalidQueryFormat(
                            "Unexpected ')' without a matching '('.".to_string(),
                        ));
                    }
                    return Ok(Condition::group(conditions, gate));
                }
                (Pending::NeedField, Token::Op(op)) => {
                    return Err(QueryError::MissingField(op.to_string()));
                }
                (Pending::NeedField, Token::Word(word)) => {
                    if !self.catalog.contains(word) {
                        return Err(QueryError::InvalidField(word.clone()));
                    }
                    Pending::NeedOperator {
                        field: word.as_str(),
                    }
                }
                (Pending::NeedField, Token::Quoted(text)) => {
                    return Err(QueryError::InvalidField(text.clone()));
                }
                (Pending::NeedOperator { field }, Token::Op(operator)) => Pending::NeedValue {
                    field,
                    operator: *operator,
                },
                (Pending::NeedOperator { .. }, Token::Word(_) | Token::Quoted(_)) => {
                    return Err(QueryError::InvalidOperator);
                }
                (Pending::NeedOperator { field }, other) => {
                    return Err(QueryError::InvalidQueryFormat(format!(
                        "Expected an operator after {}, found {}.",
                        field, other
                    )));
                }
                (Pending::NeedValue { field, operator }, Token::Word(raw) | Token::Quoted(raw)) => {
                    conditions.push(self.build_leaf(field, operator, raw.as_str())?);
                    Pending::NeedField
                }
                (Pending::NeedValue { field, operator }, other) => {
                    return Err(QueryError::InvalidQueryFormat(format!(
                        "Expected a value after {} {}, found {}.",
                        field, operator, other
                    )));
                }
            };
        }

        match pending {
            Pending::NeedField => {}
            Pending::NeedOperator { field } => {
                return Err(QueryError::InvalidQueryFormat(format!(
                    "Condition on {} is missing an operator and value.",
                    field
                )));
            }
            Pending::NeedValue { field, operator } => {
                return Err(QueryError::InvalidQueryFormat(format!(
                    "Condition {} {} is missing a value.",
                    field, operator
                )));
            }
        }

        if depth > 0 {
            return Err(QueryError::InvalidQueryFormat(
                "Unterminated '(' at end of input.".to_string(),
            ));
        }

        Ok(Condition::group(conditions, gate))
    }

    /// Validate a completed condition and convert its value
    fn build_leaf(&self, field: &str, operator: Operator, raw: &str) -> QueryResult<Condition> {
        let raw = unquote(raw);

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

        if !field_type.allows(operator) {
            return Err(QueryError::OperatorNotAllowed {
                operator: operator.to_string(),
                field_type: declared.to_string(),
            });
        }

        let value = if raw.contains('/') {
            if !operator.accepts_list() {
                return Err(QueryError::InvalidOperatorForValue(operator.to_string()));
            }
            let items = raw
                .split('/')
                .map(|item| match item.trim() {
                    "" => Err(QueryError::InvalidValue {
                        value: raw.to_string(),
                        field: field.to_string(),
                        reason: "empty item in value list".to_string(),
                    }),
                    item => self.convert_scalar(field, field_type, operator, item),
                })
                .collect::<QueryResult<Vec<_>>>()?;
            ConditionValue::List(items)
        } else {
            ConditionValue::Single(self.convert_scalar(field, field_type, operator, raw)?)
        };

        tracing::trace!(field, %operator, "parsed condition");
        Ok(Condition::leaf(field, operator, value))
    }

    fn convert_scalar(
        &self,
        field: &str,
        field_type: FieldType,
        operator: Operator,
        raw: &str,
    ) -> QueryResult<Scalar> {
        if operator == Operator::Exists {
            return parse_exists_flag(raw).ok_or_else(|| QueryError::InvalidValue {
                value: raw.to_string(),
                field: field.to_string(),
                reason: "expected true or false".to_string(),
            });
        }

        match field_type {
            FieldType::Date => Ok(Scalar::Text(self.dates.resolve_at(raw, self.now)?)),
            ty if ty.is_numeric() => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Scalar::Number)
                .ok_or_else(|| QueryError::InvalidValue {
                    value: raw.to_string(),
                    field: field.to_string(),
                    reason: format!("expected a number for {}", ty),
                }),
            _ => Ok(Scalar::text(raw)),
        }
    }
}

/// Tokenize and parse a filter expression
pub fn parse_filter(
    input: &str,
    catalog: &dyn FieldLookup,
    dates: &DateResolver,
) -> QueryResult<Condition> {
    let tokens = tokenize(input);
    ExpressionParser::new(&tokens, catalog, dates).parse()
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}

fn parse_exists_flag(raw: &str) -> Option<Scalar> {
    if raw.eq_ignore_ascii_case("true") {
        Some(Scalar::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Some(Scalar::Bool(false))
    } else {
        None
    }
}
