//! Query error types
//!
//! Every failure in splitting, tokenizing, parsing, date resolution, option
//! handling or compiling maps to exactly one variant. Processing is fail-fast:
//! the first error aborts the request.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while compiling a filter expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Input structure is malformed (too many `;`, unbalanced parentheses, dangling condition)
    #[error("{0}")]
    InvalidQueryFormat(String),

    /// Option fragment is not `key = value`
    #[error("Invalid option '{0}'. Options should be key=value pairs separated by ','.")]
    InvalidOption(String),

    #[error("Invalid field {0} found.")]
    InvalidField(String),

    #[error("Field is missing before operator {0}.")]
    MissingField(String),

    #[error("Invalid operator found.")]
    InvalidOperator,

    #[error("Operator {operator} is not allowed for field type {field_type}.")]
    OperatorNotAllowed { operator: String, field_type: String },

    /// `/` lists only work with `=` and `!=`
    #[error("Operator {0} cannot be used with multiple values.")]
    InvalidOperatorForValue(String),

    #[error("Field type for {0} is not defined.")]
    FieldTypeNotDefined(String),

    #[error("Field {0} is present but not indexed.")]
    FieldNotIndexed(String),

    #[error("Invalid field type {field_type} for field {field}.")]
    InvalidFieldType { field_type: String, field: String },

    /// Value cannot be coerced to the field's type
    #[error("Invalid value {value} for field {field}: {reason}.")]
    InvalidValue {
        value: String,
        field: String,
        reason: String,
    },

    #[error("Date format should be YYYY-MM-DD HH:mm:ss.SSS, now or today with an optional offset like now-2d.")]
    InvalidDateFormat,

    #[error("Time zone format should be Z or ±HH:MM.")]
    InvalidTimezoneFormat,

    #[error("fixed_interval format should be a number followed by s (seconds), m (minutes), h (hours), d (days), w (weeks), M (months), or y (years).")]
    InvalidFixedInterval,

    #[error("Size must be a non-negative integer.")]
    InvalidSize,

    #[error("Interval must be a positive integer and greater than 0.")]
    InvalidInterval,

    #[error("Missing aggregation type or field.")]
    MissingParameters,

    #[error("Aggregation type {0} is not valid.")]
    InvalidAggregationType(String),

    #[error("Aggregation type {aggregation} is not allowed on field type {field_type}.")]
    AggregationNotAllowed {
        aggregation: String,
        field_type: String,
    },

    #[error("Field {0} not found in the mapping.")]
    FieldNotFound(String),

    #[error("Invalid query type {0}.")]
    InvalidQueryType(String),
}

impl QueryError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQueryFormat(_) => "INVALID_QUERY_FORMAT",
            Self::InvalidOption(_) => "INVALID_OPTION",
            Self::InvalidField(_) => "INVALID_FIELD",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidOperator => "INVALID_OPERATOR",
            Self::OperatorNotAllowed { .. } => "OPERATOR_NOT_ALLOWED",
            Self::InvalidOperatorForValue(_) => "INVALID_OPERATOR_FOR_VALUE",
            Self::FieldTypeNotDefined(_) => "FIELD_TYPE_NOT_DEFINED",
            Self::FieldNotIndexed(_) => "FIELD_NOT_INDEXED",
            Self::InvalidFieldType { .. } => "INVALID_FIELD_TYPE",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::InvalidDateFormat => "INVALID_DATE_FORMAT",
            Self::InvalidTimezoneFormat => "INVALID_TIMEZONE_FORMAT",
            Self::InvalidFixedInterval => "INVALID_FIXED_INTERVAL",
            Self::InvalidSize => "INVALID_SIZE",
            Self::InvalidInterval => "INVALID_INTERVAL",
            Self::MissingParameters => "MISSING_PARAMETERS",
            Self::InvalidAggregationType(_) => "INVALID_AGGREGATION_TYPE",
            Self::AggregationNotAllowed { .. } => "AGGREGATION_NOT_ALLOWED",
            Self::FieldNotFound(_) => "FIELD_NOT_FOUND",
            Self::InvalidQueryType(_) => "INVALID_QUERY_TYPE",
        }
    }

    /// Caller-facing `{errorCode, message}` body
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error_code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Serializable error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_code: String,
    pub message: String,
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
