//! Aggregation compatibility
//!
//! Each aggregation only makes sense on some field types: averages need
//! numbers, date histograms need dates, term buckets work on any scalar.

use crate::catalog::{FieldLookup, FieldType};
use crate::query::error::{QueryError, QueryResult};

/// Supported aggregation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Avg,
    Sum,
    Min,
    Max,
    Stats,
    ExtendedStats,
    ValueCount,
    Percentiles,
    Cardinality,
    Terms,
    Histogram,
    DateHistogram,
    Nested,
}

impl AggregationKind {
    /// Parse from the aggregation name used in the query document
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "avg" => Some(Self::Avg),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "stats" => Some(Self::Stats),
            "extended_stats" => Some(Self::ExtendedStats),
            "value_count" => Some(Self::ValueCount),
            "percentiles" => Some(Self::Percentiles),
            "cardinality" => Some(Self::Cardinality),
            "terms" => Some(Self::Terms),
            "histogram" => Some(Self::Histogram),
            "date_histogram" => Some(Self::DateHistogram),
            "nested" => Some(Self::Nested),
            _ => None,
        }
    }

    /// Name used as the aggregation key
    pub fn name(&self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Stats => "stats",
            Self::ExtendedStats => "extended_stats",
            Self::ValueCount => "value_count",
            Self::Percentiles => "percentiles",
            Self::Cardinality => "cardinality",
            Self::Terms => "terms",
            Self::Histogram => "histogram",
            Self::DateHistogram => "date_histogram",
            Self::Nested => "nested",
        }
    }

    /// Check whether this aggregation can run on a field of the given type
    pub fn supports(&self, field_type: FieldType) -> bool {
        match self {
            Self::Avg
            | Self::Sum
            | Self::Stats
            | Self::ExtendedStats
            | Self::Percentiles
            | Self::Histogram => field_type.is_numeric(),
            Self::Min | Self::Max => field_type.is_ordered(),
            Self::ValueCount | Self::Cardinality | Self::Terms => field_type.is_filterable(),
            Self::DateHistogram => field_type == FieldType::Date,
            Self::Nested => field_type == FieldType::Nested,
        }
    }
}

impl std::fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Check that `aggregation` may run on `field`
pub fn validate_aggregation(
    catalog: &dyn FieldLookup,
    aggregation: &str,
    field: &str,
) -> QueryResult<AggregationKind> {
    let declared = catalog
        .field_type(field)
        .ok_or_else(|| QueryError::FieldNotFound(field.to_string()))?;

    let kind = AggregationKind::from_str(aggregation)
        .ok_or_else(|| QueryError::InvalidAggregationType(aggregation.to_string()))?;

    match FieldType::from_str(declared) {
        Some(field_type) if kind.supports(field_type) => Ok(kind),
        _ => Err(QueryError::AggregationNotAllowed {
            aggregation: aggregation.to_string(),
            field_type: declared.to_string(),
        }),
    }
}
