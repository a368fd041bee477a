//! Field types known to the filter language
//!
//! The catalog stores the raw type string from the mapping document; this
//! module turns it into a [`FieldType`] and answers which comparators each
//! type accepts.

use crate::query::Operator;

/// A field type from the index mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Keyword,
    Text,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    ScaledFloat,
    Date,
    Boolean,
    /// Container of nested documents; aggregatable but not filterable
    Nested,
}

impl FieldType {
    /// Parse from the mapping type name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "keyword" => Some(Self::Keyword),
            "text" => Some(Self::Text),
            "long" => Some(Self::Long),
            "integer" => Some(Self::Integer),
            "short" => Some(Self::Short),
            "byte" => Some(Self::Byte),
            "double" => Some(Self::Double),
            "float" => Some(Self::Float),
            "half_float" => Some(Self::HalfFloat),
            "scaled_float" => Some(Self::ScaledFloat),
            "date" => Some(Self::Date),
            "boolean" => Some(Self::Boolean),
            "nested" => Some(Self::Nested),
            _ => None,
        }
    }

    /// Mapping type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Text => "text",
            Self::Long => "long",
            Self::Integer => "integer",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::Double => "double",
            Self::Float => "float",
            Self::HalfFloat => "half_float",
            Self::ScaledFloat => "scaled_float",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Nested => "nested",
        }
    }

    /// Whether values of this type are coerced to numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Long
                | Self::Integer
                | Self::Short
                | Self::Byte
                | Self::Double
                | Self::Float
                | Self::HalfFloat
                | Self::ScaledFloat
        )
    }

    /// Whether the type can appear on the left side of a condition
    pub fn is_filterable(&self) -> bool {
        !matches!(self, Self::Nested)
    }

    /// Numeric and date fields compile to `terms`/`range` clauses
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, Self::Date)
    }

    /// Check whether a comparator may be used with this type
    pub fn allows(&self, op: Operator) -> bool {
        match self {
            Self::Nested => false,
            Self::Keyword | Self::Text | Self::Boolean => {
                matches!(op, Operator::Eq | Operator::Ne | Operator::Exists)
            }
            _ => true,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
