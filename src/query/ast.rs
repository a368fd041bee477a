//! Condition tree
//!
//! The parsed form of a filter expression. Leaves hold a single comparison,
//! groups combine their children with one logic gate.
//!
//! # Example
//!
//! ```text
//! status = "active" and (age > 30 or age < 18)
//! ```
//!
//! parses to a root `and` group holding the `status` leaf and an `or` group
//! with the two `age` leaves. Serialized, leaves are `{field, operator, value}`
//! and groups are `{conditions, logicGate}`.

use serde::{Deserialize, Serialize};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equal to (or member of a `/` list)
    #[serde(rename = "=")]
    Eq,
    /// Not equal to (or not a member of a `/` list)
    #[serde(rename = "!=")]
    Ne,
    /// Greater than
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal to
    #[serde(rename = ">=")]
    Gte,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal to
    #[serde(rename = "<=")]
    Lte,
    /// Field exists (`field : true`) or is missing (`field : false`)
    #[serde(rename = ":")]
    Exists,
}

impl Operator {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ":" => Some(Self::Exists),
            _ => None,
        }
    }

    /// Whether a `/` separated list of values may follow this operator
    pub fn accepts_list(&self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }

    /// Bound name used in a `range` clause
    pub fn range_bound(&self) -> Option<&'static str> {
        match self {
            Self::Gt => Some("gt"),
            Self::Gte => Some("gte"),
            Self::Lt => Some("lt"),
            Self::Lte => Some("lte"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Exists => write!(f, ":"),
        }
    }
}

/// Combinator applied to sibling conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicGate {
    #[default]
    And,
    Or,
}

impl LogicGate {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if s.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else {
            None
        }
    }
}

impl std::fmt::Display for LogicGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// A single comparison value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Exists flag for the `:` operator
    Bool(bool),
    /// Numeric value (numeric field types)
    Number(f64),
    /// String value (keyword, text, boolean and resolved dates)
    Text(String),
}

impl Scalar {
    /// Create a text scalar
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// `field = value`
    Single(Scalar),
    /// `field = a/b/c`
    List(Vec<Scalar>),
}

impl ConditionValue {
    /// Values as a slice, a single value being a one-element slice
    pub fn as_slice(&self) -> &[Scalar] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::List(vs) => vs,
        }
    }

    /// Check if this is a `/` list
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// A validated comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Field path, possibly dotted
    pub field: String,
    /// Comparison operator
    pub operator: Operator,
    /// Value(s) to compare against
    pub value: ConditionValue,
}

impl Leaf {
    /// Create a new leaf
    pub fn new(field: impl Into<String>, operator: Operator, value: ConditionValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Split a dotted path into `(nested_path, leaf_name)`
    pub fn nested_path(&self) -> Option<(&str, &str)> {
        self.field.rsplit_once('.')
    }
}

/// Sibling conditions joined by one gate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Child conditions in input order
    pub conditions: Vec<Condition>,
    /// Gate joining the children
    pub logic_gate: LogicGate,
}

/// A node of the condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Leaf(Leaf),
    Group(Group),
}

impl Condition {
    /// Create a group node
    pub fn group(conditions: Vec<Condition>, logic_gate: LogicGate) -> Self {
        Self::Group(Group {
            conditions,
            logic_gate,
        })
    }

    /// Create a leaf node
    pub fn leaf(field: impl Into<String>, operator: Operator, value: ConditionValue) -> Self {
        Self::Leaf(Leaf::new(field, operator, value))
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Group(g) => g.conditions.iter().map(Condition::leaf_count).sum(),
        }
    }
}
