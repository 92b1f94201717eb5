//! Typed fragments produced by the efq parsers
//!
//! Conditions are a tagged union: a [`Condition`] is either a leaf that
//! compares one field against a [`ConditionValue`], or a [`ConditionGroup`]
//! combining children under AND or OR.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// A single comparison value taken from a DSL fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer value (term ids, flags, counters)
    Int(i64),
    /// Any other value, kept verbatim
    Text(String),
}

impl Scalar {
    /// Interpret a raw DSL value: integers become [`Scalar::Int`], anything
    /// else is kept as text
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => Scalar::Int(n),
            Err(_) => Scalar::Text(raw.to_string()),
        }
    }

    /// The value as an integer, if it is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Text(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// Comparison operators understood by the entity-query contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equality (`=`), the implicit operator
    Eq,
    /// Inequality (`!=`)
    Ne,
    /// Less than or equal (`<=`)
    Le,
    /// Less than (`<`)
    Lt,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    Ge,
    /// Inclusive range over two bounds
    Between,
    /// Membership in a list
    In,
    /// Exclusion from a list
    NotIn,
    /// Substring match
    Contains,
}

impl Operator {
    /// Parse the operator segment of a `field` fragment
    pub fn parse(raw: &str) -> Option<Self> {
        let op = match raw.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            "<=" => Operator::Le,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "BETWEEN" => Operator::Between,
            "IN" => Operator::In,
            "NOT IN" | "NOT_IN" => Operator::NotIn,
            "CONTAINS" => Operator::Contains,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical spelling, as passed to the entity-query contract
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Le => "<=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Between => "BETWEEN",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Contains => "CONTAINS",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The right-hand side of a condition, paired with its operator.
///
/// The shape of the operand is tied to the operator: `BETWEEN` always has two
/// bounds and `IN`/`NOT IN` always have a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    /// Implicit equality
    Equals(Scalar),
    /// Single-value comparison (`!=`, `<=`, `<`, `>`, `>=`, `CONTAINS`)
    Compare(Scalar, Operator),
    /// Inclusive range
    Between(Scalar, Scalar),
    /// List membership
    In(Vec<Scalar>),
    /// List exclusion
    NotIn(Vec<Scalar>),
}

impl ConditionValue {
    /// Operator carried by this value, `None` for implicit equality
    pub fn operator(&self) -> Option<Operator> {
        match self {
            ConditionValue::Equals(_) => None,
            ConditionValue::Compare(_, op) => Some(*op),
            ConditionValue::Between(..) => Some(Operator::Between),
            ConditionValue::In(_) => Some(Operator::In),
            ConditionValue::NotIn(_) => Some(Operator::NotIn),
        }
    }

    /// Single-value comparison; list and range operators are routed to
    /// their dedicated variants by the parsers, never through here
    pub fn compare(value: impl Into<Scalar>, op: Operator) -> Self {
        match op {
            Operator::Eq => ConditionValue::Equals(value.into()),
            _ => ConditionValue::Compare(value.into(), op),
        }
    }
}

/// Boolean combinator of a condition group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    /// All children must hold
    #[default]
    And,
    /// At least one child must hold
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => f.write_str("AND"),
            Conjunction::Or => f.write_str("OR"),
        }
    }
}

/// A field compared against a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaf {
    /// Field key, possibly a dotted path (`field_date.0.value`)
    pub field: String,
    /// Operator and operand
    pub value: ConditionValue,
}

impl Leaf {
    /// Create a leaf condition
    pub fn new(field: impl Into<String>, value: ConditionValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// A node of the condition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Single comparison
    Leaf(Leaf),
    /// Nested group
    Group(ConditionGroup),
}

/// AND/OR combination of leaves and nested groups
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConditionGroup {
    /// How the children combine
    pub conjunction: Conjunction,
    /// Children in insertion order
    pub children: Vec<Condition>,
}

impl ConditionGroup {
    /// Empty AND group
    pub fn and() -> Self {
        Self::new(Conjunction::And)
    }

    /// Empty OR group
    pub fn or() -> Self {
        Self::new(Conjunction::Or)
    }

    /// Empty group with the given conjunction
    pub fn new(conjunction: Conjunction) -> Self {
        Self {
            conjunction,
            children: Vec::new(),
        }
    }

    /// Append a leaf condition
    #[must_use]
    pub fn with_leaf(mut self, field: impl Into<String>, value: ConditionValue) -> Self {
        self.children.push(Condition::Leaf(Leaf::new(field, value)));
        self
    }

    /// Append a nested group
    #[must_use]
    pub fn with_group(mut self, group: ConditionGroup) -> Self {
        self.children.push(Condition::Group(group));
        self
    }

    /// Whether the group has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate over every leaf in the tree, depth first
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                Condition::Leaf(leaf) => out.push(leaf),
                Condition::Group(group) => out.extend(group.leaves()),
            }
        }
        out
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

impl SortDirection {
    /// Parse `ASC`/`DESC`, case-insensitively
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(SortDirection::Asc),
            "DESC" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// One `field-DIRECTION` sort entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// Field to sort on
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl SortDirective {
    /// Create a sort directive
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Result window of a records query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    /// Offset of the first record
    pub start: u64,
    /// Number of records, always greater than zero
    pub length: u64,
}

/// Pager rendering strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagerMode {
    /// Every page number plus prev/next
    #[default]
    Default,
    /// "Page X of Y" plus prev/next
    Simple,
    /// Window of the given (odd) size around the current page, with ellipses
    Restricted(u32),
}

impl fmt::Display for PagerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagerMode::Default => f.write_str("default"),
            PagerMode::Simple => f.write_str("simple"),
            PagerMode::Restricted(n) => write!(f, "restricted-{n}"),
        }
    }
}

/// Parsed `paged` fragment: `page-perPage[--mode]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagerSpec {
    /// Current page, 1-based
    pub page: u64,
    /// Records per page, at least 1
    pub per_page: u64,
    /// Rendering strategy
    pub mode: PagerMode,
}

impl PagerSpec {
    /// Range of records covered by this page
    pub fn range(&self) -> RangeSpec {
        RangeSpec {
            start: self.page.saturating_sub(1).saturating_mul(self.per_page),
            length: self.per_page,
        }
    }

    /// Same pager pointed at another page
    #[must_use]
    pub fn with_page(self, page: u64) -> Self {
        Self { page, ..self }
    }
}

/// Encodes back to the `paged` grammar. The default mode is written without
/// a suffix, matching what clients send.
impl fmt::Display for PagerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.page, self.per_page)?;
        match self.mode {
            PagerMode::Default => Ok(()),
            mode => write!(f, "--{mode}"),
        }
    }
}
