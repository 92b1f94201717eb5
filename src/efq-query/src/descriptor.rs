//! Normalized query descriptor
//!
//! A [`QueryDescriptor`] is built once per request and read by both the
//! records query and the count query, so the two always see the same filters.

use efq_parser::{ConditionGroup, ConditionValue, RangeSpec, Scalar, SortDirective};
use indexmap::IndexMap;
use serde::Serialize;

/// Bundle restriction of a query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bundle {
    /// No bundle condition
    #[default]
    Any,
    /// Equality on a single bundle
    One(String),
    /// Membership in several bundles
    Many(Vec<String>),
}

impl Bundle {
    /// Bundle restriction from a parsed `content_type` list
    pub fn from_list(mut bundles: Vec<String>) -> Self {
        match bundles.len() {
            0 => Bundle::Any,
            1 => Bundle::One(bundles.remove(0)),
            _ => Bundle::Many(bundles),
        }
    }

    /// Condition this restriction puts on the bundle field
    pub fn condition(&self) -> Option<ConditionValue> {
        match self {
            Bundle::Any => None,
            Bundle::One(bundle) => Some(ConditionValue::Equals(Scalar::Text(bundle.clone()))),
            Bundle::Many(bundles) => Some(ConditionValue::In(
                bundles.iter().map(|b| Scalar::Text(b.clone())).collect(),
            )),
        }
    }
}

/// Everything needed to run a records or count query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    /// Entity kind (`node`, `taxonomy_term`, `media`, ...)
    pub entity_kind: String,
    /// Field the bundle restriction applies to
    pub bundle_field: String,
    /// Bundle restriction
    pub bundle: Bundle,
    /// Top-level conditions, AND-ed, in insertion order
    pub conditions: IndexMap<String, ConditionValue>,
    /// Category group
    pub group: Option<ConditionGroup>,
    /// Date group
    pub group2: Option<ConditionGroup>,
    /// Result window, `length > 0`
    pub range: RangeSpec,
    /// Sort directives, primary key first
    pub sort: Vec<SortDirective>,
    /// Random ordering, replaces `sort` when the backend supports it
    pub random: bool,
}

impl QueryDescriptor {
    /// Descriptor without any condition
    pub fn new(entity_kind: impl Into<String>, bundle_field: impl Into<String>) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            bundle_field: bundle_field.into(),
            bundle: Bundle::Any,
            conditions: IndexMap::new(),
            group: None,
            group2: None,
            range: RangeSpec {
                start: 0,
                length: 1000,
            },
            sort: Vec::new(),
            random: false,
        }
    }
}
