//! Translation of a descriptor onto an entity-query backend
//!
//! Backends implement [`EntityQuery`]; this module walks the descriptor and
//! the condition tree and emits the calls in a fixed order: bundle,
//! top-level conditions, category group, date group, then ordering and range.

use efq_parser::{Condition, ConditionGroup, ConditionValue, Conjunction, SortDirection};
use log::debug;

use crate::descriptor::QueryDescriptor;

/// Tag asking the backend to return records in random order
pub const RANDOM_ORDER_TAG: &str = "random_order";

/// Anything conditions can be added to
pub trait ConditionSink {
    /// Add a leaf condition
    fn condition(&mut self, field: &str, value: &ConditionValue);
}

/// A condition group under construction
pub trait QueryGroup: ConditionSink + Sized {
    /// Nest a finished subgroup inside this one
    fn nest(&mut self, group: Self);
}

/// The entity-query contract a storage backend implements
pub trait EntityQuery: ConditionSink {
    /// Group type produced by [`EntityQuery::new_group`]
    type Group: QueryGroup;

    /// Start a new, empty group
    fn new_group(&self, conjunction: Conjunction) -> Self::Group;

    /// Attach a finished group to the query
    fn condition_group(&mut self, group: Self::Group);

    /// Restrict the result window
    fn range(&mut self, start: u64, length: u64);

    /// Add a sort key; earlier calls take precedence
    fn sort(&mut self, field: &str, direction: SortDirection);

    /// Tag the query
    fn add_tag(&mut self, tag: &str);

    /// Whether the backend honours `tag`
    fn supports_tag(&self, _tag: &str) -> bool {
        false
    }
}

/// Build the backend group for `group`, recursing into subgroups
pub fn build_group<Q: EntityQuery>(query: &Q, group: &ConditionGroup) -> Q::Group {
    let mut out = query.new_group(group.conjunction);
    for child in &group.children {
        match child {
            Condition::Leaf(leaf) => out.condition(&leaf.field, &leaf.value),
            Condition::Group(sub) => {
                let sub = build_group(query, sub);
                out.nest(sub);
            }
        }
    }
    out
}

/// Apply every filter of `descriptor`: what a count query needs
pub fn apply_filters<Q: EntityQuery>(query: &mut Q, descriptor: &QueryDescriptor) {
    if let Some(bundle) = descriptor.bundle.condition() {
        query.condition(&descriptor.bundle_field, &bundle);
    }
    for (field, value) in &descriptor.conditions {
        query.condition(field, value);
    }
    for group in [&descriptor.group, &descriptor.group2].into_iter().flatten() {
        let group = build_group(query, group);
        query.condition_group(group);
    }
}

/// Apply filters, ordering and range: the records query
pub fn apply_query<Q: EntityQuery>(query: &mut Q, descriptor: &QueryDescriptor) {
    apply_filters(query, descriptor);

    if descriptor.random && query.supports_tag(RANDOM_ORDER_TAG) {
        query.add_tag(RANDOM_ORDER_TAG);
    } else {
        if descriptor.random {
            debug!(
                "Backend does not support '{}', keeping the explicit sort",
                RANDOM_ORDER_TAG
            );
        }
        for directive in &descriptor.sort {
            query.sort(&directive.field, directive.direction);
        }
    }

    query.range(descriptor.range.start, descriptor.range.length);
}
