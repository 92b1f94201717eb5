//! In-memory reference backend over JSON records
//!
//! Field paths are dotted (`field_date.0.value`). A numeric segment indexes
//! into a list and is a no-op on a single value, a named segment fans out
//! across list items, and a list at the end of the path is compared item by
//! item: a condition holds when any item satisfies it, except `NOT IN` which
//! requires that no item is listed. Values compare numerically when both
//! sides are numbers, as text otherwise.

use std::cmp::Ordering;

use efq_parser::{ConditionValue, Conjunction, Operator, Scalar, SortDirection};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::descriptor::QueryDescriptor;
use crate::executor::{EntityId, ExecutionError, QueryExecutor};
use crate::translate::{
    apply_filters, apply_query, ConditionSink, EntityQuery, QueryGroup, RANDOM_ORDER_TAG,
};

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Leaf {
        field: String,
        value: ConditionValue,
    },
    Group {
        conjunction: Conjunction,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    fn matches(&self, record: &Value) -> bool {
        match self {
            Predicate::Leaf { field, value } => leaf_matches(&resolve(record, field), value),
            Predicate::Group {
                conjunction,
                children,
            } => group_matches(*conjunction, children, record),
        }
    }
}

fn group_matches(conjunction: Conjunction, children: &[Predicate], record: &Value) -> bool {
    if children.is_empty() {
        return true;
    }
    match conjunction {
        Conjunction::And => children.iter().all(|child| child.matches(record)),
        Conjunction::Or => children.iter().any(|child| child.matches(record)),
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Vec<&'a Value> {
    let index = segment.parse::<usize>().ok();
    match (value, index) {
        (Value::Array(items), Some(i)) => items.get(i).into_iter().collect(),
        (Value::Array(items), None) => items.iter().filter_map(|item| item.get(segment)).collect(),
        (Value::Object(map), _) => match map.get(segment) {
            Some(found) => vec![found],
            None if index == Some(0) => vec![value],
            None => Vec::new(),
        },
        (other, Some(0)) => vec![other],
        _ => Vec::new(),
    }
}

/// Every non-null value found at `path`
fn resolve<'a>(record: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![record];
    for segment in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|value| step(value, segment))
            .collect();
    }
    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        })
        .filter(|value| !value.is_null())
        .collect()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare_scalar(value: &Value, scalar: &Scalar) -> Option<Ordering> {
    let wanted = match scalar {
        Scalar::Int(n) => Some(*n as f64),
        Scalar::Text(t) => t.trim().parse().ok(),
    };
    if let (Some(a), Some(b)) = (number(value), wanted) {
        return a.partial_cmp(&b);
    }
    Some(text(value)?.as_str().cmp(scalar.to_string().as_str()))
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (number(a), number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    text(a).cmp(&text(b))
}

fn operator_holds(value: &Value, scalar: &Scalar, op: Operator) -> bool {
    if op == Operator::Contains {
        return text(value).is_some_and(|t| {
            t.to_lowercase()
                .contains(&scalar.to_string().to_lowercase())
        });
    }
    let Some(ord) = compare_scalar(value, scalar) else {
        return false;
    };
    match op {
        Operator::Eq => ord == Ordering::Equal,
        Operator::Ne => ord != Ordering::Equal,
        Operator::Le => ord != Ordering::Greater,
        Operator::Lt => ord == Ordering::Less,
        Operator::Gt => ord == Ordering::Greater,
        Operator::Ge => ord != Ordering::Less,
        Operator::Between | Operator::In | Operator::NotIn | Operator::Contains => false,
    }
}

fn listed(value: &Value, list: &[Scalar]) -> bool {
    list.iter()
        .any(|item| compare_scalar(value, item) == Some(Ordering::Equal))
}

fn leaf_matches(candidates: &[&Value], condition: &ConditionValue) -> bool {
    match condition {
        ConditionValue::Equals(scalar) => candidates
            .iter()
            .any(|v| operator_holds(v, scalar, Operator::Eq)),
        ConditionValue::Compare(scalar, op) => {
            candidates.iter().any(|v| operator_holds(v, scalar, *op))
        }
        ConditionValue::Between(lo, hi) => candidates.iter().any(|v| {
            operator_holds(v, lo, Operator::Ge) && operator_holds(v, hi, Operator::Le)
        }),
        ConditionValue::In(list) => candidates.iter().any(|v| listed(v, list)),
        ConditionValue::NotIn(list) => !candidates.iter().any(|v| listed(v, list)),
    }
}

/// Group under construction for a [`MemoryQuery`]
#[derive(Debug, Clone)]
pub struct MemoryGroup {
    conjunction: Conjunction,
    children: Vec<Predicate>,
}

impl ConditionSink for MemoryGroup {
    fn condition(&mut self, field: &str, value: &ConditionValue) {
        self.children.push(Predicate::Leaf {
            field: field.to_string(),
            value: value.clone(),
        });
    }
}

impl QueryGroup for MemoryGroup {
    fn nest(&mut self, group: Self) {
        self.children.push(Predicate::Group {
            conjunction: group.conjunction,
            children: group.children,
        });
    }
}

/// Query collected by the translator for a [`MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    filters: Vec<Predicate>,
    sort: Vec<(String, SortDirection)>,
    range: Option<(u64, u64)>,
    tags: Vec<String>,
}

impl MemoryQuery {
    /// Whether `tag` was added
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl ConditionSink for MemoryQuery {
    fn condition(&mut self, field: &str, value: &ConditionValue) {
        self.filters.push(Predicate::Leaf {
            field: field.to_string(),
            value: value.clone(),
        });
    }
}

impl EntityQuery for MemoryQuery {
    type Group = MemoryGroup;

    fn new_group(&self, conjunction: Conjunction) -> MemoryGroup {
        MemoryGroup {
            conjunction,
            children: Vec::new(),
        }
    }

    fn condition_group(&mut self, group: MemoryGroup) {
        self.filters.push(Predicate::Group {
            conjunction: group.conjunction,
            children: group.children,
        });
    }

    fn range(&mut self, start: u64, length: u64) {
        self.range = Some((start, length));
    }

    fn sort(&mut self, field: &str, direction: SortDirection) {
        self.sort.push((field.to_string(), direction));
    }

    fn add_tag(&mut self, tag: &str) {
        self.tags.push(tag.to_string());
    }

    fn supports_tag(&self, tag: &str) -> bool {
        tag == RANDOM_ORDER_TAG
    }
}

/// Records kept in memory, keyed by id in load order
#[derive(Debug, Clone)]
pub struct MemoryStore {
    id_field: String,
    records: IndexMap<EntityId, Value>,
}

impl MemoryStore {
    /// Empty store whose records carry their id under `id_field`
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            records: IndexMap::new(),
        }
    }

    /// Store loaded from a list of JSON objects
    pub fn from_records(
        id_field: impl Into<String>,
        records: impl IntoIterator<Item = Value>,
    ) -> Result<Self, ExecutionError> {
        let mut store = Self::new(id_field);
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Store loaded from a JSON array of objects
    pub fn from_json(id_field: impl Into<String>, json: &str) -> Result<Self, ExecutionError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ExecutionError::Unavailable(format!("Invalid records JSON: {e}")))?;
        match value {
            Value::Array(records) => Self::from_records(id_field, records),
            _ => Err(ExecutionError::Unavailable(
                "Records JSON must be an array of objects".to_string(),
            )),
        }
    }

    /// Add or replace a record, returning its id
    pub fn insert(&mut self, record: Value) -> Result<EntityId, ExecutionError> {
        if !record.is_object() {
            return Err(ExecutionError::InvalidRecord(format!(
                "expected an object, got {record}"
            )));
        }
        let id = match record.get(&self.id_field) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            ExecutionError::InvalidRecord(format!(
                "missing or non-numeric '{}' in {record}",
                self.id_field
            ))
        })?;
        self.records.insert(id, record);
        Ok(id)
    }

    /// Record with the given id
    pub fn get(&self, id: EntityId) -> Option<&Value> {
        self.records.get(&id)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no record
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching<'a>(&'a self, query: &MemoryQuery) -> Vec<(EntityId, &'a Value)> {
        self.records
            .iter()
            .filter(|(_, record)| group_matches(Conjunction::And, &query.filters, record))
            .map(|(id, record)| (*id, record))
            .collect()
    }

    /// Run a translated query
    pub fn run(&self, query: &MemoryQuery) -> Vec<EntityId> {
        let mut hits = self.matching(query);

        if query.has_tag(RANDOM_ORDER_TAG) {
            hits.shuffle(&mut rand::rng());
        } else if !query.sort.is_empty() {
            hits.sort_by(|(_, a), (_, b)| {
                for (field, direction) in &query.sort {
                    let ord = match (resolve(a, field).first(), resolve(b, field).first()) {
                        (Some(x), Some(y)) => {
                            let ord = compare_values(x, y);
                            match direction {
                                SortDirection::Asc => ord,
                                SortDirection::Desc => ord.reverse(),
                            }
                        }
                        (Some(_), None) => Ordering::Less,
                        (None, Some(_)) => Ordering::Greater,
                        (None, None) => Ordering::Equal,
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let ids = hits.into_iter().map(|(id, _)| id);
        match query.range {
            Some((start, length)) => ids
                .skip(usize::try_from(start).unwrap_or(usize::MAX))
                .take(usize::try_from(length).unwrap_or(usize::MAX))
                .collect(),
            None => ids.collect(),
        }
    }
}

impl QueryExecutor for MemoryStore {
    fn execute(&self, descriptor: &QueryDescriptor) -> Result<Vec<EntityId>, ExecutionError> {
        let mut query = MemoryQuery::default();
        apply_query(&mut query, descriptor);
        Ok(self.run(&query))
    }

    fn count(&self, descriptor: &QueryDescriptor) -> Result<u64, ExecutionError> {
        let mut query = MemoryQuery::default();
        apply_filters(&mut query, descriptor);
        Ok(self.matching(&query).len() as u64)
    }
}
