//! Fragment parsers for the efq query DSL
//!
//! Each parser takes the value of one DSL key and returns a typed fragment.
//! Segments are separated by `--`, lists by `-` and repeated fragments by `,`.
//! Every split is checked before use so a short fragment is reported as
//! [`ParseError::Malformed`] instead of being silently truncated.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res},
    multi::separated_list1,
    sequence::{preceded, separated_pair},
    IResult, Parser,
};
use std::str::FromStr;

use crate::ast::*;
use crate::error::{ParseError, Result};
use efq_shared::utils::{is_blank, split_non_empty};

/// Separator between the segments of one fragment
pub const DELIMITER: &str = "--";

/// Token that disables a category filter
const ALL_TOKEN: &str = "all";

/// Token that disables a sort entry
const NULL_TOKEN: &str = "null";

// nom building blocks

fn unsigned<T: FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, |digits: &str| digits.parse::<T>()).parse(input)
}

fn number_pair(input: &str) -> IResult<&str, (u64, u64)> {
    separated_pair(unsigned::<u64>, char('-'), unsigned::<u64>).parse(input)
}

fn terms(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('-'), take_while1(|c: char| c != '-')).parse(input)
}

fn field_terms(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    separated_pair(take_until(DELIMITER), tag(DELIMITER), terms).parse(input)
}

fn pager_mode(input: &str) -> IResult<&str, PagerMode> {
    alt((
        nom::combinator::value(PagerMode::Default, tag("default")),
        nom::combinator::value(PagerMode::Simple, tag("simple")),
        map(
            preceded(tag("restricted-"), unsigned::<u32>),
            PagerMode::Restricted,
        ),
    ))
    .parse(input)
}

fn require_value<'a>(key: &'static str, raw: &'a str) -> Result<&'a str> {
    if is_blank(raw) {
        return Err(ParseError::EmptyInput { key });
    }
    Ok(raw.trim())
}

/// Parse `field--id-id-...` into the field name and its term list
fn parse_term_fragment(key: &'static str, fragment: &str) -> Result<(String, Vec<Scalar>)> {
    let (_, (field, ids)) = all_consuming(field_terms)
        .parse(fragment)
        .map_err(|_| ParseError::malformed(key, fragment, "expected field--id-id"))?;
    if field.is_empty() {
        return Err(ParseError::malformed(key, fragment, "missing field name"));
    }
    Ok((field.to_string(), ids.into_iter().map(Scalar::parse).collect()))
}

/// Build the operand for `operator` out of the raw value segment
fn condition_value(
    key: &'static str,
    fragment: &str,
    raw: &str,
    operator: Operator,
) -> Result<ConditionValue> {
    match operator {
        Operator::Between => {
            let (lo, hi) = raw
                .split_once('-')
                .filter(|(lo, hi)| !lo.is_empty() && !hi.is_empty() && !hi.contains('-'))
                .ok_or_else(|| ParseError::malformed(key, fragment, "BETWEEN expects lo-hi"))?;
            Ok(ConditionValue::Between(Scalar::parse(lo), Scalar::parse(hi)))
        }
        Operator::In | Operator::NotIn => {
            let list: Vec<Scalar> = split_non_empty(raw, "-").map(Scalar::parse).collect();
            if list.is_empty() {
                return Err(ParseError::malformed(key, fragment, "empty value list"));
            }
            Ok(if operator == Operator::In {
                ConditionValue::In(list)
            } else {
                ConditionValue::NotIn(list)
            })
        }
        _ => Ok(ConditionValue::compare(Scalar::parse(raw), operator)),
    }
}

fn parse_field_fragment(fragment: &str) -> Result<Leaf> {
    let (name, tail) = fragment
        .split_once(DELIMITER)
        .ok_or_else(|| ParseError::malformed("field", fragment, "expected name--value--OP"))?;
    let (raw, op) = tail
        .rsplit_once(DELIMITER)
        .ok_or_else(|| ParseError::malformed("field", fragment, "missing operator segment"))?;
    if name.is_empty() {
        return Err(ParseError::malformed("field", fragment, "missing field name"));
    }
    let operator = Operator::parse(op).ok_or_else(|| ParseError::UnknownOperator {
        fragment: fragment.to_string(),
        operator: op.to_string(),
    })?;
    let value = condition_value("field", fragment, raw, operator)?;
    Ok(Leaf::new(name, value))
}

/// `field:name--value--OP[,name--value--OP...]`
pub fn parse_field(raw: &str) -> Result<Vec<Leaf>> {
    let raw = require_value("field", raw)?;
    raw.split(',')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(parse_field_fragment)
        .collect()
}

/// `category:field--tid-tid`, `None` when the value mentions `all`
pub fn parse_category(raw: &str) -> Result<Option<ConditionGroup>> {
    let raw = require_value("category", raw)?;
    if raw.contains(ALL_TOKEN) {
        return Ok(None);
    }
    let (field, ids) = parse_term_fragment("category", raw)?;
    Ok(Some(
        ConditionGroup::and().with_leaf(field, ConditionValue::In(ids)),
    ))
}

/// `categories:field--tid-tid,field2--tid`
///
/// Entries mentioning `all` are skipped one by one. A field listed twice keeps
/// its first position with the last list. `None` when nothing is left.
pub fn parse_categories(raw: &str) -> Result<Option<ConditionGroup>> {
    let raw = require_value("categories", raw)?;
    let mut leaves: Vec<Leaf> = Vec::new();

    for entry in raw.split(',').map(str::trim) {
        if entry.is_empty() || entry.contains(ALL_TOKEN) {
            continue;
        }
        let (field, ids) = parse_term_fragment("categories", entry)?;
        match leaves.iter_mut().find(|leaf| leaf.field == field) {
            Some(leaf) => leaf.value = ConditionValue::In(ids),
            None => leaves.push(Leaf::new(field, ConditionValue::In(ids))),
        }
    }

    if leaves.is_empty() {
        return Ok(None);
    }
    Ok(Some(ConditionGroup {
        conjunction: Conjunction::And,
        children: leaves.into_iter().map(Condition::Leaf).collect(),
    }))
}

/// `category_ignore:field--tid-tid`
pub fn parse_category_ignore(raw: &str) -> Result<ConditionGroup> {
    let raw = require_value("category_ignore", raw)?;
    let (field, ids) = parse_term_fragment("category_ignore", raw)?;
    Ok(ConditionGroup::and().with_leaf(field, ConditionValue::NotIn(ids)))
}

/// `sort:field-DESC,field2-ASC`, entries mentioning `null` are skipped
pub fn parse_sort(raw: &str) -> Result<Vec<SortDirective>> {
    let mut sorts = Vec::new();

    for entry in raw.split(',').map(str::trim) {
        if entry.is_empty() || entry.contains(NULL_TOKEN) {
            continue;
        }
        let (field, direction) = entry
            .rsplit_once('-')
            .ok_or_else(|| ParseError::malformed("sort", entry, "expected field-DIRECTION"))?;
        if field.is_empty() {
            return Err(ParseError::malformed("sort", entry, "missing field name"));
        }
        let direction =
            SortDirection::parse(direction).ok_or_else(|| ParseError::InvalidDirection {
                fragment: entry.to_string(),
            })?;
        sorts.push(SortDirective::new(field, direction));
    }

    Ok(sorts)
}

/// `range:start-length`
pub fn parse_range(raw: &str) -> Result<RangeSpec> {
    let raw = require_value("range", raw)?;
    let (_, (start, length)) = all_consuming(number_pair)
        .parse(raw)
        .map_err(|_| ParseError::malformed("range", raw, "expected start-length"))?;
    if length == 0 {
        return Err(ParseError::malformed(
            "range",
            raw,
            "length must be greater than zero",
        ));
    }
    if start.checked_add(length).is_none() {
        return Err(ParseError::InvalidNumber {
            key: "range",
            value: raw.to_string(),
        });
    }
    Ok(RangeSpec { start, length })
}

/// Mode suffix of a `paged` fragment
pub fn parse_pager_mode(raw: &str) -> Result<PagerMode> {
    let invalid = || ParseError::InvalidPagerMode {
        mode: raw.to_string(),
    };
    let (_, mode) = all_consuming(pager_mode)
        .parse(raw.trim())
        .map_err(|_| invalid())?;
    match mode {
        PagerMode::Restricted(size) if size == 0 || size % 2 == 0 => Err(invalid()),
        mode => Ok(mode),
    }
}

/// `paged:page-perPage` or `paged:page-perPage--mode`
pub fn parse_pager(raw: &str) -> Result<PagerSpec> {
    let raw = require_value("paged", raw)?;
    let (numbers, mode) = match raw.split_once(DELIMITER) {
        Some((numbers, mode)) => (numbers, Some(mode)),
        None => (raw, None),
    };

    let (_, (page, per_page)) = all_consuming(number_pair)
        .parse(numbers)
        .map_err(|_| ParseError::malformed("paged", raw, "expected page-perPage"))?;
    if page == 0 || per_page == 0 {
        return Err(ParseError::malformed(
            "paged",
            raw,
            "page and per-page must be at least 1",
        ));
    }
    if page.checked_mul(per_page).is_none() {
        return Err(ParseError::InvalidNumber {
            key: "paged",
            value: numbers.to_string(),
        });
    }

    let mode = match mode {
        Some(mode) => parse_pager_mode(mode)?,
        None => PagerMode::Default,
    };
    Ok(PagerSpec {
        page,
        per_page,
        mode,
    })
}

/// `address:field--column--value`, always a `CONTAINS` on `field.column`
pub fn parse_address(raw: &str) -> Result<Leaf> {
    let raw = require_value("address", raw)?;
    let mut parts = raw.splitn(3, DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(column), Some(value)) if !field.is_empty() && !column.is_empty() => {
            Ok(Leaf::new(
                format!("{field}.{column}"),
                ConditionValue::Compare(Scalar::Text(value.to_string()), Operator::Contains),
            ))
        }
        _ => Err(ParseError::malformed(
            "address",
            raw,
            "expected field--column--value",
        )),
    }
}

/// `nids:1-2-3`
pub fn parse_id_list(raw: &str) -> Result<Vec<Scalar>> {
    let raw = require_value("nids", raw)?;
    let (_, ids) = all_consuming(terms)
        .parse(raw)
        .map_err(|_| ParseError::malformed("nids", raw, "expected id-id-id"))?;
    Ok(ids.into_iter().map(Scalar::parse).collect())
}

/// Single scalar value for keys such as `sticky` or `nid`
pub fn parse_scalar(key: &'static str, raw: &str) -> Result<Scalar> {
    require_value(key, raw).map(Scalar::parse)
}

/// `content_type:article` or `content_type:article,page`
pub fn parse_bundles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|bundle| !bundle.is_empty())
        .map(str::to_string)
        .collect()
}

/// `random:1`
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true")
}
