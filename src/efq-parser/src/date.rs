//! Date-family fragments (`date`, `byMonth`)
//!
//! Records store a start/end pair (`field.0.value`, `field.0.end_value`). A
//! filter window `[start, end]` matches a record when the record's range
//! overlaps it, which is expressed as one OR-group:
//!
//! ```text
//! OR( AND(value <= start, end_value > start),
//!     AND(value < end,    end_value >= end),
//!     value     BETWEEN (start, end),
//!     end_value BETWEEN (start, end) )
//! ```

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

use crate::ast::{ConditionGroup, ConditionValue, Operator, Scalar};
use crate::error::{ParseError, Result};
use crate::parser::DELIMITER;

/// Storage format used when none is configured (`Y-m-d`)
pub const DEFAULT_STORAGE_FORMAT: &str = "%Y-%m-%d";

/// Format of the `byMonth` date (`d-m-Y`)
pub const DEFAULT_MONTH_FORMAT: &str = "%d-%m-%Y";

/// Validated strftime formats used by the date parsers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormats {
    storage: String,
    month: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            storage: DEFAULT_STORAGE_FORMAT.to_string(),
            month: DEFAULT_MONTH_FORMAT.to_string(),
        }
    }
}

impl DateFormats {
    /// Validate both formats; unknown specifiers are rejected up front so
    /// formatting can never fail later
    pub fn new(storage: impl Into<String>, month: impl Into<String>) -> Result<Self> {
        let storage = storage.into();
        let month = month.into();
        for format in [&storage, &month] {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(ParseError::InvalidDateFormat {
                    format: format.clone(),
                });
            }
        }
        Ok(Self { storage, month })
    }

    /// Format used to validate `date` bounds and to render filter values
    pub fn storage(&self) -> &str {
        &self.storage
    }

    /// Format of the `byMonth` date
    pub fn month(&self) -> &str {
        &self.month
    }

    fn render(&self, moment: NaiveDateTime) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", moment.format(&self.storage)).map_err(|_| {
            ParseError::InvalidDateFormat {
                format: self.storage.clone(),
            }
        })?;
        Ok(out)
    }

    /// First minute of `date`, rendered in the storage format
    fn day_start(&self, date: NaiveDate) -> Result<String> {
        self.render(date.and_hms_opt(0, 1, 0).unwrap_or_default())
    }

    /// Last minute of `date`, rendered in the storage format
    fn day_end(&self, date: NaiveDate) -> Result<String> {
        self.render(date.and_hms_opt(23, 59, 0).unwrap_or_default())
    }
}

/// Field name of a date-family fragment, whether or not the dates are valid
pub fn date_field(raw: &str) -> &str {
    raw.split_once(DELIMITER)
        .map_or(raw, |(field, _)| field)
        .trim()
}

/// Overlap group for `[start, end]` on the start/end pair of `field`
pub fn overlap_group(
    field: &str,
    start: NaiveDate,
    end: NaiveDate,
    formats: &DateFormats,
) -> Result<ConditionGroup> {
    let start = Scalar::Text(formats.day_start(start)?);
    let end = Scalar::Text(formats.day_end(end)?);
    let value = format!("{field}.0.value");
    let end_value = format!("{field}.0.end_value");

    Ok(ConditionGroup::or()
        .with_group(
            ConditionGroup::and()
                .with_leaf(&value, ConditionValue::compare(start.clone(), Operator::Le))
                .with_leaf(&end_value, ConditionValue::compare(start.clone(), Operator::Gt)),
        )
        .with_group(
            ConditionGroup::and()
                .with_leaf(&value, ConditionValue::compare(end.clone(), Operator::Lt))
                .with_leaf(&end_value, ConditionValue::compare(end.clone(), Operator::Ge)),
        )
        .with_leaf(&value, ConditionValue::Between(start.clone(), end.clone()))
        .with_leaf(&end_value, ConditionValue::Between(start, end)))
}

/// `date:field--START,END`, both bounds in the storage format
pub fn parse_date(raw: &str, formats: &DateFormats) -> Result<ConditionGroup> {
    let raw = raw.trim();
    let invalid = || ParseError::invalid_date("date", raw);

    let (field, window) = raw.split_once(DELIMITER).ok_or_else(invalid)?;
    let (start, end) = window.split_once(',').ok_or_else(invalid)?;
    if field.is_empty() {
        return Err(invalid());
    }

    let start = NaiveDate::parse_from_str(start.trim(), formats.storage()).map_err(|_| invalid())?;
    let end = NaiveDate::parse_from_str(end.trim(), formats.storage()).map_err(|_| invalid())?;

    overlap_group(field, start, end, formats)
}

/// Last calendar day of the month containing `date`
pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// `byMonth:field--D-M-Y`, the whole month containing the date
pub fn parse_by_month(raw: &str, formats: &DateFormats) -> Result<ConditionGroup> {
    let raw = raw.trim();
    let invalid = || ParseError::invalid_date("byMonth", raw);

    let (field, date) = raw.split_once(DELIMITER).ok_or_else(invalid)?;
    if field.is_empty() {
        return Err(invalid());
    }
    let date = NaiveDate::parse_from_str(date.trim(), formats.month()).map_err(|_| invalid())?;

    let first = date.with_day(1).ok_or_else(invalid)?;
    let last = last_day_of_month(date).ok_or_else(invalid)?;
    overlap_group(field, first, last, formats)
}

/// Window from `today` to `months` months later, used in place of a date
/// fragment that failed validation
pub fn fallback_window(
    field: &str,
    today: NaiveDate,
    months: u32,
    formats: &DateFormats,
) -> Result<ConditionGroup> {
    let end = today
        .checked_add_months(Months::new(months))
        .ok_or_else(|| ParseError::invalid_date("date", field))?;
    overlap_group(field, today, end, formats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, Conjunction};
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month_handles_leap_years() {
        assert_eq!(last_day_of_month(ymd(2024, 2, 10)), Some(ymd(2024, 2, 29)));
        assert_eq!(last_day_of_month(ymd(2023, 2, 1)), Some(ymd(2023, 2, 28)));
        assert_eq!(last_day_of_month(ymd(1900, 2, 1)), Some(ymd(1900, 2, 28)));
        assert_eq!(last_day_of_month(ymd(2024, 12, 31)), Some(ymd(2024, 12, 31)));
        assert_eq!(last_day_of_month(ymd(2024, 4, 3)), Some(ymd(2024, 4, 30)));
    }

    #[test]
    fn test_date_formats_reject_unknown_specifiers() {
        assert!(DateFormats::new("%Y-%m-%d", "%d-%m-%Y").is_ok());
        assert!(matches!(
            DateFormats::new("%Y-%Q", "%d-%m-%Y"),
            Err(ParseError::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn test_storage_format_with_time_keeps_day_boundaries() {
        let formats = DateFormats::new("%Y-%m-%dT%H:%M:%S", DEFAULT_MONTH_FORMAT).unwrap();
        let group = overlap_group("field_date", ymd(2024, 1, 1), ymd(2024, 1, 31), &formats).unwrap();
        let Condition::Leaf(leaf) = &group.children[2] else {
            panic!("expected BETWEEN leaf");
        };
        assert_eq!(
            leaf.value,
            ConditionValue::Between(
                Scalar::Text("2024-01-01T00:01:00".into()),
                Scalar::Text("2024-01-31T23:59:00".into())
            )
        );
    }

    #[test]
    fn test_by_month_spans_whole_month() {
        let group = parse_by_month("field_event--15-02-2024", &DateFormats::default()).unwrap();
        assert_eq!(group.conjunction, Conjunction::Or);
        let Condition::Leaf(leaf) = &group.children[2] else {
            panic!("expected BETWEEN leaf");
        };
        assert_eq!(leaf.field, "field_event.0.value");
        assert_eq!(
            leaf.value,
            ConditionValue::Between(
                Scalar::Text("2024-02-01".into()),
                Scalar::Text("2024-02-29".into())
            )
        );
    }

    #[test]
    fn test_by_month_rejects_impossible_day() {
        let err = parse_by_month("field_event--30-02-2024", &DateFormats::default()).unwrap_err();
        assert!(err.is_invalid_date());
    }

    #[test]
    fn test_fallback_window_spans_two_months() {
        let group =
            fallback_window("field_date", ymd(2024, 1, 31), 2, &DateFormats::default()).unwrap();
        let Condition::Leaf(leaf) = &group.children[3] else {
            panic!("expected BETWEEN leaf");
        };
        assert_eq!(leaf.field, "field_date.0.end_value");
        assert_eq!(
            leaf.value,
            ConditionValue::Between(
                Scalar::Text("2024-01-31".into()),
                Scalar::Text("2024-03-31".into())
            )
        );
    }

    #[test]
    fn test_date_field_without_delimiter() {
        assert_eq!(date_field("field_date--2024-13-40,x"), "field_date");
        assert_eq!(date_field("field_date"), "field_date");
    }
}
