//! Folds a flat parameter map into a [`QueryDescriptor`]
//!
//! Each recognized key is handled by one entry of `KEY_RULES`. Rules only
//! touch the per-call draft, so a builder can be shared and reused.

use chrono::{FixedOffset, NaiveDate, Utc};
use efq_parser::{
    date_field, fallback_window, parse_address, parse_bundles, parse_by_month, parse_categories,
    parse_category, parse_category_ignore, parse_date, parse_field, parse_flag, parse_id_list,
    parse_pager, parse_range, parse_scalar, parse_sort, ConditionGroup, ConditionValue,
    DateFormats, PagerSpec, ParseError, RangeSpec, Scalar,
};
use efq_shared::utils::is_blank;
use efq_shared::Params;
use log::{debug, warn};
use serde::Serialize;

use crate::config::{InvalidDatePolicy, QueryConfig};
use crate::descriptor::{Bundle, QueryDescriptor};

/// Errors raised while building a descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// A fragment could not be parsed
    #[error(transparent)]
    Parse(ParseError),

    /// A date-family fragment failed validation and the policy rejects it
    #[error("Invalid date in '{key}' fragment '{value}'")]
    InvalidDate {
        /// `date` or `byMonth`
        key: String,
        /// The offending fragment
        value: String,
    },

    /// The query configuration itself is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<ParseError> for BuildError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidDate { key, value } => BuildError::InvalidDate {
                key: key.to_string(),
                value,
            },
            other => BuildError::Parse(other),
        }
    }
}

/// Output of a build: the descriptor plus the presentation settings that
/// travel with it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRequest {
    /// Query to run
    pub descriptor: QueryDescriptor,
    /// View mode to render the records with
    pub view_mode: String,
    /// Pager, when the request is paged
    pub pager: Option<PagerSpec>,
}

/// Request being assembled
struct Draft {
    descriptor: QueryDescriptor,
    view_mode: String,
    pager: Option<PagerSpec>,
    range: Option<RangeSpec>,
    category_ignore: Option<ConditionGroup>,
}

type ApplyFn = fn(&DescriptorBuilder, &mut Draft, &str) -> Result<(), BuildError>;

/// How one DSL key is parsed and merged into the draft
struct KeyRule {
    key: &'static str,
    apply: ApplyFn,
}

static KEY_RULES: &[KeyRule] = &[
    KeyRule {
        key: "entity_type",
        apply: |_, draft, raw| {
            draft.descriptor.entity_kind = raw.trim().to_string();
            Ok(())
        },
    },
    KeyRule {
        key: "content_type",
        apply: |_, draft, raw| {
            draft.descriptor.bundle = Bundle::from_list(parse_bundles(raw));
            Ok(())
        },
    },
    KeyRule {
        key: "view_mode",
        apply: |_, draft, raw| {
            draft.view_mode = raw.trim().to_string();
            Ok(())
        },
    },
    KeyRule {
        key: "sticky",
        apply: |_, draft, raw| {
            let value = parse_scalar("sticky", raw)?;
            draft
                .descriptor
                .conditions
                .insert("sticky".to_string(), ConditionValue::Equals(value));
            Ok(())
        },
    },
    KeyRule {
        key: "nid",
        apply: |builder, draft, raw| {
            let value = parse_scalar("nid", raw)?;
            draft
                .descriptor
                .conditions
                .insert(builder.config.id_field.clone(), ConditionValue::Equals(value));
            Ok(())
        },
    },
    KeyRule {
        key: "nids",
        apply: |builder, draft, raw| {
            let ids = parse_id_list(raw)?;
            draft
                .descriptor
                .conditions
                .insert(builder.config.id_field.clone(), ConditionValue::In(ids));
            Ok(())
        },
    },
    KeyRule {
        key: "sort",
        apply: |_, draft, raw| {
            draft.descriptor.sort = parse_sort(raw)?;
            Ok(())
        },
    },
    KeyRule {
        key: "range",
        apply: |_, draft, raw| {
            draft.range = Some(parse_range(raw)?);
            Ok(())
        },
    },
    KeyRule {
        key: "paged",
        apply: |_, draft, raw| {
            draft.pager = Some(parse_pager(raw)?);
            Ok(())
        },
    },
    KeyRule {
        key: "field",
        apply: |_, draft, raw| {
            for leaf in parse_field(raw)? {
                draft.descriptor.conditions.insert(leaf.field, leaf.value);
            }
            Ok(())
        },
    },
    KeyRule {
        key: "address",
        apply: |_, draft, raw| {
            let leaf = parse_address(raw)?;
            draft.descriptor.conditions.insert(leaf.field, leaf.value);
            Ok(())
        },
    },
    KeyRule {
        key: "category",
        apply: |_, draft, raw| {
            if let Some(group) = parse_category(raw)? {
                draft.descriptor.group = Some(group);
            }
            Ok(())
        },
    },
    KeyRule {
        key: "categories",
        apply: |_, draft, raw| {
            if let Some(group) = parse_categories(raw)? {
                draft.descriptor.group = Some(group);
            }
            Ok(())
        },
    },
    KeyRule {
        key: "category_ignore",
        apply: |_, draft, raw| {
            draft.category_ignore = Some(parse_category_ignore(raw)?);
            Ok(())
        },
    },
    KeyRule {
        key: "date",
        apply: |builder, draft, raw| {
            let group = builder.date_group("date", raw, parse_date)?;
            draft.descriptor.group2 = Some(group);
            Ok(())
        },
    },
    KeyRule {
        key: "byMonth",
        apply: |builder, draft, raw| {
            let group = builder.date_group("byMonth", raw, parse_by_month)?;
            draft.descriptor.group2 = Some(group);
            Ok(())
        },
    },
    KeyRule {
        key: "random",
        apply: |_, draft, raw| {
            draft.descriptor.random = parse_flag(raw);
            Ok(())
        },
    },
];

fn find_rule(key: &str) -> Option<&'static KeyRule> {
    KEY_RULES.iter().find(|rule| rule.key == key)
}

/// Whether `key` is part of the DSL
pub fn is_known_key(key: &str) -> bool {
    find_rule(key).is_some()
}

/// Builds descriptors from parameter maps using a fixed configuration
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    config: QueryConfig,
    formats: DateFormats,
    timezone: FixedOffset,
    today: Option<NaiveDate>,
}

impl DescriptorBuilder {
    /// Create a builder, validating the date formats and timezone up front
    pub fn new(config: QueryConfig) -> Result<Self, BuildError> {
        let formats = config.date_formats()?;
        let timezone = config.timezone()?;
        Ok(Self {
            config,
            formats,
            timezone,
            today: None,
        })
    }

    /// Pin the date used by the invalid-date fallback
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The configuration this builder applies
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| Utc::now().with_timezone(&self.timezone).date_naive())
    }

    fn date_group(
        &self,
        key: &'static str,
        raw: &str,
        parse: fn(&str, &DateFormats) -> efq_parser::Result<ConditionGroup>,
    ) -> Result<ConditionGroup, BuildError> {
        match parse(raw, &self.formats) {
            Ok(group) => Ok(group),
            Err(err)
                if err.is_invalid_date()
                    && self.config.invalid_date_policy == InvalidDatePolicy::Fallback =>
            {
                let field = date_field(raw);
                if field.is_empty() {
                    return Err(err.into());
                }
                warn!(
                    "Invalid date in '{}' fragment '{}', using the next {} months instead",
                    key, raw, self.config.fallback_months
                );
                Ok(fallback_window(
                    field,
                    self.today(),
                    self.config.fallback_months,
                    &self.formats,
                )?)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn draft(&self) -> Draft {
        let config = &self.config;
        let mut descriptor = QueryDescriptor::new(&config.default_entity_kind, "");
        descriptor.bundle = config
            .default_bundle
            .clone()
            .map_or(Bundle::Any, Bundle::One);
        if let Some(status) = config.default_status {
            descriptor.conditions.insert(
                config.status_field.clone(),
                ConditionValue::Equals(Scalar::Int(status)),
            );
        }
        descriptor.range = config.default_range;
        descriptor.sort = config.default_sort.clone();

        Draft {
            descriptor,
            view_mode: config.default_view_mode.clone(),
            pager: None,
            range: None,
            category_ignore: None,
        }
    }

    /// Build the request described by `params`
    pub fn build(&self, params: &Params) -> Result<ParsedRequest, BuildError> {
        let mut draft = self.draft();

        for (key, raw) in params {
            let Some(rule) = find_rule(key) else {
                debug!("Ignoring unknown query key '{}'", key);
                continue;
            };
            if is_blank(raw) {
                debug!("Ignoring empty value for '{}'", key);
                continue;
            }
            (rule.apply)(self, &mut draft, raw)?;
        }

        let Draft {
            mut descriptor,
            view_mode,
            pager,
            range,
            category_ignore,
        } = draft;

        // A primary category group disables the ignore list.
        if descriptor.group.is_none() {
            descriptor.group = category_ignore;
        }
        // Paged listings keep a stable order across pages.
        if pager.is_some() {
            descriptor.random = false;
        }
        descriptor.range = match (pager, range) {
            (Some(pager), _) => pager.range(),
            (None, Some(range)) => range,
            (None, None) => descriptor.range,
        };
        descriptor.bundle_field = self.config.bundle_key(&descriptor.entity_kind);

        Ok(ParsedRequest {
            descriptor,
            view_mode,
            pager,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efq_parser::{Condition, Conjunction, Operator, PagerMode, SortDirection, SortDirective};
    use efq_shared::params;
    use pretty_assertions::assert_eq;

    fn builder() -> DescriptorBuilder {
        DescriptorBuilder::new(QueryConfig::default()).unwrap()
    }

    fn fallback_builder(today: NaiveDate) -> DescriptorBuilder {
        let config = QueryConfig {
            invalid_date_policy: InvalidDatePolicy::Fallback,
            ..QueryConfig::default()
        };
        DescriptorBuilder::new(config).unwrap().with_today(today)
    }

    fn build(pairs: &[(&str, &str)]) -> Result<ParsedRequest, BuildError> {
        builder().build(&params(pairs.iter().copied()))
    }

    #[test]
    fn test_defaults_apply_to_empty_request() {
        let request = build(&[]).unwrap();
        let descriptor = request.descriptor;
        assert_eq!(descriptor.entity_kind, "node");
        assert_eq!(descriptor.bundle_field, "type");
        assert_eq!(descriptor.bundle, Bundle::One("page".into()));
        assert_eq!(
            descriptor.conditions.get("status"),
            Some(&ConditionValue::Equals(Scalar::Int(1)))
        );
        assert_eq!(
            descriptor.range,
            RangeSpec {
                start: 0,
                length: 1000
            }
        );
        assert!(descriptor.sort.is_empty());
        assert!(!descriptor.random);
        assert_eq!(request.view_mode, "teaser");
        assert_eq!(request.pager, None);
    }

    #[test]
    fn test_scalar_keys() {
        let request = build(&[
            ("entity_type", "taxonomy_term"),
            ("content_type", "tags,topics"),
            ("view_mode", "full"),
            ("sticky", "1"),
            ("nids", "4-5"),
            ("random", "1"),
        ])
        .unwrap();
        let descriptor = request.descriptor;
        assert_eq!(descriptor.entity_kind, "taxonomy_term");
        assert_eq!(descriptor.bundle_field, "vid");
        assert_eq!(
            descriptor.bundle,
            Bundle::Many(vec!["tags".into(), "topics".into()])
        );
        assert_eq!(request.view_mode, "full");
        assert_eq!(
            descriptor.conditions.get("sticky"),
            Some(&ConditionValue::Equals(Scalar::Int(1)))
        );
        assert_eq!(
            descriptor.conditions.get("nid"),
            Some(&ConditionValue::In(vec![Scalar::Int(4), Scalar::Int(5)]))
        );
        assert!(descriptor.random);
    }

    #[test]
    fn test_field_conditions_merge_last_write_wins() {
        let descriptor = build(&[
            ("field", "field_price--10--<=,field_year--1990-2000--BETWEEN"),
            ("address", "field_address--locality--Cork"),
            ("nid", "7"),
        ])
        .unwrap()
        .descriptor;
        assert_eq!(
            descriptor.conditions.get("field_price"),
            Some(&ConditionValue::Compare(Scalar::Int(10), Operator::Le))
        );
        assert_eq!(
            descriptor.conditions.get("field_year"),
            Some(&ConditionValue::Between(Scalar::Int(1990), Scalar::Int(2000)))
        );
        assert_eq!(
            descriptor.conditions.get("field_address.locality"),
            Some(&ConditionValue::Compare(
                Scalar::Text("Cork".into()),
                Operator::Contains
            ))
        );
        assert_eq!(
            descriptor.conditions.get("nid"),
            Some(&ConditionValue::Equals(Scalar::Int(7)))
        );

        let descriptor = build(&[("field", "status--0--=")]).unwrap().descriptor;
        assert_eq!(
            descriptor.conditions.get("status"),
            Some(&ConditionValue::Equals(Scalar::Int(0)))
        );
        assert_eq!(descriptor.conditions.len(), 1);
    }

    #[test]
    fn test_primary_category_wins_over_ignore_in_any_order() {
        for pairs in [
            [("category", "field_tags--10"), ("category_ignore", "field_tags--5")],
            [("category_ignore", "field_tags--5"), ("category", "field_tags--10")],
        ] {
            let group = build(&pairs).unwrap().descriptor.group.unwrap();
            assert_eq!(
                group.leaves()[0].value,
                ConditionValue::In(vec![Scalar::Int(10)])
            );
        }
    }

    #[test]
    fn test_category_ignore_applies_alone_or_with_all() {
        for pairs in [
            vec![("category_ignore", "field_tags--5")],
            vec![("category", "field_tags--all"), ("category_ignore", "field_tags--5")],
        ] {
            let group = build(&pairs).unwrap().descriptor.group.unwrap();
            assert_eq!(
                group.leaves()[0].value,
                ConditionValue::NotIn(vec![Scalar::Int(5)])
            );
        }
    }

    #[test]
    fn test_category_all_yields_no_group() {
        let descriptor = build(&[("category", "field_tags--all")]).unwrap().descriptor;
        assert_eq!(descriptor.group, None);
    }

    #[test]
    fn test_later_category_all_keeps_earlier_group() {
        for pairs in [
            [("category", "field_tags--10"), ("categories", "field_topic--all")],
            [("categories", "field_tags--10"), ("category", "field_topic--all")],
        ] {
            let group = build(&pairs).unwrap().descriptor.group.unwrap();
            let leaves = group.leaves();
            assert_eq!(leaves.len(), 1);
            assert_eq!(leaves[0].field, "field_tags");
            assert_eq!(leaves[0].value, ConditionValue::In(vec![Scalar::Int(10)]));
        }
    }

    #[test]
    fn test_oversized_page_numbers_are_rejected() {
        let err = build(&[("paged", "4294967296-4294967296")]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse(ParseError::InvalidNumber { key: "paged", .. })
        ));

        let err = build(&[("range", "18446744073709551615-1")]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse(ParseError::InvalidNumber { key: "range", .. })
        ));

        let request = build(&[("paged", "18446744073709551615-1")]).unwrap();
        assert_eq!(
            request.descriptor.range,
            RangeSpec {
                start: u64::MAX - 1,
                length: 1
            }
        );
    }

    #[test]
    fn test_paged_takes_precedence_over_range() {
        for pairs in [
            [("range", "50-5"), ("paged", "3-10--simple")],
            [("paged", "3-10--simple"), ("range", "50-5")],
        ] {
            let request = build(&pairs).unwrap();
            assert_eq!(
                request.descriptor.range,
                RangeSpec {
                    start: 20,
                    length: 10
                }
            );
            assert_eq!(request.pager.unwrap().mode, PagerMode::Simple);
        }

        let request = build(&[("range", "50-5")]).unwrap();
        assert_eq!(
            request.descriptor.range,
            RangeSpec {
                start: 50,
                length: 5
            }
        );
    }

    #[test]
    fn test_paged_requests_are_never_random() {
        let request = build(&[("random", "1"), ("paged", "1-10")]).unwrap();
        assert!(!request.descriptor.random);
        assert!(build(&[("random", "1")]).unwrap().descriptor.random);
    }

    #[test]
    fn test_sort_replaces_default_and_keeps_order() {
        let config = QueryConfig {
            default_sort: vec![SortDirective::new("created", SortDirection::Desc)],
            ..QueryConfig::default()
        };
        let builder = DescriptorBuilder::new(config).unwrap();

        let request = builder.build(&params([("view_mode", "full")])).unwrap();
        assert_eq!(request.descriptor.sort[0].field, "created");

        let request = builder
            .build(&params([("sort", "field_featured-DESC,field_date-ASC")]))
            .unwrap();
        assert_eq!(
            request.descriptor.sort,
            vec![
                SortDirective::new("field_featured", SortDirection::Desc),
                SortDirective::new("field_date", SortDirection::Asc),
            ]
        );
    }

    #[test]
    fn test_unknown_and_blank_keys_are_ignored() {
        let plain = build(&[]).unwrap();
        let noisy = build(&[("colour", "blue"), ("sort", "  "), ("view_mode", "")]).unwrap();
        assert_eq!(plain, noisy);
        assert!(!is_known_key("colour"));
        assert!(is_known_key("byMonth"));
    }

    #[test]
    fn test_malformed_fragment_is_a_parse_error() {
        let err = build(&[("field", "field_price--10")]).unwrap_err();
        assert!(matches!(err, BuildError::Parse(ParseError::Malformed { .. })));

        let err = build(&[("paged", "1-10--restricted-4")]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse(ParseError::InvalidPagerMode { .. })
        ));
    }

    #[test]
    fn test_date_populates_group2() {
        let descriptor = build(&[("date", "field_date--2024-01-01,2024-02-01")])
            .unwrap()
            .descriptor;
        let group = descriptor.group2.unwrap();
        assert_eq!(group.conjunction, Conjunction::Or);
        assert_eq!(group.leaves().len(), 6);
        assert_eq!(descriptor.group, None);
    }

    #[test]
    fn test_invalid_date_rejected_by_default() {
        let err = build(&[("date", "field_date--2024-13-40,2024-01-31")]).unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidDate {
                key: "date".into(),
                value: "field_date--2024-13-40,2024-01-31".into()
            }
        );

        let err = build(&[("byMonth", "field_date--31-02-2024")]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidDate { .. }));
    }

    #[test]
    fn test_invalid_date_fallback_uses_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let builder = fallback_builder(today);
        let descriptor = builder
            .build(&params([("date", "field_event--2024/05/01,2024/05/31")]))
            .unwrap()
            .descriptor;
        let group = descriptor.group2.unwrap();
        let Condition::Leaf(between) = &group.children[2] else {
            panic!("expected BETWEEN leaf");
        };
        assert_eq!(between.field, "field_event.0.value");
        assert_eq!(
            between.value,
            ConditionValue::Between(
                Scalar::Text("2024-05-10".into()),
                Scalar::Text("2024-07-10".into())
            )
        );
    }

    #[test]
    fn test_fallback_still_rejects_missing_field() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let err = fallback_builder(today)
            .build(&params([("date", "--2024-01-01,2024-01-31")]))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidDate { .. }));
    }

    #[test]
    fn test_builder_is_reusable() {
        let builder = builder();
        let first = builder
            .build(&params([("category", "field_tags--1")]))
            .unwrap();
        let second = builder.build(&params([("nid", "3")])).unwrap();
        assert!(first.descriptor.group.is_some());
        assert_eq!(second.descriptor.group, None);
        assert!(!first.descriptor.conditions.contains_key("nid"));
    }
}
