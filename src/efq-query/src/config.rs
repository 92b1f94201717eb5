//! Defaults and policies applied while building a query descriptor

use chrono::FixedOffset;
use efq_parser::{DateFormats, RangeSpec, SortDirective};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builder::BuildError;

/// What to do with a `date`/`byMonth` fragment that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidDatePolicy {
    /// Reject the request with an invalid-date response
    #[default]
    Reject,
    /// Substitute a window from today to `fallback_months` months later
    Fallback,
}

/// Query building configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Entity kind when no `entity_type` is given
    pub default_entity_kind: String,
    /// Bundle when no `content_type` is given
    pub default_bundle: Option<String>,
    /// Field holding the publication status
    pub status_field: String,
    /// Status every query is restricted to, `None` to disable
    pub default_status: Option<i64>,
    /// Field targeted by `nid` and `nids`
    pub id_field: String,
    /// Window used when neither `range` nor `paged` is given
    pub default_range: RangeSpec,
    /// Sort used when no `sort` is given
    pub default_sort: Vec<SortDirective>,
    /// View mode used when none is given
    pub default_view_mode: String,
    /// strftime format of stored dates and of `date` bounds
    pub storage_date_format: String,
    /// strftime format of the `byMonth` date
    pub month_date_format: String,
    /// UTC offset of the storage timezone, e.g. `+01:00`
    pub storage_timezone: String,
    /// Handling of invalid dates
    pub invalid_date_policy: InvalidDatePolicy,
    /// Length of the fallback window in months
    pub fallback_months: u32,
    /// Bundle field per entity kind, overriding the built-in mapping
    pub bundle_keys: IndexMap<String, String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_entity_kind: "node".to_string(),
            default_bundle: Some("page".to_string()),
            status_field: "status".to_string(),
            default_status: Some(1),
            id_field: "nid".to_string(),
            default_range: RangeSpec {
                start: 0,
                length: 1000,
            },
            default_sort: Vec::new(),
            default_view_mode: "teaser".to_string(),
            storage_date_format: efq_parser::date::DEFAULT_STORAGE_FORMAT.to_string(),
            month_date_format: efq_parser::date::DEFAULT_MONTH_FORMAT.to_string(),
            storage_timezone: "+00:00".to_string(),
            invalid_date_policy: InvalidDatePolicy::Reject,
            fallback_months: 2,
            bundle_keys: IndexMap::new(),
        }
    }
}

/// Bundle field used by an entity kind when no override is configured
pub fn default_bundle_key(entity_kind: &str) -> &'static str {
    match entity_kind {
        "taxonomy_term" => "vid",
        "media" => "bundle",
        _ => "type",
    }
}

impl QueryConfig {
    /// Field the bundle condition is applied to for `entity_kind`
    pub fn bundle_key(&self, entity_kind: &str) -> String {
        self.bundle_keys
            .get(entity_kind)
            .cloned()
            .unwrap_or_else(|| default_bundle_key(entity_kind).to_string())
    }

    /// Validated date formats
    pub fn date_formats(&self) -> Result<DateFormats, BuildError> {
        DateFormats::new(&self.storage_date_format, &self.month_date_format)
            .map_err(|e| BuildError::Config(e.to_string()))
    }

    /// Parsed storage timezone
    pub fn timezone(&self) -> Result<FixedOffset, BuildError> {
        self.storage_timezone.parse::<FixedOffset>().map_err(|_| {
            BuildError::Config(format!(
                "Invalid storage timezone '{}', expected an offset like +01:00",
                self.storage_timezone
            ))
        })
    }
}
