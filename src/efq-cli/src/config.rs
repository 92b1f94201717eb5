//! Configuration management for efq
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! file (`efq.toml` or `.efq.toml` in the current directory, the user config
//! directory or the home directory), `EFQ_*` environment variables and
//! command-line flags.

use efq_core::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use efq_query::{InvalidDatePolicy, QueryConfig};
use serde::{Deserialize, Serialize};

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

const CONFIG_NAMES: [&str; 2] = ["efq.toml", ".efq.toml"];

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file already exists: {} (use --force to overwrite)", .0.display())]
    Exists(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure for efq runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Query builder defaults
    pub query: QueryConfig,
    /// Records source
    pub data: DataConfig,
    /// Response cache
    pub cache: CacheConfig,
    /// Output formatting
    pub output: OutputConfig,
    /// Logging
    pub debug: DebugConfig,
}

/// Records source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Records file used when `--data` is not given
    pub records: Option<PathBuf>,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether responses are cached within one run
    pub enabled: bool,
    /// Maximum number of cached responses
    pub capacity: usize,
    /// Lifetime of a cached response in seconds
    pub ttl_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON
    pub pretty: bool,
    /// Include the placeholder message next to non-rendered responses
    pub include_message: bool,
}

/// Debug and diagnostic configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// 0 = warn, 1 = info, 2 = debug, 3+ = trace
    pub verbosity: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            include_message: true,
        }
    }
}

fn parse_bool(val: &str) -> bool {
    val != "0" && !val.eq_ignore_ascii_case("false")
}

impl Config {
    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load configuration from `explicit` or the first file found in the
    /// standard locations, then apply environment variables
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(None),
        };
        let mut config = match path {
            Some(path) => {
                log::debug!("Loading configuration from {}", path.display());
                Self::load_from_file(&path)?
            }
            None => Self::default(),
        };
        config.merge_env();
        Ok(config)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file(current_dir: Option<&Path>) -> Option<PathBuf> {
        let current_dir = match current_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let mut dirs_to_check = vec![current_dir];
        if let Some(config_dir) = dirs::config_dir() {
            dirs_to_check.push(config_dir.join("efq"));
        }
        if let Some(home) = dirs::home_dir() {
            dirs_to_check.push(home);
        }

        dirs_to_check
            .iter()
            .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists())
    }

    /// Apply `EFQ_*` environment variables
    pub fn merge_env(&mut self) {
        self.merge_env_with_reader(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides read through `env_reader`; values that do
    /// not parse reset the setting to its default
    pub fn merge_env_with_reader<F>(&mut self, env_reader: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let query_defaults = QueryConfig::default();

        if let Some(val) = env_reader("EFQ_ENTITY_KIND") {
            self.query.default_entity_kind = val;
        }

        // Empty means "any bundle"
        if let Some(val) = env_reader("EFQ_BUNDLE") {
            self.query.default_bundle = Some(val).filter(|v| !v.trim().is_empty());
        }

        if let Some(val) = env_reader("EFQ_STATUS") {
            self.query.default_status = if val.eq_ignore_ascii_case("none") {
                None
            } else {
                val.parse().ok().or(query_defaults.default_status)
            };
        }

        if let Some(val) = env_reader("EFQ_VIEW_MODE") {
            self.query.default_view_mode = val;
        }

        if let Some(val) = env_reader("EFQ_TIMEZONE") {
            self.query.storage_timezone = val;
        }

        if let Some(val) = env_reader("EFQ_INVALID_DATE_POLICY") {
            self.query.invalid_date_policy = match val.to_lowercase().as_str() {
                "fallback" => InvalidDatePolicy::Fallback,
                _ => InvalidDatePolicy::Reject,
            };
        }

        if let Some(val) = env_reader("EFQ_FALLBACK_MONTHS") {
            self.query.fallback_months = val.parse().unwrap_or(query_defaults.fallback_months);
        }

        if let Some(val) = env_reader("EFQ_DATA") {
            self.data.records = Some(PathBuf::from(val));
        }

        if let Some(val) = env_reader("EFQ_CACHE") {
            self.cache.enabled = parse_bool(&val);
        }

        if let Some(val) = env_reader("EFQ_CACHE_CAPACITY") {
            self.cache.capacity = val.parse().unwrap_or(CacheConfig::default().capacity);
        }

        if let Some(val) = env_reader("EFQ_CACHE_TTL") {
            self.cache.ttl_secs = val.parse().unwrap_or(CacheConfig::default().ttl_secs);
        }

        if let Some(val) = env_reader("EFQ_VERBOSITY") {
            self.debug.verbosity = val.parse().unwrap_or_default();
        }
    }

    /// Apply command-line flags
    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.verbose > 0 {
            self.debug.verbosity = cli.verbose;
        }
        if cli.compact_output {
            self.output.pretty = false;
        }
    }

    /// Check settings that would otherwise fail on the first request
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.query
            .date_formats()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.query
            .timezone()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.query.default_range.length == 0 {
            return Err(ConfigError::Invalid(
                "default range length must be greater than 0".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Create a default config file template
pub fn create_default_config_file(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::Exists(path.to_path_buf()));
    }
    Config::default().save(path)
}
