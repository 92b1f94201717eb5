//! Command-line interface for efq
//!
//! Argument parsing with clap. Request parameters are given as `key:value`
//! pairs, the same keys a client would post.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// efq - run entity field queries against JSON records
///
/// efq parses the compact query DSL used by listing clients (field filters,
/// categories, date windows, sorting, paging) and runs it against a JSON
/// array of records.
#[derive(Parser, Debug)]
#[command(name = "efq")]
#[command(author, version, about)]
#[command(after_help = "EXAMPLES:\n  \
    # Paged listing of articles, newest first\n  \
    efq query content_type:article sort:created-DESC paged:1-10 --data nodes.json\n\n  \
    # Events overlapping January\n  \
    efq query content_type:event date:field_date--2024-01-01,2024-01-31 --data nodes.json\n\n  \
    # Show the descriptor a request builds\n  \
    efq parse field:field_price--10--'>='\n\n  \
    # Pager links for 95 records\n  \
    efq pager 5-10--restricted-5 95")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (searched in standard locations if not given)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use compact output (no pretty-printing)
    #[arg(short, long, global = true)]
    pub compact_output: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a request against a JSON records file and print the response
    #[command(after_help = "EXAMPLES:\n  \
        efq query content_type:article paged:2-10 --data nodes.json\n  \
        efq query nids:1,2,3 --ids-only --data nodes.json\n  \
        efq query --batch requests.json --data nodes.json")]
    Query {
        /// Request parameters as key:value
        #[arg(value_name = "KEY:VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// JSON array of records
        #[arg(short, long, value_name = "FILE")]
        data: Option<PathBuf>,

        /// JSON array of parameter objects, answered in order
        #[arg(long, value_name = "FILE", conflicts_with = "params")]
        batch: Option<PathBuf>,

        /// Print matching ids instead of rendered records
        #[arg(long)]
        ids_only: bool,
    },

    /// Render a block placement against a JSON records file
    Block {
        /// Bundle(s) listed by the block, comma-separated
        #[arg(long)]
        content_type: Option<String>,

        /// View mode of the rendered records
        #[arg(long)]
        view_mode: Option<String>,

        /// JSON array of records
        #[arg(short, long, value_name = "FILE")]
        data: Option<PathBuf>,
    },

    /// Print the descriptor, view mode and pager a request builds
    Parse {
        /// Request parameters as key:value
        #[arg(value_name = "KEY:VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Print pager state and links for a pager spec and a record total
    Pager {
        /// Pager spec, e.g. 3-10 or 5-10--restricted-5
        spec: String,

        /// Total number of matching records
        total: u64,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init {
        /// Path to create config file
        #[arg(default_value = "efq.toml")]
        path: PathBuf,

        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },
}

/// Split `key:value` at the first colon
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY:VALUE, got '{raw}'")),
    }
}

/// Parse command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Parse command-line arguments from a vector (for testing)
pub fn parse_args_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_parsing() {
        let args = vec![
            "efq",
            "query",
            "content_type:article",
            "date:field_date--2024-01-01T00:00,2024-01-31T23:59",
            "--data",
            "nodes.json",
            "-vv",
        ];
        let cli = parse_args_from(args).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Query { params, data, .. } => {
                assert_eq!(
                    params,
                    vec![
                        ("content_type".to_string(), "article".to_string()),
                        (
                            "date".to_string(),
                            "field_date--2024-01-01T00:00,2024-01-31T23:59".to_string()
                        ),
                    ]
                );
                assert_eq!(data, Some(PathBuf::from("nodes.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_param_without_colon_is_rejected() {
        assert!(parse_param("content_type").is_err());
        assert!(parse_param(":article").is_err());
        assert!(parse_args_from(vec!["efq", "parse", "sort"]).is_err());
    }

    #[test]
    fn test_pager_and_config_commands() {
        let cli = parse_args_from(vec!["efq", "pager", "2-10", "95", "-c"]).unwrap();
        assert!(cli.compact_output);
        assert!(matches!(cli.command, Commands::Pager { total: 95, .. }));

        let cli = parse_args_from(vec!["efq", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config {
                command: ConfigCommands::Init { path, force },
            } => {
                assert_eq!(path, PathBuf::from("efq.toml"));
                assert!(force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_batch_conflicts_with_params() {
        let args = vec!["efq", "query", "nid:1", "--batch", "requests.json"];
        assert!(parse_args_from(args).is_err());
    }
}
