use std::process;

use anyhow::{Context, Result};
use efq_cli::cli::{parse_args, Commands, ConfigCommands};
use efq_cli::config::{create_default_config_file, Config};
use efq_cli::Executor;
use efq_core::BlockConfig;
use efq_shared::params;

fn main() {
    if std::env::args().any(|arg| arg == "--version" || arg == "-V") {
        print_version();
        return;
    }

    match run() {
        Ok(true) => {}
        // A backend failed; the placeholder has been printed
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn print_version() {
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_date = option_env!("BUILD_DATE").unwrap_or("unknown");
    let rustc_version = option_env!("RUSTC_VERSION").unwrap_or("unknown");

    println!("efq {version}");
    println!("commit: {git_hash}");
    println!("built: {build_date}");
    println!("rustc: {rustc_version}");
}

fn setup_logging(config: &Config) {
    let log_level = match config.debug.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new().filter_level(log_level).init();
}

/// Run the command line; `Ok(false)` when a response reported a failure
fn run() -> Result<bool> {
    let cli = parse_args();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    setup_logging(&config);
    config.validate()?;

    let executor = Executor::new(config);
    let output = executor.output();

    match cli.command {
        Commands::Query {
            params: pairs,
            data,
            batch,
            ids_only,
        } => {
            let store = executor.load_store(&executor.records_path(data)?)?;
            let outcome = match batch {
                Some(path) => executor.batch(&store, &path)?,
                None if ids_only => executor.ids(&store, &params(pairs))?,
                None => executor.query(&store, &params(pairs))?,
            };
            output.write_to_stdout(&outcome.value)?;
            Ok(!outcome.failed)
        }
        Commands::Block {
            content_type,
            view_mode,
            data,
        } => {
            let store = executor.load_store(&executor.records_path(data)?)?;
            let outcome = executor.block(
                &store,
                &BlockConfig {
                    content_type,
                    view_mode,
                },
            )?;
            output.write_to_stdout(&outcome.value)?;
            Ok(!outcome.failed)
        }
        Commands::Parse { params: pairs } => {
            output.write_to_stdout(&executor.parse(&params(pairs))?)?;
            Ok(true)
        }
        Commands::Pager { spec, total } => {
            output.write_to_stdout(&executor.pager(&spec, total)?)?;
            Ok(true)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", executor.config().to_toml()?);
                Ok(true)
            }
            ConfigCommands::Init { path, force } => {
                create_default_config_file(&path, force)
                    .with_context(|| format!("Failed to initialise {}", path.display()))?;
                println!("Created configuration file: {}", path.display());
                Ok(true)
            }
        },
    }
}
