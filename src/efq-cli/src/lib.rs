//! efq-cli library
//!
//! Provides Config and Executor for programmatic use.

pub mod cli;
pub mod config;
pub mod executor;
pub mod output;

pub use config::Config;
pub use executor::{Executor, Outcome};
