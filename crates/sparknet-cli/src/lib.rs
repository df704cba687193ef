//! # sparknet-cli
//!
//! SparkNet command-line interface.
//!
//! Provides commands for:
//! - Listing providers and rentals
//! - Registering as a provider, renting, and completing jobs
//! - Initializing a freshly deployed marketplace contract
//! - Generating local keypairs
//!
//! Configuration comes from an optional JSON file, then environment
//! variables and flags. See [`commands::load_config`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, RoleArg};
pub use error::CliError;
pub use output::OutputFormat;
