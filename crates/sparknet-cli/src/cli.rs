//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SparkNet CLI - rent GPU compute on the SparkNet marketplace.
#[derive(Parser, Debug, Clone)]
#[command(name = "sparknet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file.
    #[arg(short, long, env = "SPARKNET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network preset selecting the passphrase (testnet, futurenet, mainnet, local).
    #[arg(short, long, env = "SPARKNET_NETWORK")]
    pub network: Option<String>,

    /// JSON gateway endpoint.
    #[arg(long, env = "SPARKNET_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Marketplace contract id.
    #[arg(long, env = "SPARKNET_CONTRACT_ID")]
    pub contract_id: Option<String>,

    /// Payment token contract id.
    #[arg(long, env = "SPARKNET_TOKEN_ID")]
    pub token_id: Option<String>,

    /// Secret seed (S...) that signs write commands.
    #[arg(long, env = "SPARKNET_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Which side of a rental to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RoleArg {
    /// Rentals paid by the address.
    #[default]
    Consumer,
    /// Rentals served by the address.
    Provider,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize the marketplace contract with its admin and payment token.
    Init {
        /// Admin secret seed.
        #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
        admin_secret: String,
    },

    /// List registered providers.
    Providers,

    /// List rentals for an address.
    Rentals {
        /// Account address (G...).
        address: String,

        /// List rentals where the address is the consumer or the provider.
        #[arg(short, long, value_enum, default_value_t = RoleArg::Consumer)]
        role: RoleArg,
    },

    /// Show one rental.
    Rental {
        /// Rental id.
        id: u64,
    },

    /// Register the signing account as a provider.
    Register {
        /// GPU model, e.g. "RTX 4090".
        gpu_model: String,

        /// Hourly price in whole units, up to 7 decimals (e.g. 2.5).
        price: String,
    },

    /// Rent a provider. Approves the cost on the token, then rents.
    Rent {
        /// Provider address (G...).
        provider: String,

        /// Number of hours.
        #[arg(long, default_value_t = 1)]
        hours: u64,
    },

    /// Mark a rental's job complete and release payment.
    Complete {
        /// Rental id.
        rental_id: u64,
    },

    /// Generate a new keypair.
    Keygen,
}
