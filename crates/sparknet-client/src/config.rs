//! Client configuration.
//!
//! Selects the ledger network, the RPC gateway, the marketplace and token
//! contracts, and the timing of writes. Everything network-specific lives
//! here so that switching between test and production networks is a
//! configuration change only.
//!
//! There are no built-in endpoints or contract ids. The gateway speaks the
//! JSON envelope format of [`crate::rpc::HttpRpc`], which public Soroban RPC
//! nodes do not, so both must be configured for the deployment at hand.

use crate::address::Address;
use crate::error::{Result, SparkError};
use crate::poll::PollConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Ledger network to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// Public network (production).
    Mainnet,
    /// Test network.
    #[default]
    Testnet,
    /// Futurenet (preview features).
    Futurenet,
    /// Local quickstart node.
    Local,
}

impl Network {
    /// Passphrase that identifies this network in transaction hashes.
    #[must_use]
    pub const fn passphrase(&self) -> &'static str {
        match self {
            Self::Mainnet => "Public Global Stellar Network ; September 2015",
            Self::Testnet => "Test SDF Network ; September 2015",
            Self::Futurenet => "Test SDF Future Network ; October 2022",
            Self::Local => "Standalone Network ; February 2017",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Futurenet => write!(f, "futurenet"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for Network {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "public" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "futurenet" => Ok(Self::Futurenet),
            "local" | "standalone" => Ok(Self::Local),
            other => Err(SparkError::config(format!("unknown network: {other}"))),
        }
    }
}

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network preset.
    pub network: Network,
    /// JSON-RPC gateway endpoint.
    pub rpc_url: String,
    /// Passphrase override.
    pub network_passphrase: Option<String>,
    /// Marketplace contract.
    pub contract_id: String,
    /// Payment token contract.
    pub token_id: String,
    /// Inclusion fee in stroops.
    pub base_fee: u64,
    /// Validity window of submitted transactions.
    pub tx_timeout_secs: u64,
    /// Delay between status checks.
    pub poll_interval_ms: u64,
    /// How long to wait for a terminal status.
    pub poll_timeout_secs: u64,
    /// How long a cached read stays fresh.
    pub cache_stale_secs: u64,
    /// How many ledgers a rental allowance stays valid.
    pub allowance_ledgers: u32,
    /// Permit plain `http://` RPC endpoints.
    pub allow_http: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            rpc_url: String::new(),
            network_passphrase: None,
            contract_id: String::new(),
            token_id: String::new(),
            base_fee: 100,
            tx_timeout_secs: 120,
            poll_interval_ms: 1_000,
            poll_timeout_secs: 30,
            cache_stale_secs: 30,
            allowance_ledgers: 17_280,
            allow_http: false,
        }
    }
}

impl NetworkConfig {
    /// Defaults for a network preset.
    #[must_use]
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            allow_http: network == Network::Local,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file without validating it, for callers that layer
    /// overrides on top before calling [`NetworkConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SparkError::config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        Self::parse_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let config = Self::parse_json(content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| SparkError::config(format!("invalid JSON: {e}")))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        for (name, id) in [("contract_id", &self.contract_id), ("token_id", &self.token_id)] {
            if id.is_empty() {
                return Err(SparkError::config(format!("{name} is required")));
            }
            let address = Address::parse(id).map_err(|e| SparkError::config(format!("{name}: {e}")))?;
            if !address.is_contract() {
                return Err(SparkError::config(format!("{name} must be a contract address")));
            }
        }
        if self.contract_id == self.token_id {
            return Err(SparkError::config("contract_id and token_id must differ"));
        }

        let url = self.rpc_url();
        if url.is_empty() {
            return Err(SparkError::config("rpc_url is required"));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(SparkError::config("rpc_url must start with http:// or https://"));
        }
        if url.starts_with("http://") && !self.allow_http {
            return Err(SparkError::config("rpc_url uses plain http; set allow_http to permit it"));
        }
        if self.network_passphrase().is_empty() {
            return Err(SparkError::config("network_passphrase cannot be empty"));
        }

        if self.poll_interval_ms == 0 {
            return Err(SparkError::config("poll_interval_ms must be greater than 0"));
        }
        if self.poll_timeout_secs == 0 {
            return Err(SparkError::config("poll_timeout_secs must be greater than 0"));
        }
        if self.tx_timeout_secs < self.poll_timeout_secs {
            return Err(SparkError::config(
                "tx_timeout_secs must be at least poll_timeout_secs",
            ));
        }
        if self.allowance_ledgers == 0 {
            return Err(SparkError::config("allowance_ledgers must be greater than 0"));
        }
        Ok(())
    }

    /// RPC gateway URL.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Effective network passphrase.
    #[must_use]
    pub fn network_passphrase(&self) -> &str {
        self.network_passphrase
            .as_deref()
            .unwrap_or_else(|| self.network.passphrase())
    }

    /// Marketplace contract address.
    ///
    /// # Errors
    ///
    /// Returns error if the configured id is invalid.
    pub fn contract(&self) -> Result<Address> {
        Address::parse(&self.contract_id)
    }

    /// Token contract address.
    ///
    /// # Errors
    ///
    /// Returns error if the configured id is invalid.
    pub fn token(&self) -> Result<Address> {
        Address::parse(&self.token_id)
    }

    /// Polling schedule for writes.
    #[must_use]
    pub const fn poll(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }

    /// Validity window for submitted transactions.
    #[must_use]
    pub const fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }

    /// Cache freshness window.
    #[must_use]
    pub const fn cache_stale_after(&self) -> Duration {
        Duration::from_secs(self.cache_stale_secs)
    }
}
