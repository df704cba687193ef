//! CLI command implementations.
//!
//! Each submodule implements a group of commands:
//! - [`init`] - Contract bootstrap
//! - [`keygen`] - Local keypair generation
//! - [`market`] - Providers, rentals, and the rent flow

pub mod init;
pub mod keygen;
pub mod market;

pub use init::InitCommand;
pub use keygen::KeygenCommand;
pub use market::MarketCommand;

use std::time::Duration;

use sparknet_client::{HttpRpc, KeypairWallet, Marketplace, Network, NetworkConfig, Session};

use crate::cli::Cli;
use crate::error::CliError;

/// HTTP timeout for a single RPC request.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the effective configuration: file (or network preset), then flags
/// and environment variables on top.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the result is invalid.
pub fn load_config(cli: &Cli) -> Result<NetworkConfig, CliError> {
    let network = cli
        .network
        .as_deref()
        .map(str::parse::<Network>)
        .transpose()?;

    let mut config = match &cli.config {
        Some(path) => NetworkConfig::read_file(path)?,
        None => NetworkConfig::for_network(network.unwrap_or_default()),
    };
    if let Some(network) = network {
        config.network = network;
    }
    if let Some(url) = &cli.rpc_url {
        config.rpc_url.clone_from(url);
    }
    if let Some(id) = &cli.contract_id {
        config.contract_id.clone_from(id);
    }
    if let Some(id) = &cli.token_id {
        config.token_id.clone_from(id);
    }
    config.validate()?;
    Ok(config)
}

/// Connect a marketplace client over HTTP.
///
/// # Errors
///
/// Returns an error if the RPC endpoint is refused.
pub fn connect(config: &NetworkConfig) -> Result<Marketplace<HttpRpc>, CliError> {
    let rpc = HttpRpc::new(config.rpc_url(), config.allow_http, RPC_TIMEOUT)
        .map_err(|e| CliError::Config(e.message))?;
    Ok(Marketplace::new(rpc, config)?)
}

/// A complete configuration for command tests. Nothing listens on the
/// gateway, so tests must fail before any request is made.
#[cfg(test)]
pub(crate) fn test_config() -> NetworkConfig {
    use sparknet_client::{Address, AddressKind};

    NetworkConfig {
        rpc_url: GATEWAY.to_string(),
        contract_id: Address::from_key(AddressKind::Contract, &[2; 32]).to_string(),
        token_id: Address::from_key(AddressKind::Contract, &[3; 32]).to_string(),
        ..NetworkConfig::default()
    }
}

#[cfg(test)]
const GATEWAY: &str = "https://gateway.sparknet.test/rpc";

/// Session signed by a local secret seed.
///
/// # Errors
///
/// Returns an error if the seed is missing or malformed.
pub fn session_from_secret(secret: Option<&str>) -> Result<Session, CliError> {
    let secret = secret.ok_or_else(|| {
        CliError::Config("no signing key: pass --secret or set SPARKNET_SECRET".into())
    })?;
    let wallet = KeypairWallet::from_secret(secret.trim())
        .map_err(|e| CliError::InvalidArgument(format!("secret seed: {e}")))?;
    Ok(Session::from_keypair(wallet))
}
