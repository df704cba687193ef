//! Marketplace commands: listings, rentals, and the rent flow.

use std::io::Write;

use sparknet_client::{Address, Amount, HttpRpc, Marketplace, NetworkConfig};
use tracing::warn;

use crate::cli::{Commands, RoleArg};
use crate::commands::{connect, session_from_secret};
use crate::error::CliError;
use crate::output::{
    OutputFormat, ProviderList, RentSummary, RentalDetail, RentalList, TxReceipt,
};

/// Marketplace command executor.
pub struct MarketCommand {
    market: Marketplace<HttpRpc>,
    secret: Option<String>,
}

impl MarketCommand {
    /// Create a marketplace command. `secret` signs write commands.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC endpoint is refused.
    pub fn new(config: &NetworkConfig, secret: Option<String>) -> Result<Self, CliError> {
        Ok(Self {
            market: connect(config)?,
            secret,
        })
    }

    /// Execute a marketplace subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &Commands,
    ) -> Result<(), CliError> {
        match command {
            Commands::Providers => {
                let providers = self.market.providers().await?;
                format.write(writer, &ProviderList { providers })?;
            }
            Commands::Rentals { address, role } => {
                let address = parse_address(address)?;
                let rentals = match role {
                    RoleArg::Consumer => self.market.consumer_rentals(&address).await?,
                    RoleArg::Provider => self.market.provider_rentals(&address).await?,
                };
                format.write(writer, &RentalList { rentals })?;
            }
            Commands::Rental { id } => {
                let rental = self.market.rental(*id).await?;
                format.write(writer, &RentalDetail { rental })?;
            }
            Commands::Register { gpu_model, price } => {
                let price = Amount::parse_decimal(price)?;
                let session = session_from_secret(self.secret.as_deref())?;
                let receipt = self.market.register_provider(&session, gpu_model, price).await?;
                format.write(
                    writer,
                    &TxReceipt {
                        action: format!("Registered {gpu_model} at {price} per hour"),
                        hash: receipt.hash.to_string(),
                        ledger: receipt.ledger,
                    },
                )?;
            }
            Commands::Rent { provider, hours } => {
                let provider = parse_address(provider)?;
                let session = session_from_secret(self.secret.as_deref())?;
                let receipt = self
                    .market
                    .rent(&session, &provider, *hours)
                    .await
                    .inspect_err(|e| {
                        if e.is_partial() {
                            warn!(error = %e, "allowance remains approved until it expires");
                        }
                        if let Some(hash) = e.rent_hash() {
                            warn!(%hash, "the rental was created; list rentals to see it");
                        }
                    })?;
                format.write(
                    writer,
                    &RentSummary {
                        approval_hash: receipt.approval.to_string(),
                        rent_hash: receipt.hash.to_string(),
                        rental: receipt.rental,
                    },
                )?;
            }
            Commands::Complete { rental_id } => {
                let session = session_from_secret(self.secret.as_deref())?;
                let receipt = self.market.complete_job(&session, *rental_id).await?;
                format.write(
                    writer,
                    &TxReceipt {
                        action: format!("Rental {rental_id} completed"),
                        hash: receipt.hash.to_string(),
                        ledger: receipt.ledger,
                    },
                )?;
            }
            Commands::Init { .. } | Commands::Keygen => {
                return Err(CliError::InvalidArgument(
                    "not a marketplace command".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_address(input: &str) -> Result<Address, CliError> {
    let address = Address::parse(input.trim())
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    if address.is_contract() {
        return Err(CliError::InvalidArgument(format!(
            "{address} is a contract, expected an account"
        )));
    }
    Ok(address)
}
