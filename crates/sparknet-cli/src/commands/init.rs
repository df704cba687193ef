//! Contract bootstrap.
//!
//! Submits `initialize(admin, token)` signed by the admin key and prints the
//! transaction hash.

use std::io::Write;

use sparknet_client::{KeypairWallet, NetworkConfig, Session};
use tracing::info;

use crate::commands::connect;
use crate::error::CliError;
use crate::output::{OutputFormat, TxReceipt};

/// Init command executor.
pub struct InitCommand {
    config: NetworkConfig,
}

impl InitCommand {
    /// Create a new init command.
    #[must_use]
    pub const fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    /// Initialize the configured contract with `admin_secret`'s account as
    /// admin and the configured token as payment token.
    ///
    /// # Errors
    ///
    /// Returns the raw client error if any step fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        admin_secret: &str,
    ) -> Result<(), CliError> {
        let admin = KeypairWallet::from_secret(admin_secret.trim())
            .map_err(|e| CliError::InvalidArgument(format!("admin secret: {e}")))?;
        let admin_address = admin.address().clone();
        let session = Session::from_keypair(admin);

        let market = connect(&self.config)?;
        info!(contract = %market.contract(), admin = %admin_address, "initializing contract");
        let outcome = market
            .initialize(&session, &admin_address, market.token())
            .await?;

        format.write(
            writer,
            &TxReceipt {
                action: format!("Contract {} initialized", market.contract()),
                hash: outcome.hash.to_string(),
                ledger: outcome.ledger,
            },
        )
    }
}
