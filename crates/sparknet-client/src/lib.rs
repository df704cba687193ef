//! # sparknet-client
//!
//! Client for the SparkNet GPU rental marketplace, a smart contract on a
//! Soroban-style ledger.
//!
//! This crate provides:
//! - A typed value codec between native values and ledger values
//! - One hardened adapter for contract reads (simulate) and writes
//!   (simulate, sign, send, poll)
//! - Explicit wallet sessions and a local ed25519 keypair wallet
//! - A query cache with prefix invalidation
//! - Marketplace operations, including the two-step approve-then-rent
//!
//! ## Amounts
//!
//! All prices and costs are integer stroops: 1 unit = `10_000_000` stroops.
//! Provider prices are shown exactly as the contract stores them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sparknet_client::{HttpRpc, KeypairWallet, Marketplace, NetworkConfig, Session};
//! use std::time::Duration;
//!
//! # async fn example() -> sparknet_client::Result<()> {
//! let config = NetworkConfig::from_file("sparknet.json")?;
//! let rpc = HttpRpc::new(config.rpc_url(), config.allow_http, Duration::from_secs(30))
//!     .map_err(|e| sparknet_client::SparkError::connection(e.message))?;
//! let market = Marketplace::new(rpc, &config)?;
//!
//! for provider in market.providers().await? {
//!     println!("{} {} {}", provider.id, provider.gpu_model, provider.price_per_hour);
//! }
//!
//! let session = Session::from_keypair(KeypairWallet::generate());
//! let provider = market.providers().await?[0].id.clone();
//! match market.rent(&session, &provider, 2).await {
//!     Ok(receipt) => println!("rental {}", receipt.rental.id),
//!     Err(e) if e.is_partial() => eprintln!("allowance left approved: {e}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod amount;
pub mod cache;
pub mod config;
pub mod error;
pub mod invoke;
pub mod marketplace;
pub mod model;
pub mod poll;
pub mod rpc;
pub mod transaction;
pub mod value;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use address::{Address, AddressKind};
pub use amount::Amount;
pub use cache::{QueryCache, QueryKey, QueryStatus};
pub use config::{Network, NetworkConfig};
pub use error::{CodecError, Result, SparkError};
pub use invoke::{ContractClient, Settled, WriteOutcome};
pub use marketplace::{Marketplace, Receipt, RentError, RentReceipt};
pub use model::{Provider, Rental};
pub use poll::{PollConfig, PollError, poll_until};
pub use rpc::{HttpRpc, LedgerRpc, TransportError};
pub use transaction::{Transaction, TransactionBuilder, TxHash};
pub use value::{ScVal, Value};
pub use wallet::{KeypairWallet, Session, Wallet, WalletConnection};

/// Stroops per whole unit.
pub const STROOPS_PER_UNIT: u128 = 10_000_000;

/// Fractional digits of the token.
pub const DECIMALS: u32 = 7;
