//! Marketplace operations.
//!
//! Reads go through the [`QueryCache`]; writes go through the
//! [`ContractClient`] and invalidate the cache entries they affect.
//!
//! Renting is two transactions: an `approve` on the token contract that lets
//! the marketplace pull the rental cost, then `rent_gpu` on the marketplace.
//! The second is only attempted once the first is final. There is no rollback
//! if it then fails; [`RentError::Rent`] reports the approval that stands.
//!
//! Cache entries touched by a write are invalidated as soon as the write is
//! final, before its return value is decoded.

use crate::address::Address;
use crate::amount::Amount;
use crate::cache::{QueryCache, QueryKey};
use crate::config::NetworkConfig;
use crate::error::{CodecError, Result, SparkError};
use crate::invoke::{ContractClient, Settled, WriteOutcome};
use crate::model::{Provider, Rental, decode_list};
use crate::rpc::LedgerRpc;
use crate::transaction::TxHash;
use crate::value::Value;
use crate::wallet::Session;
use thiserror::Error;
use tracing::{debug, info, warn};

fn providers_key() -> QueryKey {
    QueryKey::new(["providers"])
}

fn rentals_prefix() -> QueryKey {
    QueryKey::new(["rentals"])
}

fn consumer_rentals_key(address: &Address) -> QueryKey {
    QueryKey::new(["rentals", "consumer", address.as_str()])
}

fn provider_rentals_key(address: &Address) -> QueryKey {
    QueryKey::new(["rentals", "provider", address.as_str()])
}

fn rental_prefix() -> QueryKey {
    QueryKey::new(["rental"])
}

fn rental_key(id: u64) -> QueryKey {
    QueryKey::new(["rental".to_string(), id.to_string()])
}

/// A confirmed write and the record it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T> {
    /// Transaction hash.
    pub hash: TxHash,
    /// Ledger the transaction was applied in.
    pub ledger: Option<u32>,
    /// Decoded record, if the contract returned one.
    pub record: Option<T>,
}

impl<T> Receipt<T>
where
    T: for<'a> TryFrom<&'a Value, Error = CodecError>,
{
    fn decode(settled: Settled) -> Result<Self> {
        let outcome = settled.decode()?;
        let record = outcome.return_value.as_ref().map(T::try_from).transpose()?;
        Ok(Self {
            hash: outcome.hash,
            ledger: outcome.ledger,
            record,
        })
    }
}

/// A completed rental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentReceipt {
    /// Hash of the token allowance transaction.
    pub approval: TxHash,
    /// Hash of the rental transaction.
    pub hash: TxHash,
    /// The new rental.
    pub rental: Rental,
}

/// Failure of the two-step rent.
#[derive(Debug, Error)]
pub enum RentError {
    /// Rejected before anything was submitted.
    #[error("rent not submitted: {0}")]
    Preflight(#[source] SparkError),

    /// The allowance was not approved. The rental was never attempted.
    #[error("allowance approval failed: {0}")]
    Approval(#[source] SparkError),

    /// The allowance was approved but the rental failed. The allowance stays
    /// in place until it expires.
    #[error("allowance approved in {approval} but rental failed: {source}")]
    Rent {
        /// Hash of the approval transaction.
        approval: TxHash,
        /// Why the rental failed.
        source: SparkError,
    },

    /// Both transactions are final, but the rental record the contract
    /// returned could not be decoded. The rental exists on the ledger.
    #[error("rental confirmed in {hash} but its record could not be read: {source}")]
    Undecoded {
        /// Hash of the approval transaction.
        approval: TxHash,
        /// Hash of the rental transaction.
        hash: TxHash,
        /// Why decoding failed.
        source: SparkError,
    },
}

impl RentError {
    /// Whether the allowance went through but the rental did not.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::Rent { .. })
    }

    /// Hash of the rental transaction, if it reached the ledger.
    #[must_use]
    pub const fn rent_hash(&self) -> Option<&TxHash> {
        match self {
            Self::Undecoded { hash, .. } => Some(hash),
            _ => None,
        }
    }

    /// The underlying error.
    #[must_use]
    pub const fn error(&self) -> &SparkError {
        match self {
            Self::Preflight(e)
            | Self::Approval(e)
            | Self::Rent { source: e, .. }
            | Self::Undecoded { source: e, .. } => e,
        }
    }
}

/// SparkNet marketplace client.
#[derive(Debug)]
pub struct Marketplace<R> {
    client: ContractClient<R>,
    cache: QueryCache,
    contract: Address,
    token: Address,
    allowance_ledgers: u32,
}

impl<R: LedgerRpc> Marketplace<R> {
    /// Create a marketplace client for the contracts named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Config`] if the configuration is invalid.
    pub fn new(rpc: R, config: &NetworkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: ContractClient::new(rpc, config),
            cache: QueryCache::new(config.cache_stale_after()),
            contract: config.contract()?,
            token: config.token()?,
            allowance_ledgers: config.allowance_ledgers,
        })
    }

    /// The contract adapter.
    #[must_use]
    pub const fn client(&self) -> &ContractClient<R> {
        &self.client
    }

    /// The read cache.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Marketplace contract address.
    #[must_use]
    pub const fn contract(&self) -> &Address {
        &self.contract
    }

    /// Token contract address.
    #[must_use]
    pub const fn token(&self) -> &Address {
        &self.token
    }

    async fn cached_read(&self, key: QueryKey, function: &str, args: Vec<Value>) -> Result<Value> {
        self.cache
            .fetch(key, || self.client.read(&self.contract, function, &args))
            .await
    }

    /// All registered providers.
    pub async fn providers(&self) -> Result<Vec<Provider>> {
        let value = self.cached_read(providers_key(), "get_providers", vec![]).await?;
        Ok(decode_list(&value)?)
    }

    /// The provider registered under `address`, if any.
    pub async fn provider(&self, address: &Address) -> Result<Option<Provider>> {
        Ok(self.providers().await?.into_iter().find(|p| p.id == *address))
    }

    /// A rental by id.
    pub async fn rental(&self, id: u64) -> Result<Rental> {
        let value = self
            .cached_read(rental_key(id), "get_rental_by_id", vec![Value::U64(id)])
            .await?;
        Ok(Rental::try_from(&value)?)
    }

    /// Rentals where `address` is the consumer.
    pub async fn consumer_rentals(&self, address: &Address) -> Result<Vec<Rental>> {
        let value = self
            .cached_read(
                consumer_rentals_key(address),
                "get_rentals_for_consumer",
                vec![Value::from(address)],
            )
            .await?;
        Ok(decode_list(&value)?)
    }

    /// Rentals where `address` is the provider.
    pub async fn provider_rentals(&self, address: &Address) -> Result<Vec<Rental>> {
        let value = self
            .cached_read(
                provider_rentals_key(address),
                "get_rentals_for_provider",
                vec![Value::from(address)],
            )
            .await?;
        Ok(decode_list(&value)?)
    }

    /// Register the session's account as a provider.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::InvalidArgument`] for an empty model or a zero
    /// price before anything is sent.
    pub async fn register_provider(
        &self,
        session: &Session,
        gpu_model: &str,
        price_per_hour: Amount,
    ) -> Result<Receipt<Provider>> {
        let gpu_model = gpu_model.trim();
        if gpu_model.is_empty() {
            return Err(SparkError::invalid_argument("GPU model cannot be empty"));
        }
        if price_per_hour.is_zero() {
            return Err(SparkError::invalid_argument("price per hour must be greater than zero"));
        }

        let settled = self
            .client
            .submit(
                session,
                &self.contract,
                "register",
                &[
                    Value::from(session.public_key()),
                    Value::from(gpu_model),
                    Value::U128(price_per_hour.stroops()),
                ],
            )
            .await?;
        self.cache.invalidate(&providers_key());
        info!(provider = %session.public_key(), gpu_model, "provider registered");
        Receipt::decode(settled)
    }

    /// Rent `provider` for `hours`, approving the cost on the token first.
    pub async fn rent(
        &self,
        session: &Session,
        provider: &Address,
        hours: u64,
    ) -> std::result::Result<RentReceipt, RentError> {
        let consumer = session.public_key();
        let (cost, expiration) = self.prepare_rent(provider, hours).await.map_err(RentError::Preflight)?;
        debug!(%consumer, %provider, hours, cost = %cost, expiration, "approving rental allowance");

        let approve_args = [
            Value::from(consumer),
            Value::from(&self.contract),
            Value::I128(cost.to_i128().map_err(RentError::Preflight)?),
            Value::U32(expiration),
        ];
        let approval = self
            .client
            .submit(session, &self.token, "approve", &approve_args)
            .await
            .map_err(RentError::Approval)?;

        let rent_args = [Value::from(consumer), Value::from(provider), Value::U64(hours)];
        let settled = match self.client.submit(session, &self.contract, "rent_gpu", &rent_args).await {
            Ok(settled) => settled,
            Err(source) => {
                warn!(approval = %approval.hash, error = %source, "allowance approved but rental failed");
                return Err(RentError::Rent {
                    approval: approval.hash,
                    source,
                });
            }
        };
        self.cache.invalidate(&consumer_rentals_key(consumer));
        self.cache.invalidate(&provider_rentals_key(provider));

        let hash = settled.hash.clone();
        let rental = settled.decode().and_then(|outcome| {
            let value = outcome.return_value.ok_or(CodecError::MissingField {
                field: "rental".to_string(),
            })?;
            Ok(Rental::try_from(&value)?)
        });
        match rental {
            Ok(rental) => {
                info!(rental = rental.id, %consumer, %provider, "rental started");
                Ok(RentReceipt {
                    approval: approval.hash,
                    hash,
                    rental,
                })
            }
            Err(source) => {
                warn!(%hash, error = %source, "rental confirmed but its record could not be decoded");
                Err(RentError::Undecoded {
                    approval: approval.hash,
                    hash,
                    source,
                })
            }
        }
    }

    async fn prepare_rent(&self, provider: &Address, hours: u64) -> Result<(Amount, u32)> {
        if hours == 0 {
            return Err(SparkError::invalid_argument("rental duration must be at least one hour"));
        }
        let listing = self
            .provider(provider)
            .await?
            .ok_or_else(|| SparkError::invalid_argument(format!("no provider registered at {provider}")))?;
        let cost = listing
            .cost_for(hours)
            .ok_or_else(|| SparkError::invalid_amount(format!("cost of {hours} hours overflows")))?;
        let expiration = self
            .client
            .latest_ledger()
            .await?
            .checked_add(self.allowance_ledgers)
            .ok_or_else(|| SparkError::invalid_argument("allowance expiration overflows"))?;
        Ok((cost, expiration))
    }

    /// Mark a rental's job complete, releasing payment to the provider.
    pub async fn complete_job(&self, session: &Session, rental_id: u64) -> Result<Receipt<Rental>> {
        let settled = self
            .client
            .submit(
                session,
                &self.contract,
                "complete_job",
                &[Value::from(session.public_key()), Value::U64(rental_id)],
            )
            .await?;
        let receipt = Receipt::<Rental>::decode(settled);

        self.cache.invalidate(&rental_key(rental_id));
        match receipt.as_ref().ok().and_then(|r| r.record.as_ref()) {
            Some(rental) => {
                self.cache.invalidate(&consumer_rentals_key(&rental.consumer));
                self.cache.invalidate(&provider_rentals_key(&rental.provider));
            }
            None => {
                self.cache.invalidate(&rentals_prefix());
                self.cache.invalidate(&rental_prefix());
            }
        }
        info!(rental_id, "job completed");
        receipt
    }

    /// Bootstrap the contract with its admin and payment token.
    pub async fn initialize(&self, session: &Session, admin: &Address, token: &Address) -> Result<WriteOutcome> {
        let outcome = self
            .client
            .write(
                session,
                &self.contract,
                "initialize",
                &[Value::from(admin), Value::from(token)],
            )
            .await?;
        info!(%admin, %token, hash = %outcome.hash, "contract initialized");
        Ok(outcome)
    }
}
