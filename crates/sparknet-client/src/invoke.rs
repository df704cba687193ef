//! The contract read/write adapter.
//!
//! Reads simulate and decode. Writes load the account, simulate, assemble,
//! sign, send, and poll until the transaction is final. Every boundary
//! failure comes back as a [`SparkError`] with the raw diagnostic attached.

use crate::address::{Address, AddressKind};
use crate::config::NetworkConfig;
use crate::error::{Result, SparkError};
use crate::poll::{PollConfig, PollError, poll_until};
use crate::rpc::{GetTransactionResponse, LedgerRpc, TxStatus};
use crate::transaction::{Transaction, TransactionBuilder, TxHash};
use crate::value::{ScVal, Value, decode, encode_args};
use crate::wallet::Session;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Result of a confirmed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Transaction hash.
    pub hash: TxHash,
    /// Ledger the transaction was applied in.
    pub ledger: Option<u32>,
    /// Decoded return value. `None` when the call returned nothing or `void`.
    pub return_value: Option<Value>,
}

/// A write that reached a successful final status, with its return value
/// still in wire form.
///
/// Callers that must react to a confirmed write (cache invalidation, say)
/// can do so before decoding, since a decode failure does not undo the
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    /// Transaction hash.
    pub hash: TxHash,
    /// Ledger the transaction was applied in.
    pub ledger: Option<u32>,
    return_value: Option<serde_json::Value>,
}

impl Settled {
    /// Decode the return value.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Codec`] if the value has an unsupported type or
    /// is malformed. The transaction is final either way.
    pub fn decode(self) -> Result<WriteOutcome> {
        let return_value = match &self.return_value {
            None => None,
            Some(raw) => match ScVal::from_json(raw)? {
                ScVal::Void => None,
                value => Some(decode(&value)?),
            },
        };
        Ok(WriteOutcome {
            hash: self.hash,
            ledger: self.ledger,
            return_value,
        })
    }
}

/// Invokes contract functions over a [`LedgerRpc`].
#[derive(Debug)]
pub struct ContractClient<R> {
    rpc: R,
    read_source: Address,
    network_passphrase: String,
    base_fee: u64,
    tx_timeout: Duration,
    poll: PollConfig,
}

impl<R: LedgerRpc> ContractClient<R> {
    /// Create a client using the network and timing settings of `config`.
    #[must_use]
    pub fn new(rpc: R, config: &NetworkConfig) -> Self {
        Self {
            rpc,
            read_source: Address::from_key(AddressKind::Account, &[0; 32]),
            network_passphrase: config.network_passphrase().to_string(),
            base_fee: config.base_fee,
            tx_timeout: config.tx_timeout(),
            poll: config.poll(),
        }
    }

    /// The underlying RPC.
    #[must_use]
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Passphrase transactions are signed for.
    #[must_use]
    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    /// Polling schedule for writes.
    #[must_use]
    pub const fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Latest closed ledger sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Simulation`] if the RPC is unreachable.
    pub async fn latest_ledger(&self) -> Result<u32> {
        self.rpc
            .get_latest_ledger()
            .await
            .map_err(|e| SparkError::simulation("getLatestLedger", e.message))
    }

    /// Call a read-only function by simulating it.
    ///
    /// The transaction is sourced from a fixed placeholder account and is
    /// never signed or sent.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Simulation`] on transport failure, a simulation
    /// error, or a missing return value, and [`SparkError::Codec`] if the
    /// arguments or the result cannot be converted.
    pub async fn read(&self, contract: &Address, function: &str, args: &[Value]) -> Result<Value> {
        let args = encode_args(args)?;
        let tx = TransactionBuilder::new(self.read_source.clone(), 0)
            .fee(self.base_fee)
            .timeout(self.tx_timeout)
            .invoke(contract.clone(), function, args);

        debug!(%contract, function, "simulating read");
        let simulation = self
            .rpc
            .simulate_transaction(&tx)
            .await
            .map_err(|e| SparkError::simulation(function, e.message))?;
        if let Some(error) = simulation.error {
            return Err(SparkError::simulation(function, error));
        }
        let retval = simulation
            .result
            .map(|r| r.retval)
            .ok_or_else(|| SparkError::simulation(function, "simulation returned no value"))?;
        Ok(decode(&ScVal::from_json(&retval)?)?)
    }

    /// Submit a state-changing call and wait for it to be final.
    ///
    /// # Errors
    ///
    /// See [`ContractClient::write_with_cancel`].
    pub async fn write(
        &self,
        session: &Session,
        contract: &Address,
        function: &str,
        args: &[Value],
    ) -> Result<WriteOutcome> {
        self.write_with_cancel(session, contract, function, args, &CancellationToken::new())
            .await
    }

    /// Submit a state-changing call, stopping early if `cancel` fires.
    ///
    /// # Errors
    ///
    /// Everything [`ContractClient::submit_with_cancel`] returns, plus
    /// [`SparkError::Codec`] when the confirmed transaction's return value
    /// cannot be decoded. That transaction is final and must not be resent.
    pub async fn write_with_cancel(
        &self,
        session: &Session,
        contract: &Address,
        function: &str,
        args: &[Value],
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome> {
        let settled = self
            .submit_with_cancel(session, contract, function, args, cancel)
            .await?;
        let hash = settled.hash.clone();
        settled.decode().inspect_err(|e| {
            warn!(function, %hash, error = %e, "confirmed transaction returned an undecodable value");
        })
    }

    /// Submit a state-changing call and wait for it to be final, leaving the
    /// return value undecoded.
    ///
    /// # Errors
    ///
    /// See [`ContractClient::submit_with_cancel`].
    pub async fn submit(
        &self,
        session: &Session,
        contract: &Address,
        function: &str,
        args: &[Value],
    ) -> Result<Settled> {
        self.submit_with_cancel(session, contract, function, args, &CancellationToken::new())
            .await
    }

    /// Submit a state-changing call, stopping early if `cancel` fires.
    ///
    /// No signature is requested unless simulation succeeds, and nothing is
    /// sent unless signing succeeds.
    ///
    /// # Errors
    ///
    /// - [`SparkError::Simulation`] when the account cannot be loaded or the
    ///   simulation fails
    /// - [`SparkError::Signing`] when the wallet declines or fails
    /// - [`SparkError::Submission`] when the network rejects the transaction
    /// - [`SparkError::Execution`] when the transaction fails on the ledger
    /// - [`SparkError::Timeout`] when no final status arrives in time
    /// - [`SparkError::Cancelled`] when `cancel` fires first
    pub async fn submit_with_cancel(
        &self,
        session: &Session,
        contract: &Address,
        function: &str,
        args: &[Value],
        cancel: &CancellationToken,
    ) -> Result<Settled> {
        let args = encode_args(args)?;
        let source = session.public_key();

        let account = self
            .rpc
            .get_account(source)
            .await
            .map_err(|e| SparkError::simulation(function, format!("failed to load account {source}: {}", e.message)))?;
        let sequence = account
            .sequence
            .checked_add(1)
            .ok_or_else(|| SparkError::simulation(function, "account sequence exhausted"))?;
        let tx = TransactionBuilder::new(source.clone(), sequence)
            .fee(self.base_fee)
            .timeout(self.tx_timeout)
            .invoke(contract.clone(), function, args);
        debug!(%contract, function, sequence, "built transaction");

        let tx = self.simulate_and_assemble(tx).await?;
        ensure_live(cancel, function)?;

        let payload = tx.into_envelope().to_payload()?;
        let signed = session
            .signer()
            .sign_transaction(&payload, &self.network_passphrase)
            .await
            .map_err(|e| SparkError::signing(e.message))?;
        debug!(function, "transaction signed");
        ensure_live(cancel, function)?;

        let sent = self
            .rpc
            .send_transaction(&signed)
            .await
            .map_err(|e| SparkError::Submission {
                hash: None,
                diagnostic: e.message,
            })?;
        if !sent.status.is_accepted() {
            return Err(SparkError::Submission {
                hash: Some(sent.hash.to_string()),
                diagnostic: sent
                    .error_result
                    .unwrap_or_else(|| format!("status {}", sent.status)),
            });
        }
        debug!(function, hash = %sent.hash, status = %sent.status, "transaction submitted");

        let result = self.await_final(&sent.hash, function, cancel).await?;
        if result.status == TxStatus::Failed {
            return Err(SparkError::Execution {
                hash: sent.hash.to_string(),
                diagnostic: result
                    .error
                    .unwrap_or_else(|| "transaction failed without a diagnostic".to_string()),
            });
        }

        info!(function, hash = %sent.hash, ledger = ?result.ledger, "transaction confirmed");
        Ok(Settled {
            hash: sent.hash,
            ledger: result.ledger,
            return_value: result.return_value,
        })
    }

    async fn simulate_and_assemble(&self, tx: Transaction) -> Result<Transaction> {
        let function = tx.operation.function.clone();
        let simulation = self
            .rpc
            .simulate_transaction(&tx)
            .await
            .map_err(|e| SparkError::simulation(&function, e.message))?;
        let tx = tx.assemble(&simulation)?;
        debug!(function = %function, fee = tx.fee, ledger = simulation.latest_ledger, "transaction assembled");
        Ok(tx)
    }

    async fn await_final(
        &self,
        hash: &TxHash,
        function: &str,
        cancel: &CancellationToken,
    ) -> Result<GetTransactionResponse> {
        let rpc = &self.rpc;
        let polled = poll_until(
            || async move {
                match rpc.get_transaction(hash).await {
                    Ok(response) if response.status.is_terminal() => ControlFlow::Break(response),
                    Ok(response) => {
                        trace!(%hash, status = %response.status, "transaction not final");
                        ControlFlow::Continue(())
                    }
                    Err(e) => {
                        warn!(%hash, error = %e, "status check failed, will retry");
                        ControlFlow::Continue(())
                    }
                }
            },
            self.poll,
            cancel,
        )
        .await;

        polled.map_err(|e| match e {
            PollError::TimedOut { elapsed } => {
                warn!(%hash, ?elapsed, "transaction not final before deadline");
                SparkError::Timeout {
                    hash: hash.to_string(),
                    timeout_secs: self.poll.timeout.as_secs(),
                }
            }
            PollError::Cancelled => SparkError::Cancelled {
                operation: function.to_string(),
            },
        })
    }
}

fn ensure_live(cancel: &CancellationToken, function: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(SparkError::Cancelled {
            operation: function.to_string(),
        });
    }
    Ok(())
}
