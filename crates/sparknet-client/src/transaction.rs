//! Contract-invocation transactions.
//!
//! A transaction carries exactly one contract call. It is built unsigned,
//! simulated, assembled with the simulation's resource data, signed, and sent.
//! The payload handed to wallets and the RPC is base64 over the JSON envelope.

use crate::address::Address;
use crate::error::{Result, SparkError};
use crate::rpc::SimulateResponse;
use crate::value::ScVal;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Default inclusion fee in stroops.
pub const BASE_FEE: u64 = 100;

/// Hex-encoded transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    /// Create from a hex string.
    #[must_use]
    pub fn from_hex(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the hash as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single contract function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeContract {
    /// Target contract.
    pub contract: Address,
    /// Function name.
    pub function: String,
    /// Encoded arguments.
    pub args: Vec<ScVal>,
}

/// Ledger keys a transaction reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footprint {
    /// Keys read.
    #[serde(default)]
    pub read_only: Vec<String>,
    /// Keys written.
    #[serde(default)]
    pub read_write: Vec<String>,
}

/// Resource data produced by simulation and required before signing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SorobanData {
    /// Predicted footprint.
    pub footprint: Footprint,
    /// Resource fee in stroops.
    #[serde(default)]
    pub resource_fee: u64,
    /// Authorization entries the call needs.
    #[serde(default)]
    pub auth: Vec<String>,
}

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Source account (pays fees, consumes the sequence number).
    pub source: Address,
    /// Sequence number.
    pub sequence: u64,
    /// Total fee in stroops.
    pub fee: u64,
    /// Unix time after which the transaction is invalid.
    pub max_time: u64,
    /// The contract call.
    pub operation: InvokeContract,
    /// Simulation resource data; present once assembled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soroban_data: Option<SorobanData>,
}

impl Transaction {
    /// Whether simulation data has been merged in.
    #[must_use]
    pub const fn is_assembled(&self) -> bool {
        self.soroban_data.is_some()
    }

    /// Merge simulation metadata: footprint, auth, and resource fee.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Simulation`] if the simulation failed or carried
    /// no resource data.
    pub fn assemble(mut self, simulation: &SimulateResponse) -> Result<Self> {
        let function = &self.operation.function;
        if let Some(error) = &simulation.error {
            return Err(SparkError::simulation(function, error.clone()));
        }
        let data = simulation
            .transaction_data
            .clone()
            .ok_or_else(|| SparkError::simulation(function, "simulation returned no resource data"))?;
        let resource_fee = simulation.min_resource_fee.unwrap_or(data.resource_fee);

        self.fee = self.fee.saturating_add(resource_fee);
        self.soroban_data = Some(data);
        Ok(self)
    }

    /// Hash that signers sign: `SHA-256(SHA-256(passphrase) ‖ JSON(tx))`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction cannot be serialized.
    pub fn hash(&self, network_passphrase: &str) -> Result<[u8; 32]> {
        let network_id = Sha256::digest(network_passphrase.as_bytes());
        let body = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(network_id);
        hasher.update(&body);
        Ok(hasher.finalize().into())
    }

    /// Hex form of [`Transaction::hash`].
    ///
    /// # Errors
    ///
    /// Returns error if the transaction cannot be serialized.
    pub fn tx_hash(&self, network_passphrase: &str) -> Result<TxHash> {
        Ok(TxHash(hex::encode(self.hash(network_passphrase)?)))
    }

    /// Wrap in an envelope with no signatures.
    #[must_use]
    pub fn into_envelope(self) -> TransactionEnvelope {
        TransactionEnvelope {
            tx: self,
            signatures: Vec::new(),
        }
    }
}

/// An ed25519 signature with the signer's key hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    /// Hex of the last four bytes of the signer's public key.
    pub hint: String,
    /// Hex signature.
    pub signature: String,
}

/// A transaction plus its signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    /// The transaction.
    pub tx: Transaction,
    /// Signatures collected so far.
    #[serde(default)]
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    /// Encode for transport.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_payload(&self) -> Result<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    /// Decode a transport payload.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not base64 or not an envelope.
    pub fn from_payload(payload: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| SparkError::invalid_argument(format!("payload is not base64: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Builder for a single contract call.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    source: Address,
    sequence: u64,
    fee: u64,
    timeout: Duration,
}

impl TransactionBuilder {
    /// Start a transaction from `source` using `sequence`.
    #[must_use]
    pub fn new(source: Address, sequence: u64) -> Self {
        Self {
            source,
            sequence,
            fee: BASE_FEE,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the base fee.
    #[must_use]
    pub const fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Set the validity window.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finish with a contract call.
    #[must_use]
    pub fn invoke(self, contract: Address, function: impl Into<String>, args: Vec<ScVal>) -> Transaction {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        Transaction {
            source: self.source,
            sequence: self.sequence,
            fee: self.fee,
            max_time: now.saturating_add(self.timeout.as_secs()),
            operation: InvokeContract {
                contract,
                function: function.into(),
                args,
            },
            soroban_data: None,
        }
    }
}
