//! Scripted ledger and wallet for unit tests.

use crate::address::{Address, AddressKind};
use crate::config::NetworkConfig;
use crate::rpc::{
    AccountInfo, GetTransactionResponse, LedgerRpc, SendResponse, SendStatus, SimulateResponse,
    SimulateResult, TransportError, TxStatus,
};
use crate::transaction::{Footprint, SorobanData, Transaction, TransactionEnvelope, TxHash};
use crate::value::ScVal;
use crate::wallet::{AddressResponse, KeypairWallet, Wallet, WalletError, WalletFuture};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A valid configuration pointing at a gateway nothing listens on.
pub fn config() -> NetworkConfig {
    NetworkConfig {
        rpc_url: "https://gateway.sparknet.test/rpc".into(),
        contract_id: Address::from_key(AddressKind::Contract, &[2; 32]).to_string(),
        token_id: Address::from_key(AddressKind::Contract, &[3; 32]).to_string(),
        ..NetworkConfig::default()
    }
}

/// Shared call log, so ledger and wallet calls interleave in one sequence.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct State {
    returns: HashMap<String, serde_json::Value>,
    simulate_failures: HashMap<String, String>,
    execution_failures: HashMap<String, String>,
    send_rejections: HashMap<String, String>,
    submitted: HashMap<TxHash, String>,
    sent: Vec<TransactionEnvelope>,
    simulated: Vec<Transaction>,
    pending_polls: u32,
    flaky_polls: u32,
    never_settle: bool,
    offline: bool,
}

/// In-memory ledger that answers from a script and records every call.
pub struct MockLedger {
    state: Mutex<State>,
    log: CallLog,
}

impl MockLedger {
    pub const ACCOUNT_SEQUENCE: u64 = 41;
    pub const RESOURCE_FEE: u64 = 2_500;
    pub const LATEST_LEDGER: u32 = 500_000;

    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Number of log entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.log.lock().iter().filter(|c| c.as_str() == entry).count()
    }

    pub fn sent(&self) -> Vec<TransactionEnvelope> {
        self.state.lock().sent.clone()
    }

    pub fn simulated(&self) -> Vec<Transaction> {
        self.state.lock().simulated.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    /// Return value for both simulation and execution of `function`.
    pub fn set_return(&self, function: &str, value: ScVal) {
        let json = serde_json::to_value(&value).expect("ledger value serializes");
        self.set_raw_return(function, json);
    }

    /// Return value exactly as the gateway would put it on the wire.
    pub fn set_raw_return(&self, function: &str, json: serde_json::Value) {
        self.state.lock().returns.insert(function.to_string(), json);
    }

    pub fn fail_simulation(&self, function: &str, diagnostic: &str) {
        self.state
            .lock()
            .simulate_failures
            .insert(function.to_string(), diagnostic.to_string());
    }

    pub fn fail_execution(&self, function: &str, diagnostic: &str) {
        self.state
            .lock()
            .execution_failures
            .insert(function.to_string(), diagnostic.to_string());
    }

    pub fn reject_send(&self, function: &str, diagnostic: &str) {
        self.state
            .lock()
            .send_rejections
            .insert(function.to_string(), diagnostic.to_string());
    }

    /// Answer `NOT_FOUND` this many times before the final status.
    pub fn set_pending_polls(&self, polls: u32) {
        self.state.lock().pending_polls = polls;
    }

    /// Fail this many status checks at the transport level.
    pub fn set_flaky_polls(&self, polls: u32) {
        self.state.lock().flaky_polls = polls;
    }

    pub fn never_settle(&self, never: bool) {
        self.state.lock().never_settle = never;
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().push(entry.into());
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if self.state.lock().offline {
            return Err(TransportError::new("connection refused"));
        }
        Ok(())
    }
}

impl LedgerRpc for MockLedger {
    async fn get_account(&self, address: &Address) -> Result<AccountInfo, TransportError> {
        self.record("get_account");
        self.check_online()?;
        Ok(AccountInfo {
            id: address.clone(),
            sequence: Self::ACCOUNT_SEQUENCE,
        })
    }

    async fn get_latest_ledger(&self) -> Result<u32, TransportError> {
        self.record("get_latest_ledger");
        self.check_online()?;
        Ok(Self::LATEST_LEDGER)
    }

    async fn simulate_transaction(&self, tx: &Transaction) -> Result<SimulateResponse, TransportError> {
        let function = tx.operation.function.clone();
        self.record(format!("simulate:{function}"));
        self.check_online()?;

        let mut state = self.state.lock();
        state.simulated.push(tx.clone());
        if let Some(error) = state.simulate_failures.get(&function) {
            return Ok(SimulateResponse {
                latest_ledger: Self::LATEST_LEDGER,
                error: Some(error.clone()),
                result: None,
                transaction_data: None,
                min_resource_fee: None,
            });
        }
        let retval = state
            .returns
            .get(&function)
            .cloned()
            .unwrap_or_else(|| serde_json::json!("void"));
        Ok(SimulateResponse {
            latest_ledger: Self::LATEST_LEDGER,
            error: None,
            result: Some(SimulateResult { retval }),
            transaction_data: Some(SorobanData {
                footprint: Footprint {
                    read_only: vec![format!("{}:instance", tx.operation.contract)],
                    read_write: vec![],
                },
                resource_fee: Self::RESOURCE_FEE,
                auth: vec![],
            }),
            min_resource_fee: Some(Self::RESOURCE_FEE),
        })
    }

    async fn send_transaction(&self, signed_payload: &str) -> Result<SendResponse, TransportError> {
        let envelope = TransactionEnvelope::from_payload(signed_payload)
            .map_err(|e| TransportError::new(e.to_string()))?;
        let function = envelope.tx.operation.function.clone();
        self.record(format!("send:{function}"));
        self.check_online()?;

        let mut state = self.state.lock();
        let hash = TxHash::from_hex(format!("{:064x}", state.sent.len() + 1));
        state.sent.push(envelope);
        if let Some(diagnostic) = state.send_rejections.get(&function) {
            return Ok(SendResponse {
                hash,
                status: SendStatus::Error,
                error_result: Some(diagnostic.clone()),
            });
        }
        state.submitted.insert(hash.clone(), function);
        Ok(SendResponse {
            hash,
            status: SendStatus::Pending,
            error_result: None,
        })
    }

    async fn get_transaction(&self, hash: &TxHash) -> Result<GetTransactionResponse, TransportError> {
        self.record("get_transaction");
        self.check_online()?;

        let mut state = self.state.lock();
        if state.flaky_polls > 0 {
            state.flaky_polls -= 1;
            return Err(TransportError::new("upstream timed out"));
        }
        let pending = GetTransactionResponse {
            status: TxStatus::NotFound,
            ledger: None,
            return_value: None,
            error: None,
        };
        if state.never_settle {
            return Ok(pending);
        }
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
            return Ok(pending);
        }

        let Some(function) = state.submitted.get(hash).cloned() else {
            return Ok(pending);
        };
        if let Some(error) = state.execution_failures.get(&function) {
            return Ok(GetTransactionResponse {
                status: TxStatus::Failed,
                ledger: Some(Self::LATEST_LEDGER + 1),
                return_value: None,
                error: Some(error.clone()),
            });
        }
        Ok(GetTransactionResponse {
            status: TxStatus::Success,
            ledger: Some(Self::LATEST_LEDGER + 1),
            return_value: state.returns.get(&function).cloned(),
            error: None,
        })
    }
}

/// Local keypair wallet that logs each signature request.
pub struct MockWallet {
    inner: KeypairWallet,
    log: CallLog,
    declined: AtomicBool,
    signs: AtomicU32,
}

impl MockWallet {
    pub fn new(log: CallLog) -> Self {
        Self::with_seed(log, [7; 32])
    }

    pub fn with_seed(log: CallLog, seed: [u8; 32]) -> Self {
        Self {
            inner: KeypairWallet::from_seed(&seed),
            log,
            declined: AtomicBool::new(false),
            signs: AtomicU32::new(0),
        }
    }

    pub fn address(&self) -> &Address {
        self.inner.address()
    }

    pub fn decline(&self, declined: bool) {
        self.declined.store(declined, Ordering::SeqCst);
    }

    pub fn sign_count(&self) -> u32 {
        self.signs.load(Ordering::SeqCst)
    }
}

impl Wallet for MockWallet {
    fn is_allowed(&self) -> WalletFuture<'_, Result<bool, WalletError>> {
        Box::pin(async { Ok(true) })
    }

    fn request_access(&self) -> WalletFuture<'_, Result<(), WalletError>> {
        Box::pin(async { Ok(()) })
    }

    fn get_address(&self) -> WalletFuture<'_, AddressResponse> {
        Box::pin(async move {
            AddressResponse {
                address: self.inner.address().to_string(),
                error: None,
            }
        })
    }

    fn sign_transaction<'a>(
        &'a self,
        payload: &'a str,
        network_passphrase: &'a str,
    ) -> WalletFuture<'a, Result<String, WalletError>> {
        Box::pin(async move {
            let function = TransactionEnvelope::from_payload(payload)
                .map(|e| e.tx.operation.function)
                .unwrap_or_default();
            self.log.lock().push(format!("sign:{function}"));
            self.signs.fetch_add(1, Ordering::SeqCst);
            if self.declined.load(Ordering::SeqCst) {
                return Err(WalletError::new("user declined the request"));
            }
            self.inner
                .sign_payload(payload, network_passphrase)
                .map_err(|e| WalletError::new(e.to_string()))
        })
    }
}
