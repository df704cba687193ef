//! Ledger RPC interface and its JSON-RPC-over-HTTP implementation.
//!
//! [`HttpRpc`] talks to a JSON gateway: transactions travel as base64 JSON
//! envelopes and contract values as tagged JSON. Contract return values are
//! passed through undecoded so the caller can report an unknown value type as
//! a codec failure rather than a broken response.

use crate::address::Address;
use crate::transaction::{SorobanData, Transaction, TxHash};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// A failure talking to the RPC service itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Diagnostic text.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Account state relevant to building transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Account address.
    pub id: Address,
    /// Current sequence number.
    pub sequence: u64,
}

/// Return value of a simulated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulateResult {
    /// Return value as sent by the gateway, not yet decoded.
    pub retval: serde_json::Value,
}

/// Result of `simulateTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    /// Ledger the simulation ran against.
    #[serde(default)]
    pub latest_ledger: u32,
    /// Error diagnostic, if the simulation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Return value, if the call produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SimulateResult>,
    /// Resource data to merge before signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_data: Option<SorobanData>,
    /// Minimum resource fee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_resource_fee: Option<u64>,
}

impl SimulateResponse {
    /// Whether the simulation reported an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The simulated return value, undecoded.
    #[must_use]
    pub fn return_value(&self) -> Option<&serde_json::Value> {
        self.result.as_ref().map(|r| &r.retval)
    }
}

/// Immediate status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    /// Accepted, awaiting inclusion.
    Pending,
    /// Already submitted earlier.
    Duplicate,
    /// Node is congested.
    TryAgainLater,
    /// Rejected.
    Error,
}

impl SendStatus {
    /// Whether the network accepted the transaction for processing.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Pending | Self::Duplicate)
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Duplicate => write!(f, "DUPLICATE"),
            Self::TryAgainLater => write!(f, "TRY_AGAIN_LATER"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    /// Transaction hash.
    pub hash: TxHash,
    /// Submission status.
    pub status: SendStatus,
    /// Rejection diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_result: Option<String>,
}

/// Status reported by `getTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    /// Applied successfully.
    Success,
    /// Applied and failed.
    Failed,
    /// Not yet seen in a closed ledger.
    NotFound,
    /// Still being processed.
    Pending,
}

impl TxStatus {
    /// Whether no further change will happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

/// Result of `getTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionResponse {
    /// Current status.
    pub status: TxStatus,
    /// Ledger the transaction was applied in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u32>,
    /// Return value of the contract call, undecoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<serde_json::Value>,
    /// Failure diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The ledger RPC service.
pub trait LedgerRpc: Send + Sync {
    /// Load an account's sequence state.
    fn get_account(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<AccountInfo, TransportError>> + Send;

    /// Latest closed ledger sequence.
    fn get_latest_ledger(&self) -> impl Future<Output = Result<u32, TransportError>> + Send;

    /// Dry-run a transaction.
    fn simulate_transaction(
        &self,
        tx: &Transaction,
    ) -> impl Future<Output = Result<SimulateResponse, TransportError>> + Send;

    /// Submit a signed payload.
    fn send_transaction(
        &self,
        signed_payload: &str,
    ) -> impl Future<Output = Result<SendResponse, TransportError>> + Send;

    /// Look up a submitted transaction.
    fn get_transaction(
        &self,
        hash: &TxHash,
    ) -> impl Future<Output = Result<GetTransactionResponse, TransportError>> + Send;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestLedger {
    sequence: u32,
}

/// JSON-RPC 2.0 client over HTTP.
pub struct HttpRpc {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpc {
    /// Create a client for `url`.
    ///
    /// # Errors
    ///
    /// Returns error if `url` is plain HTTP and `allow_http` is false, or if
    /// the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, allow_http: bool, timeout: Duration) -> Result<Self, TransportError> {
        let url = url.into();
        if url.starts_with("http://") && !allow_http {
            return Err(TransportError::new(format!(
                "refusing insecure RPC endpoint {url}; enable allow_http to use it"
            )));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TransportError::new(format!("unsupported RPC URL scheme: {url}")));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::new(format!("{method}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::new(format!("{method}: HTTP {status}: {text}")));
        }

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| TransportError::new(format!("{method}: invalid response: {e}")))?;
        decode_envelope(method, envelope)
    }
}

fn decode_envelope<T>(method: &str, envelope: RpcEnvelope<T>) -> Result<T, TransportError> {
    if let Some(err) = envelope.error {
        let data = err.data.map(|d| format!(" ({d})")).unwrap_or_default();
        return Err(TransportError::new(format!(
            "{method}: rpc error {}: {}{data}",
            err.code, err.message
        )));
    }
    envelope
        .result
        .ok_or_else(|| TransportError::new(format!("{method}: response has no result")))
}

impl LedgerRpc for HttpRpc {
    async fn get_account(&self, address: &Address) -> Result<AccountInfo, TransportError> {
        self.call("getAccount", json!({ "address": address })).await
    }

    async fn get_latest_ledger(&self) -> Result<u32, TransportError> {
        let latest: LatestLedger = self.call("getLatestLedger", json!({})).await?;
        Ok(latest.sequence)
    }

    async fn simulate_transaction(&self, tx: &Transaction) -> Result<SimulateResponse, TransportError> {
        let payload = tx
            .clone()
            .into_envelope()
            .to_payload()
            .map_err(|e| TransportError::new(format!("simulateTransaction: {e}")))?;
        self.call("simulateTransaction", json!({ "transaction": payload })).await
    }

    async fn send_transaction(&self, signed_payload: &str) -> Result<SendResponse, TransportError> {
        self.call("sendTransaction", json!({ "transaction": signed_payload })).await
    }

    async fn get_transaction(&self, hash: &TxHash) -> Result<GetTransactionResponse, TransportError> {
        self.call("getTransaction", json!({ "hash": hash })).await
    }
}

impl fmt::Debug for HttpRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRpc")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::value::ScVal;
    use serde_json::Value as Json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    /// Serve one HTTP exchange on a local port. Resolves to the JSON body of
    /// the request the client sent.
    async fn serve_once(status: &'static str, body: String) -> (HttpRpc, oneshot::Receiver<Json>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut stream).await;
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("write response");
            let _ = stream.shutdown().await;
        });
        let rpc = HttpRpc::new(url, true, Duration::from_secs(5)).expect("client");
        (rpc, rx)
    }

    async fn read_request(stream: &mut TcpStream) -> Json {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.expect("read request");
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let body_start = end + 4;
            if buf.len() >= body_start + len {
                return serde_json::from_slice(&buf[body_start..body_start + len]).expect("json body");
            }
        }
    }

    fn result(result: &Json) -> String {
        serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
    }

    #[test]
    fn test_refuses_plain_http_by_default() {
        let err = HttpRpc::new("http://localhost:8000/rpc", false, Duration::from_secs(5))
            .expect_err("insecure");
        assert!(err.message.contains("allow_http"));
        assert!(HttpRpc::new("http://localhost:8000/rpc", true, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_rejects_unknown_scheme() {
        assert!(HttpRpc::new("ws://localhost", true, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(TxStatus::Success.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
        assert!(!TxStatus::NotFound.is_terminal());
        assert!(!TxStatus::Pending.is_terminal());
        assert!(SendStatus::Duplicate.is_accepted());
        assert!(!SendStatus::TryAgainLater.is_accepted());
    }

    #[test]
    fn test_parse_simulate_response() {
        let json = r#"{
            "latestLedger": 1234,
            "result": { "retval": { "vec": [] } },
            "transactionData": {
                "footprint": { "readOnly": ["a"], "readWrite": ["b"] },
                "resourceFee": 900
            },
            "minResourceFee": 950
        }"#;
        let sim: SimulateResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(sim.latest_ledger, 1234);
        assert!(!sim.is_error());
        let retval = sim.return_value().expect("retval");
        assert_eq!(ScVal::from_json(retval).expect("decode"), ScVal::Vec(vec![]));
        assert_eq!(sim.min_resource_fee, Some(950));
    }

    #[test]
    fn test_parse_statuses() {
        let send: SendResponse =
            serde_json::from_str(r#"{"hash":"ab12","status":"TRY_AGAIN_LATER"}"#).expect("parse");
        assert_eq!(send.status, SendStatus::TryAgainLater);

        let get: GetTransactionResponse =
            serde_json::from_str(r#"{"status":"NOT_FOUND"}"#).expect("parse");
        assert_eq!(get.status, TxStatus::NotFound);
        assert!(get.return_value.is_none());
    }

    #[test]
    fn test_decode_envelope_missing_result() {
        let envelope: RpcEnvelope<u32> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).expect("parse");
        assert!(decode_envelope("getLatestLedger", envelope).is_err());
    }

    #[tokio::test]
    async fn test_http_latest_ledger() {
        let (rpc, request) = serve_once(
            "200 OK",
            result(&serde_json::json!({ "id": "abc", "protocolVersion": 21, "sequence": 4242 })),
        )
        .await;

        assert_eq!(rpc.get_latest_ledger().await.expect("ledger"), 4242);
        let request = request.await.expect("request");
        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["method"], "getLatestLedger");
        assert!(request["id"].is_u64());
    }

    #[tokio::test]
    async fn test_http_send_transaction_request_shape() {
        let hash = "ab".repeat(32);
        let (rpc, request) = serve_once(
            "200 OK",
            result(&serde_json::json!({ "hash": hash, "status": "PENDING" })),
        )
        .await;

        let sent = rpc.send_transaction("eyJ0eCI6e319").await.expect("send");
        assert_eq!(sent.status, SendStatus::Pending);
        assert_eq!(sent.hash.to_string(), hash);
        let request = request.await.expect("request");
        assert_eq!(request["method"], "sendTransaction");
        assert_eq!(request["params"]["transaction"], "eyJ0eCI6e319");
    }

    #[tokio::test]
    async fn test_http_rpc_error_body() {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "invalid params", "data": "bad hash" }
        })
        .to_string();
        let (rpc, _request) = serve_once("200 OK", body).await;

        let err = rpc
            .get_transaction(&TxHash::from_hex("00".repeat(32)))
            .await
            .expect_err("rpc error");
        assert!(err.message.contains("getTransaction"));
        assert!(err.message.contains("-32602"));
        assert!(err.message.contains("invalid params"));
        assert!(err.message.contains("bad hash"));
    }

    #[tokio::test]
    async fn test_http_non_success_status() {
        let (rpc, _request) = serve_once("503 Service Unavailable", "gateway overloaded".to_string()).await;

        let err = rpc.get_latest_ledger().await.expect_err("503");
        assert!(err.message.contains("503"));
        assert!(err.message.contains("gateway overloaded"));
    }

    #[tokio::test]
    async fn test_http_unknown_return_type_is_passed_through() {
        let hash = "cd".repeat(32);
        let (rpc, request) = serve_once(
            "200 OK",
            result(&serde_json::json!({
                "status": "SUCCESS",
                "ledger": 7,
                "returnValue": { "ledger_key_nonce": { "nonce": 1 } }
            })),
        )
        .await;

        let response = rpc
            .get_transaction(&TxHash::from_hex(hash.clone()))
            .await
            .expect("response parses despite the unknown value");
        assert_eq!(response.status, TxStatus::Success);
        assert_eq!(response.ledger, Some(7));
        let raw = response.return_value.expect("return value");
        match ScVal::from_json(&raw) {
            Err(CodecError::Unsupported { tag }) => assert_eq!(tag, "ledger_key_nonce"),
            other => panic!("unexpected decode result: {other:?}"),
        }
        assert_eq!(request.await.expect("request")["params"]["hash"], hash);
    }
}
