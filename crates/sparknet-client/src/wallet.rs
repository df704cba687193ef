//! Wallets, sessions, and the connection flow.
//!
//! A [`Wallet`] is whatever can approve access, reveal an address, and sign a
//! transaction payload: a browser extension bridge, a hardware signer, or the
//! local [`KeypairWallet`]. Writes never consult global state; they take an
//! explicit [`Session`].

use crate::address::{Address, AddressKind, decode_secret_seed, encode_secret_seed};
use crate::error::{Result, SparkError};
use crate::transaction::{DecoratedSignature, TransactionEnvelope};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use parking_lot::RwLock;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Boxed future returned by wallet operations.
pub type WalletFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A failure reported by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WalletError {
    /// Diagnostic text.
    pub message: String,
}

impl WalletError {
    /// Create a wallet error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reply to an address request. `error` set means the wallet is not usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressResponse {
    /// Account address, empty when `error` is set.
    pub address: String,
    /// Soft failure reported by the wallet.
    pub error: Option<String>,
}

/// An external signer.
pub trait Wallet: Send + Sync {
    /// Whether this application is already allowed to use the wallet.
    fn is_allowed(&self) -> WalletFuture<'_, std::result::Result<bool, WalletError>>;

    /// Ask the user to allow access.
    fn request_access(&self) -> WalletFuture<'_, std::result::Result<(), WalletError>>;

    /// The wallet's current account.
    fn get_address(&self) -> WalletFuture<'_, AddressResponse>;

    /// Sign `payload` for the network identified by `network_passphrase`,
    /// returning the signed payload.
    fn sign_transaction<'a>(
        &'a self,
        payload: &'a str,
        network_passphrase: &'a str,
    ) -> WalletFuture<'a, std::result::Result<String, WalletError>>;
}

/// A connected account and the signer that controls it.
#[derive(Clone)]
pub struct Session {
    public_key: Address,
    signer: Arc<dyn Wallet>,
}

impl Session {
    /// Create a session.
    #[must_use]
    pub fn new(public_key: Address, signer: Arc<dyn Wallet>) -> Self {
        Self { public_key, signer }
    }

    /// Session backed by a local keypair.
    #[must_use]
    pub fn from_keypair(wallet: KeypairWallet) -> Self {
        let public_key = wallet.address().clone();
        Self::new(public_key, Arc::new(wallet))
    }

    /// The account that signs and pays.
    #[must_use]
    pub fn public_key(&self) -> &Address {
        &self.public_key
    }

    /// The signer.
    #[must_use]
    pub fn signer(&self) -> &dyn Wallet {
        self.signer.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Connection state for one wallet.
pub struct WalletConnection {
    wallet: Arc<dyn Wallet>,
    session: RwLock<Option<Session>>,
}

impl WalletConnection {
    /// Wrap a wallet, initially disconnected.
    #[must_use]
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self {
            wallet,
            session: RwLock::new(None),
        }
    }

    /// Request access if needed and read the address.
    ///
    /// Any wallet-reported error clears the current session.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Connection`] if access is refused or the wallet
    /// reports an error.
    pub async fn connect(&self) -> Result<Session> {
        match self.try_connect().await {
            Ok(session) => {
                info!(address = %session.public_key(), "wallet connected");
                *self.session.write() = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "wallet connection failed");
                self.disconnect();
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<Session> {
        let allowed = self
            .wallet
            .is_allowed()
            .await
            .map_err(|e| SparkError::connection(e.message))?;
        if !allowed {
            self.wallet
                .request_access()
                .await
                .map_err(|e| SparkError::connection(e.message))?;
        }
        self.read_session().await
    }

    /// Reconnect silently if access was granted earlier. Never prompts.
    ///
    /// Revoked access or a wallet-reported error clears the current session.
    pub async fn restore(&self) -> Option<Session> {
        match self.wallet.is_allowed().await {
            Ok(true) => {}
            Ok(false) => {
                self.disconnect();
                return None;
            }
            Err(e) => {
                debug!(error = %e, "wallet unavailable on restore");
                return None;
            }
        }
        match self.read_session().await {
            Ok(session) => {
                *self.session.write() = Some(session.clone());
                Some(session)
            }
            Err(e) => {
                debug!(error = %e, "wallet restore failed, clearing session");
                self.disconnect();
                None
            }
        }
    }

    async fn read_session(&self) -> Result<Session> {
        let response = self.wallet.get_address().await;
        if let Some(error) = response.error {
            return Err(SparkError::connection(error));
        }
        let address = Address::parse(&response.address)
            .map_err(|e| SparkError::connection(format!("wallet returned a bad address: {e}")))?;
        Ok(Session::new(address, Arc::clone(&self.wallet)))
    }

    /// Forget the current session.
    pub fn disconnect(&self) {
        *self.session.write() = None;
    }

    /// The current session, if connected.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// The current session.
    ///
    /// # Errors
    ///
    /// Returns [`SparkError::Connection`] when disconnected.
    pub fn require_session(&self) -> Result<Session> {
        self.session()
            .ok_or_else(|| SparkError::connection("connect a wallet first"))
    }
}

impl fmt::Debug for WalletConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConnection")
            .field("session", &*self.session.read())
            .finish_non_exhaustive()
    }
}

/// A wallet holding an ed25519 key in memory.
pub struct KeypairWallet {
    signing_key: SigningKey,
    address: Address,
}

impl KeypairWallet {
    /// Generate a new random keypair.
    #[must_use]
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::from_seed(&secret)
    }

    /// Create from a raw 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let address = Address::from_key(AddressKind::Account, signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Create from an `S…` secret seed.
    ///
    /// # Errors
    ///
    /// Returns error if the seed is malformed.
    pub fn from_secret(secret: &str) -> Result<Self> {
        Ok(Self::from_seed(&decode_secret_seed(secret)?))
    }

    /// The account address.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The public key.
    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The secret seed as an `S…` strkey.
    #[must_use]
    pub fn secret(&self) -> String {
        encode_secret_seed(self.signing_key.as_bytes())
    }

    /// Sign an envelope payload in place.
    ///
    /// # Errors
    ///
    /// Returns error if the payload does not decode, or if the transaction's
    /// source is a different account.
    pub fn sign_payload(&self, payload: &str, network_passphrase: &str) -> Result<String> {
        let mut envelope = TransactionEnvelope::from_payload(payload)?;
        if envelope.tx.source != self.address {
            return Err(SparkError::signing(format!(
                "transaction source {} is not this wallet ({})",
                envelope.tx.source, self.address
            )));
        }
        let hash = envelope.tx.hash(network_passphrase)?;
        let signature = self.signing_key.sign(&hash);
        let public = self.signing_key.verifying_key();
        envelope.signatures.push(DecoratedSignature {
            hint: hex::encode(&public.as_bytes()[28..]),
            signature: hex::encode(signature.to_bytes()),
        });
        envelope.to_payload()
    }
}

impl Wallet for KeypairWallet {
    fn is_allowed(&self) -> WalletFuture<'_, std::result::Result<bool, WalletError>> {
        Box::pin(async { Ok(true) })
    }

    fn request_access(&self) -> WalletFuture<'_, std::result::Result<(), WalletError>> {
        Box::pin(async { Ok(()) })
    }

    fn get_address(&self) -> WalletFuture<'_, AddressResponse> {
        Box::pin(async move {
            AddressResponse {
                address: self.address.to_string(),
                error: None,
            }
        })
    }

    fn sign_transaction<'a>(
        &'a self,
        payload: &'a str,
        network_passphrase: &'a str,
    ) -> WalletFuture<'a, std::result::Result<String, WalletError>> {
        Box::pin(async move {
            self.sign_payload(payload, network_passphrase)
                .map_err(|e| WalletError::new(e.to_string()))
        })
    }
}

impl fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionBuilder;
    use ed25519_dalek::{Signature, Verifier};
    use std::sync::atomic::{AtomicBool, Ordering};

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    /// Scripted extension-style wallet.
    struct ScriptedWallet {
        allowed: AtomicBool,
        grant_on_request: bool,
        address: AddressResponse,
    }

    impl ScriptedWallet {
        fn new(allowed: bool, grant_on_request: bool, address: AddressResponse) -> Self {
            Self {
                allowed: AtomicBool::new(allowed),
                grant_on_request,
                address,
            }
        }
    }

    impl Wallet for ScriptedWallet {
        fn is_allowed(&self) -> WalletFuture<'_, std::result::Result<bool, WalletError>> {
            Box::pin(async move { Ok(self.allowed.load(Ordering::SeqCst)) })
        }

        fn request_access(&self) -> WalletFuture<'_, std::result::Result<(), WalletError>> {
            Box::pin(async move {
                if self.grant_on_request {
                    self.allowed.store(true, Ordering::SeqCst);
                    Ok(())
                } else {
                    Err(WalletError::new("user rejected access"))
                }
            })
        }

        fn get_address(&self) -> WalletFuture<'_, AddressResponse> {
            Box::pin(async move { self.address.clone() })
        }

        fn sign_transaction<'a>(
            &'a self,
            _payload: &'a str,
            _network_passphrase: &'a str,
        ) -> WalletFuture<'a, std::result::Result<String, WalletError>> {
            Box::pin(async { Err(WalletError::new("not implemented")) })
        }
    }

    fn good_address() -> AddressResponse {
        AddressResponse {
            address: Address::from_key(AddressKind::Account, &[5; 32]).to_string(),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_connect_requests_access() {
        let wallet = Arc::new(ScriptedWallet::new(false, true, good_address()));
        let connection = WalletConnection::new(wallet.clone());
        let session = connection.connect().await.expect("connect");
        assert_eq!(session.public_key().as_str(), good_address().address);
        assert!(wallet.allowed.load(Ordering::SeqCst));
        assert!(connection.session().is_some());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let connection = WalletConnection::new(Arc::new(ScriptedWallet::new(false, false, good_address())));
        let err = connection.connect().await.expect_err("refused");
        assert!(matches!(err, SparkError::Connection { .. }));
        assert!(connection.session().is_none());
    }

    #[tokio::test]
    async fn test_address_error_clears_session() {
        let wallet = Arc::new(ScriptedWallet::new(true, true, good_address()));
        let connection = WalletConnection::new(wallet);
        connection.connect().await.expect("connect");

        let locked = Arc::new(ScriptedWallet::new(
            true,
            true,
            AddressResponse {
                address: String::new(),
                error: Some("wallet is locked".into()),
            },
        ));
        let relocked = WalletConnection::new(locked);
        *relocked.session.write() = connection.session();
        let err = relocked.connect().await.expect_err("locked");
        assert!(err.to_string().contains("wallet is locked"));
        assert!(relocked.session().is_none());
    }

    #[tokio::test]
    async fn test_restore_never_prompts() {
        let wallet = Arc::new(ScriptedWallet::new(false, true, good_address()));
        let connection = WalletConnection::new(wallet.clone());
        assert!(connection.restore().await.is_none());
        assert!(!wallet.allowed.load(Ordering::SeqCst));

        wallet.allowed.store(true, Ordering::SeqCst);
        assert!(connection.restore().await.is_some());
    }

    #[tokio::test]
    async fn test_restore_with_address_error_clears_session() {
        let connected = WalletConnection::new(Arc::new(ScriptedWallet::new(true, true, good_address())));
        connected.connect().await.expect("connect");

        let locked = WalletConnection::new(Arc::new(ScriptedWallet::new(
            true,
            true,
            AddressResponse {
                address: String::new(),
                error: Some("wallet is locked".into()),
            },
        )));
        *locked.session.write() = connected.session();
        assert!(locked.session().is_some());

        assert!(locked.restore().await.is_none());
        assert!(locked.session().is_none());
    }

    #[tokio::test]
    async fn test_restore_after_access_revoked_clears_session() {
        let wallet = Arc::new(ScriptedWallet::new(true, true, good_address()));
        let connection = WalletConnection::new(wallet.clone());
        connection.connect().await.expect("connect");

        wallet.allowed.store(false, Ordering::SeqCst);
        assert!(connection.restore().await.is_none());
        assert!(connection.session().is_none());
    }

    #[test]
    fn test_require_session_when_disconnected() {
        let connection = WalletConnection::new(Arc::new(KeypairWallet::generate()));
        let err = connection.require_session().expect_err("disconnected");
        assert!(matches!(err, SparkError::Connection { .. }));
    }

    #[test]
    fn test_keypair_secret_roundtrip() {
        let wallet = KeypairWallet::generate();
        let restored = KeypairWallet::from_secret(&wallet.secret()).expect("restore");
        assert_eq!(restored.address(), wallet.address());
        assert!(KeypairWallet::from_secret("SBAD").is_err());
    }

    #[test]
    fn test_keypair_signs_hash() {
        let wallet = KeypairWallet::from_seed(&[9; 32]);
        let tx = TransactionBuilder::new(wallet.address().clone(), 1).invoke(
            Address::from_key(AddressKind::Contract, &[2; 32]),
            "register",
            vec![],
        );
        let payload = tx.clone().into_envelope().to_payload().expect("payload");
        let signed = wallet.sign_payload(&payload, PASSPHRASE).expect("sign");

        let envelope = TransactionEnvelope::from_payload(&signed).expect("decode");
        assert_eq!(envelope.tx, tx);
        assert_eq!(envelope.signatures.len(), 1);

        let sig_bytes: [u8; 64] = hex::decode(&envelope.signatures[0].signature)
            .expect("hex")
            .try_into()
            .expect("64 bytes");
        let hash = tx.hash(PASSPHRASE).expect("hash");
        wallet
            .public_key()
            .verify(&hash, &Signature::from_bytes(&sig_bytes))
            .expect("valid signature");
    }

    #[test]
    fn test_keypair_refuses_foreign_source() {
        let wallet = KeypairWallet::from_seed(&[9; 32]);
        let tx = TransactionBuilder::new(Address::from_key(AddressKind::Account, &[1; 32]), 1).invoke(
            Address::from_key(AddressKind::Contract, &[2; 32]),
            "register",
            vec![],
        );
        let payload = tx.into_envelope().to_payload().expect("payload");
        assert!(wallet.sign_payload(&payload, PASSPHRASE).is_err());
    }
}
