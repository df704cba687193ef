//! Ledger addresses in strkey form.
//!
//! Accounts start with `G`, contracts with `C`, secret seeds with `S`.
//! Encoding and checksums are handled by `stellar-strkey`.

use crate::error::{Result, SparkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stellar_strkey::{Contract, Strkey, ed25519};

const KEY_LEN: usize = 32;

/// Kind of entity an address refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// A user account (`G…`), backed by an ed25519 public key.
    Account,
    /// A deployed contract (`C…`).
    Contract,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Contract => write!(f, "contract"),
        }
    }
}

/// A validated account or contract address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse a strkey address.
    ///
    /// # Errors
    ///
    /// Returns error on bad length, alphabet, version byte, or checksum.
    pub fn parse(s: &str) -> Result<Self> {
        match decode(s)? {
            Strkey::PublicKeyEd25519(_) | Strkey::Contract(_) => Ok(Self(s.to_string())),
            Strkey::PrivateKeyEd25519(_) => Err(SparkError::invalid_address(
                "secret seed given where an address was expected",
            )),
            _ => Err(SparkError::invalid_address(format!(
                "{s} is neither an account nor a contract"
            ))),
        }
    }

    /// Build an address from a raw 32-byte key.
    #[must_use]
    pub fn from_key(kind: AddressKind, key: &[u8; KEY_LEN]) -> Self {
        let encoded = match kind {
            AddressKind::Account => Strkey::PublicKeyEd25519(ed25519::PublicKey(*key)),
            AddressKind::Contract => Strkey::Contract(Contract(*key)),
        };
        Self(encoded.to_string())
    }

    /// The kind of entity this address refers to.
    #[must_use]
    pub fn kind(&self) -> AddressKind {
        if self.0.starts_with('C') {
            AddressKind::Contract
        } else {
            AddressKind::Account
        }
    }

    /// Whether this is a contract address.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        self.kind() == AddressKind::Contract
    }

    /// The raw 32-byte key.
    #[must_use]
    pub fn key(&self) -> [u8; KEY_LEN] {
        // Validated at construction, so decoding cannot fail.
        match decode(&self.0) {
            Ok(Strkey::PublicKeyEd25519(ed25519::PublicKey(key)) | Strkey::Contract(Contract(key))) => key,
            _ => [0; KEY_LEN],
        }
    }

    /// Get the strkey string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = SparkError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Encode an ed25519 secret seed as an `S…` strkey.
#[must_use]
pub fn encode_secret_seed(seed: &[u8; KEY_LEN]) -> String {
    Strkey::PrivateKeyEd25519(ed25519::PrivateKey(*seed)).to_string()
}

/// Decode an `S…` strkey into an ed25519 secret seed.
///
/// # Errors
///
/// Returns error if the string is not a valid secret seed.
pub fn decode_secret_seed(s: &str) -> Result<[u8; KEY_LEN]> {
    match decode(s.trim())? {
        Strkey::PrivateKeyEd25519(ed25519::PrivateKey(seed)) => Ok(seed),
        _ => Err(SparkError::invalid_address("not a secret seed")),
    }
}

fn decode(s: &str) -> Result<Strkey> {
    Strkey::from_string(s).map_err(|e| SparkError::invalid_address(format!("{s:?}: {e}")))
}
