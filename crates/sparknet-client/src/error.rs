//! Error types for SparkNet client operations.
//!
//! Every failure at an external boundary (RPC, wallet, codec) is re-raised as
//! one of these kinds with the raw diagnostic attached.

use thiserror::Error;

/// Result type alias for SparkNet operations.
pub type Result<T> = std::result::Result<T, SparkError>;

/// Errors raised while converting between native values and ledger values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The ledger value uses a tag with no native counterpart.
    #[error("unsupported value type: {tag}")]
    Unsupported {
        /// The ledger tag that was encountered.
        tag: String,
    },

    /// The value is structurally invalid.
    #[error("malformed value: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },

    /// The value decoded fine but has the wrong shape for the caller.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected native type.
        expected: &'static str,
        /// Type that was actually present.
        found: &'static str,
    },

    /// A struct field is missing from a decoded map.
    #[error("missing field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },
}

impl CodecError {
    /// Create a malformed value error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Errors that can occur during SparkNet client operations.
#[derive(Debug, Error)]
pub enum SparkError {
    /// Pre-flight simulation rejected the call. No fee or signature was spent.
    #[error("simulation of {function} failed: {diagnostic}")]
    Simulation {
        /// Contract function being invoked.
        function: String,
        /// Raw diagnostic from the ledger.
        diagnostic: String,
    },

    /// The wallet declined or failed to sign.
    #[error("signing failed: {message}")]
    Signing {
        /// Wallet diagnostic.
        message: String,
    },

    /// The network rejected the signed transaction on submission.
    #[error("submission failed: {diagnostic}")]
    Submission {
        /// Transaction hash, if the network returned one.
        hash: Option<String>,
        /// Raw diagnostic from the ledger.
        diagnostic: String,
    },

    /// No terminal status was observed before the deadline.
    #[error("timeout: transaction {hash} not final after {timeout_secs} seconds")]
    Timeout {
        /// Transaction hash.
        hash: String,
        /// Configured deadline.
        timeout_secs: u64,
    },

    /// The transaction reached a terminal failure status.
    #[error("transaction {hash} failed: {diagnostic}")]
    Execution {
        /// Transaction hash.
        hash: String,
        /// Raw diagnostic from the ledger.
        diagnostic: String,
    },

    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No wallet is connected, or the wallet refused to connect.
    #[error("wallet not connected: {message}")]
    Connection {
        /// Description of the connection problem.
        message: String,
    },

    /// The operation was cancelled by its caller.
    #[error("cancelled: {operation}")]
    Cancelled {
        /// Operation that was cancelled.
        operation: String,
    },

    /// Invalid ledger address.
    #[error("invalid address: {message}")]
    InvalidAddress {
        /// Description of the address error.
        message: String,
    },

    /// Invalid amount.
    #[error("invalid amount: {message}")]
    InvalidAmount {
        /// Description of the amount error.
        message: String,
    },

    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument error.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SparkError {
    /// Create a simulation error.
    #[must_use]
    pub fn simulation(function: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::Simulation {
            function: function.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Create an invalid amount error.
    #[must_use]
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether a caller may transparently retry the operation.
    ///
    /// Signing and execution failures need fresh user intent and are never
    /// retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Submission { .. } | Self::Timeout { .. })
    }
}
