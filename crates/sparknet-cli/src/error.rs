//! CLI error types.

use std::fmt;

use sparknet_client::{RentError, SparkError};

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// A client operation failed.
    Client(SparkError),
    /// Renting failed, possibly after the allowance was approved.
    Rent(RentError),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Client(e) => write!(f, "{e}"),
            Self::Rent(e) => write!(f, "{e}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client(e) => Some(e),
            Self::Rent(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SparkError> for CliError {
    fn from(err: SparkError) -> Self {
        match err {
            SparkError::Config { message } => Self::Config(message),
            other => Self::Client(other),
        }
    }
}

impl From<RentError> for CliError {
    fn from(err: RentError) -> Self {
        Self::Rent(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::Config("contract_id missing".into());
        assert_eq!(err.to_string(), "configuration error: contract_id missing");
    }

    #[test]
    fn cli_error_keeps_raw_diagnostic() {
        let err = CliError::from(SparkError::simulation("initialize", "HostError: Error(Contract, #1)"));
        assert!(err.to_string().contains("Error(Contract, #1)"));
    }

    #[test]
    fn cli_error_config_from_client() {
        let err = CliError::from(SparkError::config("bad url"));
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
