//! Local keypair generation.

use std::io::Write;

use sparknet_client::KeypairWallet;

use crate::error::CliError;
use crate::output::{KeyPairInfo, OutputFormat};

/// Keygen command executor.
#[derive(Debug, Default)]
pub struct KeygenCommand;

impl KeygenCommand {
    /// Generate a keypair and print its address and secret seed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let wallet = KeypairWallet::generate();
        format.write(
            writer,
            &KeyPairInfo {
                address: wallet.address().to_string(),
                secret: wallet.secret(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn keygen_json_roundtrips() {
        let mut out = Vec::new();
        KeygenCommand
            .execute(&mut out, &OutputFormat::new(Format::Json))
            .expect("keygen");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
        let secret = json["secret"].as_str().expect("secret");
        let wallet = KeypairWallet::from_secret(secret).expect("valid seed");
        assert_eq!(json["address"].as_str(), Some(wallet.address().as_str()));
    }
}
