//! Process-wide configuration, built once at startup and injected into the
//! handler. Handlers never read ambient environment state.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use url::Url;

use crate::cli::Cli;
use crate::error::GatekeeperError;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Origin base URL with no trailing slash.
    pub origin: Url,
    pub username: String,
    pub password: String,
    /// Key-pair identifier carried in the `Key-Pair-Id` query parameter.
    pub key_pair_id: String,
    /// PEM-encoded RSA private key.
    pub private_key_pem: String,
}

impl GatewayConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, GatekeeperError> {
        let origin = cli.origin.trim_end_matches('/');
        let origin = Url::parse(origin).map_err(|err| {
            GatekeeperError::Configuration(format!(
                "Failed to parse origin '{}': {}",
                cli.origin, err
            ))
        })?;

        // PRIVATE_KEY_B64 takes precedence over PRIVATE_KEY when set.
        let private_key_pem = match &cli.private_key_b64 {
            Some(encoded) => {
                let decoded = BASE64.decode(encoded.trim()).map_err(|err| {
                    GatekeeperError::Configuration(format!(
                        "Failed to decode PRIVATE_KEY_B64: {}",
                        err
                    ))
                })?;
                String::from_utf8(decoded).map_err(|err| {
                    GatekeeperError::Configuration(format!(
                        "PRIVATE_KEY_B64 did not decode to UTF-8: {}",
                        err
                    ))
                })?
            }
            None => cli.private_key.clone(),
        };

        if private_key_pem.trim().is_empty() {
            return Err(GatekeeperError::Configuration(
                "No private key supplied, set PRIVATE_KEY or PRIVATE_KEY_B64".to_string(),
            ));
        }

        Ok(Self {
            origin,
            username: cli.username.clone(),
            password: cli.password.clone(),
            key_pair_id: cli.public_key.clone(),
            private_key_pem,
        })
    }

    /// Origin base as a string with no trailing slash, ready for path
    /// concatenation.
    pub fn origin_base(&self) -> String {
        self.origin.as_str().trim_end_matches('/').to_string()
    }
}
