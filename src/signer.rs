//! Signed origin URLs.
//!
//! Mints CloudFront-style canned-policy signed URLs: an RSA-SHA1 signature
//! over a policy document naming the resource and its expiry, carried in the
//! `Expires`, `Signature` and `Key-Pair-Id` query parameters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use serde_json::json;
use sha1::Sha1;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::GatekeeperError;

/// A URL augmented with the query parameters the origin validates.
#[derive(Debug, Clone)]
pub struct SignedUrl {
    pub url: Url,
    /// Absolute expiry in epoch milliseconds, fixed at creation.
    pub expires_at_ms: i64,
    /// The signature parameters, in the order they were appended.
    pub params: Vec<(String, String)>,
}

pub struct UrlSigner {
    key_pair_id: String,
    signing_key: SigningKey<Sha1>,
    origin_base: String,
}

impl UrlSigner {
    /// Fails when the key material is absent or unparseable. Callers treat
    /// this as fatal at startup, before the listener binds.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatekeeperError> {
        let pem = config.private_key_pem.as_str();
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|err| {
                GatekeeperError::Signing(format!("Failed to parse RSA private key: {}", err))
            })?;

        if config.key_pair_id.is_empty() {
            return Err(GatekeeperError::Signing(
                "No key-pair identifier supplied, set PUBLIC_KEY".to_string(),
            ));
        }

        Ok(Self {
            key_pair_id: config.key_pair_id.clone(),
            signing_key: SigningKey::<Sha1>::new(private_key),
            origin_base: config.origin_base(),
        })
    }

    /// Sign an absolute URL for the given validity window.
    ///
    /// The expiry is computed from wall-clock time at call time, so every
    /// call gets an independently fresh window.
    pub fn sign(&self, target: &str, expires_in_secs: u64) -> Result<SignedUrl, GatekeeperError> {
        if expires_in_secs == 0 {
            return Err(GatekeeperError::Signing(
                "Expiry window must be positive".to_string(),
            ));
        }
        let mut url = Url::parse(target)
            .map_err(|err| GatekeeperError::MalformedUrl(format!("{}: {}", err, target)))?;

        let expires_at_ms = Utc::now().timestamp_millis() + (expires_in_secs as i64) * 1000;
        let expires_secs = expires_at_ms / 1000;

        let policy = json!({
            "Statement": [{
                "Resource": target,
                "Condition": {
                    "DateLessThan": { "AWS:EpochTime": expires_secs }
                }
            }]
        })
        .to_string();

        let signature = self.signing_key.sign(policy.as_bytes());
        let signature = cloudfront_base64(&signature.to_bytes());

        let params = vec![
            ("Expires".to_string(), expires_secs.to_string()),
            ("Signature".to_string(), signature),
            ("Key-Pair-Id".to_string(), self.key_pair_id.clone()),
        ];
        for (key, value) in &params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(SignedUrl {
            url,
            expires_at_ms,
            params,
        })
    }

    /// Sign an origin path (concatenated onto the configured origin base).
    pub fn sign_path(&self, path: &str, expires_in_secs: u64) -> Result<SignedUrl, GatekeeperError> {
        self.sign(&format!("{}{}", self.origin_base, path), expires_in_secs)
    }

    /// Just the signature parameters for a target, for appending to nested
    /// manifest references.
    pub fn sign_params(
        &self,
        target: &str,
        expires_in_secs: u64,
    ) -> Result<Vec<(String, String)>, GatekeeperError> {
        Ok(self.sign(target, expires_in_secs)?.params)
    }
}

/// CloudFront's URL-safe base64 variant: `+` becomes `-`, `=` becomes `_`
/// and `/` becomes `~`.
fn cloudfront_base64(bytes: &[u8]) -> String {
    BASE64
        .encode(bytes)
        .replace('+', "-")
        .replace('=', "_")
        .replace('/', "~")
}
