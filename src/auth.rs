//! HTTP Basic Authentication for multivariant manifest requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::GatewayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    Authenticated,
    Unauthenticated,
}

/// Tokenized `authorization` header. Absent, malformed and unsupported-scheme
/// are distinct conditions so each gets its own 401 shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthHeader {
    Missing,
    Malformed,
    UnsupportedScheme(String),
    Basic { username: String, password: String },
}

/// Tokenize the `authorization` header into scheme and credentials.
///
/// A Basic value with no `:` separator yields an empty password rather than
/// an error; the authenticator rejects it like any other bad credential.
pub fn parse_authorization(headers: &HeaderMap) -> AuthHeader {
    let value = match headers.get(http::header::AUTHORIZATION) {
        Some(value) => value,
        None => return AuthHeader::Missing,
    };
    let value = match value.to_str() {
        Ok(value) => value,
        Err(_) => return AuthHeader::Malformed,
    };

    let (scheme, encoded) = match value.split_once(' ') {
        Some((scheme, encoded)) => (scheme, encoded.trim()),
        None => return AuthHeader::Malformed,
    };

    // Scheme comparison is case-sensitive, "basic" is not accepted.
    if scheme != "Basic" {
        return AuthHeader::UnsupportedScheme(scheme.to_string());
    }

    let decoded = match BASE64.decode(encoded) {
        Ok(decoded) => decoded,
        Err(err) => {
            debug!(error = %err, "Failed to base64-decode Basic credentials");
            return AuthHeader::Malformed;
        }
    };
    let decoded = match String::from_utf8(decoded) {
        Ok(decoded) => decoded,
        Err(_) => return AuthHeader::Malformed,
    };

    let (username, password) = match decoded.split_once(':') {
        Some((username, password)) => (username.to_string(), password.to_string()),
        None => (decoded, String::new()),
    };

    AuthHeader::Basic { username, password }
}

/// Validates credentials against the configured static pair.
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    /// Constant-time comparison against the configured credentials. Never
    /// fails, absent or malformed inputs are simply Unauthenticated.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthVerdict {
        let username_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        if bool::from(username_ok & password_ok) {
            AuthVerdict::Authenticated
        } else {
            AuthVerdict::Unauthenticated
        }
    }
}
