//! Centralized error types for the hlsgate manifest gatekeeper.

use std::net::AddrParseError;

#[derive(Debug)]
pub enum GatekeeperError {
    Configuration(String),
    Signing(String),
    MalformedUrl(String),
    /// The origin manifest fetch or rewrite failed. Carries the attempted
    /// signed URL so the 500 reason names both the error and the target.
    Upstream {
        url: String,
        message: String,
    },
    Http(String),
    Hyper(String),
    Reqwest(String),
    Io(std::io::Error),
    Other(String),
}

impl std::fmt::Display for GatekeeperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatekeeperError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            GatekeeperError::Signing(msg) => write!(f, "Signing Error: {}", msg),
            GatekeeperError::MalformedUrl(msg) => write!(f, "Malformed URL: {}", msg),
            GatekeeperError::Upstream { url, message } => write!(f, "{}: {}", message, url),
            GatekeeperError::Http(msg) => write!(f, "HTTP Response Error: {}", msg),
            GatekeeperError::Hyper(msg) => write!(f, "Hyper HTTP Error: {}", msg),
            GatekeeperError::Reqwest(msg) => write!(f, "Upstream Request Error: {}", msg),
            GatekeeperError::Io(err) => write!(f, "IO Error: {:?}", err),
            GatekeeperError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GatekeeperError {}

impl From<std::io::Error> for GatekeeperError {
    fn from(err: std::io::Error) -> Self {
        GatekeeperError::Io(err)
    }
}

impl From<http::Error> for GatekeeperError {
    fn from(err: http::Error) -> Self {
        GatekeeperError::Http(err.to_string())
    }
}

impl From<hyper::Error> for GatekeeperError {
    fn from(err: hyper::Error) -> Self {
        GatekeeperError::Hyper(err.to_string())
    }
}

impl From<reqwest::Error> for GatekeeperError {
    fn from(err: reqwest::Error) -> Self {
        GatekeeperError::Reqwest(err.to_string())
    }
}

impl From<url::ParseError> for GatekeeperError {
    fn from(err: url::ParseError) -> Self {
        GatekeeperError::MalformedUrl(err.to_string())
    }
}

impl From<AddrParseError> for GatekeeperError {
    fn from(err: AddrParseError) -> Self {
        GatekeeperError::Other(err.to_string())
    }
}

impl GatekeeperError {
    pub fn other(error: &impl ToString) -> Self {
        GatekeeperError::Other(error.to_string())
    }
}
