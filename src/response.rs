//! Canonical response shapes.
//!
//! Every response the gatekeeper emits, success or failure, carries the same
//! CORS pair so browsers can follow rewritten manifest references.

use http::StatusCode;
use http_body_util::Full;
use hyper::Response;
use hyper::body::Bytes;
use serde::Serialize;

use crate::constants::{
    BASIC_CHALLENGE, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN, CORS_MAX_AGE,
    MANIFEST_CONTENT_TYPE,
};

#[derive(Serialize)]
struct ErrorBody<'a> {
    reason: &'a str,
}

/// 200 with the rewritten manifest text.
pub fn manifest_response(body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", MANIFEST_CONTENT_TYPE)
        .header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// JSON error with a `reason` body when a message is supplied, code-only
/// otherwise.
pub fn error_response(status: StatusCode, message: Option<&str>) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS);
    let body = match message {
        Some(reason) => Bytes::from(
            serde_json::to_vec(&ErrorBody { reason }).unwrap_or_else(|_| b"{}".to_vec()),
        ),
        None => Bytes::new(),
    };
    builder
        .body(Full::new(body))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// 401 with the Basic challenge header.
pub fn unauthorized_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("WWW-Authenticate", BASIC_CHALLENGE)
        .header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// 204 preflight with the static CORS headers, no body.
pub fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
        .header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
        .header("Access-Control-Max-Age", CORS_MAX_AGE)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
