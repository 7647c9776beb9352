//! Dispatcher and manifest-handler tests against a mock rewriter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::Request;
use url::Url;

use crate::error::GatekeeperError;
use crate::handlers::GatewayHandler;
use crate::logging::setup_test_logging;
use crate::rewriter::{ManifestRewriter, SignFn, rewrite_manifest};
use crate::signer::UrlSigner;
use crate::tests::{TEST_PASSWORD, TEST_USERNAME, test_config};

const MULTIVARIANT: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1280000
media_1.m3u8
";

/// In-memory stand-in for the fetch-and-rewrite collaborator: rewrites a
/// canned manifest with the real line walker and records what it was asked
/// to fetch.
struct StaticRewriter {
    manifest: String,
    fail_with: Option<String>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl StaticRewriter {
    fn new(manifest: &str) -> Arc<Self> {
        Arc::new(Self {
            manifest: manifest.to_string(),
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            manifest: String::new(),
            fail_with: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl ManifestRewriter for StaticRewriter {
    async fn rewrite_multivariant(
        &self,
        url: &Url,
        sign: SignFn<'_>,
    ) -> Result<String, GatekeeperError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((url.to_string(), None));
        if let Some(message) = &self.fail_with {
            return Err(GatekeeperError::Other(message.clone()));
        }
        rewrite_manifest(&self.manifest, None, sign)
    }

    async fn rewrite_media_playlist(
        &self,
        url: &Url,
        base_url: &Url,
        sign: SignFn<'_>,
    ) -> Result<String, GatekeeperError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((url.to_string(), Some(base_url.to_string())));
        if let Some(message) = &self.fail_with {
            return Err(GatekeeperError::Other(message.clone()));
        }
        rewrite_manifest(&self.manifest, Some(base_url), sign)
    }
}

fn handler_with(rewriter: Arc<StaticRewriter>) -> GatewayHandler {
    let config = Arc::new(test_config("https://origin.example"));
    let signer = Arc::new(UrlSigner::new(&config).expect("Failed to build signer"));
    GatewayHandler::new(config, signer, rewriter)
}

fn request(method: &str, uri: &str, auth: Option<&str>) -> Request<()> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = auth {
        builder = builder.header("authorization", value);
    }
    builder.body(()).expect("Failed to build test request")
}

fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", username, password))
    )
}

async fn body_string(response: hyper::Response<http_body_util::Full<hyper::body::Bytes>>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8")
}

fn reason(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).expect("Body should be JSON");
    value["reason"]
        .as_str()
        .expect("Body should carry a reason")
        .to_string()
}

#[tokio::test]
async fn test_options_is_preflight() {
    setup_test_logging();
    let handler = handler_with(StaticRewriter::new(MULTIVARIANT));

    let response = handler
        .handle_request(request("OPTIONS", "/anything/at/all", None))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers["Access-Control-Allow-Origin"], "*");
    assert_eq!(headers["Access-Control-Allow-Methods"], "POST, GET, OPTIONS");
    assert_eq!(headers["Access-Control-Allow-Headers"], "Content-Type, Origin");
    assert_eq!(headers["Access-Control-Max-Age"], "86400");
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_non_manifest_path_is_not_found() {
    let handler = handler_with(StaticRewriter::new(MULTIVARIANT));

    let response = handler
        .handle_request(request("GET", "/favicon.ico", None))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
    let body = body_string(response).await;
    assert_eq!(reason(&body), "Resource not found");
}

#[tokio::test]
async fn test_non_get_manifest_is_not_found() {
    let handler = handler_with(StaticRewriter::new(MULTIVARIANT));

    let response = handler
        .handle_request(request("POST", "/show/master.m3u8", None))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multivariant_without_auth_is_challenged() {
    let handler = handler_with(StaticRewriter::new(MULTIVARIANT));

    let response = handler
        .handle_request(request("GET", "/show/master.m3u8", None))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response.headers()["WWW-Authenticate"]
        .to_str()
        .expect("Challenge should be a string");
    assert!(
        challenge.starts_with("Basic"),
        "Challenge should name the Basic scheme, got {}",
        challenge
    );
}

#[tokio::test]
async fn test_unsupported_scheme_is_named_in_reason() {
    let handler = handler_with(StaticRewriter::new(MULTIVARIANT));

    let response = handler
        .handle_request(request("GET", "/show/master.m3u8", Some("Bearer token123")))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(
        reason(&body).contains("Bearer"),
        "Reason should name the offending scheme, got {}",
        body
    );
}

#[tokio::test]
async fn test_wrong_credentials_are_unauthorized_not_error() {
    let handler = handler_with(StaticRewriter::new(MULTIVARIANT));

    let response = handler
        .handle_request(request(
            "GET",
            "/show/master.m3u8",
            Some(&basic_auth("wrong", "wrong")),
        ))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("WWW-Authenticate"));
}

#[tokio::test]
async fn test_multivariant_success() {
    let rewriter = StaticRewriter::new(MULTIVARIANT);
    let handler = handler_with(rewriter.clone());

    let response = handler
        .handle_request(request(
            "GET",
            "/show/master.m3u8",
            Some(&basic_auth(TEST_USERNAME, TEST_PASSWORD)),
        ))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["Content-Type"], "application/x-mpegURL");

    let body = body_string(response).await;
    assert!(
        body.contains("media_1.m3u8?Expires="),
        "Variant reference should carry signature params, got:\n{}",
        body
    );
    assert!(body.contains("&Signature="));
    assert!(body.contains("&Key-Pair-Id="));

    // The fetched URL is the signed origin manifest.
    let calls = rewriter.calls();
    assert_eq!(calls.len(), 1);
    assert!(
        calls[0]
            .0
            .starts_with("https://origin.example/show/master.m3u8?Expires="),
        "Fetch should target the signed origin URL, got {}",
        calls[0].0
    );
}

#[tokio::test]
async fn test_upstream_failure_names_error_and_url() {
    let handler = handler_with(StaticRewriter::failing("ECONNRESET"));

    let response = handler
        .handle_request(request(
            "GET",
            "/show/master.m3u8",
            Some(&basic_auth(TEST_USERNAME, TEST_PASSWORD)),
        ))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    let reason = reason(&body);
    assert!(
        reason.contains("ECONNRESET"),
        "Reason should contain the upstream error, got {}",
        reason
    );
    assert!(
        reason.contains("https://origin.example/show/master.m3u8"),
        "Reason should contain the attempted signed URL, got {}",
        reason
    );
}

#[tokio::test]
async fn test_media_playlist_reuses_request_signature() {
    let rewriter = StaticRewriter::new("#EXTM3U\nseg_1.ts\n");
    let handler = handler_with(rewriter.clone());

    let response = handler
        .handle_request(request(
            "GET",
            "/show/media_1.m3u8?Expires=1700000000&Signature=abc&Key-Pair-Id=KTEST",
            None,
        ))
        .await
        .expect("Handler is infallible");

    assert_eq!(response.status(), StatusCode::OK);

    // No new top-level signature: the origin URL is path plus the original
    // query string, and relative segments resolve against the origin prefix.
    let calls = rewriter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0,
        "https://origin.example/show/media_1.m3u8?Expires=1700000000&Signature=abc&Key-Pair-Id=KTEST"
    );
    assert_eq!(
        calls[0].1.as_deref(),
        Some("https://origin.example/show/")
    );
}

#[tokio::test]
async fn test_rewrite_round_trip() {
    let rewriter = StaticRewriter::new(MULTIVARIANT);
    let handler = handler_with(rewriter.clone());

    let response = handler
        .handle_request(request(
            "GET",
            "/show/master.m3u8",
            Some(&basic_auth(TEST_USERNAME, TEST_PASSWORD)),
        ))
        .await
        .expect("Handler is infallible");
    let body = body_string(response).await;

    // Follow the rewritten variant reference the way a client would.
    let rewritten = body
        .lines()
        .find(|line| line.starts_with("media_1.m3u8?"))
        .expect("Rewrite should produce a signed variant line");
    let query = rewritten
        .split_once('?')
        .expect("Rewritten line should carry a query")
        .1;

    let response = handler
        .handle_request(request(
            "GET",
            &format!("/show/media_1.m3u8?{}", query),
            None,
        ))
        .await
        .expect("Handler is infallible");
    assert_eq!(response.status(), StatusCode::OK);

    // Stripping the signature params from the reconstructed origin URL must
    // give back exactly origin + directory + URI.
    let calls = rewriter.calls();
    let fetched = Url::parse(&calls[1].0).expect("Fetched URL should parse");
    let mut stripped = fetched.clone();
    stripped.set_query(None);
    {
        let mut pairs = stripped.query_pairs_mut();
        for (key, value) in fetched.query_pairs() {
            if !matches!(&*key, "Expires" | "Signature" | "Key-Pair-Id") {
                pairs.append_pair(&key, &value);
            }
        }
    }
    let stripped = stripped.as_str().trim_end_matches('?');
    assert_eq!(stripped, "https://origin.example/show/media_1.m3u8");
}
