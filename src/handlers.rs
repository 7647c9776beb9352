//! Request classification and the manifest handlers.
//!
//! `GatewayHandler::handle_request` is the single entry point: it classifies
//! the request, gates multivariant requests behind Basic Auth, threads the
//! signer into the manifest rewriter and guarantees every code path yields a
//! well-formed response.

use std::convert::Infallible;
use std::sync::Arc;

use http::{Method, StatusCode};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use tracing::{debug, error, warn};
use url::Url;

use crate::auth::{AuthHeader, AuthVerdict, BasicAuthenticator, parse_authorization};
use crate::config::GatewayConfig;
use crate::constants::{MANIFEST_SUFFIX, SIGNED_URL_EXPIRY_SECS};
use crate::error::GatekeeperError;
use crate::response::{error_response, manifest_response, preflight_response, unauthorized_response};
use crate::rewriter::ManifestRewriter;
use crate::signer::UrlSigner;

pub struct GatewayHandler {
    config: Arc<GatewayConfig>,
    signer: Arc<UrlSigner>,
    authenticator: BasicAuthenticator,
    rewriter: Arc<dyn ManifestRewriter>,
}

impl GatewayHandler {
    pub fn new(
        config: Arc<GatewayConfig>,
        signer: Arc<UrlSigner>,
        rewriter: Arc<dyn ManifestRewriter>,
    ) -> Self {
        let authenticator = BasicAuthenticator::new(&config);
        Self {
            config,
            signer,
            authenticator,
            rewriter,
        }
    }

    /// Classify the request and dispatch it. This is the single failure
    /// boundary: handler errors become a 500 with the error's message, the
    /// transport never sees an unhandled failure.
    pub async fn handle_request<B>(
        &self,
        req: Request<B>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        // Request bodies are never read, drop the body up front.
        let (parts, body) = req.into_parts();
        drop(body);
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let query = parts.uri.query().unwrap_or("").to_string();
        debug!(method = %method, path = %path, "Incoming request");

        // A media playlist request is distinguished from a multivariant one
        // solely by the query parameters a prior rewrite appended, so that
        // predicate must run before the auth-gated rule.
        let result = if path.ends_with(MANIFEST_SUFFIX) && !query.is_empty() && method == Method::GET
        {
            self.handle_media_playlist(&path, &query).await
        } else if path.ends_with(MANIFEST_SUFFIX) && method == Method::GET {
            self.handle_multivariant(&parts.headers, &path).await
        } else if method == Method::OPTIONS {
            Ok(preflight_response())
        } else {
            Ok(error_response(
                StatusCode::NOT_FOUND,
                Some("Resource not found"),
            ))
        };

        match result {
            Ok(response) => Ok(response),
            Err(err) => {
                error!(error = %err, method = %method, path = %path, "Request failed");
                Ok(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some(&err.to_string()),
                ))
            }
        }
    }

    /// Auth gate plus the multivariant manifest flow.
    async fn handle_multivariant(
        &self,
        headers: &http::HeaderMap,
        path: &str,
    ) -> Result<Response<Full<Bytes>>, GatekeeperError> {
        let (username, password) = match parse_authorization(headers) {
            AuthHeader::Missing => {
                debug!(path = %path, "Missing authorization header");
                return Ok(unauthorized_response());
            }
            AuthHeader::Malformed => {
                warn!(path = %path, "Malformed authorization header");
                return Ok(unauthorized_response());
            }
            AuthHeader::UnsupportedScheme(scheme) => {
                warn!(scheme = %scheme, path = %path, "Unsupported authentication scheme");
                return Ok(error_response(
                    StatusCode::UNAUTHORIZED,
                    Some(&format!("Unsupported authentication method: {}", scheme)),
                ));
            }
            AuthHeader::Basic { username, password } => (username, password),
        };

        if self.authenticator.authenticate(&username, &password) != AuthVerdict::Authenticated {
            warn!(username = %username, path = %path, "Credential check failed");
            return Ok(unauthorized_response());
        }

        let signed = self.signer.sign_path(path, SIGNED_URL_EXPIRY_SECS)?;
        let prefix = directory_prefix(signed.url.as_str())?.to_string();

        let signer = self.signer.clone();
        let sign = move |uri: &str| {
            signer.sign_params(&format!("{}/{}", prefix, uri), SIGNED_URL_EXPIRY_SECS)
        };

        let body = self
            .rewriter
            .rewrite_multivariant(&signed.url, &sign)
            .await
            .map_err(|err| GatekeeperError::Upstream {
                url: signed.url.to_string(),
                message: err.to_string(),
            })?;
        Ok(manifest_response(body))
    }

    /// Media playlist flow. The request is itself already signed, so the
    /// origin URL is rebuilt from path plus the original query string and no
    /// new top-level signature is minted.
    async fn handle_media_playlist(
        &self,
        path: &str,
        query: &str,
    ) -> Result<Response<Full<Bytes>>, GatekeeperError> {
        let origin = self.config.origin_base();
        let target = format!("{}{}?{}", origin, path, query);
        let signed_url = Url::parse(&target)
            .map_err(|err| GatekeeperError::MalformedUrl(format!("{}: {}", err, target)))?;

        let prefix = format!("{}{}", origin, directory_prefix(path)?);
        let base_url = Url::parse(&format!("{}/", prefix))
            .map_err(|err| GatekeeperError::MalformedUrl(format!("{}: {}/", err, prefix)))?;

        let signer = self.signer.clone();
        let sign = move |uri: &str| {
            signer.sign_params(&format!("{}/{}", prefix, uri), SIGNED_URL_EXPIRY_SECS)
        };

        let body = self
            .rewriter
            .rewrite_media_playlist(&signed_url, &base_url, &sign)
            .await
            .map_err(|err| GatekeeperError::Upstream {
                url: signed_url.to_string(),
                message: err.to_string(),
            })?;
        Ok(manifest_response(body))
    }
}

/// Everything before the final path segment.
fn directory_prefix(target: &str) -> Result<&str, GatekeeperError> {
    target
        .rsplit_once('/')
        .map(|(prefix, _)| prefix)
        .ok_or_else(|| GatekeeperError::MalformedUrl(format!("No path segments in '{}'", target)))
}
