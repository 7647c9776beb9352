//! Manifest fetch-and-rewrite collaborator.
//!
//! The core only depends on the [`ManifestRewriter`] trait: fetch a manifest
//! from its signed origin URL and hand back its text with every nested
//! reference carrying the signature parameters produced by the supplied
//! callback. [`HttpManifestRewriter`] is the production implementation;
//! tests drive the dispatcher with mocks.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::constants::UPSTREAM_TIMEOUT_SECS;
use crate::error::GatekeeperError;

/// Per-URI signing callback: returns the query parameters to append.
pub type SignFn<'a> =
    &'a (dyn Fn(&str) -> Result<Vec<(String, String)>, GatekeeperError> + Send + Sync);

#[async_trait]
pub trait ManifestRewriter: Send + Sync {
    /// Fetch a multivariant manifest and append signature parameters to every
    /// variant and rendition reference. References stay relative so the
    /// client's playlist requests come back through the gatekeeper.
    async fn rewrite_multivariant(
        &self,
        url: &Url,
        sign: SignFn<'_>,
    ) -> Result<String, GatekeeperError>;

    /// Fetch a media playlist and rewrite every segment and key reference to
    /// an absolute origin URL (resolved against `base_url`) carrying
    /// signature parameters, so clients fetch segments from the origin
    /// directly.
    async fn rewrite_media_playlist(
        &self,
        url: &Url,
        base_url: &Url,
        sign: SignFn<'_>,
    ) -> Result<String, GatekeeperError>;
}

pub struct HttpManifestRewriter {
    client: reqwest::Client,
}

impl HttpManifestRewriter {
    pub fn new() -> Result<Self, GatekeeperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &Url) -> Result<String, GatekeeperError> {
        debug!(url = %url, "Fetching manifest from origin");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatekeeperError::Other(format!(
                "Origin responded with status {}",
                status
            )));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ManifestRewriter for HttpManifestRewriter {
    async fn rewrite_multivariant(
        &self,
        url: &Url,
        sign: SignFn<'_>,
    ) -> Result<String, GatekeeperError> {
        let text = self.fetch(url).await?;
        rewrite_manifest(&text, None, sign)
    }

    async fn rewrite_media_playlist(
        &self,
        url: &Url,
        base_url: &Url,
        sign: SignFn<'_>,
    ) -> Result<String, GatekeeperError> {
        let text = self.fetch(url).await?;
        rewrite_manifest(&text, Some(base_url), sign)
    }
}

/// Walk manifest lines, rewriting URI lines and `URI="…"` tag attributes.
/// All other lines pass through untouched.
pub fn rewrite_manifest(
    text: &str,
    base_url: Option<&Url>,
    sign: SignFn<'_>,
) -> Result<String, GatekeeperError> {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if let Some(stripped) = line.strip_prefix('#') {
            if stripped.contains("URI=\"") {
                out.push_str(&rewrite_uri_attribute(line, base_url, sign)?);
            } else {
                out.push_str(line);
            }
        } else if line.trim().is_empty() {
            out.push_str(line);
        } else {
            out.push_str(&rewrite_uri(line.trim(), base_url, sign)?);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Append signature parameters to a URI, resolving it against the base URL
/// first when one is supplied.
fn rewrite_uri(
    uri: &str,
    base_url: Option<&Url>,
    sign: SignFn<'_>,
) -> Result<String, GatekeeperError> {
    let params = sign(uri)?;
    let resolved = match base_url {
        Some(base) => base
            .join(uri)
            .map_err(|err| GatekeeperError::MalformedUrl(format!("{}: {}", err, uri)))?
            .to_string(),
        None => uri.to_string(),
    };
    let mut rewritten = resolved;
    let mut separator = if rewritten.contains('?') { '&' } else { '?' };
    for (key, value) in params {
        rewritten.push(separator);
        rewritten.push_str(&key);
        rewritten.push('=');
        rewritten.push_str(&value);
        separator = '&';
    }
    Ok(rewritten)
}

/// Rewrite the quoted value of a tag's `URI="…"` attribute in place.
fn rewrite_uri_attribute(
    line: &str,
    base_url: Option<&Url>,
    sign: SignFn<'_>,
) -> Result<String, GatekeeperError> {
    let Some(start) = line.find("URI=\"") else {
        return Ok(line.to_string());
    };
    let value_start = start + "URI=\"".len();
    let Some(value_len) = line[value_start..].find('"') else {
        return Ok(line.to_string());
    };
    let uri = &line[value_start..value_start + value_len];
    let rewritten = rewrite_uri(uri, base_url, sign)?;
    Ok(format!(
        "{}{}{}",
        &line[..value_start],
        rewritten,
        &line[value_start + value_len..]
    ))
}
