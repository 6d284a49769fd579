//! Candidate image fetching over HTTP.
//!
//! Candidate URLs can come from API callers, so the default fetcher only
//! talks to public https hosts and checks every redirect hop the same way.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tracing::{instrument, trace};

use snapfind_core::defaults::{
    DEFAULT_IMAGE_MIME, FETCH_TIMEOUT_MS, MAX_FETCH_REDIRECTS, MAX_IMAGE_BYTES,
};
use snapfind_core::{EncodedImage, Error, ImageFetcher, Result};

/// Downloads candidate photos and base64-encodes them for the prompt.
pub struct HttpImageFetcher {
    client: Client,
    max_bytes: usize,
    restricted: bool,
}

impl HttpImageFetcher {
    /// Fetcher limited to https URLs on public hosts.
    pub fn new(timeout_ms: u64, max_bytes: usize) -> Result<Self> {
        Self::build(timeout_ms, max_bytes, true)
    }

    /// Fetcher that accepts any scheme and host. Only for local development
    /// and tests against a loopback server.
    pub fn permissive(timeout_ms: u64, max_bytes: usize) -> Result<Self> {
        Self::build(timeout_ms, max_bytes, false)
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(FETCH_TIMEOUT_MS, MAX_IMAGE_BYTES)
    }

    fn build(timeout_ms: u64, max_bytes: usize, restricted: bool) -> Result<Self> {
        let redirect = if restricted {
            Policy::custom(|attempt| {
                if attempt.previous().len() >= MAX_FETCH_REDIRECTS {
                    return attempt.error("too many redirects");
                }
                match disallowed_reason(attempt.url()) {
                    Some(reason) => attempt.error(format!("redirect target {}", reason)),
                    None => attempt.follow(),
                }
            })
        } else {
            Policy::limited(MAX_FETCH_REDIRECTS)
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(redirect)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_bytes,
            restricted,
        })
    }
}

/// Parse a caller-supplied candidate URL and require https on a public host.
pub fn check_candidate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::InvalidInput(format!("Invalid candidate URL {}: {}", raw, e)))?;
    match disallowed_reason(&url) {
        Some(reason) => Err(Error::InvalidInput(format!(
            "Candidate URL {} {}",
            raw, reason
        ))),
        None => Ok(url),
    }
}

fn disallowed_reason(url: &Url) -> Option<&'static str> {
    if url.scheme() != "https" {
        return Some("must use https");
    }
    let host = url.host_str()?;
    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost") {
        return Some("names a local host");
    }
    let ip = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()?;
    is_internal_ip(ip).then_some("names a non-public address")
}

fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_v4(v4),
            None => is_internal_v6(v6),
        },
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link local
    ip.is_loopback() || ip.is_unspecified() || first & 0xfe00 == 0xfc00 || first & 0xffc0 == 0xfe80
}

/// Pick the image MIME type: `Content-Type` if it names an image, then magic
/// bytes, then JPEG.
fn resolve_mime(content_type: Option<&str>, bytes: &[u8]) -> String {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"));

    declared
        .or_else(|| {
            infer::get(bytes)
                .filter(|kind| matches!(kind.matcher_type(), infer::MatcherType::Image))
                .map(|kind| kind.mime_type().to_string())
        })
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    #[instrument(skip(self), fields(subsystem = "inference", component = "fetcher", op = "fetch"))]
    async fn fetch(&self, url: &str) -> Result<EncodedImage> {
        if self.restricted {
            check_candidate_url(url).map_err(|e| match e {
                Error::InvalidInput(msg) => Error::CandidateFetch(msg),
                other => other,
            })?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::CandidateFetch(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::CandidateFetch(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(Error::CandidateFetch(format!(
                    "{} is {} bytes, limit is {}",
                    url, len, self.max_bytes
                )));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::CandidateFetch(format!("Reading {} failed: {}", url, e)))?;

        if bytes.is_empty() {
            return Err(Error::CandidateFetch(format!("{} returned an empty body", url)));
        }
        if bytes.len() > self.max_bytes {
            return Err(Error::CandidateFetch(format!(
                "{} is {} bytes, limit is {}",
                url,
                bytes.len(),
                self.max_bytes
            )));
        }

        let mime_type = resolve_mime(content_type.as_deref(), &bytes);
        trace!(bytes = bytes.len(), mime = %mime_type, "Fetched candidate image");

        Ok(EncodedImage {
            mime_type,
            data_b64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }
}
