use crate::error::{Error, MAX_ERROR_BODY_BYTES};
use log::debug;
use reqwest::blocking::{Client as HttpClient, Response};
use std::io::Read;
use std::time::Duration;
use url::Url;

pub(crate) const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the tenant (zone) a key set is requested for.
pub const TENANT_HEADER: &str = "x-zone_uuid";

/// Retrieves the raw body of a key-set or discovery document.
pub trait RemoteKeySetFetcher: Send + Sync {
    fn fetch(&self, url: &Url, tenant: Option<&str>) -> Result<Vec<u8>, Error>;
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    http: HttpClient,
    timeout: Option<Duration>,
}

impl HttpKeySetFetcher {
    pub fn new() -> Result<Self, Error> {
        let http = HttpClient::builder().build()?;
        Ok(Self {
            http,
            timeout: Some(DEFAULT_FETCH_TIMEOUT),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }
}

impl RemoteKeySetFetcher for HttpKeySetFetcher {
    fn fetch(&self, url: &Url, tenant: Option<&str>) -> Result<Vec<u8>, Error> {
        let redacted = redact_uri(url);
        let retrieval_error = |message: String| Error::KeyRetrieval {
            url: redacted.clone(),
            message,
        };

        debug!("fetching {redacted}");
        let mut req = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(tenant) = tenant {
            req = req.header(TENANT_HEADER, tenant);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let mut resp = req.send().map_err(|e| retrieval_error(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = read_body_with_limit(&mut resp, MAX_ERROR_BODY_BYTES)
                .map_err(|e| retrieval_error(e.to_string()))?;
            let body_preview = sanitize_error_body(&body);
            return Err(retrieval_error(if body_preview.is_empty() {
                format!("status {} body_read_len {}", status, body.len())
            } else {
                format!(
                    "status {} body_read_len {} body_preview {}",
                    status,
                    body.len(),
                    body_preview
                )
            }));
        }
        let body = resp.bytes().map_err(|e| retrieval_error(e.to_string()))?;
        Ok(body.to_vec())
    }
}

pub(crate) fn read_body_with_limit(resp: &mut Response, limit: usize) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    resp.take(limit as u64)
        .read_to_end(&mut body)
        .map_err(|e| Error::Crypto(format!("response body read error: {e}")))?;
    Ok(body)
}

pub(crate) fn sanitize_error_body(body: &[u8]) -> String {
    let mut sanitized = String::new();
    for &byte in body.iter().take(128) {
        match byte {
            b'\n' => sanitized.push_str("\\n"),
            b'\r' => sanitized.push_str("\\r"),
            b'\t' => sanitized.push_str("\\t"),
            _ if byte.is_ascii_graphic() || byte == b' ' => sanitized.push(byte as char),
            _ => sanitized.push('.'),
        }
    }
    if body.len() > 128 {
        sanitized.push_str("...");
    }
    sanitized
}

/// Strips credentials, query and fragment before a url reaches logs or errors.
pub(crate) fn redact_uri(uri: &Url) -> String {
    let mut redacted = uri.clone();
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted.set_query(None);
    redacted.set_fragment(None);
    redacted.to_string()
}
