use crate::error::{lock_poison_error, Error};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use url::Url;

use super::cache::DEFAULT_CACHE_TTL;
use super::fetcher::{redact_uri, HttpKeySetFetcher, RemoteKeySetFetcher};

/// Subset of an OpenID Connect discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OidcConfiguration {
    #[serde(default)]
    pub issuer: Option<String>,
    pub jwks_uri: String,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
}

impl OidcConfiguration {
    pub fn jwks_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.jwks_uri)?)
    }
}

#[derive(Debug, Clone)]
struct CachedConfiguration {
    configuration: Arc<OidcConfiguration>,
    expires_at: Instant,
}

/// Time-bounded cache of discovery documents keyed by discovery url.
pub struct OidcConfigurationCache {
    fetcher: Arc<dyn RemoteKeySetFetcher>,
    cache_ttl: Duration,
    entries: RwLock<HashMap<Url, CachedConfiguration>>,
}

impl OidcConfigurationCache {
    pub fn new(fetcher: Arc<dyn RemoteKeySetFetcher>) -> Self {
        Self {
            fetcher,
            cache_ttl: DEFAULT_CACHE_TTL,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_http() -> Result<Self, Error> {
        Ok(Self::new(Arc::new(HttpKeySetFetcher::new()?)))
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn get_configuration(&self, discovery_url: &Url) -> Result<Arc<OidcConfiguration>, Error> {
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| lock_poison_error("oidc configuration cache"))?;
            if let Some(cached) = entries.get(discovery_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.configuration.clone());
                }
            }
        }

        debug!("fetching oidc configuration from {}", redact_uri(discovery_url));
        let retrieval_error = |message: String| Error::KeyRetrieval {
            url: redact_uri(discovery_url),
            message,
        };
        let body = self
            .fetcher
            .fetch(discovery_url, None)
            .map_err(|err| match err {
                Error::KeyRetrieval { .. } => err,
                other => retrieval_error(other.to_string()),
            })?;
        let configuration: OidcConfiguration = serde_json::from_slice(&body)
            .map_err(|err| retrieval_error(format!("invalid discovery document: {err}")))?;
        let configuration = Arc::new(configuration);

        self.entries
            .write()
            .map_err(|_| lock_poison_error("oidc configuration cache"))?
            .insert(
                discovery_url.clone(),
                CachedConfiguration {
                    configuration: configuration.clone(),
                    expires_at: Instant::now() + self.cache_ttl,
                },
            );
        Ok(configuration)
    }
}

impl fmt::Debug for OidcConfigurationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcConfigurationCache")
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}
