use crate::config::{OAuth2ServiceConfiguration, Service, TOKEN_KEYS_PATH};
use crate::error::Error;
use crate::jwks::JwtSignatureAlgorithm;
use crate::key_service::{FetchSource, KeyRetrievalCache, KeySource, OidcConfigurationCache};
use crate::token::Token;
use crate::validation::{ValidationResult, Validator};
use log::debug;
use std::fmt;
use std::sync::Arc;
use url::Url;

use super::host_matches_domain;

/// Verifies the token signature against the issuer's published keys.
///
/// XSUAA keys come from the token's `jku` when it names a `token_keys`
/// endpoint in a trusted domain (query dropped), otherwise from
/// `<url>/token_keys`. IAS keys come from the
/// `jwks_uri` of the discovery document at the configured url.
pub struct JwtSignatureValidator {
    service: Service,
    token_keys_url: Url,
    discovery_url: Url,
    trusted_jku_domains: Vec<String>,
    key_cache: Arc<KeyRetrievalCache>,
    oidc_cache: Arc<OidcConfigurationCache>,
}

impl JwtSignatureValidator {
    pub fn new(
        configuration: &OAuth2ServiceConfiguration,
        key_cache: Arc<KeyRetrievalCache>,
        oidc_cache: Arc<OidcConfigurationCache>,
    ) -> Result<Self, Error> {
        Ok(Self {
            service: configuration.service(),
            token_keys_url: configuration.token_keys_url()?,
            discovery_url: configuration.discovery_url()?,
            trusted_jku_domains: configuration.domain().map(str::to_string).into_iter().collect(),
            key_cache,
            oidc_cache,
        })
    }

    pub fn with_trusted_jku_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_jku_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    fn verify(&self, token: &Token) -> Result<(), Error> {
        let alg = match token.algorithm() {
            Some(name) => JwtSignatureAlgorithm::from_name(name)
                .ok_or_else(|| Error::UnsupportedAlg(name.to_string()))?,
            None => return Err(Error::UnsupportedAlg("(missing)".to_string())),
        };
        if token.signature().is_empty() {
            return Err(Error::InvalidSignature("Jwt token has no signature.".to_string()));
        }

        let source = self.key_source(token)?;
        let key_id = token.key_id();
        let (keys, origin) = self.key_cache.get_key_set_with_source(&source)?;
        let missing = keys.select(alg, key_id).map(|_| ()).err();
        let keys = match missing {
            None => keys,
            Some(err) if origin == FetchSource::Cache && key_id.is_some() => {
                debug!(
                    "kid {} not in cached key set from {source}; refreshing",
                    key_id.unwrap_or_default()
                );
                let refreshed = self.key_cache.refresh(&source)?;
                if Arc::ptr_eq(&refreshed, &keys) {
                    return Err(err);
                }
                refreshed
            }
            Some(err) => return Err(err),
        };
        let key = keys.select(alg, key_id)?;
        key.verify(alg, token.signing_input(), token.signature())
    }

    fn key_source(&self, token: &Token) -> Result<KeySource, Error> {
        match self.service {
            Service::Xsuaa => match token.jku() {
                Some(jku) => Ok(KeySource::new(self.trusted_jku(jku)?, None)),
                None => Ok(KeySource::new(self.token_keys_url.clone(), None)),
            },
            Service::Ias => {
                let configuration = self.oidc_cache.get_configuration(&self.discovery_url)?;
                let jwks_url = configuration.jwks_url().map_err(|err| Error::KeyRetrieval {
                    url: self.discovery_url.to_string(),
                    message: format!("invalid jwks_uri: {err}"),
                })?;
                Ok(KeySource::new(jwks_url, token.zone_id()))
            }
        }
    }

    fn trusted_jku(&self, jku: &str) -> Result<Url, Error> {
        let untrusted = || {
            Error::IssuerMismatch(format!(
                "Jwt token 'jku' {jku} is not trusted: it must name the token_keys endpoint of an identity provider domain {:?}.",
                self.trusted_jku_domains
            ))
        };
        let mut url = Url::parse(jku).map_err(|_| untrusted())?;
        if url.scheme() != "https"
            || url.fragment().is_some()
            || url.path_segments().and_then(Iterator::last) != Some(TOKEN_KEYS_PATH)
        {
            return Err(untrusted());
        }
        url.set_query(None);
        let host = url.host_str().ok_or_else(untrusted)?;
        if self
            .trusted_jku_domains
            .iter()
            .any(|domain| host_matches_domain(host, domain))
        {
            Ok(url)
        } else {
            Err(untrusted())
        }
    }
}

impl Validator for JwtSignatureValidator {
    fn validate(&self, token: &Token) -> ValidationResult {
        self.verify(token).into()
    }
}

impl fmt::Debug for JwtSignatureValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSignatureValidator")
            .field("service", &self.service)
            .field("token_keys_url", &self.token_keys_url.as_str())
            .field("discovery_url", &self.discovery_url.as_str())
            .field("trusted_jku_domains", &self.trusted_jku_domains)
            .finish()
    }
}
