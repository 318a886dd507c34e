use crate::error::Error;
use std::collections::HashMap;
use std::fmt;
use url::Url;

pub const TOKEN_KEYS_PATH: &str = "token_keys";
pub const OIDC_DISCOVERY_PATH: &str = ".well-known/openid-configuration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Xsuaa,
    Ias,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Xsuaa => f.write_str("XSUAA"),
            Service::Ias => f.write_str("IAS"),
        }
    }
}

/// Identity service binding data needed to validate tokens for one application.
#[derive(Clone)]
pub struct OAuth2ServiceConfiguration {
    service: Service,
    client_id: String,
    client_secret: Option<String>,
    url: Url,
    domain: Option<String>,
    app_id: Option<String>,
    properties: HashMap<String, String>,
}

impl OAuth2ServiceConfiguration {
    pub fn builder(service: Service) -> OAuth2ServiceConfigurationBuilder {
        OAuth2ServiceConfigurationBuilder::new(service)
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Identity provider domain, e.g. `authentication.eu10.hana.ondemand.com`.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// XSUAA application id (`xsappname`).
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn token_keys_url(&self) -> Result<Url, Error> {
        append_path(&self.url, TOKEN_KEYS_PATH)
    }

    pub fn discovery_url(&self) -> Result<Url, Error> {
        append_path(&self.url, OIDC_DISCOVERY_PATH)
    }
}

impl fmt::Debug for OAuth2ServiceConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2ServiceConfiguration")
            .field("service", &self.service)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url.as_str())
            .field("domain", &self.domain)
            .field("app_id", &self.app_id)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct OAuth2ServiceConfigurationBuilder {
    service: Service,
    client_id: Option<String>,
    client_secret: Option<String>,
    url: Option<String>,
    domain: Option<String>,
    app_id: Option<String>,
    properties: HashMap<String, String>,
}

impl OAuth2ServiceConfigurationBuilder {
    pub fn new(service: Service) -> Self {
        Self {
            service,
            client_id: None,
            client_secret: None,
            url: None,
            domain: None,
            app_id: None,
            properties: HashMap::new(),
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Result<OAuth2ServiceConfiguration, Error> {
        let service = self.service;
        let client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!("{service} configuration requires a client id"))
            })?;
        let url = self
            .url
            .ok_or_else(|| Error::Config(format!("{service} configuration requires a url")))?;
        let url = Url::parse(&url)?;
        if url.host_str().is_none() {
            return Err(Error::InvalidBaseUrl(url.to_string()));
        }
        let domain = self
            .domain
            .map(|domain| domain.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|domain| !domain.is_empty());
        Ok(OAuth2ServiceConfiguration {
            service,
            client_id,
            client_secret: self.client_secret,
            url,
            domain,
            app_id: self.app_id.filter(|id| !id.is_empty()),
            properties: self.properties,
        })
    }
}

pub(crate) fn append_path(base: &Url, path: &str) -> Result<Url, Error> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidBaseUrl(base.to_string()))?;
        segments.pop_if_empty();
        for segment in path.split('/') {
            segments.push(segment);
        }
    }
    Ok(url)
}
