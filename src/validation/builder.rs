use crate::config::{OAuth2ServiceConfiguration, Service};
use crate::error::Error;
use crate::key_service::{KeyRetrievalCache, OidcConfigurationCache};
use std::sync::Arc;
use std::time::Duration;

use super::combining::CombiningValidator;
use super::validators::{
    JwtAudienceValidator, JwtSignatureValidator, JwtTimestampValidator,
    XsuaaJwtAudienceValidator, XsuaaJwtIssuerValidator,
};
use super::Validator;

/// Assembles the default validator chain for a service configuration.
///
/// XSUAA: timestamp, audience, issuer, signature. IAS: timestamp, audience,
/// signature. Validators added with [`with`](Self::with) run afterwards.
/// Caches that are not supplied are created for this chain only.
pub struct JwtValidatorBuilder {
    configuration: OAuth2ServiceConfiguration,
    other_configuration: Option<OAuth2ServiceConfiguration>,
    custom_validators: Vec<Arc<dyn Validator>>,
    custom_audience_validator: Option<Arc<dyn Validator>>,
    key_cache: Option<Arc<KeyRetrievalCache>>,
    oidc_cache: Option<Arc<OidcConfigurationCache>>,
    clock_skew: Option<Duration>,
    trusted_jku_domains: Option<Vec<String>>,
}

impl JwtValidatorBuilder {
    pub fn for_configuration(configuration: OAuth2ServiceConfiguration) -> Self {
        Self {
            configuration,
            other_configuration: None,
            custom_validators: Vec::new(),
            custom_audience_validator: None,
            key_cache: None,
            oidc_cache: None,
            clock_skew: None,
            trusted_jku_domains: None,
        }
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.custom_validators.push(Arc::new(validator));
        self
    }

    pub fn with_audience_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.custom_audience_validator = Some(Arc::new(validator));
        self
    }

    pub fn with_key_cache(mut self, key_cache: Arc<KeyRetrievalCache>) -> Self {
        self.key_cache = Some(key_cache);
        self
    }

    pub fn with_oidc_configuration_cache(mut self, oidc_cache: Arc<OidcConfigurationCache>) -> Self {
        self.oidc_cache = Some(oidc_cache);
        self
    }

    pub fn configure_another_service_instance(
        mut self,
        other_configuration: Option<OAuth2ServiceConfiguration>,
    ) -> Self {
        self.other_configuration = other_configuration;
        self
    }

    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = Some(clock_skew);
        self
    }

    pub fn with_trusted_jku_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_jku_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<CombiningValidator, Error> {
        let mut validators: Vec<Arc<dyn Validator>> = Vec::new();

        let mut timestamp = JwtTimestampValidator::new();
        if let Some(clock_skew) = self.clock_skew {
            timestamp = timestamp.with_clock_skew(clock_skew);
        }
        validators.push(Arc::new(timestamp));

        let audience = match self.custom_audience_validator.clone() {
            Some(custom) => custom,
            None => self.default_audience_validator()?,
        };
        validators.push(audience);

        if self.configuration.service() == Service::Xsuaa {
            let domain = self.configuration.domain().ok_or_else(|| {
                Error::Config("XSUAA configuration requires an identity provider domain".to_string())
            })?;
            validators.push(Arc::new(XsuaaJwtIssuerValidator::new(domain)));
        }

        let key_cache = match self.key_cache.clone() {
            Some(cache) => cache,
            None => Arc::new(KeyRetrievalCache::with_http()?),
        };
        let oidc_cache = match self.oidc_cache.clone() {
            Some(cache) => cache,
            None => Arc::new(OidcConfigurationCache::with_http()?),
        };
        let mut signature = JwtSignatureValidator::new(&self.configuration, key_cache, oidc_cache)?;
        if let Some(domains) = self.trusted_jku_domains.clone() {
            signature = signature.with_trusted_jku_domains(domains);
        }
        validators.push(Arc::new(signature));

        validators.extend(self.custom_validators);
        Ok(CombiningValidator::new(validators))
    }

    fn default_audience_validator(&self) -> Result<Arc<dyn Validator>, Error> {
        let configuration = &self.configuration;
        match configuration.service() {
            Service::Xsuaa => {
                let app_id = configuration.app_id().ok_or_else(|| {
                    Error::Config("XSUAA configuration requires an application id".to_string())
                })?;
                let mut validator = XsuaaJwtAudienceValidator::new(app_id, configuration.client_id());
                if let Some(other) = &self.other_configuration {
                    let other_app_id = other.app_id().ok_or_else(|| {
                        Error::Config(
                            "second XSUAA configuration requires an application id".to_string(),
                        )
                    })?;
                    validator =
                        validator.configure_another_service_instance(other_app_id, other.client_id());
                }
                Ok(Arc::new(validator))
            }
            Service::Ias => {
                let mut validator = JwtAudienceValidator::new(configuration.client_id());
                if let Some(other) = &self.other_configuration {
                    validator = validator.configure_trusted_client_id(other.client_id());
                }
                Ok(Arc::new(validator))
            }
        }
    }
}
