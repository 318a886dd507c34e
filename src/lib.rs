#![forbid(unsafe_code)]

mod config;
mod error;
mod jwks;
mod key_service;
mod token;
mod validation;

#[cfg(test)]
mod testing;

pub use config::{
    OAuth2ServiceConfiguration, OAuth2ServiceConfigurationBuilder, Service, OIDC_DISCOVERY_PATH,
    TOKEN_KEYS_PATH,
};
pub use error::Error;

pub use jwks::{
    jwks_from_slice, jwks_from_slice_with_report, JsonWebKey, JsonWebKeySet, JsonWebKeyType,
    JwksParseReport, JwtSignatureAlgorithm, PublicKey, SkippedKey, SkippedKeyReason,
    DEFAULT_KEY_ID,
};

pub use key_service::{
    HttpKeySetFetcher, KeyRetrievalCache, KeySource, OidcConfiguration, OidcConfigurationCache,
    RemoteKeySetFetcher, DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_REFRESH_INTERVAL,
    TENANT_HEADER,
};

pub use token::{claims, Token};

pub use validation::{
    CombiningValidator, JwtAudienceValidator, JwtSignatureValidator, JwtTimestampValidator,
    JwtValidatorBuilder, ValidationResult, Validator, XsuaaJwtAudienceValidator,
    XsuaaJwtIssuerValidator, DEFAULT_CLOCK_SKEW,
};
