use crate::config::{OAuth2ServiceConfiguration, Service};
use crate::key_service::{KeyRetrievalCache, OidcConfigurationCache};
use crate::testing::{
    jwks_body, other_rsa_private_key, p256_jwk, rsa_jwk, rsa_private_key, sign_es256,
    sign_rs256, sign_rs256_header, sign_rs256_with, unsigned_token, valid_claims, StaticFetcher,
};
use crate::token::Token;
use crate::validation::{JwtSignatureValidator, ValidationResult, Validator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const KEYS_URL: &str = "https://my.auth.com/token_keys";

fn xsuaa_configuration() -> OAuth2ServiceConfiguration {
    OAuth2ServiceConfiguration::builder(Service::Xsuaa)
        .client_id("sb-test-app!t123")
        .url("https://my.auth.com")
        .domain("auth.com")
        .app_id("test-app!t123")
        .build()
        .expect("config")
}

fn signature_validator(
    configuration: &OAuth2ServiceConfiguration,
    fetcher: &Arc<StaticFetcher>,
    key_cache: KeyRetrievalCache,
) -> JwtSignatureValidator {
    JwtSignatureValidator::new(
        configuration,
        Arc::new(key_cache),
        Arc::new(OidcConfigurationCache::new(fetcher.clone())),
    )
    .expect("validator")
}

fn validate(validator: &JwtSignatureValidator, raw: &str) -> ValidationResult {
    validator.validate(&Token::parse(raw).expect("token"))
}

fn xsuaa_validator(fetcher: &Arc<StaticFetcher>) -> JwtSignatureValidator {
    signature_validator(
        &xsuaa_configuration(),
        fetcher,
        KeyRetrievalCache::new(fetcher.clone()),
    )
}

#[test]
fn rs256_token_signed_by_published_key_is_valid() {
    let fetcher = Arc::new(StaticFetcher::new().serve(
        KEYS_URL,
        jwks_body(vec![rsa_jwk(rsa_private_key(), Some("key-1"))]),
    ));
    let validator = xsuaa_validator(&fetcher);

    let result = validate(&validator, &sign_rs256(Some("key-1"), valid_claims()));
    assert!(result.is_valid(), "{result}");
    let result = validate(&validator, &sign_rs256(Some("key-1"), valid_claims()));
    assert!(result.is_valid(), "{result}");
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn token_is_invalid_when_signing_key_is_absent() {
    let fetcher = Arc::new(StaticFetcher::new().serve(
        KEYS_URL,
        jwks_body(vec![rsa_jwk(other_rsa_private_key(), Some("key-1"))]),
    ));
    let validator = xsuaa_validator(&fetcher);

    let result = validate(&validator, &sign_rs256(Some("key-1"), valid_claims()));
    let description = result.error_description().expect("invalid");
    assert!(
        description.starts_with("Signature of Jwt Token is not valid"),
        "{description}"
    );
}

#[test]
fn unknown_kid_is_invalid() {
    let fetcher = Arc::new(StaticFetcher::new().serve(
        KEYS_URL,
        jwks_body(vec![rsa_jwk(rsa_private_key(), Some("key-2"))]),
    ));
    let validator = xsuaa_validator(&fetcher);

    let result = validate(&validator, &sign_rs256(Some("key-1"), valid_claims()));
    let description = result.error_description().expect("invalid");
    assert!(description.contains("keyId 'key-1'"), "{description}");
}

#[test]
fn rotated_key_triggers_one_refresh() {
    let fetcher = Arc::new(StaticFetcher::new().serve(
        KEYS_URL,
        jwks_body(vec![rsa_jwk(other_rsa_private_key(), Some("old"))]),
    ));
    let validator = signature_validator(
        &xsuaa_configuration(),
        &fetcher,
        KeyRetrievalCache::new(fetcher.clone()).with_min_refresh_interval(Duration::ZERO),
    );
    let old = sign_rs256_with(other_rsa_private_key(), Some("old"), valid_claims());
    assert!(validate(&validator, &old).is_valid());

    fetcher.set(
        KEYS_URL,
        Ok(jwks_body(vec![
            rsa_jwk(other_rsa_private_key(), Some("old")),
            rsa_jwk(rsa_private_key(), Some("new")),
        ])),
    );
    let result = validate(&validator, &sign_rs256(Some("new"), valid_claims()));
    assert!(result.is_valid(), "{result}");
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn refresh_is_rate_limited_for_unknown_kid() {
    let fetcher = Arc::new(StaticFetcher::new().serve(
        KEYS_URL,
        jwks_body(vec![rsa_jwk(rsa_private_key(), Some("key-1"))]),
    ));
    let validator = signature_validator(
        &xsuaa_configuration(),
        &fetcher,
        KeyRetrievalCache::new(fetcher.clone())
            .with_min_refresh_interval(Duration::from_secs(3600)),
    );
    assert!(validate(&validator, &sign_rs256(Some("key-1"), valid_claims())).is_valid());
    for _ in 0..3 {
        assert!(validate(&validator, &sign_rs256(Some("unknown"), valid_claims())).is_erroneous());
    }
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn es256_token_is_valid() {
    let fetcher =
        Arc::new(StaticFetcher::new().serve(KEYS_URL, jwks_body(vec![p256_jwk(Some("ec-1"))])));
    let validator = xsuaa_validator(&fetcher);

    let result = validate(&validator, &sign_es256(Some("ec-1"), valid_claims()));
    assert!(result.is_valid(), "{result}");
}

#[test]
fn none_and_symmetric_algorithms_are_rejected_before_key_lookup() {
    let fetcher = Arc::new(StaticFetcher::new());
    let validator = xsuaa_validator(&fetcher);

    for alg in ["none", "HS256", "PS256"] {
        let raw = unsigned_token(json!({ "alg": alg }), valid_claims());
        let result = validate(&validator, &raw);
        assert_eq!(
            result.error_description(),
            Some(format!("Jwt token with signature algorithm {alg} is not supported").as_str())
        );
    }
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn unreachable_key_endpoint_is_named() {
    let fetcher = Arc::new(StaticFetcher::new());
    let validator = xsuaa_validator(&fetcher);

    let result = validate(&validator, &sign_rs256(Some("key-1"), valid_claims()));
    let description = result.error_description().expect("invalid");
    assert!(
        description.starts_with(
            "Error retrieving Json Web Keys from Identity Service (https://my.auth.com/token_keys)"
        ),
        "{description}"
    );
}

#[test]
fn trusted_jku_is_followed() {
    let jku = "https://tenant.auth.com/token_keys";
    let fetcher = Arc::new(StaticFetcher::new().serve(
        jku,
        jwks_body(vec![rsa_jwk(rsa_private_key(), Some("key-1"))]),
    ));
    let validator = xsuaa_validator(&fetcher);

    let raw = sign_rs256_header(
        rsa_private_key(),
        json!({ "alg": "RS256", "kid": "key-1", "jku": jku }),
        valid_claims(),
    );
    let result = validate(&validator, &raw);
    assert!(result.is_valid(), "{result}");
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn jku_query_is_dropped_before_fetch() {
    let fetcher = Arc::new(StaticFetcher::new().serve(
        "https://tenant.auth.com/token_keys",
        jwks_body(vec![rsa_jwk(rsa_private_key(), Some("key-1"))]),
    ));
    let key_cache = Arc::new(KeyRetrievalCache::new(fetcher.clone()));
    let validator = JwtSignatureValidator::new(
        &xsuaa_configuration(),
        key_cache.clone(),
        Arc::new(OidcConfigurationCache::new(fetcher.clone())),
    )
    .expect("validator");

    for query in ["a=1", "a=2", "zid=3"] {
        let raw = sign_rs256_header(
            rsa_private_key(),
            json!({
                "alg": "RS256",
                "kid": "key-1",
                "jku": format!("https://tenant.auth.com/token_keys?{query}"),
            }),
            valid_claims(),
        );
        let result = validate(&validator, &raw);
        assert!(result.is_valid(), "{result}");
    }
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(key_cache.len(), 1);
}

#[test]
fn untrusted_jku_is_rejected_without_fetch() {
    let fetcher = Arc::new(StaticFetcher::new());
    let validator = xsuaa_validator(&fetcher);

    for jku in [
        "https://evil.com/token_keys",
        "http://tenant.auth.com/token_keys",
        "https://auth.com.evil.com/token_keys",
        "https://tenant.auth.com/other_keys",
        "https://tenant.auth.com/my_token_keys",
        "https://tenant.auth.com/token_keys/extra",
        "not a url",
    ] {
        let raw = sign_rs256_header(
            rsa_private_key(),
            json!({ "alg": "RS256", "kid": "key-1", "jku": jku }),
            valid_claims(),
        );
        let result = validate(&validator, &raw);
        let description = result.error_description().expect("invalid");
        assert!(description.contains("'jku'"), "{jku}: {description}");
    }
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn ias_keys_come_from_discovery_with_zone_context() {
    let discovery = "https://tenant.accounts.example.com/.well-known/openid-configuration";
    let jwks_uri = "https://tenant.accounts.example.com/oauth2/certs";
    let fetcher = Arc::new(
        StaticFetcher::new()
            .serve(
                discovery,
                serde_json::to_vec(&json!({ "jwks_uri": jwks_uri })).expect("json"),
            )
            .serve(
                jwks_uri,
                jwks_body(vec![rsa_jwk(rsa_private_key(), Some("key-1"))]),
            ),
    );
    let configuration = OAuth2ServiceConfiguration::builder(Service::Ias)
        .client_id("ias-client")
        .url("https://tenant.accounts.example.com")
        .build()
        .expect("config");
    let validator = signature_validator(
        &configuration,
        &fetcher,
        KeyRetrievalCache::new(fetcher.clone()),
    );

    let mut claims = valid_claims();
    claims["zone_uuid"] = json!("zone-42");
    claims.as_object_mut().expect("object").remove("zid");
    let result = validate(&validator, &sign_rs256(Some("key-1"), claims));

    assert!(result.is_valid(), "{result}");
    assert_eq!(fetcher.tenants(), vec![None, Some("zone-42".to_string())]);
}
