use crate::error::Error;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::{JsonWebKey, JsonWebKeyType, JwtSignatureAlgorithm};
use super::set::JsonWebKeySet;

#[derive(Debug, Clone)]
pub struct JwksParseReport {
    pub keys: JsonWebKeySet,
    pub skipped: Vec<SkippedKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedKey {
    pub kid: Option<String>,
    pub kty: Option<String>,
    pub reason: SkippedKeyReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkippedKeyReason {
    Malformed,
    UnsupportedKeyType,
    UnsupportedAlgorithm,
    NotForSignature,
    MissingKeyMaterial,
    Duplicate,
}

#[derive(Deserialize)]
struct RawJwks {
    #[serde(default)]
    keys: Vec<Value>,
}

#[derive(Deserialize)]
struct RawJwk {
    kty: Option<String>,
    kid: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
    crv: Option<String>,
    x: Option<String>,
    y: Option<String>,
    value: Option<String>,
}

pub fn jwks_from_slice(body: &[u8]) -> Result<JsonWebKeySet, Error> {
    let report = jwks_from_slice_with_report(body)?;
    Ok(report.keys)
}

/// Parses a key-set document. Entries that cannot be used are skipped and
/// reported instead of failing the whole document.
pub fn jwks_from_slice_with_report(body: &[u8]) -> Result<JwksParseReport, Error> {
    let raw: RawJwks = serde_json::from_slice(body)?;
    let mut keys = JsonWebKeySet::new();
    let mut skipped = Vec::new();
    for entry in raw.keys {
        match parse_key(entry) {
            Ok(key) => {
                let kid = key.id().to_string();
                let kty = key.key_type().as_str().to_string();
                if !keys.insert(key) {
                    skipped.push(SkippedKey {
                        kid: Some(kid),
                        kty: Some(kty),
                        reason: SkippedKeyReason::Duplicate,
                    });
                }
            }
            Err(skip) => {
                warn!(
                    "jwks key skipped; kid={}, kty={}, reason={:?}",
                    skip.kid.as_deref().unwrap_or("<none>"),
                    skip.kty.as_deref().unwrap_or("<none>"),
                    skip.reason
                );
                skipped.push(skip);
            }
        }
    }
    Ok(JwksParseReport { keys, skipped })
}

fn parse_key(entry: Value) -> Result<JsonWebKey, SkippedKey> {
    let raw: RawJwk = serde_json::from_value(entry).map_err(|_| SkippedKey {
        kid: None,
        kty: None,
        reason: SkippedKeyReason::Malformed,
    })?;
    let skip = |reason| SkippedKey {
        kid: raw.kid.clone(),
        kty: raw.kty.clone(),
        reason,
    };

    let key_type = raw
        .kty
        .as_deref()
        .and_then(JsonWebKeyType::from_kty)
        .ok_or_else(|| skip(SkippedKeyReason::UnsupportedKeyType))?;
    if raw.key_use.as_deref().is_some_and(|key_use| key_use != "sig") {
        return Err(skip(SkippedKeyReason::NotForSignature));
    }
    let algorithm = match raw.alg.as_deref() {
        None => None,
        Some(name) => match JwtSignatureAlgorithm::from_name(name) {
            Some(alg) if alg.key_type() == key_type => Some(alg),
            _ => return Err(skip(SkippedKeyReason::UnsupportedAlgorithm)),
        },
    };
    let kid = raw.kid.as_deref();

    if let Some(pem) = raw.value.as_deref().filter(|value| !value.trim().is_empty()) {
        return Ok(JsonWebKey::pem(key_type, algorithm, kid, pem));
    }
    match key_type {
        JsonWebKeyType::Rsa => match (&raw.n, &raw.e) {
            (Some(n), Some(e)) => Ok(JsonWebKey::rsa(algorithm, kid, n.as_str(), e.as_str())),
            _ => Err(skip(SkippedKeyReason::MissingKeyMaterial)),
        },
        JsonWebKeyType::Ec => match (&raw.crv, &raw.x, &raw.y) {
            (Some(crv), Some(x), Some(y)) => Ok(JsonWebKey::ec(
                algorithm,
                kid,
                crv.as_str(),
                x.as_str(),
                y.as_str(),
            )),
            _ => Err(skip(SkippedKeyReason::MissingKeyMaterial)),
        },
    }
}
