use crate::error::Error;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod claims;
mod parts;


use parts::{base64_url_decode, decode_json_object, split_token};

/// A decoded, unverified compact JWT.
///
/// The signing input is kept as a slice of the original string so signature
/// verification runs over the exact bytes that were signed.
#[derive(Clone)]
pub struct Token {
    raw: String,
    signing_input_len: usize,
    header: Map<String, Value>,
    claims: Map<String, Value>,
    signature: Vec<u8>,
}

impl Token {
    pub fn parse(token: impl Into<String>) -> Result<Self, Error> {
        let raw = token.into().trim().to_string();
        let (signing_input_len, header, claims, signature) = {
            let parts = split_token(&raw)?;
            let header = decode_json_object(parts.header, "jwt header")?;
            let claims = decode_json_object(parts.payload, "jwt payload")?;
            let signature = base64_url_decode(parts.signature, "jwt signature")?;
            (
                parts.header.len() + 1 + parts.payload.len(),
                header,
                claims,
                signature,
            )
        };
        Ok(Self {
            raw,
            signing_input_len,
            header,
            claims,
            signature,
        })
    }

    pub fn token_value(&self) -> &str {
        &self.raw
    }

    /// `base64url(header) "." base64url(payload)` exactly as received.
    pub fn signing_input(&self) -> &[u8] {
        &self.raw.as_bytes()[..self.signing_input_len]
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn header_as_string(&self, name: &str) -> Option<&str> {
        self.header.get(name).and_then(Value::as_str)
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.header_as_string(claims::HEADER_ALGORITHM)
    }

    pub fn key_id(&self) -> Option<&str> {
        self.header_as_string(claims::HEADER_KEY_ID)
    }

    pub fn jku(&self) -> Option<&str> {
        self.header_as_string(claims::HEADER_JWKS_URL)
    }

    pub fn has_claim(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn claim_as_string(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    /// A string claim yields a one-element list; arrays keep their string members.
    pub fn claim_as_string_list(&self, name: &str) -> Vec<String> {
        match self.claims.get(name) {
            Some(Value::String(value)) => vec![value.clone()],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Seconds since the epoch. Fractional values are truncated.
    pub fn numeric_date(&self, name: &str) -> Option<i64> {
        let value = self.claims.get(name)?;
        if let Some(seconds) = value.as_i64() {
            return Some(seconds);
        }
        value
            .as_f64()
            .filter(|seconds| seconds.is_finite() && seconds.abs() < i64::MAX as f64)
            .map(|seconds| seconds.trunc() as i64)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.claim_as_string(claims::ISSUER)
    }

    pub fn subject(&self) -> Option<&str> {
        self.claim_as_string(claims::SUBJECT)
    }

    pub fn audiences(&self) -> Vec<String> {
        let mut audiences = self.claim_as_string_list(claims::AUDIENCE);
        let mut seen = std::collections::HashSet::new();
        audiences.retain(|aud| seen.insert(aud.clone()));
        audiences
    }

    pub fn expiration(&self) -> Option<i64> {
        self.numeric_date(claims::EXPIRATION)
    }

    pub fn not_before(&self) -> Option<i64> {
        self.numeric_date(claims::NOT_BEFORE)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.numeric_date(claims::ISSUED_AT)
    }

    pub fn client_id(&self) -> Option<&str> {
        self.claim_as_string(claims::XSUAA_CLIENT_ID)
            .or_else(|| self.claim_as_string(claims::AUTHORIZED_PARTY))
    }

    pub fn zone_id(&self) -> Option<&str> {
        self.claim_as_string(claims::XSUAA_ZONE_ID)
            .or_else(|| self.claim_as_string(claims::IAS_ZONE_UUID))
            .or_else(|| self.claim_as_string(claims::IAS_APP_TENANT_ID))
    }

    pub fn scopes(&self) -> Vec<String> {
        self.claim_as_string_list(claims::XSUAA_SCOPES)
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::parse(s)
    }
}

// Debug output never includes the raw bearer value.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("signature_len", &self.signature.len())
            .finish()
    }
}
