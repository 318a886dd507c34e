use crate::error::Error;
use log::warn;

use super::key::{JsonWebKey, JsonWebKeyType, JwtSignatureAlgorithm, DEFAULT_KEY_ID};

/// Immutable collection of keys published by one endpoint.
#[derive(Debug, Clone, Default)]
pub struct JsonWebKeySet {
    keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys sharing key type and key id with an earlier key are dropped.
    pub fn from_keys(keys: impl IntoIterator<Item = JsonWebKey>) -> Self {
        let mut set = Self::new();
        for key in keys {
            set.insert(key);
        }
        set
    }

    pub(crate) fn insert(&mut self, key: JsonWebKey) -> bool {
        if self.keys.contains(&key) {
            warn!(
                "duplicate json web key dropped; kid={}, kty={}",
                key.id(),
                key.key_type()
            );
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[JsonWebKey] {
        &self.keys
    }

    pub fn contains_key_by_type_and_id(&self, key_type: JsonWebKeyType, key_id: Option<&str>) -> bool {
        self.key_by_type_and_id(key_type, key_id).is_some()
    }

    /// Exact lookup; an absent id means [`DEFAULT_KEY_ID`].
    pub fn key_by_type_and_id(
        &self,
        key_type: JsonWebKeyType,
        key_id: Option<&str>,
    ) -> Option<&JsonWebKey> {
        let key_id = key_id.unwrap_or(DEFAULT_KEY_ID);
        self.keys
            .iter()
            .find(|key| key.key_type() == key_type && key.id() == key_id)
    }

    /// Picks the key that verifies a token signed with `alg` and carrying `key_id`.
    ///
    /// Without a key id the default-id key is preferred, then the only
    /// compatible key. Several compatible keys and no key id is an error.
    pub fn select(
        &self,
        alg: JwtSignatureAlgorithm,
        key_id: Option<&str>,
    ) -> Result<&JsonWebKey, Error> {
        let key_type = alg.key_type();
        if let Some(kid) = key_id {
            return self
                .key_by_type_and_id(key_type, Some(kid))
                .filter(|key| key.supports(alg))
                .ok_or_else(|| {
                    Error::NoMatchingKey(format!(
                        "There is no Json Web Token Key with keyId '{kid}' and type '{key_type}' to prove the identity of the Jwt."
                    ))
                });
        }

        if let Some(key) = self
            .key_by_type_and_id(key_type, None)
            .filter(|key| key.supports(alg))
        {
            return Ok(key);
        }

        let mut candidates = self.keys.iter().filter(|key| key.supports(alg));
        match (candidates.next(), candidates.next()) {
            (Some(key), None) => Ok(key),
            (None, _) => Err(Error::NoMatchingKey(format!(
                "There is no Json Web Token Key of type '{key_type}' compatible with {alg} (kid missing)."
            ))),
            (Some(_), Some(_)) => Err(Error::NoMatchingKey(format!(
                "Jwt has no kid and {} keys of type '{key_type}' are compatible with {alg}.",
                self.keys.iter().filter(|key| key.supports(alg)).count()
            ))),
        }
    }
}
