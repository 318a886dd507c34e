use crate::error::Error;
use crate::key_service::RemoteKeySetFetcher;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey};
use rand::thread_rng;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::Sha256;
use signature::{SignatureEncoding, Signer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;
use url::Url;

pub(crate) fn rsa_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut thread_rng(), 2048).expect("private key"))
}

pub(crate) fn other_rsa_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut thread_rng(), 2048).expect("private key"))
}

pub(crate) fn p256_signing_key() -> &'static P256SigningKey {
    static KEY: OnceLock<P256SigningKey> = OnceLock::new();
    KEY.get_or_init(|| P256SigningKey::random(&mut thread_rng()))
}

pub(crate) fn rsa_jwk(key: &RsaPrivateKey, kid: Option<&str>) -> Value {
    let mut jwk = json!({
        "kty": "RSA",
        "alg": "RS256",
        "use": "sig",
        "n": URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
    });
    if let Some(kid) = kid {
        jwk["kid"] = json!(kid);
    }
    jwk
}

pub(crate) fn p256_jwk(kid: Option<&str>) -> Value {
    let verifying_key = p256_signing_key().verifying_key();
    let point = verifying_key.to_encoded_point(false);
    let mut jwk = json!({
        "kty": "EC",
        "crv": "P-256",
        "alg": "ES256",
        "x": URL_SAFE_NO_PAD.encode(point.x().expect("x coord")),
        "y": URL_SAFE_NO_PAD.encode(point.y().expect("y coord")),
    });
    if let Some(kid) = kid {
        jwk["kid"] = json!(kid);
    }
    jwk
}

pub(crate) fn jwks_body(keys: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({ "keys": keys })).expect("jwks json")
}

pub(crate) fn signing_input(header: &Value, claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).expect("header json"));
    let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims json"));
    format!("{header}.{claims}")
}

pub(crate) fn sign_rs256_with(key: &RsaPrivateKey, kid: Option<&str>, claims: Value) -> String {
    let mut header = json!({ "alg": "RS256", "typ": "JWT" });
    if let Some(kid) = kid {
        header["kid"] = json!(kid);
    }
    sign_rs256_header(key, header, claims)
}

pub(crate) fn sign_rs256_header(key: &RsaPrivateKey, header: Value, claims: Value) -> String {
    let input = signing_input(&header, &claims);
    let signer = RsaSigningKey::<Sha256>::new(key.clone());
    let signature = signer.sign(input.as_bytes()).to_bytes();
    format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

pub(crate) fn sign_rs256(kid: Option<&str>, claims: Value) -> String {
    sign_rs256_with(rsa_private_key(), kid, claims)
}

pub(crate) fn sign_es256(kid: Option<&str>, claims: Value) -> String {
    let mut header = json!({ "alg": "ES256", "typ": "JWT" });
    if let Some(kid) = kid {
        header["kid"] = json!(kid);
    }
    let input = signing_input(&header, &claims);
    let signature: P256Signature = p256_signing_key().sign(input.as_bytes());
    format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

pub(crate) fn unsigned_token(header: Value, claims: Value) -> String {
    format!("{}.c2lnbmF0dXJl", signing_input(&header, &claims))
}

pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub(crate) fn valid_claims() -> Value {
    let now = now();
    json!({
        "iss": "https://tenant.auth.com/oauth/token",
        "aud": ["test-app!t123", "uaa"],
        "cid": "sb-test-app!t123",
        "zid": "zone-1",
        "exp": now + 3600,
        "iat": now,
    })
}

/// In-memory fetcher serving canned bodies per url and counting calls.
pub(crate) struct StaticFetcher {
    bodies: Mutex<HashMap<String, Result<Vec<u8>, String>>>,
    delay: Duration,
    calls: AtomicUsize,
    tenants: Mutex<Vec<Option<String>>>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self {
            bodies: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            tenants: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn serve(self, url: &str, body: Vec<u8>) -> Self {
        self.set(url, Ok(body));
        self
    }

    pub(crate) fn fail(self, url: &str, message: &str) -> Self {
        self.set(url, Err(message.to_string()));
        self
    }

    pub(crate) fn set(&self, url: &str, body: Result<Vec<u8>, String>) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn tenants(&self) -> Vec<Option<String>> {
        self.tenants.lock().unwrap().clone()
    }
}

impl RemoteKeySetFetcher for StaticFetcher {
    fn fetch(&self, url: &Url, tenant: Option<&str>) -> Result<Vec<u8>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tenants
            .lock()
            .unwrap()
            .push(tenant.map(str::to_string));
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        match self.bodies.lock().unwrap().get(url.as_str()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(Error::Crypto(message.clone())),
            None => Err(Error::Crypto("connection refused".to_string())),
        }
    }
}
