use crate::error::Error;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::{DecodePublicKey, ObjectIdentifier, SubjectPublicKeyInfoRef};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::{BigUint, RsaPublicKey};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

use super::verify::verify_signature;

const P256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const P384_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const P521_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

/// Key id assigned to keys published without a `kid`.
pub const DEFAULT_KEY_ID: &str = "default-kid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonWebKeyType {
    Rsa,
    Ec,
}

impl JsonWebKeyType {
    pub fn from_kty(kty: &str) -> Option<Self> {
        match kty {
            "RSA" => Some(Self::Rsa),
            "EC" => Some(Self::Ec),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
        }
    }
}

impl fmt::Display for JsonWebKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature algorithms accepted in the token header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwtSignatureAlgorithm {
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
}

impl JwtSignatureAlgorithm {
    pub const ALL: [JwtSignatureAlgorithm; 6] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    pub fn key_type(&self) -> JsonWebKeyType {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => JsonWebKeyType::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 => JsonWebKeyType::Ec,
        }
    }

    /// JWK `crv` required by an ECDSA algorithm.
    pub fn curve(&self) -> Option<&'static str> {
        match self {
            Self::ES256 => Some("P-256"),
            Self::ES384 => Some("P-384"),
            Self::ES512 => Some("P-521"),
            _ => None,
        }
    }
}

impl FromStr for JwtSignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnsupportedAlg(s.to_string()))
    }
}

impl fmt::Display for JwtSignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
}

impl PublicKey {
    pub fn key_type(&self) -> JsonWebKeyType {
        match self {
            Self::Rsa(_) => JsonWebKeyType::Rsa,
            _ => JsonWebKeyType::Ec,
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Rsa(_) => "RSA",
            Self::P256(_) => "EC P-256",
            Self::P384(_) => "EC P-384",
            Self::P521(_) => "EC P-521",
        };
        f.debug_tuple("PublicKey").field(&kind).finish()
    }
}

#[derive(Clone)]
enum KeyMaterial {
    Pem(String),
    Rsa { modulus: String, exponent: String },
    Ec { curve: String, x: String, y: String },
}

/// One published verification key.
///
/// Two keys are equal when key type and key id match. The public key is
/// materialized on first use and then reused.
#[derive(Clone)]
pub struct JsonWebKey {
    key_type: JsonWebKeyType,
    algorithm: Option<JwtSignatureAlgorithm>,
    id: String,
    material: KeyMaterial,
    public_key: OnceLock<Result<PublicKey, String>>,
}

impl JsonWebKey {
    pub fn rsa(
        algorithm: Option<JwtSignatureAlgorithm>,
        key_id: Option<&str>,
        modulus: impl Into<String>,
        exponent: impl Into<String>,
    ) -> Self {
        Self::new(
            JsonWebKeyType::Rsa,
            algorithm,
            key_id,
            KeyMaterial::Rsa {
                modulus: modulus.into(),
                exponent: exponent.into(),
            },
        )
    }

    pub fn ec(
        algorithm: Option<JwtSignatureAlgorithm>,
        key_id: Option<&str>,
        curve: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self::new(
            JsonWebKeyType::Ec,
            algorithm,
            key_id,
            KeyMaterial::Ec {
                curve: curve.into(),
                x: x.into(),
                y: y.into(),
            },
        )
    }

    /// Key given as PEM text or as bare base64 of a DER `SubjectPublicKeyInfo`.
    pub fn pem(
        key_type: JsonWebKeyType,
        algorithm: Option<JwtSignatureAlgorithm>,
        key_id: Option<&str>,
        pem: impl Into<String>,
    ) -> Self {
        Self::new(key_type, algorithm, key_id, KeyMaterial::Pem(pem.into()))
    }

    fn new(
        key_type: JsonWebKeyType,
        algorithm: Option<JwtSignatureAlgorithm>,
        key_id: Option<&str>,
        material: KeyMaterial,
    ) -> Self {
        let id = match key_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => DEFAULT_KEY_ID.to_string(),
        };
        Self {
            key_type,
            algorithm,
            id,
            material,
            public_key: OnceLock::new(),
        }
    }

    pub fn key_type(&self) -> JsonWebKeyType {
        self.key_type
    }

    pub fn algorithm(&self) -> Option<JwtSignatureAlgorithm> {
        self.algorithm
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn curve(&self) -> Option<&str> {
        match &self.material {
            KeyMaterial::Ec { curve, .. } => Some(curve),
            _ => None,
        }
    }

    /// Whether this key may verify a token signed with `alg`.
    pub fn supports(&self, alg: JwtSignatureAlgorithm) -> bool {
        if self.key_type != alg.key_type() {
            return false;
        }
        if self.algorithm.is_some_and(|own| own != alg) {
            return false;
        }
        match (self.curve(), alg.curve()) {
            (Some(own), Some(required)) => own == required,
            _ => true,
        }
    }

    pub fn public_key(&self) -> Result<&PublicKey, Error> {
        let materialized = self.public_key.get_or_init(|| {
            self.material
                .to_public_key(self.key_type)
                .and_then(|key| {
                    if key.key_type() == self.key_type {
                        Ok(key)
                    } else {
                        Err(Error::Crypto(format!(
                            "key material is not of type {}",
                            self.key_type
                        )))
                    }
                })
                .map_err(|err| err.to_string())
        });
        match materialized {
            Ok(key) => Ok(key),
            Err(message) => Err(Error::Crypto(format!(
                "json web key '{}' is unusable: {message}",
                self.id
            ))),
        }
    }

    pub fn verify(
        &self,
        alg: JwtSignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        if !self.supports(alg) {
            return Err(Error::InvalidSignature(format!(
                "key '{}' of type {} cannot verify {alg}",
                self.id, self.key_type
            )));
        }
        verify_signature(self.public_key()?, alg, message, signature)
    }
}

impl KeyMaterial {
    fn to_public_key(&self, key_type: JsonWebKeyType) -> Result<PublicKey, Error> {
        match self {
            KeyMaterial::Pem(pem) => pem_to_public_key(key_type, pem),
            KeyMaterial::Rsa { modulus, exponent } => {
                let n = BigUint::from_bytes_be(&decode_component(modulus, "n")?);
                let e = BigUint::from_bytes_be(&decode_component(exponent, "e")?);
                RsaPublicKey::new(n, e)
                    .map(PublicKey::Rsa)
                    .map_err(|e| Error::Crypto(format!("rsa public key error: {e}")))
            }
            KeyMaterial::Ec { curve, x, y } => ec_to_public_key(curve, x, y),
        }
    }
}

fn pem_to_public_key(key_type: JsonWebKeyType, pem: &str) -> Result<PublicKey, Error> {
    let pem = pem.trim();
    let (tag, der) = if pem.contains("-----BEGIN") {
        let block =
            ::pem::parse(pem).map_err(|e| Error::Crypto(format!("pem parse error: {e}")))?;
        (block.tag().to_string(), block.into_contents())
    } else {
        let compact: String = pem.chars().filter(|c| !c.is_whitespace()).collect();
        let der = STANDARD_NO_PAD
            .decode(compact.trim_end_matches('='))
            .map_err(|e| Error::Crypto(format!("public key base64 error: {e}")))?;
        ("PUBLIC KEY".to_string(), der)
    };
    match (key_type, tag.as_str()) {
        (JsonWebKeyType::Rsa, "RSA PUBLIC KEY") => RsaPublicKey::from_pkcs1_der(&der)
            .map(PublicKey::Rsa)
            .map_err(|e| Error::Crypto(format!("pkcs1 rsa public key error: {e}"))),
        (JsonWebKeyType::Rsa, "PUBLIC KEY") => RsaPublicKey::from_public_key_der(&der)
            .map(PublicKey::Rsa)
            .map_err(|e| Error::Crypto(format!("rsa public key error: {e}"))),
        (JsonWebKeyType::Ec, "PUBLIC KEY") => spki_to_ec_public_key(&der),
        (key_type, tag) => Err(Error::Crypto(format!(
            "pem block '{tag}' cannot hold a {key_type} public key"
        ))),
    }
}

// The named curve sits in the SubjectPublicKeyInfo algorithm parameters.
fn spki_to_ec_public_key(der: &[u8]) -> Result<PublicKey, Error> {
    let spki = SubjectPublicKeyInfoRef::try_from(der)
        .map_err(|e| Error::Crypto(format!("public key info error: {e}")))?;
    let curve = spki
        .algorithm
        .parameters_oid()
        .map_err(|e| Error::Crypto(format!("ec public key has no named curve: {e}")))?;
    let invalid = |name: &str, e: pkcs8::spki::Error| {
        Error::Crypto(format!("{name} public key error: {e}"))
    };
    if curve == P256_OID {
        let key = p256::PublicKey::from_public_key_der(der).map_err(|e| invalid("P-256", e))?;
        ec_from_sec1("P-256", key.to_encoded_point(false).as_bytes())
    } else if curve == P384_OID {
        let key = p384::PublicKey::from_public_key_der(der).map_err(|e| invalid("P-384", e))?;
        ec_from_sec1("P-384", key.to_encoded_point(false).as_bytes())
    } else if curve == P521_OID {
        let key = p521::PublicKey::from_public_key_der(der).map_err(|e| invalid("P-521", e))?;
        ec_from_sec1("P-521", key.to_encoded_point(false).as_bytes())
    } else {
        Err(Error::Crypto(format!("unsupported curve {curve}")))
    }
}

fn ec_to_public_key(curve: &str, x: &str, y: &str) -> Result<PublicKey, Error> {
    let size = match curve {
        "P-256" => 32,
        "P-384" => 48,
        "P-521" => 66,
        other => return Err(Error::Crypto(format!("unsupported curve {other}"))),
    };
    let x = decode_coord(x, size)?;
    let y = decode_coord(y, size)?;
    let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
    sec1.push(0x04);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);
    ec_from_sec1(curve, &sec1)
}

fn ec_from_sec1(curve: &str, sec1: &[u8]) -> Result<PublicKey, Error> {
    let invalid = |e: signature::Error| Error::Crypto(format!("{curve} public key error: {e}"));
    match curve {
        "P-256" => p256::ecdsa::VerifyingKey::from_sec1_bytes(sec1)
            .map(PublicKey::P256)
            .map_err(invalid),
        "P-384" => p384::ecdsa::VerifyingKey::from_sec1_bytes(sec1)
            .map(PublicKey::P384)
            .map_err(invalid),
        "P-521" => p521::ecdsa::VerifyingKey::from_sec1_bytes(sec1)
            .map(PublicKey::P521)
            .map_err(invalid),
        other => Err(Error::Crypto(format!("unsupported curve {other}"))),
    }
}

fn decode_component(value: &str, name: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| Error::Crypto(format!("jwk '{name}' is not valid base64url: {e}")))
}

// Coordinates may arrive without leading zero bytes.
fn decode_coord(value: &str, size: usize) -> Result<Vec<u8>, Error> {
    let bytes = decode_component(value, "coordinate")?;
    if bytes.len() > size {
        return Err(Error::Crypto("ec coordinate too long".to_string()));
    }
    let mut padded = vec![0u8; size - bytes.len()];
    padded.extend_from_slice(&bytes);
    Ok(padded)
}

impl PartialEq for JsonWebKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.id == other.id
    }
}

impl Eq for JsonWebKey {}

impl Hash for JsonWebKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_type.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = match self.material {
            KeyMaterial::Pem(_) => "pem",
            KeyMaterial::Rsa { .. } => "rsa",
            KeyMaterial::Ec { .. } => "ec",
        };
        f.debug_struct("JsonWebKey")
            .field("key_type", &self.key_type)
            .field("algorithm", &self.algorithm)
            .field("id", &self.id)
            .field("format", &format)
            .finish()
    }
}
