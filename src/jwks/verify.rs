use crate::error::Error;
use rsa::pkcs1v15::{Signature as RsaSignature, VerifyingKey as RsaVerifyingKey};
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier as SignatureVerifier;

use super::key::{JwtSignatureAlgorithm, PublicKey};

/// Verifies a JWS signature over `message`.
///
/// ECDSA signatures must use the fixed-width JWS `r || s` form.
pub(super) fn verify_signature(
    key: &PublicKey,
    alg: JwtSignatureAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    use JwtSignatureAlgorithm::*;
    match (alg, key) {
        (RS256, PublicKey::Rsa(key)) => {
            verify_rsa(RsaVerifyingKey::<Sha256>::new(key.clone()), message, signature)
        }
        (RS384, PublicKey::Rsa(key)) => {
            verify_rsa(RsaVerifyingKey::<Sha384>::new(key.clone()), message, signature)
        }
        (RS512, PublicKey::Rsa(key)) => {
            verify_rsa(RsaVerifyingKey::<Sha512>::new(key.clone()), message, signature)
        }
        (ES256, PublicKey::P256(key)) => {
            let raw = fixed_width_ecdsa_signature(signature, 32)?;
            let sig = p256::ecdsa::Signature::from_slice(raw).map_err(signature_error)?;
            key.verify(message, &sig).map_err(signature_error)
        }
        (ES384, PublicKey::P384(key)) => {
            let raw = fixed_width_ecdsa_signature(signature, 48)?;
            let sig = p384::ecdsa::Signature::from_slice(raw).map_err(signature_error)?;
            key.verify(message, &sig).map_err(signature_error)
        }
        (ES512, PublicKey::P521(key)) => {
            let raw = fixed_width_ecdsa_signature(signature, 66)?;
            let sig = p521::ecdsa::Signature::from_slice(raw).map_err(signature_error)?;
            key.verify(message, &sig).map_err(signature_error)
        }
        (alg, _) => Err(Error::InvalidSignature(format!(
            "public key does not match algorithm {alg}"
        ))),
    }
}

fn verify_rsa(
    verifier: impl SignatureVerifier<RsaSignature>,
    message: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let sig = RsaSignature::try_from(signature).map_err(signature_error)?;
    verifier.verify(message, &sig).map_err(signature_error)
}

fn signature_error(err: signature::Error) -> Error {
    Error::InvalidSignature(err.to_string())
}

fn fixed_width_ecdsa_signature(signature: &[u8], size: usize) -> Result<&[u8], Error> {
    if signature.len() != size * 2 {
        return Err(Error::InvalidSignature(format!(
            "ecdsa signature must be {} bytes, got {}",
            size * 2,
            signature.len()
        )));
    }
    Ok(signature)
}
