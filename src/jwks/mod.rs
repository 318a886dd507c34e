mod key;
mod parse;
mod set;
mod verify;


pub use key::{JsonWebKey, JsonWebKeyType, JwtSignatureAlgorithm, PublicKey, DEFAULT_KEY_ID};
pub use parse::{
    jwks_from_slice, jwks_from_slice_with_report, JwksParseReport, SkippedKey, SkippedKeyReason,
};
pub use set::JsonWebKeySet;
