#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed jwt: {0}")]
    MalformedToken(String),
    #[error("Jwt expired at {expired_at}, time now: {now}")]
    ExpiredToken { expired_at: String, now: String },
    #[error("{0}")]
    NotYetValid(String),
    #[error("{0}")]
    AudienceMismatch(String),
    #[error("{0}")]
    IssuerMismatch(String),
    #[error("Jwt token with signature algorithm {0} is not supported")]
    UnsupportedAlg(String),
    #[error("{0}")]
    NoMatchingKey(String),
    #[error("Error retrieving Json Web Keys from Identity Service ({url}): {message}")]
    KeyRetrieval { url: String, message: String },
    #[error("Signature of Jwt Token is not valid: {0}")]
    InvalidSignature(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub(crate) const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

pub(crate) fn lock_poison_error(lock: &str) -> Error {
    Error::Crypto(format!("{lock} lock poisoned"))
}
