use crate::error::Error;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{Map, Value};

pub(super) struct TokenParts<'a> {
    pub(super) header: &'a str,
    pub(super) payload: &'a str,
    pub(super) signature: &'a str,
}

pub(super) fn split_token(token: &str) -> Result<TokenParts<'_>, Error> {
    let mut iter = token.split('.');
    let header = iter.next().ok_or_else(|| segment_count_error(0))?;
    let payload = iter.next().ok_or_else(|| segment_count_error(1))?;
    let signature = iter.next().ok_or_else(|| segment_count_error(2))?;
    let extra = iter.count();
    if extra > 0 {
        return Err(segment_count_error(3 + extra));
    }
    if header.is_empty() || payload.is_empty() {
        return Err(Error::MalformedToken(
            "header and payload segments must not be empty".to_string(),
        ));
    }
    Ok(TokenParts {
        header,
        payload,
        signature,
    })
}

pub(super) fn decode_json_object(segment: &str, name: &str) -> Result<Map<String, Value>, Error> {
    let bytes = base64_url_decode(segment, name)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::MalformedToken(format!("{name} is not a json object"))),
        Err(err) => Err(Error::MalformedToken(format!("{name} is not valid json: {err}"))),
    }
}

// Padded segments are accepted; some token generators emit them.
pub(super) fn base64_url_decode(segment: &str, name: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|err| Error::MalformedToken(format!("{name} is not valid base64url: {err}")))
}

fn segment_count_error(found: usize) -> Error {
    Error::MalformedToken(format!(
        "jwt must consist of 3 segments separated by '.', found {found}"
    ))
}
