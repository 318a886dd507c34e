use crate::error::Error;
use crate::token::Token;
use crate::validation::{ValidationResult, Validator};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Checks `exp`, `nbf` and `iat` against the current time.
#[derive(Debug, Clone)]
pub struct JwtTimestampValidator {
    clock_skew: Duration,
    now: fn() -> OffsetDateTime,
}

impl Default for JwtTimestampValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtTimestampValidator {
    pub fn new() -> Self {
        Self {
            clock_skew: DEFAULT_CLOCK_SKEW,
            now: OffsetDateTime::now_utc,
        }
    }

    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    pub fn with_clock(mut self, now: fn() -> OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    fn check(&self, token: &Token) -> Result<(), Error> {
        let now = (self.now)().unix_timestamp();
        let skew = i64::try_from(self.clock_skew.as_secs()).unwrap_or(i64::MAX);

        let expiration = token.expiration().ok_or_else(|| {
            Error::MalformedToken("Jwt token does not contain 'exp' (Expiration) claim.".to_string())
        })?;
        if now > expiration.saturating_add(skew) {
            return Err(Error::ExpiredToken {
                expired_at: format_timestamp(expiration),
                now: format_timestamp(now),
            });
        }
        if let Some(not_before) = token.not_before() {
            if not_before.saturating_sub(skew) > now {
                return Err(Error::NotYetValid(format!(
                    "Jwt token is not valid before {}, time now: {}",
                    format_timestamp(not_before),
                    format_timestamp(now)
                )));
            }
        }
        if let Some(issued_at) = token.issued_at() {
            if issued_at.saturating_sub(skew) > now {
                return Err(Error::NotYetValid(format!(
                    "Jwt token was issued in the future at {}, time now: {}",
                    format_timestamp(issued_at),
                    format_timestamp(now)
                )));
            }
        }
        Ok(())
    }
}

impl Validator for JwtTimestampValidator {
    fn validate(&self, token: &Token) -> ValidationResult {
        self.check(token).into()
    }
}

pub(crate) fn format_timestamp(seconds: i64) -> String {
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| seconds.to_string())
}
