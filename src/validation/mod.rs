mod builder;
mod combining;
mod result;
mod validators;

#[cfg(test)]
mod tests;

use crate::token::Token;

pub use builder::JwtValidatorBuilder;
pub use combining::CombiningValidator;
pub use result::ValidationResult;
pub use validators::{
    JwtAudienceValidator, JwtSignatureValidator, JwtTimestampValidator,
    XsuaaJwtAudienceValidator, XsuaaJwtIssuerValidator, DEFAULT_CLOCK_SKEW,
};

/// A single check applied to a decoded token.
///
/// Closures of the form `Fn(&Token) -> ValidationResult` are validators too.
pub trait Validator: Send + Sync {
    fn validate(&self, token: &Token) -> ValidationResult;
}

impl<F> Validator for F
where
    F: Fn(&Token) -> ValidationResult + Send + Sync,
{
    fn validate(&self, token: &Token) -> ValidationResult {
        self(token)
    }
}
