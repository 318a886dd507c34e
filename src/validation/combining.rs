use crate::config::OAuth2ServiceConfiguration;
use crate::token::Token;
use log::debug;
use std::fmt;
use std::sync::Arc;

use super::builder::JwtValidatorBuilder;
use super::result::ValidationResult;
use super::Validator;

/// Runs validators in order and stops at the first failure.
#[derive(Clone, Default)]
pub struct CombiningValidator {
    validators: Vec<Arc<dyn Validator>>,
}

impl CombiningValidator {
    pub fn new(validators: Vec<Arc<dyn Validator>>) -> Self {
        Self { validators }
    }

    pub fn builder_for(configuration: OAuth2ServiceConfiguration) -> JwtValidatorBuilder {
        JwtValidatorBuilder::for_configuration(configuration)
    }

    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Parses the raw token first; a malformed token is reported as invalid.
    pub fn validate_token_value(&self, token: &str) -> ValidationResult {
        match Token::parse(token) {
            Ok(token) => self.validate(&token),
            Err(err) => err.into(),
        }
    }
}

impl Validator for CombiningValidator {
    fn validate(&self, token: &Token) -> ValidationResult {
        for (index, validator) in self.validators.iter().enumerate() {
            let result = validator.validate(token);
            if let ValidationResult::Invalid { error_description } = &result {
                debug!("jwt validation step {index} failed: {error_description}");
                return result;
            }
        }
        ValidationResult::Valid
    }
}

impl fmt::Debug for CombiningValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombiningValidator")
            .field("validators", &self.validators.len())
            .finish()
    }
}
