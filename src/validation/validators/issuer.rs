use crate::error::Error;
use crate::token::Token;
use crate::validation::{ValidationResult, Validator};
use url::Url;

use super::host_matches_domain;

/// Accepts tokens whose `iss` host is the identity-provider domain or a
/// subdomain of it.
#[derive(Debug, Clone)]
pub struct XsuaaJwtIssuerValidator {
    domain: String,
}

impl XsuaaJwtIssuerValidator {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn check(&self, token: &Token) -> Result<(), Error> {
        let issuer = token.issuer().filter(|iss| !iss.trim().is_empty()).ok_or_else(|| {
            Error::IssuerMismatch(
                "Issuer validation can not be performed because Jwt token does not contain 'iss' claim."
                    .to_string(),
            )
        })?;
        let mismatch = || {
            Error::IssuerMismatch(format!(
                "Issuer {issuer} does not match the domain {} of the identity provider.",
                self.domain
            ))
        };
        let url = if issuer.contains("://") {
            Url::parse(issuer)
        } else {
            Url::parse(&format!("https://{issuer}"))
        }
        .map_err(|_| mismatch())?;
        match url.host_str() {
            Some(host) if host_matches_domain(host, &self.domain) => Ok(()),
            _ => Err(mismatch()),
        }
    }
}

impl Validator for XsuaaJwtIssuerValidator {
    fn validate(&self, token: &Token) -> ValidationResult {
        self.check(token).into()
    }
}
