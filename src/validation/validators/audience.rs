use crate::error::Error;
use crate::token::Token;
use crate::validation::{ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Eq)]
struct XsuaaIdentity {
    app_id: String,
    client_id: String,
}

impl XsuaaIdentity {
    fn accepts(&self, token_client_id: Option<&str>, audiences: &[String]) -> bool {
        if token_client_id == Some(self.client_id.as_str()) {
            return true;
        }
        // Broker clone tokens carry `<clone client id>|<broker app id>`.
        if self.app_id.contains("!b")
            && token_client_id.is_some_and(|cid| cid.ends_with(&format!("|{}", self.app_id)))
        {
            return true;
        }
        let client_id_without_tenant = strip_tenant_suffix(&self.client_id);
        audiences.iter().any(|aud| {
            aud == &self.app_id || aud == &self.client_id || aud == client_id_without_tenant
        })
    }
}

/// XSUAA audience check.
///
/// `aud` entries of the form `<name>.<scope>` count as `<name>`. Without an
/// `aud` claim, audiences are derived from scopes. A second service instance
/// may be configured while an application id is being migrated.
#[derive(Debug, Clone)]
pub struct XsuaaJwtAudienceValidator {
    identities: Vec<XsuaaIdentity>,
}

impl XsuaaJwtAudienceValidator {
    pub fn new(app_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            identities: vec![XsuaaIdentity {
                app_id: app_id.into(),
                client_id: client_id.into(),
            }],
        }
    }

    pub fn configure_another_service_instance(
        mut self,
        app_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        self.identities.push(XsuaaIdentity {
            app_id: app_id.into(),
            client_id: client_id.into(),
        });
        self
    }

    fn check(&self, token: &Token) -> Result<(), Error> {
        let audiences = allowed_audiences(token);
        let token_client_id = token.client_id();
        if self
            .identities
            .iter()
            .any(|identity| identity.accepts(token_client_id, &audiences))
        {
            return Ok(());
        }
        let expected: Vec<&str> = self
            .identities
            .iter()
            .flat_map(|identity| [identity.app_id.as_str(), identity.client_id.as_str()])
            .collect();
        Err(Error::AudienceMismatch(format!(
            "Jwt token with audience {audiences:?} is not issued for these identifiers: {expected:?}."
        )))
    }
}

impl Validator for XsuaaJwtAudienceValidator {
    fn validate(&self, token: &Token) -> ValidationResult {
        self.check(token).into()
    }
}

fn allowed_audiences(token: &Token) -> Vec<String> {
    let aud = token.audiences();
    let candidates: Vec<String> = if aud.is_empty() {
        token
            .scopes()
            .into_iter()
            .filter(|scope| scope.contains('.'))
            .collect()
    } else {
        aud
    };
    let mut audiences = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let name = match candidate.split_once('.') {
            Some((name, _)) => name,
            None => candidate.as_str(),
        }
        .trim();
        if !name.is_empty() && !audiences.iter().any(|known: &String| known == name) {
            audiences.push(name.to_string());
        }
    }
    audiences
}

fn strip_tenant_suffix(client_id: &str) -> &str {
    client_id.split('!').next().unwrap_or(client_id)
}

/// Accepts tokens whose `aud` lists one of the configured client ids, or
/// whose authorized party is one of them.
#[derive(Debug, Clone)]
pub struct JwtAudienceValidator {
    client_ids: Vec<String>,
}

impl JwtAudienceValidator {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_ids: vec![client_id.into()],
        }
    }

    pub fn configure_trusted_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_ids.push(client_id.into());
        self
    }

    fn check(&self, token: &Token) -> Result<(), Error> {
        let audiences = token.audiences();
        let trusted = |id: &str| self.client_ids.iter().any(|client_id| client_id == id);
        if audiences.iter().any(|aud| trusted(aud.as_str())) {
            return Ok(());
        }
        if audiences.is_empty() && token.client_id().is_some_and(trusted) {
            return Ok(());
        }
        Err(Error::AudienceMismatch(format!(
            "Jwt token with audience {audiences:?} is not issued for these clientIds: {:?}.",
            self.client_ids
        )))
    }
}

impl Validator for JwtAudienceValidator {
    fn validate(&self, token: &Token) -> ValidationResult {
        self.check(token).into()
    }
}
