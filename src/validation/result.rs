use crate::error::Error;
use std::fmt;

/// Outcome of a validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ValidationResult {
    Valid,
    Invalid { error_description: String },
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::Valid
    }

    pub fn invalid(error_description: impl Into<String>) -> Self {
        Self::Invalid {
            error_description: error_description.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_erroneous(&self) -> bool {
        !self.is_valid()
    }

    pub fn error_description(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { error_description } => Some(error_description),
        }
    }
}

impl From<Error> for ValidationResult {
    fn from(err: Error) -> Self {
        Self::invalid(err.to_string())
    }
}

impl From<Result<(), Error>> for ValidationResult {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::Valid,
            Err(err) => err.into(),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Invalid { error_description } => write!(f, "invalid: {error_description}"),
        }
    }
}
