use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    InvalidEndpoint { input: String, reason: String },
    UnsupportedScheme { scheme: String },
    ConflictingEndpoint { endpoint: String, host: String },
    InvalidMetadata { key: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidEndpoint { input, reason } => {
                write!(f, "invalid endpoint {input:?}: {reason}")
            }
            Self::UnsupportedScheme { scheme } => {
                write!(f, "unsupported endpoint scheme: {scheme} (expected http or https)")
            }
            Self::ConflictingEndpoint { endpoint, host } => {
                write!(
                    f,
                    "endpoint {endpoint:?} conflicts with legacy host {host:?}"
                )
            }
            Self::InvalidMetadata { key } => {
                write!(f, "{key} is not a valid ASCII metadata value")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
