use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
/// Fixed from-address and display name used for every send of one client.
///
/// Neither part is validated locally; the Kannon service decides what it accepts.
pub struct Sender {
    email: String,
    alias: String,
}

impl Sender {
    /// Create a sender from an email address and a display alias.
    pub fn new(email: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            alias: alias.into(),
        }
    }

    /// Sender email address as provided.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Sender display name as provided.
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
/// Opaque credential derived from a Kannon domain and its API key.
///
/// The token is `base64(domain ":" api_key)`, concatenated before encoding, so any
/// `:` inside the key is kept as-is.
pub struct AuthToken(String);

impl AuthToken {
    /// gRPC metadata key carrying the credential.
    pub const METADATA_KEY: &'static str = "authorization";

    /// Encode `domain` and `api_key` into a token.
    pub fn encode(domain: &str, api_key: &str) -> Self {
        Self(BASE64.encode(format!("{domain}:{api_key}")))
    }

    /// Borrow the base64 token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `authorization` metadata entry (`Basic <token>`).
    pub fn authorization(&self) -> String {
        format!("Basic {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Resolved gRPC endpoint: an `http`/`https` origin plus the security mode it implies.
///
/// Invariant: the URI has a host and its scheme is `http` (plaintext) or `https` (TLS).
pub struct Endpoint {
    uri: String,
    tls: bool,
}

impl Endpoint {
    /// Configuration field name (`endpoint`).
    pub const FIELD: &'static str = "endpoint";

    /// Port dialed for a bare host without an explicit port, in either security mode.
    pub const DEFAULT_PORT: u16 = 443;

    /// Parse an endpoint in connection-string form.
    ///
    /// An explicit `http://` or `https://` scheme selects the security mode and the
    /// scheme's usual default port. A bare `host[:port]` uses TLS unless `skip_tls`
    /// is set, and dials [`Endpoint::DEFAULT_PORT`] when no port is given.
    pub fn parse(input: impl Into<String>, skip_tls: bool) -> Result<Self, ValidationError> {
        let input = input.into();
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let invalid = |reason: String| ValidationError::InvalidEndpoint {
            input: trimmed.to_owned(),
            reason,
        };

        let candidate = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            // A scheme without a default port keeps the caller's port (or its absence) visible.
            let bare = url::Url::parse(&format!("grpc://{trimmed}"))
                .map_err(|err| invalid(err.to_string()))?;
            let host = bare
                .host_str()
                .filter(|host| !host.is_empty())
                .ok_or_else(|| invalid("missing host".to_owned()))?;
            let scheme = if skip_tls { "http" } else { "https" };
            let port = bare.port().unwrap_or(Self::DEFAULT_PORT);
            format!("{scheme}://{host}:{port}")
        };

        let url = url::Url::parse(&candidate).map_err(|err| invalid(err.to_string()))?;

        let tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(ValidationError::UnsupportedScheme {
                    scheme: other.to_owned(),
                });
            }
        };

        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_owned()));
        }

        Ok(Self {
            uri: url.origin().ascii_serialization(),
            tls,
        })
    }

    /// Normalized origin, e.g. `https://api.kannon.email`.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Whether the channel is negotiated over TLS.
    pub fn uses_tls(&self) -> bool {
        self.tls
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}
