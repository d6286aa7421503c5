//! Credential material and the verification input handed to credential
//! store connectors.
//!
//! The store treats credential secrets as opaque: hashing and comparison
//! live behind the credential connector contract.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Well-known metadata key carrying the connector-local user id during
/// credential verification.
pub const CREDENTIAL_USER_ID_KEY: &str = "user_id";

/// Credential kind for password secrets.
pub const PASSWORD_CREDENTIAL_KIND: &str = "password";

/// A single piece of credential material.
#[derive(Debug, Clone)]
pub struct Credential {
    kind: String,
    secret: SecretString,
}

impl Credential {
    /// Creates a credential of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Creates a password credential.
    #[must_use]
    pub fn password(secret: impl Into<String>) -> Self {
        Self::new(PASSWORD_CREDENTIAL_KIND, secret)
    }

    /// Credential kind (e.g. `password`).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The secret material. Connectors expose it only at the verification
    /// boundary.
    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        &self.secret
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.secret.expose_secret() == other.secret.expose_secret()
    }
}

/// A credential plus the metadata a credential connector needs to verify it.
#[derive(Debug, Clone)]
pub struct CredentialInput {
    credential: Credential,
    metadata: HashMap<String, String>,
}

impl CredentialInput {
    /// Creates a verification input for the given credential.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The credential under verification.
    #[must_use]
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }

    /// All attached metadata.
    #[must_use]
    pub const fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Connector-local user id attached under the well-known key, if any.
    #[must_use]
    pub fn connector_user_id(&self) -> Option<&str> {
        self.metadata
            .get(CREDENTIAL_USER_ID_KEY)
            .map(String::as_str)
    }
}
