//! Claims, meta claims, and their connector-local attribute form.
//!
//! A claim is a dialect-qualified fact about a subject (`(dialect URI, claim
//! URI, value)`); an attribute is the dialect-free `(name, value)` pair a
//! single connector stores. [`MetaClaimMapping`] binds one claim URI to the
//! connector and attribute name that own it within a domain.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::id::ConnectorId;

/// The claim dialect every claim entering the store is expressed in.
pub const DEFAULT_DIALECT_URI: &str = "http://wso2.org/claims";

/// Claim URI that must be present on every new user.
pub const USERNAME_CLAIM_URI: &str = "http://wso2.org/claims/username";

/// A dialect-qualified fact about a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    dialect_uri: String,
    claim_uri: String,
    value: String,
}

impl Claim {
    /// Creates a claim.
    #[must_use]
    pub fn new(
        dialect_uri: impl Into<String>,
        claim_uri: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            dialect_uri: dialect_uri.into(),
            claim_uri: claim_uri.into(),
            value: value.into(),
        }
    }

    /// Creates a claim in the default dialect.
    #[must_use]
    pub fn in_default_dialect(claim_uri: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(DEFAULT_DIALECT_URI, claim_uri, value)
    }

    /// Creates the username claim every new user must carry.
    #[must_use]
    pub fn username(value: impl Into<String>) -> Self {
        Self::in_default_dialect(USERNAME_CLAIM_URI, value)
    }

    /// Dialect URI qualifying the claim.
    #[must_use]
    pub fn dialect_uri(&self) -> &str {
        &self.dialect_uri
    }

    /// Claim URI naming the fact.
    #[must_use]
    pub fn claim_uri(&self) -> &str {
        &self.claim_uri
    }

    /// Claim value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this is the well-known username claim.
    #[must_use]
    pub fn is_username(&self) -> bool {
        self.claim_uri == USERNAME_CLAIM_URI
    }

    /// Returns the schema element of this claim, without its value.
    #[must_use]
    pub fn meta(&self) -> MetaClaim {
        MetaClaim::new(self.dialect_uri.clone(), self.claim_uri.clone())
    }
}

/// The schema of a claim without its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaClaim {
    dialect_uri: String,
    claim_uri: String,
}

impl MetaClaim {
    /// Creates a meta claim.
    #[must_use]
    pub fn new(dialect_uri: impl Into<String>, claim_uri: impl Into<String>) -> Self {
        Self {
            dialect_uri: dialect_uri.into(),
            claim_uri: claim_uri.into(),
        }
    }

    /// Creates a meta claim in the default dialect.
    #[must_use]
    pub fn in_default_dialect(claim_uri: impl Into<String>) -> Self {
        Self::new(DEFAULT_DIALECT_URI, claim_uri)
    }

    /// Dialect URI qualifying the claim.
    #[must_use]
    pub fn dialect_uri(&self) -> &str {
        &self.dialect_uri
    }

    /// Claim URI naming the fact.
    #[must_use]
    pub fn claim_uri(&self) -> &str {
        &self.claim_uri
    }

    /// Returns true if the claim carries the same dialect and claim URIs.
    #[must_use]
    pub fn matches(&self, claim: &Claim) -> bool {
        self.dialect_uri == claim.dialect_uri && self.claim_uri == claim.claim_uri
    }
}

/// Binds one meta claim to the connector and attribute name that own it
/// within a domain.
///
/// A claim URI maps to at most one connector per domain; a mapping marked
/// `unique` resolves to at most one logical user per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaClaimMapping {
    meta_claim: MetaClaim,
    connector_id: ConnectorId,
    attribute_name: String,
    unique: bool,
}

impl MetaClaimMapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(
        meta_claim: MetaClaim,
        connector_id: ConnectorId,
        attribute_name: impl Into<String>,
    ) -> Self {
        Self {
            meta_claim,
            connector_id,
            attribute_name: attribute_name.into(),
            unique: false,
        }
    }

    /// Marks the mapped claim as unique within the domain.
    #[must_use]
    pub const fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// The mapped schema element.
    #[must_use]
    pub const fn meta_claim(&self) -> &MetaClaim {
        &self.meta_claim
    }

    /// Identity store connector that owns the mapped attribute.
    #[must_use]
    pub const fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Connector-local attribute name.
    #[must_use]
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// Returns true if the mapped claim resolves to at most one logical user.
    #[must_use]
    pub const fn unique(&self) -> bool {
        self.unique
    }

    /// Returns true if the claim carries this mapping's dialect and claim URIs.
    #[must_use]
    pub fn matches(&self, claim: &Claim) -> bool {
        self.meta_claim.matches(claim)
    }
}

/// The connector-local form of a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Validates that a dialect or claim URI is a well-formed absolute URI.
///
/// # Errors
///
/// Returns [`Error::Config`] if the URI is empty or does not parse.
pub fn validate_uri(uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(Error::Config("claim URI must not be empty".to_string()));
    }
    Url::parse(uri).map_err(|err| Error::Config(format!("invalid claim URI `{uri}`: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_claim_shape() {
        let claim = Claim::username("alice");
        assert!(claim.is_username());
        assert_eq!(claim.dialect_uri(), DEFAULT_DIALECT_URI);
        assert_eq!(claim.value(), "alice");
    }

    #[test]
    fn meta_claim_matches_same_uris_only() {
        let meta = MetaClaim::in_default_dialect("http://wso2.org/claims/email");
        assert!(meta.matches(&Claim::in_default_dialect(
            "http://wso2.org/claims/email",
            "a@x"
        )));
        assert!(!meta.matches(&Claim::username("alice")));
        assert!(!meta.matches(&Claim::new(
            "http://other.dialect/claims",
            "http://wso2.org/claims/email",
            "a@x"
        )));
    }

    #[test]
    fn mapping_defaults_to_non_unique() {
        let mapping = MetaClaimMapping::new(
            MetaClaim::in_default_dialect("http://wso2.org/claims/email"),
            ConnectorId::new("ldap1"),
            "mail",
        );
        assert!(!mapping.unique());
        assert!(mapping.with_unique(true).unique());
    }

    #[test]
    fn validate_uri_rejects_empty_and_malformed() {
        assert!(matches!(validate_uri("").unwrap_err(), Error::Config(_)));
        assert!(matches!(
            validate_uri("not a uri").unwrap_err(),
            Error::Config(_)
        ));
        assert!(validate_uri(USERNAME_CLAIM_URI).is_ok());
    }

    #[test]
    fn claim_serde_round_trip() {
        let claim = Claim::in_default_dialect("http://wso2.org/claims/email", "a@x");
        let json = serde_json::to_string(&claim).unwrap();
        let back: Claim = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claim);
    }
}
