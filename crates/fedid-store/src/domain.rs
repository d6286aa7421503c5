//! A domain: a named bundle of connectors and mappings serving one logical
//! user population.
//!
//! Domains are assembled through [`DomainBuilder`] at init and frozen
//! afterwards; every field is private and nothing exposes mutation, so the
//! read paths can share a domain freely across threads.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use fedid_core::claim::{self, MetaClaimMapping};
use fedid_core::error::Error;
use fedid_core::id::ConnectorId;

use crate::connector::{CredentialStoreConnector, IdentityStoreConnector};
use crate::mapper;
use crate::resolver::UniqueIdResolver;
use crate::Result;

/// A named bundle of identity connectors, credential connectors, the claim
/// mapping table, and the unique-id resolver.
pub struct Domain {
    name: String,
    priority: u32,
    identity_connectors: Vec<Arc<dyn IdentityStoreConnector>>,
    credential_connectors: Vec<Arc<dyn CredentialStoreConnector>>,
    mappings: Vec<MetaClaimMapping>,
    mapping_index: HashMap<String, usize>,
    resolver: Arc<dyn UniqueIdResolver>,
}

impl Domain {
    /// Starts building a domain.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        priority: u32,
        resolver: Arc<dyn UniqueIdResolver>,
    ) -> DomainBuilder {
        DomainBuilder {
            name: name.into(),
            priority,
            identity_connectors: Vec::new(),
            credential_connectors: Vec::new(),
            mappings: Vec::new(),
            resolver,
        }
    }

    /// Domain name, unique within the registry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordering priority; lower values are tried first.
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    /// Returns true if a mapping resolves the claim URI in this domain.
    #[must_use]
    pub fn is_claim_supported(&self, claim_uri: &str) -> bool {
        self.mapping_index.contains_key(claim_uri)
    }

    /// Resolves the mapping for a claim URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] when the claim URI has no mapping here.
    pub fn meta_claim_mapping(&self, claim_uri: &str) -> Result<&MetaClaimMapping> {
        self.mapping_index
            .get(claim_uri)
            .map(|index| &self.mappings[*index])
            .ok_or_else(|| {
                Error::Domain(format!(
                    "no mapping for claim `{claim_uri}` in domain `{}`",
                    self.name
                ))
            })
    }

    /// The full mapping table.
    #[must_use]
    pub fn meta_claim_mappings(&self) -> &[MetaClaimMapping] {
        &self.mappings
    }

    /// The mapping table grouped by owning connector.
    #[must_use]
    pub fn mappings_by_connector(&self) -> IndexMap<ConnectorId, Vec<MetaClaimMapping>> {
        mapper::mappings_by_connector(&self.mappings)
    }

    /// Identity connectors in configuration order.
    #[must_use]
    pub fn identity_connectors(&self) -> &[Arc<dyn IdentityStoreConnector>] {
        &self.identity_connectors
    }

    /// Credential connectors in configuration order.
    #[must_use]
    pub fn credential_connectors(&self) -> &[Arc<dyn CredentialStoreConnector>] {
        &self.credential_connectors
    }

    /// Looks up an identity connector by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] when no identity connector carries the id.
    pub fn identity_connector(&self, id: &ConnectorId) -> Result<&Arc<dyn IdentityStoreConnector>> {
        self.identity_connectors
            .iter()
            .find(|connector| connector.connector_id() == id)
            .ok_or_else(|| {
                Error::Domain(format!(
                    "no identity store connector `{id}` in domain `{}`",
                    self.name
                ))
            })
    }

    /// Looks up a credential connector by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] when no credential connector carries the id.
    pub fn credential_connector(
        &self,
        id: &ConnectorId,
    ) -> Result<&Arc<dyn CredentialStoreConnector>> {
        self.credential_connectors
            .iter()
            .find(|connector| connector.connector_id() == id)
            .ok_or_else(|| {
                Error::Domain(format!(
                    "no credential store connector `{id}` in domain `{}`",
                    self.name
                ))
            })
    }

    /// The unique-id resolver holding this domain's linkage.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn UniqueIdResolver> {
        &self.resolver
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("identity_connectors", &self.identity_connectors.len())
            .field("credential_connectors", &self.credential_connectors.len())
            .field("mappings", &self.mappings.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Domain`].
pub struct DomainBuilder {
    name: String,
    priority: u32,
    identity_connectors: Vec<Arc<dyn IdentityStoreConnector>>,
    credential_connectors: Vec<Arc<dyn CredentialStoreConnector>>,
    mappings: Vec<MetaClaimMapping>,
    resolver: Arc<dyn UniqueIdResolver>,
}

impl DomainBuilder {
    /// Appends an identity store connector.
    #[must_use]
    pub fn identity_connector(mut self, connector: Arc<dyn IdentityStoreConnector>) -> Self {
        self.identity_connectors.push(connector);
        self
    }

    /// Appends a credential store connector.
    #[must_use]
    pub fn credential_connector(mut self, connector: Arc<dyn CredentialStoreConnector>) -> Self {
        self.credential_connectors.push(connector);
        self
    }

    /// Appends a claim mapping.
    #[must_use]
    pub fn mapping(mut self, mapping: MetaClaimMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Validates and freezes the domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the name is empty, a mapping carries a
    /// malformed URI, two mappings resolve the same claim URI, or a mapping
    /// references a connector the domain does not hold.
    pub fn build(self) -> Result<Domain> {
        if self.name.is_empty() {
            return Err(Error::Config("domain name must not be empty".to_string()));
        }

        let mut mapping_index = HashMap::new();
        for (index, mapping) in self.mappings.iter().enumerate() {
            claim::validate_uri(mapping.meta_claim().dialect_uri())?;
            claim::validate_uri(mapping.meta_claim().claim_uri())?;

            let claim_uri = mapping.meta_claim().claim_uri().to_string();
            if mapping_index.insert(claim_uri, index).is_some() {
                return Err(Error::Config(format!(
                    "claim `{}` is mapped more than once in domain `{}`",
                    mapping.meta_claim().claim_uri(),
                    self.name
                )));
            }

            if !self
                .identity_connectors
                .iter()
                .any(|connector| connector.connector_id() == mapping.connector_id())
            {
                return Err(Error::Config(format!(
                    "mapping for claim `{}` references unknown connector `{}` in domain `{}`",
                    mapping.meta_claim().claim_uri(),
                    mapping.connector_id(),
                    self.name
                )));
            }
        }

        Ok(Domain {
            name: self.name,
            priority: self.priority,
            identity_connectors: self.identity_connectors,
            credential_connectors: self.credential_connectors,
            mappings: self.mappings,
            mapping_index,
            resolver: self.resolver,
        })
    }
}
