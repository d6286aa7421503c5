//! Translation between logical claims and connector-local attributes, and
//! routing of credentials to the connectors that can store them.
//!
//! These functions are pure; the store calls them to partition a write
//! across connectors and to reassemble claims from fetched attributes.
//! Fan-out maps are insertion-ordered, so connectors are always visited in
//! the order the input first referenced them.

use indexmap::IndexMap;
use std::sync::Arc;

use fedid_core::claim::{Attribute, Claim, MetaClaim, MetaClaimMapping};
use fedid_core::credential::Credential;
use fedid_core::id::ConnectorId;

use crate::connector::CredentialStoreConnector;

/// Partitions claims into per-connector attribute lists.
///
/// Claims with no mapping have nowhere to go and are dropped.
#[must_use]
pub fn claims_to_connector_attributes(
    claims: &[Claim],
    mappings: &[MetaClaimMapping],
) -> IndexMap<ConnectorId, Vec<Attribute>> {
    let mut result: IndexMap<ConnectorId, Vec<Attribute>> = IndexMap::new();

    for claim in claims {
        let Some(mapping) = mappings.iter().find(|mapping| mapping.matches(claim)) else {
            continue;
        };
        result
            .entry(mapping.connector_id().clone())
            .or_default()
            .push(Attribute::new(mapping.attribute_name(), claim.value()));
    }

    result
}

/// Reassembles claims from per-connector attribute lists.
///
/// Attributes with no corresponding mapping are dropped; a claim URI has at
/// most one mapping per domain, so the result carries no duplicates.
#[must_use]
pub fn connector_attributes_to_claims(
    mappings: &[MetaClaimMapping],
    attributes: &IndexMap<ConnectorId, Vec<Attribute>>,
) -> Vec<Claim> {
    let mut claims = Vec::new();

    for (connector_id, connector_attributes) in attributes {
        if connector_attributes.is_empty() {
            continue;
        }
        for attribute in connector_attributes {
            let Some(mapping) = mappings.iter().find(|mapping| {
                mapping.connector_id() == connector_id
                    && mapping.attribute_name() == attribute.name()
            }) else {
                continue;
            };
            claims.push(Claim::new(
                mapping.meta_claim().dialect_uri(),
                mapping.meta_claim().claim_uri(),
                attribute.value(),
            ));
        }
    }

    claims
}

/// Routes each credential to the first connector whose `can_store` accepts
/// it. Credentials unclaimed by every connector are dropped.
#[must_use]
pub fn credentials_to_connectors(
    credentials: Vec<Credential>,
    connectors: &[Arc<dyn CredentialStoreConnector>],
) -> IndexMap<ConnectorId, Vec<Credential>> {
    let mut result: IndexMap<ConnectorId, Vec<Credential>> = IndexMap::new();

    for credential in credentials {
        let Some(connector) = connectors
            .iter()
            .find(|connector| connector.can_store(&credential))
        else {
            continue;
        };
        result
            .entry(connector.connector_id().clone())
            .or_default()
            .push(credential);
    }

    result
}

/// Resolves the per-connector attribute names behind a set of meta claims.
///
/// Used to pre-filter attribute reads when a caller asks for specific
/// claims only.
#[must_use]
pub fn meta_claims_to_attribute_names(
    meta_claims: &[MetaClaim],
    mappings: &[MetaClaimMapping],
) -> IndexMap<ConnectorId, Vec<String>> {
    let mut result: IndexMap<ConnectorId, Vec<String>> = IndexMap::new();

    for meta_claim in meta_claims {
        let Some(mapping) = mappings
            .iter()
            .find(|mapping| mapping.meta_claim() == meta_claim)
        else {
            continue;
        };
        result
            .entry(mapping.connector_id().clone())
            .or_default()
            .push(mapping.attribute_name().to_string());
    }

    result
}

/// Groups a mapping table by owning connector.
///
/// Mappings with an empty claim URI can never match a claim and are
/// skipped.
#[must_use]
pub fn mappings_by_connector(
    mappings: &[MetaClaimMapping],
) -> IndexMap<ConnectorId, Vec<MetaClaimMapping>> {
    let mut result: IndexMap<ConnectorId, Vec<MetaClaimMapping>> = IndexMap::new();

    for mapping in mappings {
        if mapping.meta_claim().claim_uri().is_empty() {
            continue;
        }
        result
            .entry(mapping.connector_id().clone())
            .or_default()
            .push(mapping.clone());
    }

    result
}
