//! The virtual identity store orchestrator.
//!
//! Public read/write/authentication operations over the federated
//! directory. Every operation resolves a target domain (the caller's, or
//! the primary domain when none is named), fans out to that domain's
//! connectors, and commits linkage to the unique-id resolver last. Partial
//! write failures are compensated before the error surfaces, so no orphan
//! partitions remain in the backends.
//!
//! The store holds no locks of its own; concurrency control is delegated
//! to the resolver and to each connector.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use fedid_core::claim::{Attribute, Claim, MetaClaim, USERNAME_CLAIM_URI};
use fedid_core::credential::{Credential, CredentialInput, CREDENTIAL_USER_ID_KEY};
use fedid_core::error::Error;
use fedid_core::id::{ConnectorId, GroupId, UserId};
use fedid_core::partition::{PartitionKind, UniqueGroup, UniqueUser, UserPartition};

use crate::domain::Domain;
use crate::handle::{AuthenticationContext, Group, User};
use crate::mapper;
use crate::model::{GroupModel, UserModel};
use crate::registry::DomainRegistry;
use crate::Result;

/// One logical user/group directory federated over the registered domains.
#[derive(Debug)]
pub struct VirtualIdentityStore {
    registry: DomainRegistry,
}

impl VirtualIdentityStore {
    /// Initializes the store over the given domains, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the domain list is empty or invalid.
    pub fn init(domains: Vec<Domain>) -> Result<Self> {
        Ok(Self {
            registry: DomainRegistry::new(domains)?,
        })
    }

    /// The domain registry backing this store.
    #[must_use]
    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    /// Resolves the target domain for an operation. An absent or empty
    /// domain name falls back to the primary domain; an unknown name is a
    /// server error.
    fn resolve_domain(&self, domain_name: Option<&str>) -> Result<Arc<Domain>> {
        match domain_name {
            Some(name) if !name.is_empty() => self
                .registry
                .domain(name)
                .map(Arc::clone)
                .map_err(|err| Error::server_with_cause(format!("unknown domain `{name}`"), err)),
            _ => self.registry.primary_domain().map(Arc::clone),
        }
    }

    // ---------------------------------------------------------------------
    // Users: reads
    // ---------------------------------------------------------------------

    /// Fetches a handle to the user with the given logical id.
    pub async fn fetch_user(&self, user_id: UserId, domain_name: Option<&str>) -> Result<User> {
        let domain = self.resolve_domain(domain_name)?;
        let exists = domain
            .resolver()
            .is_user_exists(user_id)
            .await
            .map_err(|err| Error::server_with_cause("failed to check user linkage", err))?;
        if !exists {
            return Err(Error::UserNotFound(format!(
                "user `{user_id}` does not exist"
            )));
        }
        Ok(User::new(user_id, domain.name()))
    }

    /// Fetches a handle to the user holding the given claim value.
    pub async fn fetch_user_by_claim(
        &self,
        claim: &Claim,
        domain_name: Option<&str>,
    ) -> Result<User> {
        if claim.value().is_empty() {
            return Err(Error::Client("claim value must not be empty".to_string()));
        }
        let domain = self.resolve_domain(domain_name)?;
        let mapping = domain
            .meta_claim_mapping(claim.claim_uri())
            .map_err(|_| unsupported_claim(claim.claim_uri(), domain.name()))?;
        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(config_fault)?;

        let local_id = match connector
            .get_connector_user_id(mapping.attribute_name(), claim.value())
            .await
        {
            Ok(local_id) => local_id,
            Err(err @ Error::UserNotFound(_)) => return Err(err),
            Err(err) => return Err(Error::server_with_cause("attribute lookup failed", err)),
        };

        let unique_user = domain
            .resolver()
            .get_unique_user_from_connector_user_id(&local_id, mapping.connector_id())
            .await
            .map_err(|err| Error::server_with_cause("user partition has no linkage", err))?;
        Ok(User::new(unique_user.user_id(), domain.name()))
    }

    /// Lists users. `length == 0` yields an empty list without touching any
    /// backend. Pagination semantics beyond that are connector-defined.
    pub async fn list_users(
        &self,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> Result<Vec<User>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        let users = domain
            .resolver()
            .list_users(offset, length)
            .await
            .map_err(|err| Error::server_with_cause("failed to list user linkages", err))?;
        Ok(users
            .into_iter()
            .map(|user| User::new(user.user_id(), domain.name()))
            .collect())
    }

    /// Lists users whose claim equals the given value.
    pub async fn list_users_by_claim(
        &self,
        claim: &Claim,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> Result<Vec<User>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        if claim.value().is_empty() {
            return Err(Error::Client("claim value must not be empty".to_string()));
        }
        let domain = self.resolve_domain(domain_name)?;
        let mapping = domain
            .meta_claim_mapping(claim.claim_uri())
            .map_err(|_| unsupported_claim(claim.claim_uri(), domain.name()))?;
        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(config_fault)?;
        let local_ids = connector
            .list_connector_user_ids(mapping.attribute_name(), claim.value(), offset, length)
            .await
            .map_err(|err| Error::server_with_cause("attribute listing failed", err))?;
        let users = domain
            .resolver()
            .get_unique_users(local_ids, mapping.connector_id())
            .await
            .map_err(|err| Error::server_with_cause("failed to resolve user linkages", err))?;
        Ok(users
            .into_iter()
            .map(|user| User::new(user.user_id(), domain.name()))
            .collect())
    }

    /// Lists users whose claim matches the given pattern. Pattern syntax is
    /// connector-defined.
    pub async fn list_users_by_pattern(
        &self,
        meta_claim: &MetaClaim,
        pattern: &str,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> Result<Vec<User>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        if pattern.is_empty() {
            return Err(Error::Client("pattern must not be empty".to_string()));
        }
        let domain = self.resolve_domain(domain_name)?;
        let mapping = domain
            .meta_claim_mapping(meta_claim.claim_uri())
            .map_err(|_| unsupported_claim(meta_claim.claim_uri(), domain.name()))?;
        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(config_fault)?;
        let local_ids = connector
            .list_connector_user_ids_by_pattern(mapping.attribute_name(), pattern, offset, length)
            .await
            .map_err(|err| Error::server_with_cause("attribute listing failed", err))?;
        let users = domain
            .resolver()
            .get_unique_users(local_ids, mapping.connector_id())
            .await
            .map_err(|err| Error::server_with_cause("failed to resolve user linkages", err))?;
        Ok(users
            .into_iter()
            .map(|user| User::new(user.user_id(), domain.name()))
            .collect())
    }

    /// Fetches the claims of a user, optionally restricted to the given
    /// meta claims.
    pub async fn user_claims(
        &self,
        user_id: UserId,
        meta_claims: Option<&[MetaClaim]>,
        domain_name: Option<&str>,
    ) -> Result<Vec<Claim>> {
        let domain = self.resolve_domain(domain_name)?;
        let unique_user = domain
            .resolver()
            .get_unique_user(user_id)
            .await
            .map_err(surface_not_found)?;

        let name_filter = meta_claims
            .map(|meta| mapper::meta_claims_to_attribute_names(meta, domain.meta_claim_mappings()));

        let mut attributes: IndexMap<ConnectorId, Vec<Attribute>> = IndexMap::new();
        for partition in unique_user.identity_partitions() {
            let names = match &name_filter {
                Some(filter) => match filter.get(partition.connector_id()) {
                    // No requested claim lives in this connector.
                    None => continue,
                    Some(names) => Some(names.clone()),
                },
                None => None,
            };
            let connector = domain
                .identity_connector(partition.connector_id())
                .map_err(config_fault)?;
            let fetched = connector
                .get_user_attribute_values(partition.local_id(), names)
                .await
                .map_err(|err| Error::server_with_cause("attribute fetch failed", err))?;
            attributes
                .entry(partition.connector_id().clone())
                .or_default()
                .extend(fetched);
        }

        Ok(mapper::connector_attributes_to_claims(
            domain.meta_claim_mappings(),
            &attributes,
        ))
    }

    // ---------------------------------------------------------------------
    // Users: writes
    // ---------------------------------------------------------------------

    /// Creates a user from the model's claims and credentials.
    ///
    /// Partitions are written connector by connector; on any failure every
    /// partition written so far is compensated and the error surfaces as a
    /// server error. The linkage commit to the resolver happens last.
    pub async fn add_user(&self, model: UserModel, domain_name: Option<&str>) -> Result<User> {
        let domain = self.resolve_domain(domain_name)?;
        let (claims, credentials) = model.into_parts();
        validate_new_user(&claims, &credentials)?;

        let mut partitions: Vec<UserPartition> = Vec::new();

        let attribute_map =
            mapper::claims_to_connector_attributes(&claims, domain.meta_claim_mappings());
        for (connector_id, attributes) in attribute_map {
            let written = match domain.identity_connector(&connector_id) {
                Ok(connector) => connector.add_user(attributes).await,
                Err(err) => Err(err),
            };
            match written {
                Ok(local_id) => partitions.push(UserPartition::new(
                    connector_id,
                    local_id,
                    PartitionKind::Identity,
                )),
                Err(err) => {
                    compensate_user_partitions(&domain, &partitions).await;
                    return Err(Error::server_with_cause(
                        "failed to write user partition",
                        err,
                    ));
                }
            }
        }

        let credential_map =
            mapper::credentials_to_connectors(credentials, domain.credential_connectors());
        for (connector_id, connector_credentials) in credential_map {
            let written = match domain.credential_connector(&connector_id) {
                Ok(connector) => connector.add_credential(connector_credentials).await,
                Err(err) => Err(err),
            };
            match written {
                Ok(local_id) => partitions.push(UserPartition::new(
                    connector_id,
                    local_id,
                    PartitionKind::Credential,
                )),
                Err(err) => {
                    compensate_user_partitions(&domain, &partitions).await;
                    return Err(Error::server_with_cause(
                        "failed to write credential partition",
                        err,
                    ));
                }
            }
        }

        let user_id = UserId::new_v4();
        let unique_user = UniqueUser::new(user_id, partitions.clone());
        if let Err(err) = domain.resolver().add_user(unique_user, domain.name()).await {
            compensate_user_partitions(&domain, &partitions).await;
            return Err(Error::server_with_cause(
                "failed to commit user linkage",
                err,
            ));
        }

        Ok(User::new(user_id, domain.name()))
    }

    /// Creates a batch of users.
    ///
    /// Creation is all-or-nothing: if any connector rejects a batch entry,
    /// every partition written during the call is compensated and the error
    /// surfaces as a server error. Bulk creation accepts claims only.
    pub async fn add_users(
        &self,
        models: Vec<UserModel>,
        domain_name: Option<&str>,
    ) -> Result<Vec<User>> {
        if models.is_empty() {
            return Err(Error::Client(
                "at least one user model is required".to_string(),
            ));
        }
        let domain = self.resolve_domain(domain_name)?;

        // Correlate entries across connectors with per-user tokens.
        let mut keys: Vec<Uuid> = Vec::with_capacity(models.len());
        let mut batches: IndexMap<ConnectorId, IndexMap<Uuid, Vec<Attribute>>> = IndexMap::new();
        for model in models {
            let (claims, credentials) = model.into_parts();
            if !credentials.is_empty() {
                return Err(Error::Client(
                    "bulk user creation does not accept credentials".to_string(),
                ));
            }
            validate_new_user(&claims, &[])?;

            let key = Uuid::new_v4();
            keys.push(key);
            let attribute_map =
                mapper::claims_to_connector_attributes(&claims, domain.meta_claim_mappings());
            for (connector_id, attributes) in attribute_map {
                batches
                    .entry(connector_id)
                    .or_default()
                    .insert(key, attributes);
            }
        }

        let mut written: IndexMap<Uuid, Vec<UserPartition>> =
            keys.iter().map(|key| (*key, Vec::new())).collect();
        let mut failure: Option<Error> = None;
        for (connector_id, batch) in &batches {
            let results = match domain.identity_connector(connector_id) {
                Ok(connector) => connector.add_users(batch.clone()).await,
                Err(err) => Err(err),
            };
            match results {
                Ok(results) => {
                    let mut incomplete = false;
                    for key in batch.keys() {
                        if let Some(local_id) = results.get(key) {
                            if let Some(partitions) = written.get_mut(key) {
                                partitions.push(UserPartition::new(
                                    connector_id.clone(),
                                    local_id.clone(),
                                    PartitionKind::Identity,
                                ));
                            }
                        } else {
                            incomplete = true;
                        }
                    }
                    if incomplete {
                        failure = Some(Error::ConnectorWrite(format!(
                            "connector `{connector_id}` skipped entries in a bulk write"
                        )));
                        break;
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(cause) = failure {
            let all_written: Vec<UserPartition> = written.values().flatten().cloned().collect();
            compensate_user_partitions(&domain, &all_written).await;
            return Err(Error::server_with_cause("bulk user creation failed", cause));
        }

        let unique_users: Vec<UniqueUser> = keys
            .iter()
            .map(|key| {
                UniqueUser::new(
                    UserId::new_v4(),
                    written.shift_remove(key).unwrap_or_default(),
                )
            })
            .collect();
        if let Err(err) = domain
            .resolver()
            .add_users(unique_users.clone(), domain.name())
            .await
        {
            let all_written: Vec<UserPartition> = unique_users
                .iter()
                .flat_map(|user| user.partitions().iter().cloned())
                .collect();
            compensate_user_partitions(&domain, &all_written).await;
            return Err(Error::server_with_cause(
                "failed to commit user linkages",
                err,
            ));
        }

        Ok(unique_users
            .into_iter()
            .map(|user| User::new(user.user_id(), domain.name()))
            .collect())
    }

    /// Replaces the claims of a user.
    ///
    /// Connectors already holding a partition are updated; connectors that
    /// gain claims receive a fresh partition. The resolver is only touched
    /// when the partition map actually changed.
    pub async fn update_user_claims(
        &self,
        user_id: UserId,
        claims: Vec<Claim>,
        domain_name: Option<&str>,
    ) -> Result<()> {
        let domain = self.resolve_domain(domain_name)?;
        let unique_user = domain
            .resolver()
            .get_unique_user(user_id)
            .await
            .map_err(surface_not_found)?;

        let existing: IndexMap<ConnectorId, String> = unique_user
            .identity_partitions()
            .map(|partition| {
                (
                    partition.connector_id().clone(),
                    partition.local_id().to_string(),
                )
            })
            .collect();

        let mut updated: IndexMap<ConnectorId, String> = IndexMap::new();
        if claims.is_empty() {
            for (connector_id, local_id) in &existing {
                let connector = domain
                    .identity_connector(connector_id)
                    .map_err(config_fault)?;
                let new_id = connector
                    .update_user_attributes(local_id, Vec::new())
                    .await
                    .map_err(|err| Error::server_with_cause("attribute update failed", err))?;
                updated.insert(connector_id.clone(), new_id);
            }
        } else {
            let attribute_map =
                mapper::claims_to_connector_attributes(&claims, domain.meta_claim_mappings());
            for (connector_id, attributes) in attribute_map {
                let connector = domain
                    .identity_connector(&connector_id)
                    .map_err(config_fault)?;
                let new_id = match existing.get(&connector_id) {
                    Some(local_id) => connector
                        .update_user_attributes(local_id, attributes)
                        .await
                        .map_err(|err| Error::server_with_cause("attribute update failed", err))?,
                    None => connector
                        .add_user(attributes)
                        .await
                        .map_err(|err| Error::server_with_cause("partition write failed", err))?,
                };
                updated.insert(connector_id, new_id);
            }
            // Connectors whose claims were all removed keep their partition
            // with an empty attribute set.
            for (connector_id, local_id) in &existing {
                if updated.contains_key(connector_id) {
                    continue;
                }
                let connector = domain
                    .identity_connector(connector_id)
                    .map_err(config_fault)?;
                let new_id = connector
                    .update_user_attributes(local_id, Vec::new())
                    .await
                    .map_err(|err| Error::server_with_cause("attribute update failed", err))?;
                updated.insert(connector_id.clone(), new_id);
            }
        }

        if updated != existing {
            domain
                .resolver()
                .update_user(user_id, updated)
                .await
                .map_err(|err| Error::server_with_cause("failed to update user linkage", err))?;
        }
        Ok(())
    }

    /// Deletes a user: every partition first, the resolver linkage last.
    ///
    /// The linkage is only removed once every partition delete succeeded,
    /// so a failed delete can be retried.
    pub async fn delete_user(&self, user_id: UserId, domain_name: Option<&str>) -> Result<()> {
        let domain = self.resolve_domain(domain_name)?;
        let unique_user = domain
            .resolver()
            .get_unique_user(user_id)
            .await
            .map_err(surface_not_found)?;

        let mut failure: Option<Error> = None;
        for partition in unique_user.partitions() {
            let deleted = if partition.is_identity_store() {
                match domain.identity_connector(partition.connector_id()) {
                    Ok(connector) => connector.delete_user(partition.local_id()).await,
                    Err(err) => Err(err),
                }
            } else {
                match domain.credential_connector(partition.connector_id()) {
                    Ok(connector) => connector.delete_credential(partition.local_id()).await,
                    Err(err) => Err(err),
                }
            };
            if let Err(err) = deleted {
                warn!(
                    connector = %partition.connector_id(),
                    error = %err,
                    "failed to delete user partition"
                );
                failure.get_or_insert(err);
            }
        }
        if let Some(cause) = failure {
            return Err(Error::server_with_cause(
                "failed to delete every user partition",
                cause,
            ));
        }

        domain
            .resolver()
            .delete_user(user_id)
            .await
            .map_err(|err| Error::server_with_cause("failed to remove user linkage", err))
    }

    // ---------------------------------------------------------------------
    // Authentication
    // ---------------------------------------------------------------------

    /// Authenticates the subject identified by the claim against the given
    /// credential.
    ///
    /// Without a domain name, domains supporting the claim are tried in
    /// priority order and the first success wins. Every internal failure is
    /// collapsed into the authentication kind.
    pub async fn authenticate(
        &self,
        claim: &Claim,
        credential: &Credential,
        domain_name: Option<&str>,
    ) -> Result<AuthenticationContext> {
        if claim.value().is_empty() {
            return Err(auth_failure());
        }

        match domain_name {
            Some(name) if !name.is_empty() => {
                let domain = self.registry.domain(name).map_err(|_| auth_failure())?;
                self.authenticate_in_domain(domain, claim, credential).await
            }
            _ => {
                for domain in self.registry.domains() {
                    if !domain.is_claim_supported(claim.claim_uri()) {
                        continue;
                    }
                    match self.authenticate_in_domain(domain, claim, credential).await {
                        Ok(context) => return Ok(context),
                        Err(err) => {
                            debug!(
                                domain = domain.name(),
                                error = %err,
                                "authentication attempt failed, trying next domain"
                            );
                        }
                    }
                }
                Err(auth_failure())
            }
        }
    }

    async fn authenticate_in_domain(
        &self,
        domain: &Domain,
        claim: &Claim,
        credential: &Credential,
    ) -> Result<AuthenticationContext> {
        let mapping = domain
            .meta_claim_mapping(claim.claim_uri())
            .map_err(|_| auth_failure())?;
        if !mapping.unique() {
            return Err(Error::Authentication(
                "claim does not identify a unique user".to_string(),
            ));
        }

        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(|_| auth_failure())?;
        let connector_user_id = connector
            .get_connector_user_id(mapping.attribute_name(), claim.value())
            .await
            .map_err(|_| auth_failure())?;
        let unique_user = domain
            .resolver()
            .get_unique_user_from_connector_user_id(&connector_user_id, mapping.connector_id())
            .await
            .map_err(|_| auth_failure())?;

        for partition in unique_user.credential_partitions() {
            let credential_connector = domain
                .credential_connector(partition.connector_id())
                .map_err(|_| auth_failure())?;
            let input = CredentialInput::new(credential.clone())
                .with_metadata(CREDENTIAL_USER_ID_KEY, partition.local_id());
            if !credential_connector.can_handle(&input) {
                continue;
            }
            return match credential_connector.authenticate(&input).await {
                Ok(()) => Ok(AuthenticationContext::new(User::new(
                    unique_user.user_id(),
                    domain.name(),
                ))),
                Err(_) => Err(auth_failure()),
            };
        }

        Err(auth_failure())
    }

    // ---------------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------------

    /// Fetches a handle to the group with the given logical id.
    pub async fn fetch_group(&self, group_id: GroupId, domain_name: Option<&str>) -> Result<Group> {
        let domain = self.resolve_domain(domain_name)?;
        let exists = domain
            .resolver()
            .is_group_exists(group_id)
            .await
            .map_err(|err| Error::server_with_cause("failed to check group linkage", err))?;
        if !exists {
            return Err(Error::GroupNotFound(format!(
                "group `{group_id}` does not exist"
            )));
        }
        Ok(Group::new(group_id, domain.name()))
    }

    /// Fetches a handle to the group holding the given claim value.
    pub async fn fetch_group_by_claim(
        &self,
        claim: &Claim,
        domain_name: Option<&str>,
    ) -> Result<Group> {
        if claim.value().is_empty() {
            return Err(Error::Client("claim value must not be empty".to_string()));
        }
        let domain = self.resolve_domain(domain_name)?;
        let mapping = domain
            .meta_claim_mapping(claim.claim_uri())
            .map_err(|_| unsupported_claim(claim.claim_uri(), domain.name()))?;
        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(config_fault)?;

        let local_id = match connector
            .get_connector_group_id(mapping.attribute_name(), claim.value())
            .await
        {
            Ok(local_id) => local_id,
            Err(err @ Error::GroupNotFound(_)) => return Err(err),
            Err(err) => return Err(Error::server_with_cause("attribute lookup failed", err)),
        };

        let unique_group = domain
            .resolver()
            .get_unique_group_from_connector_group_id(&local_id, mapping.connector_id())
            .await
            .map_err(|err| Error::server_with_cause("group partition has no linkage", err))?;
        Ok(Group::new(unique_group.group_id(), domain.name()))
    }

    /// Lists groups. `length == 0` yields an empty list without touching
    /// any backend.
    pub async fn list_groups(
        &self,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> Result<Vec<Group>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        let groups = domain
            .resolver()
            .list_groups(offset, length)
            .await
            .map_err(|err| Error::server_with_cause("failed to list group linkages", err))?;
        Ok(groups
            .into_iter()
            .map(|group| Group::new(group.group_id(), domain.name()))
            .collect())
    }

    /// Lists groups whose claim equals the given value.
    pub async fn list_groups_by_claim(
        &self,
        claim: &Claim,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> Result<Vec<Group>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        if claim.value().is_empty() {
            return Err(Error::Client("claim value must not be empty".to_string()));
        }
        let domain = self.resolve_domain(domain_name)?;
        let mapping = domain
            .meta_claim_mapping(claim.claim_uri())
            .map_err(|_| unsupported_claim(claim.claim_uri(), domain.name()))?;
        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(config_fault)?;
        let local_ids = connector
            .list_connector_group_ids(mapping.attribute_name(), claim.value(), offset, length)
            .await
            .map_err(|err| Error::server_with_cause("attribute listing failed", err))?;
        let groups = domain
            .resolver()
            .get_unique_groups(local_ids, mapping.connector_id())
            .await
            .map_err(|err| Error::server_with_cause("failed to resolve group linkages", err))?;
        Ok(groups
            .into_iter()
            .map(|group| Group::new(group.group_id(), domain.name()))
            .collect())
    }

    /// Lists groups whose claim matches the given pattern.
    pub async fn list_groups_by_pattern(
        &self,
        meta_claim: &MetaClaim,
        pattern: &str,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> Result<Vec<Group>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        if pattern.is_empty() {
            return Err(Error::Client("pattern must not be empty".to_string()));
        }
        let domain = self.resolve_domain(domain_name)?;
        let mapping = domain
            .meta_claim_mapping(meta_claim.claim_uri())
            .map_err(|_| unsupported_claim(meta_claim.claim_uri(), domain.name()))?;
        let connector = domain
            .identity_connector(mapping.connector_id())
            .map_err(config_fault)?;
        let local_ids = connector
            .list_connector_group_ids_by_pattern(mapping.attribute_name(), pattern, offset, length)
            .await
            .map_err(|err| Error::server_with_cause("attribute listing failed", err))?;
        let groups = domain
            .resolver()
            .get_unique_groups(local_ids, mapping.connector_id())
            .await
            .map_err(|err| Error::server_with_cause("failed to resolve group linkages", err))?;
        Ok(groups
            .into_iter()
            .map(|group| Group::new(group.group_id(), domain.name()))
            .collect())
    }

    /// Fetches the claims of a group, optionally restricted to the given
    /// meta claims.
    pub async fn group_claims(
        &self,
        group_id: GroupId,
        meta_claims: Option<&[MetaClaim]>,
        domain_name: Option<&str>,
    ) -> Result<Vec<Claim>> {
        let domain = self.resolve_domain(domain_name)?;
        let unique_group = domain
            .resolver()
            .get_unique_group(group_id)
            .await
            .map_err(surface_not_found)?;

        let name_filter = meta_claims
            .map(|meta| mapper::meta_claims_to_attribute_names(meta, domain.meta_claim_mappings()));

        let mut attributes: IndexMap<ConnectorId, Vec<Attribute>> = IndexMap::new();
        for partition in unique_group.partitions() {
            let names = match &name_filter {
                Some(filter) => match filter.get(partition.connector_id()) {
                    None => continue,
                    Some(names) => Some(names.clone()),
                },
                None => None,
            };
            let connector = domain
                .identity_connector(partition.connector_id())
                .map_err(config_fault)?;
            let fetched = connector
                .get_group_attribute_values(partition.local_id(), names)
                .await
                .map_err(|err| Error::server_with_cause("attribute fetch failed", err))?;
            attributes
                .entry(partition.connector_id().clone())
                .or_default()
                .extend(fetched);
        }

        Ok(mapper::connector_attributes_to_claims(
            domain.meta_claim_mappings(),
            &attributes,
        ))
    }

    /// Creates a group from the model's claims.
    pub async fn add_group(&self, model: GroupModel, domain_name: Option<&str>) -> Result<Group> {
        let domain = self.resolve_domain(domain_name)?;
        let claims = model.into_claims();
        if claims.is_empty() {
            return Err(Error::Client(
                "group model must carry at least one claim".to_string(),
            ));
        }

        let mut partitions: Vec<UserPartition> = Vec::new();
        let attribute_map =
            mapper::claims_to_connector_attributes(&claims, domain.meta_claim_mappings());
        for (connector_id, attributes) in attribute_map {
            let written = match domain.identity_connector(&connector_id) {
                Ok(connector) => connector.add_group(attributes).await,
                Err(err) => Err(err),
            };
            match written {
                Ok(local_id) => partitions.push(UserPartition::new(
                    connector_id,
                    local_id,
                    PartitionKind::Identity,
                )),
                Err(err) => {
                    compensate_group_partitions(&domain, &partitions).await;
                    return Err(Error::server_with_cause(
                        "failed to write group partition",
                        err,
                    ));
                }
            }
        }

        let group_id = GroupId::new_v4();
        let unique_group = UniqueGroup::new(group_id, partitions.clone());
        if let Err(err) = domain
            .resolver()
            .add_group(unique_group, domain.name())
            .await
        {
            compensate_group_partitions(&domain, &partitions).await;
            return Err(Error::server_with_cause(
                "failed to commit group linkage",
                err,
            ));
        }

        Ok(Group::new(group_id, domain.name()))
    }

    /// Creates a batch of groups. All-or-nothing, like [`Self::add_users`].
    pub async fn add_groups(
        &self,
        models: Vec<GroupModel>,
        domain_name: Option<&str>,
    ) -> Result<Vec<Group>> {
        if models.is_empty() {
            return Err(Error::Client(
                "at least one group model is required".to_string(),
            ));
        }
        let domain = self.resolve_domain(domain_name)?;

        let mut keys: Vec<Uuid> = Vec::with_capacity(models.len());
        let mut batches: IndexMap<ConnectorId, IndexMap<Uuid, Vec<Attribute>>> = IndexMap::new();
        for model in models {
            let claims = model.into_claims();
            if claims.is_empty() {
                return Err(Error::Client(
                    "group model must carry at least one claim".to_string(),
                ));
            }
            let key = Uuid::new_v4();
            keys.push(key);
            let attribute_map =
                mapper::claims_to_connector_attributes(&claims, domain.meta_claim_mappings());
            for (connector_id, attributes) in attribute_map {
                batches
                    .entry(connector_id)
                    .or_default()
                    .insert(key, attributes);
            }
        }

        let mut written: IndexMap<Uuid, Vec<UserPartition>> =
            keys.iter().map(|key| (*key, Vec::new())).collect();
        let mut failure: Option<Error> = None;
        for (connector_id, batch) in &batches {
            let results = match domain.identity_connector(connector_id) {
                Ok(connector) => connector.add_groups(batch.clone()).await,
                Err(err) => Err(err),
            };
            match results {
                Ok(results) => {
                    let mut incomplete = false;
                    for key in batch.keys() {
                        if let Some(local_id) = results.get(key) {
                            if let Some(partitions) = written.get_mut(key) {
                                partitions.push(UserPartition::new(
                                    connector_id.clone(),
                                    local_id.clone(),
                                    PartitionKind::Identity,
                                ));
                            }
                        } else {
                            incomplete = true;
                        }
                    }
                    if incomplete {
                        failure = Some(Error::ConnectorWrite(format!(
                            "connector `{connector_id}` skipped entries in a bulk write"
                        )));
                        break;
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(cause) = failure {
            let all_written: Vec<UserPartition> = written.values().flatten().cloned().collect();
            compensate_group_partitions(&domain, &all_written).await;
            return Err(Error::server_with_cause(
                "bulk group creation failed",
                cause,
            ));
        }

        let unique_groups: Vec<UniqueGroup> = keys
            .iter()
            .map(|key| {
                UniqueGroup::new(
                    GroupId::new_v4(),
                    written.shift_remove(key).unwrap_or_default(),
                )
            })
            .collect();
        if let Err(err) = domain
            .resolver()
            .add_groups(unique_groups.clone(), domain.name())
            .await
        {
            let all_written: Vec<UserPartition> = unique_groups
                .iter()
                .flat_map(|group| group.partitions().iter().cloned())
                .collect();
            compensate_group_partitions(&domain, &all_written).await;
            return Err(Error::server_with_cause(
                "failed to commit group linkages",
                err,
            ));
        }

        Ok(unique_groups
            .into_iter()
            .map(|group| Group::new(group.group_id(), domain.name()))
            .collect())
    }

    /// Replaces the claims of a group.
    pub async fn update_group_claims(
        &self,
        group_id: GroupId,
        claims: Vec<Claim>,
        domain_name: Option<&str>,
    ) -> Result<()> {
        let domain = self.resolve_domain(domain_name)?;
        let unique_group = domain
            .resolver()
            .get_unique_group(group_id)
            .await
            .map_err(surface_not_found)?;

        let existing: IndexMap<ConnectorId, String> = unique_group
            .partitions()
            .iter()
            .map(|partition| {
                (
                    partition.connector_id().clone(),
                    partition.local_id().to_string(),
                )
            })
            .collect();

        let mut updated: IndexMap<ConnectorId, String> = IndexMap::new();
        if claims.is_empty() {
            for (connector_id, local_id) in &existing {
                let connector = domain
                    .identity_connector(connector_id)
                    .map_err(config_fault)?;
                let new_id = connector
                    .update_group_attributes(local_id, Vec::new())
                    .await
                    .map_err(|err| Error::server_with_cause("attribute update failed", err))?;
                updated.insert(connector_id.clone(), new_id);
            }
        } else {
            let attribute_map =
                mapper::claims_to_connector_attributes(&claims, domain.meta_claim_mappings());
            for (connector_id, attributes) in attribute_map {
                let connector = domain
                    .identity_connector(&connector_id)
                    .map_err(config_fault)?;
                let new_id = match existing.get(&connector_id) {
                    Some(local_id) => connector
                        .update_group_attributes(local_id, attributes)
                        .await
                        .map_err(|err| Error::server_with_cause("attribute update failed", err))?,
                    None => connector
                        .add_group(attributes)
                        .await
                        .map_err(|err| Error::server_with_cause("partition write failed", err))?,
                };
                updated.insert(connector_id, new_id);
            }
            for (connector_id, local_id) in &existing {
                if updated.contains_key(connector_id) {
                    continue;
                }
                let connector = domain
                    .identity_connector(connector_id)
                    .map_err(config_fault)?;
                let new_id = connector
                    .update_group_attributes(local_id, Vec::new())
                    .await
                    .map_err(|err| Error::server_with_cause("attribute update failed", err))?;
                updated.insert(connector_id.clone(), new_id);
            }
        }

        if updated != existing {
            domain
                .resolver()
                .update_group(group_id, updated)
                .await
                .map_err(|err| Error::server_with_cause("failed to update group linkage", err))?;
        }
        Ok(())
    }

    /// Deletes a group: every partition first, the resolver linkage last.
    pub async fn delete_group(&self, group_id: GroupId, domain_name: Option<&str>) -> Result<()> {
        let domain = self.resolve_domain(domain_name)?;
        let unique_group = domain
            .resolver()
            .get_unique_group(group_id)
            .await
            .map_err(surface_not_found)?;

        let mut failure: Option<Error> = None;
        for partition in unique_group.partitions() {
            let deleted = match domain.identity_connector(partition.connector_id()) {
                Ok(connector) => connector.delete_group(partition.local_id()).await,
                Err(err) => Err(err),
            };
            if let Err(err) = deleted {
                warn!(
                    connector = %partition.connector_id(),
                    error = %err,
                    "failed to delete group partition"
                );
                failure.get_or_insert(err);
            }
        }
        if let Some(cause) = failure {
            return Err(Error::server_with_cause(
                "failed to delete every group partition",
                cause,
            ));
        }

        domain
            .resolver()
            .delete_group(group_id)
            .await
            .map_err(|err| Error::server_with_cause("failed to remove group linkage", err))
    }

    // ---------------------------------------------------------------------
    // Membership
    // ---------------------------------------------------------------------

    /// Fetches the groups a user is a member of.
    pub async fn groups_of_user(
        &self,
        user_id: UserId,
        domain_name: Option<&str>,
    ) -> Result<Vec<Group>> {
        let domain = self.resolve_domain(domain_name)?;
        let groups = domain
            .resolver()
            .get_groups_of_user(user_id)
            .await
            .map_err(surface_not_found)?;
        Ok(groups
            .into_iter()
            .map(|group| Group::new(group.group_id(), domain.name()))
            .collect())
    }

    /// Fetches the users that are members of a group.
    pub async fn users_of_group(
        &self,
        group_id: GroupId,
        domain_name: Option<&str>,
    ) -> Result<Vec<User>> {
        let domain = self.resolve_domain(domain_name)?;
        let users = domain
            .resolver()
            .get_users_of_group(group_id)
            .await
            .map_err(surface_not_found)?;
        Ok(users
            .into_iter()
            .map(|user| User::new(user.user_id(), domain.name()))
            .collect())
    }

    /// Returns true if the user is a member of the group.
    pub async fn is_user_in_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
        domain_name: Option<&str>,
    ) -> Result<bool> {
        let domain = self.resolve_domain(domain_name)?;
        domain
            .resolver()
            .is_user_in_group(user_id, group_id)
            .await
            .map_err(surface_not_found)
    }

    /// Replaces the set of groups a user belongs to.
    pub async fn update_groups_of_user(
        &self,
        user_id: UserId,
        group_ids: Vec<GroupId>,
        domain_name: Option<&str>,
    ) -> Result<()> {
        let domain = self.resolve_domain(domain_name)?;
        domain
            .resolver()
            .update_groups_of_user(user_id, group_ids)
            .await
            .map_err(surface_not_found)
    }

    /// Replaces the set of users belonging to a group.
    pub async fn update_users_of_group(
        &self,
        group_id: GroupId,
        user_ids: Vec<UserId>,
        domain_name: Option<&str>,
    ) -> Result<()> {
        let domain = self.resolve_domain(domain_name)?;
        domain
            .resolver()
            .update_users_of_group(group_id, user_ids)
            .await
            .map_err(surface_not_found)
    }
}

fn validate_new_user(claims: &[Claim], credentials: &[Credential]) -> Result<()> {
    if claims.is_empty() && credentials.is_empty() {
        return Err(Error::Client(
            "user model must carry at least one claim or credential".to_string(),
        ));
    }
    if !claims.is_empty()
        && !claims
            .iter()
            .any(|claim| claim.is_username() && !claim.value().is_empty())
    {
        return Err(Error::Client(format!(
            "a `{USERNAME_CLAIM_URI}` claim with a non-empty value is required"
        )));
    }
    Ok(())
}

fn unsupported_claim(claim_uri: &str, domain_name: &str) -> Error {
    Error::Client(format!(
        "claim `{claim_uri}` is not supported in domain `{domain_name}`"
    ))
}

fn config_fault(err: Error) -> Error {
    Error::server_with_cause("domain configuration fault", err)
}

/// Entity-absent kinds pass through; everything else becomes a server
/// error.
fn surface_not_found(err: Error) -> Error {
    match err {
        Error::UserNotFound(_) | Error::GroupNotFound(_) => err,
        other => Error::server_with_cause("resolver failure", other),
    }
}

fn auth_failure() -> Error {
    Error::Authentication("authentication failed".to_string())
}

/// Best-effort removal of identity partitions written before a failure.
/// Only identity connectors expose a compensation hook; failures here are
/// logged and swallowed so the original error keeps propagating.
async fn compensate_user_partitions(domain: &Domain, partitions: &[UserPartition]) {
    for partition in partitions {
        if !partition.is_identity_store() {
            continue;
        }
        let connector = match domain.identity_connector(partition.connector_id()) {
            Ok(connector) => connector,
            Err(err) => {
                warn!(
                    connector = %partition.connector_id(),
                    error = %err,
                    "cannot compensate user partition"
                );
                continue;
            }
        };
        if let Err(err) = connector
            .remove_added_users(vec![partition.local_id().to_string()])
            .await
        {
            warn!(
                connector = %partition.connector_id(),
                error = %err,
                "failed to remove user partition after a write failure"
            );
        }
    }
}

async fn compensate_group_partitions(domain: &Domain, partitions: &[UserPartition]) {
    for partition in partitions {
        if !partition.is_identity_store() {
            continue;
        }
        let connector = match domain.identity_connector(partition.connector_id()) {
            Ok(connector) => connector,
            Err(err) => {
                warn!(
                    connector = %partition.connector_id(),
                    error = %err,
                    "cannot compensate group partition"
                );
                continue;
            }
        };
        if let Err(err) = connector
            .remove_added_groups(vec![partition.local_id().to_string()])
            .await
        {
            warn!(
                connector = %partition.connector_id(),
                error = %err,
                "failed to remove group partition after a write failure"
            );
        }
    }
}
