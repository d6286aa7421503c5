//! Connector contracts the virtual identity store consumes.
//!
//! A connector is a driver over a single backing store. The store owns only
//! these contracts; the drivers themselves (LDAP, SQL, vault) live in their
//! own crates and are handed in fully constructed at init. Connectors own
//! their pools and handles; the store neither opens nor closes them.

use async_trait::async_trait;
use indexmap::IndexMap;
use uuid::Uuid;

use fedid_core::claim::Attribute;
use fedid_core::credential::{Credential, CredentialInput};
use fedid_core::id::ConnectorId;

use crate::Result;

/// Contract of an identity store connector: CRUD of attribute partitions in
/// one backend, plus lookups by attribute.
///
/// Bulk operations admit partial success: the returned map covers the
/// external keys that were written. Compensation hooks must be idempotent
/// and should only fail when genuinely unable to clean up; the store logs
/// such failures and continues.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStoreConnector: Send + Sync {
    /// Id of this connector, unique within its domain.
    fn connector_id(&self) -> &ConnectorId;

    /// Writes a new attribute partition and returns its connector-local id.
    async fn add_user(&self, attributes: Vec<Attribute>) -> Result<String>;

    /// Writes a batch of attribute partitions keyed by caller-chosen
    /// correlation tokens. Returns the connector-local id per token that
    /// was written.
    async fn add_users(
        &self,
        batches: IndexMap<Uuid, Vec<Attribute>>,
    ) -> Result<IndexMap<Uuid, String>>;

    /// Replaces the attributes of an existing partition. The returned id
    /// may differ from the input when the connector rekeys the entry.
    async fn update_user_attributes(
        &self,
        local_id: &str,
        attributes: Vec<Attribute>,
    ) -> Result<String>;

    /// Looks up the connector-local user id holding the attribute value.
    async fn get_connector_user_id(&self, attribute_name: &str, value: &str) -> Result<String>;

    /// Lists connector-local user ids whose attribute equals `value`.
    async fn list_connector_user_ids(
        &self,
        attribute_name: &str,
        value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>>;

    /// Lists connector-local user ids whose attribute matches `pattern`.
    /// Pattern syntax is connector-defined.
    async fn list_connector_user_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>>;

    /// Reads attribute values of a partition, optionally restricted to the
    /// given attribute names.
    async fn get_user_attribute_values(
        &self,
        local_id: &str,
        attribute_names: Option<Vec<String>>,
    ) -> Result<Vec<Attribute>>;

    /// Deletes a user partition.
    async fn delete_user(&self, local_id: &str) -> Result<()>;

    /// Best-effort removal of partitions written earlier in a call that
    /// subsequently failed. Must be idempotent.
    async fn remove_added_users(&self, local_ids: Vec<String>) -> Result<()>;

    /// Writes a new group partition and returns its connector-local id.
    async fn add_group(&self, attributes: Vec<Attribute>) -> Result<String>;

    /// Batch counterpart of [`Self::add_group`].
    async fn add_groups(
        &self,
        batches: IndexMap<Uuid, Vec<Attribute>>,
    ) -> Result<IndexMap<Uuid, String>>;

    /// Replaces the attributes of an existing group partition.
    async fn update_group_attributes(
        &self,
        local_id: &str,
        attributes: Vec<Attribute>,
    ) -> Result<String>;

    /// Looks up the connector-local group id holding the attribute value.
    async fn get_connector_group_id(&self, attribute_name: &str, value: &str) -> Result<String>;

    /// Lists connector-local group ids whose attribute equals `value`.
    async fn list_connector_group_ids(
        &self,
        attribute_name: &str,
        value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>>;

    /// Lists connector-local group ids whose attribute matches `pattern`.
    async fn list_connector_group_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>>;

    /// Reads attribute values of a group partition.
    async fn get_group_attribute_values(
        &self,
        local_id: &str,
        attribute_names: Option<Vec<String>>,
    ) -> Result<Vec<Attribute>>;

    /// Deletes a group partition.
    async fn delete_group(&self, local_id: &str) -> Result<()>;

    /// Best-effort removal of group partitions written earlier in a call
    /// that subsequently failed. Must be idempotent.
    async fn remove_added_groups(&self, local_ids: Vec<String>) -> Result<()>;
}

/// Contract of a credential store connector: persist and verify credential
/// partitions in one backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStoreConnector: Send + Sync {
    /// Id of this connector, unique within its domain.
    fn connector_id(&self) -> &ConnectorId;

    /// Returns true if this connector can persist the credential. Cheap and
    /// side-effect free.
    fn can_store(&self, credential: &Credential) -> bool;

    /// Returns true if this connector can verify the input. Cheap and
    /// side-effect free.
    fn can_handle(&self, input: &CredentialInput) -> bool;

    /// Persists credential material and returns the connector-local id of
    /// the new credential partition.
    async fn add_credential(&self, credentials: Vec<Credential>) -> Result<String>;

    /// Verifies the credential against the stored partition. Returns
    /// normally on success and fails with the authentication kind on
    /// mismatch.
    async fn authenticate(&self, input: &CredentialInput) -> Result<()>;

    /// Deletes a credential partition.
    async fn delete_credential(&self, local_id: &str) -> Result<()>;
}
