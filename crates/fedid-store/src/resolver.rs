//! Unique-id resolver contract.
//!
//! The resolver is the authoritative record of which per-connector
//! partitions make up which logical user or group. All write paths commit
//! to it last, so a failure before the commit leaves only unlinked
//! partitions behind, which the store then compensates.

use async_trait::async_trait;
use indexmap::IndexMap;

use fedid_core::id::{ConnectorId, GroupId, UserId};
use fedid_core::partition::{UniqueGroup, UniqueUser};

use crate::Result;

/// Contract of the unique-id resolver.
///
/// Implementations must tolerate concurrent writers and reject duplicate
/// logical ids. The store generates fresh UUIDs, so collisions indicate a
/// caller bug rather than an expected race.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UniqueIdResolver: Send + Sync {
    /// Returns true if a linkage exists for the logical user id.
    async fn is_user_exists(&self, user_id: UserId) -> Result<bool>;

    /// Returns true if a linkage exists for the logical group id.
    async fn is_group_exists(&self, group_id: GroupId) -> Result<bool>;

    /// Fetches the unique user for a logical id.
    async fn get_unique_user(&self, user_id: UserId) -> Result<UniqueUser>;

    /// Fetches the unique user owning the given connector-local id.
    async fn get_unique_user_from_connector_user_id(
        &self,
        local_id: &str,
        connector_id: &ConnectorId,
    ) -> Result<UniqueUser>;

    /// Fetches unique users for a batch of connector-local ids. The result
    /// preserves input order; ids with no linkage are skipped.
    async fn get_unique_users(
        &self,
        local_ids: Vec<String>,
        connector_id: &ConnectorId,
    ) -> Result<Vec<UniqueUser>>;

    /// Lists users in stable order.
    async fn list_users(&self, offset: usize, length: usize) -> Result<Vec<UniqueUser>>;

    /// Fetches the unique group for a logical id.
    async fn get_unique_group(&self, group_id: GroupId) -> Result<UniqueGroup>;

    /// Fetches the unique group owning the given connector-local id.
    async fn get_unique_group_from_connector_group_id(
        &self,
        local_id: &str,
        connector_id: &ConnectorId,
    ) -> Result<UniqueGroup>;

    /// Fetches unique groups for a batch of connector-local ids. The result
    /// preserves input order; ids with no linkage are skipped.
    async fn get_unique_groups(
        &self,
        local_ids: Vec<String>,
        connector_id: &ConnectorId,
    ) -> Result<Vec<UniqueGroup>>;

    /// Lists groups in stable order.
    async fn list_groups(&self, offset: usize, length: usize) -> Result<Vec<UniqueGroup>>;

    /// Groups the user is a member of.
    async fn get_groups_of_user(&self, user_id: UserId) -> Result<Vec<UniqueGroup>>;

    /// Users that are members of the group.
    async fn get_users_of_group(&self, group_id: GroupId) -> Result<Vec<UniqueUser>>;

    /// Returns true if the user is a member of the group.
    async fn is_user_in_group(&self, user_id: UserId, group_id: GroupId) -> Result<bool>;

    /// Commits the linkage for a new user.
    async fn add_user(&self, user: UniqueUser, domain_name: &str) -> Result<()>;

    /// Commits linkages for a batch of new users.
    async fn add_users(&self, users: Vec<UniqueUser>, domain_name: &str) -> Result<()>;

    /// Replaces the identity partition map of a user. Credential partitions
    /// are retained unchanged.
    async fn update_user(
        &self,
        user_id: UserId,
        partitions: IndexMap<ConnectorId, String>,
    ) -> Result<()>;

    /// Removes the linkage of a user, including group memberships.
    async fn delete_user(&self, user_id: UserId) -> Result<()>;

    /// Commits the linkage for a new group.
    async fn add_group(&self, group: UniqueGroup, domain_name: &str) -> Result<()>;

    /// Commits linkages for a batch of new groups.
    async fn add_groups(&self, groups: Vec<UniqueGroup>, domain_name: &str) -> Result<()>;

    /// Replaces the identity partition map of a group.
    async fn update_group(
        &self,
        group_id: GroupId,
        partitions: IndexMap<ConnectorId, String>,
    ) -> Result<()>;

    /// Removes the linkage of a group, including memberships.
    async fn delete_group(&self, group_id: GroupId) -> Result<()>;

    /// Replaces the set of groups the user belongs to.
    async fn update_groups_of_user(&self, user_id: UserId, group_ids: Vec<GroupId>) -> Result<()>;

    /// Replaces the set of users belonging to the group.
    async fn update_users_of_group(&self, group_id: GroupId, user_ids: Vec<UserId>) -> Result<()>;
}
