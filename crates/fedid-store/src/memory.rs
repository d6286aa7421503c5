//! In-memory unique-id resolver.
//!
//! Keeps the complete logical-id linkage in process memory behind a
//! read/write lock. Suitable for embedded deployments, demos, and tests;
//! durable deployments put the linkage in a database behind the same
//! contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use fedid_core::error::Error;
use fedid_core::id::{ConnectorId, GroupId, UserId};
use fedid_core::partition::{PartitionKind, UniqueGroup, UniqueUser, UserPartition};

use crate::resolver::UniqueIdResolver;
use crate::Result;

#[derive(Debug, Clone)]
struct LinkageRecord {
    partitions: Vec<UserPartition>,
    domain_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LinkageRecord {
    fn new(partitions: Vec<UserPartition>, domain_name: &str) -> Self {
        let now = Utc::now();
        Self {
            partitions,
            domain_name: domain_name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn replace_identity_partitions(&mut self, partitions: IndexMap<ConnectorId, String>) {
        let mut replacement: Vec<UserPartition> = partitions
            .into_iter()
            .map(|(connector_id, local_id)| {
                UserPartition::new(connector_id, local_id, PartitionKind::Identity)
            })
            .collect();
        replacement.extend(
            self.partitions
                .iter()
                .filter(|partition| !partition.is_identity_store())
                .cloned(),
        );
        self.partitions = replacement;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Default)]
struct State {
    users: IndexMap<UserId, LinkageRecord>,
    groups: IndexMap<GroupId, LinkageRecord>,
    user_index: HashMap<(ConnectorId, String), UserId>,
    group_index: HashMap<(ConnectorId, String), GroupId>,
    memberships: HashSet<(UserId, GroupId)>,
}

impl State {
    fn index_user(&mut self, user_id: UserId, partitions: &[UserPartition]) {
        for partition in partitions {
            self.user_index.insert(
                (
                    partition.connector_id().clone(),
                    partition.local_id().to_string(),
                ),
                user_id,
            );
        }
    }

    fn unindex_user(&mut self, user_id: UserId) {
        self.user_index.retain(|_, id| *id != user_id);
    }

    fn index_group(&mut self, group_id: GroupId, partitions: &[UserPartition]) {
        for partition in partitions {
            self.group_index.insert(
                (
                    partition.connector_id().clone(),
                    partition.local_id().to_string(),
                ),
                group_id,
            );
        }
    }

    fn unindex_group(&mut self, group_id: GroupId) {
        self.group_index.retain(|_, id| *id != group_id);
    }
}

/// Unique-id resolver backed by in-process tables.
#[derive(Debug, Default)]
pub struct InMemoryUniqueIdResolver {
    state: RwLock<State>,
}

impl InMemoryUniqueIdResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the domain a user was linked under, if the user exists.
    #[must_use]
    pub fn user_domain_name(&self, user_id: UserId) -> Option<String> {
        let state = self.state.read().expect("resolver lock poisoned");
        state
            .users
            .get(&user_id)
            .map(|record| record.domain_name.clone())
    }

    /// Creation and last-update timestamps of a user linkage.
    #[must_use]
    pub fn user_timestamps(&self, user_id: UserId) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let state = self.state.read().expect("resolver lock poisoned");
        state
            .users
            .get(&user_id)
            .map(|record| (record.created_at, record.updated_at))
    }

    /// Number of linked users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.state.read().expect("resolver lock poisoned").users.len()
    }

    /// Number of linked groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.state.read().expect("resolver lock poisoned").groups.len()
    }
}

fn user_not_found(user_id: UserId) -> Error {
    Error::UserNotFound(format!("no linkage for user `{user_id}`"))
}

fn group_not_found(group_id: GroupId) -> Error {
    Error::GroupNotFound(format!("no linkage for group `{group_id}`"))
}

#[async_trait]
impl UniqueIdResolver for InMemoryUniqueIdResolver {
    async fn is_user_exists(&self, user_id: UserId) -> Result<bool> {
        let state = self.state.read().expect("resolver lock poisoned");
        Ok(state.users.contains_key(&user_id))
    }

    async fn is_group_exists(&self, group_id: GroupId) -> Result<bool> {
        let state = self.state.read().expect("resolver lock poisoned");
        Ok(state.groups.contains_key(&group_id))
    }

    async fn get_unique_user(&self, user_id: UserId) -> Result<UniqueUser> {
        let state = self.state.read().expect("resolver lock poisoned");
        state
            .users
            .get(&user_id)
            .map(|record| UniqueUser::new(user_id, record.partitions.clone()))
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn get_unique_user_from_connector_user_id(
        &self,
        local_id: &str,
        connector_id: &ConnectorId,
    ) -> Result<UniqueUser> {
        let state = self.state.read().expect("resolver lock poisoned");
        let user_id = state
            .user_index
            .get(&(connector_id.clone(), local_id.to_string()))
            .copied()
            .ok_or_else(|| {
                Error::UserNotFound(format!(
                    "no linkage for connector `{connector_id}` entry `{local_id}`"
                ))
            })?;
        state
            .users
            .get(&user_id)
            .map(|record| UniqueUser::new(user_id, record.partitions.clone()))
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn get_unique_users(
        &self,
        local_ids: Vec<String>,
        connector_id: &ConnectorId,
    ) -> Result<Vec<UniqueUser>> {
        let state = self.state.read().expect("resolver lock poisoned");
        let mut users = Vec::new();
        for local_id in local_ids {
            let Some(user_id) = state
                .user_index
                .get(&(connector_id.clone(), local_id))
                .copied()
            else {
                continue;
            };
            if let Some(record) = state.users.get(&user_id) {
                users.push(UniqueUser::new(user_id, record.partitions.clone()));
            }
        }
        Ok(users)
    }

    async fn list_users(&self, offset: usize, length: usize) -> Result<Vec<UniqueUser>> {
        let state = self.state.read().expect("resolver lock poisoned");
        Ok(state
            .users
            .iter()
            .skip(offset)
            .take(length)
            .map(|(user_id, record)| UniqueUser::new(*user_id, record.partitions.clone()))
            .collect())
    }

    async fn get_unique_group(&self, group_id: GroupId) -> Result<UniqueGroup> {
        let state = self.state.read().expect("resolver lock poisoned");
        state
            .groups
            .get(&group_id)
            .map(|record| UniqueGroup::new(group_id, record.partitions.clone()))
            .ok_or_else(|| group_not_found(group_id))
    }

    async fn get_unique_group_from_connector_group_id(
        &self,
        local_id: &str,
        connector_id: &ConnectorId,
    ) -> Result<UniqueGroup> {
        let state = self.state.read().expect("resolver lock poisoned");
        let group_id = state
            .group_index
            .get(&(connector_id.clone(), local_id.to_string()))
            .copied()
            .ok_or_else(|| {
                Error::GroupNotFound(format!(
                    "no linkage for connector `{connector_id}` entry `{local_id}`"
                ))
            })?;
        state
            .groups
            .get(&group_id)
            .map(|record| UniqueGroup::new(group_id, record.partitions.clone()))
            .ok_or_else(|| group_not_found(group_id))
    }

    async fn get_unique_groups(
        &self,
        local_ids: Vec<String>,
        connector_id: &ConnectorId,
    ) -> Result<Vec<UniqueGroup>> {
        let state = self.state.read().expect("resolver lock poisoned");
        let mut groups = Vec::new();
        for local_id in local_ids {
            let Some(group_id) = state
                .group_index
                .get(&(connector_id.clone(), local_id))
                .copied()
            else {
                continue;
            };
            if let Some(record) = state.groups.get(&group_id) {
                groups.push(UniqueGroup::new(group_id, record.partitions.clone()));
            }
        }
        Ok(groups)
    }

    async fn list_groups(&self, offset: usize, length: usize) -> Result<Vec<UniqueGroup>> {
        let state = self.state.read().expect("resolver lock poisoned");
        Ok(state
            .groups
            .iter()
            .skip(offset)
            .take(length)
            .map(|(group_id, record)| UniqueGroup::new(*group_id, record.partitions.clone()))
            .collect())
    }

    async fn get_groups_of_user(&self, user_id: UserId) -> Result<Vec<UniqueGroup>> {
        let state = self.state.read().expect("resolver lock poisoned");
        if !state.users.contains_key(&user_id) {
            return Err(user_not_found(user_id));
        }
        Ok(state
            .groups
            .iter()
            .filter(|(group_id, _)| state.memberships.contains(&(user_id, **group_id)))
            .map(|(group_id, record)| UniqueGroup::new(*group_id, record.partitions.clone()))
            .collect())
    }

    async fn get_users_of_group(&self, group_id: GroupId) -> Result<Vec<UniqueUser>> {
        let state = self.state.read().expect("resolver lock poisoned");
        if !state.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        Ok(state
            .users
            .iter()
            .filter(|(user_id, _)| state.memberships.contains(&(**user_id, group_id)))
            .map(|(user_id, record)| UniqueUser::new(*user_id, record.partitions.clone()))
            .collect())
    }

    async fn is_user_in_group(&self, user_id: UserId, group_id: GroupId) -> Result<bool> {
        let state = self.state.read().expect("resolver lock poisoned");
        if !state.users.contains_key(&user_id) {
            return Err(user_not_found(user_id));
        }
        if !state.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        Ok(state.memberships.contains(&(user_id, group_id)))
    }

    async fn add_user(&self, user: UniqueUser, domain_name: &str) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if state.users.contains_key(&user.user_id()) {
            return Err(Error::server(format!(
                "user `{}` is already linked",
                user.user_id()
            )));
        }
        let user_id = user.user_id();
        let partitions = user.partitions().to_vec();
        state.index_user(user_id, &partitions);
        state
            .users
            .insert(user_id, LinkageRecord::new(partitions, domain_name));
        Ok(())
    }

    async fn add_users(&self, users: Vec<UniqueUser>, domain_name: &str) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        for user in &users {
            if state.users.contains_key(&user.user_id()) {
                return Err(Error::server(format!(
                    "user `{}` is already linked",
                    user.user_id()
                )));
            }
        }
        for user in users {
            let user_id = user.user_id();
            let partitions = user.partitions().to_vec();
            state.index_user(user_id, &partitions);
            state
                .users
                .insert(user_id, LinkageRecord::new(partitions, domain_name));
        }
        Ok(())
    }

    async fn update_user(
        &self,
        user_id: UserId,
        partitions: IndexMap<ConnectorId, String>,
    ) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if !state.users.contains_key(&user_id) {
            return Err(user_not_found(user_id));
        }
        state.unindex_user(user_id);
        let record = state
            .users
            .get_mut(&user_id)
            .expect("record checked above");
        record.replace_identity_partitions(partitions);
        let reindexed = record.partitions.clone();
        state.index_user(user_id, &reindexed);
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if state.users.shift_remove(&user_id).is_none() {
            return Err(user_not_found(user_id));
        }
        state.unindex_user(user_id);
        state.memberships.retain(|(member, _)| *member != user_id);
        Ok(())
    }

    async fn add_group(&self, group: UniqueGroup, domain_name: &str) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if state.groups.contains_key(&group.group_id()) {
            return Err(Error::server(format!(
                "group `{}` is already linked",
                group.group_id()
            )));
        }
        let group_id = group.group_id();
        let partitions = group.partitions().to_vec();
        state.index_group(group_id, &partitions);
        state
            .groups
            .insert(group_id, LinkageRecord::new(partitions, domain_name));
        Ok(())
    }

    async fn add_groups(&self, groups: Vec<UniqueGroup>, domain_name: &str) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        for group in &groups {
            if state.groups.contains_key(&group.group_id()) {
                return Err(Error::server(format!(
                    "group `{}` is already linked",
                    group.group_id()
                )));
            }
        }
        for group in groups {
            let group_id = group.group_id();
            let partitions = group.partitions().to_vec();
            state.index_group(group_id, &partitions);
            state
                .groups
                .insert(group_id, LinkageRecord::new(partitions, domain_name));
        }
        Ok(())
    }

    async fn update_group(
        &self,
        group_id: GroupId,
        partitions: IndexMap<ConnectorId, String>,
    ) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if !state.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        state.unindex_group(group_id);
        let record = state
            .groups
            .get_mut(&group_id)
            .expect("record checked above");
        record.replace_identity_partitions(partitions);
        let reindexed = record.partitions.clone();
        state.index_group(group_id, &reindexed);
        Ok(())
    }

    async fn delete_group(&self, group_id: GroupId) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if state.groups.shift_remove(&group_id).is_none() {
            return Err(group_not_found(group_id));
        }
        state.unindex_group(group_id);
        state.memberships.retain(|(_, group)| *group != group_id);
        Ok(())
    }

    async fn update_groups_of_user(&self, user_id: UserId, group_ids: Vec<GroupId>) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if !state.users.contains_key(&user_id) {
            return Err(user_not_found(user_id));
        }
        for group_id in &group_ids {
            if !state.groups.contains_key(group_id) {
                return Err(group_not_found(*group_id));
            }
        }
        state.memberships.retain(|(member, _)| *member != user_id);
        for group_id in group_ids {
            state.memberships.insert((user_id, group_id));
        }
        Ok(())
    }

    async fn update_users_of_group(&self, group_id: GroupId, user_ids: Vec<UserId>) -> Result<()> {
        let mut state = self.state.write().expect("resolver lock poisoned");
        if !state.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        for user_id in &user_ids {
            if !state.users.contains_key(user_id) {
                return Err(user_not_found(*user_id));
            }
        }
        state.memberships.retain(|(_, group)| *group != group_id);
        for user_id in user_ids {
            state.memberships.insert((user_id, group_id));
        }
        Ok(())
    }
}
