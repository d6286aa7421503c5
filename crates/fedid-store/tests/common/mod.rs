//! In-memory connectors shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use fedid_core::claim::Attribute;
use fedid_core::credential::{Credential, CredentialInput};
use fedid_core::error::Error;
use fedid_core::id::ConnectorId;
use fedid_core::Result;
use fedid_store::connector::{CredentialStoreConnector, IdentityStoreConnector};

// Glob-style matching with `*` wildcards; the contract leaves pattern
// syntax to each connector.
fn matches_pattern(value: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return value == pattern;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest_parts) = parts.split_first().expect("split yields at least one part");
    let (last, middle) = rest_parts.split_last().expect("pattern contains a wildcard");

    let Some(mut rest) = value.strip_prefix(first) else {
        return false;
    };
    for part in middle {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

fn page(ids: Vec<String>, offset: usize, length: usize) -> Vec<String> {
    ids.into_iter().skip(offset).take(length).collect()
}

/// Identity store connector over in-process tables, with switches to
/// simulate backend failures.
pub struct InMemoryIdentityConnector {
    id: ConnectorId,
    users: RwLock<IndexMap<String, Vec<Attribute>>>,
    groups: RwLock<IndexMap<String, Vec<Attribute>>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    skip_first_bulk_entry: AtomicBool,
    removed_users: RwLock<Vec<String>>,
    removed_groups: RwLock<Vec<String>>,
}

impl InMemoryIdentityConnector {
    pub fn new(id: &str) -> Self {
        Self {
            id: ConnectorId::new(id),
            users: RwLock::new(IndexMap::new()),
            groups: RwLock::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
            skip_first_bulk_entry: AtomicBool::new(false),
            removed_users: RwLock::new(Vec::new()),
            removed_groups: RwLock::new(Vec::new()),
        }
    }

    /// Makes every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes bulk writes silently skip their first entry.
    pub fn skip_first_bulk_entry(&self, skip: bool) {
        self.skip_first_bulk_entry.store(skip, Ordering::SeqCst);
    }

    /// Ids passed to the user compensation hook, in call order.
    pub fn removed_users(&self) -> Vec<String> {
        self.removed_users.read().unwrap().clone()
    }

    /// Ids passed to the group compensation hook, in call order.
    pub fn removed_groups(&self) -> Vec<String> {
        self.removed_groups.read().unwrap().clone()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().unwrap().len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().unwrap().len()
    }

    pub fn contains_user(&self, local_id: &str) -> bool {
        self.users.read().unwrap().contains_key(local_id)
    }

    fn mint_id(&self, prefix: &str) -> String {
        let serial = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}-{prefix}{serial}", self.id)
    }

    fn write_allowed(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::ConnectorWrite(format!(
                "simulated write failure in `{}`",
                self.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStoreConnector for InMemoryIdentityConnector {
    fn connector_id(&self) -> &ConnectorId {
        &self.id
    }

    async fn add_user(&self, attributes: Vec<Attribute>) -> Result<String> {
        self.write_allowed()?;
        let local_id = self.mint_id("u");
        self.users
            .write()
            .unwrap()
            .insert(local_id.clone(), attributes);
        Ok(local_id)
    }

    async fn add_users(
        &self,
        batches: IndexMap<Uuid, Vec<Attribute>>,
    ) -> Result<IndexMap<Uuid, String>> {
        self.write_allowed()?;
        let skip_first = self.skip_first_bulk_entry.load(Ordering::SeqCst);
        let mut results = IndexMap::new();
        for (index, (key, attributes)) in batches.into_iter().enumerate() {
            if skip_first && index == 0 {
                continue;
            }
            let local_id = self.mint_id("u");
            self.users
                .write()
                .unwrap()
                .insert(local_id.clone(), attributes);
            results.insert(key, local_id);
        }
        Ok(results)
    }

    async fn update_user_attributes(
        &self,
        local_id: &str,
        attributes: Vec<Attribute>,
    ) -> Result<String> {
        self.write_allowed()?;
        let mut users = self.users.write().unwrap();
        if !users.contains_key(local_id) {
            return Err(Error::UserNotFound(format!("no user `{local_id}`")));
        }
        users.insert(local_id.to_string(), attributes);
        Ok(local_id.to_string())
    }

    async fn get_connector_user_id(&self, attribute_name: &str, value: &str) -> Result<String> {
        let users = self.users.read().unwrap();
        users
            .iter()
            .find(|(_, attributes)| {
                attributes
                    .iter()
                    .any(|a| a.name() == attribute_name && a.value() == value)
            })
            .map(|(local_id, _)| local_id.clone())
            .ok_or_else(|| {
                Error::UserNotFound(format!("no user with `{attribute_name}` = `{value}`"))
            })
    }

    async fn list_connector_user_ids(
        &self,
        attribute_name: &str,
        value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>> {
        let users = self.users.read().unwrap();
        let ids = users
            .iter()
            .filter(|(_, attributes)| {
                attributes
                    .iter()
                    .any(|a| a.name() == attribute_name && a.value() == value)
            })
            .map(|(local_id, _)| local_id.clone())
            .collect();
        Ok(page(ids, offset, length))
    }

    async fn list_connector_user_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>> {
        let users = self.users.read().unwrap();
        let ids = users
            .iter()
            .filter(|(_, attributes)| {
                attributes
                    .iter()
                    .any(|a| a.name() == attribute_name && matches_pattern(a.value(), pattern))
            })
            .map(|(local_id, _)| local_id.clone())
            .collect();
        Ok(page(ids, offset, length))
    }

    async fn get_user_attribute_values(
        &self,
        local_id: &str,
        attribute_names: Option<Vec<String>>,
    ) -> Result<Vec<Attribute>> {
        let users = self.users.read().unwrap();
        let attributes = users
            .get(local_id)
            .ok_or_else(|| Error::UserNotFound(format!("no user `{local_id}`")))?;
        Ok(match attribute_names {
            Some(names) => attributes
                .iter()
                .filter(|a| names.iter().any(|name| name == a.name()))
                .cloned()
                .collect(),
            None => attributes.clone(),
        })
    }

    async fn delete_user(&self, local_id: &str) -> Result<()> {
        let mut users = self.users.write().unwrap();
        users
            .shift_remove(local_id)
            .map(|_| ())
            .ok_or_else(|| Error::UserNotFound(format!("no user `{local_id}`")))
    }

    async fn remove_added_users(&self, local_ids: Vec<String>) -> Result<()> {
        let mut users = self.users.write().unwrap();
        let mut removed = self.removed_users.write().unwrap();
        for local_id in local_ids {
            users.shift_remove(&local_id);
            removed.push(local_id);
        }
        Ok(())
    }

    async fn add_group(&self, attributes: Vec<Attribute>) -> Result<String> {
        self.write_allowed()?;
        let local_id = self.mint_id("g");
        self.groups
            .write()
            .unwrap()
            .insert(local_id.clone(), attributes);
        Ok(local_id)
    }

    async fn add_groups(
        &self,
        batches: IndexMap<Uuid, Vec<Attribute>>,
    ) -> Result<IndexMap<Uuid, String>> {
        self.write_allowed()?;
        let skip_first = self.skip_first_bulk_entry.load(Ordering::SeqCst);
        let mut results = IndexMap::new();
        for (index, (key, attributes)) in batches.into_iter().enumerate() {
            if skip_first && index == 0 {
                continue;
            }
            let local_id = self.mint_id("g");
            self.groups
                .write()
                .unwrap()
                .insert(local_id.clone(), attributes);
            results.insert(key, local_id);
        }
        Ok(results)
    }

    async fn update_group_attributes(
        &self,
        local_id: &str,
        attributes: Vec<Attribute>,
    ) -> Result<String> {
        self.write_allowed()?;
        let mut groups = self.groups.write().unwrap();
        if !groups.contains_key(local_id) {
            return Err(Error::GroupNotFound(format!("no group `{local_id}`")));
        }
        groups.insert(local_id.to_string(), attributes);
        Ok(local_id.to_string())
    }

    async fn get_connector_group_id(&self, attribute_name: &str, value: &str) -> Result<String> {
        let groups = self.groups.read().unwrap();
        groups
            .iter()
            .find(|(_, attributes)| {
                attributes
                    .iter()
                    .any(|a| a.name() == attribute_name && a.value() == value)
            })
            .map(|(local_id, _)| local_id.clone())
            .ok_or_else(|| {
                Error::GroupNotFound(format!("no group with `{attribute_name}` = `{value}`"))
            })
    }

    async fn list_connector_group_ids(
        &self,
        attribute_name: &str,
        value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>> {
        let groups = self.groups.read().unwrap();
        let ids = groups
            .iter()
            .filter(|(_, attributes)| {
                attributes
                    .iter()
                    .any(|a| a.name() == attribute_name && a.value() == value)
            })
            .map(|(local_id, _)| local_id.clone())
            .collect();
        Ok(page(ids, offset, length))
    }

    async fn list_connector_group_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>> {
        let groups = self.groups.read().unwrap();
        let ids = groups
            .iter()
            .filter(|(_, attributes)| {
                attributes
                    .iter()
                    .any(|a| a.name() == attribute_name && matches_pattern(a.value(), pattern))
            })
            .map(|(local_id, _)| local_id.clone())
            .collect();
        Ok(page(ids, offset, length))
    }

    async fn get_group_attribute_values(
        &self,
        local_id: &str,
        attribute_names: Option<Vec<String>>,
    ) -> Result<Vec<Attribute>> {
        let groups = self.groups.read().unwrap();
        let attributes = groups
            .get(local_id)
            .ok_or_else(|| Error::GroupNotFound(format!("no group `{local_id}`")))?;
        Ok(match attribute_names {
            Some(names) => attributes
                .iter()
                .filter(|a| names.iter().any(|name| name == a.name()))
                .cloned()
                .collect(),
            None => attributes.clone(),
        })
    }

    async fn delete_group(&self, local_id: &str) -> Result<()> {
        let mut groups = self.groups.write().unwrap();
        groups
            .shift_remove(local_id)
            .map(|_| ())
            .ok_or_else(|| Error::GroupNotFound(format!("no group `{local_id}`")))
    }

    async fn remove_added_groups(&self, local_ids: Vec<String>) -> Result<()> {
        let mut groups = self.groups.write().unwrap();
        let mut removed = self.removed_groups.write().unwrap();
        for local_id in local_ids {
            groups.shift_remove(&local_id);
            removed.push(local_id);
        }
        Ok(())
    }
}

/// Credential store connector over an in-process vault, accepting a single
/// credential kind.
pub struct InMemoryCredentialConnector {
    id: ConnectorId,
    accepted_kind: String,
    credentials: RwLock<IndexMap<String, Vec<Credential>>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryCredentialConnector {
    pub fn new(id: &str, accepted_kind: &str) -> Self {
        Self {
            id: ConnectorId::new(id),
            accepted_kind: accepted_kind.to_string(),
            credentials: RwLock::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// A connector accepting password credentials.
    pub fn passwords(id: &str) -> Self {
        Self::new(id, "password")
    }

    /// Makes every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.read().unwrap().len()
    }
}

#[async_trait]
impl CredentialStoreConnector for InMemoryCredentialConnector {
    fn connector_id(&self) -> &ConnectorId {
        &self.id
    }

    fn can_store(&self, credential: &Credential) -> bool {
        credential.kind() == self.accepted_kind
    }

    fn can_handle(&self, input: &CredentialInput) -> bool {
        input.credential().kind() == self.accepted_kind && input.connector_user_id().is_some()
    }

    async fn add_credential(&self, credentials: Vec<Credential>) -> Result<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::ConnectorWrite(format!(
                "simulated write failure in `{}`",
                self.id
            )));
        }
        let serial = self.next_id.fetch_add(1, Ordering::SeqCst);
        let local_id = format!("{}-c{serial}", self.id);
        self.credentials
            .write()
            .unwrap()
            .insert(local_id.clone(), credentials);
        Ok(local_id)
    }

    async fn authenticate(&self, input: &CredentialInput) -> Result<()> {
        let local_id = input
            .connector_user_id()
            .ok_or_else(|| Error::Authentication("missing credential partition id".to_string()))?;
        let credentials = self.credentials.read().unwrap();
        let stored = credentials
            .get(local_id)
            .ok_or_else(|| Error::Authentication("unknown credential partition".to_string()))?;
        if stored.iter().any(|c| c == input.credential()) {
            Ok(())
        } else {
            Err(Error::Authentication("invalid credentials".to_string()))
        }
    }

    async fn delete_credential(&self, local_id: &str) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap();
        credentials
            .shift_remove(local_id)
            .map(|_| ())
            .ok_or_else(|| Error::ConnectorWrite(format!("no credential `{local_id}`")))
    }
}
