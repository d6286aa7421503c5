//! Lightweight handles to logical users and groups.
//!
//! Handles carry only the logical id and the owning domain name; they never
//! cache attributes. Every data access re-enters the store, which is passed
//! explicitly, so handles stay `Send + 'static` and hold no back-pointers.

use serde::{Deserialize, Serialize};

use fedid_core::claim::{Claim, MetaClaim};
use fedid_core::id::{GroupId, UserId};

use crate::store::VirtualIdentityStore;
use crate::Result;

/// Handle to a logical user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    user_id: UserId,
    domain_name: String,
}

impl User {
    pub(crate) fn new(user_id: UserId, domain_name: impl Into<String>) -> Self {
        Self {
            user_id,
            domain_name: domain_name.into(),
        }
    }

    /// Logical user id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Name of the domain the user lives in.
    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Fetches all claims of the user.
    pub async fn claims(&self, store: &VirtualIdentityStore) -> Result<Vec<Claim>> {
        store
            .user_claims(self.user_id, None, Some(&self.domain_name))
            .await
    }

    /// Fetches the claims selected by the given meta claims.
    pub async fn claims_of(
        &self,
        store: &VirtualIdentityStore,
        meta_claims: &[MetaClaim],
    ) -> Result<Vec<Claim>> {
        store
            .user_claims(self.user_id, Some(meta_claims), Some(&self.domain_name))
            .await
    }

    /// Replaces the user's claims.
    pub async fn update_claims(
        &self,
        store: &VirtualIdentityStore,
        claims: Vec<Claim>,
    ) -> Result<()> {
        store
            .update_user_claims(self.user_id, claims, Some(&self.domain_name))
            .await
    }

    /// Fetches the groups the user is a member of.
    pub async fn groups(&self, store: &VirtualIdentityStore) -> Result<Vec<Group>> {
        store
            .groups_of_user(self.user_id, Some(&self.domain_name))
            .await
    }

    /// Returns true if the user is a member of the group.
    pub async fn is_in_group(
        &self,
        store: &VirtualIdentityStore,
        group_id: GroupId,
    ) -> Result<bool> {
        store
            .is_user_in_group(self.user_id, group_id, Some(&self.domain_name))
            .await
    }
}

/// Handle to a logical group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    group_id: GroupId,
    domain_name: String,
}

impl Group {
    pub(crate) fn new(group_id: GroupId, domain_name: impl Into<String>) -> Self {
        Self {
            group_id,
            domain_name: domain_name.into(),
        }
    }

    /// Logical group id.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Name of the domain the group lives in.
    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Fetches all claims of the group.
    pub async fn claims(&self, store: &VirtualIdentityStore) -> Result<Vec<Claim>> {
        store
            .group_claims(self.group_id, None, Some(&self.domain_name))
            .await
    }

    /// Replaces the group's claims.
    pub async fn update_claims(
        &self,
        store: &VirtualIdentityStore,
        claims: Vec<Claim>,
    ) -> Result<()> {
        store
            .update_group_claims(self.group_id, claims, Some(&self.domain_name))
            .await
    }

    /// Fetches the users that are members of the group.
    pub async fn users(&self, store: &VirtualIdentityStore) -> Result<Vec<User>> {
        store
            .users_of_group(self.group_id, Some(&self.domain_name))
            .await
    }
}

/// Proof of a successful authentication, carrying the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    user: User,
}

impl AuthenticationContext {
    pub(crate) fn new(user: User) -> Self {
        Self { user }
    }

    /// The authenticated user.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Consumes the context, returning the authenticated user.
    #[must_use]
    pub fn into_user(self) -> User {
        self.user
    }
}
