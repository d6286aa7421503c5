//! Linkage model between logical identities and their per-connector
//! partitions.
//!
//! A logical user is assembled from attribute partitions held in identity
//! store connectors plus credential partitions held in credential store
//! connectors. The unique-id resolver persists which partitions make up
//! which logical entity; these types are its vocabulary.

use serde::{Deserialize, Serialize};

use crate::id::{ConnectorId, GroupId, UserId};

/// Which side of the store a partition lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKind {
    /// Attribute partition in an identity store connector.
    Identity,
    /// Credential partition in a credential store connector.
    Credential,
}

/// The slice of a logical entity that lives in one connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPartition {
    connector_id: ConnectorId,
    local_id: String,
    kind: PartitionKind,
}

impl UserPartition {
    /// Creates a partition reference.
    #[must_use]
    pub fn new(connector_id: ConnectorId, local_id: impl Into<String>, kind: PartitionKind) -> Self {
        Self {
            connector_id,
            local_id: local_id.into(),
            kind,
        }
    }

    /// Connector that stores this partition.
    #[must_use]
    pub const fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Id of the entity within the connector.
    #[must_use]
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Which side of the store the partition lives on.
    #[must_use]
    pub const fn kind(&self) -> PartitionKind {
        self.kind
    }

    /// Returns true for attribute partitions in identity store connectors.
    #[must_use]
    pub fn is_identity_store(&self) -> bool {
        self.kind == PartitionKind::Identity
    }
}

/// A logical user and the ordered set of partitions it is assembled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueUser {
    user_id: UserId,
    partitions: Vec<UserPartition>,
}

impl UniqueUser {
    /// Creates a unique user from its partitions.
    #[must_use]
    pub fn new(user_id: UserId, partitions: Vec<UserPartition>) -> Self {
        Self {
            user_id,
            partitions,
        }
    }

    /// Logical user id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// All partitions, in the order they were written.
    #[must_use]
    pub fn partitions(&self) -> &[UserPartition] {
        &self.partitions
    }

    /// Attribute partitions held in identity store connectors.
    pub fn identity_partitions(&self) -> impl Iterator<Item = &UserPartition> {
        self.partitions.iter().filter(|p| p.is_identity_store())
    }

    /// Credential partitions held in credential store connectors.
    pub fn credential_partitions(&self) -> impl Iterator<Item = &UserPartition> {
        self.partitions.iter().filter(|p| !p.is_identity_store())
    }
}

/// A logical group and the ordered set of partitions it is assembled from.
///
/// Groups carry no credential partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueGroup {
    group_id: GroupId,
    partitions: Vec<UserPartition>,
}

impl UniqueGroup {
    /// Creates a unique group from its partitions.
    #[must_use]
    pub fn new(group_id: GroupId, partitions: Vec<UserPartition>) -> Self {
        Self {
            group_id,
            partitions,
        }
    }

    /// Logical group id.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// All partitions, in the order they were written.
    #[must_use]
    pub fn partitions(&self) -> &[UserPartition] {
        &self.partitions
    }
}
