//! Strongly-typed identifiers for identity store entities.
//!
//! Logical user and group ids are freshly generated UUIDs and remain stable
//! for the lifetime of the entity. Connector ids are store-assigned strings.
//! Wrapping both prevents id mix-ups at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed UUID wrapper types for logical ids.
macro_rules! logical_id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new wrapper from a [`Uuid`].
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Creates a new random id (UUID v4).
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner [`Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parses a logical id from a string.
            ///
            /// # Errors
            ///
            /// Returns [`Error::Client`] if the string is not a valid UUID.
            pub fn parse_str(input: &str) -> Result<Self> {
                Uuid::parse_str(input)
                    .map(Self)
                    .map_err(|_| Error::Client(format!("invalid logical id `{input}`")))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(wrapper: $name) -> Self {
                wrapper.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

logical_id_type!(UserId, "Logical user id, stable across all partitions of the user");
logical_id_type!(GroupId, "Logical group id, stable across all partitions of the group");

/// Identifier of one identity or credential store connector.
///
/// Connector ids are assigned at configuration time and are unique within a
/// domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(String);

impl ConnectorId {
    /// Creates a connector id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConnectorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn user_id_parse_and_display() {
        let id = UserId::parse_str(VALID_UUID).unwrap();
        assert_eq!(id.to_string(), VALID_UUID);
    }

    #[test]
    fn user_id_parse_invalid() {
        let result = UserId::parse_str("not-a-uuid");
        assert!(matches!(result.unwrap_err(), Error::Client(_)));
    }

    #[test]
    fn user_id_new_v4_is_version_4() {
        let id = UserId::new_v4();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn group_id_from_str() {
        let id: GroupId = VALID_UUID.parse().unwrap();
        assert_eq!(id.to_string(), VALID_UUID);
    }

    #[test]
    fn logical_ids_serialize_transparently() {
        let id = UserId::parse_str(VALID_UUID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{VALID_UUID}\""));
    }

    #[test]
    fn connector_id_round_trip() {
        let id = ConnectorId::new("ldap-primary");
        assert_eq!(id.as_str(), "ldap-primary");
        assert_eq!(id.to_string(), "ldap-primary");
        assert_eq!(ConnectorId::from("ldap-primary"), id);
    }

    #[test]
    fn connector_ids_hash_distinctly() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ConnectorId::new("a"));
        set.insert(ConnectorId::new("b"));
        set.insert(ConnectorId::new("a"));
        assert_eq!(set.len(), 2);
    }
}
