//! Per-claim configuration profile entries.
//!
//! Claim profiles describe how a deployment dresses up individual claims
//! (required/readonly flags, validation regex, defaults). The store itself
//! only cares about the claim URI; everything else is carried opaquely for
//! the claim-translation collaborator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One claim entry from a profile file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProfileEntry {
    /// URI of the claim the entry configures.
    #[serde(rename = "claimURI")]
    pub claim_uri: String,

    /// Whether the claim must be supplied when creating a user.
    #[serde(default)]
    pub required: bool,

    /// Whether the claim may be updated after creation.
    #[serde(default)]
    pub readonly: bool,

    /// Validation regex, when the profile constrains values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Default value applied when the claim is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Declared data type of the claim value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Free-form properties, opaque to the store.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, serde_json::Value>,
}

/// A named set of claim profile entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimProfile {
    /// Profile name.
    pub name: String,

    /// Entries, one per configured claim.
    #[serde(default)]
    pub claims: Vec<ClaimProfileEntry>,
}

impl ClaimProfile {
    /// Looks up the entry for a claim URI.
    #[must_use]
    pub fn entry(&self, claim_uri: &str) -> Option<&ClaimProfileEntry> {
        self.claims.iter().find(|entry| entry.claim_uri == claim_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_profile_entry_with_knobs() {
        let json = r#"{
            "claimURI": "http://wso2.org/claims/username",
            "required": true,
            "readonly": false,
            "regex": "^[a-z0-9._-]+$",
            "defaultValue": null,
            "dataType": "string",
            "properties": {"displayName": "Username"}
        }"#;

        let entry: ClaimProfileEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.claim_uri, "http://wso2.org/claims/username");
        assert!(entry.required);
        assert!(!entry.readonly);
        assert_eq!(entry.regex.as_deref(), Some("^[a-z0-9._-]+$"));
        assert_eq!(entry.data_type.as_deref(), Some("string"));
        assert_eq!(
            entry.properties.get("displayName"),
            Some(&serde_json::json!("Username"))
        );
    }

    #[test]
    fn missing_knobs_default() {
        let json = r#"{"claimURI": "http://wso2.org/claims/email"}"#;
        let entry: ClaimProfileEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.required);
        assert!(!entry.readonly);
        assert!(entry.regex.is_none());
        assert!(entry.properties.is_empty());
    }

    #[test]
    fn profile_entry_lookup() {
        let profile = ClaimProfile {
            name: "default".to_string(),
            claims: vec![ClaimProfileEntry {
                claim_uri: "http://wso2.org/claims/email".to_string(),
                required: false,
                readonly: false,
                regex: None,
                default_value: None,
                data_type: None,
                properties: HashMap::new(),
            }],
        };

        assert!(profile.entry("http://wso2.org/claims/email").is_some());
        assert!(profile.entry("http://wso2.org/claims/username").is_none());
    }
}
