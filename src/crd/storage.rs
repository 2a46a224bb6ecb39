//! Storage specifications for brokers and controllers.
//!
//! The wire format is deliberately tolerant: every field is optional so that
//! partially-specified storage read from a live cluster never fails to
//! deserialize. Mandatory-field enforcement happens in the configuration
//! mirror, which names the exact missing field instead of silently
//! defaulting.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Discriminator for the storage variants Strimzi supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    /// Pod-local storage, lost on restart.
    Ephemeral,
    /// A single PersistentVolumeClaim per node.
    PersistentClaim,
    /// Multiple independent volumes per node ("just a bunch of disks").
    Jbod,
}

impl StorageKind {
    /// Whether this variant is backed by persistent volumes and therefore
    /// requires a size.
    pub fn is_persistent(&self) -> bool {
        matches!(self, StorageKind::PersistentClaim | StorageKind::Jbod)
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKind::Ephemeral => write!(f, "ephemeral"),
            StorageKind::PersistentClaim => write!(f, "persistent-claim"),
            StorageKind::Jbod => write!(f, "jbod"),
        }
    }
}

/// Storage specification as read from or written to the control plane.
///
/// Single-volume variants use the flat fields; the jbod variant uses
/// `volumes`. Optional fields serialize only when populated so that a
/// mirrored spec carries exactly the fields its source carried.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    /// Storage type discriminator.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StorageKind>,

    /// Volume size (e.g. "100Gi"). Mandatory for persistent variants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Kubernetes storage class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Whether the claim is deleted when the node is removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_claim: Option<bool>,

    /// Volume id, only meaningful when the pool later grows into jbod.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,

    /// Ordered volume list for the jbod variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,
}

impl Storage {
    /// Single-volume persistent storage of the given size.
    pub fn persistent(size: impl Into<String>) -> Self {
        Self {
            kind: Some(StorageKind::PersistentClaim),
            size: Some(size.into()),
            ..Self::default()
        }
    }

    /// Ephemeral storage.
    pub fn ephemeral() -> Self {
        Self {
            kind: Some(StorageKind::Ephemeral),
            ..Self::default()
        }
    }

    /// Multi-volume storage over the given volumes.
    pub fn jbod(volumes: Vec<Volume>) -> Self {
        Self {
            kind: Some(StorageKind::Jbod),
            volumes: Some(volumes),
            ..Self::default()
        }
    }
}

/// One volume within a jbod storage specification.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Volume id, unique within the volume list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,

    /// Volume type discriminator.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StorageKind>,

    /// Volume size (e.g. "100Gi").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Kubernetes storage class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Whether the claim is deleted when the node is removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_claim: Option<bool>,
}

impl Volume {
    /// Persistent volume with the given id and size.
    pub fn persistent(id: i32, size: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            kind: Some(StorageKind::PersistentClaim),
            size: Some(size.into()),
            ..Self::default()
        }
    }
}
