//! Kafka custom resource.
//!
//! Models the cluster-level resource the migration mutates in place: the
//! KRaft mode annotation, the node-pool enablement annotation, the legacy
//! broker and ZooKeeper blocks that get stripped after migration, and the
//! two status phase axes the orchestrator polls.

use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StatusCondition;
use super::storage::Storage;

/// Annotation carrying the KRaft mode flag: absent/"disabled" before the
/// migration, "migration" while dual-writing, "enabled" once complete.
pub const KRAFT_ANNOTATION: &str = "strimzi.io/kraft";

/// Annotation enabling node-pool management for the cluster.
pub const NODE_POOLS_ANNOTATION: &str = "strimzi.io/node-pools";

/// Broker config keys that are meaningless under KRaft and removed during
/// post-migration cleanup.
pub const DEPRECATED_CONFIG_KEYS: [&str; 2] = [
    "inter.broker.protocol.version",
    "log.message.format.version",
];

/// Kafka is the declarative description of the whole managed cluster.
///
/// The orchestrator never creates or deletes this resource; it only
/// annotates it and strips obsolete fields once the migration completes.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kafka.strimzi.io",
    version = "v1beta2",
    kind = "Kafka",
    plural = "kafkas",
    status = "KafkaStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSpec {
    /// Broker configuration. Replica count and storage live here until the
    /// cluster is node-pooled, then move to KafkaNodePool resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka: Option<BrokerSpec>,

    /// ZooKeeper ensemble configuration. Present while the cluster is
    /// externally-consensus-backed; removed during post-migration cleanup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zookeeper: Option<ZookeeperSpec>,

    /// Cruise Control sidecar. An empty object enables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cruise_control: Option<CruiseControlSpec>,
}

/// The `spec.kafka` block of a Kafka resource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSpec {
    /// Legacy broker replica count; absent once node pools own it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Legacy broker storage; absent once node pools own it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,

    /// Kafka broker configuration overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, serde_json::Value>>,

    /// Kafka version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The `spec.zookeeper` block of a Kafka resource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZookeeperSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
}

/// The `spec.cruiseControl` block. Presence alone enables the sidecar;
/// any tuning fields it may carry are irrelevant here and ignored on read.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CruiseControlSpec {}

/// Observed status of a Kafka resource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaStatus {
    /// Migration-progress phase written by the operator while dual-writing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_metadata_state: Option<String>,

    /// Metadata-location phase (current operator schema: direct scalar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_state: Option<String>,

    /// Legacy nested status block carrying the metadata-location phase on
    /// older operator versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaSubStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCondition>,
}

/// Nested `status.kafka` block used by older operator schema versions.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSubStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_state: Option<String>,
}

/// Value of the KRaft mode annotation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KraftMode {
    /// Annotation absent, empty or "disabled": still ZooKeeper-backed.
    Unset,
    /// Dual-writing migration in progress.
    Migration,
    /// Migration complete, cluster is KRaft-backed.
    Enabled,
    /// Unrecognized annotation value.
    Other(String),
}

impl KraftMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("null") | Some("disabled") => KraftMode::Unset,
            Some("migration") => KraftMode::Migration,
            Some("enabled") => KraftMode::Enabled,
            Some(other) => KraftMode::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for KraftMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KraftMode::Unset => write!(f, "unset"),
            KraftMode::Migration => write!(f, "migration"),
            KraftMode::Enabled => write!(f, "enabled"),
            KraftMode::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Migration-progress phase. Monotonic: the operator never regresses it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MigrationPhase {
    /// Fully ZooKeeper-backed, migration not started.
    ZooKeeper,
    /// Metadata is being copied into the KRaft quorum.
    KRaftMigration,
    /// Metadata is written to both ZooKeeper and KRaft.
    KRaftDualWriting,
    /// Brokers have switched to KRaft, ZooKeeper is write-only residue.
    KRaftPostMigration,
    /// Absent or unrecognized status value.
    Unknown(String),
}

impl MigrationPhase {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("null") => MigrationPhase::Unknown(String::new()),
            Some("ZooKeeper") => MigrationPhase::ZooKeeper,
            Some("KRaftMigration") => MigrationPhase::KRaftMigration,
            Some("KRaftDualWriting") => MigrationPhase::KRaftDualWriting,
            Some("KRaftPostMigration") => MigrationPhase::KRaftPostMigration,
            Some(other) => MigrationPhase::Unknown(other.to_string()),
        }
    }

    fn ordinal(&self) -> Option<u8> {
        match self {
            MigrationPhase::ZooKeeper => Some(0),
            MigrationPhase::KRaftMigration => Some(1),
            MigrationPhase::KRaftDualWriting => Some(2),
            MigrationPhase::KRaftPostMigration => Some(3),
            MigrationPhase::Unknown(_) => None,
        }
    }

    /// Whether this phase equals the target or lies beyond it in the
    /// monotonic order. Unknown phases are never at or past anything.
    pub fn at_or_past(&self, target: &MigrationPhase) -> bool {
        match (self.ordinal(), target.ordinal()) {
            (Some(current), Some(target)) => current >= target,
            _ => false,
        }
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationPhase::ZooKeeper => write!(f, "ZooKeeper"),
            MigrationPhase::KRaftMigration => write!(f, "KRaftMigration"),
            MigrationPhase::KRaftDualWriting => write!(f, "KRaftDualWriting"),
            MigrationPhase::KRaftPostMigration => write!(f, "KRaftPostMigration"),
            MigrationPhase::Unknown(raw) if raw.is_empty() => write!(f, "<absent>"),
            MigrationPhase::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Metadata-location phase. Monotonic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MetadataPhase {
    /// Metadata lives in ZooKeeper (implicit initial state).
    ZooKeeper,
    /// Metadata copied, final switch pending.
    PreKRaft,
    /// Metadata lives in the KRaft quorum.
    KRaft,
    /// Absent or unrecognized status value.
    Unknown(String),
}

impl MetadataPhase {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("null") => MetadataPhase::Unknown(String::new()),
            Some("ZooKeeper") => MetadataPhase::ZooKeeper,
            Some("PreKRaft") => MetadataPhase::PreKRaft,
            Some("KRaft") => MetadataPhase::KRaft,
            Some(other) => MetadataPhase::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for MetadataPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataPhase::ZooKeeper => write!(f, "ZooKeeper"),
            MetadataPhase::PreKRaft => write!(f, "PreKRaft"),
            MetadataPhase::KRaft => write!(f, "KRaft"),
            MetadataPhase::Unknown(raw) if raw.is_empty() => write!(f, "<absent>"),
            MetadataPhase::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

impl Kafka {
    /// Current value of the KRaft mode annotation.
    pub fn kraft_mode(&self) -> KraftMode {
        KraftMode::parse(self.annotations().get(KRAFT_ANNOTATION).map(String::as_str))
    }

    /// Whether node-pool management is enabled on this cluster.
    pub fn node_pools_enabled(&self) -> bool {
        self.annotations()
            .get(NODE_POOLS_ANNOTATION)
            .is_some_and(|v| v == "enabled")
    }

    /// Migration-progress phase from status.
    pub fn migration_phase(&self) -> MigrationPhase {
        MigrationPhase::parse(
            self.status
                .as_ref()
                .and_then(|s| s.kafka_metadata_state.as_deref()),
        )
    }

    /// Metadata-location phase from status.
    ///
    /// Prefers the direct scalar field and falls back to the nested block
    /// written by older operator versions. If both are present and disagree
    /// the scalar wins and the disagreement is logged.
    pub fn metadata_phase(&self) -> MetadataPhase {
        let status = self.status.as_ref();
        let scalar = status.and_then(|s| s.metadata_state.as_deref());
        let nested = status
            .and_then(|s| s.kafka.as_ref())
            .and_then(|k| k.metadata_state.as_deref());

        match (scalar, nested) {
            (Some(s), Some(n)) if s != n => {
                warn!(
                    cluster = %self.name_any(),
                    scalar = s,
                    nested = n,
                    "Metadata phase fields disagree, preferring scalar"
                );
                MetadataPhase::parse(Some(s))
            }
            (Some(s), _) => MetadataPhase::parse(Some(s)),
            (None, nested) => MetadataPhase::parse(nested),
        }
    }
}
