//! Strimzi custom resource definitions consumed by the orchestrator.
//!
//! These types model the slices of the Strimzi API the migration touches.
//! The orchestrator is a client of these CRDs, not their owner: unknown
//! fields are ignored on read and all mutations are merge patches that only
//! carry the fields being changed.

mod kafka;
mod node_pool;
mod rebalance;
mod storage;

pub use kafka::{
    BrokerSpec, CruiseControlSpec, DEPRECATED_CONFIG_KEYS, KRAFT_ANNOTATION, Kafka, KafkaSpec,
    KafkaStatus, KafkaSubStatus, KraftMode, MetadataPhase, MigrationPhase, NODE_POOLS_ANNOTATION,
    ZookeeperSpec,
};
pub use node_pool::{
    KafkaNodePool, KafkaNodePoolSpec, KafkaNodePoolStatus, PoolRole, RESERVED_BROKER_POOL,
    pool_pod_pattern,
};
pub use rebalance::{
    APPROVE_VALUE, CONDITION_PROPOSAL_READY, CONDITION_READY, KafkaRebalance, KafkaRebalanceSpec,
    KafkaRebalanceStatus, REBALANCE_ANNOTATION, RebalanceMode,
};
pub use storage::{Storage, StorageKind, Volume};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label binding node pools, rebalances and pods to their Kafka cluster
pub const CLUSTER_LABEL: &str = "strimzi.io/cluster";

/// Condition describing one aspect of a resource's observed state.
///
/// Shared between Kafka and KafkaRebalance statuses; the status string is
/// "True", "False" or "Unknown" following Kubernetes convention.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    /// Type of condition (e.g. "Ready", "ProposalReady").
    pub r#type: String,
    /// Status of the condition ("True", "False", "Unknown").
    pub status: String,
    /// Machine-readable reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message with details about the last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last time the condition transitioned from one status to another.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl StatusCondition {
    /// Create a new condition.
    pub fn new(condition_type: &str, status: bool) -> Self {
        Self {
            r#type: condition_type.to_string(),
            status: if status {
                "True".to_string()
            } else {
                "False".to_string()
            },
            reason: None,
            message: None,
            last_transition_time: Some(jiff::Timestamp::now().to_string()),
        }
    }

    /// Check whether the condition's observed status is "True".
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

/// Find a condition by type within a condition list.
pub fn find_condition<'a>(
    conditions: &'a [StatusCondition],
    condition_type: &str,
) -> Option<&'a StatusCondition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}
