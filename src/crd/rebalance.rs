//! KafkaRebalance custom resource.
//!
//! A one-shot request asking Cruise Control to move partitions off a set of
//! nodes. The orchestrator creates it, approves the generated proposal via
//! annotation, polls it to completion and leaves it in place afterward.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{CLUSTER_LABEL, StatusCondition, find_condition};

/// Annotation used to approve a generated rebalance proposal.
pub const REBALANCE_ANNOTATION: &str = "strimzi.io/rebalance";

/// Annotation value approving the proposal.
pub const APPROVE_VALUE: &str = "approve";

/// Condition set once Cruise Control has computed a proposal.
pub const CONDITION_PROPOSAL_READY: &str = "ProposalReady";

/// Condition set once the approved rebalance has completed.
pub const CONDITION_READY: &str = "Ready";

/// Rebalance mode. This workflow only ever evacuates nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub enum RebalanceMode {
    #[serde(rename = "remove-brokers")]
    RemoveBrokers,
}

/// KafkaRebalance requests a partition redistribution.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kafka.strimzi.io",
    version = "v1beta2",
    kind = "KafkaRebalance",
    plural = "kafkarebalances",
    status = "KafkaRebalanceStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaRebalanceSpec {
    /// Rebalance mode.
    pub mode: RebalanceMode,

    /// Node ids to evacuate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brokers: Vec<i32>,
}

/// Observed status of a rebalance request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaRebalanceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCondition>,
}

impl KafkaRebalance {
    /// Build a remove-brokers request for `cluster` in `namespace`.
    pub fn remove_brokers(namespace: &str, name: &str, cluster: &str, brokers: Vec<i32>) -> Self {
        let mut rebalance = Self::new(
            name,
            KafkaRebalanceSpec {
                mode: RebalanceMode::RemoveBrokers,
                brokers,
            },
        );
        rebalance.metadata.namespace = Some(namespace.to_string());
        rebalance.metadata.labels = Some(
            [(CLUSTER_LABEL.to_string(), cluster.to_string())]
                .into_iter()
                .collect(),
        );
        rebalance
    }

    /// Observed status string of the named condition, if present.
    pub fn condition_status(&self, condition_type: &str) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, condition_type))
            .map(|c| c.status.as_str())
    }

    /// Whether the named condition is observed "True".
    pub fn condition_is_true(&self, condition_type: &str) -> bool {
        self.condition_status(condition_type) == Some("True")
    }
}
