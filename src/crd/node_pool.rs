//! KafkaNodePool custom resource.
//!
//! A node pool is a named, independently-scaled group of cluster nodes with
//! a role set, bound to its Kafka cluster by the `strimzi.io/cluster` label.

use kube::CustomResource;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::CLUSTER_LABEL;
use super::storage::Storage;

/// The default broker pool name. Unique per namespace, which is why a
/// cluster adopting pools may first have to evacuate another cluster's
/// claim on it.
pub const RESERVED_BROKER_POOL: &str = "kafka";

/// Role a node pool's members take within the cluster.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PoolRole {
    /// Data-serving nodes.
    Broker,
    /// Metadata/consensus quorum members.
    Controller,
}

/// KafkaNodePool declares a group of nodes for one Kafka cluster.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kafka.strimzi.io",
    version = "v1beta2",
    kind = "KafkaNodePool",
    plural = "kafkanodepools",
    status = "KafkaNodePoolStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaNodePoolSpec {
    /// Number of nodes in the pool.
    pub replicas: i32,

    /// Roles taken by this pool's nodes.
    pub roles: Vec<PoolRole>,

    /// Storage for this pool's nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
}

/// Observed status of a node pool.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaNodePoolStatus {
    /// Numeric node ids currently assigned to this pool.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_ids: Vec<i32>,
}

impl KafkaNodePool {
    /// Build a pool bound to `cluster` in `namespace`.
    pub fn labeled(
        namespace: &str,
        name: &str,
        cluster: &str,
        replicas: i32,
        roles: Vec<PoolRole>,
        storage: Storage,
    ) -> Self {
        let mut pool = Self::new(
            name,
            KafkaNodePoolSpec {
                replicas,
                roles,
                storage: Some(storage),
            },
        );
        pool.metadata.namespace = Some(namespace.to_string());
        pool.metadata.labels = Some(
            [(CLUSTER_LABEL.to_string(), cluster.to_string())]
                .into_iter()
                .collect(),
        );
        pool
    }

    /// The Kafka cluster this pool is bound to, from its label.
    pub fn cluster(&self) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(CLUSTER_LABEL))
            .map(String::as_str)
    }

    /// Node ids currently assigned to this pool.
    pub fn node_ids(&self) -> &[i32] {
        self.status
            .as_ref()
            .map(|s| s.node_ids.as_slice())
            .unwrap_or_default()
    }
}

/// Pattern matching pod names belonging to one pool of one cluster.
///
/// Pods follow the `<cluster>-<pool>-<ordinal>` convention. All pools of a
/// cluster share the cluster label selector, so pods are attributed to a
/// pool by name pattern alone.
pub fn pool_pod_pattern(cluster: &str, pool: &str) -> Regex {
    let pattern = format!(
        "^{}-{}-[0-9]+$",
        regex::escape(cluster),
        regex::escape(pool)
    );
    // The pattern is built from two escaped literals and cannot fail to
    // compile.
    #[allow(clippy::expect_used)]
    Regex::new(&pattern).expect("escaped pod pattern is always valid")
}
