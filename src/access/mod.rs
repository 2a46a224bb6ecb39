//! Typed access to the control-plane resources the migration touches.
//!
//! All orchestration logic goes through the [`ClusterAccess`] trait so the
//! workflow can run against an in-memory mock in tests. The production
//! implementation in [`kube_access`] talks to the Kubernetes API server.

mod kube_access;

pub use kube_access::{FIELD_MANAGER, KubeAccess};

use k8s_openapi::api::core::v1::Pod;
use regex::Regex;

use crate::crd::{Kafka, KafkaNodePool, KafkaRebalance};
use crate::error::Result;

/// Read/write operations against the control plane, scoped to a namespace.
///
/// Reads of missing resources return `None`, never an error. Writes return
/// their failure; callers abort on any write failure since a partially
/// applied step leaves the cluster in a defined but incomplete state that
/// is only safe to resume from, not to build on.
#[allow(async_fn_in_trait)]
pub trait ClusterAccess {
    /// The namespace all operations are scoped to.
    fn namespace(&self) -> &str;

    async fn get_kafka(&self, name: &str) -> Result<Option<Kafka>>;

    /// Node pools labeled for `cluster`.
    async fn list_pools(&self, cluster: &str) -> Result<Vec<KafkaNodePool>>;

    async fn get_pool(&self, name: &str) -> Result<Option<KafkaNodePool>>;

    /// Server-side apply of a node pool; idempotent.
    async fn apply_pool(&self, pool: &KafkaNodePool) -> Result<()>;

    /// Initiate deletion of a node pool. Already-absent pools are not an
    /// error. Callers block on disappearance via the poller.
    async fn delete_pool(&self, name: &str) -> Result<()>;

    /// Set one annotation on a Kafka resource.
    async fn annotate_kafka(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// JSON merge patch against a Kafka resource; `null` values remove
    /// fields.
    async fn patch_kafka(&self, name: &str, patch: serde_json::Value) -> Result<()>;

    async fn get_rebalance(&self, name: &str) -> Result<Option<KafkaRebalance>>;

    /// Server-side apply of a rebalance request; idempotent.
    async fn apply_rebalance(&self, rebalance: &KafkaRebalance) -> Result<()>;

    /// Set one annotation on a rebalance request.
    async fn annotate_rebalance(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// Pods labeled for `cluster`. The set may grow and shrink under the
    /// external operator's reconciliation; callers re-read per poll.
    async fn list_pods(&self, cluster: &str) -> Result<Vec<Pod>>;
}

/// Whether a pod's "Ready" condition is observed "True".
pub fn pod_is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Count pods that both match the name pattern and are Ready.
pub fn ready_pods_matching(pods: &[Pod], pattern: &Regex) -> usize {
    pods.iter()
        .filter(|pod| {
            pod.metadata
                .name
                .as_deref()
                .is_some_and(|name| pattern.is_match(name))
                && pod_is_ready(pod)
        })
        .count()
}

/// Whether any pod whose name starts with `prefix` is Ready. Used for
/// deployment-managed pods whose suffix is a generated hash rather than an
/// ordinal.
pub fn any_ready_pod_with_prefix(pods: &[Pod], prefix: &str) -> bool {
    pods.iter().any(|pod| {
        pod.metadata
            .name
            .as_deref()
            .is_some_and(|name| name.starts_with(prefix))
            && pod_is_ready(pod)
    })
}
