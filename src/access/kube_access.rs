//! Kubernetes-backed implementation of [`ClusterAccess`].

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::debug;

use super::ClusterAccess;
use crate::crd::{CLUSTER_LABEL, Kafka, KafkaNodePool, KafkaRebalance};
use crate::error::{Error, Result};

/// Field manager name for server-side apply
pub const FIELD_MANAGER: &str = "kraft-migrator";

/// Control-plane access over a kube client, scoped to one namespace.
#[derive(Clone)]
pub struct KubeAccess {
    client: Client,
    namespace: String,
}

impl KubeAccess {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn kafkas(&self) -> Api<Kafka> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pools(&self) -> Api<KafkaNodePool> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn rebalances(&self) -> Api<KafkaRebalance> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn cluster_selector(cluster: &str) -> ListParams {
        ListParams::default().labels(&format!("{CLUSTER_LABEL}={cluster}"))
    }
}

fn annotation_patch(key: &str, value: &str) -> serde_json::Value {
    json!({"metadata": {"annotations": {key: value}}})
}

impl ClusterAccess for KubeAccess {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_kafka(&self, name: &str) -> Result<Option<Kafka>> {
        Ok(self.kafkas().get_opt(name).await?)
    }

    async fn list_pools(&self, cluster: &str) -> Result<Vec<KafkaNodePool>> {
        let list = self.pools().list(&Self::cluster_selector(cluster)).await?;
        Ok(list.items)
    }

    async fn get_pool(&self, name: &str) -> Result<Option<KafkaNodePool>> {
        Ok(self.pools().get_opt(name).await?)
    }

    async fn apply_pool(&self, pool: &KafkaNodePool) -> Result<()> {
        let name = pool.name_any();
        debug!(pool = %name, "Applying node pool");
        self.pools()
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(pool),
            )
            .await?;
        Ok(())
    }

    async fn delete_pool(&self, name: &str) -> Result<()> {
        debug!(pool = %name, "Deleting node pool");
        match self.pools().delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => match Error::from(e) {
                e if e.is_not_found() => Ok(()),
                e => Err(e),
            },
        }
    }

    async fn annotate_kafka(&self, name: &str, key: &str, value: &str) -> Result<()> {
        debug!(kafka = %name, key, value, "Annotating Kafka");
        self.kafkas()
            .patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(annotation_patch(key, value)),
            )
            .await?;
        Ok(())
    }

    async fn patch_kafka(&self, name: &str, patch: serde_json::Value) -> Result<()> {
        debug!(kafka = %name, patch = %patch, "Merge-patching Kafka");
        self.kafkas()
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn get_rebalance(&self, name: &str) -> Result<Option<KafkaRebalance>> {
        Ok(self.rebalances().get_opt(name).await?)
    }

    async fn apply_rebalance(&self, rebalance: &KafkaRebalance) -> Result<()> {
        let name = rebalance.name_any();
        debug!(rebalance = %name, "Applying rebalance request");
        self.rebalances()
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(rebalance),
            )
            .await?;
        Ok(())
    }

    async fn annotate_rebalance(&self, name: &str, key: &str, value: &str) -> Result<()> {
        debug!(rebalance = %name, key, value, "Annotating rebalance");
        self.rebalances()
            .patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(annotation_patch(key, value)),
            )
            .await?;
        Ok(())
    }

    async fn list_pods(&self, cluster: &str) -> Result<Vec<Pod>> {
        let list = self.pods().list(&Self::cluster_selector(cluster)).await?;
        Ok(list.items)
    }
}
