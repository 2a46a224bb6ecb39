//! Top-level migration state sequence.
//!
//! Drives a cluster through
//! `Unpooled → Pooled → ControllerPoolPresent → MigrationEnabled →
//! {KRaftMigration → KRaftDualWriting → KRaftPostMigration} → KRaftEnabled →
//! MetadataKRaft` one step at a time. Every step detects already-applied
//! state and skips it, so re-running after a partial run resumes instead of
//! failing. The external operator reconciles concurrently; each decision
//! re-reads fresh state.

use serde_json::json;
use tracing::{info, warn};

use crate::access::ClusterAccess;
use crate::config::MigratorConfig;
use crate::crd::{
    DEPRECATED_CONFIG_KEYS, KRAFT_ANNOTATION, Kafka, KafkaNodePool, KraftMode, MetadataPhase,
    MigrationPhase, NODE_POOLS_ANNOTATION, PoolRole, RESERVED_BROKER_POOL,
};
use crate::error::{Error, Result};
use crate::mirror::{mirror_replicas, mirror_storage};
use crate::poll::wait_for;

use super::{controller_pool, evacuation, wait_pool_pods_ready};

/// How a run ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MigrationOutcome {
    /// The full sequence ran (possibly with skipped, already-done steps).
    Completed,
    /// The cluster was already KRaft-enabled; nothing to do.
    AlreadyMigrated,
}

/// The migration controller for one cluster.
pub struct Migrator<'a, A: ClusterAccess> {
    access: &'a A,
    config: &'a MigratorConfig,
}

impl<'a, A: ClusterAccess> Migrator<'a, A> {
    pub fn new(access: &'a A, config: &'a MigratorConfig) -> Self {
        Self { access, config }
    }

    /// Run the migration to completion.
    pub async fn run(&self) -> Result<MigrationOutcome> {
        let cluster = &self.config.cluster;
        let kafka = self.fetch_kafka().await?;

        match kafka.kraft_mode() {
            KraftMode::Enabled => {
                info!(cluster, "Cluster is already KRaft-enabled, nothing to do");
                return Ok(MigrationOutcome::AlreadyMigrated);
            }
            KraftMode::Migration => {
                info!(cluster, "Migration already in progress, resuming monitoring");
                self.ensure_controller_pool().await?;
                self.monitor().await?;
            }
            KraftMode::Unset => {
                self.ensure_pooled(&kafka).await?;
                self.enable_migration_mode().await?;
                self.ensure_controller_pool().await?;
                self.monitor().await?;
            }
            KraftMode::Other(value) => {
                return Err(Error::Validation(format!(
                    "unrecognized {KRAFT_ANNOTATION} annotation value: {value}"
                )));
            }
        }

        self.enable_kraft().await?;
        self.verify_and_cleanup().await?;
        info!(cluster, "Migration complete, cluster is KRaft-backed");
        Ok(MigrationOutcome::Completed)
    }

    async fn fetch_kafka(&self) -> Result<Kafka> {
        self.access
            .get_kafka(&self.config.cluster)
            .await?
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Kafka {} not found in namespace {}",
                    self.config.cluster,
                    self.access.namespace()
                ))
            })
    }

    /// Move the cluster's brokers under node-pool management if they are
    /// not already, evacuating the reserved pool name first when another
    /// cluster holds it.
    async fn ensure_pooled(&self, kafka: &Kafka) -> Result<()> {
        let cluster = &self.config.cluster;
        let pools = self.access.list_pools(cluster).await?;
        if !pools.is_empty() {
            info!(cluster, pools = pools.len(), "Cluster already has node pools");
            if !kafka.node_pools_enabled() {
                self.access
                    .annotate_kafka(cluster, NODE_POOLS_ANNOTATION, "enabled")
                    .await?;
                info!(cluster, "Node-pool management enabled");
            }
            return Ok(());
        }

        if let Some(reserved) = self.access.get_pool(RESERVED_BROKER_POOL).await? {
            match reserved.cluster() {
                Some(owner) if owner != cluster => {
                    let owner = owner.to_string();
                    let owner_kafka =
                        self.access.get_kafka(&owner).await?.ok_or_else(|| {
                            Error::Validation(format!(
                                "pool {RESERVED_BROKER_POOL} is labeled for cluster {owner}, \
                                 but no such Kafka exists"
                            ))
                        })?;
                    evacuation::reclaim_reserved_pool(self.access, self.config, &owner_kafka)
                        .await?;
                }
                Some(_) => {}
                None => {
                    warn!(
                        pool = RESERVED_BROKER_POOL,
                        "Reserved pool exists without a cluster label"
                    );
                }
            }
        }

        info!(cluster, "Adopting brokers into pool {RESERVED_BROKER_POOL}");
        let broker = kafka.spec.kafka.as_ref();
        let replicas = mirror_replicas(broker.and_then(|b| b.replicas), "cluster broker spec")?;
        let storage =
            mirror_storage(broker.and_then(|b| b.storage.as_ref()), "cluster broker spec")?;
        let pool = KafkaNodePool::labeled(
            self.access.namespace(),
            RESERVED_BROKER_POOL,
            cluster,
            replicas,
            vec![PoolRole::Broker],
            storage,
        );
        self.access.apply_pool(&pool).await?;
        wait_pool_pods_ready(
            self.access,
            cluster,
            RESERVED_BROKER_POOL,
            replicas,
            self.config.pod_poll(),
        )
        .await?;

        self.access
            .annotate_kafka(cluster, NODE_POOLS_ANNOTATION, "enabled")
            .await?;
        info!(cluster, "Node-pool management enabled");

        self.strip_legacy_broker_fields().await
    }

    /// Remove the replica count and storage the pool now owns from the
    /// cluster spec. Skipped when already absent.
    async fn strip_legacy_broker_fields(&self) -> Result<()> {
        let cluster = &self.config.cluster;
        let fresh = self.fetch_kafka().await?;
        let broker = fresh.spec.kafka.as_ref();
        let has_legacy = broker
            .map(|b| b.replicas.is_some() || b.storage.is_some())
            .unwrap_or(false);
        if !has_legacy {
            info!(cluster, "Legacy broker replica/storage fields already absent");
            return Ok(());
        }
        self.access
            .patch_kafka(
                cluster,
                json!({"spec": {"kafka": {"replicas": null, "storage": null}}}),
            )
            .await?;
        info!(cluster, "Legacy broker replica/storage fields removed");
        Ok(())
    }

    /// Flip the cluster into migration mode. Must happen before controller
    /// pool creation: the operator rejects controller-role pools while the
    /// cluster is purely ZooKeeper-backed.
    async fn enable_migration_mode(&self) -> Result<()> {
        let cluster = &self.config.cluster;
        self.access
            .annotate_kafka(cluster, KRAFT_ANNOTATION, "migration")
            .await?;
        info!(cluster, "Migration mode enabled");
        Ok(())
    }

    /// Create the KRaft controller pool if it does not exist, then block
    /// until its pods are Ready.
    async fn ensure_controller_pool(&self) -> Result<()> {
        let cluster = &self.config.cluster;
        let name = &self.config.controller_pool_name;

        let replicas = match self.access.get_pool(name).await? {
            Some(existing) => {
                if existing.cluster() != Some(cluster.as_str()) {
                    return Err(Error::Validation(format!(
                        "controller pool name {name} is held by cluster {}",
                        existing.cluster().unwrap_or("<unlabeled>")
                    )));
                }
                info!(cluster, pool = %name, "Controller pool already exists");
                existing.spec.replicas
            }
            None => {
                let kafka = self.fetch_kafka().await?;
                let broker_pool = self.find_broker_pool().await?;
                let resolved =
                    controller_pool::resolve(self.config, &kafka, broker_pool.as_ref())?;
                let pool = KafkaNodePool::labeled(
                    self.access.namespace(),
                    name,
                    cluster,
                    resolved.replicas,
                    vec![PoolRole::Controller],
                    resolved.storage,
                );
                self.access.apply_pool(&pool).await?;
                info!(
                    cluster,
                    pool = %name,
                    replicas = resolved.replicas,
                    "Controller pool applied"
                );
                resolved.replicas
            }
        };

        wait_pool_pods_ready(self.access, cluster, name, replicas, self.config.pod_poll()).await
    }

    /// The cluster's broker pool, preferring the reserved name.
    async fn find_broker_pool(&self) -> Result<Option<KafkaNodePool>> {
        let pools = self.access.list_pools(&self.config.cluster).await?;
        let mut fallback = None;
        for pool in pools {
            if pool.metadata.name.as_deref() == Some(RESERVED_BROKER_POOL) {
                return Ok(Some(pool));
            }
            if fallback.is_none() && pool.spec.roles.contains(&PoolRole::Broker) {
                fallback = Some(pool);
            }
        }
        Ok(fallback)
    }

    /// Block on each migration phase in order, skipping phases the cluster
    /// has already moved past. Phases are monotonic; a phase once reached
    /// is never re-awaited.
    async fn monitor(&self) -> Result<()> {
        let cluster = &self.config.cluster;
        let mut current = self.fetch_kafka().await?.migration_phase();
        if current.at_or_past(&MigrationPhase::KRaftDualWriting) {
            info!(cluster, phase = %current, "Migration already past dual-writing, skipping ahead");
        }

        for target in [
            MigrationPhase::KRaftMigration,
            MigrationPhase::KRaftDualWriting,
            MigrationPhase::KRaftPostMigration,
        ] {
            if current.at_or_past(&target) {
                info!(cluster, phase = %target, "Phase already reached, skipping wait");
                continue;
            }
            info!(cluster, phase = %target, "Waiting for migration phase");
            current = wait_for(
                &format!("cluster {cluster} migration phase {target}"),
                move || async move { Ok(self.fetch_kafka().await?.migration_phase()) },
                |phase| phase.at_or_past(&target),
                self.config.phase_poll(),
            )
            .await?;
            info!(cluster, phase = %current, "Migration phase reached");
        }
        Ok(())
    }

    /// Finalize: flip the mode annotation to "enabled".
    async fn enable_kraft(&self) -> Result<()> {
        let cluster = &self.config.cluster;
        if self.fetch_kafka().await?.kraft_mode() == KraftMode::Enabled {
            info!(cluster, "KRaft already enabled");
            return Ok(());
        }
        self.access
            .annotate_kafka(cluster, KRAFT_ANNOTATION, "enabled")
            .await?;
        info!(cluster, "KRaft enabled");
        Ok(())
    }

    /// Wait for the metadata to land in KRaft, then strip the now-obsolete
    /// ZooKeeper block and deprecated broker config keys.
    async fn verify_and_cleanup(&self) -> Result<()> {
        let cluster = &self.config.cluster;
        wait_for(
            &format!("cluster {cluster} metadata phase {}", MetadataPhase::KRaft),
            move || async move { Ok(self.fetch_kafka().await?.metadata_phase()) },
            |phase| *phase == MetadataPhase::KRaft,
            self.config.phase_poll(),
        )
        .await?;
        info!(cluster, "Metadata is KRaft-backed");

        let fresh = self.fetch_kafka().await?;
        if fresh.spec.zookeeper.is_some() {
            self.access
                .patch_kafka(cluster, json!({"spec": {"zookeeper": null}}))
                .await?;
            info!(cluster, "ZooKeeper configuration block removed");
        } else {
            info!(cluster, "ZooKeeper configuration block already absent");
        }

        for key in DEPRECATED_CONFIG_KEYS {
            let present = fresh
                .spec
                .kafka
                .as_ref()
                .and_then(|k| k.config.as_ref())
                .is_some_and(|c| c.contains_key(key));
            if !present {
                info!(cluster, key, "Deprecated config key already absent");
                continue;
            }
            // Leftover keys do not affect correctness, only tidiness, so a
            // failed removal is not fatal.
            match self
                .access
                .patch_kafka(cluster, json!({"spec": {"kafka": {"config": {key: null}}}}))
                .await
            {
                Ok(()) => info!(cluster, key, "Deprecated config key removed"),
                Err(e) => warn!(cluster, key, error = %e, "Failed to remove deprecated config key"),
            }
        }
        Ok(())
    }
}
