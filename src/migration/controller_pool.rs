//! Controller pool resolution.
//!
//! Determines replica count and storage for the KRaft controller pool from
//! explicit overrides, the existing broker pool, and the legacy cluster
//! spec, in that priority order. Resolution is a pure function so every
//! inconsistency is rejected before anything is applied to the cluster.

use crate::config::MigratorConfig;
use crate::crd::{Kafka, KafkaNodePool, Storage, StorageKind, Volume};
use crate::error::{Error, Result};
use crate::mirror::{mirror_replicas, mirror_storage};

/// Resolved shape of the controller pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerPoolSpec {
    pub replicas: i32,
    pub storage: Storage,
}

/// Resolve the controller pool's replicas and storage.
///
/// Replicas: explicit override, else mirrored from the ZooKeeper ensemble.
/// Storage type priority: explicit override > implied jbod from a
/// multi-entry size list > broker pool's type > legacy broker spec's type >
/// single-volume persistent. Storage class priority: explicit override >
/// broker pool's class > legacy ZooKeeper storage's class.
pub fn resolve(
    config: &MigratorConfig,
    kafka: &Kafka,
    broker_pool: Option<&KafkaNodePool>,
) -> Result<ControllerPoolSpec> {
    let zookeeper = kafka.spec.zookeeper.as_ref();
    let legacy_broker_storage = kafka.spec.kafka.as_ref().and_then(|k| k.storage.as_ref());
    let pool_storage = broker_pool.and_then(|p| p.spec.storage.as_ref());

    let replicas = match config.controller_replicas {
        Some(replicas) => replicas,
        None => mirror_replicas(zookeeper.and_then(|z| z.replicas), "zookeeper")?,
    };

    let sizes = &config.controller_storage_sizes;
    let multi_volume = sizes.len() > 1;

    if multi_volume {
        if let Some(kind) = config.controller_storage_type {
            if kind != StorageKind::Jbod {
                return Err(Error::Validation(format!(
                    "a comma-separated size list implies jbod storage, \
                     but storage type {kind} was requested"
                )));
            }
        }
    }

    let kind = config
        .controller_storage_type
        .or(multi_volume.then_some(StorageKind::Jbod))
        .or(pool_storage.and_then(|s| s.kind))
        .or(legacy_broker_storage.and_then(|s| s.kind))
        .unwrap_or(StorageKind::PersistentClaim);

    let class = config
        .controller_storage_class
        .clone()
        .or_else(|| pool_storage.and_then(|s| s.class.clone()))
        .or_else(|| {
            zookeeper
                .and_then(|z| z.storage.as_ref())
                .and_then(|s| s.class.clone())
        });

    let storage = match kind {
        StorageKind::Jbod => {
            if sizes.is_empty() {
                mirror_jbod(pool_storage, legacy_broker_storage)?
            } else {
                let volumes = sizes
                    .iter()
                    .enumerate()
                    .map(|(id, size)| Volume {
                        id: Some(id as i32),
                        kind: Some(StorageKind::PersistentClaim),
                        size: Some(size.clone()),
                        class: class.clone(),
                        delete_claim: None,
                    })
                    .collect();
                Storage::jbod(volumes)
            }
        }
        StorageKind::PersistentClaim => {
            let size = sizes
                .first()
                .cloned()
                .or_else(|| pool_storage.and_then(|s| s.size.clone()))
                .or_else(|| legacy_broker_storage.and_then(|s| s.size.clone()))
                .ok_or_else(|| {
                    Error::ConfigIncomplete(
                        "controller pool: no storage size given and none to mirror".to_string(),
                    )
                })?;
            Storage {
                kind: Some(StorageKind::PersistentClaim),
                size: Some(size),
                class,
                ..Storage::default()
            }
        }
        StorageKind::Ephemeral => Storage::ephemeral(),
    };

    Ok(ControllerPoolSpec { replicas, storage })
}

/// Mirror jbod storage from the broker pool or the legacy broker spec.
fn mirror_jbod(
    pool_storage: Option<&Storage>,
    legacy_storage: Option<&Storage>,
) -> Result<Storage> {
    let source = [pool_storage, legacy_storage]
        .into_iter()
        .flatten()
        .find(|s| s.kind == Some(StorageKind::Jbod))
        .ok_or_else(|| {
            Error::ConfigIncomplete(
                "controller pool: jbod storage requested with no sizes \
                 and no jbod source to mirror"
                    .to_string(),
            )
        })?;
    mirror_storage(Some(source), "controller pool jbod source")
}
