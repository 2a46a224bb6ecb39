//! The migration workflow.
//!
//! [`controller`] drives the top-level state sequence; [`evacuation`] frees
//! the reserved broker pool name when another cluster holds it;
//! [`controller_pool`] resolves the KRaft controller pool's shape.

pub mod controller;
pub mod controller_pool;
pub mod evacuation;

pub use controller::{MigrationOutcome, Migrator};

use crate::access::{ClusterAccess, ready_pods_matching};
use crate::crd::pool_pod_pattern;
use crate::error::Result;
use crate::poll::{PollSettings, wait_for};

/// Block until `replicas` pods of one pool are Ready.
///
/// Pod membership is derived from the `<cluster>-<pool>-<ordinal>` naming
/// convention; the pool's pods share the cluster label with every other
/// pool's, so the name pattern is what tells them apart.
pub(crate) async fn wait_pool_pods_ready<A: ClusterAccess>(
    access: &A,
    cluster: &str,
    pool: &str,
    replicas: i32,
    settings: PollSettings,
) -> Result<()> {
    let pattern = pool_pod_pattern(cluster, pool);
    let pattern = &pattern;
    let awaited = format!("{replicas} Ready pods for pool {pool} of cluster {cluster}");
    wait_for(
        &awaited,
        move || async move {
            let pods = access.list_pods(cluster).await?;
            Ok(ready_pods_matching(&pods, pattern))
        },
        |ready| *ready >= replicas as usize,
        settings,
    )
    .await?;
    Ok(())
}
