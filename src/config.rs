//! Orchestrator configuration.
//!
//! All process-wide settings live in an explicit [`MigratorConfig`] built
//! from the parsed command line and passed into the controller at
//! construction. Nothing is ambient global state.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::crd::StorageKind;
use crate::poll::PollSettings;

/// Command line of the orchestrator.
#[derive(Parser, Debug)]
#[command(
    name = "kraft-migrator",
    about = "Migrate a Strimzi-managed Kafka cluster from ZooKeeper to KRaft without downtime",
    version
)]
pub struct Cli {
    /// Namespace the cluster lives in
    pub namespace: String,

    /// Name of the Kafka resource to migrate
    pub cluster: String,

    /// Name for the controller node pool
    #[arg(long, default_value = "controller")]
    pub controller_pool: String,

    /// Controller replica count (default: mirror the ZooKeeper ensemble)
    #[arg(long)]
    pub controller_replicas: Option<i32>,

    /// Controller storage type
    #[arg(long, value_enum)]
    pub controller_storage_type: Option<StorageTypeArg>,

    /// Controller storage size, single value or comma-separated list
    /// (a list implies multi-volume jbod storage)
    #[arg(long)]
    pub controller_storage_size: Option<String>,

    /// Controller storage class
    #[arg(long)]
    pub controller_storage_class: Option<String>,

    /// Timeout in seconds for each migration phase transition
    #[arg(long, default_value_t = 3600)]
    pub wait_timeout: u64,

    /// Skip the precondition checks on another cluster's migration state
    #[arg(long)]
    pub skip_precondition_checks: bool,
}

/// Storage type override accepted on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StorageTypeArg {
    Persistent,
    Ephemeral,
    Jbod,
}

impl From<StorageTypeArg> for StorageKind {
    fn from(arg: StorageTypeArg) -> Self {
        match arg {
            StorageTypeArg::Persistent => StorageKind::PersistentClaim,
            StorageTypeArg::Ephemeral => StorageKind::Ephemeral,
            StorageTypeArg::Jbod => StorageKind::Jbod,
        }
    }
}

/// Resolved configuration passed into the migration controller.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    pub namespace: String,
    pub cluster: String,

    /// Name for the controller node pool.
    pub controller_pool_name: String,
    /// Explicit controller replica override.
    pub controller_replicas: Option<i32>,
    /// Explicit controller storage type override.
    pub controller_storage_type: Option<StorageKind>,
    /// Explicit controller storage sizes; more than one implies jbod.
    pub controller_storage_sizes: Vec<String>,
    /// Explicit controller storage class override.
    pub controller_storage_class: Option<String>,

    /// Fixed sleep between convergence polls.
    pub poll_interval: Duration,
    /// Deadline for each migration/metadata phase transition.
    pub wait_timeout: Duration,
    /// Deadline for pod-readiness waits.
    pub pod_timeout: Duration,
    /// Deadline for the rebalance proposal to be computed.
    pub proposal_timeout: Duration,
    /// Deadline for the approved rebalance to complete. Exceeding this one
    /// is downgraded to a warning.
    pub rebalance_timeout: Duration,

    /// Skip the best-effort precondition checks.
    pub skip_precondition_checks: bool,
}

impl MigratorConfig {
    /// Configuration with default timeouts for the given target cluster.
    pub fn new(namespace: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            cluster: cluster.into(),
            controller_pool_name: "controller".to_string(),
            controller_replicas: None,
            controller_storage_type: None,
            controller_storage_sizes: Vec::new(),
            controller_storage_class: None,
            poll_interval: Duration::from_secs(5),
            wait_timeout: Duration::from_secs(3600),
            pod_timeout: Duration::from_secs(600),
            proposal_timeout: Duration::from_secs(1800),
            rebalance_timeout: Duration::from_secs(3600),
            skip_precondition_checks: false,
        }
    }

    /// Poll settings for phase-transition waits.
    pub fn phase_poll(&self) -> PollSettings {
        PollSettings::new(self.poll_interval, self.wait_timeout)
    }

    /// Poll settings for pod-readiness waits.
    pub fn pod_poll(&self) -> PollSettings {
        PollSettings::new(self.poll_interval, self.pod_timeout)
    }

    /// Poll settings for the rebalance proposal wait.
    pub fn proposal_poll(&self) -> PollSettings {
        PollSettings::new(self.poll_interval, self.proposal_timeout)
    }

    /// Poll settings for the rebalance completion wait.
    pub fn rebalance_poll(&self) -> PollSettings {
        PollSettings::new(self.poll_interval, self.rebalance_timeout)
    }
}

impl From<Cli> for MigratorConfig {
    fn from(cli: Cli) -> Self {
        let sizes = cli
            .controller_storage_size
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut config = Self::new(cli.namespace, cli.cluster);
        config.controller_pool_name = cli.controller_pool;
        config.controller_replicas = cli.controller_replicas;
        config.controller_storage_type = cli.controller_storage_type.map(StorageKind::from);
        config.controller_storage_sizes = sizes;
        config.controller_storage_class = cli.controller_storage_class;
        config.wait_timeout = Duration::from_secs(cli.wait_timeout);
        config.skip_precondition_checks = cli.skip_precondition_checks;
        config
    }
}
