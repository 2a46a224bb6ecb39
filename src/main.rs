//! kraft-migrator - migrate a Strimzi-managed Kafka cluster from ZooKeeper
//! to KRaft without downtime.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Parses the command line into an explicit configuration
//! - Creates the Kubernetes client
//! - Runs the migration controller and maps its outcome to an exit code

use std::process::ExitCode;

use clap::Parser;
use kube::Client;
use tracing::{error, info};

use kraft_migrator::access::KubeAccess;
use kraft_migrator::{Cli, MigrationOutcome, Migrator, MigratorConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing subscriber
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kraft_migrator=info,kube=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = MigratorConfig::from(Cli::parse());
    info!(
        namespace = %config.namespace,
        cluster = %config.cluster,
        "Starting ZooKeeper-to-KRaft migration"
    );

    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create Kubernetes client");
            return ExitCode::FAILURE;
        }
    };

    let access = KubeAccess::new(client, config.namespace.clone());
    match Migrator::new(&access, &config).run().await {
        Ok(MigrationOutcome::Completed) => {
            info!(cluster = %config.cluster, "Migration completed");
            ExitCode::SUCCESS
        }
        Ok(MigrationOutcome::AlreadyMigrated) => {
            info!(cluster = %config.cluster, "Cluster already migrated");
            ExitCode::SUCCESS
        }
        Err(e) => {
            // The error carries the awaited field and its last observed
            // value for polled conditions.
            error!(cluster = %config.cluster, error = %e, "Migration failed");
            ExitCode::FAILURE
        }
    }
}
