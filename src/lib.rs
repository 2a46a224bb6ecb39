//! kraft-migrator library crate.
//!
//! Orchestrates the multi-phase, zero-downtime migration of a
//! Strimzi-managed Kafka cluster from ZooKeeper to KRaft. The orchestrator
//! only observes and declares desired state; the Strimzi operator performs
//! all reconciliation.

pub mod access;
pub mod config;
pub mod crd;
pub mod error;
pub mod migration;
pub mod mirror;
pub mod poll;

pub use config::{Cli, MigratorConfig};
pub use error::{Error, Result};
pub use migration::{MigrationOutcome, Migrator};
