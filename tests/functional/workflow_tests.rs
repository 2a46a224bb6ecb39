//! End-to-end migration workflow scenarios.

use std::collections::BTreeMap;
use std::time::Duration;

use kraft_migrator::crd::{
    DEPRECATED_CONFIG_KEYS, KRAFT_ANNOTATION, KafkaNodePool, KafkaNodePoolStatus,
    NODE_POOLS_ANNOTATION, PoolRole, Storage,
};
use kraft_migrator::{Error, MigrationOutcome, Migrator, MigratorConfig};

use crate::mock_access::{MockAccess, MockState, migrated_kafka, pool_pods, zookeeper_kafka};

const NAMESPACE: &str = "kafka-ns";

/// Default timeouts scaled down so a failed wait surfaces quickly.
fn test_config(cluster: &str) -> MigratorConfig {
    let mut config = MigratorConfig::new(NAMESPACE, cluster);
    config.poll_interval = Duration::from_millis(1);
    config.wait_timeout = Duration::from_secs(5);
    config.pod_timeout = Duration::from_secs(5);
    config.proposal_timeout = Duration::from_secs(5);
    config.rebalance_timeout = Duration::from_secs(5);
    config
}

fn annotation(access: &MockAccess, cluster: &str, key: &str) -> Option<String> {
    let state = access.state.lock().unwrap();
    state.kafkas[cluster]
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .cloned()
}

/// State for a cluster that already adopted node pools: legacy broker
/// fields stripped, reserved broker pool applied with assigned node ids,
/// controller pool optional.
fn pooled_state(cluster: &str, with_controller: bool) -> MockState {
    let mut state = MockState {
        advance_migration: true,
        advance_metadata: true,
        approve_completes: true,
        next_node_id: 3,
        ..MockState::default()
    };

    let mut kafka = zookeeper_kafka(cluster);
    let broker = kafka.spec.kafka.as_mut().unwrap();
    broker.replicas = None;
    broker.storage = None;
    kafka.metadata.annotations = Some(BTreeMap::from([(
        NODE_POOLS_ANNOTATION.to_string(),
        "enabled".to_string(),
    )]));
    state.kafkas.insert(cluster.to_string(), kafka);

    let mut broker_pool = KafkaNodePool::labeled(
        NAMESPACE,
        "kafka",
        cluster,
        3,
        vec![PoolRole::Broker],
        Storage::persistent("100Gi"),
    );
    broker_pool.status = Some(KafkaNodePoolStatus {
        node_ids: vec![0, 1, 2],
    });
    state.pools.insert("kafka".to_string(), broker_pool);
    pool_pods(&mut state, cluster, "kafka", 3);

    if with_controller {
        let controller = KafkaNodePool::labeled(
            NAMESPACE,
            "controller",
            cluster,
            3,
            vec![PoolRole::Controller],
            Storage::persistent("100Gi"),
        );
        state.pools.insert("controller".to_string(), controller);
        pool_pods(&mut state, cluster, "controller", 3);
    }
    state
}

#[tokio::test]
async fn full_migration_from_scratch() {
    let access = MockAccess::new(NAMESPACE);
    access
        .state
        .lock()
        .unwrap()
        .kafkas
        .insert("demo".to_string(), zookeeper_kafka("demo"));
    let config = test_config("demo");

    let outcome = Migrator::new(&access, &config).run().await.unwrap();
    assert_eq!(outcome, MigrationOutcome::Completed);

    assert_eq!(
        annotation(&access, "demo", KRAFT_ANNOTATION).as_deref(),
        Some("enabled")
    );
    assert_eq!(
        annotation(&access, "demo", NODE_POOLS_ANNOTATION).as_deref(),
        Some("enabled")
    );

    let state = access.state.lock().unwrap();
    let kafka = &state.kafkas["demo"];
    assert!(kafka.spec.zookeeper.is_none(), "zookeeper block not removed");
    let broker = kafka.spec.kafka.as_ref().unwrap();
    assert!(broker.replicas.is_none(), "legacy replicas not stripped");
    assert!(broker.storage.is_none(), "legacy storage not stripped");
    let broker_config = broker.config.as_ref().unwrap();
    for key in DEPRECATED_CONFIG_KEYS {
        assert!(!broker_config.contains_key(key), "{key} not removed");
    }
    assert_eq!(broker.version.as_deref(), Some("3.7.0"));

    let broker_pool = &state.pools["kafka"];
    assert_eq!(broker_pool.cluster(), Some("demo"));
    assert_eq!(broker_pool.spec.replicas, 3);
    assert_eq!(broker_pool.spec.roles, vec![PoolRole::Broker]);

    // Replicas mirror the ZooKeeper ensemble, storage mirrors the brokers,
    // and the pool lands in the accessor's namespace.
    let controller = &state.pools["controller"];
    assert_eq!(controller.cluster(), Some("demo"));
    assert_eq!(controller.metadata.namespace.as_deref(), Some(NAMESPACE));
    assert_eq!(controller.spec.replicas, 3);
    assert_eq!(controller.spec.roles, vec![PoolRole::Controller]);
    let storage = controller.spec.storage.as_ref().unwrap();
    assert_eq!(storage.size.as_deref(), Some("100Gi"));
}

#[tokio::test]
async fn rerun_after_completion_is_a_noop() {
    let access = MockAccess::new(NAMESPACE);
    access
        .state
        .lock()
        .unwrap()
        .kafkas
        .insert("demo".to_string(), zookeeper_kafka("demo"));
    let config = test_config("demo");

    let first = Migrator::new(&access, &config).run().await.unwrap();
    assert_eq!(first, MigrationOutcome::Completed);
    let writes_after_first = access.writes();

    let second = Migrator::new(&access, &config).run().await.unwrap();
    assert_eq!(second, MigrationOutcome::AlreadyMigrated);
    assert_eq!(
        access.writes(),
        writes_after_first,
        "second run must not mutate anything"
    );
}

#[tokio::test]
async fn already_migrated_cluster_short_circuits() {
    let access = MockAccess::new(NAMESPACE);
    access
        .state
        .lock()
        .unwrap()
        .kafkas
        .insert("demo".to_string(), migrated_kafka("demo"));
    let config = test_config("demo");

    let outcome = Migrator::new(&access, &config).run().await.unwrap();
    assert_eq!(outcome, MigrationOutcome::AlreadyMigrated);
    assert!(access.writes().is_empty());
}

#[tokio::test]
async fn resumes_in_progress_migration_without_reapplying_pools() {
    let mut state = pooled_state("demo", true);
    state.kafkas.get_mut("demo").unwrap().metadata.annotations =
        Some(BTreeMap::from([
            (KRAFT_ANNOTATION.to_string(), "migration".to_string()),
            (NODE_POOLS_ANNOTATION.to_string(), "enabled".to_string()),
        ]));
    let access = MockAccess::with_state(NAMESPACE, state);
    let config = test_config("demo");

    let outcome = Migrator::new(&access, &config).run().await.unwrap();
    assert_eq!(outcome, MigrationOutcome::Completed);

    assert!(
        !access.writes().iter().any(|w| w.starts_with("apply_pool")),
        "resume must reuse existing pools"
    );
    assert_eq!(
        annotation(&access, "demo", KRAFT_ANNOTATION).as_deref(),
        Some("enabled")
    );
    let state = access.state.lock().unwrap();
    assert!(state.kafkas["demo"].spec.zookeeper.is_none());
}

#[tokio::test]
async fn resume_past_dual_writing_skips_earlier_phases() {
    let mut state = pooled_state("demo", true);
    // Phases never advance in this scenario; completing at all proves no
    // wait targeted an already-passed phase.
    state.advance_migration = false;
    let kafka = state.kafkas.get_mut("demo").unwrap();
    kafka.metadata.annotations = Some(BTreeMap::from([
        (KRAFT_ANNOTATION.to_string(), "migration".to_string()),
        (NODE_POOLS_ANNOTATION.to_string(), "enabled".to_string()),
    ]));
    kafka.status.get_or_insert_default().kafka_metadata_state =
        Some("KRaftPostMigration".to_string());
    let access = MockAccess::with_state(NAMESPACE, state);
    let config = test_config("demo");

    let outcome = Migrator::new(&access, &config).run().await.unwrap();
    assert_eq!(outcome, MigrationOutcome::Completed);
}

#[tokio::test]
async fn observed_migration_phases_never_regress() {
    let access = MockAccess::new(NAMESPACE);
    access
        .state
        .lock()
        .unwrap()
        .kafkas
        .insert("demo".to_string(), zookeeper_kafka("demo"));
    let config = test_config("demo");

    Migrator::new(&access, &config).run().await.unwrap();

    fn ordinal(raw: &str) -> i32 {
        match raw {
            "" => -1,
            "ZooKeeper" => 0,
            "KRaftMigration" => 1,
            "KRaftDualWriting" => 2,
            "KRaftPostMigration" => 3,
            other => panic!("unexpected phase {other}"),
        }
    }
    let state = access.state.lock().unwrap();
    let ordinals: Vec<i32> = state.phase_reads.iter().map(|p| ordinal(p)).collect();
    assert!(
        ordinals.windows(2).all(|w| w[0] <= w[1]),
        "phase sequence regressed: {ordinals:?}"
    );
    assert_eq!(ordinals.last(), Some(&3));
}

#[tokio::test]
async fn conflicting_storage_flags_fail_before_any_apply() {
    let state = pooled_state("demo", false);
    let access = MockAccess::with_state(NAMESPACE, state);
    let mut config = test_config("demo");
    config.controller_storage_sizes = vec!["10Gi".to_string(), "20Gi".to_string()];
    config.controller_storage_type =
        Some(kraft_migrator::crd::StorageKind::PersistentClaim);

    let result = Migrator::new(&access, &config).run().await;
    assert!(matches!(result, Err(Error::Validation(_))), "{result:?}");

    let state = access.state.lock().unwrap();
    assert!(
        !state.pools.contains_key("controller"),
        "no controller pool may be applied after a validation failure"
    );
}
