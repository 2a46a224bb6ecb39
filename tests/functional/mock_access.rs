//! In-memory mock of the control plane for workflow tests.
//!
//! Instead of duplicating production logic, this mock stores resources in
//! maps and simulates only what the external operator would do: create
//! pods for applied pools, compute rebalance proposals, and advance the
//! status phases while the migration annotations are set. The workflow
//! under test is the real `Migrator` running against the real
//! `ClusterAccess` trait.

use std::collections::BTreeMap;
use std::sync::Mutex;

use k8s_openapi::api::core::v1::{Pod, PodCondition, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

use kraft_migrator::access::ClusterAccess;
use kraft_migrator::crd::{
    APPROVE_VALUE, BrokerSpec, CLUSTER_LABEL, CONDITION_PROPOSAL_READY, CONDITION_READY,
    KRAFT_ANNOTATION, Kafka, KafkaNodePool, KafkaNodePoolStatus, KafkaRebalance,
    KafkaRebalanceStatus, KafkaSpec, KafkaStatus, NODE_POOLS_ANNOTATION, REBALANCE_ANNOTATION,
    Storage, StatusCondition, ZookeeperSpec, pool_pod_pattern,
};
use kraft_migrator::error::Result;

/// Mutable cluster state behind the mock.
#[derive(Default)]
pub struct MockState {
    pub kafkas: BTreeMap<String, Kafka>,
    pub pools: BTreeMap<String, KafkaNodePool>,
    pub rebalances: BTreeMap<String, KafkaRebalance>,
    pub pods: BTreeMap<String, Pod>,
    /// Audit log of every mutating operation, for idempotence assertions.
    pub writes: Vec<String>,
    /// Next node id handed to a newly applied pool.
    pub next_node_id: i32,
    /// Advance the migration phase one step per Kafka read while the
    /// cluster is in migration mode.
    pub advance_migration: bool,
    /// Advance the metadata phase one step per Kafka read once KRaft is
    /// enabled.
    pub advance_metadata: bool,
    /// Whether approving a rebalance completes it.
    pub approve_completes: bool,
    /// Migration phase observed at each Kafka read, for monotonicity
    /// assertions.
    pub phase_reads: Vec<String>,
}

/// In-memory [`ClusterAccess`] implementation.
pub struct MockAccess {
    namespace: String,
    pub state: Mutex<MockState>,
}

impl MockAccess {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            state: Mutex::new(MockState {
                advance_migration: true,
                advance_metadata: true,
                approve_completes: true,
                ..MockState::default()
            }),
        }
    }

    pub fn with_state(namespace: &str, state: MockState) -> Self {
        Self {
            namespace: namespace.to_string(),
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }

    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }
}

/// A ZooKeeper-backed Kafka with the legacy fields the migration strips.
pub fn zookeeper_kafka(name: &str) -> Kafka {
    let mut config = BTreeMap::new();
    config.insert(
        "inter.broker.protocol.version".to_string(),
        serde_json::json!("3.7"),
    );
    config.insert(
        "log.message.format.version".to_string(),
        serde_json::json!("3.7"),
    );
    Kafka::new(
        name,
        KafkaSpec {
            kafka: Some(BrokerSpec {
                replicas: Some(3),
                storage: Some(Storage::persistent("100Gi")),
                config: Some(config),
                version: Some("3.7.0".to_string()),
            }),
            zookeeper: Some(ZookeeperSpec {
                replicas: Some(3),
                storage: Some(Storage::persistent("5Gi")),
            }),
            cruise_control: None,
        },
    )
}

/// A Kafka that already completed its migration.
pub fn migrated_kafka(name: &str) -> Kafka {
    let mut kafka = Kafka::new(
        name,
        KafkaSpec {
            kafka: Some(BrokerSpec::default()),
            zookeeper: None,
            cruise_control: None,
        },
    );
    kafka.metadata.annotations = Some(
        [
            (KRAFT_ANNOTATION.to_string(), "enabled".to_string()),
            (NODE_POOLS_ANNOTATION.to_string(), "enabled".to_string()),
        ]
        .into_iter()
        .collect(),
    );
    kafka.status = Some(KafkaStatus {
        kafka_metadata_state: Some("KRaftPostMigration".to_string()),
        metadata_state: Some("KRaft".to_string()),
        ..KafkaStatus::default()
    });
    kafka
}

fn ready_pod(name: &str, cluster: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(
                [(CLUSTER_LABEL.to_string(), cluster.to_string())]
                    .into_iter()
                    .collect(),
            ),
            ..ObjectMeta::default()
        },
        status: Some(PodStatus {
            conditions: Some(vec![PodCondition {
                type_: "Ready".to_string(),
                status: "True".to_string(),
                ..PodCondition::default()
            }]),
            ..PodStatus::default()
        }),
        spec: None,
    }
}

/// A Ready Cruise Control pod for `cluster`, deployment-style hashed name.
pub fn cruise_control_pod(state: &mut MockState, cluster: &str) {
    let name = format!("{cluster}-cruise-control-5c8d9f6b");
    state.pods.insert(name.clone(), ready_pod(&name, cluster));
}

/// Pods for an applied pool, named `<cluster>-<pool>-<ordinal>`.
pub fn pool_pods(state: &mut MockState, cluster: &str, pool: &str, replicas: i32) {
    for ordinal in 0..replicas {
        let name = format!("{cluster}-{pool}-{ordinal}");
        state.pods.insert(name.clone(), ready_pod(&name, cluster));
    }
}

fn annotation<'a>(kafka: &'a Kafka, key: &str) -> Option<&'a str> {
    kafka
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
}

fn next_migration_phase(current: Option<&str>) -> &'static str {
    match current {
        None | Some("") => "ZooKeeper",
        Some("ZooKeeper") => "KRaftMigration",
        Some("KRaftMigration") => "KRaftDualWriting",
        _ => "KRaftPostMigration",
    }
}

fn next_metadata_phase(current: Option<&str>) -> &'static str {
    match current {
        None | Some("") => "PreKRaft",
        Some("PreKRaft") => "KRaft",
        _ => "KRaft",
    }
}

/// What the operator would do between two reads: advance status phases.
fn reconcile_kafka(state: &mut MockState, name: &str) {
    let advance_migration = state.advance_migration;
    let advance_metadata = state.advance_metadata;
    let Some(kafka) = state.kafkas.get_mut(name) else {
        return;
    };
    let mode = annotation(kafka, KRAFT_ANNOTATION).unwrap_or("").to_string();

    if mode == "migration" && advance_migration {
        let status = kafka.status.get_or_insert_with(KafkaStatus::default);
        let next = next_migration_phase(status.kafka_metadata_state.as_deref());
        status.kafka_metadata_state = Some(next.to_string());
    }
    if mode == "enabled" && advance_metadata {
        let status = kafka.status.get_or_insert_with(KafkaStatus::default);
        let next = next_metadata_phase(status.metadata_state.as_deref());
        status.metadata_state = Some(next.to_string());
    }

    let observed = kafka
        .status
        .as_ref()
        .and_then(|s| s.kafka_metadata_state.clone())
        .unwrap_or_default();
    state.phase_reads.push(observed);
}

/// RFC 7396 JSON merge patch: objects merge recursively, null removes.
fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    match patch {
        serde_json::Value::Object(entries) => {
            if !target.is_object() {
                *target = serde_json::json!({});
            }
            let object = target.as_object_mut().expect("target coerced to object");
            for (key, value) in entries {
                if value.is_null() {
                    object.remove(key);
                } else {
                    merge_patch(object.entry(key.clone()).or_insert(serde_json::Value::Null), value);
                }
            }
        }
        other => *target = other.clone(),
    }
}

impl ClusterAccess for MockAccess {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_kafka(&self, name: &str) -> Result<Option<Kafka>> {
        let mut state = self.lock();
        reconcile_kafka(&mut state, name);
        Ok(state.kafkas.get(name).cloned())
    }

    async fn list_pools(&self, cluster: &str) -> Result<Vec<KafkaNodePool>> {
        let state = self.lock();
        Ok(state
            .pools
            .values()
            .filter(|p| p.cluster() == Some(cluster))
            .cloned()
            .collect())
    }

    async fn get_pool(&self, name: &str) -> Result<Option<KafkaNodePool>> {
        Ok(self.lock().pools.get(name).cloned())
    }

    async fn apply_pool(&self, pool: &KafkaNodePool) -> Result<()> {
        let mut state = self.lock();
        let name = pool.name_any();
        state.writes.push(format!("apply_pool {name}"));

        let mut stored = pool.clone();
        // Keep assigned node ids across re-applies, like the operator would.
        let existing_ids = state
            .pools
            .get(&name)
            .map(|p| p.node_ids().to_vec())
            .unwrap_or_default();
        let node_ids = if existing_ids.is_empty() {
            let start = state.next_node_id;
            state.next_node_id += pool.spec.replicas;
            (start..start + pool.spec.replicas).collect()
        } else {
            existing_ids
        };
        stored.status = Some(KafkaNodePoolStatus { node_ids });

        let cluster = pool.cluster().unwrap_or_default().to_string();
        pool_pods(&mut state, &cluster, &name, pool.spec.replicas);
        state.pools.insert(name, stored);
        Ok(())
    }

    async fn delete_pool(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.writes.push(format!("delete_pool {name}"));
        if let Some(pool) = state.pools.remove(name) {
            // A name-prefix match would also catch a twin pool's pods, so
            // delete strictly by the ordinal pattern.
            let cluster = pool.cluster().unwrap_or_default();
            let pattern = pool_pod_pattern(cluster, name);
            state.pods.retain(|pod_name, _| !pattern.is_match(pod_name));
        }
        Ok(())
    }

    async fn annotate_kafka(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .writes
            .push(format!("annotate_kafka {name} {key}={value}"));
        if let Some(kafka) = state.kafkas.get_mut(name) {
            kafka
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn patch_kafka(&self, name: &str, patch: serde_json::Value) -> Result<()> {
        let mut state = self.lock();
        state.writes.push(format!("patch_kafka {name} {patch}"));
        let Some(kafka) = state.kafkas.get(name) else {
            return Ok(());
        };
        let mut value = serde_json::to_value(kafka)?;
        merge_patch(&mut value, &patch);
        let patched: Kafka = serde_json::from_value(value)?;

        let enables_cruise_control =
            kafka.spec.cruise_control.is_none() && patched.spec.cruise_control.is_some();
        state.kafkas.insert(name.to_string(), patched);

        if enables_cruise_control {
            let pod_name = format!("{name}-cruise-control-6b9f4c7d");
            state
                .pods
                .insert(pod_name.clone(), ready_pod(&pod_name, name));
        }
        Ok(())
    }

    async fn get_rebalance(&self, name: &str) -> Result<Option<KafkaRebalance>> {
        Ok(self.lock().rebalances.get(name).cloned())
    }

    async fn apply_rebalance(&self, rebalance: &KafkaRebalance) -> Result<()> {
        let mut state = self.lock();
        let name = rebalance.name_any();
        state.writes.push(format!("apply_rebalance {name}"));
        let mut stored = rebalance.clone();
        // Cruise Control computes the proposal "immediately".
        stored.status = Some(KafkaRebalanceStatus {
            conditions: vec![StatusCondition::new(CONDITION_PROPOSAL_READY, true)],
        });
        state.rebalances.insert(name, stored);
        Ok(())
    }

    async fn annotate_rebalance(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .writes
            .push(format!("annotate_rebalance {name} {key}={value}"));
        let approve_completes = state.approve_completes;
        if let Some(rebalance) = state.rebalances.get_mut(name) {
            rebalance
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), value.to_string());
            if key == REBALANCE_ANNOTATION && value == APPROVE_VALUE && approve_completes {
                rebalance
                    .status
                    .get_or_insert_with(KafkaRebalanceStatus::default)
                    .conditions
                    .push(StatusCondition::new(CONDITION_READY, true));
            }
        }
        Ok(())
    }

    async fn list_pods(&self, cluster: &str) -> Result<Vec<Pod>> {
        let state = self.lock();
        Ok(state
            .pods
            .values()
            .filter(|pod| {
                pod.metadata
                    .labels
                    .as_ref()
                    .and_then(|l| l.get(CLUSTER_LABEL))
                    .is_some_and(|c| c == cluster)
            })
            .cloned()
            .collect())
    }
}
