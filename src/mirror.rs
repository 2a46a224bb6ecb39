//! Configuration mirroring.
//!
//! Node pools created during adoption or evacuation must match the
//! configuration they replace byte for byte, otherwise the external
//! operator would see a spec change and roll the very nodes the migration
//! is trying to keep stable. Mandatory fields are therefore never
//! defaulted: a missing one fails with `ConfigIncomplete` naming it.

use crate::crd::{Storage, StorageKind, Volume};
use crate::error::{Error, Result};

/// Copy a replica count, failing if the source does not declare one.
pub fn mirror_replicas(source: Option<i32>, what: &str) -> Result<i32> {
    source.ok_or_else(|| Error::ConfigIncomplete(format!("{what}: replicas missing")))
}

/// Synthesize a storage spec equivalent to `source`.
///
/// Populated optional fields are copied; absent ones stay absent. For jbod
/// sources every volume's id and type are mandatory and the volume order is
/// preserved. For single-volume persistent sources the size is mandatory;
/// ephemeral sources carry no mandatory size.
pub fn mirror_storage(source: Option<&Storage>, what: &str) -> Result<Storage> {
    let source =
        source.ok_or_else(|| Error::ConfigIncomplete(format!("{what}: storage missing")))?;
    let kind = source
        .kind
        .ok_or_else(|| Error::ConfigIncomplete(format!("{what}: storage type missing")))?;

    match kind {
        StorageKind::Jbod => {
            let volumes = source.volumes.as_deref().unwrap_or_default();
            if volumes.is_empty() {
                return Err(Error::ConfigIncomplete(format!(
                    "{what}: jbod storage has no volumes"
                )));
            }
            let mirrored = volumes
                .iter()
                .enumerate()
                .map(|(index, volume)| mirror_volume(volume, index, what))
                .collect::<Result<Vec<_>>>()?;
            Ok(Storage::jbod(mirrored))
        }
        StorageKind::PersistentClaim => {
            let size = source.size.clone().ok_or_else(|| {
                Error::ConfigIncomplete(format!("{what}: persistent storage size missing"))
            })?;
            Ok(Storage {
                kind: Some(StorageKind::PersistentClaim),
                size: Some(size),
                class: source.class.clone(),
                delete_claim: source.delete_claim,
                id: source.id,
                volumes: None,
            })
        }
        StorageKind::Ephemeral => Ok(Storage {
            kind: Some(StorageKind::Ephemeral),
            size: source.size.clone(),
            class: source.class.clone(),
            delete_claim: source.delete_claim,
            id: source.id,
            volumes: None,
        }),
    }
}

fn mirror_volume(volume: &Volume, index: usize, what: &str) -> Result<Volume> {
    let id = volume
        .id
        .ok_or_else(|| Error::ConfigIncomplete(format!("{what}: volume {index} id missing")))?;
    let kind = volume
        .kind
        .ok_or_else(|| Error::ConfigIncomplete(format!("{what}: volume {index} type missing")))?;
    Ok(Volume {
        id: Some(id),
        kind: Some(kind),
        size: volume.size.clone(),
        class: volume.class.clone(),
        delete_claim: volume.delete_claim,
    })
}
