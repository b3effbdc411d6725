//! Position store
//!
//! Creation is insert-if-absent on `trigger_id` under a single write lock.
//! A conflicting insert is a benign no-op reported as
//! [`CreateOutcome::Conflict`], which is what makes overlapping trigger
//! evaluations safe.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::lifecycle::apply_update;
use super::types::{PositionUpdate, SimulatedPosition};
use crate::error::{Error, Result};

/// Result of a create call
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(SimulatedPosition),
    /// A position with the same trigger id already exists
    Conflict,
}

impl CreateOutcome {
    pub fn created(&self) -> Option<&SimulatedPosition> {
        match self {
            CreateOutcome::Created(p) => Some(p),
            CreateOutcome::Conflict => None,
        }
    }
}

/// Record store for simulated positions
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// All positions, oldest first
    async fn list_positions(&self) -> Result<Vec<SimulatedPosition>>;

    /// Insert unless a position already carries the same trigger id
    async fn create_position(&self, position: SimulatedPosition) -> Result<CreateOutcome>;

    /// Apply an update. Closed positions are returned unchanged.
    async fn update_position(&self, id: &str, update: PositionUpdate) -> Result<SimulatedPosition>;
}

fn insert_if_absent(
    positions: &mut Vec<SimulatedPosition>,
    position: SimulatedPosition,
) -> CreateOutcome {
    let conflict = position.trigger_id.as_deref().is_some_and(|tid| {
        positions
            .iter()
            .any(|p| p.trigger_id.as_deref() == Some(tid))
    });
    if conflict {
        debug!(trigger_id = ?position.trigger_id, "Position already exists for trigger");
        return CreateOutcome::Conflict;
    }
    positions.push(position.clone());
    CreateOutcome::Created(position)
}

fn update_in_place(
    positions: &mut [SimulatedPosition],
    id: &str,
    update: &PositionUpdate,
) -> Result<SimulatedPosition> {
    let position = positions
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| Error::PositionNotFound(id.to_string()))?;
    *position = apply_update(position, update);
    Ok(position.clone())
}

/// In-process store
#[derive(Default)]
pub struct MemoryPositionStore {
    positions: RwLock<Vec<SimulatedPosition>>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions(positions: Vec<SimulatedPosition>) -> Self {
        Self {
            positions: RwLock::new(positions),
        }
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn list_positions(&self) -> Result<Vec<SimulatedPosition>> {
        Ok(self.positions.read().await.clone())
    }

    async fn create_position(&self, position: SimulatedPosition) -> Result<CreateOutcome> {
        let mut positions = self.positions.write().await;
        Ok(insert_if_absent(&mut positions, position))
    }

    async fn update_position(&self, id: &str, update: PositionUpdate) -> Result<SimulatedPosition> {
        let mut positions = self.positions.write().await;
        update_in_place(&mut positions, id, &update)
    }
}

/// Store persisted as a pretty-printed JSON array, rewritten after each write
pub struct JsonFilePositionStore {
    path: PathBuf,
    positions: RwLock<Vec<SimulatedPosition>>,
}

impl JsonFilePositionStore {
    /// Open the store, loading existing positions if the file exists
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let positions = if path.exists() {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::PositionPersistence(e.to_string()))?;
            let positions: Vec<SimulatedPosition> = serde_json::from_str(&data)
                .map_err(|e| Error::PositionPersistence(e.to_string()))?;
            info!("Loaded {} positions from {}", positions.len(), path.display());
            positions
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            positions: RwLock::new(positions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, positions: &[SimulatedPosition]) -> Result<()> {
        let data = serde_json::to_string_pretty(positions)
            .map_err(|e| Error::PositionPersistence(e.to_string()))?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| Error::PositionPersistence(e.to_string()))?;
        debug!("Saved {} positions to {}", positions.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl PositionStore for JsonFilePositionStore {
    async fn list_positions(&self) -> Result<Vec<SimulatedPosition>> {
        Ok(self.positions.read().await.clone())
    }

    async fn create_position(&self, position: SimulatedPosition) -> Result<CreateOutcome> {
        let mut positions = self.positions.write().await;
        let mut next = positions.clone();
        let outcome = insert_if_absent(&mut next, position);
        if matches!(outcome, CreateOutcome::Created(_)) {
            // Memory only changes once the file holds the new record
            self.save(&next).await?;
            *positions = next;
        }
        Ok(outcome)
    }

    async fn update_position(&self, id: &str, update: PositionUpdate) -> Result<SimulatedPosition> {
        let mut positions = self.positions.write().await;
        let mut next = positions.clone();
        let updated = update_in_place(&mut next, id, &update)?;
        self.save(&next).await?;
        *positions = next;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionStatus;
    use crate::trigger::{OpenCommand, Side};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn position(trigger_id: &str) -> SimulatedPosition {
        SimulatedPosition::open_from(
            &OpenCommand {
                direction: Side::Buy,
                entry_price: 30.0,
                trigger_id: trigger_id.to_string(),
                end_time: Utc::now().timestamp_millis() + 600_000,
            },
            Utc::now(),
        )
    }

    fn close_update() -> PositionUpdate {
        PositionUpdate {
            status: PositionStatus::ClosedTp,
            close_price: Some(31.2),
            pnl_percent: Some(20.0),
        }
    }

    #[tokio::test]
    async fn test_create_conflicts_on_trigger_id() {
        let store = MemoryPositionStore::new();

        let first = store.create_position(position("large_1")).await.unwrap();
        assert!(first.created().is_some());

        let second = store.create_position(position("large_1")).await.unwrap();
        assert_eq!(second, CreateOutcome::Conflict);

        assert_eq!(store.list_positions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_materialize_once() {
        let store = Arc::new(MemoryPositionStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_position(position("dense_a_BUY")).await.unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().created().is_some() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_positions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_closes_once() {
        let store = MemoryPositionStore::new();
        let created = store.create_position(position("large_2")).await.unwrap();
        let id = created.created().unwrap().id.clone();

        let closed = store.update_position(&id, close_update()).await.unwrap();
        assert_eq!(closed.status, PositionStatus::ClosedTp);

        let again = store
            .update_position(
                &id,
                PositionUpdate {
                    status: PositionStatus::ClosedSl,
                    close_price: Some(1.0),
                    pnl_percent: Some(-90.0),
                },
            )
            .await
            .unwrap();
        assert_eq!(again, closed);
    }

    #[tokio::test]
    async fn test_update_unknown_position() {
        let store = MemoryPositionStore::new();
        let err = store.update_position("missing", close_update()).await.unwrap_err();
        assert!(matches!(err, Error::PositionNotFound(_)));
    }

    #[tokio::test]
    async fn test_json_store_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.json");

        let store = JsonFilePositionStore::open(&path).await.unwrap();
        let created = store.create_position(position("large_3")).await.unwrap();
        let id = created.created().unwrap().id.clone();
        store.update_position(&id, close_update()).await.unwrap();
        drop(store);

        let reopened = JsonFilePositionStore::open(&path).await.unwrap();
        let positions = reopened.list_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].id, id);
        assert_eq!(positions[0].status, PositionStatus::ClosedTp);

        // Uniqueness survives a reload
        let outcome = reopened.create_position(position("large_3")).await.unwrap();
        assert_eq!(outcome, CreateOutcome::Conflict);
    }

    #[tokio::test]
    async fn test_json_store_keeps_nothing_after_failed_save() {
        let dir = tempdir().unwrap();
        let store_dir = dir.path().join("state");
        std::fs::create_dir(&store_dir).unwrap();
        let path = store_dir.join("positions.json");

        let store = JsonFilePositionStore::open(&path).await.unwrap();
        let created = store.create_position(position("large_4")).await.unwrap();
        let id = created.created().unwrap().id.clone();

        std::fs::remove_dir_all(&store_dir).unwrap();

        let err = store.create_position(position("large_5")).await.unwrap_err();
        assert!(matches!(err, Error::PositionPersistence(_)));
        assert_eq!(store.list_positions().await.unwrap().len(), 1);

        let err = store.update_position(&id, close_update()).await.unwrap_err();
        assert!(matches!(err, Error::PositionPersistence(_)));
        assert!(store.list_positions().await.unwrap()[0].is_open());

        // Retry succeeds once the directory is back
        std::fs::create_dir(&store_dir).unwrap();
        let retried = store.create_position(position("large_5")).await.unwrap();
        assert!(retried.created().is_some());
        assert_eq!(store.list_positions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFilePositionStore::open(&path).await.err().unwrap();
        assert!(matches!(err, Error::PositionPersistence(_)));
    }
}
