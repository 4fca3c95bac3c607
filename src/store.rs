//! The case store seen from the board: load everything, patch one item.
//!
//! The store is the system of record for lane and position. The board only
//! ever writes full-value placements, so repeating a patch is harmless.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::board::storage::{self, StorageError};
use crate::board::{ItemId, ItemPatch, WorkItem};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("store rejected update for item {id}: {reason}")]
    Rejected { id: ItemId, reason: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch every item from the source of record.
    async fn load_items(&self) -> Result<Vec<WorkItem>, StoreError>;

    /// Overwrite one item's lane and position.
    async fn persist_item(&self, id: &ItemId, patch: ItemPatch) -> Result<(), StoreError>;
}

/// Store backed by a `.docket/` directory on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    docket_dir: PathBuf,
}

impl FileStore {
    pub fn new(docket_dir: impl Into<PathBuf>) -> Self {
        Self {
            docket_dir: docket_dir.into(),
        }
    }

    /// Locate the store by walking up from `start`.
    pub fn discover(start: &Path) -> Result<Self, StorageError> {
        storage::find_docket_dir(start).map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.docket_dir
    }
}

#[async_trait]
impl ItemStore for FileStore {
    async fn load_items(&self) -> Result<Vec<WorkItem>, StoreError> {
        let dir = self.docket_dir.clone();
        let items = tokio::task::spawn_blocking(move || storage::load_items(&dir)).await??;
        Ok(items)
    }

    async fn persist_item(&self, id: &ItemId, patch: ItemPatch) -> Result<(), StoreError> {
        let dir = self.docket_dir.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || storage::patch_item(&dir, &id, patch)).await??;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    items: Vec<WorkItem>,
    persist_calls: usize,
    fail_on_call: Option<usize>,
    fail_loads: bool,
    log: Vec<(ItemId, ItemPatch)>,
}

/// In-memory store with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                items,
                ..MemoryInner::default()
            })),
        }
    }

    /// Make the `n`-th persist call (1-based, counted from now on) fail.
    pub fn fail_on_call(&self, n: usize) {
        let mut inner = self.lock();
        inner.fail_on_call = Some(inner.persist_calls + n);
    }

    /// Make every subsequent `load_items` fail.
    pub fn fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    /// Number of persist calls attempted so far, failed ones included.
    pub fn persist_calls(&self) -> usize {
        self.lock().persist_calls
    }

    /// Successful patches in the order they were applied.
    pub fn persisted(&self) -> Vec<(ItemId, ItemPatch)> {
        self.lock().log.clone()
    }

    pub fn items(&self) -> Vec<WorkItem> {
        self.lock().items.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock only means a test thread panicked mid-call; the
        // data itself is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn load_items(&self) -> Result<Vec<WorkItem>, StoreError> {
        let inner = self.lock();
        if inner.fail_loads {
            return Err(StoreError::Unavailable("load failed".into()));
        }
        Ok(inner.items.clone())
    }

    async fn persist_item(&self, id: &ItemId, patch: ItemPatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.persist_calls += 1;
        if inner.fail_on_call == Some(inner.persist_calls) {
            return Err(StoreError::Rejected {
                id: id.clone(),
                reason: "injected failure".into(),
            });
        }
        let item = inner
            .items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| StoreError::Rejected {
                id: id.clone(),
                reason: "unknown item".into(),
            })?;
        item.apply_patch(patch);
        inner.log.push((id.clone(), patch));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Lane;

    fn patch(position: u32, lane: Lane) -> ItemPatch {
        ItemPatch { position, lane }
    }

    #[tokio::test]
    async fn memory_store_applies_patches() {
        let store = MemoryStore::new(vec![WorkItem::new("1", "a")]);
        store
            .persist_item(&ItemId::from("1"), patch(1, Lane::Task))
            .await
            .unwrap();
        let items = store.load_items().await.unwrap();
        assert_eq!(items[0].lane, Some(Lane::Task));
        assert_eq!(store.persisted().len(), 1);
    }

    #[tokio::test]
    async fn memory_store_injected_failure_counts_attempt() {
        let store = MemoryStore::new(vec![WorkItem::new("1", "a"), WorkItem::new("2", "b")]);
        store.fail_on_call(2);
        store
            .persist_item(&ItemId::from("1"), patch(1, Lane::Task))
            .await
            .unwrap();
        let err = store
            .persist_item(&ItemId::from("2"), patch(2, Lane::Task))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.persist_calls(), 2);
        assert_eq!(store.items()[1].lane, None);
    }

    #[tokio::test]
    async fn memory_store_unknown_item_is_rejected() {
        let store = MemoryStore::new(Vec::new());
        let err = store
            .persist_item(&ItemId::from("9"), patch(1, Lane::Task))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
    }

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let docket_dir = storage::init_store(dir.path(), "Test").unwrap();
        storage::add_item(&docket_dir, "Call", "C-9", "llamar", None).unwrap();

        let store = FileStore::discover(dir.path()).unwrap();
        store
            .persist_item(&ItemId::from("1"), patch(4, Lane::Diligence))
            .await
            .unwrap();
        let items = store.load_items().await.unwrap();
        assert_eq!(items[0].position, Some(4));
        assert_eq!(items[0].lane, Some(Lane::Diligence));
    }

    #[tokio::test]
    async fn file_store_unknown_item_surfaces_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let docket_dir = storage::init_store(dir.path(), "Test").unwrap();
        let store = FileStore::new(docket_dir);
        let err = store
            .persist_item(&ItemId::from("7"), patch(1, Lane::Task))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Storage(StorageError::UnknownItem(_))
        ));
    }
}
