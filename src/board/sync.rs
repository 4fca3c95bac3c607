//! Sync coordinator: optimistic apply, sequential persistence, reload on failure.

use super::classify::Vocabulary;
use super::reorder::DropPlan;
use super::{Board, ItemId};
use crate::store::{ItemStore, StoreError};

/// What happened to a committed drop.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Every changed item was written.
    Saved { persisted: usize },
    /// A write failed; the remaining writes were skipped and the board was
    /// reset from the store (or from the last snapshot if the reload failed
    /// too).
    RolledBack {
        attempted: usize,
        failed: ItemId,
        error: StoreError,
        reloaded: bool,
    },
}

impl CommitOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    /// Short user-facing summary for the notification line.
    pub fn message(&self) -> String {
        match self {
            Self::Saved { persisted: 0 } => "Order unchanged".to_string(),
            Self::Saved { persisted } => format!(
                "Order saved ({persisted} item{})",
                if *persisted == 1 { "" } else { "s" }
            ),
            Self::RolledBack {
                failed,
                error,
                reloaded: true,
                ..
            } => format!("Could not save item {failed}: {error}. Board reloaded"),
            Self::RolledBack {
                failed,
                error,
                reloaded: false,
                ..
            } => format!("Could not save item {failed}: {error}. Showing last known state"),
        }
    }
}

/// Pushes drop results to the store one item at a time.
#[derive(Debug, Clone)]
pub struct SyncCoordinator<S> {
    store: S,
}

impl<S: ItemStore> SyncCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build a board from the store's current contents.
    pub async fn load(&self, vocabulary: Vocabulary) -> Result<Board, StoreError> {
        let items = self.store.load_items().await?;
        tracing::info!(items = items.len(), "loaded board");
        Ok(Board::new(items, vocabulary))
    }

    /// Replace the board with a fresh copy from the store.
    pub async fn reload(&self, board: &mut Board) -> Result<(), StoreError> {
        let items = self.store.load_items().await?;
        board.reset(items);
        Ok(())
    }

    /// Apply `plan` locally, then persist each changed item in order.
    ///
    /// Writes are awaited one by one: item N+1 is not sent until item N has
    /// resolved. The first failure stops the batch and resets the whole board
    /// from the store.
    pub async fn commit(&self, board: &mut Board, plan: DropPlan) -> CommitOutcome {
        for update in &plan.updates {
            board.apply(update);
        }

        let mut attempted = 0;
        for item in plan.changed() {
            let Some(patch) = item.patch() else {
                continue;
            };
            attempted += 1;
            tracing::debug!(id = %item.id, lane = %patch.lane, position = patch.position, "persist");
            if let Err(error) = self.store.persist_item(&item.id, patch).await {
                tracing::warn!(id = %item.id, attempted, "persist failed, rolling back: {error}");
                let reloaded = self.rollback(board).await;
                return CommitOutcome::RolledBack {
                    attempted,
                    failed: item.id.clone(),
                    error,
                    reloaded,
                };
            }
            board.accept(&item.id, patch);
        }

        tracing::info!(persisted = attempted, "commit saved");
        CommitOutcome::Saved {
            persisted: attempted,
        }
    }

    async fn rollback(&self, board: &mut Board) -> bool {
        match self.reload(board).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("reload after failed commit also failed: {e}");
                board.revert();
                false
            }
        }
    }
}
