use std::mem;
use std::time::{Duration, Instant};

use crate::board::classify::Vocabulary;
use crate::board::drag::DragSession;
use crate::board::reorder::{plan_drop, DropPlan};
use crate::board::sync::{CommitOutcome, SyncCoordinator};
use crate::board::{Board, ItemId, Lane, WorkItem};
use crate::input::gesture::Gesture;
use crate::store::{ItemStore, StoreError};

/// Notification severity for status-line coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Front-end state: the board, the drag in progress and the status line.
pub struct App<S> {
    pub board: Board,
    pub drag: DragSession,
    pub notification: Option<String>,
    pub notification_level: NotificationLevel,
    pub notification_expires: Option<Instant>,
    notification_ttl: Duration,
    sync: SyncCoordinator<S>,
}

impl<S: ItemStore> App<S> {
    /// Load the board from `store`.
    pub async fn open(
        store: S,
        vocabulary: Vocabulary,
        notification_ttl: Duration,
    ) -> Result<Self, StoreError> {
        let sync = SyncCoordinator::new(store);
        let board = sync.load(vocabulary).await?;
        Ok(Self {
            board,
            drag: DragSession::Idle,
            notification: None,
            notification_level: NotificationLevel::Info,
            notification_expires: None,
            notification_ttl,
            sync,
        })
    }

    pub fn store(&self) -> &S {
        self.sync.store()
    }

    /// Show a transient notification.
    pub fn notify(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_level = NotificationLevel::Info;
        self.notification_expires = Some(Instant::now() + self.notification_ttl);
    }

    /// Show a transient error notification.
    pub fn notify_error(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_level = NotificationLevel::Error;
        self.notification_expires = Some(Instant::now() + self.notification_ttl);
    }

    /// Clear expired notifications.
    pub fn tick_notification(&mut self) {
        self.tick_notification_at(Instant::now());
    }

    fn tick_notification_at(&mut self, now: Instant) {
        if let Some(expires) = self.notification_expires {
            if now >= expires {
                self.notification = None;
                self.notification_level = NotificationLevel::Info;
                self.notification_expires = None;
            }
        }
    }

    /// Advance the drag session. Returns the lane updates when the gesture
    /// was a drop with something being dragged.
    ///
    /// Gestures naming items that are not on the board are ignored.
    pub fn handle(&mut self, gesture: Gesture) -> Option<DropPlan> {
        let drag = mem::take(&mut self.drag);
        let (drag, plan) = match gesture {
            Gesture::Start(id) => match self.locate(&id) {
                Some((item, lane)) => (drag.start(item, lane), None),
                None => {
                    tracing::debug!(%id, "drag start on unknown item ignored");
                    (drag, None)
                }
            },
            Gesture::OverLane(lane) => (drag.over_lane(lane), None),
            Gesture::OverItem(id) => match self.locate(&id) {
                Some((item, _)) => (drag.over_item(item), None),
                None => (drag, None),
            },
            Gesture::LeaveLane => (drag.leave_lane(), None),
            Gesture::LeaveItem => (drag.leave_item(), None),
            Gesture::Drop(lane) => {
                let (drag, event) = drag.drop_on(lane);
                let plan = event.map(|event| plan_drop(&self.board.lanes, &event));
                (drag, plan)
            }
            Gesture::End => (drag.end(), None),
        };
        self.drag = drag;
        plan
    }

    /// Persist a drop and post the outcome to the status line.
    pub async fn commit(&mut self, plan: DropPlan) -> CommitOutcome {
        let outcome = self.sync.commit(&mut self.board, plan).await;
        if outcome.is_saved() {
            self.notify(outcome.message());
        } else {
            self.notify_error(outcome.message());
        }
        outcome
    }

    /// Handle a gesture and commit the drop it produced, if any.
    pub async fn dispatch(&mut self, gesture: Gesture) -> Option<CommitOutcome> {
        let plan = self.handle(gesture)?;
        Some(self.commit(plan).await)
    }

    /// Re-fetch the board from the store, dropping any local state.
    pub async fn reload(&mut self) -> Result<(), StoreError> {
        self.drag = DragSession::Idle;
        match self.sync.reload(&mut self.board).await {
            Ok(()) => {
                self.notify("Board reloaded");
                Ok(())
            }
            Err(e) => {
                self.notify_error(format!("Reload failed: {e}"));
                Err(e)
            }
        }
    }

    fn locate(&self, id: &ItemId) -> Option<(WorkItem, Lane)> {
        let (lane, idx) = self.board.lanes.find(id)?;
        let item = self.board.lanes.get(lane).get(idx)?.clone();
        Some((item, lane))
    }
}
