//! Drag session state machine.
//!
//! The session is a plain value: every transition consumes it and returns the
//! next state, so handlers never share mutable drag fields. Transitions that
//! make no sense in the current state return the session unchanged.

use super::{Lane, WorkItem};

/// Fields tracked while an item is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub dragged: WorkItem,
    pub source: Lane,
    pub hovered_lane: Option<Lane>,
    /// Insertion anchor: the dragged item lands right before it.
    pub hovered_item: Option<WorkItem>,
}

/// Everything the reorder engine needs from a finished drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    pub dragged: WorkItem,
    pub source: Lane,
    pub target: Lane,
    pub anchor: Option<WorkItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging(DragState),
}

impl DragSession {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }

    pub fn state(&self) -> Option<&DragState> {
        match self {
            Self::Dragging(state) => Some(state),
            Self::Idle => None,
        }
    }

    /// Begin dragging `item` out of `source`. Ignored if a drag is active.
    pub fn start(self, item: WorkItem, source: Lane) -> Self {
        match self {
            Self::Idle => {
                tracing::debug!(id = %item.id, %source, "drag start");
                Self::Dragging(DragState {
                    dragged: item,
                    source,
                    hovered_lane: None,
                    hovered_item: None,
                })
            }
            dragging => dragging,
        }
    }

    pub fn over_lane(self, lane: Lane) -> Self {
        self.map(|state| DragState {
            hovered_lane: Some(lane),
            ..state
        })
    }

    /// Hovering over the dragged item itself does not change the anchor.
    pub fn over_item(self, item: WorkItem) -> Self {
        self.map(|state| {
            if item.id == state.dragged.id {
                state
            } else {
                DragState {
                    hovered_item: Some(item),
                    ..state
                }
            }
        })
    }

    pub fn leave_lane(self) -> Self {
        self.map(|state| DragState {
            hovered_lane: None,
            ..state
        })
    }

    pub fn leave_item(self) -> Self {
        self.map(|state| DragState {
            hovered_item: None,
            ..state
        })
    }

    /// Consume the session into a drop on `target`.
    ///
    /// Always returns `Idle`; the event is `None` when nothing was dragged.
    pub fn drop_on(self, target: Lane) -> (Self, Option<DropEvent>) {
        match self {
            Self::Idle => (Self::Idle, None),
            Self::Dragging(state) => {
                tracing::debug!(
                    id = %state.dragged.id,
                    source = %state.source,
                    %target,
                    anchor = ?state.hovered_item.as_ref().map(|i| &i.id),
                    "drop"
                );
                let event = DropEvent {
                    dragged: state.dragged,
                    source: state.source,
                    target,
                    anchor: state.hovered_item,
                };
                (Self::Idle, Some(event))
            }
        }
    }

    /// End of the gesture, with or without a drop. Always lands in `Idle`.
    pub fn end(self) -> Self {
        Self::Idle
    }

    fn map(self, f: impl FnOnce(DragState) -> DragState) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Dragging(state) => Self::Dragging(f(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ItemId;

    fn item(id: &str) -> WorkItem {
        WorkItem::new(id, format!("item {id}"))
    }

    fn dragging(id: &str) -> DragSession {
        DragSession::Idle.start(item(id), Lane::Task)
    }

    #[test]
    fn start_from_idle_captures_item_and_source() {
        let session = DragSession::Idle.start(item("1"), Lane::Diligence);
        let state = session.state().unwrap();
        assert_eq!(state.dragged.id.as_str(), "1");
        assert_eq!(state.source, Lane::Diligence);
        assert_eq!(state.hovered_lane, None);
        assert_eq!(state.hovered_item, None);
    }

    #[test]
    fn start_while_dragging_is_ignored() {
        let session = dragging("1").start(item("2"), Lane::Coordination);
        let state = session.state().unwrap();
        assert_eq!(state.dragged.id.as_str(), "1");
        assert_eq!(state.source, Lane::Task);
    }

    #[test]
    fn over_lane_is_idempotent() {
        let once = dragging("1").over_lane(Lane::Coordination);
        let twice = once.clone().over_lane(Lane::Coordination);
        assert_eq!(once, twice);
        assert_eq!(twice.state().unwrap().hovered_lane, Some(Lane::Coordination));
    }

    #[test]
    fn over_self_keeps_previous_anchor() {
        let session = dragging("1").over_item(item("1"));
        assert_eq!(session.state().unwrap().hovered_item, None);

        let session = session.over_item(item("2")).over_item(item("1"));
        assert_eq!(
            session.state().unwrap().hovered_item.as_ref().map(|i| i.id.as_str()),
            Some("2")
        );
    }

    #[test]
    fn leave_clears_hover_fields() {
        let session = dragging("1")
            .over_lane(Lane::Diligence)
            .over_item(item("2"))
            .leave_item();
        let state = session.state().unwrap();
        assert_eq!(state.hovered_item, None);
        assert_eq!(state.hovered_lane, Some(Lane::Diligence));

        let session = session.leave_lane();
        assert_eq!(session.state().unwrap().hovered_lane, None);
    }

    #[test]
    fn transitions_on_idle_are_noops() {
        let session = DragSession::Idle
            .over_lane(Lane::Task)
            .over_item(item("1"))
            .leave_lane()
            .leave_item();
        assert_eq!(session, DragSession::Idle);
        let (session, event) = session.drop_on(Lane::Task);
        assert_eq!(session, DragSession::Idle);
        assert!(event.is_none());
    }

    #[test]
    fn drop_consumes_session_into_event() {
        let (session, event) = dragging("1")
            .over_lane(Lane::Coordination)
            .over_item(item("3"))
            .drop_on(Lane::Coordination);
        assert!(!session.is_dragging());
        let event = event.unwrap();
        assert_eq!(event.dragged.id.as_str(), "1");
        assert_eq!(event.source, Lane::Task);
        assert_eq!(event.target, Lane::Coordination);
        assert_eq!(event.anchor.map(|i| i.id), Some(ItemId::from("3")));
    }

    #[test]
    fn end_after_drop_is_safe() {
        let (session, _) = dragging("1").drop_on(Lane::Task);
        assert_eq!(session.end(), DragSession::Idle);
    }

    #[test]
    fn end_without_drop_cancels() {
        let session = dragging("1").over_item(item("2")).end();
        assert_eq!(session, DragSession::Idle);
    }
}
