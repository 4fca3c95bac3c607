pub mod classify;
pub mod drag;
pub mod reorder;
pub mod storage;
pub mod sync;

use serde::{Deserialize, Serialize};

use classify::{classify, Vocabulary};
use reorder::Reordered;

/// Stable identifier of a work item, unique within the store's collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three fixed buckets of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Task,
    Coordination,
    Diligence,
}

impl Lane {
    /// Lanes in display order, left to right.
    pub const ALL: [Lane; 3] = [Self::Task, Self::Coordination, Self::Diligence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Coordination => "coordination",
            Self::Diligence => "diligence",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Task => "Tasks",
            Self::Coordination => "Coordination",
            Self::Diligence => "Diligence",
        }
    }
}

impl std::str::FromStr for Lane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" | "tasks" => Ok(Self::Task),
            "coordination" => Ok(Self::Coordination),
            "diligence" => Ok(Self::Diligence),
            other => Err(format!(
                "unknown lane '{other}': use task, coordination, diligence"
            )),
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A case-derived work item as supplied by the case store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub label: String,
    #[serde(default)]
    pub case_number: String,
    /// Explicit lane tag. Authoritative over keyword inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<Lane>,
    /// 1-based slot within the lane. `None` until the board renumbers it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    /// Free-text notes (the markdown body, not serialized into frontmatter).
    #[serde(skip)]
    pub notes: String,
}

impl WorkItem {
    pub fn new(id: impl Into<ItemId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            case_number: String::new(),
            lane: None,
            position: None,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_case_number(mut self, case_number: impl Into<String>) -> Self {
        self.case_number = case_number.into();
        self
    }

    /// The lane/position pair to write back to the store.
    ///
    /// Returns `None` for items the board has not placed yet.
    pub fn patch(&self) -> Option<ItemPatch> {
        Some(ItemPatch {
            position: self.position?,
            lane: self.lane?,
        })
    }

    pub fn apply_patch(&mut self, patch: ItemPatch) {
        self.position = Some(patch.position);
        self.lane = Some(patch.lane);
    }
}

/// Full-value overwrite of an item's placement. Never an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub position: u32,
    pub lane: Lane,
}

/// Ordered contents of the three lanes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lanes {
    pub task: Vec<WorkItem>,
    pub coordination: Vec<WorkItem>,
    pub diligence: Vec<WorkItem>,
}

impl Lanes {
    pub fn get(&self, lane: Lane) -> &[WorkItem] {
        match lane {
            Lane::Task => &self.task,
            Lane::Coordination => &self.coordination,
            Lane::Diligence => &self.diligence,
        }
    }

    pub fn get_mut(&mut self, lane: Lane) -> &mut Vec<WorkItem> {
        match lane {
            Lane::Task => &mut self.task,
            Lane::Coordination => &mut self.coordination,
            Lane::Diligence => &mut self.diligence,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lane, &[WorkItem])> {
        Lane::ALL.into_iter().map(move |lane| (lane, self.get(lane)))
    }

    pub fn len(&self) -> usize {
        self.task.len() + self.coordination.len() + self.diligence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find which lane an item is in and its index.
    pub fn find(&self, id: &ItemId) -> Option<(Lane, usize)> {
        self.iter().find_map(|(lane, items)| {
            items
                .iter()
                .position(|item| &item.id == id)
                .map(|idx| (lane, idx))
        })
    }
}

/// Board state owned by the front end: the last item list the store supplied
/// plus the lanes derived from it.
#[derive(Debug, Clone)]
pub struct Board {
    pub lanes: Lanes,
    /// Items that landed in no lane (no tag, no notes).
    pub omitted: Vec<ItemId>,
    snapshot: Vec<WorkItem>,
    vocabulary: Vocabulary,
}

impl Board {
    pub fn new(items: Vec<WorkItem>, vocabulary: Vocabulary) -> Self {
        let classification = classify(&items, &vocabulary);
        Self {
            lanes: classification.lanes,
            omitted: classification.omitted,
            snapshot: items,
            vocabulary,
        }
    }

    /// Replace everything with a fresh item list from the source of record.
    pub fn reset(&mut self, items: Vec<WorkItem>) {
        let classification = classify(&items, &self.vocabulary);
        self.lanes = classification.lanes;
        self.omitted = classification.omitted;
        self.snapshot = items;
    }

    /// Re-derive the lanes from the current snapshot, discarding local edits.
    pub fn revert(&mut self) {
        let items = std::mem::take(&mut self.snapshot);
        self.reset(items);
    }

    /// Optimistically install a recomputed lane.
    pub fn apply(&mut self, update: &Reordered) {
        *self.lanes.get_mut(update.lane) = update.items.clone();
    }

    /// Fold confirmed placements into the snapshot.
    pub fn accept(&mut self, id: &ItemId, patch: ItemPatch) {
        if let Some(item) = self.snapshot.iter_mut().find(|item| &item.id == id) {
            item.apply_patch(patch);
        }
    }

    pub fn snapshot(&self) -> &[WorkItem] {
        &self.snapshot
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn item(&self, id: &ItemId) -> Option<&WorkItem> {
        let (lane, idx) = self.lanes.find(id)?;
        self.lanes.get(lane).get(idx)
    }
}
