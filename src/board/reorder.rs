use super::drag::DropEvent;
use super::{ItemId, Lane, Lanes, WorkItem};

/// A recomputed lane and the items whose placement changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reordered {
    pub lane: Lane,
    /// Full lane contents, positions dense 1..N.
    pub items: Vec<WorkItem>,
    /// Subset of `items` whose lane or position differs from before the drop.
    pub changed: Vec<WorkItem>,
}

/// Lane updates produced by one drop: target first, then the source lane
/// when the item left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub updates: Vec<Reordered>,
}

impl DropPlan {
    /// Every changed item across all updates, in persistence order.
    pub fn changed(&self) -> impl Iterator<Item = &WorkItem> {
        self.updates.iter().flat_map(|u| u.changed.iter())
    }

    pub fn changed_count(&self) -> usize {
        self.updates.iter().map(|u| u.changed.len()).sum()
    }
}

/// Insert `dragged` into `target_items` before `anchor` (or at the end) and
/// renumber the whole lane.
pub fn reorder(
    dragged: &WorkItem,
    target: Lane,
    target_items: &[WorkItem],
    anchor: Option<&ItemId>,
) -> Reordered {
    let mut items: Vec<WorkItem> = target_items
        .iter()
        .filter(|item| item.id != dragged.id)
        .cloned()
        .collect();

    let slot = anchor.and_then(|anchor| items.iter().position(|item| &item.id == anchor));
    match slot {
        Some(idx) => items.insert(idx, dragged.clone()),
        None => items.push(dragged.clone()),
    }

    renumber(target, items)
}

/// Assign `position = index + 1` and `lane` to every item, recording which
/// ones actually moved.
pub fn renumber(lane: Lane, mut items: Vec<WorkItem>) -> Reordered {
    let mut changed = Vec::new();
    for (idx, item) in items.iter_mut().enumerate() {
        let position = idx as u32 + 1;
        let moved = item.position != Some(position) || item.lane != Some(lane);
        item.position = Some(position);
        item.lane = Some(lane);
        if moved {
            changed.push(item.clone());
        }
    }
    Reordered {
        lane,
        items,
        changed,
    }
}

/// Compute every lane update a drop implies.
pub fn plan_drop(lanes: &Lanes, event: &DropEvent) -> DropPlan {
    let target = reorder(
        &event.dragged,
        event.target,
        lanes.get(event.target),
        event.anchor.as_ref().map(|a| &a.id),
    );
    let mut updates = vec![target];

    if event.source != event.target {
        let remaining: Vec<WorkItem> = lanes
            .get(event.source)
            .iter()
            .filter(|item| item.id != event.dragged.id)
            .cloned()
            .collect();
        updates.push(renumber(event.source, remaining));
    }

    tracing::debug!(
        id = %event.dragged.id,
        lanes = updates.len(),
        changed = updates.iter().map(|u| u.changed.len()).sum::<usize>(),
        "planned drop"
    );
    DropPlan { updates }
}
