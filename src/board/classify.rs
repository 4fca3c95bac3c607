use serde::{Deserialize, Serialize};

use super::{ItemId, Lane, Lanes, WorkItem};

/// Keyword lists used to infer a lane from an item's notes.
///
/// Matching is a case-insensitive substring test. Coordination is checked
/// before diligence, so notes matching both land in Coordination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub coordination: Vec<String>,
    #[serde(default)]
    pub diligence: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            coordination: [
                "coordinación",
                "coordinacion",
                "coordinar",
                "coordination",
                "llamar",
                "llamada",
                "call",
            ]
            .map(String::from)
            .to_vec(),
            diligence: [
                "juzgado",
                "tribunal",
                "diligencia",
                "ir a",
                "court",
                "go to",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Vocabulary {
    /// Infer a lane from free-text notes, or `None` if no keyword matches.
    pub fn infer(&self, notes: &str) -> Option<Lane> {
        let notes = notes.to_lowercase();
        let hit = |words: &[String]| {
            words
                .iter()
                .filter(|w| !w.trim().is_empty())
                .any(|w| notes.contains(&w.to_lowercase()))
        };
        if hit(&self.coordination) {
            Some(Lane::Coordination)
        } else if hit(&self.diligence) {
            Some(Lane::Diligence)
        } else {
            None
        }
    }
}

/// Result of one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub lanes: Lanes,
    /// Items with no explicit lane and empty notes. They appear in no lane.
    pub omitted: Vec<ItemId>,
}

/// Pick the lane for a single item: explicit tag, then keyword inference,
/// then Task for anything with notes. `None` means the item is not shown.
pub fn lane_for(item: &WorkItem, vocabulary: &Vocabulary) -> Option<Lane> {
    if let Some(lane) = item.lane {
        return Some(lane);
    }
    if let Some(lane) = vocabulary.infer(&item.notes) {
        return Some(lane);
    }
    if item.notes.is_empty() {
        None
    } else {
        Some(Lane::Task)
    }
}

/// Partition items into the three lanes, each sorted by position.
///
/// Items without a position sort after positioned ones and keep their input
/// order. The input is never mutated.
pub fn classify(items: &[WorkItem], vocabulary: &Vocabulary) -> Classification {
    let mut out = Classification::default();
    for item in items {
        match lane_for(item, vocabulary) {
            Some(lane) => out.lanes.get_mut(lane).push(item.clone()),
            None => out.omitted.push(item.id.clone()),
        }
    }
    for lane in Lane::ALL {
        // sort_by_key is stable, so ties keep input order
        out.lanes
            .get_mut(lane)
            .sort_by_key(|item| (item.position.is_none(), item.position));
    }
    out
}
