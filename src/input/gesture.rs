use crate::board::{ItemId, Lane};

/// Pointer events that drive a drag session, by item id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    Start(ItemId),
    OverLane(Lane),
    OverItem(ItemId),
    LeaveLane,
    LeaveItem,
    Drop(Lane),
    End,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct GestureParseError {
    pub line: usize,
    pub message: String,
}

impl Gesture {
    /// The event sequence of dragging `id` into `lane`, optionally dropping it
    /// right before `before`.
    pub fn drag_to(id: ItemId, lane: Lane, before: Option<ItemId>) -> Vec<Gesture> {
        let mut gestures = vec![Gesture::Start(id), Gesture::OverLane(lane)];
        if let Some(anchor) = before {
            gestures.push(Gesture::OverItem(anchor));
        }
        gestures.push(Gesture::Drop(lane));
        gestures.push(Gesture::End);
        gestures
    }
}

impl std::str::FromStr for Gesture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().ok_or("empty gesture")?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("too many arguments for '{verb}'"));
        }
        let need = |what: &str| arg.ok_or_else(|| format!("'{verb}' needs {what}"));
        let lane = || need("a lane").and_then(|a| a.parse::<Lane>());
        let bare = |gesture: Gesture| match arg {
            Some(_) => Err(format!("'{verb}' takes no arguments")),
            None => Ok(gesture),
        };

        match verb.to_lowercase().as_str() {
            "start" => Ok(Self::Start(need("an item id")?.into())),
            "over-lane" => Ok(Self::OverLane(lane()?)),
            "over-item" => Ok(Self::OverItem(need("an item id")?.into())),
            "leave-lane" => bare(Self::LeaveLane),
            "leave-item" => bare(Self::LeaveItem),
            "drop" => Ok(Self::Drop(lane()?)),
            "end" => bare(Self::End),
            other => Err(format!("unknown gesture '{other}'")),
        }
    }
}

/// Parse a gesture script: one gesture per line, `#` starts a comment.
pub fn parse_script(script: &str) -> Result<Vec<Gesture>, GestureParseError> {
    script
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.split('#').next().unwrap_or("").trim();
            (!line.is_empty()).then_some((idx + 1, line))
        })
        .map(|(line_no, line)| {
            line.parse::<Gesture>().map_err(|message| GestureParseError {
                line: line_no,
                message,
            })
        })
        .collect()
}
