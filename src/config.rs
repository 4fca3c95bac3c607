use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::classify::Vocabulary;

/// Contents of `.docket/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardSection,
    #[serde(default)]
    pub vocabulary: Vocabulary,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    pub name: String,
    #[serde(default = "default_next_item_id")]
    pub next_item_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_next_item_id() -> u32 {
    1
}

/// How long transient notices stay on screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    3
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl BoardConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            board: BoardSection {
                name: name.into(),
                next_item_id: default_next_item_id(),
                created_at: Some(Utc::now()),
            },
            vocabulary: Vocabulary::default(),
            notifications: NotificationConfig::default(),
        }
    }

    /// Hand out the next item id and bump the counter.
    pub fn next_item_id(&mut self) -> String {
        let n = self.board.next_item_id;
        self.board.next_item_id += 1;
        n.to_string()
    }
}
