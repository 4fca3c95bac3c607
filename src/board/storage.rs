use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{ItemId, ItemPatch, Lane, WorkItem};
use crate::config::BoardConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error(".docket directory not found (walk up from {0})")]
    NotFound(PathBuf),
    #[error("invalid item file {path}: {reason}")]
    InvalidItem { path: PathBuf, reason: String },
    #[error("invalid item id: {0:?} (must match [A-Za-z0-9_-]+)")]
    InvalidId(String),
    #[error("no item with id {0}")]
    UnknownItem(ItemId),
}

/// Item ids double as file names, so only a safe subset is allowed.
fn validate_item_id(id: &str) -> Result<(), StorageError> {
    if id.is_empty()
        || !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn items_dir(docket_dir: &Path) -> PathBuf {
    docket_dir.join("items")
}

fn item_path(docket_dir: &Path, id: &str) -> Result<PathBuf, StorageError> {
    validate_item_id(id)?;
    Ok(items_dir(docket_dir).join(format!("{id}.md")))
}

/// Find the .docket directory by walking up from `start`.
pub fn find_docket_dir(start: &Path) -> Result<PathBuf, StorageError> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(".docket");
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !dir.pop() {
            return Err(StorageError::NotFound(start.to_path_buf()));
        }
    }
}

/// Initialize a new .docket directory with the default config.
pub fn init_store(root: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let docket_dir = root.join(".docket");
    fs::create_dir_all(items_dir(&docket_dir))?;
    save_config(&docket_dir, &BoardConfig::new(name))?;
    Ok(docket_dir)
}

pub fn load_config(docket_dir: &Path) -> Result<BoardConfig, StorageError> {
    let config_str = fs::read_to_string(docket_dir.join("config.toml"))?;
    Ok(toml::from_str(&config_str)?)
}

pub fn save_config(docket_dir: &Path, config: &BoardConfig) -> Result<(), StorageError> {
    let config_str = toml::to_string_pretty(config)?;
    fs::write(docket_dir.join("config.toml"), config_str)?;
    Ok(())
}

/// Load every item in the store.
///
/// Unreadable item files are skipped with a warning so one bad file never
/// hides the rest of the board. A file must be named after its item id, which
/// also keeps ids unique.
pub fn load_items(docket_dir: &Path) -> Result<Vec<WorkItem>, StorageError> {
    let dir = items_dir(docket_dir);
    let mut items = Vec::new();
    if !dir.exists() {
        return Ok(items);
    }
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        match load_item(&path) {
            Ok(item) => items.push(item),
            Err(e) => tracing::warn!(path = %path.display(), "skipping invalid item: {e}"),
        }
    }
    // Numeric ids sort naturally when shorter ids come first.
    items.sort_by(|a, b| {
        let (a, b) = (a.id.as_str(), b.id.as_str());
        a.len().cmp(&b.len()).then(a.cmp(b))
    });
    Ok(items)
}

/// Create a new item with the next free id.
pub fn add_item(
    docket_dir: &Path,
    label: &str,
    case_number: &str,
    notes: &str,
    lane: Option<Lane>,
) -> Result<WorkItem, StorageError> {
    let mut config = load_config(docket_dir)?;
    let id = config.next_item_id();
    let mut item = WorkItem::new(id, label)
        .with_case_number(case_number)
        .with_notes(notes);
    item.lane = lane;

    write_item(docket_dir, &item)?;
    save_config(docket_dir, &config)?;
    append_activity(docket_dir, "add", &item.id, &[("label", label)]);
    Ok(item)
}

/// Overwrite the lane and position of a stored item.
pub fn patch_item(
    docket_dir: &Path,
    id: &ItemId,
    patch: ItemPatch,
) -> Result<WorkItem, StorageError> {
    let path = item_path(docket_dir, id.as_str())?;
    if !path.exists() {
        return Err(StorageError::UnknownItem(id.clone()));
    }
    let mut item = load_item(&path)?;
    item.apply_patch(patch);
    write_item(docket_dir, &item)?;

    let position = patch.position.to_string();
    append_activity(
        docket_dir,
        "move",
        id,
        &[("lane", patch.lane.as_str()), ("position", &position)],
    );
    Ok(item)
}

pub fn write_item(docket_dir: &Path, item: &WorkItem) -> Result<(), StorageError> {
    let path = item_path(docket_dir, item.id.as_str())?;
    fs::create_dir_all(items_dir(docket_dir))?;
    let content = serialize_item(item)?;
    let needs_write = match fs::read_to_string(&path) {
        Ok(existing) => existing.replace("\r\n", "\n") != content,
        Err(_) => true,
    };
    if needs_write {
        fs::write(&path, content)?;
    }
    Ok(())
}

/// Parse an item .md file with TOML frontmatter. The body holds the notes.
fn load_item(path: &Path) -> Result<WorkItem, StorageError> {
    let content = fs::read_to_string(path)?;
    let (frontmatter, body) =
        parse_frontmatter(&content).ok_or_else(|| StorageError::InvalidItem {
            path: path.to_path_buf(),
            reason: "missing or invalid TOML frontmatter".into(),
        })?;

    let mut item: WorkItem =
        toml::from_str(&frontmatter).map_err(|e| StorageError::InvalidItem {
            path: path.to_path_buf(),
            reason: format!("invalid TOML: {e}"),
        })?;
    validate_item_id(item.id.as_str()).map_err(|_| StorageError::InvalidItem {
        path: path.to_path_buf(),
        reason: format!("unsafe item id: {:?}", item.id.as_str()),
    })?;
    // Writes address items by `<id>.md`, so a mismatched name could never be saved.
    let stem = path.file_stem().and_then(|s| s.to_str());
    if stem != Some(item.id.as_str()) {
        return Err(StorageError::InvalidItem {
            path: path.to_path_buf(),
            reason: format!("file name does not match item id {:?}", item.id.as_str()),
        });
    }
    if item.position == Some(0) {
        item.position = None;
    }
    item.notes = body;
    Ok(item)
}

fn serialize_item(item: &WorkItem) -> Result<String, StorageError> {
    let frontmatter = toml::to_string(item)?;
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&frontmatter);
    if !frontmatter.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    if !item.notes.is_empty() {
        out.push('\n');
        out.push_str(&item.notes);
        if !item.notes.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse `---` delimited TOML frontmatter from a string.
/// Returns (frontmatter, body).
///
/// Normalizes `\r\n` to `\n` so files edited on Windows parse correctly.
fn parse_frontmatter(content: &str) -> Option<(String, String)> {
    let content = content.replace("\r\n", "\n");
    let content = content.trim_start();
    let after_first = content.strip_prefix("---")?;
    let after_first = after_first.strip_prefix('\n').unwrap_or(after_first);
    let end = after_first.find("\n---")?;
    let frontmatter = after_first[..end].to_string();
    let rest = &after_first[end + 4..];
    let body = rest.trim().to_string();
    Some((frontmatter, body))
}

// ---------------------------------------------------------------------------
// Activity log (.docket/activity.log, append-only JSONL)
// ---------------------------------------------------------------------------

/// Append a single JSONL event to `.docket/activity.log`.
///
/// Best-effort: an I/O error never interrupts the store operation.
pub fn append_activity(docket_dir: &Path, action: &str, id: &ItemId, extras: &[(&str, &str)]) {
    if let Err(e) = try_append_activity(docket_dir, action, id, extras) {
        tracing::debug!("activity log write failed: {e}");
    }
}

fn try_append_activity(
    docket_dir: &Path,
    action: &str,
    id: &ItemId,
    extras: &[(&str, &str)],
) -> std::io::Result<()> {
    use std::io::Write;

    let mut entry = serde_json::Map::new();
    entry.insert(
        "ts".into(),
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string().into(),
    );
    entry.insert("action".into(), action.into());
    entry.insert("id".into(), id.as_str().into());
    for (k, v) in extras {
        entry.insert((*k).to_string(), (*v).into());
    }
    let line = serde_json::Value::Object(entry).to_string();

    let mut file = fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(docket_dir.join("activity.log"))?;
    writeln!(file, "{line}")?;
    Ok(())
}
