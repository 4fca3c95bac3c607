use std::env;
use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, WrapErr};
use tracing_subscriber::EnvFilter;

use docket::app::App;
use docket::board::storage::{self, find_docket_dir, init_store, load_config, StorageError};
use docket::board::sync::{CommitOutcome, SyncCoordinator};
use docket::board::{Board, ItemId, Lane};
use docket::input::gesture::{parse_script, Gesture, GestureParseError};
use docket::store::{FileStore, StoreError};

#[derive(Parser)]
#[command(name = "docket", about = "Three-lane work-item board for case files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .docket/ store in the current directory
    Init {
        /// Board name (defaults to current directory name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Add a work item to the store
    Add {
        /// Display label
        label: String,
        /// Case number
        #[arg(short, long, default_value = "")]
        case: String,
        /// Free-text notes (used for lane inference)
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Explicit lane (task, coordination, diligence)
        #[arg(short, long)]
        lane: Option<Lane>,
    },
    /// Show the board, lane by lane
    List {
        /// Only show one lane
        #[arg(short, long)]
        lane: Option<Lane>,
    },
    /// Drag an item into a lane and save the new order
    Move {
        /// Item ID
        item_id: String,
        /// Target lane
        lane: Lane,
        /// Drop right before this item (default: end of lane)
        #[arg(short, long)]
        before: Option<String>,
    },
    /// Apply a gesture script (one gesture per line, `-` for stdin)
    Replay {
        /// Script path
        script: String,
    },
    /// Stream activity log to stdout (JSONL, one entry per line)
    Log,
}

#[tokio::main]
async fn main() {
    // Install color_eyre for unexpected panics/errors (developer bugs).
    let _ = color_eyre::install();
    init_tracing();
    let cli = Cli::parse();
    let cwd = match env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: cannot determine current directory: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init { name } => {
            let name = name.unwrap_or_else(|| {
                cwd.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("Docket")
                    .to_string()
            });
            cmd_init(&cwd, &name)
        }
        Command::Add {
            label,
            case,
            notes,
            lane,
        } => cmd_add(&cwd, &label, &case, &notes, lane),
        Command::List { lane } => cmd_list(&cwd, lane).await,
        Command::Move {
            item_id,
            lane,
            before,
        } => cmd_move(&cwd, &item_id, lane, before.as_deref()).await,
        Command::Replay { script } => cmd_replay(&cwd, &script).await,
        Command::Log => cmd_log(&cwd),
    };

    if let Err(e) = result {
        print_user_error(&e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `DOCKET_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCKET_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print a user-friendly error message, with actionable hints for known error types.
fn print_user_error(error: &color_eyre::Report) {
    let storage_err = error.downcast_ref::<StorageError>().or_else(|| {
        match error.downcast_ref::<StoreError>() {
            Some(StoreError::Storage(e)) => Some(e),
            _ => None,
        }
    });
    if let Some(storage_err) = storage_err {
        match storage_err {
            StorageError::NotFound(_) => {
                eprintln!("error: no docket store found in this directory.");
                eprintln!("  Run `docket init` to create one.");
            }
            StorageError::InvalidItem { path, reason } => {
                eprintln!(
                    "error: invalid item file: {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or(&path.to_string_lossy())
                );
                eprintln!("  {reason}");
            }
            StorageError::InvalidId(id) => {
                eprintln!("error: invalid item id: {id:?}");
                eprintln!("  Item ids may only contain letters, digits, '-' and '_'.");
            }
            StorageError::UnknownItem(id) => {
                eprintln!("error: item {id} is not in the store.");
            }
            StorageError::TomlDe(e) => {
                eprintln!("error: config file has invalid TOML syntax.");
                eprintln!("  {e}");
            }
            StorageError::TomlSer(e) => {
                eprintln!("error: failed to write store files.");
                eprintln!("  {e}");
            }
            StorageError::Io(e) => {
                eprintln!("error: could not read or write store files.");
                eprintln!("  {e}");
            }
        }
        return;
    }

    if let Some(parse_err) = error.downcast_ref::<GestureParseError>() {
        eprintln!("error: invalid gesture script, {parse_err}");
        eprintln!("  Gestures: start <id>, over-lane <lane>, over-item <id>, leave-lane, leave-item, drop <lane>, end");
        return;
    }

    // For eyre!() / bail!() messages, print the full error chain.
    eprintln!("error: {error:#}");
}

async fn open_app(cwd: &Path) -> color_eyre::Result<App<FileStore>> {
    let store = FileStore::discover(cwd)?;
    let config = load_config(store.dir())?;
    let ttl = Duration::from_secs(config.notifications.ttl_secs);
    Ok(App::open(store, config.vocabulary, ttl).await?)
}

fn cmd_init(cwd: &Path, name: &str) -> color_eyre::Result<()> {
    if cwd.join(".docket").exists() {
        bail!("Store already exists in this directory");
    }
    let docket_dir = init_store(cwd, name)?;
    println!("Initialized docket '{}' in {}", name, docket_dir.display());
    println!("Run `docket add \"Label\" --notes \"...\"` to add items.");
    Ok(())
}

fn cmd_add(
    cwd: &Path,
    label: &str,
    case: &str,
    notes: &str,
    lane: Option<Lane>,
) -> color_eyre::Result<()> {
    let docket_dir = find_docket_dir(cwd)?;
    let item = storage::add_item(&docket_dir, label.trim(), case.trim(), notes.trim(), lane)?;
    println!("Created {}: {}", item.id, item.label);
    Ok(())
}

async fn cmd_list(cwd: &Path, only: Option<Lane>) -> color_eyre::Result<()> {
    let store = FileStore::discover(cwd)?;
    let config = load_config(store.dir())?;
    let board = SyncCoordinator::new(store).load(config.vocabulary).await?;
    print!("{}", render_board(&board, only));
    Ok(())
}

/// Plain-text listing of the board.
fn render_board(board: &Board, only: Option<Lane>) -> String {
    let mut out = String::new();
    for (lane, items) in board.lanes.iter() {
        if only.is_some_and(|l| l != lane) {
            continue;
        }
        out.push_str(&format!("\n{} ({})\n", lane.title(), items.len()));
        out.push_str(&format!("{}\n", "─".repeat(40)));
        for item in items {
            let position = item
                .position
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into());
            let case = if item.case_number.is_empty() {
                String::new()
            } else {
                format!(" [{}]", item.case_number)
            };
            out.push_str(&format!(
                "  {:>3}. {:<5} {}{}\n",
                position,
                item.id.as_str(),
                item.label,
                case
            ));
        }
    }
    if only.is_none() && !board.omitted.is_empty() {
        out.push_str(&format!(
            "\n{} item{} hidden (no lane, no notes)\n",
            board.omitted.len(),
            if board.omitted.len() == 1 { "" } else { "s" }
        ));
    }
    out.push('\n');
    out
}

async fn cmd_move(
    cwd: &Path,
    item_id: &str,
    lane: Lane,
    before: Option<&str>,
) -> color_eyre::Result<()> {
    let mut app = open_app(cwd).await?;
    let id = ItemId::from(item_id);
    if app.board.item(&id).is_none() {
        if app.board.omitted.contains(&id) {
            bail!("Item '{item_id}' is hidden (no lane, no notes); tag it with a lane first");
        }
        bail!("Item '{item_id}' not found on the board");
    }
    let before = before.map(ItemId::from);
    if let Some(anchor) = &before {
        if app.board.lanes.get(lane).iter().all(|i| &i.id != anchor) {
            bail!("Item '{anchor}' is not in lane '{lane}'");
        }
    }

    let mut outcome = None;
    for gesture in Gesture::drag_to(id, lane, before) {
        if let Some(result) = app.dispatch(gesture).await {
            outcome = Some(result);
        }
    }
    let outcome = outcome.ok_or_else(|| eyre!("drop produced no update"))?;
    report(outcome)
}

async fn cmd_replay(cwd: &Path, script_path: &str) -> color_eyre::Result<()> {
    use std::io::Read;

    let script = if script_path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("failed to read script from stdin")?;
        buf
    } else {
        std::fs::read_to_string(script_path)
            .wrap_err_with(|| format!("failed to read {script_path}"))?
    };
    let gestures = parse_script(&script)?;

    let mut app = open_app(cwd).await?;
    let mut failed = 0;
    for gesture in gestures {
        if let Some(outcome) = app.dispatch(gesture).await {
            println!("{}", outcome.message());
            if !outcome.is_saved() {
                failed += 1;
            }
        }
    }
    if app.drag.is_dragging() {
        app.handle(Gesture::End);
        println!("Unfinished drag discarded");
    }
    if failed > 0 {
        bail!("{failed} drop{} could not be saved", if failed == 1 { "" } else { "s" });
    }
    Ok(())
}

fn report(outcome: CommitOutcome) -> color_eyre::Result<()> {
    match outcome {
        CommitOutcome::Saved { .. } => {
            println!("{}", outcome.message());
            Ok(())
        }
        CommitOutcome::RolledBack { .. } => Err(eyre!(outcome.message())),
    }
}

fn cmd_log(cwd: &Path) -> color_eyre::Result<()> {
    use std::io::{self, BufRead, BufWriter, ErrorKind, Write};

    let docket_dir = find_docket_dir(cwd)?;
    let log_path = docket_dir.join("activity.log");

    let file = match std::fs::File::open(&log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).wrap_err("failed to open activity.log"),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in io::BufReader::new(file).lines() {
        let line = line.wrap_err("error reading activity.log")?;
        match writeln!(out, "{line}") {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e).wrap_err("error writing to stdout"),
        }
    }
    // BufWriter drops flush errors silently; a closed pipe is a clean exit.
    if let Err(e) = out.flush() {
        if e.kind() != ErrorKind::BrokenPipe {
            return Err(e).wrap_err("error flushing stdout");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket::board::classify::Vocabulary;
    use docket::board::WorkItem;
    use std::fs;

    fn store_with(items: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let docket_dir = init_store(dir.path(), "Test").unwrap();
        for (label, notes) in items {
            storage::add_item(&docket_dir, label, "", notes, None).unwrap();
        }
        dir
    }

    fn lane_ids(dir: &Path, lane: Lane) -> Vec<String> {
        let docket_dir = find_docket_dir(dir).unwrap();
        let items = storage::load_items(&docket_dir).unwrap();
        let board = Board::new(items, Vocabulary::default());
        board
            .lanes
            .get(lane)
            .iter()
            .map(|i| i.id.to_string())
            .collect()
    }

    #[test]
    fn cmd_init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), "Test").unwrap();
        assert!(cmd_init(dir.path(), "Test").is_err());
    }

    #[test]
    fn cmd_add_without_store_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_add(dir.path(), "x", "", "", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cmd_move_reorders_and_persists() {
        let dir = store_with(&[
            ("Draft", "draft pleading"),
            ("Review", "review evidence"),
            ("Client", "llamar al cliente"),
        ]);
        cmd_move(dir.path(), "1", Lane::Coordination, Some("3"))
            .await
            .unwrap();
        assert_eq!(lane_ids(dir.path(), Lane::Coordination), vec!["1", "3"]);
        assert_eq!(lane_ids(dir.path(), Lane::Task), vec!["2"]);

        let docket_dir = find_docket_dir(dir.path()).unwrap();
        let items = storage::load_items(&docket_dir).unwrap();
        assert_eq!(items[1].position, Some(1));
    }

    #[tokio::test]
    async fn cmd_move_unknown_item_fails() {
        let dir = store_with(&[("Draft", "draft pleading")]);
        let err = cmd_move(dir.path(), "42", Lane::Task, None).await.unwrap_err();
        assert!(format!("{err}").contains("not found"));
    }

    #[tokio::test]
    async fn cmd_move_hidden_item_explains_why() {
        let dir = store_with(&[("Empty", "")]);
        let err = cmd_move(dir.path(), "1", Lane::Task, None).await.unwrap_err();
        assert!(format!("{err}").contains("hidden"));
    }

    #[tokio::test]
    async fn cmd_move_anchor_must_be_in_target_lane() {
        let dir = store_with(&[("Draft", "draft pleading"), ("Client", "llamar")]);
        let err = cmd_move(dir.path(), "2", Lane::Diligence, Some("1"))
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("not in lane"));
    }

    #[tokio::test]
    async fn cmd_replay_applies_script() {
        let dir = store_with(&[("Draft", "draft pleading"), ("Review", "review evidence")]);
        let script = dir.path().join("moves.txt");
        fs::write(&script, "start 2\nover-item 1\ndrop task\nend\n").unwrap();
        cmd_replay(dir.path(), script.to_str().unwrap()).await.unwrap();
        assert_eq!(lane_ids(dir.path(), Lane::Task), vec!["2", "1"]);
    }

    #[tokio::test]
    async fn cmd_replay_bad_script_is_parse_error() {
        let dir = store_with(&[]);
        let script = dir.path().join("bad.txt");
        fs::write(&script, "start 1\nwiggle\n").unwrap();
        let err = cmd_replay(dir.path(), script.to_str().unwrap())
            .await
            .unwrap_err();
        let parse_err = err.downcast_ref::<GestureParseError>().unwrap();
        assert_eq!(parse_err.line, 2);
    }

    #[test]
    fn render_board_lists_positions_and_hidden_count() {
        let board = Board::new(
            vec![
                WorkItem::new("1", "Draft")
                    .with_lane(Lane::Task)
                    .with_position(1)
                    .with_case_number("C-7"),
                WorkItem::new("2", "Empty"),
            ],
            Vocabulary::default(),
        );
        let text = render_board(&board, None);
        assert!(text.contains("Tasks (1)"));
        assert!(text.contains("1. 1     Draft [C-7]"));
        assert!(text.contains("1 item hidden"));

        let only = render_board(&board, Some(Lane::Diligence));
        assert!(only.contains("Diligence (0)"));
        assert!(!only.contains("Tasks"));
        assert!(!only.contains("hidden"));
    }

    #[test]
    fn cmd_log_no_store_returns_err() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_log(dir.path()).is_err());
    }

    #[test]
    fn cmd_log_no_activity_log_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        init_store(dir.path(), "Test").unwrap();
        assert!(cmd_log(dir.path()).is_ok());
    }

    #[test]
    fn cmd_log_non_utf8_content_returns_err() {
        let dir = tempfile::tempdir().unwrap();
        let docket_dir = init_store(dir.path(), "Test").unwrap();
        fs::write(docket_dir.join("activity.log"), b"\xFF\xFE{}\n").unwrap();
        let err = cmd_log(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("error reading activity.log"));
    }
}
