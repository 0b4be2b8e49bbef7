mod app;
mod domain;
mod error;
mod repo;
mod ui;
mod usecase;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use time::macros::time;
use time::Duration as TimeDuration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use domain::task::{Task, TaskKind};
use repo::memory::MemoryStorage;
use repo::sqlite::{SqliteStorage, default_data_dir};
use repo::{Storage, TaskRepository};
use usecase::clock::LocalClock;

#[derive(Parser, Debug)]
#[command(author, version, about = "todo — terminal to-do list with reminders", long_about = None)]
struct Args {
    /// Tick interval of render loop in milliseconds
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Seconds between reminder checks
    #[arg(long, default_value_t = 60)]
    reminder_secs: u64,

    /// Seconds a notification stays on screen
    #[arg(long, default_value_t = 8)]
    toast_secs: u64,

    /// Start with demo tasks (implies in-memory store)
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Use in-memory store instead of SQLite
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Path to SQLite DB file (default: OS data dir)
    #[arg(long, env = "TODO_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log file (default: OS data dir); filter with RUST_LOG
    #[arg(long, env = "TODO_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    // Must run before the runtime spawns worker threads.
    let clock = LocalClock::detect();

    let log_path = match args.log_file.clone() {
        Some(path) => path,
        None => default_data_dir()?.join("todo-tui.log"),
    };
    init_logging(&log_path)?;

    let storage: Box<dyn Storage> = if args.demo || args.memory {
        Box::new(MemoryStorage::default())
    } else if let Some(path) = args.db_path.as_ref() {
        Box::new(SqliteStorage::open(path)?)
    } else {
        Box::new(SqliteStorage::open_default()?)
    };
    let mut repo = TaskRepository::new(storage);
    if args.demo {
        for task in seed_tasks(&clock) {
            repo.add(task)?;
        }
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start timer runtime")?;
    info!(
        tasks = repo.list_all().len(),
        reminder_secs = args.reminder_secs,
        "starting"
    );

    let app = App::new(repo, Duration::from_secs(args.toast_secs));
    let timing = ui::Timing {
        tick_rate: Duration::from_millis(args.tick_ms),
        reminder_period: Duration::from_secs(args.reminder_secs.max(1)),
    };
    let res = ui::run(app, clock, timing, runtime.handle());
    info!("exiting");
    res
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    // The terminal belongs to the TUI, so logs go to a file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("todo_tui=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn seed_tasks(clock: &LocalClock) -> Vec<Task> {
    let now = clock.now();
    let soon = now + TimeDuration::minutes(1);
    vec![
        Task::new("Write documentation", "README and usage notes", TaskKind::Basic),
        Task::new(
            "Submit report",
            "quarterly numbers",
            TaskKind::WithDeadline {
                deadline: now + TimeDuration::days(2),
            },
        ),
        Task::new(
            "Team call",
            "weekly sync",
            TaskKind::WithSpecificTime { specific_date: soon },
        ),
        Task::new(
            "Stretch",
            "five minutes away from the desk",
            TaskKind::Repetitive {
                remind_date: now.date(),
                remind_time: time!(9:00),
            },
        ),
    ]
}
