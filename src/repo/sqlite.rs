use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use super::Storage;

/// Key-value storage in a single SQLite table, one row per key.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open_default() -> Result<Self> {
        let path = default_db_path()?;
        Self::open(path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create db dir {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("failed to open db {}", path.display()))?;
        init_schema(&conn)?;
        info!(path = %path.display(), "opened task storage");
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO storage (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM storage WHERE key = ?1", params![key])
            .with_context(|| format!("failed to remove key {key}"))?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS storage (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);
"#,
    )
    .context("failed to initialize schema")?;
    Ok(())
}

pub fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("failed to resolve data dir")?;
    Ok(base.join("todo-tui"))
}

fn default_db_path() -> Result<PathBuf> {
    Ok(default_data_dir()?.join("storage.sqlite"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Task, TaskKind};
    use crate::repo::{TASKS_KEY, TaskRepository};

    #[test]
    fn sqlite_storage_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut storage = SqliteStorage::open(tmp.path()).unwrap();

        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "one").unwrap();
        storage.set_item("k", "two").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("two"));

        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn tasks_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.sqlite");

        let task = Task::new("Water plants", "balcony", TaskKind::Basic);
        {
            let mut repo = TaskRepository::new(SqliteStorage::open(&path).unwrap());
            repo.add(task.clone()).unwrap();
            repo.toggle_done(&task.id).unwrap();
        }

        let repo = TaskRepository::new(SqliteStorage::open(&path).unwrap());
        let loaded = repo.get_by_id(&task.id).unwrap();
        assert!(loaded.is_done);
        assert_eq!(loaded.title, task.title);

        let storage = SqliteStorage::open(&path).unwrap();
        assert!(storage.get_item(TASKS_KEY).unwrap().is_some());
    }
}
