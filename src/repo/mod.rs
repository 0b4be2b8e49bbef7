use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::task::{Task, TaskType};

pub mod memory;
pub mod sqlite;

/// Key under which the whole task collection is stored.
pub const TASKS_KEY: &str = "tasks";

/// Synchronous string key-value store, shaped after browser `localStorage`.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// One stored record. Records that no longer decode as a [`Task`] are kept
/// verbatim so that rewriting the collection never drops them.
#[derive(Debug, Clone)]
enum Entry {
    Task(Task),
    Undecoded(Value),
}

impl Entry {
    fn task(&self) -> Option<&Task> {
        match self {
            Entry::Task(task) => Some(task),
            Entry::Undecoded(_) => None,
        }
    }

    fn task_mut(&mut self) -> Option<&mut Task> {
        match self {
            Entry::Task(task) => Some(task),
            Entry::Undecoded(_) => None,
        }
    }

    fn is_type(&self, task_type: TaskType) -> bool {
        match self {
            Entry::Task(task) => task.task_type() == task_type,
            Entry::Undecoded(raw) => raw.get("type").and_then(Value::as_str) == Some(task_type.as_str()),
        }
    }
}

/// Task collection persisted as one JSON array under [`TASKS_KEY`].
///
/// Every operation reads the full collection, changes it and writes it back.
/// Reads never fail: a missing or unreadable blob, or one that is not a JSON
/// array, is an empty collection. A single record that does not decode is
/// skipped by reads but written back unchanged. Mutations referencing an
/// unknown id leave storage untouched and report `None`.
pub struct TaskRepository<S> {
    storage: S,
}

impl<S: Storage> TaskRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn list_all(&self) -> Vec<Task> {
        self.load()
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Task(task) => Some(task),
                Entry::Undecoded(_) => None,
            })
            .collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Task> {
        self.list_all().into_iter().find(|t| t.id == id)
    }

    pub fn list_by_type(&self, task_type: TaskType) -> Vec<Task> {
        self.list_all()
            .into_iter()
            .filter(|t| t.task_type() == task_type)
            .collect()
    }

    /// Appends `task`. The caller assigns its id.
    pub fn add(&mut self, task: Task) -> Result<()> {
        let mut entries = self.load();
        debug!(id = %task.id, kind = %task.task_type(), "adding task");
        entries.push(Entry::Task(task));
        self.save(&entries)
    }

    /// Replaces the stored record sharing `task.id`; returns the old record.
    pub fn update(&mut self, task: Task) -> Result<Option<Task>> {
        let mut entries = self.load();
        let Some(slot) = entries
            .iter_mut()
            .filter_map(Entry::task_mut)
            .find(|t| t.id == task.id)
        else {
            debug!(id = %task.id, "update skipped, no such task");
            return Ok(None);
        };
        let previous = std::mem::replace(slot, task);
        self.save(&entries)?;
        Ok(Some(previous))
    }

    pub fn delete_by_id(&mut self, id: &str) -> Result<Option<Task>> {
        let mut entries = self.load();
        let Some(pos) = entries
            .iter()
            .position(|e| e.task().is_some_and(|t| t.id == id))
        else {
            return Ok(None);
        };
        let Entry::Task(removed) = entries.remove(pos) else {
            return Ok(None);
        };
        self.save(&entries)?;
        Ok(Some(removed))
    }

    /// Removes every task of `task_type`; returns how many were removed.
    /// Undecodable records tagged with the same type go too.
    pub fn delete_by_type(&mut self, task_type: TaskType) -> Result<usize> {
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|e| !e.is_type(task_type));
        let removed = before - entries.len();
        if removed > 0 {
            self.save(&entries)?;
        }
        Ok(removed)
    }

    pub fn delete_all(&mut self) -> Result<()> {
        self.storage
            .remove_item(TASKS_KEY)
            .context("failed to clear stored tasks")
    }

    /// Flips `is_done` on the matching task; returns the updated record.
    pub fn toggle_done(&mut self, id: &str) -> Result<Option<Task>> {
        let mut entries = self.load();
        let Some(task) = entries
            .iter_mut()
            .filter_map(Entry::task_mut)
            .find(|t| t.id == id)
        else {
            return Ok(None);
        };
        task.is_done = !task.is_done;
        let toggled = task.clone();
        self.save(&entries)?;
        Ok(Some(toggled))
    }

    fn load(&self) -> Vec<Entry> {
        let raw = match self.storage.get_item(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = ?err, "failed to read stored tasks");
                return Vec::new();
            }
        };
        let records: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "stored tasks are malformed; treating as empty");
                return Vec::new();
            }
        };
        records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| match Task::deserialize(&record) {
                Ok(task) => Entry::Task(task),
                Err(err) => {
                    warn!(index = idx, error = %err, "skipping undecodable task record");
                    Entry::Undecoded(record)
                }
            })
            .collect()
    }

    fn save(&mut self, entries: &[Entry]) -> Result<()> {
        let records = entries
            .iter()
            .map(|entry| match entry {
                Entry::Task(task) => serde_json::to_value(task),
                Entry::Undecoded(raw) => Ok(raw.clone()),
            })
            .collect::<serde_json::Result<Vec<Value>>>()
            .context("failed to serialize tasks")?;
        let raw = serde_json::to_string(&records).context("failed to serialize tasks")?;
        self.storage
            .set_item(TASKS_KEY, &raw)
            .context("failed to write stored tasks")
    }
}
