use std::collections::HashSet;
use std::fmt;

use time::PrimitiveDateTime;
use tracing::info;

use crate::domain::task::{Task, TaskId};

/// A due task, ready to be shown as a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub description: String,
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reminder: {} ({})", self.title, self.description)
    }
}

/// Tracks which tasks already produced a reminder.
///
/// The notified set lives as long as the scanner. It is not persisted, so
/// a task that is still due after a restart is reported again.
#[derive(Debug, Default)]
pub struct ReminderScanner {
    notified: HashSet<TaskId>,
}

impl ReminderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reminder for every task whose moment is at or before `now`
    /// and that has not been reported yet, in collection order.
    pub fn scan(&mut self, tasks: &[Task], now: PrimitiveDateTime) -> Vec<Reminder> {
        let mut due = Vec::new();
        for task in tasks {
            if !should_remind(task, now) || self.notified.contains(&task.id) {
                continue;
            }
            self.notified.insert(task.id.clone());
            info!(id = %task.id, kind = %task.task_type(), "reminder due");
            due.push(Reminder {
                task_id: task.id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
            });
        }
        due
    }
}

/// Decide whether a task's scheduled moment has arrived.
/// Basic and deadline tasks never remind.
pub fn should_remind(task: &Task, now: PrimitiveDateTime) -> bool {
    task.reminder_moment().is_some_and(|at| at <= now)
}
