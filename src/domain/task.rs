use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

use super::timefmt;

/// Opaque task identifier. New tasks get a UUID v4, but any string loaded
/// from storage is accepted.
pub type TaskId = String;

pub fn new_task_id() -> TaskId {
    Uuid::new_v4().to_string()
}

/// A stored to-do item. Serializes to a flat record whose `type` field
/// selects which of the variant fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    #[serde(rename = "isDone")]
    pub is_done: bool,
    #[serde(flatten)]
    pub kind: TaskKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskKind {
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "with-deadline")]
    WithDeadline {
        #[serde(with = "timefmt::datetime")]
        deadline: PrimitiveDateTime,
    },
    #[serde(rename = "with-specefic-time")]
    WithSpecificTime {
        #[serde(rename = "specificDate", with = "timefmt::datetime")]
        specific_date: PrimitiveDateTime,
    },
    #[serde(rename = "repetetive")]
    Repetitive {
        #[serde(rename = "remindDate", with = "timefmt::date")]
        remind_date: Date,
        #[serde(rename = "remindTime", with = "timefmt::time_of_day")]
        remind_time: Time,
    },
}

/// Fieldless mirror of the `type` discriminant, used for filtering and bulk
/// deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Basic,
    WithDeadline,
    WithSpecificTime,
    Repetitive,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Basic,
        TaskType::WithDeadline,
        TaskType::WithSpecificTime,
        TaskType::Repetitive,
    ];

    /// The discriminant string as written to storage.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Basic => "basic",
            TaskType::WithDeadline => "with-deadline",
            TaskType::WithSpecificTime => "with-specefic-time",
            TaskType::Repetitive => "repetetive",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskType::Basic => "Basic",
            TaskType::WithDeadline => "Deadline",
            TaskType::WithSpecificTime => "Specific Time",
            TaskType::Repetitive => "Repetitive",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Task {
    pub fn new(title: impl Into<String>, description: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: new_task_id(),
            title: title.into(),
            description: description.into(),
            is_done: false,
            kind,
        }
    }

    pub fn task_type(&self) -> TaskType {
        match self.kind {
            TaskKind::Basic => TaskType::Basic,
            TaskKind::WithDeadline { .. } => TaskType::WithDeadline,
            TaskKind::WithSpecificTime { .. } => TaskType::WithSpecificTime,
            TaskKind::Repetitive { .. } => TaskType::Repetitive,
        }
    }

    /// The local moment at which this task becomes due for a reminder.
    /// Only specific-time and repetitive tasks carry one; a repetitive
    /// reminder fires at the whole minute of `remind_time`.
    pub fn reminder_moment(&self) -> Option<PrimitiveDateTime> {
        match self.kind {
            TaskKind::Repetitive {
                remind_date,
                remind_time,
            } => {
                let at = Time::from_hms(remind_time.hour(), remind_time.minute(), 0)
                    .unwrap_or(remind_time);
                Some(PrimitiveDateTime::new(remind_date, at))
            }
            TaskKind::WithSpecificTime { specific_date } => Some(specific_date),
            TaskKind::Basic | TaskKind::WithDeadline { .. } => None,
        }
    }
}
