use crate::error::ValidationError;

use super::task::{Task, TaskId, TaskKind, TaskType};
use super::timefmt;

/// Editable text fields of the task form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Deadline,
    SpecificDate,
    RemindDate,
    RemindTime,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Description => "Description",
            Field::Deadline => "Deadline",
            Field::SpecificDate => "Specific Date",
            Field::RemindDate => "Remind Date",
            Field::RemindTime => "Remind Time",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Field::Title | Field::Description => "",
            Field::Deadline | Field::SpecificDate => "YYYY-MM-DD HH:MM",
            Field::RemindDate => "YYYY-MM-DD",
            Field::RemindTime => "HH:MM",
        }
    }
}

/// Raw form input for a task of one type. Nothing is parsed until
/// [`TaskDraft::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub deadline: String,
    pub specific_date: String,
    pub remind_date: String,
    pub remind_time: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self::new(TaskType::Basic)
    }
}

impl TaskDraft {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            title: String::new(),
            description: String::new(),
            deadline: String::new(),
            specific_date: String::new(),
            remind_date: String::new(),
            remind_time: String::new(),
        }
    }

    /// Prefills the form from an existing task for editing.
    pub fn from_task(task: &Task) -> Self {
        let mut draft = Self::new(task.task_type());
        draft.title = task.title.clone();
        draft.description = task.description.clone();
        match task.kind {
            TaskKind::Basic => {}
            TaskKind::WithDeadline { deadline } => {
                draft.deadline = timefmt::input_datetime(deadline);
            }
            TaskKind::WithSpecificTime { specific_date } => {
                draft.specific_date = timefmt::input_datetime(specific_date);
            }
            TaskKind::Repetitive {
                remind_date,
                remind_time,
            } => {
                draft.remind_date = timefmt::format_date(remind_date);
                draft.remind_time = timefmt::format_time(remind_time);
            }
        }
        draft
    }

    /// Fields shown for the current type, in display order.
    pub fn fields(&self) -> &'static [Field] {
        match self.task_type {
            TaskType::Basic => &[Field::Title, Field::Description],
            TaskType::WithDeadline => &[Field::Title, Field::Description, Field::Deadline],
            TaskType::WithSpecificTime => {
                &[Field::Title, Field::Description, Field::SpecificDate]
            }
            TaskType::Repetitive => &[
                Field::Title,
                Field::Description,
                Field::RemindDate,
                Field::RemindTime,
            ],
        }
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::Deadline => &self.deadline,
            Field::SpecificDate => &self.specific_date,
            Field::RemindDate => &self.remind_date,
            Field::RemindTime => &self.remind_time,
        }
    }

    pub fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Deadline => &mut self.deadline,
            Field::SpecificDate => &mut self.specific_date,
            Field::RemindDate => &mut self.remind_date,
            Field::RemindTime => &mut self.remind_time,
        }
    }

    /// Validates the input and produces a task with the given identity.
    /// Errors are reported in field order, first failure wins.
    pub fn build(&self, id: TaskId, is_done: bool) -> Result<Task, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::MissingDescription);
        }

        let kind = match self.task_type {
            TaskType::Basic => TaskKind::Basic,
            TaskType::WithDeadline => TaskKind::WithDeadline {
                deadline: input_datetime(
                    Field::Deadline,
                    &self.deadline,
                    ValidationError::MissingDeadline,
                )?,
            },
            TaskType::WithSpecificTime => TaskKind::WithSpecificTime {
                specific_date: input_datetime(
                    Field::SpecificDate,
                    &self.specific_date,
                    ValidationError::MissingSpecificDate,
                )?,
            },
            TaskType::Repetitive => {
                let remind_date = required(&self.remind_date, ValidationError::MissingRemindDate)?;
                let remind_date = timefmt::parse_date_strict(remind_date)
                    .ok_or_else(|| malformed(Field::RemindDate, remind_date))?;
                let remind_time = required(&self.remind_time, ValidationError::MissingRemindTime)?;
                let remind_time = timefmt::parse_time(remind_time)
                    .ok_or_else(|| malformed(Field::RemindTime, remind_time))?;
                TaskKind::Repetitive {
                    remind_date,
                    remind_time,
                }
            }
        };

        Ok(Task {
            id,
            title: title.to_owned(),
            description: description.to_owned(),
            is_done,
            kind,
        })
    }
}

fn required(raw: &str, missing: ValidationError) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(missing)
    } else {
        Ok(trimmed)
    }
}

fn input_datetime(
    field: Field,
    raw: &str,
    missing: ValidationError,
) -> Result<time::PrimitiveDateTime, ValidationError> {
    let trimmed = required(raw, missing)?;
    // Accept the space-separated form shown in the UI as well as ISO "T".
    let normalized = trimmed.replacen(' ', "T", 1);
    timefmt::parse_datetime(&normalized).ok_or_else(|| malformed(field, trimmed))
}

fn malformed(field: Field, value: &str) -> ValidationError {
    ValidationError::Malformed {
        field: field.label(),
        expected: field.hint(),
        value: value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    fn filled(task_type: TaskType) -> TaskDraft {
        let mut draft = TaskDraft::new(task_type);
        draft.title = "  Pay rent ".into();
        draft.description = "landlord".into();
        draft
    }

    #[test]
    fn basic_requires_title_and_description() {
        let mut draft = TaskDraft::new(TaskType::Basic);
        assert_eq!(
            draft.build("1".into(), false),
            Err(ValidationError::MissingTitle)
        );
        draft.title = "t".into();
        draft.description = "   ".into();
        assert_eq!(
            draft.build("1".into(), false),
            Err(ValidationError::MissingDescription)
        );
    }

    #[test]
    fn builds_trimmed_basic_task() {
        let task = filled(TaskType::Basic).build("1".into(), true).unwrap();
        assert_eq!(task.id, "1");
        assert_eq!(task.title, "Pay rent");
        assert!(task.is_done);
        assert_eq!(task.kind, TaskKind::Basic);
    }

    #[test]
    fn variant_fields_are_required() {
        assert_eq!(
            filled(TaskType::WithDeadline).build("1".into(), false),
            Err(ValidationError::MissingDeadline)
        );
        assert_eq!(
            filled(TaskType::WithSpecificTime).build("1".into(), false),
            Err(ValidationError::MissingSpecificDate)
        );
        let mut repetitive = filled(TaskType::Repetitive);
        assert_eq!(
            repetitive.build("1".into(), false),
            Err(ValidationError::MissingRemindDate)
        );
        repetitive.remind_date = "2024-05-01".into();
        assert_eq!(
            repetitive.build("1".into(), false),
            Err(ValidationError::MissingRemindTime)
        );
    }

    #[test]
    fn accepts_space_or_t_separated_datetime() {
        let mut draft = filled(TaskType::WithDeadline);
        draft.deadline = "2024-05-01 18:30".into();
        let task = draft.build("1".into(), false).unwrap();
        assert_eq!(
            task.kind,
            TaskKind::WithDeadline {
                deadline: datetime!(2024-05-01 18:30)
            }
        );

        draft.deadline = "2024-05-01T18:30".into();
        assert!(draft.build("1".into(), false).is_ok());
    }

    #[test]
    fn reports_malformed_input() {
        let mut draft = filled(TaskType::Repetitive);
        draft.remind_date = "2024-05-01".into();
        draft.remind_time = "half past".into();
        let err = draft.build("1".into(), false).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                field: "Remind Time",
                expected: "HH:MM",
                value: "half past".into(),
            }
        );
    }

    #[test]
    fn remind_date_must_be_a_whole_date() {
        let mut draft = filled(TaskType::Repetitive);
        draft.remind_date = "2024-05-01 nonsense".into();
        draft.remind_time = "09:00".into();
        assert_eq!(
            draft.build("1".into(), false),
            Err(ValidationError::Malformed {
                field: "Remind Date",
                expected: "YYYY-MM-DD",
                value: "2024-05-01 nonsense".into(),
            })
        );
    }

    #[test]
    fn editing_preserves_seconds_of_stored_datetimes() {
        let original = Task {
            id: "s".into(),
            title: "Call".into(),
            description: "dentist".into(),
            is_done: false,
            kind: TaskKind::WithSpecificTime {
                specific_date: datetime!(2024-05-01 14:30:45),
            },
        };
        let draft = TaskDraft::from_task(&original);
        assert_eq!(draft.specific_date, "2024-05-01 14:30:45");
        let rebuilt = draft.build(original.id.clone(), original.is_done).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn from_task_round_trips_through_build() {
        let original = Task {
            id: "r".into(),
            title: "Stretch".into(),
            description: "5 minutes".into(),
            is_done: true,
            kind: TaskKind::Repetitive {
                remind_date: date!(2024-05-01),
                remind_time: time!(7:15),
            },
        };
        let draft = TaskDraft::from_task(&original);
        assert_eq!(draft.remind_time, "07:15");
        assert_eq!(draft.fields().len(), 4);
        let rebuilt = draft.build(original.id.clone(), original.is_done).unwrap();
        assert_eq!(rebuilt, original);
    }
}
