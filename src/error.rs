//! Error types surfaced to the user by the task form.

/// Reasons a task form cannot be turned into a [`Task`](crate::domain::task::Task).
/// Checked before anything is written to storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Description is required")]
    MissingDescription,

    #[error("Deadline is required")]
    MissingDeadline,

    #[error("Specific Date is required")]
    MissingSpecificDate,

    #[error("Remind Date is required")]
    MissingRemindDate,

    #[error("Remind Time is required")]
    MissingRemindTime,

    /// Field text is present but does not parse.
    #[error("{field} has an invalid value {value:?} (expected {expected})")]
    Malformed {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}
