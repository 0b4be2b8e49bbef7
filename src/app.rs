use std::time::{Duration, Instant};

use anyhow::Result;
use time::PrimitiveDateTime;
use tracing::{error, info};

use crate::domain::draft::{Field, TaskDraft};
use crate::domain::task::{Task, TaskId, TaskType, new_task_id};
use crate::repo::{Storage, TaskRepository};
use crate::usecase::reminder::ReminderScanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Form,
    Confirm,
}

/// Bulk deletions wait for an explicit yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    DeleteType(TaskType),
    DeleteAll,
}

impl PendingAction {
    pub fn prompt(self) -> String {
        match self {
            PendingAction::DeleteType(ty) => {
                format!("Delete all {} tasks? (y/n)", ty.label())
            }
            PendingAction::DeleteAll => "Delete ALL tasks? (y/n)".to_string(),
        }
    }
}

/// State of the add/edit form. When editing, the task keeps its id, done
/// flag and type.
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub draft: TaskDraft,
    pub focus: usize,
    editing: Option<(TaskId, bool)>,
}

impl TaskForm {
    pub fn adding(task_type: TaskType) -> Self {
        Self {
            draft: TaskDraft::new(task_type),
            focus: 0,
            editing: None,
        }
    }

    pub fn editing(task: &Task) -> Self {
        Self {
            draft: TaskDraft::from_task(task),
            focus: 0,
            editing: Some((task.id.clone(), task.is_done)),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn focused_field(&self) -> Field {
        let fields = self.draft.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.draft.fields().len();
    }

    pub fn focus_previous(&mut self) {
        let len = self.draft.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn cycle_type(&mut self, forward: bool) {
        if self.is_editing() {
            return;
        }
        self.draft.task_type = if forward {
            self.draft.task_type.next()
        } else {
            self.draft.task_type.previous()
        };
        self.focus = self.focus.min(self.draft.fields().len() - 1);
    }

    pub fn push_char(&mut self, c: char) {
        let field = self.focused_field();
        self.draft.value_mut(field).push(c);
    }

    pub fn pop_char(&mut self) {
        let field = self.focused_field();
        self.draft.value_mut(field).pop();
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub expires_at: Instant,
}

pub struct App<S: Storage> {
    repo: TaskRepository<S>,
    scanner: ReminderScanner,
    pub tasks: Vec<Task>,
    pub selected: usize,
    pub mode: InputMode,
    pub filter: Option<TaskType>,
    pub search: String,
    pub form: Option<TaskForm>,
    pub pending: Option<PendingAction>,
    pub status: Option<String>,
    pub toasts: Vec<Toast>,
    toast_ttl: Duration,
}

impl<S: Storage> App<S> {
    pub fn new(repo: TaskRepository<S>, toast_ttl: Duration) -> Self {
        let mut app = Self {
            repo,
            scanner: ReminderScanner::new(),
            tasks: Vec::new(),
            selected: 0,
            mode: InputMode::Normal,
            filter: None,
            search: String::new(),
            form: None,
            pending: None,
            status: None,
            toasts: Vec::new(),
            toast_ttl,
        };
        app.reload();
        app
    }

    /// Re-fetches the visible list: the type filter goes through storage,
    /// the title search is applied on top.
    pub fn reload(&mut self) {
        let tasks = match self.filter {
            Some(ty) => self.repo.list_by_type(ty),
            None => self.repo.list_all(),
        };
        let needle = self.search.trim().to_lowercase();
        self.tasks = if needle.is_empty() {
            tasks
        } else {
            tasks
                .into_iter()
                .filter(|t| t.title.to_lowercase().contains(&needle))
                .collect()
        };
        if self.selected >= self.tasks.len() {
            self.selected = self.tasks.len().saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        if !self.tasks.is_empty() {
            self.selected = (self.selected + 1).min(self.tasks.len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.get(self.selected)
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.selected_task().map(|t| t.id.clone())
    }

    pub fn toggle_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.repo.toggle_done(&id) {
            Ok(Some(task)) => {
                let state = if task.is_done { "completed" } else { "pending" };
                self.set_status(&format!("Marked \"{}\" {state}", task.title));
            }
            Ok(None) => self.set_status("Task no longer exists"),
            Err(err) => self.report(err),
        }
        self.reload();
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.repo.delete_by_id(&id) {
            Ok(Some(task)) => self.set_status(&format!("Deleted \"{}\"", task.title)),
            Ok(None) => self.set_status("Task no longer exists"),
            Err(err) => self.report(err),
        }
        self.reload();
    }

    pub fn start_add(&mut self) {
        let task_type = self.filter.unwrap_or(TaskType::Basic);
        self.form = Some(TaskForm::adding(task_type));
        self.mode = InputMode::Form;
        self.set_status("Fill in the task; Enter to save, Esc to cancel");
    }

    pub fn start_edit(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let Some(task) = self.repo.get_by_id(&id) else {
            self.set_status("Task no longer exists");
            self.reload();
            return;
        };
        self.form = Some(TaskForm::editing(&task));
        self.mode = InputMode::Form;
        self.set_status("Editing; Enter to save, Esc to cancel");
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.mode = InputMode::Normal;
        self.set_status("Canceled");
    }

    /// Validates the form and writes it. On a validation error the form
    /// stays open and nothing is written.
    pub fn submit_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let (id, is_done) = form
            .editing
            .clone()
            .unwrap_or_else(|| (new_task_id(), false));
        let editing = form.is_editing();
        let task = match form.draft.build(id, is_done) {
            Ok(task) => task,
            Err(err) => {
                self.set_status(&err.to_string());
                return;
            }
        };
        let title = task.title.clone();

        let outcome = if editing {
            self.repo.update(task).map(|previous| previous.is_some())
        } else {
            self.repo.add(task).map(|()| true)
        };
        match outcome {
            Ok(true) if editing => self.set_status(&format!("Updated \"{title}\"")),
            Ok(true) => {
                self.set_status(&format!("Added \"{title}\""));
                self.push_toast("Task added successfully".to_string());
            }
            Ok(false) => self.set_status("Task not found; nothing updated"),
            Err(err) => {
                self.report(err);
                return;
            }
        }

        self.form = None;
        self.mode = InputMode::Normal;
        self.reload();
        if !editing && !self.tasks.is_empty() {
            self.selected = self.tasks.len() - 1;
        }
    }

    /// all → basic → deadline → specific time → repetitive → all
    pub fn cycle_filter(&mut self) {
        self.filter = match self.filter {
            None => Some(TaskType::ALL[0]),
            Some(TaskType::Repetitive) => None,
            Some(ty) => Some(ty.next()),
        };
        self.selected = 0;
        self.reload();
        let label = self.filter.map_or("All", TaskType::label);
        self.set_status(&format!("Showing: {label}"));
    }

    pub fn start_search(&mut self) {
        self.mode = InputMode::Search;
        self.set_status("Search titles; Enter to keep, Esc to clear");
    }

    pub fn push_search(&mut self, c: char) {
        self.search.push(c);
        self.selected = 0;
        self.reload();
    }

    pub fn pop_search(&mut self) {
        self.search.pop();
        self.reload();
    }

    pub fn finish_search(&mut self, keep: bool) {
        if !keep {
            self.search.clear();
            self.reload();
        }
        self.mode = InputMode::Normal;
        self.status = None;
    }

    /// Asks to delete every task of the active filter type.
    pub fn request_delete_type(&mut self) {
        match self.filter {
            Some(ty) => self.request(PendingAction::DeleteType(ty)),
            None => self.set_status("Pick a type with 'f' first"),
        }
    }

    pub fn request_delete_all(&mut self) {
        self.request(PendingAction::DeleteAll);
    }

    fn request(&mut self, action: PendingAction) {
        self.pending = Some(action);
        self.mode = InputMode::Confirm;
        self.set_status(&action.prompt());
    }

    pub fn resolve_pending(&mut self, confirmed: bool) {
        self.mode = InputMode::Normal;
        let Some(action) = self.pending.take() else {
            return;
        };
        if !confirmed {
            self.set_status("Canceled");
            return;
        }
        let result: Result<String> = match action {
            PendingAction::DeleteType(ty) => self
                .repo
                .delete_by_type(ty)
                .map(|n| format!("Deleted {n} {} task(s)", ty.label())),
            PendingAction::DeleteAll => self
                .repo
                .delete_all()
                .map(|()| "Deleted all tasks".to_string()),
        };
        match result {
            Ok(msg) => {
                info!(?action, "bulk delete");
                self.set_status(&msg);
            }
            Err(err) => self.report(err),
        }
        self.reload();
    }

    /// Scans the whole collection, ignoring filters, and raises a toast for
    /// every newly due task. Returns how many fired.
    pub fn check_reminders(&mut self, now: PrimitiveDateTime) -> usize {
        let tasks = self.repo.list_all();
        let due = self.scanner.scan(&tasks, now);
        for reminder in &due {
            self.push_toast(reminder.to_string());
        }
        due.len()
    }

    pub fn push_toast(&mut self, message: String) {
        self.toasts.push(Toast {
            message,
            expires_at: Instant::now() + self.toast_ttl,
        });
    }

    pub fn prune_toasts(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status = Some(msg.to_string());
    }

    fn report(&mut self, err: anyhow::Error) {
        error!(error = ?err, "storage operation failed");
        self.set_status(&format!("Error: {err:#}"));
    }
}
