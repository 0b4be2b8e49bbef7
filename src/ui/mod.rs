use std::io::{Stdout, stdout};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::runtime::Handle;

use crate::app::{App, InputMode, TaskForm};
use crate::domain::task::{Task, TaskKind};
use crate::domain::timefmt;
use crate::repo::Storage;
use crate::usecase::clock::LocalClock;
use crate::usecase::ticker::PeriodicTimer;

pub struct Timing {
    pub tick_rate: Duration,
    pub reminder_period: Duration,
}

pub fn run<S: Storage>(
    mut app: App<S>,
    clock: LocalClock,
    timing: Timing,
    runtime: &Handle,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Lives exactly as long as this view; dropping it stops the reminders.
    let (tx, reminder_ticks) = mpsc::channel();
    let _reminder_timer = PeriodicTimer::start(runtime, timing.reminder_period, tx);

    let mut last_tick = Instant::now();
    let res = loop {
        while reminder_ticks.try_recv().is_ok() {
            app.check_reminders(clock.now());
        }
        app.prune_toasts(Instant::now());
        terminal.draw(|f| draw(f, &app))?;

        let timeout = timing
            .tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(&mut app, key.code)?
        {
            break Ok(());
        }

        if last_tick.elapsed() >= timing.tick_rate {
            last_tick = Instant::now();
        }
    };

    cleanup_terminal(&mut terminal)?;
    res
}

fn handle_key<S: Storage>(app: &mut App<S>, code: KeyCode) -> Result<bool> {
    match app.mode {
        InputMode::Normal => match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => app.select_next(),
            KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
            KeyCode::Char('a') | KeyCode::Char('n') => app.start_add(),
            KeyCode::Char('e') => app.start_edit(),
            KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
            KeyCode::Char('f') => app.cycle_filter(),
            KeyCode::Char('/') => app.start_search(),
            KeyCode::Char('x') => app.request_delete_type(),
            KeyCode::Char('X') => app.request_delete_all(),
            KeyCode::Char('r') => {
                app.reload();
                app.set_status("Reloaded");
            }
            _ => {}
        },
        InputMode::Search => match code {
            KeyCode::Esc => app.finish_search(false),
            KeyCode::Enter => app.finish_search(true),
            KeyCode::Backspace => app.pop_search(),
            KeyCode::Char(c) => app.push_search(c),
            _ => {}
        },
        InputMode::Confirm => match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.resolve_pending(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.resolve_pending(false),
            _ => {}
        },
        InputMode::Form => match code {
            KeyCode::Esc => app.cancel_form(),
            KeyCode::Enter => app.submit_form(),
            code => {
                if let Some(form) = app.form.as_mut() {
                    match code {
                        KeyCode::Tab | KeyCode::Down => form.focus_next(),
                        KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
                        KeyCode::Left => form.cycle_type(false),
                        KeyCode::Right => form.cycle_type(true),
                        KeyCode::Backspace => form.pop_char(),
                        KeyCode::Char(c) => form.push_char(c),
                        _ => {}
                    }
                }
            }
        },
    }

    Ok(false)
}

fn draw<S: Storage>(f: &mut ratatui::Frame, app: &App<S>) {
    let size = f.area();
    let toast_height = if app.toasts.is_empty() {
        0
    } else {
        app.toasts.len() as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(toast_height),
            Constraint::Length(3),
        ])
        .split(size);

    f.render_widget(render_header(app), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let mut list_state = ListState::default();
    if !app.tasks.is_empty() {
        list_state.select(Some(app.selected));
    }
    let list = render_list(&app.tasks, app.selected);
    f.render_stateful_widget(list, body[0], &mut list_state);
    f.render_widget(render_detail(app.selected_task()), body[1]);

    if !app.toasts.is_empty() {
        f.render_widget(render_toasts(app), chunks[2]);
    }
    f.render_widget(render_footer(app), chunks[3]);

    if let (InputMode::Form, Some(form)) = (app.mode, app.form.as_ref()) {
        let area = centered(size, 60, form.draft.fields().len() as u16 + 6);
        f.render_widget(Clear, area);
        f.render_widget(render_form(form), area);
    }
}

fn render_header<S: Storage>(app: &App<S>) -> Paragraph<'static> {
    let total = app.tasks.len();
    let done = app.tasks.iter().filter(|t| t.is_done).count();
    let summary = format!("Open: {} / Shown: {}", total.saturating_sub(done), total);
    let filter = app.filter.map_or("All", |t| t.label());
    let mut spans = vec![
        Span::styled("todo", Style::default().fg(Color::Cyan)),
        Span::raw("  |  "),
        Span::styled(summary, Style::default().fg(Color::Yellow)),
        Span::raw("  |  "),
        Span::styled(format!("Type: {filter}"), Style::default().fg(Color::Magenta)),
    ];
    if !app.search.is_empty() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("Search: {}", app.search),
            Style::default().fg(Color::Green),
        ));
    }
    Paragraph::new(Line::from(spans))
        .block(Block::default().title("Overview").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_list(tasks: &[Task], selected: usize) -> List<'_> {
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let symbol = if task.is_done { "✔" } else { "•" };
            let mut line = vec![
                Span::raw(format!(" {symbol} {}", task.title)),
                Span::styled(
                    format!("  [{}]", task.task_type().label()),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if task.is_done {
                line.push(Span::styled("  done", Style::default().fg(Color::Green)));
            }

            let style = if idx == selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else if task.is_done {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(line)).style(style)
        })
        .collect();

    List::new(items)
        .block(
            Block::default()
                .title("Tasks (j/k move ; a add ; e edit ; Space toggle ; d delete ; f type ; / search)")
                .borders(Borders::ALL),
        )
        .highlight_symbol("➤ ")
}

fn render_detail(task: Option<&Task>) -> Paragraph<'static> {
    let block = Block::default().title("Task Details").borders(Borders::ALL);
    let Some(task) = task else {
        return Paragraph::new("No task selected").block(block);
    };

    let label = Style::default().fg(Color::Yellow);
    let row = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("{name}: "), label), Span::raw(value)])
    };
    let status = if task.is_done { "Completed" } else { "Pending" };
    let mut lines = vec![
        row("Title", task.title.clone()),
        row("Description", task.description.clone()),
        row("Status", status.to_string()),
        row("Type", task.task_type().to_string()),
    ];
    match task.kind {
        TaskKind::Basic => {}
        TaskKind::WithDeadline { deadline } => {
            lines.push(row("Deadline", timefmt::display_datetime(deadline)));
        }
        TaskKind::WithSpecificTime { specific_date } => {
            lines.push(row("Specific Date", timefmt::display_datetime(specific_date)));
        }
        TaskKind::Repetitive {
            remind_date,
            remind_time,
        } => {
            lines.push(row("Reminder Date", timefmt::format_date(remind_date)));
            lines.push(row("Reminder Time", timefmt::format_time(remind_time)));
        }
    }

    Paragraph::new(lines).block(block).wrap(Wrap { trim: false })
}

fn render_toasts<S: Storage>(app: &App<S>) -> Paragraph<'_> {
    let lines: Vec<Line> = app
        .toasts
        .iter()
        .map(|t| Line::from(Span::styled(t.message.as_str(), Style::default().fg(Color::Green))))
        .collect();
    Paragraph::new(lines).block(Block::default().title("Notifications").borders(Borders::ALL))
}

fn render_form(form: &TaskForm) -> Paragraph<'_> {
    let focused = form.focused_field();
    let type_hint = if form.is_editing() { "" } else { "  (←/→ to change)" };
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Type: ", Style::default().fg(Color::Yellow)),
            Span::styled(form.draft.task_type.label(), Style::default().fg(Color::Cyan)),
            Span::raw(type_hint),
        ]),
        Line::raw(""),
    ];
    for &field in form.draft.fields() {
        let is_focused = field == focused;
        let marker = if is_focused { "➤ " } else { "  " };
        let mut spans = vec![
            Span::raw(marker),
            Span::styled(format!("{}: ", field.label()), Style::default().fg(Color::Yellow)),
            Span::raw(form.draft.value(field)),
        ];
        if is_focused {
            spans.push(Span::raw("█"));
        }
        if form.draft.value(field).is_empty() && !field.hint().is_empty() {
            spans.push(Span::styled(
                format!("  {}", field.hint()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }

    let title = if form.is_editing() { "Update Task" } else { "Add New Task" };
    Paragraph::new(lines).block(
        Block::default()
            .title(format!("{title} (Tab next ; Enter save ; Esc cancel)"))
            .borders(Borders::ALL),
    )
}

fn render_footer<S: Storage>(app: &App<S>) -> Paragraph<'_> {
    match app.mode {
        InputMode::Search => {
            let line = Line::from(vec![
                Span::raw("Search: "),
                Span::styled(app.search.as_str(), Style::default().fg(Color::Yellow)),
                Span::raw("█"),
            ]);
            Paragraph::new(line).block(
                Block::default()
                    .title("Search (Enter keep / Esc clear)")
                    .borders(Borders::ALL),
            )
        }
        mode => {
            let msg = app
                .status
                .as_deref()
                .unwrap_or("q quit ; x delete shown type ; X delete all ; r reload");
            let title = match mode {
                InputMode::Confirm => "Confirm",
                InputMode::Form => "Form",
                _ => "Normal",
            };
            Paragraph::new(msg).block(Block::default().title(title).borders(Borders::ALL))
        }
    }
}

fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = area.width * percent_x / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::TaskRepository;
    use crate::repo::memory::MemoryStorage;
    use ratatui::backend::TestBackend;

    fn app() -> App<MemoryStorage> {
        App::new(
            TaskRepository::new(MemoryStorage::default()),
            Duration::from_secs(8),
        )
    }

    #[test]
    fn keys_drive_the_add_form() {
        let mut app = app();
        handle_key(&mut app, KeyCode::Char('a')).unwrap();
        assert_eq!(app.mode, InputMode::Form);
        for c in "Read".chars() {
            handle_key(&mut app, KeyCode::Char(c)).unwrap();
        }
        handle_key(&mut app, KeyCode::Tab).unwrap();
        for c in "chapter 3".chars() {
            handle_key(&mut app, KeyCode::Char(c)).unwrap();
        }
        // 'q' is text inside the form, not quit.
        assert!(!handle_key(&mut app, KeyCode::Char('q')).unwrap());
        handle_key(&mut app, KeyCode::Backspace).unwrap();
        handle_key(&mut app, KeyCode::Enter).unwrap();

        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.tasks[0].description, "chapter 3");
        assert!(handle_key(&mut app, KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn confirm_mode_accepts_only_yes_or_no() {
        let mut app = app();
        handle_key(&mut app, KeyCode::Char('X')).unwrap();
        assert_eq!(app.mode, InputMode::Confirm);
        handle_key(&mut app, KeyCode::Char('q')).unwrap();
        assert_eq!(app.mode, InputMode::Confirm);
        handle_key(&mut app, KeyCode::Esc).unwrap();
        assert_eq!(app.mode, InputMode::Normal);
    }

    #[test]
    fn draws_list_details_form_and_toasts() {
        let mut app = app();
        app.start_add();
        app.form.as_mut().unwrap().draft.title = "Visible".into();
        app.form.as_mut().unwrap().draft.description = "here".into();
        app.submit_form();
        app.start_add();

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Visible"));
        assert!(rendered.contains("Task Details"));
        assert!(rendered.contains("Add New Task"));
        assert!(rendered.contains("Notifications"));
    }
}
