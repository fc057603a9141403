use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

use crate::db::KeyValueStore;
use crate::models::{JobRecord, JobStatus, NewJob, TipsResult};
use crate::store::{RecordStore, StoreError};
use crate::tips::{GatewayError, TipsRequest, TipsSlot, fetch_from_proxy};
use crate::view::{ViewQuery, stats, view};

type TipsMessage = (u64, Result<String, GatewayError>);

/// Inline prompt for a new record: company first, then role.
#[derive(Debug, Default)]
struct AddForm {
    company: String,
    role: String,
    on_role: bool,
}

impl AddForm {
    fn field(&mut self) -> &mut String {
        if self.on_role { &mut self.role } else { &mut self.company }
    }
}

struct AppState<S: KeyValueStore> {
    store: RecordStore<S>,
    query: ViewQuery,
    selected: usize,
    searching: bool,
    adding: Option<AddForm>,
    message: Option<String>,
    tips: TipsSlot,
    proxy_url: String,
    timeout: Duration,
    tx: Sender<TipsMessage>,
    rx: Receiver<TipsMessage>,
}

impl<S: KeyValueStore> AppState<S> {
    fn new(store: RecordStore<S>, proxy_url: String, timeout: Duration) -> Self {
        let (tx, rx) = channel();
        Self {
            store,
            query: ViewQuery::default(),
            selected: 0,
            searching: false,
            adding: None,
            message: None,
            tips: TipsSlot::default(),
            proxy_url,
            timeout,
            tx,
            rx,
        }
    }

    fn visible(&self) -> Vec<&JobRecord> {
        view(self.store.records(), &self.query)
    }

    fn current_id(&self) -> Option<String> {
        self.visible().get(self.selected).map(|r| r.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn next(&mut self) {
        let len = self.visible().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
        }
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn set_status(&mut self, status: JobStatus) {
        let Some(id) = self.current_id() else { return };
        self.message = Some(match self.store.set_status(&id, status) {
            Ok(()) => format!("Marked as {}", status),
            Err(e) => e.to_string(),
        });
        self.clamp_selection();
    }

    fn delete(&mut self) {
        let Some(id) = self.current_id() else { return };
        self.message = Some(match self.store.delete(&id) {
            Ok(record) => format!("Deleted {} at {}", record.role, record.company),
            Err(StoreError::NotFound(_)) => "Already deleted".to_string(),
            Err(e) => e.to_string(),
        });
        self.clamp_selection();
    }

    fn request_tips(&mut self) {
        let Some(id) = self.current_id() else { return };
        let Some(record) = self.store.get(&id) else { return };
        let request = TipsRequest {
            role: record.role.clone(),
            company: record.company.clone(),
        };

        let ticket = self.tips.begin(&id);
        let tx = self.tx.clone();
        let url = self.proxy_url.clone();
        let timeout = self.timeout;
        thread::spawn(move || {
            let result = fetch_from_proxy(&url, &request, timeout);
            // Receiver gone means the browser already exited.
            let _ = tx.send((ticket, result));
        });
    }

    fn drain_tips(&mut self) {
        while let Ok((ticket, result)) = self.rx.try_recv() {
            self.tips.complete(ticket, result);
        }
    }

    fn add_input(&mut self, code: KeyCode) {
        let Some(form) = self.adding.as_mut() else { return };
        match code {
            KeyCode::Esc => self.adding = None,
            KeyCode::Tab => form.on_role = !form.on_role,
            KeyCode::Enter if !form.on_role => form.on_role = true,
            KeyCode::Enter => self.submit_add(),
            KeyCode::Backspace => {
                form.field().pop();
            }
            KeyCode::Char(c) => form.field().push(c),
            _ => {}
        }
    }

    fn submit_add(&mut self) {
        let Some(form) = self.adding.take() else { return };
        match self.store.create(NewJob::new(form.company.clone(), form.role.clone())) {
            Ok(record) => {
                self.message = Some(format!("Added {} at {}", record.role, record.company));
                let id = record.id.clone();
                self.selected = self.visible().iter().position(|r| r.id == id).unwrap_or(0);
            }
            Err(e) => {
                // Keep what was typed so it can be corrected.
                self.message = Some(e.to_string());
                self.adding = Some(form);
            }
        }
    }
}

pub fn run_browse<S: KeyValueStore>(store: RecordStore<S>, proxy_url: String, timeout: Duration) -> Result<()> {
    let mut state = AppState::new(store, proxy_url, timeout);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState<S>,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        state.drain_tips();
        list_state.select(if state.visible().is_empty() { None } else { Some(state.selected) });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        // Poll so finished tips requests get drawn without a keypress.
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if state.adding.is_some() {
            state.add_input(key.code);
            continue;
        }

        if state.searching {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => state.searching = false,
                KeyCode::Backspace => {
                    state.query.search.pop();
                }
                KeyCode::Char(c) => state.query.search.push(c),
                _ => {}
            }
            state.clamp_selection();
            continue;
        }

        state.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => state.next(),
            KeyCode::Up | KeyCode::Char('k') => state.prev(),
            KeyCode::Char('/') => state.searching = true,
            KeyCode::Char('n') => state.adding = Some(AddForm::default()),
            KeyCode::Char('f') => {
                state.query.status = state.query.status.next();
                state.clamp_selection();
            }
            KeyCode::Char('s') => state.query.sort = state.query.sort.toggle(),
            KeyCode::Char('a') => state.set_status(JobStatus::Applied),
            KeyCode::Char('i') => state.set_status(JobStatus::Interview),
            KeyCode::Char('o') => state.set_status(JobStatus::Offer),
            KeyCode::Char('x') => state.set_status(JobStatus::Rejected),
            KeyCode::Char('d') => state.delete(),
            KeyCode::Char('t') => state.request_tips(),
            _ => {}
        }
    }
    Ok(())
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Applied => Style::default().fg(Color::Blue),
        JobStatus::Interview => Style::default().fg(Color::Yellow),
        JobStatus::Offer => Style::default().fg(Color::Green),
        JobStatus::Rejected => Style::default().fg(Color::Red),
    }
}

fn draw<S: KeyValueStore>(frame: &mut Frame, state: &AppState<S>, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Header: stats over the full collection plus the active query
    let s = stats(state.store.records());
    let search = if state.searching {
        format!("{}_", state.query.search)
    } else {
        state.query.search.clone()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(format!(" Total {} ", s.total), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!(" Applied {} ", s.applied), status_style(JobStatus::Applied)),
        Span::styled(format!(" Interview {} ", s.interview), status_style(JobStatus::Interview)),
        Span::styled(format!(" Offers {} ", s.offer), status_style(JobStatus::Offer)),
        Span::styled(format!(" Rejected {} ", s.rejected), status_style(JobStatus::Rejected)),
        Span::raw(format!(
            "  | filter: {}  sort: {}  search: {}",
            state.query.status, state.query.sort, search
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Job Tracker "));
    frame.render_widget(header, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    // Left panel: derived view
    let visible = state.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|job| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<10}", job.status), status_style(job.status)),
                Span::raw(format!("{} | {}", job.role, job.company)),
            ]))
        })
        .collect();

    let title = if visible.is_empty() {
        " No applications yet. Add your first job! ".to_string()
    } else {
        format!(" Applications ({}) ", visible.len())
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail + tips
    let detail = Paragraph::new(build_detail(visible.get(state.selected).copied(), state.tips.result()))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, chunks[1]);

    let footer = match (&state.adding, &state.message) {
        (Some(form), msg) => {
            let (company, role) = if form.on_role {
                (form.company.clone(), format!("{}_", form.role))
            } else {
                (format!("{}_", form.company), form.role.clone())
            };
            let note = msg.as_deref().map(|m| format!("  ({})", m)).unwrap_or_default();
            format!(" New job  company: {}  role: {}  [Enter:next/save Tab:switch Esc:cancel]{}", company, role, note)
        }
        (None, Some(msg)) => format!(" {}", msg),
        (None, None) => {
            " j/k:move  /:search  f:filter  s:sort  n:new  a/i/o/x:status  d:delete  t:tips  q:quit"
                .to_string()
        }
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn build_detail<'a>(job: Option<&'a JobRecord>, tips: Option<TipsResult>) -> Text<'a> {
    let Some(job) = job else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &job.role,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", job.status),
        status_style(job.status),
    )));
    lines.push(Line::from(format!("Applied: {}", job.applied_date)));
    for (label, value) in [
        ("Location", &job.location),
        ("Salary", &job.salary),
        ("URL", &job.url),
    ] {
        if !value.is_empty() {
            lines.push(Line::from(format!("{}: {}", label, value)));
        }
    }
    if !job.notes.is_empty() {
        lines.push(Line::from(""));
        for line in textwrap::fill(&job.notes, 60).lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    let tip_text = tips
        .filter(|t| t.for_record_id == job.id)
        .map(|t| if t.loading { "Loading tips...".to_string() } else { t.text });
    if let Some(text) = tip_text {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Tips for {} at {}", job.role, job.company),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&text, 60).lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Cyan),
            )));
        }
    }

    Text::from(lines)
}
