use amc_core::{OpenProjectReceipt, ProjectSummary};
use amc_sync::{ScanReport, SyncError, UpdateOutcome, ViewState};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};

pub const COMMAND_QUEUE_CAPACITY: usize = 32;
/// How long a status note replaces the key hints in the footer.
pub const STATUS_NOTE_TTL: Duration = Duration::from_secs(5);

/// Work the event loop must start on behalf of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Scan,
    Refresh,
    Open(String),
    Detail(String),
}

/// Completion of a command started from an [`Action`].
#[derive(Debug)]
pub enum CommandEvent {
    Initialized(Result<UpdateOutcome, SyncError>),
    Scanned(Result<ScanReport, SyncError>),
    Refreshed(Result<UpdateOutcome, SyncError>),
    Opened {
        path: String,
        result: Result<OpenProjectReceipt, SyncError>,
    },
    Detail {
        name: String,
        result: Result<ProjectSummary, SyncError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailPane {
    Loading(String),
    Ready(Box<ProjectSummary>),
}

pub struct App {
    pub view: ViewState,
    pub list_state: ListState,
    pub help_open: bool,
    pub detail: Option<DetailPane>,
    pub status_note: Option<String>,
    note_set_at: Option<Instant>,
    pub base_url: String,
    pub project_list_limit: usize,
}

impl App {
    pub fn new(base_url: String, project_list_limit: usize, view: ViewState) -> Self {
        let mut app = Self {
            view: ViewState::default(),
            list_state: ListState::default(),
            help_open: false,
            detail: None,
            status_note: None,
            note_set_at: None,
            base_url,
            project_list_limit: project_list_limit.max(1),
        };
        app.set_view(view);
        app
    }

    pub fn set_view(&mut self, view: ViewState) {
        self.view = view;
        let visible = self.visible_projects().len();
        let selected = match (self.list_state.selected(), visible) {
            (_, 0) => None,
            (Some(index), _) => Some(index.min(visible - 1)),
            (None, _) => Some(0),
        };
        self.list_state.select(selected);
    }

    /// Projects shown in the list; the view caps how many it renders.
    pub fn visible_projects(&self) -> &[ProjectSummary] {
        let all = self.view.project_list();
        &all[..all.len().min(self.project_list_limit)]
    }

    pub fn selected_project(&self) -> Option<&ProjectSummary> {
        self.list_state
            .selected()
            .and_then(|index| self.visible_projects().get(index))
    }

    pub fn move_selection(&mut self, delta: isize) {
        let visible = self.visible_projects().len();
        if visible == 0 {
            self.list_state.select(None);
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, visible as isize - 1);
        self.list_state.select(Some(next as usize));
    }

    fn set_note(&mut self, note: impl Into<String>) {
        self.status_note = Some(note.into());
        self.note_set_at = Some(Instant::now());
    }

    /// Drops a note older than [`STATUS_NOTE_TTL`]; driven by the UI clock.
    pub fn expire_note(&mut self, now: Instant) {
        let expired = self
            .note_set_at
            .is_some_and(|set_at| now.saturating_duration_since(set_at) >= STATUS_NOTE_TTL);
        if expired {
            self.status_note = None;
            self.note_set_at = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        // Any key press acknowledges the previous note.
        self.status_note = None;
        self.note_set_at = None;
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return Action::None;
        }
        if key.code == KeyCode::Esc {
            self.help_open = false;
            self.detail = None;
            return Action::None;
        }
        if self.help_open {
            return Action::None;
        }

        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                Action::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                Action::None
            }
            KeyCode::Char('g') => {
                self.move_selection(isize::MIN / 2);
                Action::None
            }
            KeyCode::Char('s') => {
                if self.view.scanning {
                    self.set_note("scan already running");
                    return Action::None;
                }
                self.set_note("scanning projects...");
                Action::Scan
            }
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('o') | KeyCode::Enter => match self.selected_project() {
                Some(project) => Action::Open(project.path.clone()),
                None => {
                    self.set_note("no project selected");
                    Action::None
                }
            },
            KeyCode::Char('i') => match self.selected_project() {
                Some(project) => {
                    let name = project.name.clone();
                    self.detail = Some(DetailPane::Loading(name.clone()));
                    Action::Detail(name)
                }
                None => {
                    self.set_note("no project selected");
                    Action::None
                }
            },
            _ => Action::None,
        }
    }

    /// Turns command outcomes into transient notes; none of them block the view.
    pub fn apply_command_event(&mut self, event: CommandEvent) {
        match event {
            CommandEvent::Initialized(Ok(_)) => {}
            CommandEvent::Initialized(Err(err)) => {
                self.set_note(format!("initial load failed: {err}"));
            }
            CommandEvent::Scanned(Ok(report)) => {
                let found = report.receipt.projects_found;
                self.set_note(match report.refresh {
                    Ok(_) => format!("scan complete: {found} projects found"),
                    Err(err) => format!("scan complete, refresh failed: {err}"),
                });
            }
            CommandEvent::Scanned(Err(SyncError::ScanInProgress)) => {
                self.set_note("scan already running");
            }
            CommandEvent::Scanned(Err(err)) => {
                self.set_note(format!("scan failed: {err}"));
            }
            CommandEvent::Refreshed(Ok(UpdateOutcome::Applied)) => {
                self.set_note("projects refreshed");
            }
            CommandEvent::Refreshed(Ok(_)) => {}
            CommandEvent::Refreshed(Err(err)) => {
                self.set_note(format!("refresh failed: {err}"));
            }
            CommandEvent::Opened { path, result } => {
                self.set_note(match result {
                    Ok(receipt) if receipt.success && receipt.message.is_empty() => {
                        format!("opened {path}")
                    }
                    Ok(receipt) if receipt.success => receipt.message,
                    Ok(receipt) => format!("could not open {path}: {}", receipt.message),
                    Err(err) => format!("open failed: {err}"),
                });
            }
            CommandEvent::Detail { name, result } => {
                let waiting = matches!(&self.detail, Some(DetailPane::Loading(pending)) if *pending == name);
                match result {
                    Ok(project) if waiting => {
                        self.detail = Some(DetailPane::Ready(Box::new(project)));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        if waiting {
                            self.detail = None;
                        }
                        self.set_note(format!("detail for {name} failed: {err}"));
                    }
                }
            }
        }
    }
}
