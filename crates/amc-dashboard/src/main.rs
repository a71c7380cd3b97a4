mod app;
mod config;
mod logging;
mod theme;
mod ui;

use amc_sync::{HttpTransport, SyncOptions, Synchronizer, ViewState};
use anyhow::{bail, Context, Result};
use app::{Action, App, CommandEvent, COMMAND_QUEUE_CAPACITY};
use clap::{Parser, Subcommand};
use config::{DashboardConfig, FileConfig};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fmt::Write as _,
    future::Future,
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

type Dashboard = Synchronizer<HttpTransport>;

#[derive(Parser, Debug)]
#[command(name = "amc-dashboard")]
#[command(about = "Terminal dashboard for AI Mission Control", long_about = None, version)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "AMC_BASE_URL", global = true)]
    base_url: Option<String>,
    /// Seconds between assistant/resource polls
    #[arg(long, env = "AMC_HEARTBEAT_SECS", global = true)]
    heartbeat_secs: Option<u64>,
    #[arg(long, env = "AMC_REQUEST_TIMEOUT_SECS", global = true)]
    request_timeout_secs: Option<u64>,
    #[arg(long, env = "AMC_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,
    /// Maximum number of projects listed
    #[arg(long, env = "AMC_PROJECT_LIST_LIMIT", global = true)]
    project_list_limit: Option<usize>,
    /// Config file (defaults to ~/.config/amc/dashboard.toml)
    #[arg(long, env = "AMC_CONFIG_PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Interactive dashboard (default)
    Tui,
    /// Load everything once and print the view state
    Snapshot {
        #[arg(long)]
        json: bool,
    },
    /// Rescan projects on the backend
    Scan,
    /// Open a project in the external editor
    Open { path: String },
    /// Ask the local model a question
    Ask {
        prompt: String,
        #[arg(long)]
        project: Option<String>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Tui => "tui",
            Command::Snapshot { .. } => "snapshot",
            Command::Scan => "scan",
            Command::Open { .. } => "open",
            Command::Ask { .. } => "ask",
        }
    }
}

impl Cli {
    fn overrides(&self) -> FileConfig {
        FileConfig {
            base_url: self.base_url.clone(),
            heartbeat_secs: self.heartbeat_secs,
            request_timeout_secs: self.request_timeout_secs,
            log_dir: self.log_dir.clone(),
            project_list_limit: self.project_list_limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Tui);
    let path = cli.config.clone().or_else(config::config_path);
    let loaded = config::load(path.as_deref(), cli.overrides());
    let config = loaded.config;

    let target = logging::init_logging(&config.log_dir, command != Command::Tui);
    for warning in &loaded.warnings {
        warn!(event = "config_invalid", error = %warning);
    }
    info!(
        event = "dashboard_start",
        command = command.name(),
        base_url = %config.base_url,
        config = ?config.source,
        log_target = ?target
    );

    let transport = HttpTransport::new(&config.base_url, config.request_timeout)
        .context("invalid backend base url")?;
    let sync = Synchronizer::new(
        transport,
        SyncOptions {
            heartbeat_period: config.heartbeat,
        },
    );

    let result = run_command(command, &sync, &config).await;
    sync.teardown();
    info!(event = "dashboard_exit", ok = result.is_ok());
    result
}

async fn run_command(command: Command, sync: &Dashboard, config: &DashboardConfig) -> Result<()> {
    match command {
        Command::Tui => run_tui(sync, config).await,
        Command::Snapshot { json } => print_snapshot(sync, config, json).await,
        Command::Scan => {
            let report = sync.trigger_scan().await.context("scan failed")?;
            println!(
                "Scan complete: {} projects found. {}",
                report.receipt.projects_found, report.receipt.message
            );
            if let Err(err) = report.refresh {
                eprintln!("project refresh failed: {err}");
            }
            Ok(())
        }
        Command::Open { path } => {
            let receipt = sync.open_external(&path).await.context("open failed")?;
            if !receipt.success {
                bail!("backend could not open {path}: {}", receipt.message);
            }
            if receipt.message.is_empty() {
                println!("Opened {path}");
            } else {
                println!("{}", receipt.message);
            }
            Ok(())
        }
        Command::Ask { prompt, project } => {
            let reply = sync
                .ask_assistant(&prompt, project.as_deref().unwrap_or_default())
                .await
                .context("assistant query failed")?;
            if !reply.success {
                bail!("assistant declined: {}", reply.response);
            }
            println!("{}", reply.response);
            Ok(())
        }
    }
}

async fn print_snapshot(sync: &Dashboard, config: &DashboardConfig, json: bool) -> Result<()> {
    let (projects, heartbeat) = tokio::join!(sync.initialize(), sync.fetch_assistant_and_resources());
    if let Err(err) = &projects {
        eprintln!("projects: {err}");
    }
    if let Err(err) = &heartbeat {
        eprintln!("heartbeat: {err}");
    }
    if projects.is_err() && heartbeat.is_err() {
        bail!("backend at {} answered nothing usable", config.base_url);
    }
    let view = sync.snapshot();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("serialize view state")?
        );
    } else {
        print!("{}", snapshot_text(&view, config.project_list_limit));
    }
    Ok(())
}

fn snapshot_text(view: &ViewState, limit: usize) -> String {
    let mut out = String::new();
    match view.stats.as_ref() {
        Some(stats) => {
            let _ = writeln!(
                out,
                "projects: {}  avg health: {}  git repos: {}  tech stacks: {}",
                stats.total_projects,
                stats.average_health_rounded(),
                stats.has_git,
                stats.tech_stack_count()
            );
        }
        None => out.push_str("stats: unavailable\n"),
    }
    if let Some(status) = view.assistants.as_ref() {
        let _ = writeln!(
            out,
            "desktop commander: {}  cline: {} ({})  lm studio: {} ({} models)",
            up_down(status.desktop_commander.available),
            up_down(status.cline.connected),
            status.cline.model_label(),
            up_down(status.lmstudio.online),
            status.lmstudio.loaded_models()
        );
    }
    if let Some(resources) = view.resources.as_ref() {
        let _ = writeln!(
            out,
            "cpu: {:.1}%  memory: {:.1}%  disk: {:.1}% ({:.1} GB free)",
            resources.cpu_percent,
            resources.memory_percent,
            resources.disk_percent,
            resources.disk_free_gb
        );
    }
    for project in view.project_list().iter().take(limit) {
        let _ = write!(
            out,
            "{:>3}  {}  {}",
            project.health(),
            project.name,
            project.path
        );
        if let Some(changes) = project.change_indicator() {
            let _ = write!(out, "  ({changes})");
        }
        out.push('\n');
    }
    out
}

fn up_down(up: bool) -> &'static str {
    if up {
        "up"
    } else {
        "down"
    }
}

async fn run_tui(sync: &Dashboard, config: &DashboardConfig) -> Result<()> {
    let mut app = App::new(
        config.base_url.clone(),
        config.project_list_limit,
        sync.snapshot(),
    );
    let mut updates = sync.subscribe();
    let (cmd_tx, mut cmd_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    {
        let sync = sync.clone();
        spawn_command(&cmd_tx, async move {
            CommandEvent::Initialized(sync.initialize().await)
        });
    }
    sync.start_heartbeat().context("start heartbeat")?;

    let mut session = TerminalSession::enter()?;
    let result = event_loop(
        &mut session.terminal,
        &mut app,
        sync,
        &mut updates,
        &cmd_tx,
        &mut cmd_rx,
    )
    .await;
    session.show_cursor()?;
    result
}

/// Raw mode plus the alternate screen, restored on drop.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let guard = RestoreGuard::new(|| restore_terminal(&mut io::stdout()));
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        guard.disarm();
        Ok(Self { terminal })
    }

    fn show_cursor(&mut self) -> Result<()> {
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        restore_terminal(self.terminal.backend_mut());
    }
}

/// Runs `restore` on drop unless disarmed; covers the setup window after
/// raw mode is on but before a [`TerminalSession`] owns the terminal.
struct RestoreGuard<F: FnOnce()> {
    restore: Option<F>,
}

impl<F: FnOnce()> RestoreGuard<F> {
    fn new(restore: F) -> Self {
        Self {
            restore: Some(restore),
        }
    }

    fn disarm(mut self) {
        self.restore = None;
    }
}

impl<F: FnOnce()> Drop for RestoreGuard<F> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

fn restore_terminal(out: &mut impl io::Write) {
    if let Err(err) = disable_raw_mode() {
        warn!(event = "terminal_restore_failed", error = %err);
    }
    if let Err(err) = execute!(out, LeaveAlternateScreen) {
        warn!(event = "terminal_restore_failed", error = %err);
    }
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    sync: &Dashboard,
    updates: &mut watch::Receiver<ViewState>,
    cmd_tx: &mpsc::Sender<CommandEvent>,
    cmd_rx: &mut mpsc::Receiver<CommandEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    // Keeps the "updated N s ago" labels moving between polls.
    let mut clock = tokio::time::interval(Duration::from_secs(1));

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                app.set_view(view);
            }
            Some(event) = cmd_rx.recv() => {
                app.apply_command_event(event);
            }
            _ = clock.tick() => {
                app.expire_note(Instant::now());
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.handle_key(key) {
                        Action::Quit => break,
                        action => dispatch(action, sync, cmd_tx),
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(event = "terminal_input_failed", error = %err);
                    break;
                }
                None => break,
            }
        }
    }
    Ok(())
}

fn dispatch(action: Action, sync: &Dashboard, cmd_tx: &mpsc::Sender<CommandEvent>) {
    let sync = sync.clone();
    match action {
        Action::None | Action::Quit => {}
        Action::Scan => spawn_command(cmd_tx, async move {
            CommandEvent::Scanned(sync.trigger_scan().await)
        }),
        Action::Refresh => spawn_command(cmd_tx, async move {
            CommandEvent::Refreshed(sync.refresh_projects().await)
        }),
        Action::Open(path) => spawn_command(cmd_tx, async move {
            let result = sync.open_external(&path).await;
            CommandEvent::Opened { path, result }
        }),
        Action::Detail(name) => spawn_command(cmd_tx, async move {
            let result = sync.project_detail(&name).await;
            CommandEvent::Detail { name, result }
        }),
    }
}

fn spawn_command<F>(cmd_tx: &mpsc::Sender<CommandEvent>, command: F)
where
    F: Future<Output = CommandEvent> + Send + 'static,
{
    let cmd_tx = cmd_tx.clone();
    tokio::spawn(async move {
        let event = command.await;
        let _ = cmd_tx.send(event).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_core::{AggregateStats, GitStatus, ProjectSummary};

    fn guarded_setup(fail: bool, restored: &std::cell::Cell<u32>) -> Result<()> {
        let guard = RestoreGuard::new(|| restored.set(restored.get() + 1));
        if fail {
            bail!("alternate screen unavailable");
        }
        guard.disarm();
        Ok(())
    }

    #[test]
    fn failed_terminal_setup_restores_raw_mode() {
        let restored = std::cell::Cell::new(0);
        assert!(guarded_setup(true, &restored).is_err());
        assert_eq!(restored.get(), 1);

        assert!(guarded_setup(false, &restored).is_ok());
        assert_eq!(restored.get(), 1);
    }

    #[test]
    fn defaults_to_tui_and_parses_subcommands() {
        let cli = Cli::try_parse_from(["amc-dashboard"]).expect("parse");
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from([
            "amc-dashboard",
            "ask",
            "what next?",
            "--project",
            "/work/demo",
            "--base-url",
            "http://mission:8080",
        ])
        .expect("parse");
        assert_eq!(
            cli.command,
            Some(Command::Ask {
                prompt: "what next?".to_string(),
                project: Some("/work/demo".to_string()),
            })
        );
        assert_eq!(
            cli.overrides().base_url.as_deref(),
            Some("http://mission:8080")
        );

        let cli = Cli::try_parse_from(["amc-dashboard", "snapshot", "--json"]).expect("parse");
        assert_eq!(cli.command, Some(Command::Snapshot { json: true }));
        assert!(Cli::try_parse_from(["amc-dashboard", "open"]).is_err());
    }

    #[test]
    fn snapshot_text_lists_capped_projects() {
        let project = |name: &str| ProjectSummary {
            name: name.to_string(),
            path: format!("/work/{name}"),
            health_score: 82.0,
            git_status: Some(GitStatus {
                has_changes: true,
                files_changed: 3,
            }),
            ..ProjectSummary::default()
        };
        let view = ViewState {
            projects: Some(vec![project("demo"), project("extra")]),
            stats: Some(AggregateStats {
                total_projects: 2,
                average_health: 82.4,
                ..AggregateStats::default()
            }),
            ..ViewState::default()
        };
        let text = snapshot_text(&view, 1);
        assert!(text.starts_with("projects: 2  avg health: 82"));
        assert!(text.contains(" 82  demo  /work/demo  (3 changes)"));
        assert!(!text.contains("extra"));
    }
}
