use amc_core::{AssistantQuery, AssistantReply, OpenProjectReceipt, ProjectSummary, ScanReceipt};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::DashboardApi;
use crate::error::SyncError;
use crate::schedule::{spawn_repeating, TaskHandle};
use crate::state::{FetchGroup, Ledger, UpdateOutcome, ViewState};
use crate::transport::Transport;

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct SyncOptions {
    pub heartbeat_period: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            heartbeat_period: HEARTBEAT_PERIOD,
        }
    }
}

#[derive(Debug)]
pub struct ScanReport {
    pub receipt: ScanReceipt,
    /// Outcome of the project/stats re-fetch that follows a successful scan.
    pub refresh: Result<UpdateOutcome, SyncError>,
}

/// Owns the dashboard's remote-data state for one mount.
///
/// Construct on mount, call [`Synchronizer::initialize`] and
/// [`Synchronizer::start_heartbeat`], and call [`Synchronizer::teardown`] on
/// unmount. Clones share the same state.
pub struct Synchronizer<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Synchronizer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T> {
    api: DashboardApi<T>,
    options: SyncOptions,
    ledger: Mutex<Ledger>,
    publisher: watch::Sender<ViewState>,
    heartbeat: Mutex<Option<TaskHandle>>,
    initialized: AtomicBool,
    disposed: AtomicBool,
    project_tickets: AtomicU64,
    heartbeat_tickets: AtomicU64,
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> Synchronizer<T> {
    pub fn new(transport: T, options: SyncOptions) -> Self {
        let view = ViewState::mounting();
        let (publisher, _) = watch::channel(view.clone());
        Self {
            inner: Arc::new(Inner {
                api: DashboardApi::new(transport),
                options,
                ledger: Mutex::new(Ledger::new(view)),
                publisher,
                heartbeat: Mutex::new(None),
                initialized: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                project_tickets: AtomicU64::new(0),
                heartbeat_tickets: AtomicU64::new(0),
            }),
        }
    }

    pub fn api(&self) -> &DashboardApi<T> {
        &self.inner.api
    }

    pub fn snapshot(&self) -> ViewState {
        lock(&self.inner.ledger).view.clone()
    }

    /// Snapshot stream; a new value is published after every applied change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.publisher.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// First load of projects and stats. `loading` is cleared afterwards
    /// whether or not the fetch succeeded, so first paint always completes.
    pub async fn initialize(&self) -> Result<UpdateOutcome, SyncError> {
        self.inner.ensure_mounted()?;
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyInitialized);
        }
        let result = self.inner.load_projects().await;
        self.inner.set_flags(|view| view.loading = false);
        info!(
            event = "sync_initialized",
            ok = result.is_ok(),
            outcome = ?result.as_ref().ok()
        );
        result
    }

    /// Starts polling assistants and resources: once now, then every period.
    /// A running heartbeat is replaced.
    pub fn start_heartbeat(&self) -> Result<(), SyncError> {
        self.inner.ensure_mounted()?;
        let weak = Arc::downgrade(&self.inner);
        let handle = spawn_repeating("heartbeat", self.inner.options.heartbeat_period, move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let _ = inner.load_heartbeat().await;
            }
        });
        let previous = lock(&self.inner.heartbeat).replace(handle);
        drop(previous);
        if self.is_disposed() {
            self.inner.stop_heartbeat();
            return Err(SyncError::Disposed);
        }
        info!(
            event = "heartbeat_start",
            period_ms = self.inner.options.heartbeat_period.as_millis() as u64
        );
        Ok(())
    }

    pub fn heartbeat_active(&self) -> bool {
        lock(&self.inner.heartbeat)
            .as_ref()
            .map(TaskHandle::is_active)
            .unwrap_or(false)
    }

    /// One heartbeat group fetch. Both calls must succeed for either slice
    /// to update.
    pub async fn fetch_assistant_and_resources(&self) -> Result<UpdateOutcome, SyncError> {
        self.inner.ensure_mounted()?;
        self.inner.load_heartbeat().await
    }

    /// Re-fetches projects and stats without touching `loading`.
    pub async fn refresh_projects(&self) -> Result<UpdateOutcome, SyncError> {
        self.inner.ensure_mounted()?;
        self.inner.load_projects().await
    }

    /// Asks the backend to rescan, then reloads projects and stats.
    /// `scanning` is true for the duration and reset on every exit path.
    pub async fn trigger_scan(&self) -> Result<ScanReport, SyncError> {
        let _scanning = ScanGuard::engage(&self.inner)?;
        let receipt = match self.inner.api.scan().await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(event = "scan_failed", kind = err.kind(), error = %err);
                return Err(err);
            }
        };
        info!(
            event = "scan_complete",
            projects_found = receipt.projects_found,
            message = %receipt.message
        );
        let refresh = self.inner.load_projects().await;
        Ok(ScanReport { receipt, refresh })
    }

    /// Asks the backend to open `project_path` in the external editor.
    /// Never changes view state.
    pub async fn open_external(&self, project_path: &str) -> Result<OpenProjectReceipt, SyncError> {
        self.inner.ensure_mounted()?;
        let project_path = project_path.trim();
        if project_path.is_empty() {
            return Err(SyncError::InvalidRequest("project path is empty".to_string()));
        }
        match self.inner.api.open_project(project_path).await {
            Ok(receipt) => {
                info!(event = "open_external", project_path, message = %receipt.message);
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    event = "open_external_failed",
                    project_path,
                    kind = err.kind(),
                    error = %err
                );
                Err(err)
            }
        }
    }

    pub async fn project_detail(&self, name: &str) -> Result<ProjectSummary, SyncError> {
        self.inner.ensure_mounted()?;
        self.inner.api.project_detail(name).await.map_err(|err| {
            warn!(event = "project_detail_failed", project = name, kind = err.kind(), error = %err);
            err
        })
    }

    pub async fn ask_assistant(
        &self,
        prompt: &str,
        project_context: &str,
    ) -> Result<AssistantReply, SyncError> {
        self.inner.ensure_mounted()?;
        if prompt.trim().is_empty() {
            return Err(SyncError::InvalidRequest("prompt is empty".to_string()));
        }
        let query = AssistantQuery {
            prompt: prompt.to_string(),
            project_context: project_context.to_string(),
        };
        self.inner.api.ask(&query).await.map_err(|err| {
            warn!(event = "assistant_query_failed", kind = err.kind(), error = %err);
            err
        })
    }

    /// Stops the heartbeat and ignores any response that arrives later.
    pub fn teardown(&self) {
        {
            let _ledger = lock(&self.inner.ledger);
            if self.inner.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.inner.stop_heartbeat();
        info!(event = "sync_teardown");
    }
}

impl<T: Transport> Inner<T> {
    fn ensure_mounted(&self) -> Result<(), SyncError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SyncError::Disposed);
        }
        Ok(())
    }

    fn issue(&self, group: FetchGroup) -> u64 {
        let counter = match group {
            FetchGroup::Projects => &self.project_tickets,
            FetchGroup::Heartbeat => &self.heartbeat_tickets,
        };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn load_projects(&self) -> Result<UpdateOutcome, SyncError> {
        let group = FetchGroup::Projects;
        let ticket = self.issue(group);
        let (projects, stats) = tokio::join!(self.api.projects(), self.api.stats());
        let (projects, stats) = match (projects, stats) {
            (Ok(projects), Ok(stats)) => (projects, stats),
            (Err(err), _) | (_, Err(err)) => {
                log_group_failure(group, ticket, &err);
                return Err(err);
            }
        };
        let count = projects.len();
        let outcome = self.commit(group, ticket, move |view| {
            view.projects = Some(projects);
            view.stats = Some(stats);
            view.projects_updated_at = Some(Utc::now());
        });
        debug!(event = "sync_group_done", group = group.as_str(), ticket, projects = count, outcome = ?outcome);
        Ok(outcome)
    }

    async fn load_heartbeat(&self) -> Result<UpdateOutcome, SyncError> {
        let group = FetchGroup::Heartbeat;
        let ticket = self.issue(group);
        let (assistants, resources) =
            tokio::join!(self.api.ai_status(), self.api.system_resources());
        let (assistants, resources) = match (assistants, resources) {
            (Ok(assistants), Ok(resources)) => (assistants, resources),
            (Err(err), _) | (_, Err(err)) => {
                log_group_failure(group, ticket, &err);
                return Err(err);
            }
        };
        let outcome = self.commit(group, ticket, move |view| {
            view.assistants = Some(assistants);
            view.resources = Some(resources);
            view.heartbeat_updated_at = Some(Utc::now());
        });
        debug!(event = "sync_group_done", group = group.as_str(), ticket, outcome = ?outcome);
        Ok(outcome)
    }

    fn commit(
        &self,
        group: FetchGroup,
        ticket: u64,
        apply: impl FnOnce(&mut ViewState),
    ) -> UpdateOutcome {
        let mut ledger = lock(&self.ledger);
        if self.disposed.load(Ordering::SeqCst) {
            debug!(event = "sync_discard", group = group.as_str(), ticket);
            return UpdateOutcome::Discarded;
        }
        if !ledger.admit(group, ticket) {
            debug!(
                event = "sync_stale",
                group = group.as_str(),
                ticket,
                projects_applied = ledger.projects_applied,
                heartbeat_applied = ledger.heartbeat_applied
            );
            return UpdateOutcome::Stale;
        }
        apply(&mut ledger.view);
        self.publisher.send_replace(ledger.view.clone());
        UpdateOutcome::Applied
    }

    /// Flags are always written; only publication stops after teardown.
    fn set_flags(&self, apply: impl FnOnce(&mut ViewState)) {
        let mut ledger = lock(&self.ledger);
        apply(&mut ledger.view);
        if !self.disposed.load(Ordering::SeqCst) {
            self.publisher.send_replace(ledger.view.clone());
        }
    }

    fn stop_heartbeat(&self) {
        let handle = lock(&self.heartbeat).take();
        if let Some(mut handle) = handle {
            handle.cancel();
        }
    }
}

fn log_group_failure(group: FetchGroup, ticket: u64, err: &SyncError) {
    warn!(
        event = "sync_fetch_failed",
        group = group.as_str(),
        ticket,
        kind = err.kind(),
        error = %err
    );
}

struct ScanGuard<'a, T: Transport> {
    inner: &'a Inner<T>,
}

impl<'a, T: Transport> ScanGuard<'a, T> {
    fn engage(inner: &'a Inner<T>) -> Result<Self, SyncError> {
        let mut ledger = lock(&inner.ledger);
        if inner.disposed.load(Ordering::SeqCst) {
            return Err(SyncError::Disposed);
        }
        if ledger.view.scanning {
            return Err(SyncError::ScanInProgress);
        }
        ledger.view.scanning = true;
        inner.publisher.send_replace(ledger.view.clone());
        Ok(Self { inner })
    }
}

impl<T: Transport> Drop for ScanGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.set_flags(|view| view.scanning = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};

    #[derive(Clone)]
    struct Scripted {
        delay: Duration,
        reply: Result<Value, SyncError>,
    }

    #[derive(Default)]
    struct ScriptedTransport {
        queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
        sticky: Mutex<HashMap<String, Scripted>>,
        calls: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl ScriptedTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn always(&self, path: &str, reply: Result<Value, SyncError>) {
            lock(&self.sticky).insert(
                path.to_string(),
                Scripted {
                    delay: Duration::ZERO,
                    reply,
                },
            );
        }

        fn once(&self, path: &str, delay: Duration, reply: Result<Value, SyncError>) {
            lock(&self.queued)
                .entry(path.to_string())
                .or_default()
                .push_back(Scripted { delay, reply });
        }

        fn calls_to(&self, path: &str) -> usize {
            lock(&self.calls)
                .iter()
                .filter(|(called, _)| called == path)
                .count()
        }

        fn last_body(&self, path: &str) -> Option<Value> {
            lock(&self.calls)
                .iter()
                .rev()
                .find(|(called, _)| called == path)
                .and_then(|(_, body)| body.clone())
        }

        async fn respond(&self, path: &str, body: Option<Value>) -> Result<Value, SyncError> {
            let scripted = {
                lock(&self.calls).push((path.to_string(), body));
                let queued = lock(&self.queued)
                    .get_mut(path)
                    .and_then(|queue| queue.pop_front());
                queued
                    .or_else(|| lock(&self.sticky).get(path).cloned())
                    .unwrap_or(Scripted {
                        delay: Duration::ZERO,
                        reply: Err(server_error(path, 404)),
                    })
            };
            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }
            scripted.reply
        }
    }

    impl Transport for ScriptedTransport {
        async fn get(&self, path: &str) -> Result<Value, SyncError> {
            self.respond(path, None).await
        }

        async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, SyncError> {
            self.respond(path, body).await
        }
    }

    fn server_error(path: &str, status: u16) -> SyncError {
        SyncError::Status {
            path: path.to_string(),
            status,
            body: "boom".to_string(),
        }
    }

    fn demo_projects() -> Value {
        json!({
            "projects": [{
                "name": "demo",
                "path": "/work/demo",
                "type": "cli",
                "stack": ["go"],
                "health_score": 82,
                "has_git": true,
                "git_status": {"has_changes": true, "files_changed": 3}
            }]
        })
    }

    fn demo_stats() -> Value {
        json!({
            "total_projects": 1,
            "average_health": 82.0,
            "has_git": 1,
            "tech_stack_breakdown": {"go": 1},
            "project_types": {"cli": 1}
        })
    }

    fn ai_status(model: &str) -> Value {
        json!({
            "desktop_commander": {"available": true, "type": "cloud", "model": model, "rate_limited": false},
            "cline": {"configured": true, "type": "local", "connected": false, "model": null},
            "lmstudio": {"online": false, "models": [], "active_model": null}
        })
    }

    fn resources(cpu: f64) -> Value {
        json!({
            "cpu_percent": cpu,
            "memory_percent": 40.0,
            "memory_available_gb": 12.5,
            "disk_percent": 61.0,
            "disk_free_gb": 210.0
        })
    }

    fn healthy_backend() -> Arc<ScriptedTransport> {
        let transport = ScriptedTransport::new();
        transport.always("/api/projects", Ok(demo_projects()));
        transport.always("/api/stats", Ok(demo_stats()));
        transport.always("/api/ai-status", Ok(ai_status("planner")));
        transport.always("/api/system-resources", Ok(resources(12.0)));
        transport.always("/api/scan", Ok(json!({"success": true, "projects_found": 1, "message": "Scan complete"})));
        transport
    }

    fn mount(transport: &Arc<ScriptedTransport>) -> Synchronizer<Arc<ScriptedTransport>> {
        Synchronizer::new(transport.clone(), SyncOptions::default())
    }

    #[tokio::test]
    async fn initialize_populates_projects_and_clears_loading() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        assert!(sync.snapshot().loading);

        let outcome = sync.initialize().await.expect("initialize");
        assert_eq!(outcome, UpdateOutcome::Applied);

        let view = sync.snapshot();
        assert!(!view.loading);
        let projects = view.project_list();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].health(), 82);
        assert_eq!(projects[0].change_indicator().as_deref(), Some("3 changes"));
        assert_eq!(view.stats.as_ref().map(|s| s.total_projects), Some(1));
        assert!(view.projects_updated_at.is_some());
        assert!(view.assistants.is_none());
    }

    #[tokio::test]
    async fn initialize_failure_still_completes_first_paint() {
        let transport = healthy_backend();
        transport.always("/api/stats", Err(server_error("/api/stats", 500)));
        let sync = mount(&transport);

        let err = sync.initialize().await.unwrap_err();
        assert_eq!(err.kind(), "status");
        let view = sync.snapshot();
        assert!(!view.loading);
        assert!(view.projects.is_none());
        assert!(view.stats.is_none());
    }

    #[tokio::test]
    async fn malformed_body_fails_the_group() {
        let transport = healthy_backend();
        transport.always("/api/projects", Ok(json!(["not", "an", "object"])));
        let sync = mount(&transport);

        let err = sync.initialize().await.unwrap_err();
        assert_eq!(err.kind(), "decode");
        assert!(sync.snapshot().stats.is_none());
    }

    #[tokio::test]
    async fn initialize_runs_once_per_mount() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        let mut updates = sync.subscribe();

        sync.initialize().await.expect("initialize");
        assert_eq!(
            sync.initialize().await.unwrap_err(),
            SyncError::AlreadyInitialized
        );
        assert_eq!(transport.calls_to("/api/projects"), 1);
        assert!(updates.has_changed().expect("sender alive"));
        assert!(!updates.borrow_and_update().loading);

        sync.trigger_scan().await.expect("scan");
        assert!(!sync.snapshot().loading);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_good_projects() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        sync.initialize().await.expect("initialize");
        let before = sync.snapshot();

        transport.once(
            "/api/projects",
            Duration::ZERO,
            Err(SyncError::Transport {
                path: "/api/projects".to_string(),
                message: "connection refused".to_string(),
            }),
        );
        let err = sync.refresh_projects().await.unwrap_err();
        assert_eq!(err.kind(), "transport");

        let after = sync.snapshot();
        assert_eq!(after.projects, before.projects);
        assert_eq!(after.stats, before.stats);
        assert_eq!(after.projects_updated_at, before.projects_updated_at);
    }

    #[tokio::test]
    async fn heartbeat_group_fails_atomically() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        sync.fetch_assistant_and_resources()
            .await
            .expect("first heartbeat");
        let before = sync.snapshot();
        assert_eq!(before.resources.as_ref().map(|r| r.cpu_percent), Some(12.0));

        transport.once(
            "/api/ai-status",
            Duration::ZERO,
            Err(server_error("/api/ai-status", 500)),
        );
        transport.once("/api/system-resources", Duration::ZERO, Ok(resources(95.0)));

        let err = sync.fetch_assistant_and_resources().await.unwrap_err();
        assert_eq!(err.kind(), "status");
        let after = sync.snapshot();
        assert_eq!(after.resources, before.resources);
        assert_eq!(after.assistants, before.assistants);
        assert_eq!(after.heartbeat_updated_at, before.heartbeat_updated_at);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_polls_every_period_until_teardown() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        sync.start_heartbeat().expect("start");
        assert!(sync.heartbeat_active());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 1);
        assert!(sync.snapshot().assistants.is_some());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 2);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 5);
        assert_eq!(transport.calls_to("/api/system-resources"), 5);

        sync.teardown();
        assert!(!sync.heartbeat_active());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 5);
        assert_eq!(sync.start_heartbeat().unwrap_err(), SyncError::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_heartbeat_replaces_previous_schedule() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        sync.start_heartbeat().expect("start");
        tokio::time::sleep(Duration::from_millis(1)).await;
        sync.start_heartbeat().expect("restart");
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 3);
        sync.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_heartbeat() {
        let transport = healthy_backend();
        let sync = mount(&transport);
        sync.start_heartbeat().expect("start");
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(sync);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.calls_to("/api/ai-status"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_sets_scanning_until_refresh_completes() {
        let transport = healthy_backend();
        transport.once(
            "/api/scan",
            Duration::from_secs(2),
            Ok(json!({"success": true, "projects_found": 1, "message": "Scan complete"})),
        );
        let sync = mount(&transport);
        sync.initialize().await.expect("initialize");

        let task = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.trigger_scan().await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(sync.snapshot().scanning);
        assert_eq!(
            sync.trigger_scan().await.unwrap_err(),
            SyncError::ScanInProgress
        );

        let report = task.await.expect("join").expect("scan");
        assert_eq!(report.receipt.projects_found, 1);
        assert_eq!(report.refresh, Ok(UpdateOutcome::Applied));
        assert!(!sync.snapshot().scanning);
        assert_eq!(transport.calls_to("/api/projects"), 2);
    }

    #[tokio::test]
    async fn scan_failure_resets_scanning_and_skips_refresh() {
        let transport = healthy_backend();
        transport.always("/api/scan", Err(server_error("/api/scan", 500)));
        let sync = mount(&transport);
        sync.initialize().await.expect("initialize");

        let err = sync.trigger_scan().await.unwrap_err();
        assert_eq!(err.kind(), "status");
        assert!(!sync.snapshot().scanning);
        assert_eq!(transport.calls_to("/api/projects"), 1);
    }

    #[tokio::test]
    async fn scan_with_failed_refresh_still_resets_scanning() {
        let transport = healthy_backend();
        transport.always("/api/scan", Ok(Value::Null));
        let sync = mount(&transport);
        sync.initialize().await.expect("initialize");
        transport.once(
            "/api/stats",
            Duration::ZERO,
            Err(server_error("/api/stats", 503)),
        );

        let report = sync.trigger_scan().await.expect("scan accepted");
        assert!(report.receipt.success);
        assert_eq!(report.refresh.unwrap_err().kind(), "status");
        let view = sync.snapshot();
        assert!(!view.scanning);
        assert_eq!(view.project_list().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_heartbeat_response_is_discarded() {
        let transport = healthy_backend();
        transport.once("/api/ai-status", Duration::from_secs(3), Ok(ai_status("old")));
        transport.once("/api/ai-status", Duration::ZERO, Ok(ai_status("new")));
        let sync = mount(&transport);

        let (first, second) = tokio::join!(
            sync.fetch_assistant_and_resources(),
            sync.fetch_assistant_and_resources()
        );
        assert_eq!(first, Ok(UpdateOutcome::Stale));
        assert_eq!(second, Ok(UpdateOutcome::Applied));
        let view = sync.snapshot();
        assert_eq!(
            view.assistants.map(|a| a.desktop_commander.model),
            Some("new".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn responses_after_teardown_are_ignored() {
        let transport = healthy_backend();
        transport.once("/api/projects", Duration::from_secs(2), Ok(demo_projects()));
        let sync = mount(&transport);
        let mut updates = sync.subscribe();

        let task = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.initialize().await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        sync.teardown();
        sync.teardown();

        let outcome = task.await.expect("join");
        assert_eq!(outcome, Ok(UpdateOutcome::Discarded));
        assert!(sync.snapshot().projects.is_none());
        assert!(!updates.has_changed().expect("sender alive"));
        assert_eq!(
            sync.refresh_projects().await.unwrap_err(),
            SyncError::Disposed
        );
    }

    #[tokio::test]
    async fn open_external_reports_outcome_without_touching_state() {
        let transport = healthy_backend();
        transport.always(
            "/api/project/open-cline",
            Ok(json!({"success": true, "message": "Opening in Cursor"})),
        );
        let sync = mount(&transport);
        sync.initialize().await.expect("initialize");
        let before = sync.snapshot();

        let receipt = sync.open_external("/work/demo").await.expect("open");
        assert!(receipt.success);
        assert_eq!(
            transport.last_body("/api/project/open-cline"),
            Some(json!({"project_path": "/work/demo"}))
        );

        transport.once(
            "/api/project/open-cline",
            Duration::ZERO,
            Err(server_error("/api/project/open-cline", 500)),
        );
        assert!(sync.open_external("/work/demo").await.is_err());
        assert_eq!(
            sync.open_external("   ").await.unwrap_err().kind(),
            "invalid_request"
        );
        assert_eq!(transport.calls_to("/api/project/open-cline"), 2);
        assert_eq!(sync.snapshot(), before);
    }

    #[tokio::test]
    async fn project_detail_and_assistant_query() {
        let transport = healthy_backend();
        transport.always(
            "/api/projects/my%20app",
            Ok(json!({"name": "my app", "path": "/work/my app", "health_score": 70})),
        );
        transport.always(
            "/api/ai/query",
            Ok(json!({"success": true, "response": "Add tests."})),
        );
        let sync = mount(&transport);

        let detail = sync.project_detail("my app").await.expect("detail");
        assert_eq!(detail.path, "/work/my app");
        assert_eq!(
            sync.project_detail("missing").await.unwrap_err().kind(),
            "status"
        );

        let reply = sync
            .ask_assistant("What next?", "/work/demo")
            .await
            .expect("reply");
        assert_eq!(reply.response, "Add tests.");
        assert_eq!(
            transport.last_body("/api/ai/query"),
            Some(json!({"prompt": "What next?", "project_context": "/work/demo"}))
        );
        assert_eq!(
            sync.ask_assistant(" ", "").await.unwrap_err().kind(),
            "invalid_request"
        );
        assert_eq!(transport.calls_to("/api/ai/query"), 1);
    }
}
