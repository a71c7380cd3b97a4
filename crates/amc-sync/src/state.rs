use amc_core::{AggregateStats, AssistantStatus, ProjectSummary, ResourceSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the view renders. Each slice stays `None` until its first
/// successful fetch and is only ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub projects: Option<Vec<ProjectSummary>>,
    pub stats: Option<AggregateStats>,
    pub assistants: Option<AssistantStatus>,
    pub resources: Option<ResourceSnapshot>,
    pub loading: bool,
    pub scanning: bool,
    pub projects_updated_at: Option<DateTime<Utc>>,
    pub heartbeat_updated_at: Option<DateTime<Utc>>,
}

impl ViewState {
    pub fn mounting() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn project_list(&self) -> &[ProjectSummary] {
        self.projects.as_deref().unwrap_or(&[])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchGroup {
    /// Project list plus aggregate stats.
    Projects,
    /// Assistant availability plus host resources.
    Heartbeat,
}

impl FetchGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchGroup::Projects => "projects",
            FetchGroup::Heartbeat => "heartbeat",
        }
    }
}

/// What happened to a completed group fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// A newer fetch of the same group had already been applied.
    Stale,
    /// The synchronizer was torn down before the response arrived.
    Discarded,
}

/// Per-group ticket bookkeeping: a fetch may only overwrite its slices when
/// its ticket is at least as new as the last one applied.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub view: ViewState,
    pub projects_applied: u64,
    pub heartbeat_applied: u64,
}

impl Ledger {
    pub fn new(view: ViewState) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    pub fn admit(&mut self, group: FetchGroup, ticket: u64) -> bool {
        let applied = match group {
            FetchGroup::Projects => &mut self.projects_applied,
            FetchGroup::Heartbeat => &mut self.heartbeat_applied,
        };
        if ticket < *applied {
            return false;
        }
        *applied = ticket;
        true
    }
}
