//! Keeps a dashboard's view of the backend in sync: a one-shot project load,
//! a periodic assistant/resource heartbeat, and user-triggered scans and
//! editor launches.

pub mod client;
pub mod error;
pub mod http;
pub mod schedule;
pub mod state;
pub mod synchronizer;
pub mod transport;

pub use client::{project_detail_path, DashboardApi};
pub use error::SyncError;
pub use http::{HttpTransport, DEFAULT_REQUEST_TIMEOUT};
pub use schedule::{spawn_repeating, TaskHandle};
pub use state::{FetchGroup, UpdateOutcome, ViewState};
pub use synchronizer::{ScanReport, SyncOptions, Synchronizer, HEARTBEAT_PERIOD};
pub use transport::Transport;
