//! Repeating background tasks with an explicit cancellation handle.
//!
//! Time comes from `tokio::time`, so a runtime with a paused clock drives
//! these tasks deterministically.

use std::future::Future;
use std::time::Duration;
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};
use tracing::debug;

/// Owns a spawned repeating task. Cancelling (or dropping) the handle stops
/// the schedule and aborts any tick bodies still in flight.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            join.abort();
            debug!(event = "schedule_cancel", task = self.name);
        }
    }

    pub fn is_active(&self) -> bool {
        self.join
            .as_ref()
            .map(|join| !join.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs `tick` now and then every `period`.
///
/// Each tick body runs as its own task so a slow tick never delays the
/// cadence; overlapping bodies are allowed and must be reconciled by the
/// caller.
pub fn spawn_repeating<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    in_flight.spawn(tick());
                }
                Some(_) = in_flight.join_next() => {}
            }
        }
        in_flight.abort_all();
    });
    TaskHandle {
        name,
        shutdown,
        join: Some(join),
    }
}
