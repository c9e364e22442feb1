//! Background task that pushes a timer message to every session on a fixed
//! interval.
//!
//! Started lazily by the first connection and at most once per process. The
//! task stops only on [`PushScheduler::shutdown`], which is checked between
//! ticks; a broadcast that has begun always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use utoipa::ToSchema;

use super::events::{EventName, Source};
use super::fanout::Broadcaster;
use super::sequence::Sequencer;

/// Stand-in deadline for intervals too long to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    NotStarted,
    Running,
    Stopped,
}

pub struct PushScheduler {
    interval: Duration,
    broadcaster: Arc<Broadcaster>,
    sequencer: Arc<Sequencer>,
    started: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl PushScheduler {
    pub fn new(interval: Duration, broadcaster: Arc<Broadcaster>, sequencer: Arc<Sequencer>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            interval,
            broadcaster,
            sequencer,
            started: AtomicBool::new(false),
            handle: Mutex::new(None),
            shutdown,
        }
    }

    /// Start the push loop unless it has already been started (or shut down).
    ///
    /// Returns `true` only for the single call that spawned the task. Must be
    /// called from within a tokio runtime.
    pub fn start(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let mut handle = self.handle.lock();
        *handle = Some(tokio::spawn(run(
            self.interval,
            self.broadcaster.clone(),
            self.sequencer.clone(),
            self.shutdown.subscribe(),
        )));

        tracing::info!(interval_secs = self.interval.as_secs(), "periodic push started");
        true
    }

    pub fn state(&self) -> SchedulerState {
        if *self.shutdown.borrow() {
            SchedulerState::Stopped
        } else if self.started.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::NotStarted
        }
    }

    /// Signal the loop to stop and wait for it to finish its current tick.
    /// Also prevents any later `start`.
    pub async fn shutdown(&self) {
        self.started.store(true, Ordering::Release);
        self.shutdown.send_replace(true);

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::error!(?err, "periodic push task panicked");
            }
            tracing::info!("periodic push stopped");
        }
    }
}

async fn run(
    period: Duration,
    broadcaster: Arc<Broadcaster>,
    sequencer: Arc<Sequencer>,
    mut shutdown: watch::Receiver<bool>,
) {
    // First push fires one full interval after start.
    let now = Instant::now();
    let first = now.checked_add(period).unwrap_or(now + FAR_FUTURE);
    let mut ticker = time::interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        if *shutdown.borrow() {
            break;
        }

        let message = sequencer.next_message(Source::Timer, |seq| {
            serde_json::Value::String(format!("Server Push Message #{seq}"))
        });
        let report = broadcaster
            .broadcast(EventName::SERVER_RESPONSE, &message)
            .await;

        tracing::info!(
            source = message.source.as_str(),
            seq = message.seq,
            timestamp = %message.timestamp,
            recipients = report.recipients,
            delivered = report.delivered,
            "periodic push"
        );
    }
}
