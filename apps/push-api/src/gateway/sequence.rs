//! Server-lifetime sequence numbers for push messages.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use super::events::{PushMessage, Source};

/// One monotonically increasing counter per [`Source`], each starting at 1.
#[derive(Default)]
pub struct Sequencer {
    timer: AtomicU64,
    manual: AtomicU64,
    reply: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next sequence number for a source.
    pub fn next_seq(&self, source: Source) -> u64 {
        self.counter(source).fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last sequence number handed out for a source (0 if none yet).
    pub fn current(&self, source: Source) -> u64 {
        self.counter(source).load(Ordering::Relaxed)
    }

    /// Allocate a sequence number and build the message around it.
    pub fn next_message(&self, source: Source, build: impl FnOnce(u64) -> Value) -> PushMessage {
        let seq = self.next_seq(source);
        PushMessage::new(seq, source, build(seq))
    }

    fn counter(&self, source: Source) -> &AtomicU64 {
        match source {
            Source::Timer => &self.timer,
            Source::Manual => &self.manual,
            Source::Reply => &self.reply,
        }
    }
}
