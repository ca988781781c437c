//! Debounced autosave.
//!
//! Each publish re-arms the debouncer with the tree as it was at that
//! instant. Only the most recent tree is kept, and it becomes ready once the
//! quiet period has elapsed without another publish. Time is passed in by the
//! caller, so the debouncer does no I/O and never reads a clock itself.

use std::sync::Arc;
use std::time::Duration;

use hub_layout::PaneNode;
use web_time::Instant;

#[derive(Debug, Clone)]
struct PendingSave {
    tree: Arc<PaneNode>,
    deadline: Instant,
}

/// Coalesces bursts of tree changes into a single save.
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    delay: Duration,
    pending: Option<PendingSave>,
}

impl SaveDebouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Capture `tree` for saving once `delay` has passed after `now`.
    ///
    /// Any tree already pending is replaced and its timer restarts.
    pub fn schedule(&mut self, tree: Arc<PaneNode>, now: Instant) {
        self.pending = Some(PendingSave {
            tree,
            deadline: now + self.delay,
        });
    }

    /// The pending tree, if its quiet period is over at `now`. Taking it
    /// disarms the debouncer.
    pub fn take_ready(&mut self, now: Instant) -> Option<Arc<PaneNode>> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending.take().map(|pending| pending.tree)
            }
            _ => None,
        }
    }

    /// Re-arm `tree` after a failed write, unless a newer tree is already
    /// pending. Returns whether `tree` was re-armed.
    pub fn retry(&mut self, tree: Arc<PaneNode>, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.schedule(tree, now);
        true
    }

    /// Drop any pending save. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }
}
