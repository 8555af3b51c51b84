//! Debounced autosave scheduling.
//!
//! Every edit restarts a single countdown; the save fires only after the
//! configured quiet period, so a burst of keystrokes produces one write.
//! The scheduler owns no content — it only tracks which note is dirty and
//! when the pending save is due. The engine serializes the buffer at fire
//! time and clears the dirty flag in the same step, so edits arriving during
//! the in-flight write re-dirty the buffer and schedule a fresh save.

use std::time::{Duration, Instant};

use super::model::NoteId;

/// Debounce interval for rich (rendered markdown) editing.
pub const RICH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounce interval for raw source editing, where edits are burstier.
pub const SOURCE_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct AutosaveScheduler {
    /// The note the pending save belongs to.
    owner: Option<NoteId>,
    deadline: Option<Instant>,
    rich_debounce: Duration,
    source_debounce: Duration,
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        AutosaveScheduler {
            owner: None,
            deadline: None,
            rich_debounce: RICH_DEBOUNCE,
            source_debounce: SOURCE_DEBOUNCE,
        }
    }
}

impl AutosaveScheduler {
    pub fn with_intervals(rich: Duration, source: Duration) -> Self {
        AutosaveScheduler {
            owner: None,
            deadline: None,
            rich_debounce: rich,
            source_debounce: source,
        }
    }

    /// Record an edit to `id`, restarting the countdown.
    pub fn mark_dirty(&mut self, id: &NoteId, source_mode: bool, now: Instant) {
        let debounce = if source_mode {
            self.source_debounce
        } else {
            self.rich_debounce
        };
        self.owner = Some(id.clone());
        self.deadline = Some(now + debounce);
    }

    pub fn is_dirty(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<&NoteId> {
        self.owner.as_ref()
    }

    /// The next instant at which [`Self::take_due`] could fire, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// If the countdown has elapsed, consume the pending save and return its
    /// owner. Clearing here is what lets edits during the write re-arm.
    pub fn take_due(&mut self, now: Instant) -> Option<NoteId> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.owner.take()
            }
            _ => None,
        }
    }

    /// Consume the pending save regardless of the countdown (flush).
    pub fn take(&mut self) -> Option<NoteId> {
        self.deadline = None;
        self.owner.take()
    }

    /// Drop any pending save without firing it.
    pub fn cancel(&mut self) {
        self.owner = None;
        self.deadline = None;
    }

    /// Re-attribute a pending save after the owner was renamed underneath it.
    pub fn adopt(&mut self, old: &NoteId, new: &NoteId) {
        if self.owner.as_ref() == Some(old) {
            self.owner = Some(new.clone());
        }
    }
}
