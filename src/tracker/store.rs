//! Job store: the single source of truth for one analysis kind.
//!
//! State is published through a `watch` channel so any number of views can observe it.
//! The poll session lives next to the state; every terminal write is keyed by the
//! session's generation so a late tick can never resurrect or double-finish a job.

use crate::model::{now_rfc3339, JobSnapshot, JobStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Terminal outcome written by the poll driver.
#[derive(Debug)]
pub(crate) enum Terminal<T> {
    Completed(T),
    Failed(String),
}

struct PollSession {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct JobStore<T> {
    state: watch::Sender<JobSnapshot<T>>,
    session: Mutex<Option<PollSession>>,
    generations: AtomicU64,
}

impl<T> Default for JobStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JobStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (state, _) = watch::channel(JobSnapshot::default());
        Self {
            state,
            session: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> JobSnapshot<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot<T>> {
        self.state.subscribe()
    }

    /// Whether a poll session (the repeating timer) currently exists.
    pub fn has_session(&self) -> bool {
        self.session_slot().is_some()
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<PollSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `Submitting` unless a job is already in flight.
    ///
    /// Check and write happen under the channel's lock, so two racing callers
    /// cannot both win.
    pub(crate) fn begin_submission(&self, payload: &str) -> bool {
        self.state.send_if_modified(|s| {
            if s.status.is_in_flight() {
                return false;
            }
            *s = JobSnapshot {
                status: JobStatus::Submitting,
                payload: Some(payload.to_string()),
                submitted_at: Some(now_rfc3339()),
                ..JobSnapshot::default()
            };
            true
        })
    }

    pub(crate) fn abandon_submission(&self) {
        self.state.send_if_modified(|s| {
            if s.status != JobStatus::Submitting {
                return false;
            }
            s.status = JobStatus::Idle;
            true
        });
    }

    pub(crate) fn complete_cached(&self, result: T) {
        self.state.send_modify(|s| {
            s.status = JobStatus::Completed;
            s.result = Some(result);
            s.error = None;
            s.finished_at = Some(now_rfc3339());
        });
    }

    pub(crate) fn fail_submission(&self, message: String) {
        self.state.send_modify(|s| {
            s.status = JobStatus::Failed;
            s.error = Some(message);
            s.finished_at = Some(now_rfc3339());
        });
    }

    pub(crate) fn mark_polling(&self, identifier: &str) {
        self.state.send_modify(|s| {
            s.status = JobStatus::Polling;
            s.identifier = Some(identifier.to_string());
        });
    }

    /// Install a poll session unless one already exists.
    ///
    /// `spawn` receives the new session's generation and returns the task handle.
    pub(crate) fn open_session(&self, spawn: impl FnOnce(u64) -> JoinHandle<()>) -> bool {
        let mut slot = self.session_slot();
        if slot.is_some() {
            return false;
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = spawn(generation);
        *slot = Some(PollSession { generation, handle });
        debug!(generation, "poll session opened");
        true
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        matches!(self.session_slot().as_ref(), Some(s) if s.generation == generation)
    }

    /// Record a terminal outcome for the session `generation` and tear the session down.
    ///
    /// Returns `false` when the session is gone or was replaced; the caller must then
    /// drop the outcome without notifying.
    pub(crate) fn finish(&self, generation: u64, terminal: Terminal<T>) -> bool {
        let mut slot = self.session_slot();
        match slot.as_ref() {
            Some(s) if s.generation == generation => {}
            _ => {
                warn!(generation, "discarding terminal outcome from stale poll session");
                return false;
            }
        }
        // The finishing task owns this handle; dropping it detaches without aborting.
        slot.take();
        self.state.send_modify(|s| {
            match terminal {
                Terminal::Completed(result) => {
                    s.status = JobStatus::Completed;
                    s.result = Some(result);
                    s.error = None;
                }
                Terminal::Failed(message) => {
                    s.status = JobStatus::Failed;
                    s.error = Some(message);
                }
            }
            s.identifier = None;
            s.finished_at = Some(now_rfc3339());
        });
        true
    }

    /// Cancel the poll session, if any. Idempotent.
    ///
    /// A job still marked `Polling` drops back to `Idle` so the store accepts new work.
    pub(crate) fn stop(&self) -> bool {
        let Some(session) = self.session_slot().take() else {
            return false;
        };
        session.handle.abort();
        self.state.send_if_modified(|s| {
            if s.status != JobStatus::Polling {
                return false;
            }
            s.status = JobStatus::Idle;
            s.identifier = None;
            true
        });
        debug!(generation = session.generation, "poll session stopped");
        true
    }
}
