//! View binding adapter.
//!
//! A view mounts a binding to read the tracker reactively. Every accessor reads the
//! store's current snapshot, so a binding never disagrees with itself or with other
//! views. The only state a binding owns is which failure its user dismissed; that
//! goes away with the binding, while the store, the result and any running poll
//! session are left untouched so a remounted view picks up where the last one left off.

use super::controller::JobTracker;
use crate::analysis::AnalysisKind;
use crate::model::{JobSnapshot, JobStatus, SubmitOutcome};
use tokio::sync::watch;
use tracing::debug;

pub struct ViewBinding<K: AnalysisKind> {
    tracker: JobTracker<K>,
    rx: watch::Receiver<JobSnapshot<K::Output>>,
    /// `finished_at` of the failure hidden by `dismiss_error`.
    dismissed: Option<String>,
}

impl<K: AnalysisKind> ViewBinding<K> {
    pub(crate) fn new(tracker: JobTracker<K>) -> Self {
        let rx = tracker.store().subscribe();
        debug!(kind = tracker.kind().id(), "view mounted");
        Self {
            tracker,
            rx,
            dismissed: None,
        }
    }

    pub async fn submit(&mut self, payload: impl Into<String>) -> SubmitOutcome {
        self.tracker.submit(payload).await
    }

    pub fn is_loading(&self) -> bool {
        self.rx.borrow().status == JobStatus::Submitting
    }

    pub fn is_polling(&self) -> bool {
        self.rx.borrow().status == JobStatus::Polling
    }

    pub fn error(&self) -> Option<String> {
        let snap = self.rx.borrow();
        let error = snap.error.as_ref()?;
        match (&self.dismissed, &snap.finished_at) {
            (Some(hidden), Some(finished)) if hidden == finished => None,
            _ => Some(error.clone()),
        }
    }

    pub fn result(&self) -> Option<K::Output> {
        self.rx.borrow().result.clone()
    }

    pub fn status(&self) -> JobStatus {
        self.rx.borrow().status
    }

    pub fn snapshot(&self) -> JobSnapshot<K::Output> {
        self.rx.borrow().clone()
    }

    /// Hide the current error in this view only. A later failure shows again.
    pub fn dismiss_error(&mut self) {
        self.dismissed = self.rx.borrow().finished_at.clone();
    }

    /// Wait for the next store transition. Returns `false` once the tracker is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until no job is in flight and return the resulting status.
    pub async fn settled(&mut self) -> JobStatus {
        loop {
            let status = self.rx.borrow_and_update().status;
            if !status.is_in_flight() || self.rx.changed().await.is_err() {
                return status;
            }
        }
    }

    /// Explicit unmount; equivalent to dropping the binding.
    pub fn unmount(self) {}
}

impl<K: AnalysisKind> Drop for ViewBinding<K> {
    fn drop(&mut self) {
        debug!(kind = self.tracker.kind().id(), "view unmounted");
    }
}
