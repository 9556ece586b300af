//! Long-running analysis job tracking.
//!
//! A [`JobTracker`] owns one [`JobStore`] per analysis kind. `submit` posts work and
//! either stores a cached result straight away or starts a [`PollDriver`] that checks
//! the task-status endpoint every `poll_interval` until the job finishes. Views observe
//! the store through a [`ViewBinding`] and may come and go while a job is running.

mod controller;
mod poller;
mod store;
mod view;

#[cfg(test)]
pub(crate) mod fakes;

pub use controller::JobTracker;
pub use poller::PollDriver;
pub use store::JobStore;
pub use view::ViewBinding;

/// User-facing notification texts, derived from the kind's display names.
pub(crate) mod messages {
    use crate::analysis::AnalysisKind;

    pub fn started<K: AnalysisKind>(kind: &K) -> String {
        format!("{} started", kind.noun())
    }

    pub fn cache_hit<K: AnalysisKind>(kind: &K) -> String {
        format!("{} results retrieved from cache", kind.short_name())
    }

    pub fn completed<K: AnalysisKind>(kind: &K) -> String {
        format!("{} completed successfully!", kind.noun())
    }

    pub fn job_failed<K: AnalysisKind>(kind: &K, message: &str) -> String {
        format!("{} failed: {message}", kind.noun())
    }

    pub fn fetch_failed<K: AnalysisKind>(kind: &K) -> String {
        format!("Failed to fetch {} results", kind.short_name())
    }

    pub fn check_failed<K: AnalysisKind>(kind: &K) -> String {
        format!("Failed to check {} status", kind.short_name())
    }

    pub fn start_failed<K: AnalysisKind>(kind: &K) -> String {
        format!("Failed to start {}", kind.noun())
    }
}
