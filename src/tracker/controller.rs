//! Submission controller.
//!
//! Entry point for view code: validates the payload, enforces the single-flight rule,
//! posts the work and either records a cached result or hands over to the poll driver.

use super::messages;
use super::poller::PollDriver;
use super::store::JobStore;
use super::view::ViewBinding;
use crate::analysis::AnalysisKind;
use crate::backend::{JobBackend, SubmitResponse};
use crate::error::JobError;
use crate::identity::Identity;
use crate::model::{JobSnapshot, Notification, Severity, SubmitOutcome, TrackerConfig};
use crate::notify::Notifier;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collaborators and state shared by the controller, poll driver and views.
pub(crate) struct TrackerInner<K: AnalysisKind> {
    pub(crate) kind: K,
    pub(crate) config: TrackerConfig,
    pub(crate) backend: Arc<dyn JobBackend>,
    pub(crate) identity: Arc<dyn Identity>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) store: JobStore<K::Output>,
}

/// One job tracker per analysis kind, built once at wiring time and shared by handle.
pub struct JobTracker<K: AnalysisKind> {
    inner: Arc<TrackerInner<K>>,
}

impl<K: AnalysisKind> Clone for JobTracker<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Puts a submission that was abandoned mid-request back to `Idle`.
///
/// Dropping the `submit` future would otherwise leave the store stuck in
/// `Submitting`, refusing all further work.
struct SubmissionGuard<'a, T: Clone + Send + Sync + 'static> {
    store: &'a JobStore<T>,
    armed: bool,
}

impl<T: Clone + Send + Sync + 'static> SubmissionGuard<'_, T> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for SubmissionGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            warn!("submission abandoned before the backend answered");
            self.store.abandon_submission();
        }
    }
}

impl<K: AnalysisKind> JobTracker<K> {
    pub fn new(
        kind: K,
        config: TrackerConfig,
        backend: Arc<dyn JobBackend>,
        identity: Arc<dyn Identity>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                kind,
                config,
                backend,
                identity,
                notifier,
                store: JobStore::new(),
            }),
        }
    }

    pub fn kind(&self) -> &K {
        &self.inner.kind
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &JobStore<K::Output> {
        &self.inner.store
    }

    pub fn snapshot(&self) -> JobSnapshot<K::Output> {
        self.inner.store.snapshot()
    }

    pub fn poller(&self) -> PollDriver<K> {
        PollDriver::new(Arc::clone(&self.inner))
    }

    /// Bind a view to this tracker. Dropping the binding is the view's unmount.
    pub fn mount(&self) -> ViewBinding<K> {
        ViewBinding::new(self.clone())
    }

    /// Submit a unit of work.
    ///
    /// Never fails: transport and backend errors end up as `Failed` on the store plus
    /// one error notification. A call while a job is Submitting or Polling is dropped.
    pub async fn submit(&self, payload: impl Into<String>) -> SubmitOutcome {
        let payload = payload.into();
        let inner = &self.inner;
        let kind = &inner.kind;

        if payload.trim().is_empty() {
            warn!(kind = kind.id(), "{}", JobError::EmptyPayload);
            return SubmitOutcome::Rejected;
        }
        if !inner.store.begin_submission(&payload) {
            debug!(kind = kind.id(), %payload, "job already in flight, dropping submission");
            return SubmitOutcome::Ignored;
        }

        let mut guard = SubmissionGuard {
            store: &inner.store,
            armed: true,
        };
        let outcome = self.post(&payload).await;
        guard.disarm();
        outcome
    }

    async fn post(&self, payload: &str) -> SubmitOutcome {
        let inner = &self.inner;
        let kind = &inner.kind;

        let Some(credentials) = inner.identity.credentials() else {
            return self.fail_submission(JobError::Unauthenticated);
        };
        let body = kind.submission_body(payload);
        let response = match inner
            .backend
            .submit(kind.endpoint(), &body, &credentials)
            .await
        {
            Ok(r) => r,
            Err(e) => return self.fail_submission(e),
        };

        match response {
            SubmitResponse::Cached(body) => match kind.parse_cached(body) {
                Ok(result) => {
                    inner.store.complete_cached(result);
                    info!(kind = kind.id(), payload, "served from cache");
                    inner.notifier.notify(Notification::new(
                        messages::cache_hit(kind),
                        Severity::Success,
                    ));
                    SubmitOutcome::CacheHit
                }
                Err(e) => self.fail_submission(e),
            },
            SubmitResponse::Accepted { identifier } => {
                inner.store.mark_polling(&identifier);
                info!(kind = kind.id(), payload, %identifier, "job accepted");
                // The job may outlive the current view, so this one must not auto-dismiss.
                inner
                    .notifier
                    .notify(Notification::sticky(messages::started(kind), Severity::Info));
                if !self.poller().start(&identifier) {
                    warn!(kind = kind.id(), %identifier, "poll session already running");
                }
                SubmitOutcome::Accepted { identifier }
            }
        }
    }

    fn fail_submission(&self, e: JobError) -> SubmitOutcome {
        let inner = &self.inner;
        let notice = messages::start_failed(&inner.kind);
        error!(kind = inner.kind.id(), error = %e, "submission failed");
        inner.store.fail_submission(format!("{notice}: {e}"));
        inner
            .notifier
            .notify(Notification::new(notice, Severity::Error));
        SubmitOutcome::Failed
    }
}
