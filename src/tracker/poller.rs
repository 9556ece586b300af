//! Poll driver.
//!
//! One spawned task per poll session. Ticks run inside a single loop, so a slow
//! status query delays the next tick instead of overlapping it; the session
//! generation guards the terminal write against anything that outlives `stop()`.

use super::controller::TrackerInner;
use super::messages;
use super::store::Terminal;
use crate::analysis::AnalysisKind;
use crate::backend::TaskQuery;
use crate::error::JobError;
use crate::model::{Notification, Severity, TaskState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

enum TickOutcome<T> {
    /// The job is not reported yet; wait for the next tick.
    Pending,
    Done {
        terminal: Terminal<T>,
        notice: Notification,
    },
}

pub struct PollDriver<K: AnalysisKind> {
    inner: Arc<TrackerInner<K>>,
}

impl<K: AnalysisKind> PollDriver<K> {
    pub(crate) fn new(inner: Arc<TrackerInner<K>>) -> Self {
        Self { inner }
    }

    /// Start polling for `identifier`. Returns `false` if a session already exists.
    pub fn start(&self, identifier: &str) -> bool {
        let inner = Arc::clone(&self.inner);
        let identifier = identifier.to_string();
        self.inner.store.open_session(move |generation| {
            tokio::spawn(async move {
                PollDriver { inner }.run(generation, identifier).await;
            })
        })
    }

    /// Cancel the active session. Safe to call any number of times.
    pub fn stop(&self) -> bool {
        self.inner.store.stop()
    }

    pub fn is_active(&self) -> bool {
        self.inner.store.has_session()
    }

    async fn run(self, generation: u64, identifier: String) {
        let inner = &self.inner;
        let kind = inner.kind.id();
        let mut interval =
            tokio::time::interval(inner.config.poll_interval.max(MIN_POLL_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let started = Instant::now();
        let mut ticks = 0u64;

        loop {
            // The first tick completes immediately.
            interval.tick().await;
            if !inner.store.is_current(generation) {
                return;
            }
            ticks += 1;
            debug!(kind, %identifier, tick = ticks, "checking task status");

            let (terminal, notice) = match self.tick(&identifier).await {
                TickOutcome::Done { terminal, notice } => (terminal, notice),
                TickOutcome::Pending => match inner.config.max_poll_duration {
                    Some(limit) if started.elapsed() >= limit => self.timed_out(limit),
                    _ => continue,
                },
            };

            if inner.store.finish(generation, terminal) {
                info!(kind, %identifier, ticks, "poll session finished");
                inner.notifier.notify(notice);
            }
            return;
        }
    }

    async fn tick(&self, identifier: &str) -> TickOutcome<K::Output> {
        let inner = &self.inner;
        let kind = &inner.kind;

        let Some(credentials) = inner.identity.credentials() else {
            return self.check_failed(JobError::Unauthenticated);
        };
        let query = TaskQuery {
            user: &credentials.username,
            state: kind.status_filter(),
        };
        // Transport errors end the session; there is no retry.
        let tasks = match inner.backend.list_tasks(query, &credentials).await {
            Ok(tasks) => tasks,
            Err(e) => return self.check_failed(e),
        };
        let Some(task) = tasks.into_iter().find(|t| t.key == identifier) else {
            return TickOutcome::Pending;
        };

        if kind.is_success(&task) {
            let fetched = inner
                .backend
                .fetch_result(kind.endpoint(), identifier, &credentials)
                .await
                .and_then(|body| kind.parse_fetched(body));
            return match fetched {
                Ok(result) => TickOutcome::Done {
                    terminal: Terminal::Completed(result),
                    notice: Notification::new(messages::completed(kind), Severity::Success),
                },
                Err(e) => {
                    let notice = messages::fetch_failed(kind);
                    warn!(kind = kind.id(), identifier, error = %e, "result fetch failed");
                    TickOutcome::Done {
                        terminal: Terminal::Failed(format!("{notice}: {e}")),
                        notice: Notification::new(notice, Severity::Error),
                    }
                }
            };
        }

        let reported = task
            .error_message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| (task.state == TaskState::Rejected).then(|| "task was rejected".into()));
        match reported {
            Some(message) => {
                warn!(kind = kind.id(), identifier, %message, "job reported failure");
                TickOutcome::Done {
                    notice: Notification::new(
                        messages::job_failed(kind, &message),
                        Severity::Error,
                    ),
                    terminal: Terminal::Failed(message),
                }
            }
            None => TickOutcome::Pending,
        }
    }

    fn check_failed(&self, e: JobError) -> TickOutcome<K::Output> {
        let notice = messages::check_failed(&self.inner.kind);
        warn!(kind = self.inner.kind.id(), error = %e, "status query failed");
        TickOutcome::Done {
            terminal: Terminal::Failed(format!("{notice}: {e}")),
            notice: Notification::new(notice, Severity::Error),
        }
    }

    fn timed_out(&self, limit: Duration) -> (Terminal<K::Output>, Notification) {
        let kind = &self.inner.kind;
        let message = format!("{} failed: {}", kind.noun(), JobError::Timeout(limit));
        warn!(kind = kind.id(), "{message}");
        (
            Terminal::Failed(message.clone()),
            Notification::new(message, Severity::Error),
        )
    }
}
