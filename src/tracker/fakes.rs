//! In-process collaborators for tracker tests.

use crate::analysis::AnalysisKind;
use crate::backend::{JobBackend, SubmitResponse, TaskQuery};
use crate::error::{JobError, JobResult};
use crate::identity::StaticIdentity;
use crate::model::{Credentials, Notification, Severity, TaskRecord, TaskState, TrackerConfig};
use crate::notify::Notifier;
use crate::tracker::JobTracker;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum SubmitScript {
    Cached(Value),
    Accepted(&'static str),
    /// 202 whose body carried no job identifier.
    MissingIdentifier,
    Status(u16),
}

pub enum PollScript {
    Tasks(Vec<TaskRecord>),
    Status(u16),
}

pub enum FetchScript {
    Body(Value),
    Status(u16),
}

#[derive(Default)]
pub struct ScriptedBackend {
    submits: Mutex<VecDeque<SubmitScript>>,
    polls: Mutex<VecDeque<PollScript>>,
    fetches: Mutex<VecDeque<FetchScript>>,
    pub submit_delay: Duration,
    pub list_delay: Duration,
    pub submit_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub last_user: Mutex<Option<String>>,
    pub last_filter: Mutex<Option<TaskState>>,
    pub last_body: Mutex<Option<Value>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, script: SubmitScript) -> Self {
        self.submits.lock().unwrap().push_back(script);
        self
    }

    pub fn on_poll(self, script: PollScript) -> Self {
        self.polls.lock().unwrap().push_back(script);
        self
    }

    pub fn on_fetch(self, script: FetchScript) -> Self {
        self.fetches.lock().unwrap().push_back(script);
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

fn http(status: u16) -> JobError {
    JobError::Http {
        status,
        message: "scripted failure".into(),
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit(
        &self,
        _endpoint: &str,
        body: &Value,
        _credentials: &Credentials,
    ) -> JobResult<SubmitResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock().unwrap() = Some(body.clone());
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        let script = self.submits.lock().unwrap().pop_front();
        match script {
            Some(SubmitScript::Cached(body)) => Ok(SubmitResponse::Cached(body)),
            Some(SubmitScript::Accepted(id)) => Ok(SubmitResponse::Accepted {
                identifier: id.to_string(),
            }),
            Some(SubmitScript::MissingIdentifier) => Err(JobError::MissingIdentifier),
            Some(SubmitScript::Status(code)) => Err(http(code)),
            None => Err(http(500)),
        }
    }

    async fn list_tasks(
        &self,
        query: TaskQuery<'_>,
        _credentials: &Credentials,
    ) -> JobResult<Vec<TaskRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user.lock().unwrap() = Some(query.user.to_string());
        *self.last_filter.lock().unwrap() = Some(query.state);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let script = self.polls.lock().unwrap().pop_front();
        match script {
            Some(PollScript::Tasks(tasks)) => Ok(tasks),
            Some(PollScript::Status(code)) => Err(http(code)),
            // Out of script: the job is still running upstream.
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_result(
        &self,
        _endpoint: &str,
        _identifier: &str,
        _credentials: &Credentials,
    ) -> JobResult<Value> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.fetches.lock().unwrap().pop_front();
        match script {
            Some(FetchScript::Body(body)) => Ok(body),
            Some(FetchScript::Status(code)) => Err(http(code)),
            None => Err(http(404)),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    /// Success and error notifications, i.e. those closing out a job.
    pub fn terminal(&self) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| matches!(n.severity, Severity::Success | Severity::Error))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

pub fn task(key: &str, state: TaskState, error: Option<&str>) -> TaskRecord {
    TaskRecord {
        key: key.to_string(),
        state,
        error_message: error.map(str::to_string),
    }
}

pub struct Harness<K: AnalysisKind> {
    pub tracker: JobTracker<K>,
    pub backend: Arc<ScriptedBackend>,
    pub notes: Arc<RecordingNotifier>,
}

pub fn harness<K: AnalysisKind>(kind: K, backend: ScriptedBackend) -> Harness<K> {
    harness_with(kind, backend, TrackerConfig::default())
}

pub fn harness_with<K: AnalysisKind>(
    kind: K,
    backend: ScriptedBackend,
    config: TrackerConfig,
) -> Harness<K> {
    let backend = Arc::new(backend);
    let notes = Arc::new(RecordingNotifier::default());
    let tracker = JobTracker::new(
        kind,
        config,
        backend.clone(),
        Arc::new(StaticIdentity::new("t0k3n", "alice")),
        notes.clone(),
    );
    Harness {
        tracker,
        backend,
        notes,
    }
}
