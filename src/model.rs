use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification lifetime meaning "stay until dismissed".
pub const STICKY_TTL_MS: u64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// `None` polls until the backend reports a terminal state.
    #[serde(default, with = "humantime_serde")]
    pub max_poll_duration: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("annot-jobs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Current UTC time as RFC 3339, used for job and saved-result timestamps.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Lifecycle of the job tracked by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl JobStatus {
    /// Submitting or Polling: a job is outstanding and new submissions are dropped.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobStatus::Submitting | JobStatus::Polling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Point-in-time view of a job store, published to observers on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot<T> {
    pub status: JobStatus,
    pub identifier: Option<String>,
    pub payload: Option<String>,
    pub result: Option<T>,
    pub error: Option<String>,
    pub submitted_at: Option<String>,
    pub finished_at: Option<String>,
}

impl<T> Default for JobSnapshot<T> {
    fn default() -> Self {
        Self {
            status: JobStatus::Idle,
            identifier: None,
            payload: None,
            result: None,
            error: None,
            submitted_at: None,
            finished_at: None,
        }
    }
}

/// Remote task state as reported by the task-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl TaskState {
    /// Value used for the `state` query filter.
    pub fn as_query_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::InProgress => "IN_PROGRESS",
            TaskState::Completed => "COMPLETED",
            TaskState::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(alias = "identifier")]
    pub key: String,
    pub state: TaskState,
    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,
}

/// Bearer token and username handed out by the identity collaborator.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub username: String,
}

// Keep the token out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub text: String,
    pub severity: Severity,
    /// `None` leaves the lifetime to the sink, `Some(0)` never auto-dismisses.
    pub ttl_ms: Option<u64>,
}

impl Notification {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
            ttl_ms: None,
        }
    }

    pub fn sticky(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
            ttl_ms: Some(STICKY_TTL_MS),
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.ttl_ms == Some(STICKY_TTL_MS)
    }
}

/// What a `submit` call did. Failures are reported through the store, never as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty payload; nothing was sent.
    Rejected,
    /// Another job is still Submitting or Polling.
    Ignored,
    CacheHit,
    Accepted { identifier: String },
    Failed,
}
