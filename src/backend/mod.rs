//! Remote collaborators: submission, task-status and result-retrieval endpoints.

mod http;

pub use http::HttpBackend;

use crate::error::JobResult;
use crate::model::{Credentials, TaskRecord, TaskState};
use async_trait::async_trait;
use serde_json::Value;

/// How the backend answered a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResponse {
    /// 200: the result was already materialised.
    Cached(Value),
    /// 202: a job was queued and must be polled.
    Accepted { identifier: String },
}

/// Filter for task-status queries.
#[derive(Debug, Clone, Copy)]
pub struct TaskQuery<'a> {
    pub user: &'a str,
    pub state: TaskState,
}

#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit(
        &self,
        endpoint: &str,
        body: &Value,
        credentials: &Credentials,
    ) -> JobResult<SubmitResponse>;

    async fn list_tasks(
        &self,
        query: TaskQuery<'_>,
        credentials: &Credentials,
    ) -> JobResult<Vec<TaskRecord>>;

    async fn fetch_result(
        &self,
        endpoint: &str,
        identifier: &str,
        credentials: &Credentials,
    ) -> JobResult<Value>;
}
