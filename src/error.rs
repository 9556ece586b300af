//! Error types for the job tracking client.
//!
//! These never reach view code: the tracker turns every `JobError` into a `Failed`
//! status, an `error` string on the store and a single notification.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    /// Network or protocol failure raised by reqwest.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP error with status {status}: {message}")]
    Http { status: u16, message: String },

    /// A 2xx answer other than 200 or 202 on submission.
    #[error("unexpected response status {0}")]
    UnexpectedStatus(u16),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("accepted response did not carry a job identifier")]
    MissingIdentifier,

    #[error("no credentials available")]
    Unauthenticated,

    #[error("work payload must not be empty")]
    EmptyPayload,

    #[error("job did not finish within {}", human(.0))]
    Timeout(Duration),
}

pub type JobResult<T> = Result<T, JobError>;

fn human(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

impl JobError {
    /// Drain a failed response into an `Http` error, keeping the body for diagnostics.
    pub async fn from_response(response: reqwest::Response) -> JobError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .map(|body| body.trim().to_string())
            .unwrap_or_else(|_| "failed to read response body".to_string());
        JobError::Http { status, message }
    }
}
