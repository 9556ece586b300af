use super::{JobBackend, SubmitResponse, TaskQuery};
use crate::error::{JobError, JobResult};
use crate::model::{Credentials, TaskRecord, TrackerConfig};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const TASKS_PATH: &str = "/data/api/tasks/";

#[derive(Debug, Deserialize)]
struct AcceptedBody {
    #[serde(alias = "identifier")]
    key: Option<String>,
}

/// reqwest-backed client for the annotation backend.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(cfg: &TrackerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()?;
        let base_url = Url::parse(&cfg.base_url)?;
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> JobResult<Url> {
        // Joining an absolute path keeps the scheme/host and replaces any base path.
        self.base_url
            .join(path)
            .map_err(|e| JobError::InvalidUrl(format!("{path}: {e}")))
    }

    fn authed(&self, req: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        req.bearer_auth(&credentials.token)
    }

    async fn json_or_error(resp: reqwest::Response) -> JobResult<Value> {
        if !resp.status().is_success() {
            return Err(JobError::from_response(resp).await);
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn submit(
        &self,
        endpoint: &str,
        body: &Value,
        credentials: &Credentials,
    ) -> JobResult<SubmitResponse> {
        let url = self.url(endpoint)?;
        debug!(%url, "submitting work");
        let resp = self
            .authed(self.http.post(url), credentials)
            .json(body)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(SubmitResponse::Cached(Self::json_or_error(resp).await?)),
            StatusCode::ACCEPTED => {
                let bytes = resp.bytes().await?;
                let accepted: AcceptedBody = serde_json::from_slice(&bytes)?;
                match accepted.key {
                    Some(identifier) if !identifier.is_empty() => {
                        Ok(SubmitResponse::Accepted { identifier })
                    }
                    _ => Err(JobError::MissingIdentifier),
                }
            }
            s if s.is_success() => Err(JobError::UnexpectedStatus(s.as_u16())),
            _ => Err(JobError::from_response(resp).await),
        }
    }

    async fn list_tasks(
        &self,
        query: TaskQuery<'_>,
        credentials: &Credentials,
    ) -> JobResult<Vec<TaskRecord>> {
        let mut url = self.url(TASKS_PATH)?;
        url.query_pairs_mut()
            .append_pair("user", query.user)
            .append_pair("state", query.state.as_query_str());

        let resp = self.authed(self.http.get(url), credentials).send().await?;
        let body = Self::json_or_error(resp).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_result(
        &self,
        endpoint: &str,
        identifier: &str,
        credentials: &Credentials,
    ) -> JobResult<Value> {
        let mut url = self.url(endpoint)?;
        url.query_pairs_mut().append_pair("key", identifier);

        let resp = self.authed(self.http.get(url), credentials).send().await?;
        Self::json_or_error(resp).await
    }
}
