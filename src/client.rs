use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{ErrorBody, Submission, SubmitResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// What a questionnaire needs from the server.
#[async_trait]
pub trait SurveyApi: Send + Sync {
    async fn search_schools(&self, fragment: &str) -> Result<Vec<String>, ClientError>;

    async fn submit(&self, submission: &Submission) -> Result<SubmitResponse, ClientError>;
}

#[derive(Clone)]
pub struct HttpSurveyApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSurveyApi {
    /// `base_url` is the API root, e.g. `http://localhost:3001/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(ClientError::Status { status, message })
}

#[async_trait]
impl SurveyApi for HttpSurveyApi {
    async fn search_schools(&self, fragment: &str) -> Result<Vec<String>, ClientError> {
        let response = self
            .http
            .get(self.endpoint("schools"))
            .query(&[("search", fragment)])
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        error_for_status(response)
            .await?
            .json()
            .await
            .map_err(ClientError::from_reqwest)
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmitResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint("submit-form"))
            .json(submission)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let body: SubmitResponse = error_for_status(response)
            .await?
            .json()
            .await
            .map_err(ClientError::from_reqwest)?;

        if !body.success || body.id < 1 {
            return Err(ClientError::Decode(format!(
                "submission not acknowledged: {body:?}"
            )));
        }
        Ok(body)
    }
}
