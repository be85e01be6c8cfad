use std::sync::Arc;

use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::db::SurveyStore;
use crate::error::ServiceError;
use crate::models::Submission;

/// Institution-name lookup over the reference table.
#[derive(Clone)]
pub struct LookupService {
    store: Arc<dyn SurveyStore>,
    config: ServiceConfig,
}

impl LookupService {
    pub fn new(store: Arc<dyn SurveyStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Any fragment is accepted, including the empty one (match-all up to
    /// the configured cap).
    pub async fn search(&self, fragment: &str) -> Result<Vec<String>, ServiceError> {
        let lookup = self.store.search_schools(fragment, self.config.lookup_limit);
        match timeout(self.config.store_timeout, lookup).await {
            Ok(Ok(names)) => {
                debug!(fragment, matches = names.len(), "school lookup");
                Ok(names)
            }
            Ok(Err(err)) => {
                error!(fragment, error = %err, "error fetching school names");
                Err(ServiceError::ServiceUnavailable(err.to_string()))
            }
            Err(_) => {
                warn!(fragment, timeout = ?self.config.store_timeout, "school lookup timed out");
                Err(ServiceError::ServiceUnavailable(
                    "school lookup timed out".to_string(),
                ))
            }
        }
    }
}

/// Role-dispatched insert of completed questionnaires.
#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn SurveyStore>,
    config: ServiceConfig,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn SurveyStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Decodes a raw request body and persists it. Nothing is written when
    /// the role or the payload shape is rejected.
    pub async fn submit_value(&self, body: Value) -> Result<i64, ServiceError> {
        let submission = match Submission::from_value(body) {
            Ok(submission) => submission,
            Err(err) => {
                warn!(error = %err, "rejected form submission");
                return Err(err);
            }
        };
        self.submit(&submission).await
    }

    pub async fn submit(&self, submission: &Submission) -> Result<i64, ServiceError> {
        let role = submission.role();
        info!(
            form_type = %role,
            school = submission.school_name(),
            "received form submission"
        );

        let insert = self.store.insert_submission(submission);
        match timeout(self.config.store_timeout, insert).await {
            Ok(Ok(id)) => {
                info!(form_type = %role, id, "form submission stored");
                Ok(id)
            }
            Ok(Err(err)) => {
                error!(form_type = %role, error = %err, "error submitting form");
                Err(ServiceError::Persistence(err.to_string()))
            }
            Err(_) => {
                warn!(form_type = %role, timeout = ?self.config.store_timeout, "form submission timed out");
                Err(ServiceError::Persistence(
                    "form submission timed out".to_string(),
                ))
            }
        }
    }
}
