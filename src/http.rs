use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{ErrorBody, SubmitResponse};
use crate::service::{LookupService, SubmissionService};

#[derive(Clone)]
pub struct AppState {
    lookup: LookupService,
    submission: SubmissionService,
}

impl AppState {
    pub fn new(lookup: LookupService, submission: SubmissionService) -> Self {
        Self { lookup, submission }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/schools", get(schools_handler))
        .route("/api/submit-form", post(submit_handler))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("server is running on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server terminated")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn trace_request(request: Request, next: Next) -> Response {
    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    async move {
        let response = next.run(request).await;
        info!(status = response.status().as_u16(), "handled request");
        response
    }
    .instrument(span)
    .await
}

#[derive(Debug, Default, Deserialize)]
struct SchoolQuery {
    search: Option<String>,
}

async fn schools_handler(
    State(state): State<AppState>,
    query: Result<Query<SchoolQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, AppError> {
    let fragment = match query {
        Ok(Query(query)) => query.search.unwrap_or_default(),
        Err(rejection) => {
            warn!(error = %rejection, "malformed school query, using empty fragment");
            String::new()
        }
    };
    let names = state.lookup.search(&fragment).await?;
    Ok(Json(names))
}

async fn submit_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection, "unreadable form submission body");
        AppError::internal()
    })?;
    let id = state.submission.submit_value(body).await?;
    Ok(Json(SubmitResponse { success: true, id }))
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidRole(_) => AppError::bad_request("Invalid form type"),
            ServiceError::InvalidPayload(_)
            | ServiceError::ServiceUnavailable(_)
            | ServiceError::Persistence(_) => AppError::internal(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::db::memory::MemoryStore;
    use crate::models::Role;
    use crate::questions::TEACHER;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryStore>) -> Router {
        let config = ServiceConfig::default();
        router(AppState::new(
            LookupService::new(store.clone(), config),
            SubmissionService::new(store, config),
        ))
    }

    fn schools() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_schools([
            "Escuela Normal Superior",
            "escuela rural el paraíso",
            "Colegio Departamental",
            "Escuela Normal Superior",
        ]))
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/submit-form")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn answered(questions: &[&str]) -> Value {
        questions
            .iter()
            .map(|question| (question.to_string(), json!("Casi siempre")))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }

    #[tokio::test]
    async fn schools_returns_sorted_distinct_matches() {
        let response = app(schools())
            .oneshot(
                Request::builder()
                    .uri("/api/schools?search=ESCU")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!(["Escuela Normal Superior", "escuela rural el paraíso"])
        );
    }

    #[tokio::test]
    async fn schools_without_search_matches_all() {
        let response = app(schools())
            .oneshot(
                Request::builder()
                    .uri("/api/schools")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        let names = read_json(response).await;
        assert_eq!(names.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn schools_failure_is_500_with_error_body() {
        let store = schools();
        store.set_unavailable(true).await;
        let response = app(store)
            .oneshot(
                Request::builder()
                    .uri("/api/schools?search=Esc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn unknown_form_type_is_400_and_writes_nothing() {
        let store = schools();
        let response = app(store.clone())
            .oneshot(post_json(json!({
                "formType": "rectores",
                "schoolName": "Escuela Normal Superior"
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await, json!({ "error": "Invalid form type" }));
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn schools_with_malformed_query_matches_all() {
        let response = app(schools())
            .oneshot(
                Request::builder()
                    .uri("/api/schools?search=a&search=b")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!([
                "Colegio Departamental",
                "Escuela Normal Superior",
                "escuela rural el paraíso"
            ])
        );
    }

    #[tokio::test]
    async fn non_json_body_is_500_and_writes_nothing() {
        let store = schools();
        let response = app(store.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/submit-form")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Internal server error" }));
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn body_without_content_type_is_500() {
        let response = app(schools())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/submit-form")
                    .body(Body::from(r#"{"formType":"acudientes","schoolName":"Colegio Departamental"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn missing_school_name_is_500_and_writes_nothing() {
        let store = schools();
        let response = app(store.clone())
            .oneshot(post_json(json!({
                "formType": "acudientes",
                "studentGrades": ["5°"]
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Internal server error" }));
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn teacher_submission_stores_combined_grades() {
        let store = schools();
        let response = app(store.clone())
            .oneshot(post_json(json!({
                "formType": "docentes",
                "schoolName": "Escuela Normal Superior",
                "yearsOfExperience": "Más de 5",
                "teachingGradesEarly": ["1°", "3°"],
                "teachingGradesLate": ["7°"],
                "schedule": ["Mañana", "Tarde"],
                "feedbackSources": ["Rector/a"],
                "comunicacion": answered(TEACHER.comunicacion),
                "practicas_pedagogicas": answered(TEACHER.practicas_pedagogicas),
                "convivencia": answered(TEACHER.convivencia)
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "success": true, "id": 1 }));

        let stored = store.submissions(Role::Teacher).await;
        let [crate::models::Submission::Teacher(teacher)] = stored.as_slice() else {
            panic!("expected one teacher row, got {stored:?}");
        };
        assert_eq!(teacher.assigned_grades(), vec!["1°", "3°", "7°"]);
        assert_eq!(teacher.ratings.practicas_pedagogicas.len(), 8);
    }

    #[tokio::test]
    async fn store_failure_on_submit_is_500() {
        let store = schools();
        store.set_unavailable(true).await;
        let response = app(store)
            .oneshot(post_json(json!({
                "formType": "acudientes",
                "schoolName": "Colegio Departamental",
                "studentGrades": ["5°"]
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
