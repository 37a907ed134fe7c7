//! HTTP route handlers for the factory API.

use std::path::PathBuf;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use botforge::core::job::JobRecord;
use botforge::core::spec::Platform;
use botforge::core::stage::Stage;
use botforge::io::spec_file::{SpecInputError, parse_spec_value};
use botforge::pipeline::run_pipeline;

use crate::state::AppState;

const DEFAULT_LIST_LIMIT: usize = 50;

pub enum ApiError {
    NotFound(String),
    InvalidSpec(SpecInputError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({"error": msg}))).into_response()
            }
            ApiError::InvalidSpec(SpecInputError::Schema(details)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "spec schema validation failed", "details": details})),
            )
                .into_response(),
            ApiError::InvalidSpec(err @ SpecInputError::BadSchema(_)) => {
                ApiError::Internal(err.to_string()).into_response()
            }
            ApiError::InvalidSpec(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": err.to_string()})),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": msg}))).into_response()
            }
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::Internal(format!("{err:#}"))
}

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/forge", post(forge))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job).delete(delete_job))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": "botforge"}))
}

/// Compact view of a job for listings and forge responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub bot_name: String,
    pub platform: Platform,
    pub stage: Stage,
    pub output_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JobRecord> for JobSummary {
    fn from(job: &JobRecord) -> Self {
        Self {
            id: job.id.clone(),
            bot_name: job.spec.name.clone(),
            platform: job.spec.platform,
            stage: job.stage,
            output_path: job.output_path.clone(),
            archive_path: job.archive_path.clone(),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// POST /api/forge - validate a spec and run the pipeline to completion.
async fn forge(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<JobSummary>), ApiError> {
    let spec = parse_spec_value(body).map_err(ApiError::InvalidSpec)?;
    info!(bot = %spec.name, platform = %spec.platform, "forge requested");

    let store = state.store.clone();
    let stages = state.stages.clone();
    let job =
        tokio::task::spawn_blocking(move || run_pipeline(spec, store.as_ref(), stages.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))?;

    let status = if job.stage == Stage::Done {
        StatusCode::OK
    } else {
        warn!(job_id = %job.id, error = ?job.error, "forge failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(JobSummary::from(&job))))
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

/// GET /api/jobs - most recent jobs first.
async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<JobSummary>>, ApiError> {
    let jobs = state
        .store
        .list(params.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .map_err(internal)?;
    Ok(Json(jobs.iter().map(JobSummary::from).collect()))
}

/// GET /api/jobs/{id} - full job record.
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    match state.store.get(&id).map_err(internal)? {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::NotFound(format!("job {id} not found"))),
    }
}

/// DELETE /api/jobs/{id} - remove the record; generated files are kept.
async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&id).map_err(internal)? {
        info!(job_id = %id, "job deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("job {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use botforge::test_support::{FailAt, MemoryJobStore, fake_stages};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app_with(state: AppState) -> Router {
        Router::new().nest("/api", api_router()).with_state(state)
    }

    fn test_app() -> (Router, tempfile::TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let state = AppState::new(MemoryJobStore::default(), fake_stages(temp.path()));
        (app_with(state), temp)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn valid_spec() -> Value {
        json!({
            "name": "Api Bot",
            "platform": "web-api",
            "description": "served over http",
            "env_vars": [{"name": "API_TOKEN", "description": "upstream token"}]
        })
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (app, _temp) = test_app();
        let response = app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = body_json(response.into_body()).await;
        assert_eq!(body, json!({"status": "ok", "service": "botforge"}));
    }

    #[tokio::test]
    async fn forge_runs_pipeline_and_job_is_listed() {
        let (app, _temp) = test_app();

        let response = app
            .clone()
            .oneshot(post_json("/api/forge", valid_spec()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary: JobSummary = body_json(response.into_body()).await;
        assert_eq!(summary.stage, Stage::Done);
        assert_eq!(summary.bot_name, "api-bot");
        assert_eq!(summary.platform, Platform::WebApi);
        assert!(summary.archive_path.is_some_and(|p| p.is_file()));

        let response = app.clone().oneshot(get("/api/jobs")).await.unwrap();
        let jobs: Vec<JobSummary> = body_json(response.into_body()).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, summary.id);

        let response = app
            .oneshot(get(&format!("/api/jobs/{}", summary.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let job: JobRecord = body_json(response.into_body()).await;
        assert!(job.review_report.is_some_and(|r| r.passed));
    }

    #[tokio::test]
    async fn invalid_spec_is_unprocessable() {
        let (app, _temp) = test_app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/forge",
                json!({"name": "ok name", "platform": "irc", "description": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = body_json(response.into_body()).await;
        assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));

        let response = app.oneshot(get("/api/jobs")).await.unwrap();
        let jobs: Vec<JobSummary> = body_json(response.into_body()).await;
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn pipeline_failure_is_server_error_with_job_error() {
        let temp = tempfile::tempdir().unwrap();
        let stages = FailAt::new(fake_stages(temp.path()), Stage::Review);
        let app = app_with(AppState::new(MemoryJobStore::default(), stages));

        let response = app.oneshot(post_json("/api/forge", valid_spec())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let summary: JobSummary = body_json(response.into_body()).await;
        assert_eq!(summary.stage, Stage::Failed);
        assert!(summary.error.is_some_and(|e| e.contains("injected")));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found_and_delete_is_once() {
        let (app, _temp) = test_app();
        let response = app.clone().oneshot(get("/api/jobs/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(post_json("/api/forge", valid_spec()))
            .await
            .unwrap();
        let summary: JobSummary = body_json(response.into_body()).await;

        let delete = |id: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/jobs/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete(&summary.id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.oneshot(delete(&summary.id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let (app, _temp) = test_app();
        for name in ["one bot", "two bot", "three bot"] {
            let mut spec = valid_spec();
            spec["name"] = json!(name);
            app.clone()
                .oneshot(post_json("/api/forge", spec))
                .await
                .unwrap();
        }
        let response = app.oneshot(get("/api/jobs?limit=2")).await.unwrap();
        let jobs: Vec<JobSummary> = body_json(response.into_body()).await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].bot_name, "three-bot");
    }
}
