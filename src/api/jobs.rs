//! Background job endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::AppResult;

#[derive(Serialize, ToSchema)]
pub struct JobAccepted {
    pub job: String,
    pub status: String,
}

/// Names of the registered jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Registered jobs", body = Vec<String>)
    )
)]
pub async fn list_jobs(State(state): State<crate::AppState>) -> Json<Vec<&'static str>> {
    Json(state.services.jobs.names())
}

/// Queue a job for immediate execution. The body, if any, becomes the job payload.
#[utoipa::path(
    post,
    path = "/jobs/{name}",
    tag = "jobs",
    params(("name" = String, Path, description = "Job name")),
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 404, description = "Unknown job"),
        (status = 500, description = "Job queue full")
    )
)]
pub async fn trigger_job(
    State(state): State<crate::AppState>,
    Path(name): Path<String>,
    payload: Option<Json<Value>>,
) -> AppResult<(StatusCode, Json<JobAccepted>)> {
    let payload = payload.map(|Json(value)| value).unwrap_or(Value::Null);
    state.services.jobs.trigger(&name, payload)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job: name,
            status: "queued".to_string(),
        }),
    ))
}
