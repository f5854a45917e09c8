//! Axum route handlers for the Outreach API.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::ModelClient;
use crate::outreach::batch::{validate_limit, BatchRunner};
use crate::outreach::export::{export_filename, to_csv};
use crate::outreach::ingest::read_contacts;
use crate::outreach::jobs::{BatchJob, BatchJobs, JobProgress, JobStatus};
use crate::outreach::models::{
    BatchResult, Contact, ContactFailure, ContactResult, SenderProfile,
};
use crate::outreach::pipeline::ContactPipeline;
use crate::outreach::rate_limit::{FixedDelay, NoDelay, RateLimiter};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Multipart form accepted by `POST /api/v1/outreach/batches`.
#[derive(Debug, Default)]
struct BatchForm {
    file: Option<Bytes>,
    sender_name: String,
    sender_title: String,
    sender_company: String,
    calendar_link: String,
    limit: Option<usize>,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateBatchResponse {
    pub batch_id: Uuid,
    pub status: JobStatus,
    /// Contacts that will be processed.
    pub total: usize,
    /// Usable contacts found in the upload.
    pub contacts_available: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub batch_id: Uuid,
    pub status: JobStatus,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub progress: f32,
    pub current_contact: Option<String>,
    pub failures: Vec<ContactFailure>,
    pub total_emails: usize,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<BatchJob> for BatchStatusResponse {
    fn from(job: BatchJob) -> Self {
        Self {
            batch_id: job.id,
            status: job.status,
            total: job.total,
            processed: job.processed,
            succeeded: job.succeeded,
            progress: job.progress,
            current_contact: job.current_contact,
            failures: job.failures,
            total_emails: job.result.as_ref().map_or(0, |r| r.total_emails()),
            summary: job.result.as_ref().map(|r| r.summary()),
            error: job.error,
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResultsResponse {
    pub batch_id: Uuid,
    pub summary: String,
    pub results: Vec<ContactResult>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/outreach/batches
///
/// Validates the upload and sender profile, then starts generation on a
/// background task. Every validation error is returned before any model call.
pub async fn handle_create_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreateBatchResponse>), AppError> {
    let form = read_batch_form(multipart).await?;

    let file = form
        .file
        .ok_or_else(|| AppError::Validation("Upload a CSV file in the `file` field".to_string()))?;
    let contacts = read_contacts(&file)?;

    let sender = SenderProfile {
        name: require_field("sender_name", form.sender_name)?,
        title: require_field("sender_title", form.sender_title)?,
        company: require_field("sender_company", form.sender_company)?,
        calendar_link: require_field("calendar_link", form.calendar_link)?,
    };

    let config = &state.config;
    let limit = form.limit.unwrap_or_else(|| {
        config
            .default_contact_limit
            .min(config.max_contacts_per_batch)
            .min(contacts.len())
    });
    validate_limit(limit, contacts.len(), config.max_contacts_per_batch)?;

    let model = model_client(&state, form.api_key)?;
    let rate_limiter: Arc<dyn RateLimiter> = if config.email_call_pause.is_zero() {
        Arc::new(NoDelay)
    } else {
        Arc::new(FixedDelay(config.email_call_pause))
    };
    let pipeline = ContactPipeline::new(model, rate_limiter, config.model_call_timeout);
    let runner = BatchRunner::new(pipeline, config.max_contacts_per_batch);

    let (batch_id, cancel) = state.jobs.create(limit).await;
    info!(
        "Starting batch {batch_id}: {limit} of {} contacts",
        contacts.len()
    );

    let contacts_available = contacts.len();
    state.jobs.spawn(run_batch(
        state.jobs.clone(),
        batch_id,
        cancel,
        runner,
        contacts,
        sender,
        limit,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateBatchResponse {
            batch_id,
            status: JobStatus::Running,
            total: limit,
            contacts_available,
        }),
    ))
}

/// GET /api/v1/outreach/batches/:id
pub async fn handle_get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<BatchStatusResponse>, AppError> {
    let job = find_job(&state, batch_id).await?;
    Ok(Json(job.into()))
}

/// GET /api/v1/outreach/batches/:id/results
pub async fn handle_get_results(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<BatchResultsResponse>, AppError> {
    let job = find_job(&state, batch_id).await?;
    let result = finished_result(job)?;
    Ok(Json(BatchResultsResponse {
        batch_id,
        summary: result.summary(),
        results: result.results,
    }))
}

/// GET /api/v1/outreach/batches/:id/export
///
/// Downloads the finished batch as a BOM-prefixed CSV named after today's date.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let job = find_job(&state, batch_id).await?;
    let result = finished_result(job)?;
    let csv = to_csv(&result.results)?;
    let filename = export_filename(Utc::now().date_naive());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

/// DELETE /api/v1/outreach/batches/:id
///
/// Requests cancellation. The contact in flight finishes first.
pub async fn handle_cancel_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.jobs.cancel(batch_id).await {
        info!("Cancellation requested for batch {batch_id}");
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::NotFound(format!("Batch {batch_id} not found")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Runs a batch to the end and records the outcome on its job.
async fn run_batch(
    jobs: BatchJobs,
    batch_id: Uuid,
    cancel: CancellationToken,
    runner: BatchRunner,
    contacts: Vec<Contact>,
    sender: SenderProfile,
    limit: usize,
) {
    let progress = JobProgress::new(jobs.clone(), batch_id);
    match runner
        .run(&contacts, &sender, limit, &progress, &cancel)
        .await
    {
        Ok(result) => jobs.finish(batch_id, result).await,
        Err(e) => {
            error!("Batch {batch_id} failed to start: {e}");
            jobs.fail(batch_id, e.to_string()).await;
        }
    }
}

async fn read_batch_form(mut multipart: Multipart) -> Result<BatchForm, AppError> {
    let mut form = BatchForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            form.file = Some(bytes);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;
        let value = value.trim().to_string();

        match name.as_str() {
            "sender_name" => form.sender_name = value,
            "sender_title" => form.sender_title = value,
            "sender_company" => form.sender_company = value,
            "calendar_link" => form.calendar_link = value,
            "limit" if !value.is_empty() => {
                let limit = value.parse::<usize>().map_err(|_| {
                    AppError::Validation(format!("limit must be a positive integer, got '{value}'"))
                })?;
                form.limit = Some(limit);
            }
            "api_key" if !value.is_empty() => form.api_key = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

fn require_field(name: &str, value: String) -> Result<String, AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{name} cannot be empty")));
    }
    Ok(value)
}

/// Picks the request's key over the server-wide one.
fn model_client(
    state: &AppState,
    request_key: Option<String>,
) -> Result<Arc<dyn ModelClient>, AppError> {
    let api_key = request_key
        .or_else(|| state.config.anthropic_api_key.clone())
        .ok_or_else(|| {
            AppError::Validation("Please provide a Claude API key (api_key)".to_string())
        })?;
    state
        .models
        .client(api_key)
        .map_err(|e| AppError::Llm(e.to_string()))
}

async fn find_job(state: &AppState, batch_id: Uuid) -> Result<BatchJob, AppError> {
    state
        .jobs
        .get(batch_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Batch {batch_id} not found")))
}

fn finished_result(job: BatchJob) -> Result<BatchResult, AppError> {
    match (job.status, job.result) {
        (_, Some(result)) => Ok(result),
        (JobStatus::Running, None) => Err(AppError::Conflict(format!(
            "Batch {} is still running",
            job.id
        ))),
        (_, None) => Err(AppError::Conflict(format!(
            "Batch {} produced no results: {}",
            job.id,
            job.error.unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::outreach::testing::{contact, sender, ScriptedModel};

    fn runner() -> BatchRunner {
        let pipeline = ContactPipeline::new(
            Arc::new(ScriptedModel::well_formed()),
            Arc::new(NoDelay),
            Duration::from_secs(5),
        );
        BatchRunner::new(pipeline, 10)
    }

    #[tokio::test]
    async fn test_run_batch_finishes_job_with_results() {
        let jobs = BatchJobs::new(10);
        let (id, cancel) = jobs.create(2).await;
        let contacts = vec![contact("Ana", "Acme"), contact("Bob", "Initech")];

        run_batch(jobs.clone(), id, cancel, runner(), contacts, sender(), 2).await;

        let job = jobs.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.succeeded, 2);
        assert_eq!(job.result.unwrap().results.len(), 2);
    }

    #[tokio::test]
    async fn test_run_batch_marks_job_failed_when_run_cannot_start() {
        let jobs = BatchJobs::new(10);
        let (id, cancel) = jobs.create(3).await;
        let contacts = vec![contact("Ana", "Acme")];

        run_batch(jobs.clone(), id, cancel, runner(), contacts, sender(), 3).await;

        let job = jobs.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.is_some());
        assert!(job.result.is_none());
        assert!(job.finished_at.is_some());
    }
}
