//! Scrape endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use tracing::info;

use crate::{
    context::ScrapeContext,
    errors::{RestError, RestResult},
    extractors::UserId,
    models::{StartScrapeRequest, StartScrapeResponse},
};

/// Admit a scrape for the calling user
pub async fn start_scrape(
    State(ctx): State<ScrapeContext>,
    UserId(user_id): UserId,
    body: Result<Json<StartScrapeRequest>, JsonRejection>,
) -> RestResult<impl IntoResponse> {
    let Json(request) = body.map_err(|e| RestError::bad_request(e.body_text()))?;
    let url = request.validated_url()?;

    info!("Start scrape requested by {} for {}", user_id, url);
    let submitted = ctx.orchestrator.start_scrape(&user_id, url.as_str()).await?;

    Ok(Json(StartScrapeResponse {
        job_id: submitted.job_id,
    }))
}

pub async fn scrape_status(
    State(ctx): State<ScrapeContext>,
    _user: UserId,
    Path(job_id): Path<String>,
) -> RestResult<impl IntoResponse> {
    let view = ctx.orchestrator.scrape_status(&job_id).await?;
    Ok(Json(view))
}

pub async fn cancel_scrape(
    State(ctx): State<ScrapeContext>,
    UserId(user_id): UserId,
    Path(job_id): Path<String>,
) -> RestResult<impl IntoResponse> {
    info!("Cancel of {} requested by {}", job_id, user_id);
    let receipt = ctx.orchestrator.cancel_scrape(&job_id).await?;
    Ok(Json(receipt))
}

pub async fn scrape_lock_status(
    State(ctx): State<ScrapeContext>,
    _user: UserId,
) -> RestResult<impl IntoResponse> {
    let status = ctx.orchestrator.lock_status().await?;
    Ok(Json(status))
}
