use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use classification::Tier;
use common::geo::Coordinates;
use db::models::{NewBusiness, ReportQuery};
use db::Repositories;
use intake::{IntakePipeline, ReportSubmission};
use prometheus::Encoder;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use verification::{ProximityVerifier, VerifyError};

use crate::dto::{BusinessDto, ReportDto, VerifyLocationResponse};
use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct ApiState {
    pub repositories: Arc<dyn Repositories>,
    pub pipeline: Arc<IntakePipeline>,
    pub verifier: Arc<ProximityVerifier>,
    pub metrics_path: &'static str,
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    let metrics_path: &'static str = state.metrics_path;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/reports", get(list_reports).post(submit_report))
        .route("/verify-location", post(verify_location))
        .route("/businesses", post(register_business))
        .route("/businesses/:id", get(get_business))
        .route(metrics_path, get(metrics))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip(state, submission))]
async fn submit_report(
    State(state): State<Arc<ApiState>>,
    Json(submission): Json<ReportSubmission>,
) -> ApiResult<Json<ReportDto>> {
    let report = state.pipeline.submit(submission).await?;
    Ok(Json(ReportDto::from(report)))
}

#[derive(Debug, Deserialize)]
struct ReportsQuery {
    tier: Option<String>,
    reporter: Option<String>,
    since: Option<String>,
    limit: Option<i64>,
}

#[instrument(skip(state))]
async fn list_reports(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ReportsQuery>,
) -> ApiResult<Json<Vec<ReportDto>>> {
    let tier = match query.tier.as_deref() {
        Some(value) => Some(
            value
                .parse::<Tier>()
                .map_err(|err| ApiError::bad_request(err.to_string()))?
                .as_str()
                .to_string(),
        ),
        None => None,
    };

    let report_query = ReportQuery {
        tier,
        reporter_email: query.reporter.as_deref().map(common::text::normalize_email),
        since: match query.since {
            Some(ref value) => Some(parse_since(value)?),
            None => None,
        },
        limit: Some(query.limit.unwrap_or(50).clamp(1, 500)),
    };

    let rows = state.repositories.reports().query(report_query).await?;
    Ok(Json(rows.into_iter().map(ReportDto::from).collect()))
}

#[derive(Debug, Deserialize)]
struct VerifyLocationRequest {
    business_id: i64,
    reporter_lat: f64,
    reporter_lng: f64,
    #[serde(default)]
    threshold_meters: Option<f64>,
}

#[instrument(skip(state))]
async fn verify_location(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<VerifyLocationRequest>,
) -> ApiResult<Json<VerifyLocationResponse>> {
    let reporter = Coordinates::new(request.reporter_lat, request.reporter_lng)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    match state
        .verifier
        .verify(request.business_id, reporter, request.threshold_meters)
        .await
    {
        Ok(verification) => Ok(Json(VerifyLocationResponse::success(verification))),
        // The submission still goes through tagged unverified, so the client
        // gets a distinguishable reason instead of an HTTP failure.
        Err(err) if err.is_resolution_failure() => {
            Ok(Json(VerifyLocationResponse::failure(err.to_string())))
        }
        Err(VerifyError::BusinessNotFound(id)) => {
            Err(ApiError::not_found(format!("business {} not found", id)))
        }
        Err(VerifyError::Store(err)) => Err(err.into()),
        Err(err) => Err(ApiError::Internal(err.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct RegisterBusinessRequest {
    name: String,
    address: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

#[instrument(skip(state, request))]
async fn register_business(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RegisterBusinessRequest>,
) -> ApiResult<Json<BusinessDto>> {
    if request.name.trim().is_empty() || request.address.trim().is_empty() {
        return Err(ApiError::bad_request("name and address are required"));
    }
    if let (Some(lat), Some(lng)) = (request.latitude, request.longitude) {
        Coordinates::new(lat, lng).map_err(|err| ApiError::bad_request(err.to_string()))?;
    }

    let business = state
        .repositories
        .businesses()
        .create(NewBusiness {
            name: request.name,
            address: request.address,
            latitude: request.latitude,
            longitude: request.longitude,
        })
        .await?;
    Ok(Json(BusinessDto::from(business)))
}

#[instrument(skip(state))]
async fn get_business(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BusinessDto>> {
    let business = state
        .repositories
        .businesses()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("business {} not found", id)))?;
    Ok(Json(BusinessDto::from(business)))
}

#[instrument(skip(_state))]
async fn metrics(State(_state): State<Arc<ApiState>>) -> ApiResult<impl IntoResponse> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let content_type = encoder.format_type().to_string();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok((
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type)],
        buffer,
    ))
}

fn parse_since(value: &str) -> ApiResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(ApiError::bad_request("invalid since parameter"))
}
