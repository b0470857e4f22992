//! Admin-facing review and reporting endpoints. Authentication sits in front
//! of these in deployment; the handlers themselves only enforce tenant
//! scoping via the library code in the path.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use studyhall_core::error::CoreError;
use studyhall_core::reporting::{self, Dashboard, StudentWithStatus};
use studyhall_core::review;
use studyhall_core::tenant::Tenant;
use studyhall_core::types::{AdmissionRequest, AdmissionStatus};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;

#[derive(Deserialize)]
pub struct AdmissionListQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct AdmissionListResponse {
    pub requests: Vec<AdmissionRequest>,
}

pub async fn list_admissions(
    State(state): State<Arc<AppState>>,
    Path(library_code): Path<String>,
    Query(query): Query<AdmissionListQuery>,
) -> Result<Json<AdmissionListResponse>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;

    // Pending is the review queue's default; "all" lifts the filter.
    let status = match query.status.as_deref() {
        None => Some(AdmissionStatus::Pending),
        Some("all") => None,
        Some(other) => Some(AdmissionStatus::parse(other)?),
    };

    let requests = review::list_requests(&state.pool, &tenant, status).await?;
    Ok(Json(AdmissionListResponse { requests }))
}

#[derive(Serialize)]
pub struct ApproveResponse {
    pub message: String,
    pub request_id: Uuid,
    pub student_id: i64,
}

pub async fn approve_admission(
    State(state): State<Arc<AppState>>,
    Path((library_code, request_id)): Path<(String, Uuid)>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;
    let approved = review::approve_request(&state.pool, &tenant, request_id).await?;

    Ok(Json(ApproveResponse {
        message: "admission request approved".to_string(),
        request_id: approved.request_id,
        student_id: approved.student_id,
    }))
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct RejectResponse {
    pub message: String,
    pub request_id: Uuid,
}

pub async fn reject_admission(
    State(state): State<Arc<AppState>>,
    Path((library_code, request_id)): Path<(String, Uuid)>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<RejectResponse>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;

    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CoreError::Validation("field 'reason' is required".to_string()))?;

    review::reject_request(&state.pool, &tenant, request_id, reason).await?;

    Ok(Json(RejectResponse {
        message: "admission request rejected".to_string(),
        request_id,
    }))
}

#[derive(Serialize)]
pub struct RosterResponse {
    pub students: Vec<StudentWithStatus>,
}

pub async fn list_students(
    State(state): State<Arc<AppState>>,
    Path(library_code): Path<String>,
) -> Result<Json<RosterResponse>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;
    let students = reporting::roster(&state.pool, &tenant, Utc::now()).await?;
    Ok(Json(RosterResponse { students }))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(library_code): Path<String>,
) -> Result<Json<Dashboard>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;
    let dashboard = reporting::dashboard(&state.pool, &tenant, Utc::now()).await?;
    Ok(Json(dashboard))
}
