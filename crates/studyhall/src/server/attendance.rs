//! Attendance endpoints: the QR scan toggle and the current-day summary.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use studyhall_core::attendance::{self, ScanDirection, ScanPayload, TodaySummary};

use super::error::ApiError;
use super::state::AppState;

#[derive(Deserialize)]
pub struct ScanRequest {
    pub student_id: i64,
    pub payload: ScanPayload,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub message: String,
    pub direction: ScanDirection,
    pub day: NaiveDate,
    pub scanned_at: DateTime<Utc>,
    pub scan_count: i64,
}

pub async fn scan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let outcome =
        attendance::record_scan(&state.pool, &request.payload, request.student_id, Utc::now())
            .await?;

    let message = match outcome.direction {
        ScanDirection::CheckIn => "checked in",
        ScanDirection::CheckOut => "checked out",
    };

    Ok(Json(ScanResponse {
        message: message.to_string(),
        direction: outcome.direction,
        day: outcome.day,
        scanned_at: outcome.scanned_at,
        scan_count: outcome.scan_count,
    }))
}

pub async fn today(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<i64>,
) -> Result<Json<TodaySummary>, ApiError> {
    let summary = attendance::today_summary(&state.pool, student_id, Utc::now()).await?;
    Ok(Json(summary))
}
