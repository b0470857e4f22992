//! Unauthenticated registration endpoints: form discovery, submission, and
//! status polling by phone number.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use studyhall_core::intake::{self, RegistrationForm};
use studyhall_core::tenant::{LibraryId, Tenant};
use studyhall_core::types::{AdmissionStatus, Branch, Locker, Seat, Shift};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;

#[derive(Serialize)]
pub struct LibrarySummary {
    pub library_id: LibraryId,
    pub code: String,
    pub library_name: String,
    pub owner_name: Option<String>,
}

impl From<&Tenant> for LibrarySummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            library_id: tenant.id(),
            code: tenant.code.clone(),
            library_name: tenant.library_name.clone(),
            owner_name: tenant.owner_name.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub library: LibrarySummary,
    pub branches: Vec<Branch>,
    pub seats: Vec<Seat>,
    pub shifts: Vec<Shift>,
    pub lockers: Vec<Locker>,
}

pub async fn library_profile(
    State(state): State<Arc<AppState>>,
    Path(library_code): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;
    let profile = intake::library_profile(&state.pool, &tenant).await?;

    Ok(Json(ProfileResponse {
        library: LibrarySummary::from(&tenant),
        branches: profile.branches,
        seats: profile.seats,
        shifts: profile.shifts,
        lockers: profile.lockers,
    }))
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub request_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub status: AdmissionStatus,
    pub note: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(library_code): Path<String>,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;
    let request = form.validate()?;
    let submitted = intake::submit_registration(&state.pool, &tenant, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registration submitted".to_string(),
            request_id: submitted.request_id,
            submitted_at: submitted.submitted_at,
            status: AdmissionStatus::Pending,
            note: "Your application is awaiting review by the library admin.".to_string(),
        }),
    ))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub library: StatusLibrary,
    pub request: StatusRequest,
}

#[derive(Serialize)]
pub struct StatusLibrary {
    pub name: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct StatusRequest {
    pub id: Uuid,
    pub name: String,
    pub status: AdmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

pub async fn registration_status(
    State(state): State<Arc<AppState>>,
    Path((library_code, phone)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, ApiError> {
    let tenant = Tenant::resolve(&state.pool, &library_code).await?;
    let request = intake::latest_request(&state.pool, &tenant, &phone).await?;

    Ok(Json(StatusResponse {
        library: StatusLibrary {
            name: tenant.library_name.clone(),
            code: tenant.code.clone(),
        },
        request: StatusRequest {
            id: request.request_id,
            name: request.name,
            status: request.status,
            submitted_at: request.created_at,
            last_updated: request.updated_at,
            processed_at: request.processed_at,
            rejection_reason: request.rejection_reason,
        },
    }))
}
