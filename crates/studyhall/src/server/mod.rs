mod admin;
mod attendance;
mod error;
mod public;
mod state;

use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use studyhall_core::db::DbPool;
use tokio::net::TcpListener;
use tracing::info;

pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/library/{library_code}", get(public::library_profile))
        .route("/library/{library_code}/register", post(public::register))
        .route(
            "/library/{library_code}/status/{phone}",
            get(public::registration_status),
        )
        .route(
            "/admin/library/{library_code}/admissions",
            get(admin::list_admissions),
        )
        .route(
            "/admin/library/{library_code}/admissions/{request_id}/approve",
            post(admin::approve_admission),
        )
        .route(
            "/admin/library/{library_code}/admissions/{request_id}/reject",
            post(admin::reject_admission),
        )
        .route(
            "/admin/library/{library_code}/students",
            get(admin::list_students),
        )
        .route(
            "/admin/library/{library_code}/dashboard",
            get(admin::dashboard),
        )
        .route("/attendance/scan", post(attendance::scan))
        .route(
            "/attendance/student/{student_id}/today",
            get(attendance::today),
        )
        .with_state(state)
}

pub async fn serve(pool: DbPool, listen: &str) -> Result<()> {
    let state = Arc::new(AppState::new(pool));
    let router = router(state);

    let listener = TcpListener::bind(listen).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
