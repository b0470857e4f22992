//! End-to-end exercise of the registration -> review -> attendance pipeline
//! over the real router. Needs a scratch Postgres database; the test skips
//! itself when STUDYHALL_TEST_DATABASE_URL is not set.

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use studyhall::server::{router, AppState};
use studyhall_core::{db, seed};
use tokio::runtime::Runtime;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|err| anyhow!("router error: {err}"))?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[test]
fn registration_pipeline_roundtrip() -> Result<()> {
    let database_url = match env::var("STUDYHALL_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping pipeline integration test because STUDYHALL_TEST_DATABASE_URL is not set"
            );
            return Ok(());
        }
    };

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let pool = db::connect(&database_url).await?;
        db::run_migrations(&pool).await?;
        sqlx::query(
            "TRUNCATE TABLE attendance_days, attendance_events, payments, students, admission_requests, lockers, shifts, seats, branches, libraries CASCADE",
        )
        .execute(&pool)
        .await?;
        seed::run(&pool).await?;

        let app = router(Arc::new(AppState::new(pool.clone())));

        // Lookup is case-insensitive and identical either way.
        let (status, upper) = send(&app, "GET", "/library/DEMO", None).await?;
        assert_eq!(status, StatusCode::OK);
        let (status, lower) = send(&app, "GET", "/library/demo", None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upper, lower);

        let library_id = upper["library"]["library_id"]
            .as_i64()
            .context("library id in profile")?;
        let branch_id = upper["branches"][0]["branch_id"]
            .as_i64()
            .context("branch id in profile")?;
        assert!(upper["lockers"].as_array().map(|l| !l.is_empty()).unwrap_or(false));

        let (status, _) = send(&app, "GET", "/library/NOPE", None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Status poll before any submission exists.
        let (status, _) = send(&app, "GET", "/library/DEMO/status/9999999999", None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Required fields are enforced.
        let (status, body) = send(
            &app,
            "POST",
            "/library/DEMO/register",
            Some(json!({"phone": "9999999999", "branch_id": branch_id})),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");

        // Non-empty garbage in a money field is rejected, not zeroed.
        let (status, _) = send(
            &app,
            "POST",
            "/library/DEMO/register",
            Some(json!({
                "name": "Asha Verma",
                "phone": "9999999999",
                "branch_id": branch_id,
                "total_fee": "12oo"
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // A valid submission; client-sent due amount is a lie to be ignored.
        let form = json!({
            "name": "Asha Verma",
            "phone": "9999999999",
            "branch_id": branch_id,
            "total_fee": 1000,
            "amount_paid": "400",
            "discount": 0,
            "due_amount": 9999,
            "shift_ids": ["1"]
        });
        let (status, submitted) =
            send(&app, "POST", "/library/DEMO/register", Some(form.clone())).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(submitted["status"], "pending");
        let request_id = submitted["request_id"]
            .as_str()
            .context("request id")?
            .to_string();

        // Duplicate while the first is pending.
        let (status, body) =
            send(&app, "POST", "/library/DEMO/register", Some(form.clone())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conflict");

        // The review queue sees the pending row with the recomputed due.
        let (status, queue) = send(&app, "GET", "/admin/library/DEMO/admissions", None).await?;
        assert_eq!(status, StatusCode::OK);
        let listed = &queue["requests"][0];
        assert_eq!(listed["due_amount"], json!(600.0));
        assert!(listed["processed_at"].is_null());

        // Approve, then verify double-approval is refused.
        let approve_uri = format!("/admin/library/DEMO/admissions/{request_id}/approve");
        let (status, approved) = send(&app, "POST", &approve_uri, None).await?;
        assert_eq!(status, StatusCode::OK);
        let student_id = approved["student_id"].as_i64().context("student id")?;

        let (status, body) = send(&app, "POST", &approve_uri, None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conflict");

        // Resubmitting after approval conflicts on the existing student.
        let (status, body) = send(&app, "POST", "/library/DEMO/register", Some(form)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conflict");

        let (status, polled) = send(&app, "GET", "/library/DEMO/status/9999999999", None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(polled["request"]["status"], "approved");
        assert!(polled["request"]["processed_at"].is_string());

        // A foreign library's QR code must not mark attendance.
        let foreign = json!({
            "student_id": student_id,
            "payload": {
                "libraryId": library_id + 999,
                "libraryCode": "OTHER",
                "libraryName": "Other Library",
                "type": "attendance"
            }
        });
        let (status, _) = send(&app, "POST", "/attendance/scan", Some(foreign)).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // First scan of the day checks in.
        let scan = json!({
            "student_id": student_id,
            "payload": {
                "libraryId": library_id,
                "libraryCode": "DEMO",
                "libraryName": "Demo Central Library",
                "type": "attendance"
            }
        });
        let (status, first) = send(&app, "POST", "/attendance/scan", Some(scan.clone())).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["direction"], "check_in");

        let today_uri = format!("/attendance/student/{student_id}/today");
        let (status, today) = send(&app, "GET", &today_uri, None).await?;
        assert_eq!(status, StatusCode::OK);
        let first_in = today["first_in"].clone();
        assert!(first_in.is_string());
        assert!(today["last_out"].is_null());
        assert_eq!(today["next_direction"], "check_out");

        // Second scan checks out; third opens a new session and keeps the
        // day's original first_in.
        let (_, second) = send(&app, "POST", "/attendance/scan", Some(scan.clone())).await?;
        assert_eq!(second["direction"], "check_out");
        let (_, third) = send(&app, "POST", "/attendance/scan", Some(scan)).await?;
        assert_eq!(third["direction"], "check_in");

        let (_, today) = send(&app, "GET", &today_uri, None).await?;
        assert_eq!(today["scan_count"], 3);
        assert_eq!(today["first_in"], first_in);
        assert!(today["last_out"].is_string());

        // Rejection path for a second applicant.
        let (status, submitted) = send(
            &app,
            "POST",
            "/library/DEMO/register",
            Some(json!({"name": "Ravi Kumar", "phone": "8888888888", "branch_id": branch_id})),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        let second_request = submitted["request_id"].as_str().context("request id")?;

        let reject_uri = format!("/admin/library/DEMO/admissions/{second_request}/reject");
        let (status, body) = send(&app, "POST", &reject_uri, Some(json!({}))).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");

        let (status, _) = send(
            &app,
            "POST",
            &reject_uri,
            Some(json!({"reason": "no seats free this term"})),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, polled) = send(&app, "GET", "/library/DEMO/status/8888888888", None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(polled["request"]["status"], "rejected");
        assert_eq!(polled["request"]["rejection_reason"], "no seats free this term");

        let (status, body) = send(
            &app,
            "POST",
            &reject_uri,
            Some(json!({"reason": "again"})),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conflict");

        // A rejected applicant can apply again.
        let (status, _) = send(
            &app,
            "POST",
            "/library/DEMO/register",
            Some(json!({"name": "Ravi Kumar", "phone": "8888888888", "branch_id": branch_id})),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);

        // Roster and dashboard consume the derived status.
        let (status, roster) = send(&app, "GET", "/admin/library/DEMO/students", None).await?;
        assert_eq!(status, StatusCode::OK);
        let student = &roster["students"][0];
        assert_eq!(student["due_amount"], json!(600.0));
        assert_eq!(student["status"]["membership_status"], "active");
        assert_eq!(student["status"]["has_due_amount"], true);

        let (status, dash) = send(&app, "GET", "/admin/library/DEMO/dashboard", None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dash["total_students"], 1);
        assert_eq!(dash["active_students"], 1);
        assert_eq!(dash["students_with_due"], 1);
        assert_eq!(dash["pending_admissions"], 1);
        assert_eq!(dash["todays_checkins"], 1);

        Ok(())
    })
}
