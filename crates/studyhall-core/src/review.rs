//! Admin review of admission requests: list pending applications, approve
//! (materializing the student, locker assignment and opening payment), or
//! reject with a reason. Both mutations are guarded so a request can leave
//! `pending` exactly once.

use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{CoreError, Result};
use crate::tenant::Tenant;
use crate::types::{AdmissionRequest, AdmissionStatus};

pub async fn list_requests(
    pool: &DbPool,
    tenant: &Tenant,
    status: Option<AdmissionStatus>,
) -> Result<Vec<AdmissionRequest>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(
                r#"
                SELECT * FROM admission_requests
                WHERE library_id = $1 AND status = $2
                ORDER BY created_at DESC
                "#,
            )
            .bind(tenant.id().get())
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT * FROM admission_requests
                WHERE library_id = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(tenant.id().get())
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(AdmissionRequest::from_row).collect()
}

#[derive(Debug, Serialize)]
pub struct ApprovedAdmission {
    pub request_id: Uuid,
    pub student_id: i64,
}

/// Approve a pending request. One transaction covers the whole
/// materialization: the request row is locked, the student is created, the
/// requested locker is claimed, the opening payment is recorded, and the
/// request is stamped approved. A request that already left `pending` is a
/// conflict, never a second student.
pub async fn approve_request(
    pool: &DbPool,
    tenant: &Tenant,
    request_id: Uuid,
) -> Result<ApprovedAdmission> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT * FROM admission_requests
        WHERE request_id = $1 AND library_id = $2
        FOR UPDATE
        "#,
    )
    .bind(request_id)
    .bind(tenant.id().get())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CoreError::NotFound("admission request"))?;

    let request = AdmissionRequest::from_row(&row)?;
    if request.status != AdmissionStatus::Pending {
        return Err(CoreError::Conflict(format!(
            "admission request was already {}",
            request.status.as_str()
        )));
    }

    let existing_student =
        sqlx::query("SELECT student_id FROM students WHERE library_id = $1 AND phone = $2")
            .bind(tenant.id().get())
            .bind(&request.phone)
            .fetch_optional(&mut *tx)
            .await?;
    if existing_student.is_some() {
        return Err(CoreError::Conflict(
            "a student with this phone number is already registered at this library".to_string(),
        ));
    }

    let student_row = sqlx::query(
        r#"
        INSERT INTO students (
            library_id, name, email, phone, address, father_name, aadhar_number,
            registration_number, branch_id, seat_id, locker_id, shift_ids,
            membership_start, membership_end, total_fee, discount, amount_paid,
            admitted_from
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7,
            $8, $9, $10, $11, $12,
            $13, $14, $15, $16, $17,
            $18
        )
        RETURNING student_id
        "#,
    )
    .bind(tenant.id().get())
    .bind(&request.name)
    .bind(&request.email)
    .bind(&request.phone)
    .bind(&request.address)
    .bind(&request.father_name)
    .bind(&request.aadhar_number)
    .bind(&request.registration_number)
    .bind(request.branch_id)
    .bind(request.seat_id)
    .bind(request.locker_id)
    .bind(serde_json::to_value(&request.shift_ids)?)
    .bind(request.membership_start)
    .bind(request.membership_end)
    .bind(request.total_fee)
    .bind(request.discount)
    .bind(request.amount_paid)
    .bind(request.request_id)
    .fetch_one(&mut *tx)
    .await?;
    let student_id: i64 = student_row.try_get("student_id")?;

    if let Some(locker_id) = request.locker_id {
        let claimed = sqlx::query(
            r#"
            UPDATE lockers SET is_assigned = TRUE
            WHERE locker_id = $1 AND library_id = $2 AND is_assigned = FALSE
            "#,
        )
        .bind(locker_id)
        .bind(tenant.id().get())
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Err(CoreError::Conflict(
                "the requested locker is no longer available".to_string(),
            ));
        }
    }

    sqlx::query(
        r#"
        INSERT INTO payments (
            payment_id, library_id, student_id,
            amount, cash, online, security_money, discount, note
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant.id().get())
    .bind(student_id)
    .bind(request.amount_paid)
    .bind(request.cash)
    .bind(request.online)
    .bind(request.security_money)
    .bind(request.discount)
    .bind("admission payment")
    .execute(&mut *tx)
    .await?;

    // rows_affected guard: even if a concurrent approval slipped past the row
    // lock, only one UPDATE can see status = 'pending'.
    let updated = sqlx::query(
        r#"
        UPDATE admission_requests
        SET status = 'approved', processed_at = now(), updated_at = now()
        WHERE request_id = $1 AND status = 'pending'
        "#,
    )
    .bind(request_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(CoreError::Conflict(
            "admission request was already processed".to_string(),
        ));
    }

    tx.commit().await?;

    tracing::info!(
        library = %tenant.code,
        request_id = %request_id,
        student_id,
        "admission request approved"
    );

    Ok(ApprovedAdmission {
        request_id,
        student_id,
    })
}

/// Reject a pending request, recording the reason and the processing time.
pub async fn reject_request(
    pool: &DbPool,
    tenant: &Tenant,
    request_id: Uuid,
    reason: &str,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT status FROM admission_requests
        WHERE request_id = $1 AND library_id = $2
        FOR UPDATE
        "#,
    )
    .bind(request_id)
    .bind(tenant.id().get())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CoreError::NotFound("admission request"))?;

    let status = AdmissionStatus::parse(row.try_get::<String, _>("status")?.as_str())?;
    if status != AdmissionStatus::Pending {
        return Err(CoreError::Conflict(format!(
            "admission request was already {}",
            status.as_str()
        )));
    }

    sqlx::query(
        r#"
        UPDATE admission_requests
        SET status = 'rejected', rejection_reason = $2, processed_at = now(), updated_at = now()
        WHERE request_id = $1 AND status = 'pending'
        "#,
    )
    .bind(request_id)
    .bind(reason)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        library = %tenant.code,
        request_id = %request_id,
        "admission request rejected"
    );

    Ok(())
}
