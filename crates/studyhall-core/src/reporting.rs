//! Read-side views for admin screens: the annotated roster and the dashboard
//! counters. Status is folded in code from the freshly-derived per-student
//! view, not read from a stored column.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::attendance::local_day;
use crate::db::DbPool;
use crate::error::Result;
use crate::membership::{derive_status, MembershipStatus, StatusView};
use crate::tenant::Tenant;
use crate::types::Student;

#[derive(Debug, Serialize)]
pub struct StudentWithStatus {
    #[serde(flatten)]
    pub student: Student,
    pub due_amount: f64,
    pub status: StatusView,
}

/// The library's roster, newest first, each row annotated with the derived
/// membership/financial status as of the library-local current date.
pub async fn roster(
    pool: &DbPool,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<Vec<StudentWithStatus>> {
    let today = local_day(now, tenant.timezone);

    let rows = sqlx::query(
        r#"
        SELECT * FROM students
        WHERE library_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(tenant.id().get())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let student = Student::from_row(row)?;
            let due_amount = student.due_amount();
            let status = derive_status(student.membership_end, due_amount, today);
            Ok(StudentWithStatus {
                student,
                due_amount,
                status,
            })
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_students: usize,
    pub active_students: usize,
    pub expired_students: usize,
    pub students_with_due: usize,
    pub pending_admissions: i64,
    pub todays_checkins: i64,
}

pub async fn dashboard(pool: &DbPool, tenant: &Tenant, now: DateTime<Utc>) -> Result<Dashboard> {
    let students = roster(pool, tenant, now).await?;
    let total_students = students.len();
    let expired_students = students
        .iter()
        .filter(|s| s.status.membership_status == MembershipStatus::Expired)
        .count();
    let active_students = total_students - expired_students;
    let students_with_due = students.iter().filter(|s| s.status.has_due_amount).count();

    let pending_admissions: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM admission_requests WHERE library_id = $1 AND status = 'pending'",
    )
    .bind(tenant.id().get())
    .fetch_one(pool)
    .await?
    .try_get("n")?;

    let today = local_day(now, tenant.timezone);
    let todays_checkins: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM attendance_days WHERE library_id = $1 AND day = $2",
    )
    .bind(tenant.id().get())
    .bind(today)
    .fetch_one(pool)
    .await?
    .try_get("n")?;

    Ok(Dashboard {
        total_students,
        active_students,
        expired_students,
        students_with_due,
        pending_admissions,
        todays_checkins,
    })
}
