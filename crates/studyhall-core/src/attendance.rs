//! Attendance scan processing. A scan of the library's printed QR code
//! toggles the student between checked-in and checked-out for the current
//! library-local calendar day: even count of prior same-day scans means this
//! one is a check-in, odd means check-out. Every scan appends an immutable
//! event row and folds into the per-day summary.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{CoreError, Result};
use crate::tenant::Tenant;
use crate::types::AttendanceDay;

/// The JSON embedded in a library's printed QR code. Intentionally static —
/// no timestamp or nonce — so the same printed code stays valid; the only
/// security property is the library-id match below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    pub library_id: i64,
    pub library_code: String,
    pub library_name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

pub const PAYLOAD_KIND_ATTENDANCE: &str = "attendance";

impl ScanPayload {
    pub fn validate(&self) -> Result<()> {
        if self.kind != PAYLOAD_KIND_ATTENDANCE {
            return Err(CoreError::Validation(format!(
                "QR payload type '{}' is not an attendance code",
                self.kind
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    CheckIn,
    CheckOut,
}

/// Even prior count (including zero) -> this scan checks in; odd -> out.
pub fn direction_for(prior_scans_today: i64) -> ScanDirection {
    if prior_scans_today % 2 == 0 {
        ScanDirection::CheckIn
    } else {
        ScanDirection::CheckOut
    }
}

/// The calendar day a scan belongs to, in the library's timezone. A scan
/// just after local midnight lands on the new local day even when the UTC
/// date has not rolled over (and vice versa).
pub fn local_day(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

#[derive(Debug, Serialize)]
pub struct ScanOutcome {
    pub direction: ScanDirection,
    pub day: NaiveDate,
    pub scanned_at: DateTime<Utc>,
    pub scan_count: i64,
}

/// Process one QR scan for a student. The student row is locked for the
/// duration so two concurrent scans cannot read the same parity.
pub async fn record_scan(
    pool: &DbPool,
    payload: &ScanPayload,
    student_id: i64,
    at: DateTime<Utc>,
) -> Result<ScanOutcome> {
    payload.validate()?;

    let student_row = sqlx::query("SELECT library_id FROM students WHERE student_id = $1")
        .bind(student_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound("student"))?;
    let student_library: i64 = student_row.try_get("library_id")?;

    // Students can only mark attendance with their own library's code.
    if student_library != payload.library_id {
        return Err(CoreError::InvalidLibrary);
    }

    let tenant = Tenant::resolve_by_id(pool, student_library).await?;
    let day = local_day(at, tenant.timezone);

    let mut tx = pool.begin().await?;

    sqlx::query("SELECT student_id FROM students WHERE student_id = $1 FOR UPDATE")
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

    let prior_row = sqlx::query(
        r#"
        SELECT COUNT(*) AS prior FROM attendance_events
        WHERE library_id = $1 AND student_id = $2 AND day = $3
        "#,
    )
    .bind(tenant.id().get())
    .bind(student_id)
    .bind(day)
    .fetch_one(&mut *tx)
    .await?;
    let prior: i64 = prior_row.try_get("prior")?;
    let direction = direction_for(prior);

    sqlx::query(
        r#"
        INSERT INTO attendance_events (event_id, library_id, student_id, scanned_at, day)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant.id().get())
    .bind(student_id)
    .bind(at)
    .bind(day)
    .execute(&mut *tx)
    .await?;

    match direction {
        ScanDirection::CheckIn => {
            // A later same-day check-in keeps the day's original first_in.
            sqlx::query(
                r#"
                INSERT INTO attendance_days (library_id, student_id, day, first_in, scan_count)
                VALUES ($1, $2, $3, $4, 1)
                ON CONFLICT (library_id, student_id, day) DO UPDATE SET
                    first_in = COALESCE(attendance_days.first_in, EXCLUDED.first_in),
                    scan_count = attendance_days.scan_count + 1
                "#,
            )
            .bind(tenant.id().get())
            .bind(student_id)
            .bind(day)
            .bind(at)
            .execute(&mut *tx)
            .await?;
        }
        ScanDirection::CheckOut => {
            sqlx::query(
                r#"
                INSERT INTO attendance_days (library_id, student_id, day, last_out, scan_count)
                VALUES ($1, $2, $3, $4, 1)
                ON CONFLICT (library_id, student_id, day) DO UPDATE SET
                    last_out = EXCLUDED.last_out,
                    scan_count = attendance_days.scan_count + 1
                "#,
            )
            .bind(tenant.id().get())
            .bind(student_id)
            .bind(day)
            .bind(at)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        library = %tenant.code,
        student_id,
        day = %day,
        direction = ?direction,
        "attendance scan recorded"
    );

    Ok(ScanOutcome {
        direction,
        day,
        scanned_at: at,
        scan_count: prior + 1,
    })
}

#[derive(Debug, Serialize)]
pub struct TodaySummary {
    pub day: NaiveDate,
    pub first_in: Option<DateTime<Utc>>,
    pub last_out: Option<DateTime<Utc>>,
    pub scan_count: i32,
    /// What the next scan would do.
    pub next_direction: ScanDirection,
}

/// The student's attendance summary for the current library-local day.
pub async fn today_summary(pool: &DbPool, student_id: i64, now: DateTime<Utc>) -> Result<TodaySummary> {
    let student_row = sqlx::query("SELECT library_id FROM students WHERE student_id = $1")
        .bind(student_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound("student"))?;
    let student_library: i64 = student_row.try_get("library_id")?;

    let tenant = Tenant::resolve_by_id(pool, student_library).await?;
    let day = local_day(now, tenant.timezone);
    let summary = day_summary(pool, &tenant, student_id, day).await?;

    Ok(match summary {
        Some(existing) => TodaySummary {
            day,
            next_direction: direction_for(i64::from(existing.scan_count)),
            first_in: existing.first_in,
            last_out: existing.last_out,
            scan_count: existing.scan_count,
        },
        None => TodaySummary {
            day,
            first_in: None,
            last_out: None,
            scan_count: 0,
            next_direction: ScanDirection::CheckIn,
        },
    })
}

pub async fn day_summary(
    pool: &DbPool,
    tenant: &Tenant,
    student_id: i64,
    day: NaiveDate,
) -> Result<Option<AttendanceDay>> {
    let row = sqlx::query(
        r#"
        SELECT day, first_in, last_out, scan_count FROM attendance_days
        WHERE library_id = $1 AND student_id = $2 AND day = $3
        "#,
    )
    .bind(tenant.id().get())
    .bind(student_id)
    .bind(day)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(row) => Some(AttendanceDay {
            day: row.try_get("day")?,
            first_in: row.try_get("first_in")?,
            last_out: row.try_get("last_out")?,
            scan_count: row.try_get("scan_count")?,
        }),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scan_parity_alternates_in_and_out() {
        assert_eq!(direction_for(0), ScanDirection::CheckIn);
        assert_eq!(direction_for(1), ScanDirection::CheckOut);
        assert_eq!(direction_for(2), ScanDirection::CheckIn);
        assert_eq!(direction_for(3), ScanDirection::CheckOut);
    }

    #[test]
    fn local_day_crosses_utc_midnight() {
        // 20:00 UTC on March 10th is 01:30 on March 11th in Kolkata.
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 20, 0, 0).unwrap();
        let day = local_day(at, chrono_tz::Asia::Kolkata);
        assert_eq!(day, NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
    }

    #[test]
    fn local_day_behind_utc() {
        // 03:00 UTC on March 11th is still March 10th in Los Angeles.
        let at = Utc.with_ymd_and_hms(2026, 3, 11, 3, 0, 0).unwrap();
        let day = local_day(at, chrono_tz::America::Los_Angeles);
        assert_eq!(day, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
    }

    #[test]
    fn non_attendance_payloads_are_rejected() {
        let payload = ScanPayload {
            library_id: 1,
            library_code: "DEMO".to_string(),
            library_name: "Demo Central Library".to_string(),
            kind: "locker".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn payload_wire_format_is_camel_case() {
        let payload: ScanPayload = serde_json::from_str(
            r#"{"libraryId": 7, "libraryCode": "DEMO", "libraryName": "Demo", "type": "attendance"}"#,
        )
        .unwrap();
        assert_eq!(payload.library_id, 7);
        assert!(payload.validate().is_ok());
    }
}
