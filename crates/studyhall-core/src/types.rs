use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Pending => "pending",
            AdmissionStatus::Approved => "approved",
            AdmissionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(CoreError::Validation(format!(
                "unknown admission status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Branch {
    pub branch_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Seat {
    pub seat_id: i64,
    pub branch_id: Option<i64>,
    pub seat_number: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Shift {
    pub shift_id: i64,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Locker {
    pub locker_id: i64,
    pub locker_number: i32,
    pub is_assigned: bool,
}

/// A prospective student's application as persisted. Status only ever moves
/// pending -> approved or pending -> rejected; `processed_at` is set exactly
/// when the row leaves `pending`.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionRequest {
    pub request_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub branch_id: i64,
    pub membership_start: Option<NaiveDate>,
    pub membership_end: Option<NaiveDate>,
    pub total_fee: f64,
    pub amount_paid: f64,
    pub discount: f64,
    pub due_amount: f64,
    pub cash: f64,
    pub online: f64,
    pub security_money: f64,
    pub remark: Option<String>,
    pub profile_image_url: Option<String>,
    pub registration_number: Option<String>,
    pub father_name: Option<String>,
    pub aadhar_number: Option<String>,
    pub locker_id: Option<i64>,
    pub aadhaar_front_url: Option<String>,
    pub aadhaar_back_url: Option<String>,
    pub shift_ids: Vec<i64>,
    pub seat_id: Option<i64>,
    pub status: AdmissionStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl AdmissionRequest {
    /// Map a full admission_requests row. The status column and the JSONB
    /// shift list need conversions FromRow cannot derive.
    pub fn from_row(row: &PgRow) -> Result<Self> {
        let status_str: String = row.try_get("status")?;
        let shift_ids_json: serde_json::Value = row.try_get("shift_ids")?;
        let shift_ids: Vec<i64> = serde_json::from_value(shift_ids_json)?;

        Ok(Self {
            request_id: row.try_get("request_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            branch_id: row.try_get("branch_id")?,
            membership_start: row.try_get("membership_start")?,
            membership_end: row.try_get("membership_end")?,
            total_fee: row.try_get("total_fee")?,
            amount_paid: row.try_get("amount_paid")?,
            discount: row.try_get("discount")?,
            due_amount: row.try_get("due_amount")?,
            cash: row.try_get("cash")?,
            online: row.try_get("online")?,
            security_money: row.try_get("security_money")?,
            remark: row.try_get("remark")?,
            profile_image_url: row.try_get("profile_image_url")?,
            registration_number: row.try_get("registration_number")?,
            father_name: row.try_get("father_name")?,
            aadhar_number: row.try_get("aadhar_number")?,
            locker_id: row.try_get("locker_id")?,
            aadhaar_front_url: row.try_get("aadhaar_front_url")?,
            aadhaar_back_url: row.try_get("aadhaar_back_url")?,
            shift_ids,
            seat_id: row.try_get("seat_id")?,
            status: AdmissionStatus::parse(&status_str)?,
            rejection_reason: row.try_get("rejection_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

/// The terminal artifact of an approved admission.
#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub student_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub father_name: Option<String>,
    pub aadhar_number: Option<String>,
    pub registration_number: Option<String>,
    pub branch_id: Option<i64>,
    pub seat_id: Option<i64>,
    pub locker_id: Option<i64>,
    pub shift_ids: Vec<i64>,
    pub membership_start: Option<NaiveDate>,
    pub membership_end: Option<NaiveDate>,
    pub total_fee: f64,
    pub discount: f64,
    pub amount_paid: f64,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn from_row(row: &PgRow) -> Result<Self> {
        let shift_ids_json: serde_json::Value = row.try_get("shift_ids")?;
        let shift_ids: Vec<i64> = serde_json::from_value(shift_ids_json)?;

        Ok(Self {
            student_id: row.try_get("student_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            father_name: row.try_get("father_name")?,
            aadhar_number: row.try_get("aadhar_number")?,
            registration_number: row.try_get("registration_number")?,
            branch_id: row.try_get("branch_id")?,
            seat_id: row.try_get("seat_id")?,
            locker_id: row.try_get("locker_id")?,
            shift_ids,
            membership_start: row.try_get("membership_start")?,
            membership_end: row.try_get("membership_end")?,
            total_fee: row.try_get("total_fee")?,
            discount: row.try_get("discount")?,
            amount_paid: row.try_get("amount_paid")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Outstanding balance. Derived on every read, never stored.
    pub fn due_amount(&self) -> f64 {
        self.total_fee - self.discount - self.amount_paid
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceDay {
    pub day: NaiveDate,
    pub first_in: Option<DateTime<Utc>>,
    pub last_out: Option<DateTime<Utc>>,
    pub scan_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_status_round_trips() {
        for status in [
            AdmissionStatus::Pending,
            AdmissionStatus::Approved,
            AdmissionStatus::Rejected,
        ] {
            assert_eq!(AdmissionStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn admission_status_rejects_unknown() {
        assert!(AdmissionStatus::parse("cancelled").is_err());
    }

    #[test]
    fn due_amount_is_fee_minus_discount_minus_paid() {
        let student = Student {
            student_id: 1,
            name: "A".to_string(),
            email: None,
            phone: "9999999999".to_string(),
            address: None,
            father_name: None,
            aadhar_number: None,
            registration_number: None,
            branch_id: None,
            seat_id: None,
            locker_id: None,
            shift_ids: vec![],
            membership_start: None,
            membership_end: None,
            total_fee: 1000.0,
            discount: 100.0,
            amount_paid: 400.0,
            created_at: Utc::now(),
        };
        assert_eq!(student.due_amount(), 500.0);
    }
}
