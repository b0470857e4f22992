//! Public registration intake: the unauthenticated side of the admission
//! pipeline. Prospective students discover a library's registration options,
//! submit an application, and poll its status by phone number.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{CoreError, Result};
use crate::money::{
    parse_amount, parse_id_list, parse_optional_id, parse_required_id, NumericInput,
};
use crate::tenant::Tenant;
use crate::types::{AdmissionRequest, Branch, Locker, Seat, Shift};

/// Everything an anonymous caller needs to render the registration form.
#[derive(Debug, Serialize)]
pub struct LibraryProfile {
    pub branches: Vec<Branch>,
    pub seats: Vec<Seat>,
    pub shifts: Vec<Shift>,
    pub lockers: Vec<Locker>,
}

pub async fn library_profile(pool: &DbPool, tenant: &Tenant) -> Result<LibraryProfile> {
    let branches = sqlx::query_as::<_, Branch>(
        "SELECT branch_id, name FROM branches WHERE library_id = $1 ORDER BY branch_id",
    )
    .bind(tenant.id().get())
    .fetch_all(pool)
    .await?;

    let seats = sqlx::query_as::<_, Seat>(
        "SELECT seat_id, branch_id, seat_number FROM seats WHERE library_id = $1 ORDER BY seat_number",
    )
    .bind(tenant.id().get())
    .fetch_all(pool)
    .await?;

    let shifts = sqlx::query_as::<_, Shift>(
        "SELECT shift_id, name, start_time, end_time FROM shifts WHERE library_id = $1 ORDER BY start_time",
    )
    .bind(tenant.id().get())
    .fetch_all(pool)
    .await?;

    // Only lockers nobody holds are offered on the public form.
    let lockers = sqlx::query_as::<_, Locker>(
        "SELECT locker_id, locker_number, is_assigned FROM lockers WHERE library_id = $1 AND is_assigned = FALSE ORDER BY locker_number",
    )
    .bind(tenant.id().get())
    .fetch_all(pool)
    .await?;

    Ok(LibraryProfile {
        branches,
        seats,
        shifts,
        lockers,
    })
}

/// Raw registration form as deserialized from the request body. Money and id
/// fields arrive as numbers or strings interchangeably; `validate` normalizes
/// them once.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<NumericInput>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub membership_start: Option<NaiveDate>,
    pub membership_end: Option<NaiveDate>,
    pub total_fee: Option<NumericInput>,
    pub amount_paid: Option<NumericInput>,
    pub discount: Option<NumericInput>,
    pub cash: Option<NumericInput>,
    pub online: Option<NumericInput>,
    pub security_money: Option<NumericInput>,
    // Accepted for wire compatibility, always recomputed server-side.
    pub due_amount: Option<NumericInput>,
    pub shift_ids: Option<Vec<NumericInput>>,
    pub seat_id: Option<NumericInput>,
    pub locker_id: Option<NumericInput>,
    pub remark: Option<String>,
    pub profile_image_url: Option<String>,
    pub registration_number: Option<String>,
    pub father_name: Option<String>,
    pub aadhar_number: Option<String>,
    pub aadhaar_front_url: Option<String>,
    pub aadhaar_back_url: Option<String>,
}

/// A validated application ready to persist.
#[derive(Debug)]
pub struct NewAdmissionRequest {
    pub name: String,
    pub phone: String,
    pub branch_id: i64,
    pub email: Option<String>,
    pub address: Option<String>,
    pub membership_start: Option<NaiveDate>,
    pub membership_end: Option<NaiveDate>,
    pub total_fee: f64,
    pub amount_paid: f64,
    pub discount: f64,
    pub due_amount: f64,
    pub cash: f64,
    pub online: f64,
    pub security_money: f64,
    pub shift_ids: Vec<i64>,
    pub seat_id: Option<i64>,
    pub locker_id: Option<i64>,
    pub remark: Option<String>,
    pub profile_image_url: Option<String>,
    pub registration_number: Option<String>,
    pub father_name: Option<String>,
    pub aadhar_number: Option<String>,
    pub aadhaar_front_url: Option<String>,
    pub aadhaar_back_url: Option<String>,
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(CoreError::Validation(format!("field '{field}' is required")))
            } else {
                Ok(trimmed.to_string())
            }
        }
        None => Err(CoreError::Validation(format!("field '{field}' is required"))),
    }
}

impl RegistrationForm {
    /// Check required fields, coerce every numeric field, and recompute the
    /// due amount from its three source fields. Whatever the client sent for
    /// `due_amount` is ignored.
    pub fn validate(self) -> Result<NewAdmissionRequest> {
        let name = required_text("name", self.name)?;
        let phone = required_text("phone", self.phone)?;
        let branch_id = parse_required_id("branch_id", self.branch_id.as_ref())?;

        let total_fee = parse_amount("total_fee", self.total_fee.as_ref())?;
        let amount_paid = parse_amount("amount_paid", self.amount_paid.as_ref())?;
        let discount = parse_amount("discount", self.discount.as_ref())?;
        let cash = parse_amount("cash", self.cash.as_ref())?;
        let online = parse_amount("online", self.online.as_ref())?;
        let security_money = parse_amount("security_money", self.security_money.as_ref())?;
        let due_amount = total_fee - discount - amount_paid;

        let shift_ids = match &self.shift_ids {
            Some(list) => parse_id_list("shift_ids", list)?,
            None => Vec::new(),
        };
        let seat_id = parse_optional_id("seat_id", self.seat_id.as_ref())?;
        let locker_id = parse_optional_id("locker_id", self.locker_id.as_ref())?;

        Ok(NewAdmissionRequest {
            name,
            phone,
            branch_id,
            email: self.email,
            address: self.address,
            membership_start: self.membership_start,
            membership_end: self.membership_end,
            total_fee,
            amount_paid,
            discount,
            due_amount,
            cash,
            online,
            security_money,
            shift_ids,
            seat_id,
            locker_id,
            remark: self.remark,
            profile_image_url: self.profile_image_url,
            registration_number: self.registration_number,
            father_name: self.father_name,
            aadhar_number: self.aadhar_number,
            aadhaar_front_url: self.aadhaar_front_url,
            aadhaar_back_url: self.aadhaar_back_url,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SubmittedRequest {
    pub request_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// Persist one pending application. The partial unique index on
/// (library_id, phone) WHERE status = 'pending' is the duplicate guard, so
/// two concurrent submissions for the same phone cannot both commit.
pub async fn submit_registration(
    pool: &DbPool,
    tenant: &Tenant,
    request: NewAdmissionRequest,
) -> Result<SubmittedRequest> {
    let mut tx = pool.begin().await?;

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

    let request_id = Uuid::new_v4();
    let inserted = sqlx::query(
        r#"
        INSERT INTO admission_requests (
            request_id, library_id, name, email, phone, address, branch_id,
            membership_start, membership_end,
            total_fee, amount_paid, discount, due_amount,
            cash, online, security_money,
            remark, profile_image_url, registration_number, father_name,
            aadhar_number, locker_id, aadhaar_front_url, aadhaar_back_url,
            shift_ids, seat_id, status
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7,
            $8, $9,
            $10, $11, $12, $13,
            $14, $15, $16,
            $17, $18, $19, $20,
            $21, $22, $23, $24,
            $25, $26, 'pending'
        )
        RETURNING created_at
        "#,
    )
    .bind(request_id)
    .bind(tenant.id().get())
    .bind(&request.name)
    .bind(&request.email)
    .bind(&request.phone)
    .bind(&request.address)
    .bind(request.branch_id)
    .bind(request.membership_start)
    .bind(request.membership_end)
    .bind(request.total_fee)
    .bind(request.amount_paid)
    .bind(request.discount)
    .bind(request.due_amount)
    .bind(request.cash)
    .bind(request.online)
    .bind(request.security_money)
    .bind(&request.remark)
    .bind(&request.profile_image_url)
    .bind(&request.registration_number)
    .bind(&request.father_name)
    .bind(&request.aadhar_number)
    .bind(request.locker_id)
    .bind(&request.aadhaar_front_url)
    .bind(&request.aadhaar_back_url)
    .bind(serde_json::to_value(&request.shift_ids)?)
    .bind(request.seat_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return CoreError::Conflict(
                    "an admission request for this phone number is already pending review"
                        .to_string(),
                );
            }
        }
        CoreError::Database(err)
    })?;

    let submitted_at: DateTime<Utc> = inserted.try_get("created_at")?;
    tx.commit().await?;

    tracing::info!(
        library = %tenant.code,
        request_id = %request_id,
        "admission request submitted"
    );

    Ok(SubmittedRequest {
        request_id,
        submitted_at,
    })
}

/// The most recent application for a phone at this library, for status
/// polling.
pub async fn latest_request(
    pool: &DbPool,
    tenant: &Tenant,
    phone: &str,
) -> Result<AdmissionRequest> {
    let row = sqlx::query(
        r#"
        SELECT * FROM admission_requests
        WHERE library_id = $1 AND phone = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(tenant.id().get())
    .bind(phone)
    .fetch_optional(pool)
    .await?
    .ok_or(CoreError::NotFound("admission request"))?;

    AdmissionRequest::from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_form() -> RegistrationForm {
        RegistrationForm {
            name: Some("Asha Verma".to_string()),
            phone: Some("9999999999".to_string()),
            branch_id: Some(NumericInput::Number(1.0)),
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_fields_fail_validation() {
        for strip in ["name", "phone", "branch_id"] {
            let mut form = minimal_form();
            match strip {
                "name" => form.name = None,
                "phone" => form.phone = None,
                _ => form.branch_id = None,
            }
            let err = form.validate().unwrap_err();
            assert!(err.to_string().contains(strip), "expected error naming {strip}");
        }
    }

    #[test]
    fn due_amount_is_recomputed_from_source_fields() {
        let mut form = minimal_form();
        form.total_fee = Some(NumericInput::Number(1000.0));
        form.amount_paid = Some(NumericInput::Text("400".to_string()));
        form.discount = Some(NumericInput::Number(0.0));
        // Client-sent due amount is a lie; it must be ignored.
        form.due_amount = Some(NumericInput::Number(0.0));

        let validated = form.validate().unwrap();
        assert_eq!(validated.due_amount, 600.0);
    }

    #[test]
    fn shift_ids_are_coerced_to_integers() {
        let mut form = minimal_form();
        form.shift_ids = Some(vec![
            NumericInput::Text("3".to_string()),
            NumericInput::Number(1.0),
        ]);
        let validated = form.validate().unwrap();
        assert_eq!(validated.shift_ids, vec![3, 1]);
    }

    #[test]
    fn whitespace_only_name_is_rejected() {
        let mut form = minimal_form();
        form.name = Some("   ".to_string());
        assert!(form.validate().is_err());
    }

    #[test]
    fn unparsable_fee_is_rejected() {
        let mut form = minimal_form();
        form.total_fee = Some(NumericInput::Text("12oo".to_string()));
        assert!(form.validate().is_err());
    }
}
