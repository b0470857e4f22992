//! Membership and financial status derivation. Pure computation: every list,
//! dashboard and collection view re-derives status from the row and the
//! current date, so nothing is cached and nothing can go stale.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusView {
    pub membership_status: MembershipStatus,
    pub has_due_amount: bool,
    pub due_amount: f64,
}

/// Expired iff the membership ended strictly before today (date-only
/// comparison; a membership ending today is still active). No recorded end
/// date means the membership does not expire.
pub fn derive_status(
    membership_end: Option<NaiveDate>,
    due_amount: f64,
    today: NaiveDate,
) -> StatusView {
    let membership_status = match membership_end {
        Some(end) if end < today => MembershipStatus::Expired,
        _ => MembershipStatus::Active,
    };

    StatusView {
        membership_status,
        has_due_amount: due_amount > 0.0,
        due_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn membership_ending_today_is_still_active() {
        let today = date(2026, 8, 7);
        let view = derive_status(Some(today), 0.0, today);
        assert_eq!(view.membership_status, MembershipStatus::Active);
    }

    #[test]
    fn membership_one_day_past_end_is_expired() {
        let view = derive_status(Some(date(2026, 8, 6)), 0.0, date(2026, 8, 7));
        assert_eq!(view.membership_status, MembershipStatus::Expired);
    }

    #[test]
    fn missing_end_date_never_expires() {
        let view = derive_status(None, 0.0, date(2030, 1, 1));
        assert_eq!(view.membership_status, MembershipStatus::Active);
    }

    #[test]
    fn due_flag_requires_a_positive_balance() {
        let today = date(2026, 8, 7);
        assert!(derive_status(None, 600.0, today).has_due_amount);
        assert!(!derive_status(None, 0.0, today).has_due_amount);
        assert!(!derive_status(None, -50.0, today).has_due_amount);
    }
}
