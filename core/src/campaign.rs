//! Campaign classifier — vehicle age in whole months and the `vn`/`vo` split.

use crate::model::CampaignCode;
use chrono::{Datelike, NaiveDate};

/// Whole months between registration and `today`.
///
/// A month only counts once its day-of-month has been reached. Registration
/// dates in the future clamp to zero.
pub fn vehicle_age_months(registration: NaiveDate, today: NaiveDate) -> u32 {
    let mut months = (today.year() - registration.year()) as i64 * 12
        + today.month() as i64
        - registration.month() as i64;

    if today.day() < registration.day() {
        months -= 1;
    }

    months.max(0) as u32
}

/// `vn` when the vehicle is at most `new_max_age_months` old, otherwise `vo`.
pub fn classify(age_months: u32, new_max_age_months: u32) -> CampaignCode {
    if age_months <= new_max_age_months {
        CampaignCode::Vn
    } else {
        CampaignCode::Vo
    }
}

/// Convenience: age and campaign in one call.
pub fn classify_registration(
    registration: NaiveDate,
    today: NaiveDate,
    new_max_age_months: u32,
) -> (u32, CampaignCode) {
    let age = vehicle_age_months(registration, today);
    (age, classify(age, new_max_age_months))
}
