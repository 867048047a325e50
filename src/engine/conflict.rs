use chrono::{DateTime, Datelike, NaiveDate, Utc};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::find_conflict;
use super::EngineError;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (reduced to its UTC date).
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, EngineError> {
    if raw.len() > MAX_DATE_INPUT_LEN {
        return Err(EngineError::Validation(format!("{field} is too long")));
    }
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .ok_or_else(|| EngineError::Validation(format!("{field} is not a valid date")))?;
    if !(MIN_VALID_YEAR..=MAX_VALID_YEAR).contains(&date.year()) {
        return Err(EngineError::Validation(format!("{field} is out of range")));
    }
    Ok(date)
}

pub fn validate_stay(start: NaiveDate, end: NaiveDate) -> Result<Stay, EngineError> {
    if start >= end {
        return Err(EngineError::InvalidInterval { start, end });
    }
    if (end - start).num_days() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(Stay::new(start, end))
}

/// Boundary validation for a new booking: dates ordered, at least one
/// night, and check-in not before `today`.
pub fn validate_booking(
    room_id: Ulid,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<BookingRequest, EngineError> {
    if start < today {
        return Err(EngineError::Validation("start date cannot be in the past".into()));
    }
    let stay = validate_stay(start, end)?;
    Ok(BookingRequest { room_id, stay })
}

pub(crate) fn check_no_conflict(
    room: &RoomState,
    stay: &Stay,
    policy: OccupancyPolicy,
    excluding: Option<Ulid>,
) -> Result<(), EngineError> {
    match find_conflict(room, stay, policy, excluding) {
        Some(id) => {
            metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
            Err(EngineError::Conflict(id))
        }
        None => Ok(()),
    }
}
