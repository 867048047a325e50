//! Request and response bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::{parse_date, EngineError};
use crate::model::{BookedInterval, Quote, Reservation};

/// Raw create body. Turned into a `BookingRequest` once, at the boundary.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub room_id: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct StayQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Decision,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub reservation: Reservation,
}

#[derive(Debug, Serialize)]
pub struct ReservationListResponse {
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub booking_details: Quote,
}

#[derive(Debug, Serialize)]
pub struct BookedDatesResponse {
    pub booked_dates: Vec<BookedInterval>,
    /// Occupied nights, `YYYY-MM-DD`.
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub completed_count: usize,
    pub failed_count: usize,
}

pub fn parse_id(field: &str, raw: &str) -> Result<Ulid, EngineError> {
    raw.parse::<Ulid>()
        .map_err(|_| EngineError::Validation(format!("invalid {field}")))
}

/// Both dates present and parseable.
pub fn required_dates(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), EngineError> {
    match (start, end) {
        (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => {
            Ok((parse_date("start_date", s)?, parse_date("end_date", e)?))
        }
        _ => Err(EngineError::Validation(
            "start_date and end_date are required".into(),
        )),
    }
}
