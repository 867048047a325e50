//! Reservation and availability handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::engine::{today, validate_booking, validate_stay};
use crate::model::Role;
use crate::sweeper;

use super::AppState;
use super::actor::CurrentActor;
use super::dto::*;
use super::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::validation(e.body_text()))
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /availability/{room_id}?start_date&end_date
pub async fn check_availability(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<StayQuery>,
) -> ApiResult<AvailabilityResponse> {
    let room_id = parse_id("room id", &room_id)?;
    let (start, end) = required_dates(query.start_date.as_deref(), query.end_date.as_deref())?;
    let stay = validate_stay(start, end)?;
    let report = state.engine.check_availability(room_id, &stay).await?;
    Ok(Json(AvailabilityResponse {
        available: report.available,
        booking_details: report.quote,
    }))
}

/// GET /booked-dates/{room_id}
pub async fn booked_dates(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<BookedDatesResponse> {
    let room_id = parse_id("room id", &room_id)?;
    let calendar = state.engine.booked_dates(room_id).await?;
    Ok(Json(BookedDatesResponse {
        booked_dates: calendar.intervals,
        dates: calendar.dates,
    }))
}

/// POST /
pub async fn create_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let req = body(payload)?;
    let room_id = parse_id("room_id", &req.room_id)?;
    let (start, end) = required_dates(Some(&req.start_date), Some(&req.end_date))?;
    let request = validate_booking(room_id, start, end, today())?;
    let reservation = state.engine.create_reservation(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ReservationResponse { reservation })))
}

/// GET /
pub async fn list_reservations(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<ReservationListResponse> {
    let reservations = match actor.role {
        Role::Owner => state.engine.list_for_owner(&actor).await?,
        Role::Customer => state.engine.list_for_customer(&actor).await,
    };
    Ok(Json(ReservationListResponse { reservations }))
}

/// GET /{id}
pub async fn get_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<ReservationResponse> {
    let id = parse_id("reservation id", &id)?;
    let reservation = state.engine.get_reservation(id, &actor).await?;
    Ok(Json(ReservationResponse { reservation }))
}

/// PUT /{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<ReservationResponse> {
    let id = parse_id("reservation id", &id)?;
    let req = body(payload)?;
    let reservation = match req.status {
        Decision::Approved => state.engine.approve_reservation(id, &actor).await?,
        Decision::Rejected => state.engine.reject_reservation(id, &actor).await?,
    };
    Ok(Json(ReservationResponse { reservation }))
}

/// DELETE /{id}
pub async fn cancel_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<ReservationResponse> {
    let id = parse_id("reservation id", &id)?;
    let reservation = state.engine.cancel_reservation(id, &actor).await?;
    Ok(Json(ReservationResponse { reservation }))
}

/// PUT /{id}/complete
pub async fn complete_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<ReservationResponse> {
    let id = parse_id("reservation id", &id)?;
    let reservation = state
        .engine
        .complete_reservation(id, &actor, today())
        .await?;
    Ok(Json(ReservationResponse { reservation }))
}

/// DELETE /{id}/record
pub async fn archive_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<ReservationResponse> {
    let id = parse_id("reservation id", &id)?;
    let reservation = state.engine.archive_reservation(id, &actor).await?;
    Ok(Json(ReservationResponse { reservation }))
}

/// POST /auto-complete
pub async fn auto_complete(State(state): State<AppState>) -> Json<SweepResponse> {
    let report = sweeper::sweep(state.engine.as_ref(), today()).await;
    Json(SweepResponse {
        completed_count: report.completed,
        failed_count: report.failed.len(),
    })
}
