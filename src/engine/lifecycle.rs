use chrono::{NaiveDate, Utc};
use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, today};
use super::pricing::quote;
use super::{Engine, EngineError};

/// How the caller relates to a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Party {
    Customer,
    Owner,
}

/// Owner wins when a resort owner booked their own room.
pub(super) fn party_of(
    actor: &Actor,
    reservation: &Reservation,
    room: &RoomInfo,
) -> Result<Party, EngineError> {
    if actor.owns(room) {
        Ok(Party::Owner)
    } else if actor.user_id == reservation.customer_id {
        Ok(Party::Customer)
    } else {
        Err(EngineError::Unauthorized(actor.user_id))
    }
}

/// The status table. Who may fire an action is checked separately.
pub fn next_status(from: ReservationStatus, action: Action) -> Option<ReservationStatus> {
    use ReservationStatus::*;
    match (from, action) {
        (Pending, Action::Approve) => Some(Approved),
        (Pending, Action::Reject) => Some(Rejected),
        (Pending | Approved, Action::Cancel) => Some(Cancelled),
        (Approved, Action::Complete) => Some(Completed),
        _ => None,
    }
}

impl Engine {
    /// Price and insert a `pending` reservation. The availability check and
    /// the insert happen under one room write lock, so two requests for the
    /// same room are serialized. Only customers book.
    pub async fn create_reservation(
        &self,
        actor: &Actor,
        request: BookingRequest,
    ) -> Result<Reservation, EngineError> {
        if actor.role != Role::Customer {
            return Err(EngineError::Unauthorized(actor.user_id));
        }
        let _commit = self.write_gate.read().await;
        let room = self.live_room(request.room_id).await?;
        let stay = request.stay;
        let priced = quote(room.nightly_rate, stay.start_date, stay.end_date)?;

        let rs = self.room_state(room.id);
        let guard = rs.write_owned().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many reservations on room"));
        }
        check_no_conflict(&guard, &stay, self.policy, None)?;

        let id = Ulid::new();
        let now = Utc::now();
        let event = Event::ReservationCreated {
            id,
            room_id: room.id,
            customer_id: actor.user_id,
            stay,
            total_price: priced.total_price,
            status: ReservationStatus::Pending,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        let guard = self.persist_and_apply(guard, event).await?;

        metrics::counter!(crate::observability::RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            "reservation {id} created for room {} [{}, {}) by {}, {} nights, total {}",
            room.id, stay.start_date, stay.end_date, actor.user_id, priced.nights, priced.total_price
        );
        guard.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Owner only. Re-checks availability: other reservations may have been
    /// approved for the same nights since this one was requested.
    pub async fn approve_reservation(
        &self,
        id: Ulid,
        actor: &Actor,
    ) -> Result<Reservation, EngineError> {
        self.transition(id, actor, Action::Approve, today()).await
    }

    pub async fn reject_reservation(
        &self,
        id: Ulid,
        actor: &Actor,
    ) -> Result<Reservation, EngineError> {
        self.transition(id, actor, Action::Reject, today()).await
    }

    /// Customers may cancel while pending; the owner may also cancel approved stays.
    pub async fn cancel_reservation(
        &self,
        id: Ulid,
        actor: &Actor,
    ) -> Result<Reservation, EngineError> {
        self.transition(id, actor, Action::Cancel, today()).await
    }

    /// Owner closes out an approved stay that has begun on or before `today`.
    pub async fn complete_reservation(
        &self,
        id: Ulid,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        self.transition(id, actor, Action::Complete, today).await
    }

    /// Legacy soft delete of a finished reservation. Status is left untouched.
    pub async fn archive_reservation(
        &self,
        id: Ulid,
        actor: &Actor,
    ) -> Result<Reservation, EngineError> {
        self.transition(id, actor, Action::Archive, today()).await
    }

    /// Read-modify-write under the room lock: the current status is read and
    /// the new one written without releasing it, so a concurrent decision is
    /// never overwritten.
    async fn transition(
        &self,
        id: Ulid,
        actor: &Actor,
        action: Action,
        today: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        let _commit = self.write_gate.read().await;
        let room_id = self
            .room_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let room = self.known_room(room_id).await?;
        let guard = self.lock_room(room_id).await?;

        let current = guard
            .get(&id)
            .filter(|r| !r.deleted)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;

        let party = party_of(actor, &current, &room)?;
        if party == Party::Customer && !matches!(action, Action::Cancel | Action::Archive) {
            return Err(EngineError::Unauthorized(actor.user_id));
        }

        let invalid = || EngineError::InvalidTransition {
            id,
            from: current.status,
            action,
        };
        let at = Utc::now();
        let event = if action == Action::Archive {
            if !current.status.is_terminal() {
                return Err(invalid());
            }
            Event::ReservationArchived { id, room_id, at }
        } else {
            let to = next_status(current.status, action).ok_or_else(invalid)?;
            match action {
                Action::Cancel
                    if party == Party::Customer && current.status != ReservationStatus::Pending =>
                {
                    return Err(EngineError::CancelNotAllowed {
                        id,
                        status: current.status,
                    });
                }
                Action::Approve => {
                    check_no_conflict(&guard, &current.stay, self.policy, Some(id))?;
                }
                Action::Complete if today < current.stay.start_date => {
                    return Err(EngineError::NotYetStarted {
                        id,
                        start_date: current.stay.start_date,
                    });
                }
                _ => {}
            }
            Event::StatusChanged {
                id,
                room_id,
                from: current.status,
                to,
                at,
            }
        };

        let guard = self.persist_and_apply(guard, event).await?;

        let updated = guard.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        if action == Action::Archive {
            info!("reservation {id} archived by {}", actor.user_id);
        } else {
            metrics::counter!(
                crate::observability::TRANSITIONS_TOTAL,
                "to" => updated.status.as_str(),
                "trigger" => "manual"
            )
            .increment(1);
            info!(
                "reservation {id} {} -> {} by {}",
                current.status, updated.status, actor.user_id
            );
        }
        Ok(updated)
    }

    /// Sweeper step: `approved → completed` if the stay ended before `today`.
    ///
    /// Returns `Ok(false)` when the reservation has already left `approved`
    /// (or is not due); that is a skip, not an error.
    pub async fn complete_if_due(&self, id: Ulid, today: NaiveDate) -> Result<bool, EngineError> {
        let _commit = self.write_gate.read().await;
        let room_id = self
            .room_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = self.lock_room(room_id).await?;

        let Some(current) = guard.get(&id) else {
            return Ok(false);
        };
        if current.deleted
            || current.status != ReservationStatus::Approved
            || current.stay.end_date >= today
        {
            return Ok(false);
        }

        let event = Event::StatusChanged {
            id,
            room_id,
            from: ReservationStatus::Approved,
            to: ReservationStatus::Completed,
            at: Utc::now(),
        };
        self.persist_and_apply(guard, event).await?;

        metrics::counter!(
            crate::observability::TRANSITIONS_TOTAL,
            "to" => ReservationStatus::Completed.as_str(),
            "trigger" => "sweep"
        )
        .increment(1);
        Ok(true)
    }

    /// Approved, live reservations whose stay ended before `today`, as
    /// `(reservation, room)` pairs.
    pub async fn collect_due_completions(&self, today: NaiveDate) -> Vec<(Ulid, Ulid)> {
        let rooms: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut due = Vec::new();
        for rs in rooms {
            let guard = rs.read().await;
            due.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| {
                        !r.deleted
                            && r.status == ReservationStatus::Approved
                            && r.stay.end_date < today
                    })
                    .map(|r| (r.id, guard.room_id)),
            );
        }
        due
    }
}
