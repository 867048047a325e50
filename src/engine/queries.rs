use ulid::Ulid;

use crate::model::*;

use super::availability::{booked_intervals, expand_booked_dates, is_free};
use super::lifecycle::party_of;
use super::pricing::quote;
use super::{Engine, EngineError};

impl Engine {
    /// Whether `stay` is free on a live room, ignoring `excluding` if given.
    pub async fn is_available(
        &self,
        room_id: Ulid,
        stay: &Stay,
        excluding: Option<Ulid>,
    ) -> Result<bool, EngineError> {
        self.live_room(room_id).await?;
        let Some(rs) = self.get_room_state(&room_id) else {
            return Ok(true);
        };
        let guard = rs.read().await;
        Ok(is_free(&guard, stay, self.policy, excluding))
    }

    /// Availability plus what the stay would cost.
    pub async fn check_availability(
        &self,
        room_id: Ulid,
        stay: &Stay,
    ) -> Result<AvailabilityReport, EngineError> {
        let room = self.live_room(room_id).await?;
        let priced = quote(room.nightly_rate, stay.start_date, stay.end_date)?;
        let available = self.is_available(room_id, stay, None).await?;
        Ok(AvailabilityReport {
            available,
            quote: priced,
        })
    }

    pub async fn booked_intervals(&self, room_id: Ulid) -> Result<Vec<BookedInterval>, EngineError> {
        self.live_room(room_id).await?;
        let Some(rs) = self.get_room_state(&room_id) else {
            return Ok(Vec::new());
        };
        let guard = rs.read().await;
        Ok(booked_intervals(&guard, self.policy))
    }

    /// Occupied nights for calendar widgets, derived from `booked_intervals`.
    pub async fn booked_dates(&self, room_id: Ulid) -> Result<BookedCalendar, EngineError> {
        let intervals = self.booked_intervals(room_id).await?;
        let dates = expand_booked_dates(&intervals);
        Ok(BookedCalendar { intervals, dates })
    }

    pub async fn get_reservation(&self, id: Ulid, actor: &Actor) -> Result<Reservation, EngineError> {
        let room_id = self
            .room_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let room = self.known_room(room_id).await?;
        let rs = self
            .get_room_state(&room_id)
            .ok_or(EngineError::NotFound(id))?;
        let reservation = rs
            .read()
            .await
            .get(&id)
            .filter(|r| !r.deleted)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        party_of(actor, &reservation, &room)?;
        Ok(reservation)
    }

    /// The caller's own live reservations, newest first.
    pub async fn list_for_customer(&self, actor: &Actor) -> Vec<Reservation> {
        let rooms: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for rs in rooms {
            let guard = rs.read().await;
            out.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| !r.deleted && r.customer_id == actor.user_id)
                    .cloned(),
            );
        }
        newest_first(&mut out);
        out
    }

    /// Live reservations on every room the caller owns, newest first.
    pub async fn list_for_owner(&self, actor: &Actor) -> Result<Vec<Reservation>, EngineError> {
        if actor.role != Role::Owner {
            return Err(EngineError::Unauthorized(actor.user_id));
        }
        let mut out = Vec::new();
        for room_id in self.rooms.rooms_owned_by(actor.user_id).await {
            let Some(rs) = self.get_room_state(&room_id) else {
                continue;
            };
            let guard = rs.read().await;
            out.extend(guard.reservations.iter().filter(|r| !r.deleted).cloned());
        }
        newest_first(&mut out);
        Ok(out)
    }
}

fn newest_first(reservations: &mut [Reservation]) {
    reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
