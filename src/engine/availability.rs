use std::collections::BTreeSet;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

// ── Availability ─────────────────────────────────────────────────

/// First live reservation that blocks `stay` under `policy`, skipping `excluding`.
///
/// Two stays conflict iff `s1 < e2 && s2 < e1`; that single test covers the
/// starts-during, ends-during, contains and contained-by cases.
pub fn find_conflict(
    room: &RoomState,
    stay: &Stay,
    policy: OccupancyPolicy,
    excluding: Option<Ulid>,
) -> Option<Ulid> {
    room.overlapping(stay)
        .filter(|r| !r.deleted && policy.occupies(r.status))
        .find(|r| Some(r.id) != excluding)
        .map(|r| r.id)
}

pub fn is_free(
    room: &RoomState,
    stay: &Stay,
    policy: OccupancyPolicy,
    excluding: Option<Ulid>,
) -> bool {
    find_conflict(room, stay, policy, excluding).is_none()
}

/// Every interval that blocks the calendar, in start order.
pub fn booked_intervals(room: &RoomState, policy: OccupancyPolicy) -> Vec<BookedInterval> {
    room.reservations
        .iter()
        .filter(|r| !r.deleted && policy.occupies(r.status))
        .map(|r| BookedInterval {
            start_date: r.stay.start_date,
            end_date: r.stay.end_date,
            status: r.status,
        })
        .collect()
}

/// Flatten intervals into sorted, de-duplicated occupied nights.
pub fn expand_booked_dates(intervals: &[BookedInterval]) -> Vec<NaiveDate> {
    let mut days = BTreeSet::new();
    for interval in intervals {
        let stay = Stay::new(interval.start_date, interval.end_date);
        days.extend(stay.nights_iter());
    }
    days.into_iter().collect()
}
