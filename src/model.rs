use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minor currency units (e.g. cents). All prices are integral.
pub type Money = u64;

/// Half-open stay `[start_date, end_date)`. The checkout day is not occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stay {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Stay {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        debug_assert!(start_date < end_date, "Stay start must be before end");
        Self { start_date, end_date }
    }

    /// Whole calendar nights, independent of wall-clock time or DST.
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub fn overlaps(&self, other: &Stay) -> bool {
        self.start_date < other.end_date && other.start_date < self.end_date
    }

    /// Every occupied night, checkout day excluded.
    pub fn nights_iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |d| *d < self.end_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Completed | ReservationStatus::Cancelled
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which statuses block a room's calendar.
///
/// Availability checks and the booked-dates query both go through
/// [`OccupancyPolicy::occupies`] so they can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyPolicy {
    /// Only approved reservations block. Overlapping pending requests may
    /// coexist; the owner's approval decides which one wins.
    ApprovedOnly,
    /// Pending requests block too, so a slot is first-come first-served.
    PendingOrApproved,
}

pub const DEFAULT_OCCUPANCY_POLICY: OccupancyPolicy = OccupancyPolicy::ApprovedOnly;

impl OccupancyPolicy {
    pub fn occupies(self, status: ReservationStatus) -> bool {
        match self {
            OccupancyPolicy::ApprovedOnly => status == ReservationStatus::Approved,
            OccupancyPolicy::PendingOrApproved => matches!(
                status,
                ReservationStatus::Pending | ReservationStatus::Approved
            ),
        }
    }
}

impl FromStr for OccupancyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" | "approved_only" => Ok(OccupancyPolicy::ApprovedOnly),
            "pending_or_approved" => Ok(OccupancyPolicy::PendingOrApproved),
            other => Err(format!("unknown occupancy policy: {other}")),
        }
    }
}

/// Something a caller asks the lifecycle to do to an existing reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
    Cancel,
    Complete,
    Archive,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Cancel => "cancel",
            Action::Complete => "complete",
            Action::Archive => "archive",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Owner,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated caller, as resolved by the upstream session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Ulid,
    pub role: Role,
}

impl Actor {
    pub fn customer(user_id: Ulid) -> Self {
        Self { user_id, role: Role::Customer }
    }

    pub fn owner(user_id: Ulid) -> Self {
        Self { user_id, role: Role::Owner }
    }

    pub fn owns(&self, room: &RoomInfo) -> bool {
        self.role == Role::Owner && self.user_id == room.owner_id
    }
}

/// Read-only view of a room from the room/resort store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Ulid,
    pub resort_id: Ulid,
    /// User id of the owning resort's owner.
    pub owner_id: Ulid,
    pub nightly_rate: Money,
    pub capacity: u32,
    #[serde(default)]
    pub deleted: bool,
}

/// A booking request that has already passed boundary validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRequest {
    pub room_id: Ulid,
    pub stay: Stay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub id: Ulid,
    pub room_id: Ulid,
    pub customer_id: Ulid,
    #[serde(flatten)]
    pub stay: Stay,
    pub total_price: Money,
    pub status: ReservationStatus,
    /// Legacy archive flag, independent of `status`.
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// All reservations of one room, sorted by `stay.start_date`.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room_id: Ulid,
    pub reservations: Vec<Reservation>,
}

impl RoomState {
    pub fn new(room_id: Ulid) -> Self {
        Self {
            room_id,
            reservations: Vec::new(),
        }
    }

    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let start = reservation.stay.start_date;
        let pos = self
            .reservations
            .partition_point(|r| r.stay.start_date <= start);
        self.reservations.insert(pos, reservation);
    }

    pub fn get(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn get_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// Reservations whose stay overlaps `query`. Binary search skips
    /// everything that starts on or after `query.end_date`.
    pub fn overlapping(&self, query: &Stay) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.stay.start_date < query.end_date);
        let query_start = query.start_date;
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.stay.end_date > query_start)
    }
}

/// The WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Also used as the snapshot record when the log is compacted, which is
    /// why it carries the current status and archive flag.
    ReservationCreated {
        id: Ulid,
        room_id: Ulid,
        customer_id: Ulid,
        stay: Stay,
        total_price: Money,
        status: ReservationStatus,
        deleted: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
    StatusChanged {
        id: Ulid,
        room_id: Ulid,
        from: ReservationStatus,
        to: ReservationStatus,
        at: DateTime<Utc>,
    },
    ReservationArchived {
        id: Ulid,
        room_id: Ulid,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn room_id(&self) -> Ulid {
        match self {
            Event::ReservationCreated { room_id, .. }
            | Event::StatusChanged { room_id, .. }
            | Event::ReservationArchived { room_id, .. } => *room_id,
        }
    }

    pub fn snapshot(r: &Reservation) -> Self {
        Event::ReservationCreated {
            id: r.id,
            room_id: r.room_id,
            customer_id: r.customer_id,
            stay: r.stay,
            total_price: r.total_price,
            status: r.status,
            deleted: r.deleted,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookedInterval {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
}

/// A room's occupied intervals and the nights they cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedCalendar {
    pub intervals: Vec<BookedInterval>,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub nights: i64,
    pub total_price: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityReport {
    pub available: bool,
    pub quote: Quote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub completed: usize,
    /// Reservations the sweep tried and failed to complete, with the reason.
    pub failed: Vec<(Ulid, String)>,
}
