mod availability;
mod conflict;
mod error;
mod lifecycle;
mod pricing;
mod queries;

pub use availability::{booked_intervals, expand_booked_dates, find_conflict, is_free};
pub use conflict::{parse_date, today, validate_booking, validate_stay};
pub use error::EngineError;
pub use pricing::quote;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, OwnedRwLockWriteGuard, RwLock};
use tracing::{error, info};
use ulid::Ulid;

use crate::model::*;
use crate::rooms::RoomDirectory;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

type Ack = oneshot::Sender<io::Result<()>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append { event: Event, response: Ack },
    Compact { events: Vec<Event>, response: Ack },
    AppendsSinceCompact { response: oneshot::Sender<u64> },
}

/// Owns the WAL. Each wakeup drains every append already queued and commits
/// them with a single fsync; a non-append command found while draining runs
/// right after that batch.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }
        commit_batch(&mut wal, batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: Vec<(Event, Ack)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();

    let mut result = Ok(());
    for (event, _) in &batch {
        if let Err(e) = wal.append_buffered(event) {
            result = Err(e);
            break;
        }
    }
    if result.is_ok() {
        result = wal.flush_sync();
    }
    // A batch commits whole or not at all: every sender sees the same
    // outcome, so nothing is applied that the log might still replay.
    if let Err(e) = &result {
        error!("WAL commit of {} events failed: {e}", batch.len());
        if let Err(e) = wal.rollback() {
            error!("WAL rollback failed, log may hold unacknowledged events: {e}");
        }
    }

    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let reply = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(reply);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

async fn wal_append(wal_tx: &mpsc::Sender<WalCommand>, event: &Event) -> Result<(), EngineError> {
    let (tx, rx) = oneshot::channel();
    wal_tx
        .send(WalCommand::Append {
            event: event.clone(),
            response: tx,
        })
        .await
        .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
    rx.await
        .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
        .map_err(|e| EngineError::WalError(e.to_string()))
}

/// Apply an event to a room (no locking; caller holds the room's write lock).
fn apply_to_room(rs: &mut RoomState, event: &Event, index: &DashMap<Ulid, Ulid>) {
    match event {
        Event::ReservationCreated {
            id,
            room_id,
            customer_id,
            stay,
            total_price,
            status,
            deleted,
            created_at,
            updated_at,
        } => {
            rs.insert_reservation(Reservation {
                id: *id,
                room_id: *room_id,
                customer_id: *customer_id,
                stay: *stay,
                total_price: *total_price,
                status: *status,
                deleted: *deleted,
                created_at: *created_at,
                updated_at: *updated_at,
            });
            index.insert(*id, *room_id);
        }
        Event::StatusChanged { id, to, at, .. } => {
            if let Some(r) = rs.get_mut(id) {
                r.status = *to;
                r.updated_at = *at;
            }
        }
        Event::ReservationArchived { id, at, .. } => {
            if let Some(r) = rs.get_mut(id) {
                r.deleted = true;
                r.updated_at = *at;
            }
        }
    }
}

pub struct Engine {
    /// Per-room reservation lists. A room's write lock is the unit of
    /// atomicity for check-then-insert and for every status change.
    pub state: DashMap<Ulid, SharedRoomState>,
    pub rooms: Arc<dyn RoomDirectory>,
    pub policy: OccupancyPolicy,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: reservation id → room id.
    pub(super) reservation_to_room: Arc<DashMap<Ulid, Ulid>>,
    /// Mutations hold this shared, before any room lock; compaction holds it
    /// exclusively so no event can slip in between snapshot and swap.
    pub(super) write_gate: RwLock<()>,
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        rooms: Arc<dyn RoomDirectory>,
        policy: OccupancyPolicy,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            rooms,
            policy,
            wal_tx,
            reservation_to_room: Arc::new(DashMap::new()),
            write_gate: RwLock::new(()),
        };

        // Nobody else has these Arcs yet, so try_write never contends. Don't
        // use blocking_write: this runs inside the runtime.
        for event in &events {
            let rs = engine.room_state(event.room_id());
            let mut guard = rs.try_write().expect("replay: uncontended write");
            apply_to_room(&mut guard, event, &engine.reservation_to_room);
        }
        info!(
            "replayed {} events, {} reservations across {} rooms",
            events.len(),
            engine.reservation_to_room.len(),
            engine.state.len()
        );

        Ok(engine)
    }

    /// Room state, created empty on first use.
    pub fn room_state(&self, room_id: Ulid) -> SharedRoomState {
        self.state
            .entry(room_id)
            .or_insert_with(|| Arc::new(RwLock::new(RoomState::new(room_id))))
            .value()
            .clone()
    }

    pub fn get_room_state(&self, room_id: &Ulid) -> Option<SharedRoomState> {
        self.state.get(room_id).map(|e| e.value().clone())
    }

    pub fn room_for_reservation(&self, id: &Ulid) -> Option<Ulid> {
        self.reservation_to_room.get(id).map(|e| *e.value())
    }

    /// WAL-append, then apply, on a task of its own that owns the room lock.
    ///
    /// Once the event is queued it is applied too, even if the caller's
    /// future is dropped (a client disconnect), so memory never lags the log.
    pub(super) async fn persist_and_apply(
        &self,
        mut guard: OwnedRwLockWriteGuard<RoomState>,
        event: Event,
    ) -> Result<OwnedRwLockWriteGuard<RoomState>, EngineError> {
        let wal_tx = self.wal_tx.clone();
        let index = self.reservation_to_room.clone();
        let commit = tokio::spawn(async move {
            wal_append(&wal_tx, &event).await?;
            apply_to_room(&mut guard, &event, &index);
            Ok::<_, EngineError>(guard)
        });
        commit
            .await
            .map_err(|e| EngineError::WalError(format!("commit task failed: {e}")))?
    }

    pub(super) async fn lock_room(
        &self,
        room_id: Ulid,
    ) -> Result<OwnedRwLockWriteGuard<RoomState>, EngineError> {
        let rs = self
            .get_room_state(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        Ok(rs.write_owned().await)
    }

    /// A room that exists and is not tombstoned.
    pub(super) async fn live_room(&self, room_id: Ulid) -> Result<RoomInfo, EngineError> {
        match self.rooms.get_room(room_id).await {
            Some(room) if !room.deleted => Ok(room),
            _ => Err(EngineError::NotFound(room_id)),
        }
    }

    /// A room as far as authorization goes: tombstoned rooms still have owners.
    pub(super) async fn known_room(&self, room_id: Ulid) -> Result<RoomInfo, EngineError> {
        self.rooms
            .get_room(room_id)
            .await
            .ok_or(EngineError::NotFound(room_id))
    }

    /// Rewrite the WAL as one snapshot event per reservation.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _exclusive = self.write_gate.write().await;

        let rooms: Vec<SharedRoomState> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut events = Vec::new();
        for rs in rooms {
            let guard = rs.read().await;
            events.extend(guard.reservations.iter().map(Event::snapshot));
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
