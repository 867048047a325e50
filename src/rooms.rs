use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::RoomInfo;

/// Read-only access to the room/resort store. The engine never mutates rooms.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// The room, including logically deleted ones (`deleted == true`).
    async fn get_room(&self, room_id: Ulid) -> Option<RoomInfo>;

    /// Ids of every room belonging to a resort owned by `owner_id`.
    async fn rooms_owned_by(&self, owner_id: Ulid) -> Vec<Ulid>;
}

/// Directory held in memory, optionally seeded from a JSON array of rooms.
#[derive(Default)]
pub struct InMemoryRooms {
    rooms: DashMap<Ulid, RoomInfo>,
}

impl InMemoryRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_json(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read(path)?;
        let rooms: Vec<RoomInfo> = serde_json::from_slice(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let dir = Self::new();
        for room in rooms {
            dir.upsert(room);
        }
        Ok(dir)
    }

    pub fn upsert(&self, room: RoomInfo) {
        self.rooms.insert(room.id, room);
    }

    /// Tombstone a room. Returns false if it was never known.
    pub fn mark_deleted(&self, room_id: &Ulid) -> bool {
        match self.rooms.get_mut(room_id) {
            Some(mut room) => {
                room.deleted = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRooms {
    async fn get_room(&self, room_id: Ulid) -> Option<RoomInfo> {
        self.rooms.get(&room_id).map(|e| e.value().clone())
    }

    async fn rooms_owned_by(&self, owner_id: Ulid) -> Vec<Ulid> {
        self.rooms
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .map(|e| *e.key())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(owner_id: Ulid) -> RoomInfo {
        RoomInfo {
            id: Ulid::new(),
            resort_id: Ulid::new(),
            owner_id,
            nightly_rate: 100,
            capacity: 2,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let dir = InMemoryRooms::new();
        let r = room(Ulid::new());
        dir.upsert(r.clone());
        assert_eq!(dir.get_room(r.id).await, Some(r));
        assert_eq!(dir.get_room(Ulid::new()).await, None);
    }

    #[tokio::test]
    async fn mark_deleted_keeps_room_visible() {
        let dir = InMemoryRooms::new();
        let r = room(Ulid::new());
        dir.upsert(r.clone());
        assert!(dir.mark_deleted(&r.id));
        assert!(!dir.mark_deleted(&Ulid::new()));
        assert!(dir.get_room(r.id).await.unwrap().deleted);
    }

    #[tokio::test]
    async fn rooms_owned_by_filters_owner() {
        let dir = InMemoryRooms::new();
        let alice = Ulid::new();
        let a1 = room(alice);
        let a2 = room(alice);
        dir.upsert(a1.clone());
        dir.upsert(a2.clone());
        dir.upsert(room(Ulid::new()));

        let mut owned = dir.rooms_owned_by(alice).await;
        owned.sort();
        let mut expected = vec![a1.id, a2.id];
        expected.sort();
        assert_eq!(owned, expected);
    }

    #[tokio::test]
    async fn load_json_seeds_rooms() {
        let path = std::env::temp_dir().join(format!("innkeep_rooms_{}.json", Ulid::new()));
        let r = room(Ulid::new());
        std::fs::write(&path, serde_json::to_vec(&vec![r.clone()]).unwrap()).unwrap();

        let dir = InMemoryRooms::load_json(&path).unwrap();
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get_room(r.id).await, Some(r));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_json_rejects_garbage() {
        let path = std::env::temp_dir().join(format!("innkeep_rooms_{}.json", Ulid::new()));
        std::fs::write(&path, b"not json").unwrap();
        assert!(InMemoryRooms::load_json(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
