//! Collaborator lookups the engine calls outward. The HTTP layer owns the
//! real room/user services; tests and embedded deployments use the
//! in-memory implementation.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{RoomId, RoomInfo, UserId, UserInfo};

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn room(&self, id: RoomId) -> Option<RoomInfo>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user(&self, id: UserId) -> Option<UserInfo>;
}

/// Map-backed directory serving both lookups.
#[derive(Default)]
pub struct InMemoryDirectory {
    rooms: DashMap<RoomId, RoomInfo>,
    users: DashMap<UserId, UserInfo>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&self, room: RoomInfo) {
        self.rooms.insert(room.id, room);
    }

    pub fn add_user(&self, user: UserInfo) {
        self.users.insert(user.id, user);
    }

    pub fn remove_room(&self, id: RoomId) {
        self.rooms.remove(&id);
    }

    pub fn remove_user(&self, id: UserId) {
        self.users.remove(&id);
    }
}

#[async_trait]
impl RoomDirectory for InMemoryDirectory {
    async fn room(&self, id: RoomId) -> Option<RoomInfo> {
        self.rooms.get(&id).map(|e| e.value().clone())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn user(&self, id: UserId) -> Option<UserInfo> {
        self.users.get(&id).map(|e| e.value().clone())
    }
}
