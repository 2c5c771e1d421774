mod conflict;
mod error;
mod mutations;
mod queries;
mod rules;
mod store;

pub use error::{BookingError, Entity};
pub use rules::{day_slots, partition_slots, validate_duration, within_business_hours};
pub use store::{BookingStore, RoomShelf, RoomTxn};

use std::sync::Arc;

use crate::config::BookingPolicy;
use crate::directory::{RoomDirectory, UserDirectory};
use crate::model::{Booking, BookingId, RoomId, RoomInfo, UserId, UserInfo};
use crate::notify::{Notification, Notifier};

/// Bound on chasing a booking across back-to-back concurrent room moves.
const MOVE_CHASE_LIMIT: usize = 8;

/// Booking lifecycle + invitation engine. All collaborators are injected at
/// construction; callers arrive pre-authenticated (user id + privilege
/// flag) and the engine re-checks the business invariants itself.
pub struct Engine {
    pub(crate) store: BookingStore,
    pub(crate) rooms: Arc<dyn RoomDirectory>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) policy: BookingPolicy,
}

impl Engine {
    pub fn new(
        rooms: Arc<dyn RoomDirectory>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store: BookingStore::new(),
            rooms,
            users,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub(crate) async fn require_room(&self, id: RoomId) -> Result<RoomInfo, BookingError> {
        self.rooms
            .room(id)
            .await
            .ok_or(BookingError::NotFound(Entity::Room, id))
    }

    pub(crate) async fn require_user(&self, id: UserId) -> Result<UserInfo, BookingError> {
        self.users
            .user(id)
            .await
            .ok_or(BookingError::NotFound(Entity::User, id))
    }

    /// Open the serializing unit of work for a room, bounded by the policy
    /// lock wait.
    pub(crate) async fn room_txn(&self, room_id: RoomId) -> Result<RoomTxn, BookingError> {
        self.store.begin(room_id, self.policy.lock_wait).await
    }

    /// Lock the room a booking currently lives in, plus the requested target
    /// room when it differs (sorted acquisition order). The booking→room
    /// index is read before the lock is granted, so a concurrent update may
    /// move the booking in between; a mover repoints the index before
    /// releasing its guards, which makes one re-check per move enough to
    /// chase it to the new room.
    pub(crate) async fn lock_booking(
        &self,
        id: BookingId,
        requested_room: Option<RoomId>,
    ) -> Result<(RoomTxn, Option<RoomTxn>), BookingError> {
        let mut room_id = self
            .store
            .locate(id)
            .ok_or(BookingError::NotFound(Entity::Booking, id))?;
        for _ in 0..MOVE_CHASE_LIMIT {
            let target = requested_room.unwrap_or(room_id);
            let (src, dst) = if target == room_id {
                (self.room_txn(room_id).await?, None)
            } else {
                let (src, dst) = self
                    .store
                    .begin_pair(room_id, target, self.policy.lock_wait)
                    .await?;
                (src, Some(dst))
            };
            if src.get(id).is_some() {
                return Ok((src, dst));
            }
            drop(dst);
            drop(src);

            let moved_to = self
                .store
                .locate(id)
                .ok_or(BookingError::NotFound(Entity::Booking, id))?;
            if moved_to == room_id {
                return Err(BookingError::NotFound(Entity::Booking, id));
            }
            room_id = moved_to;
        }
        Err(BookingError::LockTimeout(room_id))
    }

    /// Current stored booking, read under the room's shared lock. Chases
    /// concurrent room moves the same way `lock_booking` does.
    pub(crate) async fn booking_record(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut room_id = self
            .store
            .locate(id)
            .ok_or(BookingError::NotFound(Entity::Booking, id))?;
        for _ in 0..MOVE_CHASE_LIMIT {
            let shelf = self.store.snapshot(room_id).await;
            if let Some(booking) = shelf.get(id) {
                return Ok(booking.clone());
            }
            drop(shelf);

            let moved_to = self
                .store
                .locate(id)
                .ok_or(BookingError::NotFound(Entity::Booking, id))?;
            if moved_to == room_id {
                return Err(BookingError::NotFound(Entity::Booking, id));
            }
            room_id = moved_to;
        }
        Err(BookingError::NotFound(Entity::Booking, id))
    }

    /// Fan out notifications off the request path, after the owning unit of
    /// work has been released. Failures are logged and counted, never raised.
    pub(crate) fn notify_later(&self, batch: Vec<Notification>) {
        if batch.is_empty() {
            return;
        }
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let sends = batch.into_iter().map(|notification| {
                let notifier = notifier.clone();
                async move {
                    if let Err(e) = notifier.deliver(notification).await {
                        metrics::counter!(crate::observability::NOTIFICATIONS_FAILED_TOTAL)
                            .increment(1);
                        tracing::warn!("{e}");
                    }
                }
            });
            futures::future::join_all(sends).await;
        });
    }
}
