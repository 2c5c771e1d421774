//! In-memory booking store. Bookings live on per-room shelves, each behind
//! its own `RwLock`; the exclusive write guard is the serialization point
//! that stands in for a relational store's next-key locking — a racing
//! writer blocks on it and observes the committed state once it acquires.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::model::{Booking, BookingId, Invitation, InvitationStatus, Ms, RoomId, TimeRange, UserId};

use super::error::BookingError;

/// All bookings of one room, sorted by `range.start`. Cancelled and
/// completed bookings stay on the shelf — cancellation is never a delete.
pub struct RoomShelf {
    pub room_id: RoomId,
    bookings: Vec<Booking>,
}

impl RoomShelf {
    fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            bookings: Vec::new(),
        }
    }

    /// Insert maintaining sort order by range.start.
    pub fn insert(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.range.start, |b| b.range.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Remove and return a booking (used when an update moves or re-times it).
    pub fn take(&mut self, id: BookingId) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    /// Bookings whose range overlaps the query window. Binary search skips
    /// everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &TimeRange) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.range.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.range.end > query.start)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

pub type SharedShelf = Arc<RwLock<RoomShelf>>;

/// Unit of work for one room. Holding it is the transaction: writes become
/// visible to the next acquirer when the guard drops (commit); bailing out
/// with `?` before writing leaves the shelf untouched (rollback).
pub struct RoomTxn {
    guard: OwnedRwLockWriteGuard<RoomShelf>,
}

impl Deref for RoomTxn {
    type Target = RoomShelf;

    fn deref(&self) -> &RoomShelf {
        &self.guard
    }
}

impl DerefMut for RoomTxn {
    fn deref_mut(&mut self) -> &mut RoomShelf {
        &mut self.guard
    }
}

pub struct BookingStore {
    shelves: DashMap<RoomId, SharedShelf>,
    /// Reverse lookup: booking id → room id.
    booking_rooms: DashMap<BookingId, RoomId>,
    /// Invitation rows keyed by booking; uniqueness per (booking, user) is
    /// enforced by upsert under the entry guard.
    invitations: DashMap<BookingId, Vec<Invitation>>,
    next_id: AtomicI64,
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            shelves: DashMap::new(),
            booking_rooms: DashMap::new(),
            invitations: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn allocate_id(&self) -> BookingId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn shelf(&self, room_id: RoomId) -> SharedShelf {
        self.shelves
            .entry(room_id)
            .or_insert_with(|| Arc::new(RwLock::new(RoomShelf::new(room_id))))
            .clone()
    }

    /// Open a unit of work on a room, waiting at most `wait` for the lock.
    pub async fn begin(&self, room_id: RoomId, wait: Duration) -> Result<RoomTxn, BookingError> {
        let shelf = self.shelf(room_id);
        match tokio::time::timeout(wait, shelf.write_owned()).await {
            Ok(guard) => Ok(RoomTxn { guard }),
            Err(_) => {
                metrics::counter!(crate::observability::LOCK_TIMEOUTS_TOTAL).increment(1);
                tracing::warn!(room_id, "lock wait exceeded {wait:?}");
                Err(BookingError::LockTimeout(room_id))
            }
        }
    }

    /// Open units of work on two distinct rooms, always acquiring in sorted
    /// id order so concurrent movers cannot deadlock.
    pub async fn begin_pair(
        &self,
        a: RoomId,
        b: RoomId,
        wait: Duration,
    ) -> Result<(RoomTxn, RoomTxn), BookingError> {
        debug_assert_ne!(a, b);
        if a < b {
            let txn_a = self.begin(a, wait).await?;
            let txn_b = self.begin(b, wait).await?;
            Ok((txn_a, txn_b))
        } else {
            let txn_b = self.begin(b, wait).await?;
            let txn_a = self.begin(a, wait).await?;
            Ok((txn_a, txn_b))
        }
    }

    /// Shared read access for query paths — no locking discipline needed.
    pub async fn snapshot(&self, room_id: RoomId) -> OwnedRwLockReadGuard<RoomShelf> {
        self.shelf(room_id).read_owned().await
    }

    pub fn index(&self, booking_id: BookingId, room_id: RoomId) {
        self.booking_rooms.insert(booking_id, room_id);
    }

    pub fn locate(&self, booking_id: BookingId) -> Option<RoomId> {
        self.booking_rooms.get(&booking_id).map(|e| *e.value())
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.shelves.iter().map(|e| *e.key()).collect()
    }

    // ── Invitations ──────────────────────────────────────────

    pub fn invitations_for(&self, booking_id: BookingId) -> Vec<Invitation> {
        self.invitations
            .get(&booking_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn has_invitation(&self, booking_id: BookingId, user_id: UserId) -> bool {
        self.invitations
            .get(&booking_id)
            .is_some_and(|rows| rows.iter().any(|i| i.user_id == user_id))
    }

    /// Insert or refresh the (booking, user) row: re-inviting resets the
    /// status to pending with a fresh invited_at.
    pub fn upsert_invitation(
        &self,
        booking_id: BookingId,
        user_id: UserId,
        now: Ms,
    ) -> Invitation {
        let mut rows = self.invitations.entry(booking_id).or_default();
        if let Some(row) = rows.iter_mut().find(|i| i.user_id == user_id) {
            row.status = InvitationStatus::Pending;
            row.invited_at = now;
            row.responded_at = None;
            row.clone()
        } else {
            let invitation = Invitation {
                booking_id,
                user_id,
                status: InvitationStatus::Pending,
                invited_at: now,
                responded_at: None,
            };
            rows.push(invitation.clone());
            invitation
        }
    }

    pub fn record_response(
        &self,
        booking_id: BookingId,
        user_id: UserId,
        status: InvitationStatus,
        now: Ms,
    ) -> Option<Invitation> {
        let mut rows = self.invitations.get_mut(&booking_id)?;
        let row = rows.iter_mut().find(|i| i.user_id == user_id)?;
        row.status = status;
        row.responded_at = Some(now);
        Some(row.clone())
    }

    pub fn remove_invitation(&self, booking_id: BookingId, user_id: UserId) -> bool {
        let Some(mut rows) = self.invitations.get_mut(&booking_id) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|i| i.user_id != user_id);
        rows.len() != before
    }

    /// Booking ids the user has an invitation row on.
    pub fn invited_bookings(&self, user_id: UserId) -> Vec<BookingId> {
        self.invitations
            .iter()
            .filter(|e| e.value().iter().any(|i| i.user_id == user_id))
            .map(|e| *e.key())
            .collect()
    }
}
