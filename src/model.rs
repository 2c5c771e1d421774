use serde::{Deserialize, Serialize};

/// Unix milliseconds — the only time type. The edge layer normalizes all
/// textual datetime encodings to this before calling the core.
pub type Ms = i64;

pub type BookingId = i64;
pub type RoomId = i64;
pub type UserId = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Ms,
    pub end: Ms,
}

impl TimeRange {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Only active bookings participate in conflict resolution; cancelled
    /// and completed bookings never block a new booking.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// A reservation of a room for an interval, owned by a user.
/// Never physically deleted — cancellation is a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub range: TimeRange,
    pub status: BookingStatus,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Booking {
    /// Flatten into the read record with room name/capacity denormalized.
    pub fn view(&self, room: &RoomInfo) -> BookingView {
        BookingView {
            id: self.id,
            room_id: self.room_id,
            room_name: room.name.clone(),
            room_capacity: room.capacity,
            owner_id: self.owner_id,
            title: self.title.clone(),
            description: self.description.clone(),
            start: self.range.start,
            end: self.range.end,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Booking record returned to callers, with room details for read convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingView {
    pub id: BookingId,
    pub room_id: RoomId,
    pub room_name: String,
    pub room_capacity: u32,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub start: Ms,
    pub end: Ms,
    pub status: BookingStatus,
    pub created_at: Ms,
    pub updated_at: Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

/// Read-time status: equals the stored status except that a still-pending
/// invitation on a booking that has already started shows as `expired`.
/// Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// Unique per (booking, invitee) — re-inviting updates the row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub status: InvitationStatus,
    pub invited_at: Ms,
    pub responded_at: Option<Ms>,
}

impl Invitation {
    pub fn display_status(&self, booking_start: Ms, now: Ms) -> DisplayStatus {
        match self.status {
            InvitationStatus::Pending if now >= booking_start => DisplayStatus::Expired,
            InvitationStatus::Pending => DisplayStatus::Pending,
            InvitationStatus::Accepted => DisplayStatus::Accepted,
            InvitationStatus::Declined => DisplayStatus::Declined,
        }
    }

    pub fn view(&self, booking_start: Ms, now: Ms) -> InvitationView {
        InvitationView {
            booking_id: self.booking_id,
            user_id: self.user_id,
            status: self.status,
            display_status: self.display_status(booking_start, now),
            invited_at: self.invited_at,
            responded_at: self.responded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationView {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub status: InvitationStatus,
    pub display_status: DisplayStatus,
    pub invited_at: Ms,
    pub responded_at: Option<Ms>,
}

/// An invitee's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteReply {
    Accepted,
    Declined,
}

/// Directory record for a room. The core only needs existence + identity;
/// name/capacity are carried through for denormalized reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
    pub floor: i32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

// ── Request / filter value objects ───────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub room_id: RoomId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub start: Ms,
    pub end: Ms,
}

/// Partial update overlaid on the current booking; absent fields keep
/// their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdateBooking {
    pub room_id: Option<RoomId>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<BookingStatus>,
}

/// Structured listing filter — every field optional, translated by the
/// store scan instead of string-built query fragments.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub room_id: Option<RoomId>,
    pub owner_id: Option<UserId>,
    /// Calendar day in the business timezone.
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: crate::limits::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, crate::limits::MAX_PAGE_SIZE),
        }
    }
}

/// Partition of a day's business-hours slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub occupied: Vec<TimeRange>,
    pub available: Vec<TimeRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_basics() {
        let r = TimeRange::new(100, 200);
        assert_eq!(r.duration_ms(), 100);
        assert!(r.contains_instant(100));
        assert!(r.contains_instant(199));
        assert!(!r.contains_instant(200)); // half-open
    }

    #[test]
    fn range_overlap() {
        let a = TimeRange::new(100, 200);
        let b = TimeRange::new(150, 250);
        let c = TimeRange::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn active_statuses() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(!BookingStatus::Completed.is_active());
    }

    #[test]
    fn display_status_overlay() {
        let inv = Invitation {
            booking_id: 1,
            user_id: 2,
            status: InvitationStatus::Pending,
            invited_at: 0,
            responded_at: None,
        };
        // Booking starts at t=10_000
        assert_eq!(inv.display_status(10_000, 9_000), DisplayStatus::Pending);
        assert_eq!(inv.display_status(10_000, 10_000), DisplayStatus::Expired);
        assert_eq!(inv.display_status(10_000, 11_000), DisplayStatus::Expired);
    }

    #[test]
    fn display_status_responses_never_expire() {
        let mut inv = Invitation {
            booking_id: 1,
            user_id: 2,
            status: InvitationStatus::Accepted,
            invited_at: 0,
            responded_at: Some(5_000),
        };
        assert_eq!(inv.display_status(10_000, 20_000), DisplayStatus::Accepted);
        inv.status = InvitationStatus::Declined;
        assert_eq!(inv.display_status(10_000, 20_000), DisplayStatus::Declined);
    }

    #[test]
    fn view_keeps_stored_status() {
        let inv = Invitation {
            booking_id: 7,
            user_id: 3,
            status: InvitationStatus::Pending,
            invited_at: 100,
            responded_at: None,
        };
        let view = inv.view(1_000, 2_000);
        assert_eq!(view.status, InvitationStatus::Pending);
        assert_eq!(view.display_status, DisplayStatus::Expired);
    }

    #[test]
    fn page_clamped() {
        let p = Page { page: 0, per_page: 10_000 }.clamped();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, crate::limits::MAX_PAGE_SIZE);
    }
}
