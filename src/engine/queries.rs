use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::*;

use super::conflict::now_ms;
use super::error::BookingError;
use super::rules;
use super::Engine;

impl Engine {
    /// Fetch one booking with room details denormalized.
    pub async fn booking(&self, id: BookingId) -> Result<BookingView, BookingError> {
        let booking = self.booking_record(id).await?;
        let room = self.require_room(booking.room_id).await?;
        Ok(booking.view(&room))
    }

    /// Bookings the user owns or is invited to, optionally narrowed by
    /// status, sorted by start time, paginated.
    pub async fn bookings_for_user(
        &self,
        user_id: UserId,
        status: Option<BookingStatus>,
        page: Page,
    ) -> Vec<Booking> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();

        for room_id in self.store.room_ids() {
            let shelf = self.store.snapshot(room_id).await;
            for booking in shelf.iter() {
                if booking.owner_id == user_id && seen.insert(booking.id) {
                    result.push(booking.clone());
                }
            }
        }
        for booking_id in self.store.invited_bookings(user_id) {
            if seen.insert(booking_id)
                && let Ok(booking) = self.booking_record(booking_id).await
            {
                result.push(booking);
            }
        }

        if let Some(status) = status {
            result.retain(|b| b.status == status);
        }
        result.sort_by_key(|b| (b.range.start, b.id));
        paginate(result, page)
    }

    /// Filtered listing for privileged callers — the edge decides who may
    /// call this; the records carry owner identity for that decision.
    pub async fn list_bookings(&self, filter: &BookingFilter, page: Page) -> Vec<Booking> {
        let rooms = match filter.room_id {
            Some(room_id) => vec![room_id],
            None => self.store.room_ids(),
        };
        let day = filter
            .date
            .map(|date| rules::day_window(&self.policy, date));

        let mut result = Vec::new();
        for room_id in rooms {
            let shelf = self.store.snapshot(room_id).await;
            for booking in shelf.iter() {
                if let Some(status) = filter.status
                    && booking.status != status
                {
                    continue;
                }
                if let Some(owner_id) = filter.owner_id
                    && booking.owner_id != owner_id
                {
                    continue;
                }
                if let Some(ref window) = day
                    && !booking.range.overlaps(window)
                {
                    continue;
                }
                result.push(booking.clone());
            }
        }
        result.sort_by_key(|b| (b.range.start, b.id));
        paginate(result, page)
    }

    /// Occupied/available slot partition for a room on a calendar day
    /// (`YYYY-MM-DD`, interpreted in the business timezone).
    pub async fn room_availability(
        &self,
        room_id: RoomId,
        date: &str,
    ) -> Result<DayAvailability, BookingError> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| BookingError::InvalidInput("invalid date, expected YYYY-MM-DD"))?;
        self.require_room(room_id).await?;

        let slots = rules::day_slots(&self.policy, date);
        let Some(window) = slots
            .first()
            .zip(slots.last())
            .map(|(first, last)| TimeRange::new(first.start, last.end))
        else {
            return Ok(DayAvailability {
                occupied: Vec::new(),
                available: Vec::new(),
            });
        };

        let shelf = self.store.snapshot(room_id).await;
        let booked: Vec<TimeRange> = shelf
            .overlapping(&window)
            .filter(|b| b.status.is_active())
            .map(|b| b.range)
            .collect();
        drop(shelf);

        let (occupied, available) = rules::partition_slots(&slots, &booked);
        Ok(DayAvailability {
            occupied,
            available,
        })
    }

    /// All invitations on a booking with the read-time expiry overlay.
    /// Visible to privileged callers, the owner, and invitees.
    pub async fn invitations(
        &self,
        booking_id: BookingId,
        requester: UserId,
        privileged: bool,
    ) -> Result<Vec<InvitationView>, BookingError> {
        let booking = self.booking_record(booking_id).await?;
        let allowed = privileged
            || booking.owner_id == requester
            || self.store.has_invitation(booking_id, requester);
        if !allowed {
            return Err(BookingError::Forbidden(
                "not a participant of this booking",
            ));
        }

        let now = now_ms();
        Ok(self
            .store
            .invitations_for(booking_id)
            .iter()
            .map(|i| i.view(booking.range.start, now))
            .collect())
    }
}

fn paginate<T>(mut items: Vec<T>, page: Page) -> Vec<T> {
    let page = page.clamped();
    // A page number large enough to overflow the offset is past the end.
    let Some(start) = (page.page - 1).checked_mul(page.per_page) else {
        return Vec::new();
    };
    if start >= items.len() {
        return Vec::new();
    }
    items.drain(..start);
    items.truncate(page.per_page);
    items
}
