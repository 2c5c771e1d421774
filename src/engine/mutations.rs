use std::collections::HashSet;

use tracing::info;

use crate::limits::*;
use crate::model::*;
use crate::notify::Notification;

use super::conflict::{ensure_no_conflict, now_ms};
use super::error::{BookingError, Entity};
use super::rules;
use super::Engine;

impl Engine {
    /// Create a booking. Temporal rules are checked before any storage
    /// work; the conflict scan and the insert happen under one room lock,
    /// so a racing overlapping create blocks and then observes this one.
    pub async fn create_booking(&self, req: CreateBooking) -> Result<BookingView, BookingError> {
        validate_title(&req.title)?;
        validate_description(req.description.as_deref())?;
        let range = TimeRange {
            start: req.start,
            end: req.end,
        };
        rules::validate_range(&self.policy, &range)?;

        let room = self.require_room(req.room_id).await?;
        self.require_user(req.owner_id).await?;

        let mut txn = self.room_txn(req.room_id).await?;
        if txn.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(BookingError::InvalidInput("room booking limit reached"));
        }
        ensure_no_conflict(&txn, &range, None)?;

        let now = now_ms();
        let booking = Booking {
            id: self.store.allocate_id(),
            room_id: req.room_id,
            owner_id: req.owner_id,
            title: req.title,
            description: req.description,
            range,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        txn.insert(booking.clone());
        self.store.index(booking.id, req.room_id);
        drop(txn);

        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        info!(booking_id = booking.id, room_id = booking.room_id, "booking created");
        Ok(booking.view(&room))
    }

    /// Overlay a partial update on the stored booking and re-validate. The
    /// conflict scan re-runs (excluding the booking itself) whenever room,
    /// start, or end changed, or whenever the effective status is active —
    /// that covers a bare status transition back into an active state.
    pub async fn update_booking(
        &self,
        id: BookingId,
        patch: UpdateBooking,
    ) -> Result<BookingView, BookingError> {
        if let Some(ref title) = patch.title {
            validate_title(title)?;
        }
        validate_description(patch.description.as_deref())?;

        // One lock covers both scan and write; when the patch moves rooms,
        // source and target shelves are locked together in sorted order.
        let (mut src, mut dst) = self.lock_booking(id, patch.room_id).await?;
        let target_room = dst.as_deref().map(|d| d.room_id).unwrap_or(src.room_id);
        let room_changed = dst.is_some();

        let existing = src
            .get(id)
            .cloned()
            .ok_or(BookingError::NotFound(Entity::Booking, id))?;
        if existing.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState("cannot update a cancelled booking"));
        }

        let range = TimeRange {
            start: patch.start.unwrap_or(existing.range.start),
            end: patch.end.unwrap_or(existing.range.end),
        };
        let status = patch.status.unwrap_or(existing.status);
        let time_changed = patch.start.is_some() || patch.end.is_some();

        if time_changed {
            rules::validate_range(&self.policy, &range)?;
        }
        // Also resolves the denormalized fields for the returned view.
        let room = self.require_room(target_room).await?;

        if room_changed || time_changed || status.is_active() {
            let target_shelf = dst.as_deref().unwrap_or(&src);
            ensure_no_conflict(target_shelf, &range, Some(id))?;
        }

        let mut updated = existing;
        updated.room_id = target_room;
        updated.range = range;
        updated.status = status;
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = Some(description);
        }
        updated.updated_at = now_ms();

        if let Some(target) = dst.as_deref()
            && target.len() >= MAX_BOOKINGS_PER_ROOM
        {
            return Err(BookingError::InvalidInput("room booking limit reached"));
        }

        src.take(id);
        match dst.as_mut() {
            Some(target) => {
                target.insert(updated.clone());
                self.store.index(id, target_room);
            }
            None => src.insert(updated.clone()),
        }
        drop(dst);
        drop(src);

        info!(booking_id = id, room_id = target_room, "booking updated");
        Ok(updated.view(&room))
    }

    /// Cancel a booking. Idempotent: cancelling an already-cancelled
    /// booking succeeds without changing anything. Previously-accepted
    /// invitees are notified after the unit of work commits.
    pub async fn cancel_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let (mut txn, _) = self.lock_booking(id, None).await?;

        let cancelled = {
            let booking = txn
                .get_mut(id)
                .ok_or(BookingError::NotFound(Entity::Booking, id))?;
            if booking.status == BookingStatus::Cancelled {
                return Ok(booking.clone());
            }
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = now_ms();
            booking.clone()
        };
        drop(txn);

        metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        info!(booking_id = id, "booking cancelled");

        let batch: Vec<Notification> = self
            .store
            .invitations_for(id)
            .into_iter()
            .filter(|i| i.status == InvitationStatus::Accepted)
            .map(|i| Notification::BookingCancelled {
                booking_id: id,
                title: cancelled.title.clone(),
                start: cancelled.range.start,
                recipient: i.user_id,
            })
            .collect();
        self.notify_later(batch);

        Ok(cancelled)
    }

    // ── Invitations ──────────────────────────────────────────

    /// Invite users to a booking. Only the owner may invite; the owner and
    /// unknown users are dropped from the list, and an empty survivor set
    /// is an input error. Re-inviting an already-invited user refreshes the
    /// row back to pending.
    pub async fn invite(
        &self,
        booking_id: BookingId,
        requester: UserId,
        invitees: &[UserId],
    ) -> Result<Vec<InvitationView>, BookingError> {
        if invitees.is_empty() {
            return Err(BookingError::InvalidInput("no invitees given"));
        }
        if invitees.len() > MAX_INVITEES_PER_CALL {
            return Err(BookingError::InvalidInput("too many invitees"));
        }

        let booking = self.booking_record(booking_id).await?;
        if booking.owner_id != requester {
            return Err(BookingError::Forbidden(
                "only the booking owner may manage invitations",
            ));
        }

        let mut seen = HashSet::new();
        let mut survivors = Vec::new();
        for &user_id in invitees {
            if user_id == requester || !seen.insert(user_id) {
                continue;
            }
            if self.users.user(user_id).await.is_some() {
                survivors.push(user_id);
            }
        }
        if survivors.is_empty() {
            return Err(BookingError::InvalidInput("no valid invitees"));
        }

        let now = now_ms();
        let mut views = Vec::with_capacity(survivors.len());
        let mut batch = Vec::with_capacity(survivors.len());
        for user_id in survivors {
            let invitation = self.store.upsert_invitation(booking_id, user_id, now);
            views.push(invitation.view(booking.range.start, now));
            batch.push(Notification::InvitationReceived {
                booking_id,
                title: booking.title.clone(),
                start: booking.range.start,
                recipient: user_id,
                owner: booking.owner_id,
            });
        }
        metrics::counter!(crate::observability::INVITATIONS_SENT_TOTAL)
            .increment(views.len() as u64);
        self.notify_later(batch);

        Ok(views)
    }

    /// Remove one invitee. Owner-only; missing pair is a not-found.
    pub async fn remove_invitation(
        &self,
        booking_id: BookingId,
        requester: UserId,
        invitee: UserId,
    ) -> Result<(), BookingError> {
        let booking = self.booking_record(booking_id).await?;
        if booking.owner_id != requester {
            return Err(BookingError::Forbidden(
                "only the booking owner may manage invitations",
            ));
        }
        if !self.store.remove_invitation(booking_id, invitee) {
            return Err(BookingError::NotFound(Entity::Invitation, invitee));
        }
        Ok(())
    }

    /// Record an invitee's response. Allowed strictly before the booking
    /// starts; an acceptance notifies the owner after the write.
    pub async fn respond(
        &self,
        booking_id: BookingId,
        invitee: UserId,
        reply: InviteReply,
    ) -> Result<InvitationView, BookingError> {
        if !self.store.has_invitation(booking_id, invitee) {
            return Err(BookingError::NotFound(Entity::Invitation, invitee));
        }
        let booking = self.booking_record(booking_id).await?;

        let now = now_ms();
        if now >= booking.range.start {
            return Err(BookingError::InvalidState(
                "booking already started or passed",
            ));
        }

        let status = match reply {
            InviteReply::Accepted => InvitationStatus::Accepted,
            InviteReply::Declined => InvitationStatus::Declined,
        };
        let invitation = self
            .store
            .record_response(booking_id, invitee, status, now)
            .ok_or(BookingError::NotFound(Entity::Invitation, invitee))?;

        if status == InvitationStatus::Accepted {
            self.notify_later(vec![Notification::InvitationAccepted {
                booking_id,
                recipient: booking.owner_id,
                invitee,
            }]);
        }

        Ok(invitation.view(booking.range.start, now))
    }
}

fn validate_title(title: &str) -> Result<(), BookingError> {
    if title.trim().is_empty() {
        return Err(BookingError::InvalidInput("title must not be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(BookingError::InvalidInput("title too long"));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), BookingError> {
    if let Some(d) = description
        && d.len() > MAX_DESCRIPTION_LEN
    {
        return Err(BookingError::InvalidInput("description too long"));
    }
    Ok(())
}
