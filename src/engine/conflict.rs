//! Conflict resolution. Runs against a room shelf reachable only through a
//! lock guard, so the scan and the subsequent insert/update are atomic with
//! respect to other writers of the same room.

use crate::model::{BookingId, Ms, TimeRange};

use super::error::BookingError;
use super::store::RoomShelf;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// First active booking overlapping the candidate interval, skipping the
/// excluded id (a booking never conflicts with itself during an update).
pub(crate) fn find_conflict(
    shelf: &RoomShelf,
    candidate: &TimeRange,
    exclude: Option<BookingId>,
) -> Option<BookingId> {
    shelf
        .overlapping(candidate)
        .filter(|b| b.status.is_active())
        .find(|b| Some(b.id) != exclude)
        .map(|b| b.id)
}

pub(crate) fn ensure_no_conflict(
    shelf: &RoomShelf,
    candidate: &TimeRange,
    exclude: Option<BookingId>,
) -> Result<(), BookingError> {
    match find_conflict(shelf, candidate, exclude) {
        Some(existing) => {
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            Err(BookingError::Conflict(existing))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Booking, BookingStatus};
    use std::time::Duration;

    // The owned guard keeps the shelf alive after the store drops.
    async fn shelf_with(bookings: Vec<Booking>) -> super::super::store::RoomTxn {
        let store = super::super::store::BookingStore::new();
        let mut txn = store.begin(1, Duration::from_secs(1)).await.unwrap();
        for b in bookings {
            txn.insert(b);
        }
        txn
    }

    fn booking(id: BookingId, start: Ms, end: Ms, status: BookingStatus) -> Booking {
        Booking {
            id,
            room_id: 1,
            owner_id: 1,
            title: "t".into(),
            description: None,
            range: TimeRange::new(start, end),
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn overlap_with_active_booking_conflicts() {
        let txn = shelf_with(vec![booking(1, 100, 200, BookingStatus::Confirmed)]).await;
        assert_eq!(find_conflict(&txn, &TimeRange::new(150, 250), None), Some(1));
        assert!(matches!(
            ensure_no_conflict(&txn, &TimeRange::new(150, 250), None),
            Err(BookingError::Conflict(1))
        ));
    }

    #[tokio::test]
    async fn touching_boundary_is_not_a_conflict() {
        let txn = shelf_with(vec![booking(1, 100, 200, BookingStatus::Confirmed)]).await;
        assert_eq!(find_conflict(&txn, &TimeRange::new(200, 300), None), None);
        assert_eq!(find_conflict(&txn, &TimeRange::new(0, 100), None), None);
    }

    #[tokio::test]
    async fn inactive_bookings_never_block() {
        let txn = shelf_with(vec![
            booking(1, 100, 200, BookingStatus::Cancelled),
            booking(2, 100, 200, BookingStatus::Completed),
        ])
        .await;
        assert_eq!(find_conflict(&txn, &TimeRange::new(100, 200), None), None);
    }

    #[tokio::test]
    async fn pending_bookings_block() {
        let txn = shelf_with(vec![booking(1, 100, 200, BookingStatus::Pending)]).await;
        assert_eq!(find_conflict(&txn, &TimeRange::new(150, 250), None), Some(1));
    }

    #[tokio::test]
    async fn exclusion_skips_own_row() {
        let txn = shelf_with(vec![
            booking(1, 100, 200, BookingStatus::Confirmed),
            booking(2, 300, 400, BookingStatus::Confirmed),
        ])
        .await;
        // Booking 1 re-validating its own slot sees no conflict...
        assert_eq!(find_conflict(&txn, &TimeRange::new(100, 200), Some(1)), None);
        // ...but moving onto booking 2 does
        assert_eq!(
            find_conflict(&txn, &TimeRange::new(350, 450), Some(1)),
            Some(2)
        );
    }
}
