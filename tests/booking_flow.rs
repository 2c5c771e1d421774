use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, TimeZone};

use roomkit::config::BookingPolicy;
use roomkit::directory::InMemoryDirectory;
use roomkit::engine::{BookingError, Engine};
use roomkit::model::{
    BookingStatus, CreateBooking, DisplayStatus, InvitationStatus, InviteReply, Ms, RoomInfo,
    UpdateBooking, UserInfo,
};
use roomkit::notify::{Notification, NotifyHub};

// ── Test infrastructure ──────────────────────────────────────

fn start_engine() -> (Arc<Engine>, Arc<NotifyHub>) {
    let dir = Arc::new(InMemoryDirectory::new());
    dir.add_room(RoomInfo {
        id: 1,
        name: "Boardroom".into(),
        capacity: 10,
        floor: 3,
        active: true,
    });
    dir.add_room(RoomInfo {
        id: 2,
        name: "Huddle".into(),
        capacity: 4,
        floor: 3,
        active: true,
    });
    for (id, name) in [(1, "alice"), (2, "bongani"), (3, "carol")] {
        dir.add_user(UserInfo {
            id,
            name: name.into(),
            email: format!("{name}@example.com"),
        });
    }

    let hub = Arc::new(NotifyHub::new());
    let engine = Engine::new(dir.clone(), dir, hub.clone(), BookingPolicy::default());
    (Arc::new(engine), hub)
}

/// A business-hours instant on 2031-03-03 in the default offset (+02:00).
fn at(h: u32, m: u32) -> Ms {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2031, 3, 3, h, m, 0)
        .unwrap()
        .timestamp_millis()
}

fn booking_req(room: i64, owner: i64, start: Ms, end: Ms) -> CreateBooking {
    CreateBooking {
        room_id: room,
        owner_id: owner,
        title: "Quarterly review".into(),
        description: Some("Agenda to follow".into()),
        start,
        end,
    }
}

/// Wait for a notification with timeout.
async fn recv_notification(
    rx: &mut tokio::sync::broadcast::Receiver<Notification>,
    timeout: Duration,
) -> Option<Notification> {
    tokio::time::timeout(timeout, rx.recv()).await.ok()?.ok()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn full_booking_lifecycle() {
    let (engine, hub) = start_engine();
    let mut invitee_rx = hub.subscribe(2);
    let mut owner_rx = hub.subscribe(1);

    // Alice books the boardroom and invites Bongani
    let booking = engine
        .create_booking(booking_req(1, 1, at(10, 0), at(11, 0)))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    engine.invite(booking.id, 1, &[2]).await.unwrap();
    let received = recv_notification(&mut invitee_rx, Duration::from_secs(1))
        .await
        .expect("invitee should receive the invitation");
    assert!(matches!(
        received,
        Notification::InvitationReceived { recipient: 2, owner: 1, .. }
    ));

    // Bongani accepts; Alice hears about it
    let view = engine
        .respond(booking.id, 2, InviteReply::Accepted)
        .await
        .unwrap();
    assert_eq!(view.status, InvitationStatus::Accepted);
    assert_eq!(view.display_status, DisplayStatus::Accepted);
    let received = recv_notification(&mut owner_rx, Duration::from_secs(1))
        .await
        .expect("owner should hear about the acceptance");
    assert!(matches!(
        received,
        Notification::InvitationAccepted { invitee: 2, .. }
    ));

    // Carol cannot grab the same slot
    let clash = engine
        .create_booking(booking_req(1, 3, at(10, 30), at(11, 30)))
        .await;
    assert_eq!(clash, Err(BookingError::Conflict(booking.id)));

    // Alice reschedules; the old slot opens up for Carol
    engine
        .update_booking(
            booking.id,
            UpdateBooking {
                start: Some(at(14, 0)),
                end: Some(at(15, 0)),
                ..UpdateBooking::default()
            },
        )
        .await
        .unwrap();
    engine
        .create_booking(booking_req(1, 3, at(10, 30), at(11, 30)))
        .await
        .unwrap();

    // Cancelling tells Bongani, who had accepted
    engine.cancel_booking(booking.id).await.unwrap();
    let received = recv_notification(&mut invitee_rx, Duration::from_secs(1))
        .await
        .expect("accepted invitee should hear about the cancellation");
    assert!(matches!(
        received,
        Notification::BookingCancelled { booking_id, recipient: 2, .. }
            if booking_id == booking.id
    ));

    // And the day's availability reflects only Carol's booking
    let day = engine.room_availability(1, "2031-03-03").await.unwrap();
    assert_eq!(day.occupied.len(), 2); // 10:30–11:30 covers two half-hour slots
}

#[tokio::test]
async fn racing_writers_serialize_per_room() {
    let (engine, _hub) = start_engine();

    let mut handles = Vec::new();
    for owner in 1..=3 {
        let boardroom = engine.clone();
        handles.push(tokio::spawn(async move {
            boardroom
                .create_booking(booking_req(1, owner, at(9, 0), at(10, 0)))
                .await
        }));
        let huddle = engine.clone();
        handles.push(tokio::spawn(async move {
            huddle
                .create_booking(booking_req(2, owner, at(9, 0), at(10, 0)))
                .await
        }));
    }

    let mut per_room = std::collections::HashMap::new();
    for handle in handles {
        if let Ok(view) = handle.await.unwrap() {
            *per_room.entry(view.room_id).or_insert(0) += 1;
        }
    }
    // Exactly one winner in each room
    assert_eq!(per_room.get(&1), Some(&1));
    assert_eq!(per_room.get(&2), Some(&1));
}
