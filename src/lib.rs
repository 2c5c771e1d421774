//! Booking concurrency-control core for a room-reservation backend.
//!
//! The engine guarantees that no two active (pending/confirmed) bookings for
//! the same room ever overlap in time, even under parallel callers. Every
//! write for a room goes through that room's exclusive lock, so racing
//! candidates are serialized: the first acquirer wins the slot, later
//! acquirers observe the committed state and fail with [`engine::BookingError::Conflict`].
//!
//! Layered on top of bookings is a per-user invitation workflow
//! (pending → accepted/declined, with a read-time `expired` overlay).
//!
//! The surrounding HTTP layer is expected to authenticate callers and
//! normalize datetimes before calling in; room/user lookup and notification
//! delivery are injected through the traits in [`directory`] and [`notify`].

pub mod config;
pub mod directory;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;

pub use config::BookingPolicy;
pub use engine::{BookingError, Engine};
