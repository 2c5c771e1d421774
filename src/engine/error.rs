use crate::model::{BookingId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Room,
    User,
    Booking,
    Invitation,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Room => write!(f, "room"),
            Entity::User => write!(f, "user"),
            Entity::Booking => write!(f, "booking"),
            Entity::Invitation => write!(f, "invitation"),
        }
    }
}

/// Typed failures the core raises. All are deterministic given the same
/// input and concurrent state; only `Conflict` and `LockTimeout` are worth
/// retrying at the edge, and `LockTimeout` is the transient one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    NotFound(Entity, i64),
    InvalidTimeRange(&'static str),
    InvalidState(&'static str),
    /// An active booking with the given id overlaps the candidate interval.
    Conflict(BookingId),
    Forbidden(&'static str),
    InvalidInput(&'static str),
    /// Waited longer than the policy's lock_wait on this room's lock.
    LockTimeout(RoomId),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::NotFound(entity, id) => write!(f, "{entity} not found: {id}"),
            BookingError::InvalidTimeRange(msg) => write!(f, "invalid time range: {msg}"),
            BookingError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            BookingError::Conflict(id) => write!(f, "conflicts with active booking: {id}"),
            BookingError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            BookingError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            BookingError::LockTimeout(room) => {
                write!(f, "timed out waiting for lock on room: {room}")
            }
        }
    }
}

impl std::error::Error for BookingError {}
