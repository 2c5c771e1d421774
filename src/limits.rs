//! Hard caps guarding the in-memory store.

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_BOOKINGS_PER_ROOM: usize = 10_000;
pub const MAX_INVITEES_PER_CALL: usize = 100;

pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub const MIN_VALID_TIMESTAMP_MS: i64 = 0;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: i64 = 4_102_444_800_000;
