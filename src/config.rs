use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Temporal business rules plus engine tuning. Constructed once at process
/// start and handed to [`crate::Engine`]; tests build their own.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// First local hour a booking may start in (inclusive).
    pub open_hour: u32,
    /// Local closing hour; bookings must end before it or exactly on it.
    pub close_hour: u32,
    pub min_duration_min: i64,
    pub max_duration_min: i64,
    /// Slot width for availability grids.
    pub slot_minutes: i64,
    /// Business-timezone offset from UTC in minutes. Business hours are a
    /// local-business rule, so they are evaluated in this fixed offset and
    /// never in the deployment host's zone. Default +120 (Africa/Johannesburg).
    pub business_offset_minutes: i32,
    /// How long a caller may wait on a room's lock before the operation
    /// fails with `LockTimeout`.
    pub lock_wait: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 17,
            min_duration_min: 30,
            max_duration_min: 240,
            slot_minutes: 30,
            business_offset_minutes: 120,
            lock_wait: Duration::from_secs(5),
        }
    }
}

impl BookingPolicy {
    /// Read overrides from `ROOMKIT_*` environment variables, falling back
    /// to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            open_hour: env_parse("ROOMKIT_OPEN_HOUR", d.open_hour),
            close_hour: env_parse("ROOMKIT_CLOSE_HOUR", d.close_hour),
            min_duration_min: env_parse("ROOMKIT_MIN_DURATION_MIN", d.min_duration_min),
            max_duration_min: env_parse("ROOMKIT_MAX_DURATION_MIN", d.max_duration_min),
            slot_minutes: env_parse("ROOMKIT_SLOT_MINUTES", d.slot_minutes),
            business_offset_minutes: env_parse(
                "ROOMKIT_BUSINESS_UTC_OFFSET_MIN",
                d.business_offset_minutes,
            ),
            lock_wait: Duration::from_millis(env_parse(
                "ROOMKIT_LOCK_WAIT_MS",
                d.lock_wait.as_millis() as u64,
            )),
        }
    }

    /// The pinned business timezone as a chrono offset.
    pub fn business_tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let p = BookingPolicy::default();
        assert_eq!(p.open_hour, 9);
        assert_eq!(p.close_hour, 17);
        assert_eq!(p.min_duration_min, 30);
        assert_eq!(p.max_duration_min, 240);
        assert_eq!(p.business_offset_minutes, 120);
    }

    #[test]
    fn business_tz_offset() {
        let p = BookingPolicy::default();
        assert_eq!(p.business_tz().local_minus_utc(), 2 * 3600);

        let negative = BookingPolicy {
            business_offset_minutes: -300,
            ..BookingPolicy::default()
        };
        assert_eq!(negative.business_tz().local_minus_utc(), -5 * 3600);
    }
}
