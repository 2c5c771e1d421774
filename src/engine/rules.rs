//! Temporal business rules. Pure functions of a policy and instants —
//! no I/O, no retry semantics.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

use crate::config::BookingPolicy;
use crate::model::{Ms, TimeRange};

use super::error::BookingError;

const MINUTE_MS: Ms = 60_000;

fn local(t: Ms, tz: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp_millis(t)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&tz)
}

/// Business-hours check on local wall-clock components in the policy's
/// pinned business timezone: start hour at or after opening, and the end
/// either inside the closing hour or exactly on the closing instant.
pub fn within_business_hours(policy: &BookingPolicy, range: &TimeRange) -> bool {
    let tz = policy.business_tz();
    let start = local(range.start, tz);
    let end = local(range.end, tz);

    if start.hour() < policy.open_hour {
        return false;
    }
    end.hour() < policy.close_hour
        || (end.hour() == policy.close_hour
            && end.minute() == 0
            && end.second() == 0
            && end.nanosecond() == 0)
}

/// True iff `end > start` and the duration falls within the policy bounds,
/// inclusive on both ends.
pub fn validate_duration(policy: &BookingPolicy, range: &TimeRange) -> bool {
    let duration = range.duration_ms();
    duration > 0
        && duration >= policy.min_duration_min * MINUTE_MS
        && duration <= policy.max_duration_min * MINUTE_MS
}

/// Composite validation the lifecycle manager runs before touching storage.
pub fn validate_range(policy: &BookingPolicy, range: &TimeRange) -> Result<(), BookingError> {
    use crate::limits::*;
    if range.start < MIN_VALID_TIMESTAMP_MS || range.end > MAX_VALID_TIMESTAMP_MS {
        return Err(BookingError::InvalidTimeRange("timestamp out of range"));
    }
    if range.end <= range.start {
        return Err(BookingError::InvalidTimeRange("end must be after start"));
    }
    if !validate_duration(policy, range) {
        return Err(BookingError::InvalidTimeRange(
            "duration outside allowed bounds",
        ));
    }
    if !within_business_hours(policy, range) {
        return Err(BookingError::InvalidTimeRange(
            "outside business hours",
        ));
    }
    Ok(())
}

/// All slot-sized slots within business hours of a calendar day, in the
/// business timezone. Deterministic; the last slot ends exactly at closing.
pub fn day_slots(policy: &BookingPolicy, date: NaiveDate) -> Vec<TimeRange> {
    let tz = policy.business_tz();
    let (Some(open), Some(close)) = (
        date.and_hms_opt(policy.open_hour, 0, 0),
        date.and_hms_opt(policy.close_hour, 0, 0),
    ) else {
        return Vec::new();
    };
    let (Some(open), Some(close)) = (
        tz.from_local_datetime(&open).single(),
        tz.from_local_datetime(&close).single(),
    ) else {
        return Vec::new();
    };

    let step = policy.slot_minutes * MINUTE_MS;
    if step <= 0 {
        return Vec::new();
    }
    let close_ms = close.timestamp_millis();
    let mut slots = Vec::new();
    let mut t = open.timestamp_millis();
    while t + step <= close_ms {
        slots.push(TimeRange::new(t, t + step));
        t += step;
    }
    slots
}

/// The whole calendar day `[00:00, next day 00:00)` in the business timezone.
pub fn day_window(policy: &BookingPolicy, date: NaiveDate) -> TimeRange {
    let tz = policy.business_tz();
    let start = day_start(date, tz);
    let end = date.succ_opt().map(|d| day_start(d, tz)).unwrap_or(Ms::MAX);
    TimeRange { start, end }
}

fn day_start(date: NaiveDate, tz: FixedOffset) -> Ms {
    date.and_hms_opt(0, 0, 0)
        .and_then(|ndt| tz.from_local_datetime(&ndt).single())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Partition slots into (occupied, available) against booked intervals.
/// Half-open intersection: `slot.start < b.end && slot.end > b.start`.
pub fn partition_slots(
    slots: &[TimeRange],
    booked: &[TimeRange],
) -> (Vec<TimeRange>, Vec<TimeRange>) {
    let mut occupied = Vec::new();
    let mut available = Vec::new();
    for slot in slots {
        if booked.iter().any(|b| slot.overlaps(b)) {
            occupied.push(*slot);
        } else {
            available.push(*slot);
        }
    }
    (occupied, available)
}
