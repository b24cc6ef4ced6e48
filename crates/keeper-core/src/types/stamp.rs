//! Version stamps for optimistic concurrency.
//!
//! A stamp is the `updated_at` timestamp of a secret, held at microsecond
//! precision so it survives storage as an integer and JSON as RFC 3339
//! without losing equality. Writers always move the stamp strictly forward:
//! two edits landing inside the same clock tick still get distinct stamps.

use chrono::{DateTime, Utc};

/// The `updated_at` value used as a concurrency token.
pub type VersionStamp = DateTime<Utc>;

/// Current time truncated to microseconds.
pub fn now() -> VersionStamp {
    from_micros(Utc::now().timestamp_micros()).unwrap_or_else(Utc::now)
}

/// Stamp for a write that replaces a row currently stamped `previous`.
///
/// Never equal to or older than `previous`, even if the wall clock stalls
/// or steps backwards.
pub fn next_after(previous: VersionStamp) -> VersionStamp {
    let current = now();
    let floor = previous.timestamp_micros().saturating_add(1);
    if current.timestamp_micros() >= floor {
        current
    } else {
        from_micros(floor).unwrap_or(current)
    }
}

/// Microseconds since the Unix epoch, the storage representation.
pub fn to_micros(stamp: VersionStamp) -> i64 {
    stamp.timestamp_micros()
}

/// Inverse of [`to_micros`]. `None` when out of chrono's range.
pub fn from_micros(micros: i64) -> Option<VersionStamp> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}
