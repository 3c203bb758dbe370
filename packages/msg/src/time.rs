//! Block-time helpers. All durations are expressed in seconds of
//! `block_time`; wall-clock time is never consulted.

use cosmwasm_std::Timestamp;

/// Seconds per hour
pub const HOUR_SECONDS: u64 = 60 * 60;
/// Seconds per day
pub const DAY_SECONDS: u64 = 24 * HOUR_SECONDS;
/// Seconds per (365 day) year
pub const YEAR_SECONDS: u64 = 365 * DAY_SECONDS;

/// The UTC day bucket a timestamp falls into, for daily rate limits.
pub fn day_number(ts: Timestamp) -> u64 {
    ts.seconds() / DAY_SECONDS
}

/// Whether `deadline` has passed at `now`. A deadline is exclusive: the
/// first instant strictly after it counts as expired.
pub fn expired(now: Timestamp, deadline: Timestamp) -> bool {
    now > deadline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_exclusive() {
        let deadline = Timestamp::from_seconds(100);
        assert!(!expired(Timestamp::from_seconds(100), deadline));
        assert!(expired(Timestamp::from_seconds(101), deadline));
    }

    #[test]
    fn day_buckets() {
        assert_eq!(day_number(Timestamp::from_seconds(0)), 0);
        assert_eq!(day_number(Timestamp::from_seconds(DAY_SECONDS - 1)), 0);
        assert_eq!(day_number(Timestamp::from_seconds(DAY_SECONDS)), 1);
    }
}
