//! Position Calculator: given an ordered list of item durations, a playlist
//! anchor time, and the current time, decide which item a freshly (re)started
//! engine should resume into and at what offset, so that a restart mid-day
//! lands on the item the schedule implies rather than always item 0.

use chrono::{DateTime, Utc};

/// Durations are deemed to the same unit (seconds) regardless of source type;
/// callers are expected to have already substituted `86400.0` for
/// null-duration (infinite) UDP items before calling this function.
const ONE_DAY_SECONDS: f64 = 86_400.0;

/// Returns `(start_index, start_offset_seconds)`.
///
/// Returns `(0, 0.0)` if `durations` is empty — a safe fallback matching the
/// "any item-metadata lookup failure" clause; callers with a genuinely empty
/// playlist should have already failed earlier with `EmptyPlaylist`.
#[must_use]
pub fn calculate(durations: &[f64], anchor: DateTime<Utc>, now: DateTime<Utc>) -> (usize, f64) {
    if durations.is_empty() {
        return (0, 0.0);
    }

    let elapsed = (now - anchor).num_milliseconds() as f64 / 1000.0;
    let elapsed = elapsed.max(0.0);

    let total_duration: f64 = durations.iter().sum();
    let modulus = total_duration.max(1.0).min(ONE_DAY_SECONDS);
    let phase = elapsed % modulus;

    let mut cumulative = 0.0;
    for (index, &duration) in durations.iter().enumerate() {
        let next_cumulative = cumulative + duration;
        if phase < next_cumulative || index == durations.len() - 1 {
            return (index, (phase - cumulative).max(0.0));
        }
        cumulative = next_cumulative;
    }

    (0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn anchor() -> DateTime<Utc> {
        "2026-01-01T06:00:00Z".parse().unwrap()
    }

    #[test]
    fn empty_durations_returns_zero() {
        assert_eq!(calculate(&[], anchor(), anchor()), (0, 0.0));
    }

    #[test]
    fn now_equals_anchor_starts_at_first_item() {
        let durations = [600.0, 1800.0, 900.0];
        assert_eq!(calculate(&durations, anchor(), anchor()), (0, 0.0));
    }

    #[test]
    fn mid_playlist_start() {
        // anchor 06:00:00; items [600, 1800, 900]; now = anchor + 700s
        let durations = [600.0, 1800.0, 900.0];
        let now = anchor() + Duration::seconds(700);
        assert_eq!(calculate(&durations, anchor(), now), (1, 100.0));
    }

    #[test]
    fn infinite_udp_item_treated_as_one_day() {
        // item type=udp, stream.duration=null -> caller substitutes 86400
        let durations = [30_000.0, ONE_DAY_SECONDS];
        let now = anchor() + Duration::seconds(30_000 + 5_000);
        let (index, offset) = calculate(&durations, anchor(), now);
        assert_eq!(index, 1);
        assert_eq!(offset, 5_000.0);
    }

    #[test]
    fn phase_never_exceeds_one_day() {
        let durations = [200_000.0];
        let now = anchor() + Duration::seconds(150_000);
        let (index, offset) = calculate(&durations, anchor(), now);
        assert_eq!(index, 0);
        assert!(offset < ONE_DAY_SECONDS);
    }

    #[test]
    fn start_index_in_bounds_for_generated_cases() {
        // property-style sweep: in-bounds index/offset for a range of
        // synthetic durations and elapsed times.
        let durations = [120.0, 340.0, 5.0, 9000.0];
        let total: f64 = durations.iter().sum();
        for elapsed_secs in (0..(total as i64 * 2)).step_by(37) {
            let now = anchor() + Duration::seconds(elapsed_secs);
            let (index, offset) = calculate(&durations, anchor(), now);
            assert!(index < durations.len());
            assert!(offset >= 0.0);
            assert!(offset < durations[index].max(ONE_DAY_SECONDS));
        }
    }
}
