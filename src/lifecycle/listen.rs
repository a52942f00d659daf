//! Listen requirement arithmetic shared by the vote guard and the playback progress path.

use crate::models::ListenPolicy;

/// Grace window in seconds a listener may seek past what they have already heard.
pub const DEFAULT_SEEK_TOLERANCE_SECONDS: f64 = 1.5;

const DEFAULT_LISTEN_PERCENTAGE: u8 = 100;

/// Seconds of a track a voter has to hear before voting on it.
pub fn required_listen_seconds(
    duration_seconds: f64,
    percentage: Option<u8>,
    time_limit_minutes: Option<u32>,
) -> f64 {
    let percentage = percentage.unwrap_or(DEFAULT_LISTEN_PERCENTAGE) as f64;
    let by_percentage = duration_seconds * percentage / 100.0;

    match time_limit_minutes {
        Some(minutes) => by_percentage.min(minutes as f64 * 60.0),
        None => by_percentage,
    }
}

/// Threshold for a submission under a league policy, `None` when nothing has to be heard.
pub fn listen_threshold(policy: &ListenPolicy, duration_seconds: Option<f64>) -> Option<f64> {
    if !policy.required {
        return None;
    }

    let duration = duration_seconds.filter(|d| *d > 0.0)?;
    Some(required_listen_seconds(
        duration,
        policy.percentage,
        policy.time_limit_minutes,
    ))
}

pub fn has_listened_enough(listened_until: f64, server_completed: bool, threshold: f64) -> bool {
    server_completed || listened_until >= threshold
}

/// Limits a seek request to what has been heard so far plus the tolerance, and to the track end.
pub fn clamp_seek(requested: f64, listened_until: f64, duration_seconds: f64, tolerance: f64) -> f64 {
    let boundary = (listened_until + tolerance).min(duration_seconds);
    requested.clamp(0.0, boundary.max(0.0))
}

/// Limits a playback progress report. Between two reports playback may cover at most the
/// wall-clock time that passed, anything further ahead is treated like a seek.
pub fn clamp_progress(
    reported: f64,
    listened_until: f64,
    elapsed_seconds: f64,
    duration_seconds: f64,
    tolerance: f64,
) -> f64 {
    clamp_seek(
        reported,
        listened_until + elapsed_seconds.max(0.0),
        duration_seconds,
        tolerance,
    )
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn threshold_takes_the_smaller_of_percentage_and_time_limit() {
        assert_eq!(required_listen_seconds(300.0, Some(50), Some(10)), 150.0);
        assert_eq!(required_listen_seconds(900.0, Some(100), Some(10)), 600.0);
    }

    #[test]
    fn defaults_require_the_whole_track() {
        assert_eq!(required_listen_seconds(212.0, None, None), 212.0);
    }

    #[test]
    fn listening_just_short_is_not_enough() {
        let threshold = required_listen_seconds(300.0, Some(50), Some(10));

        assert!(!has_listened_enough(140.0, false, threshold));
        assert!(has_listened_enough(150.0, false, threshold));
        assert!(has_listened_enough(151.0, false, threshold));
        assert!(has_listened_enough(0.0, true, threshold));
    }

    #[test]
    fn policy_without_requirement_has_no_threshold() {
        let policy = ListenPolicy::default();
        assert_eq!(listen_threshold(&policy, Some(300.0)), None);

        let policy = ListenPolicy {
            required: true,
            percentage: Some(50),
            time_limit_minutes: None,
        };
        assert_eq!(listen_threshold(&policy, Some(300.0)), Some(150.0));
        assert_eq!(listen_threshold(&policy, None), None);
    }

    #[test]
    fn seeking_ahead_is_clamped() {
        assert_eq!(clamp_seek(80.0, 60.0, 120.0, 1.5), 61.5);
        assert_eq!(clamp_seek(30.0, 60.0, 120.0, 1.5), 30.0);
        assert_eq!(clamp_seek(200.0, 119.5, 120.0, 1.5), 120.0);
        assert_eq!(clamp_seek(-5.0, 60.0, 120.0, 1.5), 0.0);
    }

    #[test]
    fn progress_may_advance_by_elapsed_time() {
        assert_eq!(clamp_progress(65.0, 60.0, 5.0, 120.0, 1.5), 65.0);
        assert_eq!(clamp_progress(90.0, 60.0, 5.0, 120.0, 1.5), 66.5);
        assert_eq!(clamp_progress(200.0, 115.0, 30.0, 120.0, 1.5), 120.0);
    }

    #[test]
    fn clock_going_backwards_counts_as_no_time() {
        assert_eq!(clamp_progress(70.0, 60.0, -10.0, 120.0, 1.5), 61.5);
    }
}
