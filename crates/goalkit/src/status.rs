//! Status assessment policy.
//!
//! | ratio            | status      |
//! |------------------|-------------|
//! | `r < 0.33`       | `OffTrack`  |
//! | `0.33 ≤ r < 0.66`| `AtRisk`    |
//! | `r ≥ 0.66`       | `OnTrack`   |

use crate::types::GoalStatus;

/// Lowest ratio that is no longer off track.
pub const AT_RISK_FROM: f64 = 0.33;

/// Lowest ratio that is on track.
pub const ON_TRACK_FROM: f64 = 0.66;

/// Map a completion ratio to a status.
pub fn status_for_ratio(ratio: f64) -> GoalStatus {
    if ratio < AT_RISK_FROM {
        GoalStatus::OffTrack
    } else if ratio < ON_TRACK_FROM {
        GoalStatus::AtRisk
    } else {
        GoalStatus::OnTrack
    }
}

/// `current / target`, or `None` when the target is zero or the ratio is not finite.
pub fn completion_ratio(current: f64, target: f64) -> Option<f64> {
    if target == 0.0 {
        return None;
    }
    let ratio = current / target;
    ratio.is_finite().then_some(ratio)
}

/// Assess a goal's status from its current and target values.
pub fn assess(current: f64, target: f64) -> Option<GoalStatus> {
    completion_ratio(current, target).map(status_for_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(status_for_ratio(0.3299), GoalStatus::OffTrack);
        assert_eq!(status_for_ratio(0.33), GoalStatus::AtRisk);
        assert_eq!(status_for_ratio(0.6599), GoalStatus::AtRisk);
        assert_eq!(status_for_ratio(0.66), GoalStatus::OnTrack);
    }

    #[test]
    fn test_bands() {
        assert_eq!(status_for_ratio(-1.0), GoalStatus::OffTrack);
        assert_eq!(status_for_ratio(0.0), GoalStatus::OffTrack);
        assert_eq!(status_for_ratio(0.5), GoalStatus::AtRisk);
        assert_eq!(status_for_ratio(1.0), GoalStatus::OnTrack);
        assert_eq!(status_for_ratio(2.5), GoalStatus::OnTrack);
    }

    #[test]
    fn test_assess() {
        assert_eq!(assess(20.0, 100.0), Some(GoalStatus::OffTrack));
        assert_eq!(assess(50.0, 100.0), Some(GoalStatus::AtRisk));
        assert_eq!(assess(80.0, 100.0), Some(GoalStatus::OnTrack));
    }

    #[test]
    fn test_zero_target_has_no_ratio() {
        assert_eq!(completion_ratio(5.0, 0.0), None);
        assert_eq!(completion_ratio(0.0, 0.0), None);
        assert_eq!(assess(1.0, 0.0), None);
        assert_eq!(completion_ratio(f64::NAN, 1.0), None);
    }
}
