//! Score arithmetic shared by the plagiarism, correctness and finalization stages.
//!
//! Every score handled here lives on a 0–10 scale. The plagiarism service reports a
//! *penalty* in [0, 1] where 1.0 means fully copied; it is turned into a score with
//! `10 * (1 - penalty)` so that 10 is original work.

/// Weight of the plagiarism-derived score in the final mark.
pub const PLAG_WEIGHT: f64 = 0.4;
/// Weight of the correctness score in the final mark.
pub const CORRECTNESS_WEIGHT: f64 = 0.6;
/// Upper bound of every score.
pub const MAX_SCORE: f64 = 10.0;
/// Status tag the comparison service uses for a confirmed copy.
pub const COPIED_TAG: &str = "COPIED";

/// Round a float to two decimal places.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[inline]
fn clamp_score(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, MAX_SCORE) }
}

/// Convert a plagiarism penalty into a 0–10 score.
///
/// A result tagged [`COPIED_TAG`] always scores 0, whatever the penalty says.
pub fn plagiarism_score(penalty: f64, status_tag: Option<&str>) -> f64 {
    if status_tag.is_some_and(|t| t.eq_ignore_ascii_case(COPIED_TAG)) {
        return 0.0;
    }
    let penalty = if penalty.is_nan() { 0.0 } else { penalty.clamp(0.0, 1.0) };
    round2(clamp_score(MAX_SCORE * (1.0 - penalty)))
}

/// Bring a correctness score reported on either a 0–10 or a 0–100 scale onto 0–10.
pub fn normalize_correctness(raw: f64) -> f64 {
    let scaled = if raw > MAX_SCORE { round2(raw / 10.0) } else { raw };
    clamp_score(scaled)
}

/// Weighted final mark, clamped to 0–10 and rounded to two decimals.
pub fn final_score(plagiarism: f64, correctness: f64) -> f64 {
    round2(clamp_score(
        plagiarism * PLAG_WEIGHT + correctness * CORRECTNESS_WEIGHT,
    ))
}

/// A plagiarism score at or below zero marks the submission as a cheat case.
pub fn is_cheat(plagiarism: f64) -> bool {
    plagiarism <= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_maps_inversely_to_score() {
        assert_eq!(plagiarism_score(0.0, None), 10.0);
        assert_eq!(plagiarism_score(1.0, None), 0.0);
        assert_eq!(plagiarism_score(0.25, Some("ORIGINAL")), 7.5);
        assert_eq!(plagiarism_score(0.123, None), 8.77);
    }

    #[test]
    fn out_of_range_penalties_are_clamped() {
        assert_eq!(plagiarism_score(-3.0, None), 10.0);
        assert_eq!(plagiarism_score(4.0, None), 0.0);
        assert_eq!(plagiarism_score(f64::NAN, None), 10.0);
    }

    #[test]
    fn copied_tag_forces_zero() {
        assert_eq!(plagiarism_score(0.1, Some("COPIED")), 0.0);
        assert_eq!(plagiarism_score(0.0, Some("copied")), 0.0);
    }

    #[test]
    fn correctness_on_hundred_scale_is_normalized() {
        assert_eq!(normalize_correctness(78.5), 7.85);
        assert_eq!(normalize_correctness(100.0), 10.0);
        assert_eq!(normalize_correctness(7.5), 7.5);
        assert_eq!(normalize_correctness(10.0), 10.0);
        assert_eq!(normalize_correctness(-2.0), 0.0);
        assert_eq!(normalize_correctness(250.0), 10.0);
    }

    #[test]
    fn final_score_weights_and_rounds() {
        assert_eq!(final_score(10.0, 10.0), 10.0);
        assert_eq!(final_score(8.0, 7.0), 7.4);
        assert_eq!(final_score(7.77, 3.33), 5.11);
        assert_eq!(final_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn final_score_is_clamped() {
        assert_eq!(final_score(30.0, 30.0), 10.0);
        assert_eq!(final_score(-5.0, -5.0), 0.0);
    }

    #[test]
    fn cheat_threshold() {
        assert!(is_cheat(0.0));
        assert!(is_cheat(-0.5));
        assert!(!is_cheat(0.01));
    }
}
