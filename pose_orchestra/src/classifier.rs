//! Gesture classification from the two smoothed wrists.
//!
//! Positions come from the smoother; the clap gate uses the *raw* scores of
//! the current frame, so a clap is only recognised while the detector is
//! actually confident about both hands right now.
//!
//! Thresholds are in screen space with y growing downwards.  Mirrored video
//! is not corrected for: "left wrist" is whatever the estimator labels it.

use pose_smoother::{Joint, KeypointSmoother, Pose};

/// Both wrists must score above this for a clap to count.
pub const CLAP_MIN_CONFIDENCE: f32 = 0.6;

/// Wrists closer than this (frame pixels) are clapping.
pub const CLAP_DISTANCE: f32 = 75.0;

// ════════════════════════════════════════════════════════════════════════════
// GestureState
// ════════════════════════════════════════════════════════════════════════════

/// What the wrists are doing this frame.  Recomputed every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureState {
    pub clap_detected: bool,
    /// Both wrists in the top quarter of the frame.
    pub arms_raised:   bool,
    /// Both wrists in the bottom quarter of the frame.
    pub arms_lowered:  bool,
    /// Right-wrist y, drives tempo.
    pub tempo_control: Option<f32>,
    /// Left-wrist y, drives pitch.
    pub pitch_control: Option<f32>,
}

impl GestureState {
    /// Nothing detected, nothing to update.
    pub fn neutral() -> Self {
        GestureState::default()
    }

    pub fn is_neutral(&self) -> bool {
        *self == GestureState::neutral()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// WristPair
// ════════════════════════════════════════════════════════════════════════════

/// Smoothed wrist positions plus this frame's raw wrist confidences.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WristPair {
    pub left:             (f32, f32),
    pub right:            (f32, f32),
    pub left_confidence:  f32,
    pub right_confidence: f32,
}

impl WristPair {
    /// `None` until both wrists have been observed at least once.
    pub fn from_pose(smoothed: &KeypointSmoother, raw: &Pose) -> Option<WristPair> {
        Some(WristPair {
            left:             smoothed.position(Joint::LeftWrist)?,
            right:            smoothed.position(Joint::RightWrist)?,
            left_confidence:  raw.confidence(Joint::LeftWrist),
            right_confidence: raw.confidence(Joint::RightWrist),
        })
    }

    /// Euclidean distance between the wrists.
    pub fn spread(&self) -> f32 {
        let dx = self.left.0 - self.right.0;
        let dy = self.left.1 - self.right.1;
        (dx * dx + dy * dy).sqrt()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// classify
// ════════════════════════════════════════════════════════════════════════════

/// Derive this frame's [`GestureState`].
///
/// `cooldown_active` suppresses clap detection; missing wrists give a
/// neutral state.
pub fn classify(wrists: Option<&WristPair>, frame_height: f32, cooldown_active: bool) -> GestureState {
    let w = match wrists {
        Some(w) => w,
        None    => return GestureState::neutral(),
    };

    let (_, ly) = w.left;
    let (_, ry) = w.right;

    let confident = w.left_confidence > CLAP_MIN_CONFIDENCE
        && w.right_confidence > CLAP_MIN_CONFIDENCE;
    let clap_detected = confident && !cooldown_active && w.spread() < CLAP_DISTANCE;

    let top    = frame_height / 4.0;
    let bottom = 3.0 * frame_height / 4.0;

    GestureState {
        clap_detected,
        arms_raised:   ly < top && ry < top,
        arms_lowered:  ly > bottom && ry > bottom,
        tempo_control: Some(ry),
        pitch_control: Some(ly),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pose_smoother::Keypoint;

    const H: f32 = 480.0;

    fn pair(left: (f32, f32), right: (f32, f32), conf: f32) -> WristPair {
        WristPair { left, right, left_confidence: conf, right_confidence: conf }
    }

    // ── clap ─────────────────────────────────────────────────────────────
    #[test]
    fn close_confident_wrists_clap() {
        let w = pair((300.0, 240.0), (350.0, 240.0), 0.7);
        assert!(classify(Some(&w), H, false).clap_detected);
    }

    #[test]
    fn clap_needs_both_confident() {
        let mut w = pair((300.0, 240.0), (320.0, 240.0), 0.7);
        w.right_confidence = 0.6;
        assert!(!classify(Some(&w), H, false).clap_detected);
    }

    #[test]
    fn clap_threshold_is_strict() {
        let w = pair((300.0, 240.0), (375.0, 240.0), 0.9);
        assert!(!classify(Some(&w), H, false).clap_detected);
        let w = pair((300.0, 240.0), (374.9, 240.0), 0.9);
        assert!(classify(Some(&w), H, false).clap_detected);
    }

    #[test]
    fn cooldown_suppresses_clap() {
        let w = pair((300.0, 240.0), (310.0, 240.0), 0.9);
        let g = classify(Some(&w), H, true);
        assert!(!g.clap_detected);
        // the rest of the state is still reported
        assert_eq!(g.tempo_control, Some(240.0));
    }

    #[test]
    fn spread_is_euclidean() {
        let w = pair((0.0, 0.0), (30.0, 40.0), 0.9);
        assert!((w.spread() - 50.0).abs() < 1e-4);
    }

    // ── raised / lowered ─────────────────────────────────────────────────
    #[test]
    fn both_wrists_high_is_raised() {
        let g = classify(Some(&pair((100.0, 60.0), (500.0, 60.0), 0.9)), H, false);
        assert!(g.arms_raised);
        assert!(!g.arms_lowered);
    }

    #[test]
    fn one_wrist_high_is_not_raised() {
        let g = classify(Some(&pair((100.0, 60.0), (500.0, 200.0), 0.9)), H, false);
        assert!(!g.arms_raised);
    }

    #[test]
    fn both_wrists_low_is_lowered() {
        let g = classify(Some(&pair((100.0, 400.0), (500.0, 470.0), 0.9)), H, false);
        assert!(g.arms_lowered);
        assert!(!g.arms_raised);
    }

    #[test]
    fn quarter_lines_are_exclusive() {
        let g = classify(Some(&pair((100.0, 120.0), (500.0, 120.0), 0.9)), H, false);
        assert!(!g.arms_raised);
        let g = classify(Some(&pair((100.0, 360.0), (500.0, 360.0), 0.9)), H, false);
        assert!(!g.arms_lowered);
    }

    #[test]
    fn controls_follow_wrists() {
        let g = classify(Some(&pair((100.0, 111.0), (500.0, 222.0), 0.1)), H, false);
        assert_eq!(g.pitch_control, Some(111.0));
        assert_eq!(g.tempo_control, Some(222.0));
        assert!(!g.clap_detected);
    }

    // ── missing wrists ───────────────────────────────────────────────────
    #[test]
    fn missing_wrists_are_neutral() {
        assert!(classify(None, H, false).is_neutral());
    }

    #[test]
    fn wrist_pair_needs_both_observed() {
        let mut smoother = KeypointSmoother::new();
        let mut pose = Pose::empty();
        pose.set(Joint::LeftWrist, Keypoint::new(10.0, 10.0, 0.9));
        smoother.update(&pose);
        assert_eq!(WristPair::from_pose(&smoother, &pose), None);

        pose.set(Joint::RightWrist, Keypoint::new(20.0, 10.0, 0.8));
        smoother.update(&pose);
        let w = WristPair::from_pose(&smoother, &pose).unwrap();
        assert_eq!(w.right, (20.0, 10.0));
        assert_eq!(w.right_confidence, 0.8);
    }
}
