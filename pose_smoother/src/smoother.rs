//! Exponential moving average over keypoint positions, one filter per joint.
//!
//! Low-confidence estimates are dropped rather than blended in, so a single
//! bad frame cannot drag a joint across the screen; the joint simply holds
//! its last smoothed position until the detector is confident again.

use tracing::trace;

use crate::keypoint::{Joint, Keypoint, Pose, KEYPOINT_COUNT};

/// Weight of the new observation (higher = less smoothing).
pub const SMOOTHING_ALPHA: f32 = 0.7;

/// Observations at or below this confidence leave the filter untouched.
pub const MIN_CONFIDENCE: f32 = 0.2;

// ════════════════════════════════════════════════════════════════════════════
// SmoothedKeypoint
// ════════════════════════════════════════════════════════════════════════════

/// Filter state for one joint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothedKeypoint {
    x:        f32,
    y:        f32,
    observed: bool,
}

impl SmoothedKeypoint {
    /// Smoothed position, or `None` until the first confident observation.
    pub fn position(&self) -> Option<(f32, f32)> {
        self.observed.then_some((self.x, self.y))
    }

    pub fn is_observed(&self) -> bool { self.observed }

    /// Fold one raw estimate into the filter.
    pub fn blend(self, raw: &Keypoint) -> Self {
        if !raw.is_finite() || raw.confidence <= MIN_CONFIDENCE {
            return self;
        }
        if !self.observed {
            return SmoothedKeypoint { x: raw.x, y: raw.y, observed: true };
        }
        SmoothedKeypoint {
            x:        SMOOTHING_ALPHA * raw.x + (1.0 - SMOOTHING_ALPHA) * self.x,
            y:        SMOOTHING_ALPHA * raw.y + (1.0 - SMOOTHING_ALPHA) * self.y,
            observed: true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KeypointSmoother
// ════════════════════════════════════════════════════════════════════════════

/// Smoothed positions for all 17 joints, persistent across frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeypointSmoother {
    points: [SmoothedKeypoint; KEYPOINT_COUNT],
}

impl KeypointSmoother {
    pub fn new() -> Self {
        KeypointSmoother::default()
    }

    /// Forget every joint.
    pub fn reset(&mut self) {
        self.points = [SmoothedKeypoint::default(); KEYPOINT_COUNT];
    }

    pub fn get(&self, joint: Joint) -> &SmoothedKeypoint {
        &self.points[joint.index()]
    }

    pub fn position(&self, joint: Joint) -> Option<(f32, f32)> {
        self.get(joint).position()
    }

    pub fn points(&self) -> &[SmoothedKeypoint; KEYPOINT_COUNT] {
        &self.points
    }

    /// The filter state after seeing `pose`; `self` is left as it was.
    pub fn apply(&self, pose: &Pose) -> KeypointSmoother {
        let mut next = self.clone();
        for (i, raw) in pose.keypoints.iter().take(KEYPOINT_COUNT).enumerate() {
            let before = next.points[i];
            next.points[i] = before.blend(raw);
            if !before.is_observed() && next.points[i].is_observed() {
                trace!(joint = ?Joint::ALL[i], x = raw.x, y = raw.y, "first confident observation");
            }
        }
        next
    }

    /// Fold one frame's raw keypoints into the filters.
    pub fn update(&mut self, pose: &Pose) {
        *self = self.apply(pose);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
