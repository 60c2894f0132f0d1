//! Raw pose data as delivered by the estimator, one frame at a time.

use std::time::Duration;

/// Number of keypoints in a COCO pose.
pub const KEYPOINT_COUNT: usize = 17;

// ════════════════════════════════════════════════════════════════════════════
// Joint — COCO keypoint ids
// ════════════════════════════════════════════════════════════════════════════

/// Body joint, numbered in COCO / PoseNet order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Joint {
    Nose          = 0,
    LeftEye       = 1,
    RightEye      = 2,
    LeftEar       = 3,
    RightEar      = 4,
    LeftShoulder  = 5,
    RightShoulder = 6,
    LeftElbow     = 7,
    RightElbow    = 8,
    LeftWrist     = 9,
    RightWrist    = 10,
    LeftHip       = 11,
    RightHip      = 12,
    LeftKnee      = 13,
    RightKnee     = 14,
    LeftAnkle     = 15,
    RightAnkle    = 16,
}

impl Joint {
    /// Every joint, in index order.
    pub const ALL: [Joint; KEYPOINT_COUNT] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn index(self) -> usize { self as usize }

    pub fn from_index(i: usize) -> Option<Joint> {
        Joint::ALL.get(i).copied()
    }

    /// PoseNet part name (`"leftWrist"`, …).
    pub fn part_name(self) -> &'static str {
        match self {
            Joint::Nose          => "nose",
            Joint::LeftEye       => "leftEye",
            Joint::RightEye      => "rightEye",
            Joint::LeftEar       => "leftEar",
            Joint::RightEar      => "rightEar",
            Joint::LeftShoulder  => "leftShoulder",
            Joint::RightShoulder => "rightShoulder",
            Joint::LeftElbow     => "leftElbow",
            Joint::RightElbow    => "rightElbow",
            Joint::LeftWrist     => "leftWrist",
            Joint::RightWrist    => "rightWrist",
            Joint::LeftHip       => "leftHip",
            Joint::RightHip      => "rightHip",
            Joint::LeftKnee      => "leftKnee",
            Joint::RightKnee     => "rightKnee",
            Joint::LeftAnkle     => "leftAnkle",
            Joint::RightAnkle    => "rightAnkle",
        }
    }

    pub fn from_part_name(name: &str) -> Option<Joint> {
        Joint::ALL.iter().copied().find(|j| j.part_name() == name)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Keypoint / Pose
// ════════════════════════════════════════════════════════════════════════════

/// One joint estimate: frame-pixel position plus detection confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x:          f32,
    pub y:          f32,
    /// Detection score in [0, 1].
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Keypoint { x, y, confidence }
    }

    /// A keypoint the detector reported nothing for.
    pub fn missing() -> Self {
        Keypoint { x: 0.0, y: 0.0, confidence: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.confidence.is_finite()
    }
}

/// Keypoints of one detected person, ordered by [`Joint`] index.
///
/// Estimators normally deliver all 17; a shorter list simply leaves the
/// trailing joints unreported.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Pose { keypoints }
    }

    /// A full-length pose with every joint at zero confidence.
    pub fn empty() -> Self {
        Pose { keypoints: vec![Keypoint::missing(); KEYPOINT_COUNT] }
    }

    pub fn keypoint(&self, joint: Joint) -> Option<&Keypoint> {
        self.keypoints.get(joint.index())
    }

    /// Raw confidence for `joint`; 0.0 when the joint was not reported.
    pub fn confidence(&self, joint: Joint) -> f32 {
        self.keypoint(joint)
            .map(|kp| kp.confidence)
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
    }

    /// Overwrite one joint, growing the list if needed.
    pub fn set(&mut self, joint: Joint, kp: Keypoint) {
        let i = joint.index();
        if self.keypoints.len() <= i {
            self.keypoints.resize(i + 1, Keypoint::missing());
        }
        self.keypoints[i] = kp;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSize / PoseFrame
// ════════════════════════════════════════════════════════════════════════════

/// Video frame dimensions in pixels.  Never smaller than 1×1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSize {
    width:  f32,
    height: f32,
}

impl FrameSize {
    pub fn new(width: f32, height: f32) -> Self {
        FrameSize { width: sanitize_dim(width), height: sanitize_dim(height) }
    }

    pub fn width(&self)  -> f32 { self.width }
    pub fn height(&self) -> f32 { self.height }
}

impl Default for FrameSize {
    fn default() -> Self { FrameSize::new(640.0, 480.0) }
}

fn sanitize_dim(v: f32) -> f32 {
    if v.is_finite() { v.max(1.0) } else { 1.0 }
}

/// Everything the pose source hands over for one video frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseFrame {
    /// Capture time since the start of the session.
    pub timestamp: Duration,
    pub size:      FrameSize,
    /// The tracked person, if one was detected.
    pub person:    Option<Pose>,
}

impl PoseFrame {
    pub fn new(timestamp: Duration, size: FrameSize, person: Option<Pose>) -> Self {
        PoseFrame { timestamp, size, person }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
