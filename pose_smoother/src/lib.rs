//! # pose_smoother
//!
//! Single-person pose data in the 17-joint COCO layout used by PoseNet-style
//! estimators, and a per-joint exponential moving average that steadies the
//! raw estimates frame by frame.
//!
//! ## Quick start
//!
//! ```rust
//! use pose_smoother::{Joint, Keypoint, KeypointSmoother, Pose};
//!
//! let mut smoother = KeypointSmoother::new();
//!
//! let mut pose = Pose::empty();
//! pose.set(Joint::LeftWrist, Keypoint::new(100.0, 200.0, 0.9));
//! smoother.update(&pose);
//!
//! // First confident observation is taken as-is.
//! assert_eq!(smoother.position(Joint::LeftWrist), Some((100.0, 200.0)));
//!
//! pose.set(Joint::LeftWrist, Keypoint::new(200.0, 200.0, 0.9));
//! smoother.update(&pose);
//! let (x, _) = smoother.position(Joint::LeftWrist).unwrap();
//! assert!((x - 170.0).abs() < 1e-3); // 0.7·200 + 0.3·100
//! ```

pub mod keypoint;
pub mod smoother;

pub use keypoint::{FrameSize, Joint, Keypoint, Pose, PoseFrame, KEYPOINT_COUNT};
pub use smoother::{KeypointSmoother, SmoothedKeypoint, MIN_CONFIDENCE, SMOOTHING_ALPHA};
