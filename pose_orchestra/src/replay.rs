//! Recorded sessions: JSON Lines in the shape ml5/PoseNet hands to its
//! `pose` callback, one frame per line.
//!
//! ```text
//! {"t": 0.033, "poses": [{"pose": {"keypoints": [
//!     {"part": "leftWrist", "score": 0.91, "position": {"x": 212.0, "y": 88.5}}, ...]}}]}
//! ```
//!
//! `t` is seconds since the session started.  `part` is optional; without it
//! a keypoint's joint is its position in the list.  An empty `poses` array is
//! a frame with nobody in it.  Only the first pose of a frame is used.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use pose_smoother::{FrameSize, Joint, Keypoint, Pose, PoseFrame};

use crate::error::ReplayError;
use crate::source::{pace, PoseSource};

// ── wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FrameRecord {
    t:     f64,
    #[serde(default)]
    poses: Vec<PoseRecord>,
}

#[derive(Debug, Deserialize)]
struct PoseRecord {
    pose: KeypointList,
}

#[derive(Debug, Deserialize)]
struct KeypointList {
    keypoints: Vec<KeypointRecord>,
}

#[derive(Debug, Deserialize)]
struct KeypointRecord {
    #[serde(default)]
    part:     Option<String>,
    score:    f32,
    position: Position,
}

#[derive(Debug, Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

impl PoseRecord {
    fn into_pose(self) -> Pose {
        let mut pose = Pose::empty();
        for (i, kp) in self.pose.keypoints.into_iter().enumerate() {
            let joint = match kp.part.as_deref() {
                Some(name) => Joint::from_part_name(name),
                None       => Joint::from_index(i),
            };
            if let Some(joint) = joint {
                pose.set(joint, Keypoint::new(kp.position.x, kp.position.y, kp.score));
            }
        }
        pose
    }
}

// ════════════════════════════════════════════════════════════════════════════
// parse_replay
// ════════════════════════════════════════════════════════════════════════════

/// Read a whole recording.  Every frame gets `size` as its dimensions.
pub fn parse_replay<R: BufRead>(reader: R, size: FrameSize) -> Result<Vec<PoseFrame>, ReplayError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        if line.trim().is_empty() { continue; }

        let record: FrameRecord = serde_json::from_str(&line)
            .map_err(|source| ReplayError::Parse { line: line_no, source })?;

        let timestamp = Duration::try_from_secs_f64(record.t)
            .map_err(|_| ReplayError::BadTimestamp { line: line_no, value: record.t })?;

        let person = record.poses.into_iter().next().map(PoseRecord::into_pose);
        frames.push(PoseFrame::new(timestamp, size, person));
    }
    Ok(frames)
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource
// ════════════════════════════════════════════════════════════════════════════

/// Plays a recording back at the speed it was captured.
#[derive(Clone, Debug)]
pub struct ReplaySource {
    frames: Vec<PoseFrame>,
}

impl ReplaySource {
    /// Load and validate the whole file up front, so a bad recording fails
    /// before anything starts playing.
    pub fn open(path: &Path, size: FrameSize) -> Result<ReplaySource, ReplayError> {
        let file   = File::open(path)?;
        let frames = parse_replay(BufReader::new(file), size)?;
        info!(path = %path.display(), frames = frames.len(), "loaded pose recording");
        Ok(ReplaySource { frames })
    }

    pub fn from_frames(frames: Vec<PoseFrame>) -> Self {
        ReplaySource { frames }
    }

    pub fn frames(&self) -> &[PoseFrame] { &self.frames }

    /// Timestamp of the last frame.
    pub fn length(&self) -> Duration {
        self.frames.last().map(|f| f.timestamp).unwrap_or_default()
    }
}

impl PoseSource for ReplaySource {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>) {
        let start = Instant::now();
        for frame in self.frames {
            pace(start, frame.timestamp);
            if tx.send(frame).is_err() { return; }
        }
        debug!("recording finished");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
