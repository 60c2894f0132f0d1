//! Pose sources: anything that produces [`PoseFrame`]s on its own thread.
//!
//! The app loop only sees a `Receiver<PoseFrame>`; it does not care whether
//! the frames come from a recording or the built-in choreography.  A source
//! returning (and so dropping its sender) ends the session.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use pose_smoother::{FrameSize, Joint, Keypoint, Pose, PoseFrame};
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════════
// PoseSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`PoseFrame`]s over a channel.
pub trait PoseSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>);
}

/// Spawn a pose source on its own thread and return the receiving end.
pub fn spawn_pose_source<S: PoseSource>(source: S) -> Receiver<PoseFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

/// Sleep until `at` has elapsed since `start`.
pub(crate) fn pace(start: Instant, at: Duration) {
    let elapsed = start.elapsed();
    if at > elapsed {
        thread::sleep(at - elapsed);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimPoseSource — scripted choreography
// ════════════════════════════════════════════════════════════════════════════

/// Length of the built-in choreography.
pub const SCRIPT_LENGTH: Duration = Duration::from_secs(16);

const WRIST_CONFIDENCE: f32 = 0.9;

/// Wrist positions as fractions of the frame (0,0 = top left).
#[derive(Clone, Copy, Debug, PartialEq)]
struct Stance {
    left:  (f32, f32),
    right: (f32, f32),
}

const REST: Stance = Stance { left: (0.38, 0.85), right: (0.62, 0.85) };
const UP:   Stance = Stance { left: (0.35, 0.10), right: (0.65, 0.10) };
const MID:  Stance = Stance { left: (0.35, 0.50), right: (0.65, 0.50) };
const CLAP: Stance = Stance { left: (0.49, 0.45), right: (0.51, 0.45) };

#[derive(Clone, Copy, Debug)]
enum Move {
    Hold(Stance),
    Glide(Stance, Stance),
    /// Both wrists bob around MID, the right one at half the rate.
    Sweep,
}

const SWEEP_PERIOD: f32 = 2.5;

/// `(start, end, move)` in seconds.
const SCRIPT: [(f32, f32, Move); 15] = [
    ( 0.0,  1.5, Move::Hold(REST)),
    ( 1.5,  2.5, Move::Glide(REST, UP)),
    ( 2.5,  3.5, Move::Hold(UP)),
    ( 3.5,  4.5, Move::Glide(UP, MID)),
    ( 4.5,  9.5, Move::Sweep),
    ( 9.5, 10.0, Move::Glide(MID, CLAP)),
    (10.0, 10.5, Move::Hold(CLAP)),
    (10.5, 11.0, Move::Glide(CLAP, MID)),
    (11.0, 12.5, Move::Hold(MID)),
    (12.5, 13.0, Move::Glide(MID, CLAP)),
    (13.0, 13.5, Move::Hold(CLAP)),
    (13.5, 14.0, Move::Glide(CLAP, MID)),
    (14.0, 15.0, Move::Glide(MID, REST)),
    (15.0, 16.0, Move::Hold(REST)),
    (16.0, f32::INFINITY, Move::Hold(REST)),
];

fn lerp(a: (f32, f32), b: (f32, f32), u: f32) -> (f32, f32) {
    (a.0 + (b.0 - a.0) * u, a.1 + (b.1 - a.1) * u)
}

fn stance_at(t: f32) -> Stance {
    let (start, end, mv) = SCRIPT.iter()
        .copied()
        .find(|&(s, e, _)| t >= s && t < e)
        .unwrap_or((0.0, 0.0, Move::Hold(REST)));

    match mv {
        Move::Hold(s) => s,
        Move::Glide(from, to) => {
            let u = ((t - start) / (end - start)).clamp(0.0, 1.0);
            Stance { left: lerp(from.left, to.left, u), right: lerp(from.right, to.right, u) }
        }
        Move::Sweep => {
            let phase = std::f32::consts::TAU * (t - start) / SWEEP_PERIOD;
            Stance {
                left:  (MID.left.0,  MID.left.1  + 0.2 * phase.sin()),
                right: (MID.right.0, MID.right.1 + 0.2 * (phase / 2.0).sin()),
            }
        }
    }
}

/// Plays a fixed routine: rest, raise both arms (start), sweep the wrists
/// through tempo and pitch, clap twice (clap loop on, then off) and lower
/// the arms (stop).
#[derive(Clone, Debug)]
pub struct SimPoseSource {
    pub size:     FrameSize,
    pub fps:      u32,
    /// Stop after this much of the routine.
    pub length:   Duration,
}

impl SimPoseSource {
    pub fn new(size: FrameSize) -> Self {
        SimPoseSource { size, fps: 30, length: SCRIPT_LENGTH }
    }

    /// The frame the routine shows `t` into the session.
    pub fn frame_at(&self, t: Duration) -> PoseFrame {
        let secs   = t.as_secs_f32();
        let stance = stance_at(secs);
        let (w, h) = (self.size.width(), self.size.height());

        // a couple of pixels of deterministic wobble, like a real detector
        let wobble = |phase: f32| 1.5 * (secs * 11.0 + phase).sin();
        let px = |(x, y): (f32, f32), phase: f32| (x * w + wobble(phase), y * h + wobble(phase + 1.3));

        let left  = px(stance.left,  0.0);
        let right = px(stance.right, 2.1);
        let l_shoulder = (0.42 * w, 0.35 * h);
        let r_shoulder = (0.58 * w, 0.35 * h);

        let mut pose = Pose::empty();
        let mut put = |joint: Joint, (x, y): (f32, f32), score: f32| {
            pose.set(joint, Keypoint::new(x, y, score));
        };
        put(Joint::Nose,          (0.5 * w, 0.2 * h), 0.95);
        put(Joint::LeftShoulder,  l_shoulder, 0.85);
        put(Joint::RightShoulder, r_shoulder, 0.85);
        put(Joint::LeftElbow,     lerp(l_shoulder, left,  0.5), 0.7);
        put(Joint::RightElbow,    lerp(r_shoulder, right, 0.5), 0.7);
        put(Joint::LeftWrist,     left,  WRIST_CONFIDENCE);
        put(Joint::RightWrist,    right, WRIST_CONFIDENCE);

        PoseFrame::new(t, self.size, Some(pose))
    }

    /// Every frame of the routine, in order.
    pub fn frames(&self) -> impl Iterator<Item = PoseFrame> + '_ {
        let step  = Duration::from_secs(1) / self.fps.max(1);
        let count = (self.length.as_nanos() / step.as_nanos().max(1)) as u32;
        (0..count).map(move |i| self.frame_at(step * i))
    }
}

impl PoseSource for SimPoseSource {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>) {
        debug!(fps = self.fps, length = ?self.length, "simulated performer starting");
        let start = Instant::now();
        for frame in self.frames() {
            pace(start, frame.timestamp);
            if tx.send(frame).is_err() { return; }
        }
        debug!("simulated performer finished");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
