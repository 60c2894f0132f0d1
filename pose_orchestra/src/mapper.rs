//! Wrist height → musical parameters.
//!
//! Both maps are plain linear rescales of a screen-space y coordinate
//! (0 = top of frame) followed by a clamp, so any input, including values
//! outside the frame, lands inside the valid range.

use crate::classifier::GestureState;
use crate::scale::NUM_NOTES;

pub const MIN_TEMPO:     u32 = 60;
pub const MAX_TEMPO:     u32 = 180;
pub const DEFAULT_TEMPO: u32 = 120;

/// Tempo and pitch selected by the current wrist positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MusicParams {
    pub tempo:       u32,
    pub pitch_index: usize,
}

impl MusicParams {
    /// `None` when the gesture carries no wrist controls.
    pub fn from_gesture(gesture: &GestureState, frame_height: f32) -> Option<MusicParams> {
        let tempo_y = gesture.tempo_control?;
        let pitch_y = gesture.pitch_control?;
        Some(MusicParams {
            tempo:       tempo_for(tempo_y, frame_height),
            pitch_index: pitch_index_for(pitch_y, frame_height),
        })
    }
}

/// Right-wrist height → BPM: top of frame 180, bottom 60, rounded.
pub fn tempo_for(y: f32, frame_height: f32) -> u32 {
    if y.is_nan() { return MIN_TEMPO; }
    let h   = usable_height(frame_height);
    let bpm = map_range(y, 0.0, h, MAX_TEMPO as f32, MIN_TEMPO as f32);
    bpm.clamp(MIN_TEMPO as f32, MAX_TEMPO as f32).round() as u32
}

/// Left-wrist height → scale index: bottom of frame 0, top 7.
pub fn pitch_index_for(y: f32, frame_height: f32) -> usize {
    if y.is_nan() { return 0; }
    let h   = usable_height(frame_height);
    let idx = map_range(y, h, 0.0, 0.0, NUM_NOTES as f32).floor();
    idx.clamp(0.0, (NUM_NOTES - 1) as f32) as usize
}

fn map_range(v: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    out_lo + (v - in_lo) / (in_hi - in_lo) * (out_hi - out_lo)
}

fn usable_height(h: f32) -> f32 {
    if h.is_finite() { h.max(1.0) } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f32 = 480.0;

    // ── tempo ────────────────────────────────────────────────────────────
    #[test]
    fn tempo_endpoints() {
        assert_eq!(tempo_for(0.0, H), 180);
        assert_eq!(tempo_for(H, H), 60);
        assert_eq!(tempo_for(H / 2.0, H), 120);
    }

    #[test]
    fn tempo_always_in_range() {
        for i in -200..=200 {
            let y = i as f32 * 7.3;
            let t = tempo_for(y, H);
            assert!((MIN_TEMPO..=MAX_TEMPO).contains(&t), "y={} → {}", y, t);
        }
        assert_eq!(tempo_for(-1e9, H), 180);
        assert_eq!(tempo_for(f32::INFINITY, H), 60);
        assert_eq!(tempo_for(f32::NAN, H), 60);
    }

    #[test]
    fn tempo_is_monotone_in_height() {
        let mut prev = tempo_for(0.0, H);
        for y in 1..=480 {
            let t = tempo_for(y as f32, H);
            assert!(t <= prev);
            prev = t;
        }
    }

    // ── pitch ────────────────────────────────────────────────────────────
    #[test]
    fn pitch_endpoints() {
        assert_eq!(pitch_index_for(H, H), 0);
        assert_eq!(pitch_index_for(0.0, H), 7);
    }

    #[test]
    fn pitch_bands_are_equal_eighths() {
        // y just inside each band from the bottom
        for band in 0..NUM_NOTES {
            let y = H - (band as f32 + 0.5) * H / NUM_NOTES as f32;
            assert_eq!(pitch_index_for(y, H), band);
        }
    }

    #[test]
    fn pitch_always_in_range() {
        for i in -200..=200 {
            let p = pitch_index_for(i as f32 * 9.1, H);
            assert!(p < NUM_NOTES);
        }
        assert_eq!(pitch_index_for(f32::NEG_INFINITY, H), 7);
        assert_eq!(pitch_index_for(f32::NAN, H), 0);
    }

    #[test]
    fn mapping_is_idempotent() {
        for y in [0.0, 13.0, 240.5, 479.0] {
            assert_eq!(tempo_for(y, H), tempo_for(y, H));
            assert_eq!(pitch_index_for(y, H), pitch_index_for(y, H));
        }
    }

    #[test]
    fn degenerate_height_is_guarded() {
        assert!((MIN_TEMPO..=MAX_TEMPO).contains(&tempo_for(10.0, 0.0)));
        assert!(pitch_index_for(10.0, f32::NAN) < NUM_NOTES);
    }

    // ── from_gesture ─────────────────────────────────────────────────────
    #[test]
    fn params_need_both_controls() {
        let mut g = GestureState::neutral();
        assert_eq!(MusicParams::from_gesture(&g, H), None);
        g.tempo_control = Some(0.0);
        assert_eq!(MusicParams::from_gesture(&g, H), None);
        g.pitch_control = Some(H);
        assert_eq!(
            MusicParams::from_gesture(&g, H),
            Some(MusicParams { tempo: 180, pitch_index: 0 })
        );
    }
}
