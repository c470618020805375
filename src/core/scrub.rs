//! Relative scrubbing of the cursor or the video offset.

use crate::constants::SCRUB_UNIT;
use crate::state::TimelineState;

/// Modifier state accompanying a scrub gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrubModifiers {
    /// Move the video against the audio instead of moving the cursor.
    pub offset_mode: bool,
    /// One raw unit per frame instead of per second.
    pub fine_mode: bool,
}

/// Seconds of motion for a raw delta.
pub fn scrub_seconds(delta_raw: f64, fps: u32, modifiers: ScrubModifiers) -> f64 {
    let mut delta = delta_raw / SCRUB_UNIT;
    if modifiers.fine_mode {
        delta /= fps.max(1) as f64;
    }
    delta
}

pub fn scrub(state: &TimelineState, delta_raw: f64, modifiers: ScrubModifiers) -> TimelineState {
    let delta = scrub_seconds(delta_raw, state.fps(), modifiers);
    if modifiers.offset_mode {
        let offset = state.video_offset() + delta;
        state.clone().with_video_offset(offset)
    } else {
        let cursor = state.cursor() + delta;
        state.clone().with_cursor(cursor)
    }
}
