//! Reference marks: set, jump, clear.
//!
//! All operations are pure: they take the current state and return its
//! replacement.

use crate::error::AlignResult;
use crate::state::{MarkId, Marks, TimelineState};

/// Place a mark. Without an explicit value the mark lands on the cursor.
/// Negative values clear the slot.
pub fn set_mark(state: &TimelineState, mark: MarkId, value: Option<f64>) -> TimelineState {
    let value = value.unwrap_or_else(|| state.cursor());
    state.clone().with_mark(mark, Some(value))
}

/// `set_mark` for identifiers coming from outside the type system.
pub fn set_mark_named(
    state: &TimelineState,
    mark: &str,
    value: Option<f64>,
) -> AlignResult<TimelineState> {
    Ok(set_mark(state, mark.parse()?, value))
}

/// Cursor position that `jump_mark` moves to.
///
/// Unset marks resolve to 0. The video mark is video-local time, so the
/// offset is added back to land on the same frame.
pub fn jump_target(state: &TimelineState, mark: MarkId) -> f64 {
    let Some(time) = state.mark(mark) else {
        return 0.0;
    };
    match mark {
        MarkId::Video => time + state.video_offset(),
        _ => time,
    }
}

pub fn jump_mark(state: &TimelineState, mark: MarkId) -> TimelineState {
    state.clone().with_cursor(jump_target(state, mark))
}

pub fn jump_mark_named(state: &TimelineState, mark: &str) -> AlignResult<TimelineState> {
    Ok(jump_mark(state, mark.parse()?))
}

pub fn clear_all_marks(state: &TimelineState) -> TimelineState {
    state.clone().with_marks(Marks::default())
}
