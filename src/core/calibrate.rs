//! Offset calibration from a pair of marks.

use crate::state::{MarkId, TimelineState};

/// Offset that lines the video mark up with the audio mark, if both are set.
///
/// `mark_audio` is cursor time and `mark_video` is video-local time, so the
/// difference is exactly the offset at which `video_time()` hits the video
/// mark when the cursor sits on the audio mark.
pub fn calibrated_offset(state: &TimelineState) -> Option<f64> {
    let audio = state.mark(MarkId::Audio)?;
    let video = state.mark(MarkId::Video)?;
    Some(audio - video)
}

/// Apply the calibrated offset. Unchanged state when either mark is unset.
pub fn align_marks(state: &TimelineState) -> TimelineState {
    match calibrated_offset(state) {
        Some(offset) => {
            log::info!("[ALIGN] video_offset {} -> {}", state.video_offset(), offset);
            state.clone().with_video_offset(offset)
        }
        None => {
            log::debug!("[ALIGN] Skipped: audio and video marks must both be set");
            state.clone()
        }
    }
}
