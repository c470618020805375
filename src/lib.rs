//! Videotools Align
//!
//! Manual alignment of a video recording and a separately recorded audio
//! track: one virtual cursor, reference marks on each track, and the offset
//! that keeps both in sync.
//!
//! - [`state`]: the timeline value object, its store record, the session
//! - [`core`]: marks, calibration, scrubbing, playback, sync, media
//! - [`commands`]: the command vocabulary of the input layer

pub mod commands;
pub mod constants;
pub mod core;
pub mod error;
pub mod state;
pub mod utils;

pub use crate::core::editor::{Editor, NoRender, RenderHook};
pub use crate::error::{AlignError, AlignResult};
pub use crate::state::{MarkId, Session, TimelineState, TimelineStateRecord, Track};
