//! Flat key/value form of `TimelineState` exchanged with the state store.
//!
//! Every field is optional at this layer so that a record with holes can be
//! read at all; `TryFrom` then refuses it, naming the first missing field.
//! Unset marks travel as the `-1` sentinel.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::timeline::{normalize_mark, MarkId, Marks, MediaSources, TimelineState, Track};
use crate::error::{AlignError, AlignResult};

/// Stored value for an unset mark.
pub const UNSET_MARK: f64 = -1.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineStateRecord {
    pub root: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub original_video_path: Option<PathBuf>,
    pub fps: Option<u32>,
    pub video_offset: Option<f64>,
    pub video_rate: Option<f64>,
    pub cursor: Option<f64>,
    pub mute_audio: Option<bool>,
    pub mute_video: Option<bool>,
    pub audio_volume: Option<f32>,
    pub video_volume: Option<f32>,
    pub mark_in: Option<f64>,
    pub mark_out: Option<f64>,
    pub mark_audio: Option<f64>,
    pub mark_video: Option<f64>,
}

fn require<T>(value: Option<T>, field: &'static str) -> AlignResult<T> {
    value.ok_or(AlignError::MissingField { field })
}

fn mark_to_record(value: Option<f64>) -> Option<f64> {
    Some(value.unwrap_or(UNSET_MARK))
}

impl From<&TimelineState> for TimelineStateRecord {
    fn from(state: &TimelineState) -> Self {
        let sources = state.sources();
        let marks = state.marks();
        Self {
            root: Some(sources.root.clone()),
            video_path: Some(sources.video_path.clone()),
            audio_path: Some(sources.audio_path.clone()),
            original_video_path: Some(sources.original_video_path.clone()),
            fps: Some(state.fps()),
            video_offset: Some(state.video_offset()),
            video_rate: Some(state.video_rate()),
            cursor: Some(state.cursor()),
            mute_audio: Some(state.is_muted(Track::Audio)),
            mute_video: Some(state.is_muted(Track::Video)),
            audio_volume: Some(state.volume(Track::Audio)),
            video_volume: Some(state.volume(Track::Video)),
            mark_in: mark_to_record(marks.get(MarkId::In)),
            mark_out: mark_to_record(marks.get(MarkId::Out)),
            mark_audio: mark_to_record(marks.get(MarkId::Audio)),
            mark_video: mark_to_record(marks.get(MarkId::Video)),
        }
    }
}

impl TryFrom<TimelineStateRecord> for TimelineState {
    type Error = AlignError;

    /// Fields are checked in declaration order.
    fn try_from(record: TimelineStateRecord) -> Result<Self, Self::Error> {
        let root = require(record.root, "root")?;
        let video_path = require(record.video_path, "video_path")?;
        let audio_path = require(record.audio_path, "audio_path")?;
        let original_video_path = require(record.original_video_path, "original_video_path")?;
        let fps = require(record.fps, "fps")?;
        let video_offset = require(record.video_offset, "video_offset")?;
        let video_rate = require(record.video_rate, "video_rate")?;
        let cursor = require(record.cursor, "cursor")?;
        let mute_audio = require(record.mute_audio, "mute_audio")?;
        let mute_video = require(record.mute_video, "mute_video")?;
        let audio_volume = require(record.audio_volume, "audio_volume")?;
        let video_volume = require(record.video_volume, "video_volume")?;
        let marks = Marks {
            mark_in: normalize_mark(require(record.mark_in, "mark_in")?),
            mark_out: normalize_mark(require(record.mark_out, "mark_out")?),
            audio: normalize_mark(require(record.mark_audio, "mark_audio")?),
            video: normalize_mark(require(record.mark_video, "mark_video")?),
        };

        TimelineState::from_parts(
            MediaSources {
                root,
                audio_path,
                video_path,
                original_video_path,
            },
            fps,
            cursor,
            video_offset,
            video_rate,
            marks,
            (mute_audio, mute_video),
            (audio_volume, video_volume),
        )
    }
}

impl TimelineState {
    pub fn to_record(&self) -> TimelineStateRecord {
        TimelineStateRecord::from(self)
    }

    pub fn from_record(record: TimelineStateRecord) -> AlignResult<Self> {
        Self::try_from(record)
    }

    /// Parse a JSON object as produced by `to_json`.
    pub fn from_json(json: &str) -> AlignResult<Self> {
        let record: TimelineStateRecord =
            serde_json::from_str(json).map_err(AlignError::transport)?;
        Self::try_from(record)
    }

    pub fn to_json(&self) -> AlignResult<String> {
        serde_json::to_string_pretty(&self.to_record()).map_err(AlignError::transport)
    }
}
