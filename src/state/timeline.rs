use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{DEFAULT_FPS, DEFAULT_VOLUME};
use crate::error::{AlignError, AlignResult};

/// Files the session is aligning.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSources {
    /// Project folder (settings and state file live here)
    pub root: PathBuf,
    /// Separately recorded audio track
    pub audio_path: PathBuf,
    /// Playable proxy of the video track
    pub video_path: PathBuf,
    /// Camera file the proxy was encoded from
    pub original_video_path: PathBuf,
}

/// One of the two media tracks sharing the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Audio,
    Video,
}

impl Track {
    pub fn as_str(self) -> &'static str {
        match self {
            Track::Audio => "audio",
            Track::Video => "video",
        }
    }
}

impl FromStr for Track {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(Track::Audio),
            "video" => Ok(Track::Video),
            other => Err(AlignError::InvalidField {
                field: "track",
                reason: format!("unknown track '{}'", other),
            }),
        }
    }
}

/// Named reference mark slots on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkId {
    In,
    Out,
    Audio,
    /// Recorded in video-local time, not cursor time.
    Video,
}

impl MarkId {
    pub const ALL: [MarkId; 4] = [MarkId::In, MarkId::Out, MarkId::Audio, MarkId::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            MarkId::In => "in",
            MarkId::Out => "out",
            MarkId::Audio => "audio",
            MarkId::Video => "video",
        }
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkId {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MarkId::In),
            "out" => Ok(MarkId::Out),
            "audio" => Ok(MarkId::Audio),
            "video" => Ok(MarkId::Video),
            other => Err(AlignError::InvalidMark(other.to_string())),
        }
    }
}

/// Normalize a raw mark time: negative (or NaN) input means "unset".
pub fn normalize_mark(value: f64) -> Option<f64> {
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// The four mark slots. `None` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Marks {
    pub mark_in: Option<f64>,
    pub mark_out: Option<f64>,
    pub audio: Option<f64>,
    pub video: Option<f64>,
}

impl Marks {
    pub fn get(&self, id: MarkId) -> Option<f64> {
        match id {
            MarkId::In => self.mark_in,
            MarkId::Out => self.mark_out,
            MarkId::Audio => self.audio,
            MarkId::Video => self.video,
        }
    }

    /// Copy with one slot replaced. The value is normalized first.
    pub fn with(mut self, id: MarkId, value: Option<f64>) -> Self {
        let value = value.and_then(normalize_mark);
        match id {
            MarkId::In => self.mark_in = value,
            MarkId::Out => self.mark_out = value,
            MarkId::Audio => self.audio = value,
            MarkId::Video => self.video = value,
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        MarkId::ALL.iter().all(|id| self.get(*id).is_none())
    }
}

/// The alignment state of one editing session.
///
/// Value object: every edit goes through a `with_*` method that returns a
/// replacement, so the whole state can be swapped and serialized as a unit.
/// Fields are private so the rate/fps invariants cannot be bypassed.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineState {
    sources: MediaSources,
    fps: u32,
    cursor: f64,
    video_offset: f64,
    video_rate: f64,
    marks: Marks,
    mute_audio: bool,
    mute_video: bool,
    audio_volume: f32,
    video_volume: f32,
}

impl TimelineState {
    /// Fresh state for a pair of recordings: cursor at 0, no offset, 1x rate.
    pub fn new(sources: MediaSources) -> Self {
        Self {
            sources,
            fps: DEFAULT_FPS,
            cursor: 0.0,
            video_offset: 0.0,
            video_rate: 1.0,
            marks: Marks::default(),
            mute_audio: false,
            mute_video: false,
            audio_volume: DEFAULT_VOLUME,
            video_volume: DEFAULT_VOLUME,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn sources(&self) -> &MediaSources {
        &self.sources
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn video_offset(&self) -> f64 {
        self.video_offset
    }

    pub fn video_rate(&self) -> f64 {
        self.video_rate
    }

    pub fn marks(&self) -> Marks {
        self.marks
    }

    pub fn mark(&self, id: MarkId) -> Option<f64> {
        self.marks.get(id)
    }

    pub fn is_muted(&self, track: Track) -> bool {
        match track {
            Track::Audio => self.mute_audio,
            Track::Video => self.mute_video,
        }
    }

    pub fn volume(&self, track: Track) -> f32 {
        match track {
            Track::Audio => self.audio_volume,
            Track::Video => self.video_volume,
        }
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// Position of the video track for the current cursor.
    ///
    /// Every consumer positions video through this formula.
    pub fn video_time(&self) -> f64 {
        self.cursor * self.video_rate - self.video_offset
    }

    pub fn video_playback_rate(&self) -> f64 {
        self.video_rate
    }

    /// Cursor as a whole frame count (display only).
    pub fn cursor_frame(&self) -> i64 {
        (self.cursor * self.fps as f64).floor() as i64
    }

    /// Output gain after mute gating.
    pub fn gain(&self, track: Track) -> f32 {
        if self.is_muted(track) {
            0.0
        } else {
            self.volume(track)
        }
    }

    // =========================================================================
    // Replacements
    // =========================================================================

    pub fn with_cursor(mut self, cursor: f64) -> Self {
        if cursor.is_finite() {
            self.cursor = cursor;
        }
        self
    }

    pub fn with_video_offset(mut self, video_offset: f64) -> Self {
        if video_offset.is_finite() {
            self.video_offset = video_offset;
        }
        self
    }

    pub fn with_video_rate(mut self, video_rate: f64) -> AlignResult<Self> {
        self.video_rate = validate_rate(video_rate)?;
        Ok(self)
    }

    pub fn with_fps(mut self, fps: u32) -> AlignResult<Self> {
        self.fps = validate_fps(fps)?;
        Ok(self)
    }

    pub fn with_marks(mut self, marks: Marks) -> Self {
        self.marks = marks;
        self
    }

    pub fn with_mark(self, id: MarkId, value: Option<f64>) -> Self {
        let marks = self.marks.with(id, value);
        self.with_marks(marks)
    }

    pub fn with_muted(mut self, track: Track, muted: bool) -> Self {
        match track {
            Track::Audio => self.mute_audio = muted,
            Track::Video => self.mute_video = muted,
        }
        self
    }

    pub fn with_volume(mut self, track: Track, volume: f32) -> Self {
        let volume = clamp_volume(volume);
        match track {
            Track::Audio => self.audio_volume = volume,
            Track::Video => self.video_volume = volume,
        }
        self
    }

    pub fn with_sources(mut self, sources: MediaSources) -> Self {
        self.sources = sources;
        self
    }

    /// Assemble a state from already-typed parts, enforcing every invariant.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        sources: MediaSources,
        fps: u32,
        cursor: f64,
        video_offset: f64,
        video_rate: f64,
        marks: Marks,
        mute: (bool, bool),
        volume: (f32, f32),
    ) -> AlignResult<Self> {
        Ok(Self {
            sources,
            fps: validate_fps(fps)?,
            cursor: validate_finite("cursor", cursor)?,
            video_offset: validate_finite("video_offset", video_offset)?,
            video_rate: validate_rate(video_rate)?,
            marks,
            mute_audio: mute.0,
            mute_video: mute.1,
            audio_volume: validate_volume("audio_volume", volume.0)?,
            video_volume: validate_volume("video_volume", volume.1)?,
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> AlignResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AlignError::InvalidField {
            field,
            reason: format!("{} is not a finite number", value),
        })
    }
}

fn validate_rate(rate: f64) -> AlignResult<f64> {
    let rate = validate_finite("video_rate", rate)?;
    if rate <= 0.0 {
        return Err(AlignError::InvalidField {
            field: "video_rate",
            reason: format!("must be > 0, got {}", rate),
        });
    }
    Ok(rate)
}

fn validate_fps(fps: u32) -> AlignResult<u32> {
    if fps == 0 {
        return Err(AlignError::InvalidField {
            field: "fps",
            reason: "must be > 0".to_string(),
        });
    }
    Ok(fps)
}

fn validate_volume(field: &'static str, volume: f32) -> AlignResult<f32> {
    if !volume.is_finite() {
        return Err(AlignError::InvalidField {
            field,
            reason: format!("{} is not a finite number", volume),
        });
    }
    Ok(clamp_volume(volume))
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return DEFAULT_VOLUME;
    }
    volume.clamp(0.0, 1.0)
}

#[cfg(test)]
pub(crate) fn test_sources() -> MediaSources {
    MediaSources {
        root: PathBuf::from("/media/session"),
        audio_path: PathBuf::from("/media/session/take.wav"),
        video_path: PathBuf::from("/cache/proxy/abc.mp4"),
        original_video_path: PathBuf::from("/media/session/IMG_0001.MOV"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_time_formula() {
        let state = TimelineState::new(test_sources())
            .with_cursor(12.5)
            .with_video_offset(3.25)
            .with_video_rate(1.001)
            .unwrap();
        assert_eq!(state.video_time(), 12.5 * 1.001 - 3.25);
    }

    #[test]
    fn test_video_time_before_start() {
        let state = TimelineState::new(test_sources()).with_cursor(-2.0);
        assert_eq!(state.video_time(), -2.0);
    }

    #[test]
    fn test_rate_must_be_positive() {
        let state = TimelineState::new(test_sources());
        assert!(matches!(
            state.clone().with_video_rate(0.0),
            Err(AlignError::InvalidField { field: "video_rate", .. })
        ));
        assert!(state.clone().with_video_rate(-1.0).is_err());
        assert!(state.with_video_rate(f64::NAN).is_err());
    }

    #[test]
    fn test_fps_must_be_positive() {
        let state = TimelineState::new(test_sources());
        assert!(state.clone().with_fps(0).is_err());
        assert_eq!(state.with_fps(25).unwrap().fps(), 25);
    }

    #[test]
    fn test_negative_mark_is_unset() {
        let marks = Marks::default().with(MarkId::In, Some(-5.0));
        assert_eq!(marks.mark_in, None);
        let marks = marks.with(MarkId::In, Some(0.0));
        assert_eq!(marks.mark_in, Some(0.0));
    }

    #[test]
    fn test_mark_id_parsing() {
        assert_eq!("video".parse::<MarkId>().unwrap(), MarkId::Video);
        let err = "start".parse::<MarkId>().unwrap_err();
        assert!(matches!(err, AlignError::InvalidMark(ref id) if id == "start"));
    }

    #[test]
    fn test_gain_respects_mute() {
        let state = TimelineState::new(test_sources())
            .with_volume(Track::Audio, 0.6)
            .with_muted(Track::Audio, true);
        assert_eq!(state.gain(Track::Audio), 0.0);
        assert_eq!(state.gain(Track::Video), 1.0);
        assert_eq!(state.volume(Track::Audio), 0.6);
    }

    #[test]
    fn test_volume_is_clamped() {
        let state = TimelineState::new(test_sources()).with_volume(Track::Video, 1.7);
        assert_eq!(state.volume(Track::Video), 1.0);
    }

    #[test]
    fn test_cursor_frame() {
        let state = TimelineState::new(test_sources()).with_cursor(1.5);
        assert_eq!(state.cursor_frame(), 45);
        let state = state.with_cursor(-0.01);
        assert_eq!(state.cursor_frame(), -1);
    }
}
