//! Playback scheduler: one virtual cursor driving two native players.
//!
//! While playing, the cursor is re-derived from wall-clock time on every
//! tick (`cursor_at`) rather than accumulated, so frame jitter never turns
//! into drift. Each track's start parameters are derived independently from
//! the same cursor; there is no handshake between the players.

use crate::error::{AlignError, AlignResult};
use crate::state::{Session, TimelineState, Track};

use super::player::{AudioOutput, AudioSource, LoadState, MediaPlayer};

/// Cursor position `now_ms` into a playback that began at `started_at_ms`.
pub fn cursor_at(started_at_ms: f64, cursor_at_start: f64, now_ms: f64) -> f64 {
    cursor_at_start + (now_ms - started_at_ms) / 1000.0
}

/// How the audio source starts for a given cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioStart {
    /// Start now, `offset` seconds into the track.
    Immediate { offset: f64 },
    /// Cursor is before the track: start from 0 after `delay` seconds.
    Delayed { delay: f64 },
    /// Cursor is past the end of the track.
    Skip,
}

/// How the video player starts for a given cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoStart {
    Immediate { position: f64 },
    /// `video_time()` is negative: hold at 0 until it reaches 0.
    Delayed { delay: f64 },
    /// Ended, or metadata not loaded yet: park at `position`, stay paused.
    Hold { position: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPlan {
    pub audio: AudioStart,
    pub video: VideoStart,
}

/// Native start parameters for both tracks.
pub fn plan_start(
    state: &TimelineState,
    audio_duration: f64,
    video_duration: Option<f64>,
) -> StartPlan {
    let cursor = state.cursor();
    let audio = if cursor < 0.0 {
        AudioStart::Delayed { delay: -cursor }
    } else if cursor >= audio_duration {
        AudioStart::Skip
    } else {
        AudioStart::Immediate { offset: cursor }
    };

    let video_time = state.video_time();
    let video = match video_duration {
        Some(duration) if video_time < duration => {
            if video_time < 0.0 {
                // Real seconds until video_time() climbs to 0.
                VideoStart::Delayed {
                    delay: -video_time / state.video_rate(),
                }
            } else {
                VideoStart::Immediate {
                    position: video_time,
                }
            }
        }
        _ => VideoStart::Hold {
            position: video_time,
        },
    };

    StartPlan { audio, video }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackPhase {
    Stopped,
    Playing {
        started_at_ms: f64,
        cursor_at_start: f64,
    },
}

pub struct PlaybackScheduler {
    phase: PlaybackPhase,
    /// The single live audio source, if any.
    audio_source: Option<Box<dyn AudioSource>>,
    /// Video start deferred until `video_time()` reaches 0.
    video_pending: bool,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            phase: PlaybackPhase::Stopped,
            audio_source: None,
            video_pending: false,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Playing { .. })
    }

    pub fn has_audio_source(&self) -> bool {
        self.audio_source.is_some()
    }

    pub fn video_pending(&self) -> bool {
        self.video_pending
    }

    /// Start playback from the current cursor.
    ///
    /// Returns `Ok(false)` when nothing happened (already playing, or the
    /// audio is still decoding). A failed audio load is an error and
    /// playback stays stopped.
    pub fn play(
        &mut self,
        state: &TimelineState,
        audio: &mut dyn AudioOutput,
        video: &mut dyn MediaPlayer,
        now_ms: f64,
    ) -> AlignResult<bool> {
        if self.is_playing() {
            return Ok(false);
        }
        match audio.load_state() {
            LoadState::Ready => {}
            LoadState::Pending => {
                log::debug!("[PLAYBACK] play() ignored: audio not loaded yet");
                return Ok(false);
            }
            LoadState::Failed(reason) => return Err(AlignError::MediaLoad(reason)),
        }

        let audio_duration = audio.duration().ok_or_else(|| {
            AlignError::MediaLoad("audio loaded without a duration".to_string())
        })?;
        let plan = plan_start(state, audio_duration, video.duration());
        log::debug!(
            "[PLAYBACK] play at cursor={} video_time={} plan={:?}",
            state.cursor(),
            state.video_time(),
            plan
        );

        let gain = state.gain(Track::Audio);
        let source = match plan.audio {
            AudioStart::Immediate { offset } => Some(audio.start_source(0.0, offset, gain)?),
            AudioStart::Delayed { delay } => Some(audio.start_source(delay, 0.0, gain)?),
            AudioStart::Skip => None,
        };
        if let Some(stale) = self.audio_source.take() {
            stale.stop();
        }
        self.audio_source = source;

        video.set_rate(state.video_playback_rate());
        video.set_volume(state.gain(Track::Video));
        self.video_pending = false;
        match plan.video {
            VideoStart::Immediate { position } => {
                video.set_position(position);
                video.play();
            }
            VideoStart::Delayed { .. } => {
                video.set_position(0.0);
                self.video_pending = true;
            }
            VideoStart::Hold { position } => {
                video.pause();
                video.set_position(position);
            }
        }

        self.phase = PlaybackPhase::Playing {
            started_at_ms: now_ms,
            cursor_at_start: state.cursor(),
        };
        Ok(true)
    }

    /// Per-frame update. Returns whether another tick should be scheduled.
    pub fn tick(
        &mut self,
        session: &mut Session,
        video: &mut dyn MediaPlayer,
        now_ms: f64,
    ) -> bool {
        let PlaybackPhase::Playing {
            started_at_ms,
            cursor_at_start,
        } = self.phase
        else {
            return false;
        };

        let cursor = cursor_at(started_at_ms, cursor_at_start, now_ms);
        session.update(|state| state.clone().with_cursor(cursor));

        if self.video_pending {
            let video_time = session.state().video_time();
            if video_time >= 0.0 {
                self.video_pending = false;
                if video.duration().map_or(false, |duration| video_time < duration) {
                    video.set_position(video_time);
                    video.play();
                    log::debug!("[PLAYBACK] Delayed video start at {}", video_time);
                }
            }
        }
        true
    }

    /// Stop playback, freezing the cursor at `now_ms`.
    ///
    /// Idempotent. Returns whether playback was actually running. Video is
    /// re-seeked to `video_time()` to discard any native drift.
    pub fn pause(
        &mut self,
        session: &mut Session,
        video: &mut dyn MediaPlayer,
        now_ms: f64,
    ) -> bool {
        let PlaybackPhase::Playing {
            started_at_ms,
            cursor_at_start,
        } = self.phase
        else {
            return false;
        };

        let cursor = cursor_at(started_at_ms, cursor_at_start, now_ms);
        session.update(|state| state.clone().with_cursor(cursor));
        self.phase = PlaybackPhase::Stopped;
        self.video_pending = false;

        if let Some(source) = self.audio_source.take() {
            source.stop();
        }
        video.pause();
        position_players(session.state(), video);
        log::debug!("[PLAYBACK] Paused at cursor={}", cursor);
        true
    }

    /// Forward a gain change to the live audio source.
    pub fn set_audio_volume(&mut self, volume: f32) {
        if let Some(source) = self.audio_source.as_mut() {
            source.set_volume(volume);
        }
    }
}

/// Re-derive the native video position and output settings from the state.
pub fn position_players(state: &TimelineState, video: &mut dyn MediaPlayer) {
    video.set_rate(state.video_playback_rate());
    video.set_volume(state.gain(Track::Video));
    video.set_position(state.video_time());
}
