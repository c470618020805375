//! Command dispatch for one alignment session.
//!
//! The editor owns the session and every collaborator and applies commands
//! one at a time. Anything that moves the cursor or the video clock pauses
//! playback first, so the wall clock and the operator never drive the
//! cursor in the same tick. Edits are pushed to the store afterwards; a
//! failed push is reported but the in-memory state is kept.

use std::rc::Rc;

use crate::commands::InputCommand;
use crate::error::AlignResult;
use crate::state::{Session, TimelineState, Track};

use super::calibrate::align_marks;
use super::marks::{clear_all_marks, jump_mark, set_mark};
use super::playback::{position_players, PlaybackScheduler};
use super::player::{AudioOutput, Clock, MediaPlayer};
use super::scrub::scrub;
use super::sync::{StateSync, StateTransport};

/// Receives a request to redraw after the state changed.
pub trait RenderHook {
    fn request_render(&mut self, state: &TimelineState);
}

/// Render hook for sessions without a display.
pub struct NoRender;

impl RenderHook for NoRender {
    fn request_render(&mut self, _state: &TimelineState) {}
}

pub struct Editor<T: StateTransport> {
    session: Session,
    scheduler: PlaybackScheduler,
    audio: Box<dyn AudioOutput>,
    video: Box<dyn MediaPlayer>,
    sync: StateSync<T>,
    render: Box<dyn RenderHook>,
    clock: Rc<dyn Clock>,
}

impl<T: StateTransport> Editor<T> {
    pub fn new(
        session: Session,
        audio: Box<dyn AudioOutput>,
        video: Box<dyn MediaPlayer>,
        transport: T,
        render: Box<dyn RenderHook>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let sync = StateSync::new(transport, session.id());
        let mut editor = Self {
            session,
            scheduler: PlaybackScheduler::new(),
            audio,
            video,
            sync,
            render,
            clock,
        };
        position_players(editor.session.state(), editor.video.as_mut());
        editor
    }

    pub fn state(&self) -> &TimelineState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn sync(&self) -> &StateSync<T> {
        &self.sync
    }

    pub fn video(&self) -> &dyn MediaPlayer {
        self.video.as_ref()
    }

    /// Execute one command.
    ///
    /// A failed publish while pausing is reported after the command has
    /// still been applied.
    pub fn apply(&mut self, command: InputCommand) -> AlignResult<()> {
        let paused = if command.requires_pause() {
            self.pause().map(|_| ())
        } else {
            Ok(())
        };

        let applied = match command {
            InputCommand::Play => self.play().map(|_| ()),
            InputCommand::Pause => self.pause().map(|_| ()),
            InputCommand::PlayPause => {
                if self.is_playing() {
                    self.pause().map(|_| ())
                } else {
                    self.play().map(|_| ())
                }
            }
            InputCommand::Scrub {
                delta_raw,
                modifiers,
                ..
            } => self.edit(|state| scrub(state, delta_raw, modifiers)),
            InputCommand::SetMark(mark, value) => {
                self.edit(|state| set_mark(state, mark, value))
            }
            InputCommand::JumpMark(mark) => self.edit(|state| jump_mark(state, mark)),
            InputCommand::Align => self.edit(align_marks),
            InputCommand::ClearMarks => self.edit(clear_all_marks),
            InputCommand::ToggleMute(track) => self.edit(|state| {
                let muted = state.is_muted(track);
                state.clone().with_muted(track, !muted)
            }),
            InputCommand::SetVolume(track, volume) => {
                self.edit(|state| state.clone().with_volume(track, volume))
            }
        };
        paused.and(applied)
    }

    /// Start playback. `Ok(false)` while the audio is still loading.
    pub fn play(&mut self) -> AlignResult<bool> {
        let now = self.clock.now_ms();
        let started = self.scheduler.play(
            self.session.state(),
            self.audio.as_mut(),
            self.video.as_mut(),
            now,
        )?;
        if started {
            log::info!("[PLAYBACK] Playing from {:.3}s", self.session.state().cursor());
        }
        Ok(started)
    }

    /// Stop playback and publish where it stopped. No-op when stopped.
    pub fn pause(&mut self) -> AlignResult<bool> {
        let now = self.clock.now_ms();
        if !self
            .scheduler
            .pause(&mut self.session, self.video.as_mut(), now)
        {
            return Ok(false);
        }
        log::info!("[PLAYBACK] Paused at {:.3}s", self.session.state().cursor());
        self.render.request_render(self.session.state());
        self.sync.push(self.session.state())?;
        Ok(true)
    }

    /// Advance the cursor from the wall clock. Returns whether to tick again.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        let playing = self
            .scheduler
            .tick(&mut self.session, self.video.as_mut(), now);
        if playing {
            self.render.request_render(self.session.state());
        }
        playing
    }

    /// Replace the live state with the store's copy, if there is one.
    ///
    /// Running playback is stopped without publishing.
    pub fn pull(&mut self) -> AlignResult<bool> {
        let Some(state) = self.sync.pull()? else {
            return Ok(false);
        };
        let now = self.clock.now_ms();
        self.scheduler
            .pause(&mut self.session, self.video.as_mut(), now);
        self.session.replace(state);
        position_players(self.session.state(), self.video.as_mut());
        self.render.request_render(self.session.state());
        Ok(true)
    }

    /// Publish the live state.
    pub fn push(&mut self) -> AlignResult<u64> {
        self.sync.push(self.session.state())
    }

    /// Install a whole new state (e.g. re-pointed media paths) and publish it.
    pub fn replace(&mut self, state: TimelineState) -> AlignResult<()> {
        let now = self.clock.now_ms();
        self.scheduler
            .pause(&mut self.session, self.video.as_mut(), now);
        self.edit(move |_| state)
    }

    fn edit<F>(&mut self, f: F) -> AlignResult<()>
    where
        F: FnOnce(&TimelineState) -> TimelineState,
    {
        self.session.update(f);
        let state = self.session.state();
        if self.scheduler.is_playing() {
            // Only output levels may change mid-playback; seeking would glitch.
            self.video.set_volume(state.gain(Track::Video));
            self.scheduler.set_audio_volume(state.gain(Track::Audio));
        } else {
            position_players(state, self.video.as_mut());
        }
        self.render.request_render(state);
        self.sync.push(state)?;
        Ok(())
    }
}
