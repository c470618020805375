//! Players without a device or a display.
//!
//! They keep time the way a real player would (position advances with the
//! wall clock at the playback rate) so the driver binary can run a session
//! and report positions without any output hardware.

use std::rc::Rc;

use crate::error::AlignResult;

use super::audio::decode::AudioBuffer;
use super::player::{AudioOutput, AudioSource, Clock, LoadState, LoadedCallback, MediaPlayer};

pub struct HeadlessVideo {
    clock: Rc<dyn Clock>,
    anchor_position: f64,
    anchor_ms: f64,
    playing: bool,
    rate: f64,
    volume: f32,
    duration: Option<f64>,
    callbacks: Vec<LoadedCallback>,
}

impl HeadlessVideo {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            anchor_position: 0.0,
            anchor_ms: now,
            playing: false,
            rate: 1.0,
            volume: 1.0,
            duration: None,
            callbacks: Vec::new(),
        }
    }

    /// Metadata arrived.
    pub fn finish_loading(&mut self, duration: f64) {
        self.duration = Some(duration);
        for callback in self.callbacks.drain(..) {
            callback(duration);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn clamp(&self, position: f64) -> f64 {
        let position = position.max(0.0);
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn reanchor(&mut self) {
        self.anchor_position = self.position();
        self.anchor_ms = self.clock.now_ms();
    }
}

impl MediaPlayer for HeadlessVideo {
    fn set_position(&mut self, seconds: f64) {
        self.anchor_position = self.clamp(seconds);
        self.anchor_ms = self.clock.now_ms();
    }

    fn position(&self) -> f64 {
        if !self.playing {
            return self.anchor_position;
        }
        let elapsed = (self.clock.now_ms() - self.anchor_ms) / 1000.0;
        self.clamp(self.anchor_position + elapsed * self.rate)
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_rate(&mut self, rate: f64) {
        self.reanchor();
        self.rate = rate;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn play(&mut self) {
        self.reanchor();
        self.playing = true;
    }

    fn pause(&mut self) {
        self.reanchor();
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn on_loaded(&mut self, callback: LoadedCallback) {
        match self.duration {
            Some(duration) => callback(duration),
            None => self.callbacks.push(callback),
        }
    }
}

/// Audio output that only tracks load state and source lifetimes.
pub struct HeadlessAudio {
    load_state: LoadState,
    duration: Option<f64>,
}

impl Default for HeadlessAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self {
            load_state: LoadState::Pending,
            duration: None,
        }
    }

    /// Decode completion.
    pub fn finish_loading(&mut self, decoded: AlignResult<AudioBuffer>) {
        match decoded {
            Ok(buffer) => {
                self.duration = Some(buffer.duration_seconds());
                self.load_state = LoadState::Ready;
            }
            Err(err) => self.load_state = LoadState::Failed(err.to_string()),
        }
    }
}

impl AudioOutput for HeadlessAudio {
    fn load_state(&self) -> LoadState {
        self.load_state.clone()
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn start_source(
        &mut self,
        delay: f64,
        offset: f64,
        _volume: f32,
    ) -> AlignResult<Box<dyn AudioSource>> {
        log::debug!("[AUDIO] Headless source: delay={} offset={}", delay, offset);
        Ok(Box::new(HeadlessSource))
    }
}

struct HeadlessSource;

impl AudioSource for HeadlessSource {
    fn set_volume(&mut self, _volume: f32) {}

    fn stop(self: Box<Self>) {
        log::debug!("[AUDIO] Headless source stopped");
    }
}
