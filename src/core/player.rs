//! Capabilities the engine needs from the native players.
//!
//! The engine drives both tracks through these traits only; concrete
//! players live in `headless` and (with `native-audio`) `audio::playback`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use crate::error::AlignResult;

/// Called once with the media duration when metadata is available.
pub type LoadedCallback = Box<dyn FnOnce(f64)>;

/// A seekable player for one track (the video element, typically).
pub trait MediaPlayer {
    fn set_position(&mut self, seconds: f64);
    fn position(&self) -> f64;
    /// `None` until metadata has loaded.
    fn duration(&self) -> Option<f64>;
    fn set_rate(&mut self, rate: f64);
    fn set_volume(&mut self, volume: f32);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    /// Runs immediately when already loaded.
    fn on_loaded(&mut self, callback: LoadedCallback);
}

/// Progress of decoding the audio track.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed(String),
}

/// Audio output that plays the decoded track through one-shot sources.
pub trait AudioOutput {
    fn load_state(&self) -> LoadState;
    fn duration(&self) -> Option<f64>;
    /// Start a new source `delay` seconds from now, reading from `offset`
    /// seconds into the track.
    fn start_source(
        &mut self,
        delay: f64,
        offset: f64,
        volume: f32,
    ) -> AlignResult<Box<dyn AudioSource>>;
}

/// A started audio source. Stopping consumes it; a new one is needed for
/// the next play.
pub trait AudioSource {
    fn set_volume(&mut self, volume: f32);
    fn stop(self: Box<Self>);
}

// Shared handles, so the owner of a completion callback can still reach a
// player after it has been handed to the editor.

impl<P: MediaPlayer + ?Sized> MediaPlayer for Rc<RefCell<P>> {
    fn set_position(&mut self, seconds: f64) {
        self.borrow_mut().set_position(seconds);
    }

    fn position(&self) -> f64 {
        self.borrow().position()
    }

    fn duration(&self) -> Option<f64> {
        self.borrow().duration()
    }

    fn set_rate(&mut self, rate: f64) {
        self.borrow_mut().set_rate(rate);
    }

    fn set_volume(&mut self, volume: f32) {
        self.borrow_mut().set_volume(volume);
    }

    fn play(&mut self) {
        self.borrow_mut().play();
    }

    fn pause(&mut self) {
        self.borrow_mut().pause();
    }

    fn is_playing(&self) -> bool {
        self.borrow().is_playing()
    }

    /// The callback must not borrow this player again.
    fn on_loaded(&mut self, callback: LoadedCallback) {
        self.borrow_mut().on_loaded(callback);
    }
}

impl<A: AudioOutput + ?Sized> AudioOutput for Rc<RefCell<A>> {
    fn load_state(&self) -> LoadState {
        self.borrow().load_state()
    }

    fn duration(&self) -> Option<f64> {
        self.borrow().duration()
    }

    fn start_source(
        &mut self,
        delay: f64,
        offset: f64,
        volume: f32,
    ) -> AlignResult<Box<dyn AudioSource>> {
        self.borrow_mut().start_source(delay, offset, volume)
    }
}

/// Wall clock in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(now_ms: f64) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }
}
