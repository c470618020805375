//! Recording fakes for the player traits.
//!
//! Clones share state, so a test can keep a handle after boxing one into
//! an `Editor`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::AlignResult;

use super::player::{AudioOutput, AudioSource, LoadState, LoadedCallback, MediaPlayer};

struct AudioLog {
    load: LoadState,
    duration: Option<f64>,
    /// (delay, offset) per started source
    starts: Vec<(f64, f64)>,
    stopped: usize,
    volumes: Vec<f32>,
}

#[derive(Clone)]
pub struct FakeAudio {
    log: Rc<RefCell<AudioLog>>,
}

impl FakeAudio {
    fn with(load: LoadState, duration: Option<f64>) -> Self {
        Self {
            log: Rc::new(RefCell::new(AudioLog {
                load,
                duration,
                starts: Vec::new(),
                stopped: 0,
                volumes: Vec::new(),
            })),
        }
    }

    pub fn pending() -> Self {
        Self::with(LoadState::Pending, None)
    }

    pub fn ready(duration: f64) -> Self {
        Self::with(LoadState::Ready, Some(duration))
    }

    /// Reports ready but never learned its length.
    pub fn ready_without_duration() -> Self {
        Self::with(LoadState::Ready, None)
    }

    pub fn failed(reason: &str) -> Self {
        Self::with(LoadState::Failed(reason.to_string()), None)
    }

    pub fn finish_loading(&self, duration: f64) {
        let mut log = self.log.borrow_mut();
        log.load = LoadState::Ready;
        log.duration = Some(duration);
    }

    pub fn starts(&self) -> Vec<(f64, f64)> {
        self.log.borrow().starts.clone()
    }

    pub fn stopped(&self) -> usize {
        self.log.borrow().stopped
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.log.borrow().volumes.last().copied()
    }
}

impl AudioOutput for FakeAudio {
    fn load_state(&self) -> LoadState {
        self.log.borrow().load.clone()
    }

    fn duration(&self) -> Option<f64> {
        self.log.borrow().duration
    }

    fn start_source(
        &mut self,
        delay: f64,
        offset: f64,
        volume: f32,
    ) -> AlignResult<Box<dyn AudioSource>> {
        let mut log = self.log.borrow_mut();
        log.starts.push((delay, offset));
        log.volumes.push(volume);
        Ok(Box::new(FakeSource {
            log: Rc::clone(&self.log),
        }))
    }
}

struct FakeSource {
    log: Rc<RefCell<AudioLog>>,
}

impl AudioSource for FakeSource {
    fn set_volume(&mut self, volume: f32) {
        self.log.borrow_mut().volumes.push(volume);
    }

    fn stop(self: Box<Self>) {
        self.log.borrow_mut().stopped += 1;
    }
}

struct VideoLog {
    position: f64,
    duration: Option<f64>,
    rate: f64,
    volume: f32,
    playing: bool,
    seeks: usize,
    callbacks: Vec<LoadedCallback>,
}

#[derive(Clone)]
pub struct FakeVideo {
    log: Rc<RefCell<VideoLog>>,
}

impl FakeVideo {
    fn with(duration: Option<f64>) -> Self {
        Self {
            log: Rc::new(RefCell::new(VideoLog {
                position: 0.0,
                duration,
                rate: 1.0,
                volume: 1.0,
                playing: false,
                seeks: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    pub fn loaded(duration: f64) -> Self {
        Self::with(Some(duration))
    }

    pub fn unloaded() -> Self {
        Self::with(None)
    }

    pub fn finish_loading(&self, duration: f64) {
        let callbacks = {
            let mut log = self.log.borrow_mut();
            log.duration = Some(duration);
            std::mem::take(&mut log.callbacks)
        };
        for callback in callbacks {
            callback(duration);
        }
    }

    /// Simulate the native clock wandering off the cursor.
    pub fn drift(&self, seconds: f64) {
        self.log.borrow_mut().position += seconds;
    }

    pub fn rate(&self) -> f64 {
        self.log.borrow().rate
    }

    pub fn volume(&self) -> f32 {
        self.log.borrow().volume
    }

    pub fn seeks(&self) -> usize {
        self.log.borrow().seeks
    }
}

impl MediaPlayer for FakeVideo {
    fn set_position(&mut self, seconds: f64) {
        let mut log = self.log.borrow_mut();
        log.position = seconds;
        log.seeks += 1;
    }

    fn position(&self) -> f64 {
        self.log.borrow().position
    }

    fn duration(&self) -> Option<f64> {
        self.log.borrow().duration
    }

    fn set_rate(&mut self, rate: f64) {
        self.log.borrow_mut().rate = rate;
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.borrow_mut().volume = volume;
    }

    fn play(&mut self) {
        self.log.borrow_mut().playing = true;
    }

    fn pause(&mut self) {
        self.log.borrow_mut().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.log.borrow().playing
    }

    fn on_loaded(&mut self, callback: LoadedCallback) {
        let duration = self.log.borrow().duration;
        match duration {
            Some(duration) => callback(duration),
            None => self.log.borrow_mut().callbacks.push(callback),
        }
    }
}
