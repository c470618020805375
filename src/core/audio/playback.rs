//! Audio output through the default cpal device.
//!
//! The stream runs for the life of the output; each `start_source` adds a
//! voice to its mix and stopping a source drops the voice on the next
//! callback.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::decode::AudioBuffer;
use crate::core::player::{AudioOutput, AudioSource, LoadState};
use crate::error::{AlignError, AlignResult};

struct Voice {
    samples: Arc<Vec<f32>>,
    source_channels: usize,
    /// Output frames of silence left before the voice is heard
    delay_frames: u64,
    /// Next source frame to play
    position: u64,
    gain: Arc<AtomicU32>,
    stopped: Arc<AtomicBool>,
}

impl Voice {
    fn total_frames(&self) -> u64 {
        (self.samples.len() / self.source_channels) as u64
    }

    fn is_done(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
            || (self.delay_frames == 0 && self.position >= self.total_frames())
    }

    fn mix_into(&mut self, data: &mut [f32], out_channels: usize) {
        let gain = f32::from_bits(self.gain.load(Ordering::Relaxed));
        let total = self.total_frames();
        for frame in data.chunks_mut(out_channels) {
            if self.delay_frames > 0 {
                self.delay_frames -= 1;
                continue;
            }
            if self.position >= total {
                break;
            }
            let base = self.position as usize * self.source_channels;
            for (channel, sample) in frame.iter_mut().enumerate() {
                let source_channel = channel.min(self.source_channels - 1);
                *sample += self.samples[base + source_channel] * gain;
            }
            self.position += 1;
        }
    }
}

pub struct CpalAudioOutput {
    stream: Option<cpal::Stream>,
    voices: Arc<Mutex<Vec<Voice>>>,
    buffer: Option<AudioBuffer>,
    load_state: LoadState,
    sample_rate: u32,
}

impl Default for CpalAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalAudioOutput {
    /// An output with nothing loaded yet.
    pub fn new() -> Self {
        Self {
            stream: None,
            voices: Arc::new(Mutex::new(Vec::new())),
            buffer: None,
            load_state: LoadState::Pending,
            sample_rate: 0,
        }
    }

    /// Decode completion: open the device, then match the track to its rate.
    pub fn finish_loading(&mut self, decoded: AlignResult<AudioBuffer>) {
        let buffer = match decoded {
            Ok(buffer) => buffer,
            Err(err) => {
                self.load_state = LoadState::Failed(err.to_string());
                return;
            }
        };
        match self.open_stream(buffer.sample_rate) {
            Ok(device_rate) => self.install(buffer, device_rate),
            Err(reason) => {
                log::warn!("[AUDIO] Output unavailable: {}", reason);
                self.load_state = LoadState::Failed(reason);
            }
        }
    }

    /// Keep `buffer` at the device rate so voice frames are device frames.
    fn install(&mut self, buffer: AudioBuffer, device_rate: u32) {
        let buffer = if buffer.sample_rate != device_rate {
            log::info!(
                "[AUDIO] Resampling track {} Hz -> {} Hz",
                buffer.sample_rate,
                device_rate
            );
            buffer.resampled(device_rate)
        } else {
            buffer
        };
        self.sample_rate = device_rate;
        self.buffer = Some(buffer);
        self.load_state = LoadState::Ready;
    }

    /// Returns the rate the device actually runs at.
    fn open_stream(&mut self, target_rate: u32) -> Result<u32, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "No default audio output device found.".to_string())?;
        let config = select_output_config(&device, target_rate)?;
        let out_channels = config.channels.max(1) as usize;
        let voices_for_cb = Arc::clone(&self.voices);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    for sample in data.iter_mut() {
                        *sample = 0.0;
                    }
                    if let Ok(mut voices) = voices_for_cb.lock() {
                        voices.retain(|voice| !voice.is_done());
                        for voice in voices.iter_mut() {
                            voice.mix_into(data, out_channels);
                        }
                    }
                },
                move |err| {
                    log::error!("[AUDIO] Output error: {}", err);
                },
                None,
            )
            .map_err(|err| err.to_string())?;
        stream.play().map_err(|err| err.to_string())?;

        self.stream = Some(stream);
        Ok(config.sample_rate.0)
    }
}

impl AudioOutput for CpalAudioOutput {
    fn load_state(&self) -> LoadState {
        self.load_state.clone()
    }

    fn duration(&self) -> Option<f64> {
        self.buffer.as_ref().map(AudioBuffer::duration_seconds)
    }

    fn start_source(
        &mut self,
        delay: f64,
        offset: f64,
        volume: f32,
    ) -> AlignResult<Box<dyn AudioSource>> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| AlignError::MediaLoad("audio not loaded".to_string()))?;
        let rate = self.sample_rate as f64;
        let gain = Arc::new(AtomicU32::new(volume.to_bits()));
        let stopped = Arc::new(AtomicBool::new(false));
        let voice = Voice {
            samples: Arc::clone(&buffer.samples),
            source_channels: buffer.channels.max(1) as usize,
            delay_frames: (delay.max(0.0) * rate).round() as u64,
            position: ((offset.max(0.0) * rate).round() as u64).min(buffer.frames()),
            gain: Arc::clone(&gain),
            stopped: Arc::clone(&stopped),
        };
        self.voices
            .lock()
            .map_err(|_| AlignError::MediaLoad("audio mixer lock poisoned".to_string()))?
            .push(voice);
        log::debug!("[AUDIO] Source started: delay={} offset={}", delay, offset);
        Ok(Box::new(CpalSource { gain, stopped }))
    }
}

struct CpalSource {
    gain: Arc<AtomicU32>,
    stopped: Arc<AtomicBool>,
}

impl AudioSource for CpalSource {
    fn set_volume(&mut self, volume: f32) {
        self.gain.store(volume.to_bits(), Ordering::Relaxed);
    }

    fn stop(self: Box<Self>) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

fn select_output_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::StreamConfig, String> {
    let configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|err| err.to_string())?
        .filter(|config| config.sample_format() == cpal::SampleFormat::F32)
        .collect();

    let target_rate = cpal::SampleRate(target_rate);
    if let Some(config) = configs.iter().find(|config| {
        config.min_sample_rate() <= target_rate && config.max_sample_rate() >= target_rate
    }) {
        return Ok(config.clone().with_sample_rate(target_rate).config());
    }

    let default_config = device
        .default_output_config()
        .map_err(|err| err.to_string())?;
    if default_config.sample_format() != cpal::SampleFormat::F32 {
        return Err("Default output device does not support f32 sample format.".to_string());
    }
    Ok(default_config.config())
}
