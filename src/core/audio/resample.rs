//! Sample rate conversion for decoded tracks.
//!
//! Linear interpolation over the whole interleaved buffer, done once when
//! the output device's rate is known. Output frame `n` reads source
//! position `n * from_rate / to_rate`, so time positions map 1:1 between
//! the two rates.

use std::sync::Arc;

use super::decode::AudioBuffer;

/// Resample interleaved samples from `from_rate` to `to_rate`.
pub fn resample_linear(
    samples: &[f32],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> Vec<f32> {
    if channels == 0 || from_rate == 0 || to_rate == 0 || from_rate == to_rate {
        return samples.to_vec();
    }
    let input_frames = samples.len() / channels;
    if input_frames == 0 {
        return Vec::new();
    }

    let output_frames = (input_frames as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = input_frames - 1;
    let mut output = Vec::with_capacity(output_frames * channels);

    for frame in 0..output_frames {
        let pos = frame as f64 * step;
        let index = (pos.floor() as usize).min(last);
        let next = (index + 1).min(last);
        let frac = (pos - index as f64) as f32;
        for channel in 0..channels {
            let a = samples[index * channels + channel];
            let b = samples[next * channels + channel];
            output.push(a + (b - a) * frac);
        }
    }
    output
}

impl AudioBuffer {
    /// This track at `target_rate`. Returns a cheap clone when the rate
    /// already matches.
    pub fn resampled(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.sample_rate == 0 || target_rate == 0 {
            return self.clone();
        }
        let samples = resample_linear(
            &self.samples,
            self.channels.max(1) as usize,
            self.sample_rate,
            target_rate,
        );
        AudioBuffer {
            samples: Arc::new(samples),
            sample_rate: target_rate,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_passes_through() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&samples, 2, 48_000, 48_000), samples);
    }

    #[test]
    fn test_upsample_interpolates_between_frames() {
        let samples = vec![0.0, 1.0, 0.0, -1.0];
        let out = resample_linear(&samples, 1, 1_000, 2_000);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -1.0]);
    }

    #[test]
    fn test_stereo_channels_stay_separate() {
        let samples = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let out = resample_linear(&samples, 2, 4, 2);
        assert_eq!(out, vec![1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_resampled_buffer_keeps_duration() {
        let buffer = AudioBuffer {
            samples: Arc::new(vec![0.25; 44_100 * 2]),
            sample_rate: 44_100,
            channels: 2,
        };
        let out = buffer.resampled(48_000);
        assert_eq!(out.sample_rate, 48_000);
        assert_eq!(out.channels, 2);
        assert_eq!(out.frames(), 48_000);
        assert_eq!(out.duration_seconds(), buffer.duration_seconds());
    }

    #[test]
    fn test_time_positions_line_up_after_resampling() {
        // Ramp: sample value equals its time in seconds.
        let rate = 44_100;
        let samples: Vec<f32> = (0..rate * 2).map(|i| i as f32 / rate as f32).collect();
        let buffer = AudioBuffer {
            samples: Arc::new(samples),
            sample_rate: rate,
            channels: 1,
        };
        let out = buffer.resampled(48_000);
        let at_one_second = out.samples[48_000];
        assert!((at_one_second - 1.0).abs() < 1e-4);
    }
}
