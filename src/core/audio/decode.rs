//! WAV decoding for the audio track.

use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};

use crate::error::{AlignError, AlignResult};

/// Decoded track, interleaved f32.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn frames(&self) -> u64 {
        let channels = self.channels.max(1) as usize;
        (self.samples.len() / channels) as u64
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

fn media_err(path: &Path, err: hound::Error) -> AlignError {
    AlignError::MediaLoad(format!("{:?}: {}", path, err))
}

/// Duration from the WAV header alone.
pub fn wav_duration_seconds(path: &Path) -> AlignResult<f64> {
    let reader = WavReader::open(path).map_err(|err| media_err(path, err))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(AlignError::MediaLoad(format!("{:?}: sample rate is 0", path)));
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Decode a whole WAV file into memory.
pub fn decode_wav(path: &Path) -> AlignResult<AudioBuffer> {
    let mut reader = WavReader::open(path).map_err(|err| media_err(path, err))?;
    let spec = reader.spec();
    log::debug!(
        "[AUDIO] Decode start: path={:?} rate={} channels={} bits={} format={:?}",
        path,
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|err| media_err(path, err))?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|err| media_err(path, err))?
        }
    };

    let buffer = AudioBuffer {
        samples: Arc::new(samples),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    };
    log::debug!(
        "[AUDIO] Decode complete: frames={} duration_seconds={:.3}",
        buffer.frames(),
        buffer.duration_seconds()
    );
    Ok(buffer)
}

/// Decode off the main loop.
pub async fn decode_wav_async(path: &Path) -> AlignResult<AudioBuffer> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || decode_wav(&path))
        .await
        .map_err(AlignError::media)?
}

#[cfg(test)]
pub(crate) fn write_test_wav(path: &Path, sample_rate: u32, frames: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let value = if i % 2 == 0 { 16_384_i16 } else { -16_384_i16 };
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_wav(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("videotools-wav-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_decode_int_wav() {
        let path = temp_wav("take.wav");
        write_test_wav(&path, 8_000, 4_000);

        let buffer = decode_wav(&path).unwrap();
        assert_eq!(buffer.channels, 2);
        assert_eq!(buffer.frames(), 4_000);
        assert_eq!(buffer.duration_seconds(), 0.5);
        assert_eq!(buffer.samples[0], 0.5);
        assert_eq!(buffer.samples[2], -0.5);
        assert_eq!(wav_duration_seconds(&path).unwrap(), 0.5);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_decode_missing_file() {
        let path = temp_wav("missing.wav");
        assert!(matches!(decode_wav(&path), Err(AlignError::MediaLoad(_))));
    }

    #[test]
    fn test_decode_garbage_file() {
        let path = temp_wav("garbage.wav");
        std::fs::write(&path, b"RIFF????WAVEnope").unwrap();
        assert!(matches!(decode_wav(&path), Err(AlignError::MediaLoad(_))));
    }
}
