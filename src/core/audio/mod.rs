//! Audio core modules (decode, resample, native playback).

pub mod decode;
pub mod resample;
#[cfg(feature = "native-audio")]
pub mod playback;
