pub mod audio;
pub mod calibrate;
pub mod editor;
pub mod headless;
pub mod marks;
pub mod media;
pub mod playback;
pub mod player;
pub mod proxy;
pub mod scrub;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
