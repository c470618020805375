//! Shared engine constants.

/// Raw scrub units per second of timeline motion (one wheel notch).
pub const SCRUB_UNIT: f64 = 120.0;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Playback tick period (~60 Hz).
pub const TICK_INTERVAL_MS: u64 = 16;

pub const SETTINGS_FILE_NAME: &str = "videotools.json";

/// Salt mixed into proxy cache keys so other caches cannot collide.
pub const PROXY_KEY_PREFIX: &str = "proxy-video";
pub const PROXY_EXTENSION: &str = "mp4";
