use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_FPS, SETTINGS_FILE_NAME, TICK_INTERVAL_MS};
use crate::error::{AlignError, AlignResult};

/// Per-project settings, read from `videotools.json` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Frame rate used for fine scrubbing and the frame counter
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Playback tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// ffmpeg video encoder for the playable proxy
    #[serde(default = "default_proxy_video_codec")]
    pub proxy_video_codec: String,
    /// Constant-quality target handed to the encoder
    #[serde(default = "default_proxy_quality")]
    pub proxy_quality: u32,
    /// Upper bound on simultaneous ffmpeg processes
    #[serde(default = "default_max_concurrent_encodes")]
    pub max_concurrent_encodes: usize,
    /// Overrides the proxy cache location
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
    /// State file, relative to the project root
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_tick_interval_ms() -> u64 {
    TICK_INTERVAL_MS
}

fn default_proxy_video_codec() -> String {
    "h264_nvenc".to_string()
}

fn default_proxy_quality() -> u32 {
    20
}

fn default_max_concurrent_encodes() -> usize {
    1
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".videotools").join("state.json")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            tick_interval_ms: default_tick_interval_ms(),
            proxy_video_codec: default_proxy_video_codec(),
            proxy_quality: default_proxy_quality(),
            max_concurrent_encodes: default_max_concurrent_encodes(),
            cache_root: None,
            state_file: default_state_file(),
        }
    }
}

impl Settings {
    /// Load settings for a project, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> AlignResult<Self> {
        let path = root.join(SETTINGS_FILE_NAME);
        if !path.exists() {
            log::debug!("[SETTINGS] No {} in {:?}, using defaults", SETTINGS_FILE_NAME, root);
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&path)
            .map_err(|err| AlignError::Settings(format!("{:?}: {}", path, err)))?;
        let settings: Settings = serde_json::from_str(&json)
            .map_err(|err| AlignError::Settings(format!("{:?}: {}", path, err)))?;
        if settings.fps == 0 {
            return Err(AlignError::Settings("fps must be > 0".to_string()));
        }
        Ok(settings)
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }

    /// Where encoded proxies are kept.
    pub fn proxy_cache_root(&self) -> PathBuf {
        match &self.cache_root {
            Some(root) => root.clone(),
            None => app_cache_root().join("proxy"),
        }
    }
}

/// `videotools` under the platform cache dir, or under the temp dir when
/// the platform has none.
pub fn app_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("videotools")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_project_dir() -> PathBuf {
        std::env::temp_dir().join(format!("videotools-settings-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "fps": 25 }"#).unwrap();
        assert_eq!(settings.fps, 25);
        assert_eq!(settings.tick_interval_ms, TICK_INTERVAL_MS);
        assert_eq!(settings.proxy_video_codec, "h264_nvenc");
        assert_eq!(settings.state_file, default_state_file());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = temp_project_dir();
        let settings = Settings::load(&dir).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_zero_fps_is_rejected() {
        let dir = temp_project_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SETTINGS_FILE_NAME), r#"{ "fps": 0 }"#).unwrap();
        assert!(matches!(Settings::load(&dir), Err(AlignError::Settings(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_app_cache_root_uses_platform_cache_dir() {
        let root = app_cache_root();
        assert!(root.ends_with("videotools"));
        if let Some(base) = dirs::cache_dir() {
            assert_eq!(root, base.join("videotools"));
        }
        assert_eq!(
            Settings::default().proxy_cache_root(),
            root.join("proxy")
        );
    }

    #[test]
    fn test_cache_root_override() {
        let settings = Settings {
            cache_root: Some(PathBuf::from("/tmp/proxies")),
            ..Default::default()
        };
        assert_eq!(settings.proxy_cache_root(), PathBuf::from("/tmp/proxies"));
    }
}
