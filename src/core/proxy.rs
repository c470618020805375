//! Playable proxies for camera files.
//!
//! Proxies are content-addressed by source path and modification time, so
//! an unchanged source is served from the cache without re-encoding and an
//! edited one gets a fresh proxy.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;

use crate::constants::{PROXY_EXTENSION, PROXY_KEY_PREFIX};
use crate::error::{AlignError, AlignResult};
use crate::state::Settings;

/// Cache key for a source at a given modification time.
pub fn proxy_key(source: &Path, mtime_ms: u64) -> String {
    let digest = Sha256::digest(
        format!("{}:{}:{}", PROXY_KEY_PREFIX, source.to_string_lossy(), mtime_ms).as_bytes(),
    );
    hex::encode(digest)
}

/// Modification time in milliseconds since the epoch.
pub fn source_mtime_ms(path: &Path) -> AlignResult<u64> {
    let meta = fs::metadata(path)
        .map_err(|err| AlignError::MediaLoad(format!("{:?}: {}", path, err)))?;
    let modified = meta
        .modified()
        .map_err(|err| AlignError::MediaLoad(format!("{:?}: {}", path, err)))?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64)
}

/// Encodes and caches proxies.
#[derive(Debug, Clone)]
pub struct ProxyCache {
    // Limits concurrent ffmpeg processes
    semaphore: Arc<Semaphore>,
    cache_root: PathBuf,
    video_codec: String,
    quality: u32,
}

impl ProxyCache {
    pub fn new(
        cache_root: PathBuf,
        video_codec: impl Into<String>,
        quality: u32,
        max_concurrent: usize,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            cache_root,
            video_codec: video_codec.into(),
            quality,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.proxy_cache_root(),
            settings.proxy_video_codec.clone(),
            settings.proxy_quality,
            settings.max_concurrent_encodes,
        )
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Where the proxy for `source` lives (whether or not it exists yet).
    pub fn proxy_path(&self, source: &Path) -> AlignResult<PathBuf> {
        let mtime = source_mtime_ms(source)?;
        Ok(self
            .cache_root
            .join(format!("{}.{}", proxy_key(source, mtime), PROXY_EXTENSION)))
    }

    pub fn encoder_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let quality = self.quality.to_string();
        let mut args: Vec<OsString> = vec!["-i".into(), source.into()];
        for arg in [
            "-c:v",
            self.video_codec.as_str(),
            "-tune:v",
            "hq",
            "-rc:v",
            "vbr",
            "-cq:v",
            quality.as_str(),
            "-b:v",
            "0",
            "-profile:v",
            "high",
            "-c:a",
            "aac",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-y",
        ] {
            args.push(arg.into());
        }
        args.push(output.into());
        args
    }

    /// Path to a playable encoding of `source`, encoding it on a cache miss.
    pub async fn ensure_playable(&self, source: &Path) -> AlignResult<PathBuf> {
        let output = self.proxy_path(source)?;
        if output.exists() {
            log::debug!("[PROXY] Cache hit for {:?}", source);
            return Ok(output);
        }

        let _permit = self.semaphore.acquire().await.map_err(AlignError::media)?;
        // Another request may have encoded it while we waited.
        if output.exists() {
            return Ok(output);
        }

        fs::create_dir_all(&self.cache_root).map_err(AlignError::media)?;
        let args = self.encoder_args(source, &output);
        log::info!(
            "[PROXY] ffmpeg {}",
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let status = tokio::task::spawn_blocking(move || {
            Command::new("ffmpeg")
                .args(&args)
                .stdin(Stdio::null())
                .status()
        })
        .await
        .map_err(AlignError::media)?
        .map_err(|err| AlignError::MediaLoad(format!("Could not run ffmpeg: {}", err)))?;

        if !status.success() {
            log::warn!("[PROXY] ffmpeg exited with {} for {:?}", status, source);
        }
        if !output.exists() {
            return Err(AlignError::MediaLoad(format!(
                "FFmpeg did not create file: {:?}",
                output
            )));
        }
        log::info!("[PROXY] Encoded {:?} -> {:?}", source, output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("videotools-proxy-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_key_depends_on_path_and_mtime() {
        let a = proxy_key(Path::new("/v/a.mov"), 1_000);
        assert_eq!(a.len(), 64);
        assert_eq!(a, proxy_key(Path::new("/v/a.mov"), 1_000));
        assert_ne!(a, proxy_key(Path::new("/v/a.mov"), 1_001));
        assert_ne!(a, proxy_key(Path::new("/v/b.mov"), 1_000));
    }

    #[test]
    fn test_key_is_hex_sha256() {
        assert_eq!(
            proxy_key(Path::new("/media/take.mov"), 1_700_000_000_000),
            "c3e93261532ea7392cc8ee935e2503cc4caf2acaa0c1723ae0fb124c2de5e250"
        );
    }

    #[test]
    fn test_encoder_args_follow_settings() {
        let cache = ProxyCache::new(PathBuf::from("/cache"), "libx264", 23, 1);
        let args = cache.encoder_args(Path::new("in.mov"), Path::new("/cache/out.mp4"));
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(&args[..2], ["-i", "in.mov"]);
        assert!(args.windows(2).any(|pair| pair == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|pair| pair == ["-cq:v", "23"]));
        assert_eq!(args.last().map(String::as_str), Some("/cache/out.mp4"));
    }

    #[tokio::test]
    async fn test_cached_proxy_is_reused() {
        let dir = temp_dir();
        let source = dir.join("IMG_0001.MOV");
        fs::write(&source, b"not really a movie").unwrap();
        let cache = ProxyCache::new(dir.join("proxy"), "h264_nvenc", 20, 1);

        let expected = cache.proxy_path(&source).unwrap();
        fs::create_dir_all(expected.parent().unwrap()).unwrap();
        fs::write(&expected, b"cached").unwrap();

        let proxy = cache.ensure_playable(&source).await.unwrap();
        assert_eq!(proxy, expected);
        assert_eq!(fs::read(&proxy).unwrap(), b"cached");
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_source_is_media_error() {
        let dir = temp_dir();
        let cache = ProxyCache::new(dir.join("proxy"), "h264_nvenc", 20, 1);
        let err = cache
            .ensure_playable(&dir.join("missing.mov"))
            .await
            .unwrap_err();
        assert!(matches!(err, AlignError::MediaLoad(_)));
        let _ = fs::remove_dir_all(&dir);
    }
}
