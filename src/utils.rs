use std::path::Path;
use urlencoding;

/// URL for a local file as served to an embedded webview player.
/// Separators are normalized to forward slashes and the path is
/// percent-encoded so spaces and unicode survive.
pub fn get_local_file_url(path: &Path) -> String {
    let p_str = path.to_string_lossy().replace("\\", "/");
    format!("file:///{}", urlencoding::encode(p_str.trim_start_matches('/')).replace("%2F", "/"))
}

pub fn parse_f64_input(value: &str, fallback: f64) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return fallback;
    }
    trimmed.parse::<f64>().unwrap_or(fallback)
}

/// `[-]HH:MM:SS:FF` for a timeline position.
pub fn format_timecode(seconds: f64, fps: u32) -> String {
    let fps = fps.max(1) as i64;
    let total_frames = (seconds * fps as f64).floor() as i64;
    let sign = if total_frames < 0 { "-" } else { "" };
    let total_frames = total_frames.abs();
    let frames = total_frames % fps;
    let total_seconds = total_frames / fps;
    format!(
        "{}{:02}:{:02}:{:02}:{:02}",
        sign,
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        frames
    )
}
