use std::path::Path;
use std::process::Command;

/// Probe media duration in seconds using ffprobe.
pub fn probe_duration_seconds(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        log::warn!("[MEDIA] ffprobe failed for {:?}", path);
        return None;
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_duration_output(stdout: &str) -> Option<f64> {
    let duration_str = stdout.trim();
    if duration_str.is_empty() {
        return None;
    }

    duration_str
        .parse::<f64>()
        .ok()
        .filter(|duration| duration.is_finite() && *duration >= 0.0)
}

/// Probe the video duration off the main loop.
pub async fn probe_duration_async(path: &Path) -> Option<f64> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || probe_duration_seconds(&path))
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_output() {
        assert_eq!(parse_duration_output("12.480000\n"), Some(12.48));
        assert_eq!(parse_duration_output("  \n"), None);
        assert_eq!(parse_duration_output("N/A\n"), None);
        assert_eq!(parse_duration_output("-1"), None);
    }
}
