//! Videotools Align
//!
//! Headless alignment session: prepares a playable proxy of the video,
//! restores the last saved timeline for the project root and then reads
//! editing commands from stdin while playback ticks.
//!
//! Usage: `videotools-align <root> <video> <audio.wav> [offset]`

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use videotools_align::commands::parse_command;
use videotools_align::core::audio::decode::decode_wav_async;
use videotools_align::core::headless::HeadlessVideo;
use videotools_align::core::media::probe_duration_async;
use videotools_align::core::player::{Clock, MonotonicClock};
use videotools_align::core::proxy::ProxyCache;
use videotools_align::core::sync::JsonFileTransport;
use videotools_align::state::{MediaSources, Settings};
use videotools_align::utils::{format_timecode, get_local_file_url, parse_f64_input};
use videotools_align::{
    AlignError, AlignResult, Editor, MarkId, RenderHook, Session, TimelineState,
};

#[cfg(feature = "native-audio")]
type AudioBackend = videotools_align::core::audio::playback::CpalAudioOutput;
#[cfg(not(feature = "native-audio"))]
type AudioBackend = videotools_align::core::headless::HeadlessAudio;

/// Logs the cursor position whenever the engine asks for a redraw.
struct TimecodeRender;

impl RenderHook for TimecodeRender {
    fn request_render(&mut self, state: &TimelineState) {
        log::trace!(
            "[RENDER] {} (video {})",
            format_timecode(state.cursor(), state.fps()),
            format_timecode(state.video_time(), state.fps())
        );
    }
}

fn status_line(state: &TimelineState) -> String {
    let marks: Vec<String> = MarkId::ALL
        .iter()
        .map(|id| match state.mark(*id) {
            Some(t) => format!("{}={:.3}", id, t),
            None => format!("{}=-", id),
        })
        .collect();
    format!(
        "{} cursor={:.3} offset={:.3} rate={} [{}]",
        format_timecode(state.cursor(), state.fps()),
        state.cursor(),
        state.video_offset(),
        state.video_rate(),
        marks.join(" ")
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> AlignResult<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        return Err(AlignError::InvalidField {
            field: "arguments",
            reason: "usage: videotools-align <root> <video> <audio.wav> [offset]".to_string(),
        });
    }
    let root = PathBuf::from(&args[0]);
    let original_video_path = PathBuf::from(&args[1]);
    let audio_path = PathBuf::from(&args[2]);
    let initial_offset = args
        .get(3)
        .map(|value| parse_f64_input(value, 0.0))
        .unwrap_or(0.0);

    let settings = Settings::load(&root)?;
    let proxies = ProxyCache::from_settings(&settings);
    let video_path = proxies.ensure_playable(&original_video_path).await?;
    log::info!("[MAIN] Video proxy: {}", get_local_file_url(&video_path));

    let sources = MediaSources {
        root: root.clone(),
        audio_path: audio_path.clone(),
        video_path: video_path.clone(),
        original_video_path,
    };

    let clock: Rc<dyn Clock> = Rc::new(MonotonicClock::new());
    let audio = Rc::new(RefCell::new(AudioBackend::new()));
    let video = Rc::new(RefCell::new(HeadlessVideo::new(Rc::clone(&clock))));

    let seed = TimelineState::new(sources.clone())
        .with_fps(settings.fps)?
        .with_video_offset(initial_offset);
    let transport = JsonFileTransport::new(settings.state_path(&root));
    let mut editor = Editor::new(
        Session::new(seed),
        Box::new(Rc::clone(&audio)),
        Box::new(Rc::clone(&video)),
        transport,
        Box::new(TimecodeRender),
        Rc::clone(&clock),
    );

    if editor.pull()? {
        log::info!("[MAIN] Restored saved timeline");
        // The proxy path follows the source mtime, so re-point the media.
        let restored = editor.state().clone().with_sources(sources);
        editor.replace(restored)?;
    } else {
        editor.push()?;
    }

    match probe_duration_async(&video_path).await {
        Some(duration) => video.borrow_mut().finish_loading(duration),
        None => log::warn!("[MAIN] Could not probe video duration for {:?}", video_path),
    }

    let decode = decode_wav_async(&audio_path);
    tokio::pin!(decode);
    let mut decoding = true;

    let tick_period = Duration::from_millis(settings.tick_interval_ms.max(1));
    let mut ticker = tokio::time::interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", status_line(editor.state()));

    loop {
        tokio::select! {
            decoded = &mut decode, if decoding => {
                decoding = false;
                if let Err(err) = &decoded {
                    log::error!("[MAIN] Audio decode failed: {}", err);
                }
                audio.borrow_mut().finish_loading(decoded);
            }
            _ = ticker.tick(), if editor.is_playing() => {
                if !editor.tick() {
                    println!("{}", status_line(editor.state()));
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => return Err(AlignError::transport(err)),
                };
                let line = line.trim();
                match line {
                    "" => continue,
                    "quit" | "exit" => break,
                    "status" => {}
                    "pull" => {
                        if let Err(err) = editor.pull() {
                            log::warn!("[MAIN] Pull failed: {}", err);
                        }
                    }
                    _ => {
                        let result = parse_command(line).and_then(|command| editor.apply(command));
                        if let Err(err) = result {
                            if !err.is_recoverable() {
                                println!("error: {}", err);
                            } else {
                                log::warn!("[MAIN] {}", err);
                            }
                        }
                    }
                }
                println!(
                    "{} (video at {:.3})",
                    status_line(editor.state()),
                    editor.video().position()
                );
            }
        }
    }

    editor.pause()?;
    editor.push()?;
    Ok(())
}
