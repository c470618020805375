//! Input commands
//!
//! Semantic commands produced by the input layer. Raw device events never
//! reach the engine; whatever captures them maps them onto `InputCommand`.
//!
//! # Architecture
//!
//! - **InputCommand**: everything the operator can ask the engine to do
//! - **parse_command()**: text form used by the headless driver
//! - **Editor::apply()**: executes a command against the session

use std::str::FromStr;

use crate::core::scrub::ScrubModifiers;
use crate::error::{AlignError, AlignResult};
use crate::state::{MarkId, Track};

/// Axis the scrub gesture was reported on. Both axes scrub the same way;
/// sign is already resolved by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrubAxis {
    #[default]
    Horizontal,
    Vertical,
}

/// All actions the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    // ═══════════════════════════════════════════════════════════════
    // Timeline motion
    // ═══════════════════════════════════════════════════════════════
    /// Relative motion in raw units (120 per second).
    Scrub {
        delta_raw: f64,
        axis: ScrubAxis,
        modifiers: ScrubModifiers,
    },

    // ═══════════════════════════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════════════════════════
    /// Flip the mute flag of a track.
    ToggleMute(Track),
    SetVolume(Track, f32),

    // ═══════════════════════════════════════════════════════════════
    // Marks & calibration
    // ═══════════════════════════════════════════════════════════════
    /// Drop a mark; `None` places it at the cursor.
    SetMark(MarkId, Option<f64>),
    JumpMark(MarkId),
    Align,
    ClearMarks,

    // ═══════════════════════════════════════════════════════════════
    // Transport
    // ═══════════════════════════════════════════════════════════════
    Play,
    Pause,
    PlayPause,
}

impl InputCommand {
    /// Commands that move the cursor or the video clock, which cannot run
    /// while the wall clock drives the cursor.
    pub fn requires_pause(&self) -> bool {
        matches!(
            self,
            InputCommand::Scrub { .. } | InputCommand::JumpMark(_) | InputCommand::Align
        )
    }
}

impl FromStr for InputCommand {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_command(s)
    }
}

fn invalid(reason: impl Into<String>) -> AlignError {
    AlignError::InvalidField {
        field: "command",
        reason: reason.into(),
    }
}

fn parse_number<T: FromStr>(word: Option<&str>, what: &str) -> AlignResult<T> {
    let word = word.ok_or_else(|| invalid(format!("missing {}", what)))?;
    word.parse::<T>()
        .map_err(|_| invalid(format!("'{}' is not a valid {}", word, what)))
}

/// Parse one line of the driver's command language.
///
/// ```text
/// scrub <raw> [offset] [fine] [vertical]
/// mark <in|out|audio|video> [seconds]
/// jump <in|out|audio|video>
/// align | clear | play | pause | toggle
/// mute <audio|video>
/// volume <audio|video> <0..1>
/// ```
pub fn parse_command(line: &str) -> AlignResult<InputCommand> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(invalid("empty command"));
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "scrub" => {
            let delta_raw = parse_number::<f64>(words.next(), "scrub delta")?;
            let mut modifiers = ScrubModifiers::default();
            let mut axis = ScrubAxis::Horizontal;
            for flag in words.by_ref() {
                match flag {
                    "offset" => modifiers.offset_mode = true,
                    "fine" => modifiers.fine_mode = true,
                    "vertical" => axis = ScrubAxis::Vertical,
                    other => return Err(invalid(format!("unknown scrub flag '{}'", other))),
                }
            }
            InputCommand::Scrub {
                delta_raw,
                axis,
                modifiers,
            }
        }
        "mark" => {
            let mark = words
                .next()
                .ok_or_else(|| invalid("missing mark id"))?
                .parse::<MarkId>()?;
            let value = match words.next() {
                Some(word) => Some(parse_number::<f64>(Some(word), "mark time")?),
                None => None,
            };
            InputCommand::SetMark(mark, value)
        }
        "jump" => {
            let mark = words
                .next()
                .ok_or_else(|| invalid("missing mark id"))?
                .parse::<MarkId>()?;
            InputCommand::JumpMark(mark)
        }
        "mute" => {
            let track = words
                .next()
                .ok_or_else(|| invalid("missing track"))?
                .parse::<Track>()?;
            InputCommand::ToggleMute(track)
        }
        "volume" => {
            let track = words
                .next()
                .ok_or_else(|| invalid("missing track"))?
                .parse::<Track>()?;
            let volume = parse_number::<f32>(words.next(), "volume")?;
            InputCommand::SetVolume(track, volume)
        }
        "align" => InputCommand::Align,
        "clear" => InputCommand::ClearMarks,
        "play" => InputCommand::Play,
        "pause" => InputCommand::Pause,
        "toggle" => InputCommand::PlayPause,
        other => return Err(invalid(format!("unknown command '{}'", other))),
    };

    if let Some(extra) = words.next() {
        return Err(invalid(format!("unexpected '{}'", extra)));
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scrub_with_modifiers() {
        let command = parse_command("scrub -240 offset fine").unwrap();
        assert_eq!(
            command,
            InputCommand::Scrub {
                delta_raw: -240.0,
                axis: ScrubAxis::Horizontal,
                modifiers: ScrubModifiers {
                    offset_mode: true,
                    fine_mode: true,
                },
            }
        );
    }

    #[test]
    fn test_parse_mark_at_cursor_and_explicit() {
        assert_eq!(
            parse_command("mark in").unwrap(),
            InputCommand::SetMark(MarkId::In, None)
        );
        assert_eq!(
            parse_command("mark video 3.2").unwrap(),
            InputCommand::SetMark(MarkId::Video, Some(3.2))
        );
    }

    #[test]
    fn test_parse_unknown_mark_is_invalid_mark() {
        let err = parse_command("jump middle").unwrap_err();
        assert!(matches!(err, AlignError::InvalidMark(ref id) if id == "middle"));
    }

    #[test]
    fn test_parse_transport_and_toggles() {
        assert_eq!(parse_command("toggle").unwrap(), InputCommand::PlayPause);
        assert_eq!(
            parse_command("mute audio").unwrap(),
            InputCommand::ToggleMute(Track::Audio)
        );
        assert_eq!(
            parse_command("volume video 0.5").unwrap(),
            InputCommand::SetVolume(Track::Video, 0.5)
        );
        assert_eq!("align".parse::<InputCommand>().unwrap(), InputCommand::Align);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_command("").is_err());
        assert!(parse_command("scrub").is_err());
        assert!(parse_command("scrub fast").is_err());
        assert!(parse_command("scrub 120 sideways").is_err());
        assert!(parse_command("align now").is_err());
        assert!(parse_command("rewind").is_err());
    }

    #[test]
    fn test_commands_that_pause() {
        assert!(InputCommand::Align.requires_pause());
        assert!(InputCommand::JumpMark(MarkId::In).requires_pause());
        assert!(!InputCommand::SetMark(MarkId::In, None).requires_pause());
        assert!(!InputCommand::ToggleMute(Track::Video).requires_pause());
    }
}
