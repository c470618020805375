//! Central error type for the alignment engine.

use thiserror::Error;

/// Every failure the engine can surface.
#[derive(Error, Debug)]
pub enum AlignError {
    /// A state was constructed without one of its required fields.
    #[error("Missing {field} in construction")]
    MissingField { field: &'static str },

    /// A field was present but holds a value the timeline cannot use.
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Mark identifier outside `in`, `out`, `audio`, `video`.
    #[error("Unknown mark '{0}' (expected one of in, out, audio, video)")]
    InvalidMark(String),

    /// Decode, probe or proxy preparation failed.
    #[error("Media load failed: {0}")]
    MediaLoad(String),

    /// The state store could not be read or written.
    #[error("State transport failed: {0}")]
    Transport(String),

    /// `videotools.json` could not be read or parsed.
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// The store moved on since this side last pulled or pushed.
    #[error("Stale push rejected: based on revision {expected}, store is at revision {found}")]
    StalePush { expected: u64, found: u64 },
}

impl AlignError {
    pub fn media(err: impl std::fmt::Display) -> Self {
        AlignError::MediaLoad(err.to_string())
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        AlignError::Transport(err.to_string())
    }

    /// Whether the operator can act on the error and carry on editing.
    ///
    /// Construction and mark-id errors are contract violations in the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AlignError::MediaLoad(_) | AlignError::Transport(_) | AlignError::StalePush { .. }
        )
    }
}

pub type AlignResult<T> = Result<T, AlignError>;
