//! State management module
//!
//! Data structures for an alignment session:
//! - TimelineState: cursor, offset, rate, marks and output flags
//! - TimelineStateRecord: the flat form exchanged with the state store
//! - Session: the owned holder of the live state
//! - Settings: per-project configuration

mod record;
mod session;
mod settings;
mod timeline;

pub use record::{TimelineStateRecord, UNSET_MARK};
pub use session::Session;
pub use settings::{app_cache_root, Settings};
pub use timeline::{normalize_mark, MarkId, Marks, MediaSources, TimelineState, Track};

#[cfg(test)]
pub(crate) use timeline::test_sources;
