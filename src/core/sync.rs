//! Push/pull boundary between the live state and the external store.
//!
//! Last writer wins, but every snapshot carries a revision and a push must
//! name the revision it was based on. A store that moved on in the meantime
//! rejects the push with `StalePush` instead of silently losing the other
//! side's edit.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AlignError, AlignResult};
use crate::state::{TimelineState, TimelineStateRecord};

/// What the store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Starts at 1 for the first push; an empty store is revision 0
    pub revision: u64,
    /// Session that wrote this snapshot
    pub writer: Uuid,
    pub saved_at: DateTime<Utc>,
    pub state: TimelineStateRecord,
}

/// Where snapshots live. Implementations must compare revisions and write
/// as one step from the engine's point of view.
pub trait StateTransport {
    fn pull(&mut self) -> AlignResult<Option<StoredSnapshot>>;
    /// Replace the stored snapshot if the store is still at `base_revision`.
    fn push(&mut self, snapshot: StoredSnapshot, base_revision: u64) -> AlignResult<()>;
}

fn check_base(current: Option<&StoredSnapshot>, base_revision: u64) -> AlignResult<()> {
    let found = current.map_or(0, |snapshot| snapshot.revision);
    if found != base_revision {
        return Err(AlignError::StalePush {
            expected: base_revision,
            found,
        });
    }
    Ok(())
}

/// In-process store. Clones share one slot, standing in for two processes.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    slot: Rc<RefCell<Option<StoredSnapshot>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<StoredSnapshot> {
        self.slot.borrow().clone()
    }
}

impl StateTransport for MemoryTransport {
    fn pull(&mut self) -> AlignResult<Option<StoredSnapshot>> {
        Ok(self.slot.borrow().clone())
    }

    fn push(&mut self, snapshot: StoredSnapshot, base_revision: u64) -> AlignResult<()> {
        let mut slot = self.slot.borrow_mut();
        check_base(slot.as_ref(), base_revision)?;
        *slot = Some(snapshot);
        Ok(())
    }
}

/// Snapshot kept as pretty JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonFileTransport {
    path: PathBuf,
}

impl JsonFileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateTransport for JsonFileTransport {
    fn pull(&mut self) -> AlignResult<Option<StoredSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path).map_err(AlignError::transport)?;
        let snapshot = serde_json::from_str(&json).map_err(AlignError::transport)?;
        Ok(Some(snapshot))
    }

    fn push(&mut self, snapshot: StoredSnapshot, base_revision: u64) -> AlignResult<()> {
        let current = self.pull()?;
        check_base(current.as_ref(), base_revision)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(AlignError::transport)?;
        }
        let json = serde_json::to_string_pretty(&snapshot).map_err(AlignError::transport)?;
        // Write beside the target and rename so readers never see half a file.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(AlignError::transport)?;
        fs::rename(&staging, &self.path).map_err(AlignError::transport)?;
        Ok(())
    }
}

/// One side's view of the store.
pub struct StateSync<T: StateTransport> {
    transport: T,
    writer: Uuid,
    /// Revision this side last saw in the store
    revision: u64,
    last_pushed: Option<TimelineStateRecord>,
}

impl<T: StateTransport> StateSync<T> {
    pub fn new(transport: T, writer: Uuid) -> Self {
        Self {
            transport,
            writer,
            revision: 0,
            last_pushed: None,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Latest stored state, or `None` for an empty store.
    ///
    /// A stored record with holes is refused with `MissingField`.
    pub fn pull(&mut self) -> AlignResult<Option<TimelineState>> {
        let Some(snapshot) = self.transport.pull()? else {
            return Ok(None);
        };
        let state = TimelineState::try_from(snapshot.state.clone())?;
        log::debug!(
            "[SYNC] Pulled revision {} written by {}",
            snapshot.revision,
            snapshot.writer
        );
        self.revision = snapshot.revision;
        self.last_pushed = Some(snapshot.state);
        Ok(Some(state))
    }

    /// Replace the stored state. Pushing an unchanged state writes nothing.
    ///
    /// On failure the caller's in-memory state stays authoritative.
    pub fn push(&mut self, state: &TimelineState) -> AlignResult<u64> {
        let record = state.to_record();
        if self.last_pushed.as_ref() == Some(&record) {
            return Ok(self.revision);
        }

        let snapshot = StoredSnapshot {
            revision: self.revision + 1,
            writer: self.writer,
            saved_at: Utc::now(),
            state: record.clone(),
        };
        if let Err(err) = self.transport.push(snapshot, self.revision) {
            log::warn!("[SYNC] Push failed: {}", err);
            return Err(err);
        }
        self.revision += 1;
        self.last_pushed = Some(record);
        log::debug!("[SYNC] Pushed revision {}", self.revision);
        Ok(self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{test_sources, MarkId};

    fn state(cursor: f64) -> TimelineState {
        TimelineState::new(test_sources()).with_cursor(cursor)
    }

    #[test]
    fn test_pull_from_empty_store() {
        let mut sync = StateSync::new(MemoryTransport::new(), Uuid::new_v4());
        assert!(sync.pull().unwrap().is_none());
        assert_eq!(sync.revision(), 0);
    }

    #[test]
    fn test_push_then_pull_round_trips() {
        let store = MemoryTransport::new();
        let mut writer = StateSync::new(store.clone(), Uuid::new_v4());
        let mut reader = StateSync::new(store, Uuid::new_v4());

        let pushed = state(-3.5).with_mark(MarkId::Video, Some(2.0));
        assert_eq!(writer.push(&pushed).unwrap(), 1);
        let pulled = reader.pull().unwrap().unwrap();
        assert_eq!(pulled, pushed);
        assert_eq!(reader.revision(), 1);
    }

    #[test]
    fn test_unchanged_push_is_idempotent() {
        let store = MemoryTransport::new();
        let mut sync = StateSync::new(store.clone(), Uuid::new_v4());
        sync.push(&state(1.0)).unwrap();
        let first = store.snapshot().unwrap();
        assert_eq!(sync.push(&state(1.0)).unwrap(), 1);
        assert_eq!(store.snapshot().unwrap(), first);
    }

    #[test]
    fn test_stale_push_is_rejected() {
        let store = MemoryTransport::new();
        let mut a = StateSync::new(store.clone(), Uuid::new_v4());
        let mut b = StateSync::new(store.clone(), Uuid::new_v4());
        a.push(&state(1.0)).unwrap();
        b.pull().unwrap();

        a.push(&state(2.0)).unwrap();
        let err = b.push(&state(9.0)).unwrap_err();
        assert!(matches!(err, AlignError::StalePush { expected: 1, found: 2 }));
        assert_eq!(b.revision(), 1);

        let stored = TimelineState::try_from(store.snapshot().unwrap().state).unwrap();
        assert_eq!(stored.cursor(), 2.0);

        b.pull().unwrap();
        assert_eq!(b.push(&state(9.0)).unwrap(), 3);
    }

    #[test]
    fn test_pull_rejects_incomplete_record() {
        let store = MemoryTransport::new();
        let mut record = state(0.0).to_record();
        record.video_rate = None;
        store
            .clone()
            .push(
                StoredSnapshot {
                    revision: 1,
                    writer: Uuid::new_v4(),
                    saved_at: Utc::now(),
                    state: record,
                },
                0,
            )
            .unwrap();

        let mut sync = StateSync::new(store, Uuid::new_v4());
        let err = sync.pull().unwrap_err();
        assert!(matches!(err, AlignError::MissingField { field: "video_rate" }));
        assert_eq!(sync.revision(), 0);
    }

    #[test]
    fn test_json_file_transport() {
        let dir = std::env::temp_dir().join(format!("videotools-sync-{}", Uuid::new_v4()));
        let path = dir.join("nested").join("state.json");
        let mut a = StateSync::new(JsonFileTransport::new(&path), Uuid::new_v4());
        let mut b = StateSync::new(JsonFileTransport::new(&path), Uuid::new_v4());

        assert!(b.pull().unwrap().is_none());
        let pushed = state(-1.25).with_video_offset(0.75);
        a.push(&pushed).unwrap();
        assert!(path.exists());
        assert_eq!(b.pull().unwrap().unwrap(), pushed);

        a.push(&state(4.0)).unwrap();
        assert!(matches!(
            b.push(&state(5.0)),
            Err(AlignError::StalePush { expected: 1, found: 2 })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_is_transport_error() {
        let dir = std::env::temp_dir().join(format!("videotools-sync-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let mut sync = StateSync::new(JsonFileTransport::new(&path), Uuid::new_v4());
        assert!(matches!(sync.pull(), Err(AlignError::Transport(_))));
        let _ = fs::remove_dir_all(&dir);
    }
}
