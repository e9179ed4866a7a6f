//! Session state codec: the three-integer snapshot that lets selection and
//! playback survive process teardown.

use std::path::PathBuf;

use log::{error, warn};

/// In-memory snapshot of the controller's restorable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub selected_index: Option<usize>,
    pub playing_index: Option<usize>,
    pub position_ms: u64,
}

/// On-disk form. Indices use `-1` for "none"; the whole snapshot is exactly
/// three integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SavedSession {
    pub selected_index: i64,
    pub playing_index: i64,
    pub position_ms: i64,
}

fn index_to_wire(index: Option<usize>) -> i64 {
    index.map_or(-1, |value| value as i64)
}

fn index_from_wire(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

impl From<SessionSnapshot> for SavedSession {
    fn from(snapshot: SessionSnapshot) -> SavedSession {
        SavedSession {
            selected_index: index_to_wire(snapshot.selected_index),
            playing_index: index_to_wire(snapshot.playing_index),
            position_ms: snapshot.position_ms as i64,
        }
    }
}

impl From<SavedSession> for SessionSnapshot {
    fn from(saved: SavedSession) -> SessionSnapshot {
        SessionSnapshot {
            selected_index: index_from_wire(saved.selected_index),
            playing_index: index_from_wire(saved.playing_index),
            position_ms: u64::try_from(saved.position_ms).unwrap_or(0),
        }
    }
}

/// Persists the snapshot beside the config file. A `None` path keeps the
/// snapshot in memory only, which is what tests use.
pub struct SessionStore {
    path: Option<PathBuf>,
    memory: Option<SavedSession>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> SessionStore {
        SessionStore {
            path: Some(path),
            memory: None,
        }
    }

    pub fn in_memory() -> SessionStore {
        SessionStore {
            path: None,
            memory: None,
        }
    }

    /// Best-effort load. Missing file means no saved session; a corrupt file
    /// is discarded with a warning.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let Some(path) = self.path.as_ref() else {
            return self.memory.map(SessionSnapshot::from);
        };

        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<SavedSession>(&content) {
            Ok(saved) => Some(SessionSnapshot::from(saved)),
            Err(err) => {
                warn!("Discarding corrupt session file {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Write the snapshot. Failures are logged, never fatal: losing a
    /// session is an inconvenience, not an error the operator can act on.
    pub fn save(&mut self, snapshot: SessionSnapshot) {
        let saved = SavedSession::from(snapshot);

        let Some(path) = self.path.as_ref() else {
            self.memory = Some(saved);
            return;
        };

        let serialized = match toml::to_string(&saved) {
            Ok(serialized) => serialized,
            Err(err) => {
                error!("Failed to serialize session: {}", err);
                return;
            }
        };
        if let Err(err) = std::fs::write(path, serialized) {
            error!("Failed to persist session to {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_uses_minus_one_for_none() {
        let saved = SavedSession::from(SessionSnapshot {
            selected_index: None,
            playing_index: Some(3),
            position_ms: 1_500,
        });

        assert_eq!(saved.selected_index, -1);
        assert_eq!(saved.playing_index, 3);
        assert_eq!(saved.position_ms, 1_500);
    }

    #[test]
    fn test_snapshot_round_trips_through_wire_form() {
        let snapshot = SessionSnapshot {
            selected_index: Some(2),
            playing_index: None,
            position_ms: 42,
        };

        let round_tripped = SessionSnapshot::from(SavedSession::from(snapshot));

        assert_eq!(round_tripped, snapshot);
    }

    #[test]
    fn test_negative_wire_values_map_to_none() {
        let snapshot = SessionSnapshot::from(SavedSession {
            selected_index: -1,
            playing_index: -7,
            position_ms: -10,
        });

        assert_eq!(snapshot.selected_index, None);
        assert_eq!(snapshot.playing_index, None);
        assert_eq!(snapshot.position_ms, 0);
    }

    #[test]
    fn test_in_memory_store_round_trips() {
        let mut store = SessionStore::in_memory();
        assert_eq!(store.load(), None);

        let snapshot = SessionSnapshot {
            selected_index: Some(1),
            playing_index: Some(1),
            position_ms: 1_000,
        };
        store.save(snapshot);

        assert_eq!(store.load(), Some(snapshot));
    }
}
