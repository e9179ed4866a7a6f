use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::protocol::TrackRow;

/// One playable audio item produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub display_name: String,
    /// Opaque open-locator. The controller never interprets it, only hands
    /// it to the playback engine.
    pub locator: PathBuf,
}

/// The ordered track list owned by the playlist controller.
///
/// Unique by locator, sorted by display name ascending (byte order). Rebuilt
/// wholesale on every reload, never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    pub fn empty() -> TrackList {
        TrackList { tracks: Vec::new() }
    }

    /// Build a list from scan candidates: drop duplicate locators (first
    /// occurrence wins), then sort by display name.
    pub fn build(candidates: Vec<Track>) -> TrackList {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut tracks: Vec<Track> = candidates
            .into_iter()
            .filter(|track| seen.insert(track.locator.clone()))
            .collect();
        tracks.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        TrackList { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn locator(&self, index: usize) -> Option<&Path> {
        self.tracks.get(index).map(|track| track.locator.as_path())
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.tracks.len()
    }

    /// Rows for a full re-render.
    pub fn rows(&self) -> Vec<TrackRow> {
        self.tracks
            .iter()
            .map(|track| TrackRow {
                display_name: track.display_name.clone(),
                locator: track.locator.clone(),
            })
            .collect()
    }
}
