//! Storage scan pipeline: enumerate candidate audio files from the media
//! store, apply the operator's substring filter, and produce a sorted track
//! list for the controller.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use thiserror::Error;

use crate::playlist::{Track, TrackList};

pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 7] =
    ["mp3", "wav", "ogg", "flac", "aac", "m4a", "mp4"];

/// Candidates considered per scan kept for operator-visible debugging.
const TRACE_CAPACITY: usize = 512;

#[derive(Debug, Error)]
pub enum ScanError {
    /// The underlying media index could not be opened. The previous track
    /// list must be left untouched.
    #[error("media index unavailable: {0}")]
    Unavailable(String),
}

/// One entry read from the platform media index before filtering.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub display_name: String,
    pub locator: PathBuf,
}

/// Boundary to the device-managed media store.
pub trait MediaIndex {
    fn query_audio(&self) -> Result<Vec<Candidate>, ScanError>;
}

/// Media index backed by a folder on the local filesystem.
pub struct FsMediaIndex {
    root: PathBuf,
}

impl FsMediaIndex {
    pub fn new(root: PathBuf) -> FsMediaIndex {
        FsMediaIndex { root }
    }
}

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

impl MediaIndex for FsMediaIndex {
    fn query_audio(&self) -> Result<Vec<Candidate>, ScanError> {
        let root_entries = std::fs::read_dir(&self.root)
            .map_err(|err| ScanError::Unavailable(format!("{}: {}", self.root.display(), err)))?;

        let mut pending_directories = Vec::new();
        let mut candidates = Vec::new();

        let visit = |entries: std::fs::ReadDir,
                         pending: &mut Vec<PathBuf>,
                         candidates: &mut Vec<Candidate>| {
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        debug!("Failed to read a directory entry: {}", err);
                        continue;
                    }
                };

                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }

                if is_supported_audio_file(&path) {
                    let display_name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default();
                    candidates.push(Candidate {
                        display_name,
                        locator: path,
                    });
                }
            }
        };

        visit(root_entries, &mut pending_directories, &mut candidates);

        // Subdirectories below the root are best-effort: an unreadable one
        // is skipped, not a scan failure.
        while let Some(directory) = pending_directories.pop() {
            match std::fs::read_dir(&directory) {
                Ok(entries) => visit(entries, &mut pending_directories, &mut candidates),
                Err(err) => {
                    debug!("Failed to read directory {}: {}", directory.display(), err);
                }
            }
        }

        Ok(candidates)
    }
}

/// Enumerate-and-filter front of the media index.
pub struct TrackSource<M: MediaIndex> {
    index: M,
    scan_trace: VecDeque<String>,
}

impl<M: MediaIndex> TrackSource<M> {
    pub fn new(index: M) -> TrackSource<M> {
        TrackSource {
            index,
            scan_trace: VecDeque::new(),
        }
    }

    /// Run one scan. A candidate is included iff its display name contains
    /// at least one of `filter_terms` as a literal substring; an empty term
    /// list includes everything.
    pub fn scan(&mut self, filter_terms: &[String]) -> Result<TrackList, ScanError> {
        let candidates = self.index.query_audio()?;
        self.scan_trace.clear();

        let mut matched = Vec::new();
        for candidate in candidates {
            let included = filter_terms.is_empty()
                || filter_terms
                    .iter()
                    .any(|term| candidate.display_name.contains(term.as_str()));
            self.record_trace(&candidate.display_name, included);
            if included {
                matched.push(Track {
                    display_name: candidate.display_name,
                    locator: candidate.locator,
                });
            }
        }

        debug!(
            "Scan complete: {} matched, filter={:?}",
            matched.len(),
            filter_terms
        );
        Ok(TrackList::build(matched))
    }

    /// Diagnostic trace of the most recent scan, oldest entry first.
    pub fn trace(&self) -> Vec<String> {
        self.scan_trace.iter().cloned().collect()
    }

    fn record_trace(&mut self, display_name: &str, included: bool) {
        let line = format!(
            "{}: {}",
            display_name,
            if included { "match" } else { "skip" }
        );
        trace!("{}", line);
        if self.scan_trace.len() == TRACE_CAPACITY {
            self.scan_trace.pop_front();
        }
        self.scan_trace.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedIndex {
        names: Vec<&'static str>,
        unavailable: bool,
    }

    impl MediaIndex for FixedIndex {
        fn query_audio(&self) -> Result<Vec<Candidate>, ScanError> {
            if self.unavailable {
                return Err(ScanError::Unavailable("no media store".to_string()));
            }
            Ok(self
                .names
                .iter()
                .map(|name| Candidate {
                    display_name: name.to_string(),
                    locator: PathBuf::from(format!("/media/{}", name)),
                })
                .collect())
        }
    }

    fn source(names: Vec<&'static str>) -> TrackSource<FixedIndex> {
        TrackSource::new(FixedIndex {
            names,
            unavailable: false,
        })
    }

    #[test]
    fn test_scan_filters_by_literal_substring_or_match() {
        let mut source = source(vec!["a.wav", "b.mp3", "ab.wav"]);

        let list = source.scan(&["wav".to_string()]).expect("scan should succeed");

        let names: Vec<String> = list
            .rows()
            .into_iter()
            .map(|row| row.display_name)
            .collect();
        assert_eq!(names, vec!["a.wav", "ab.wav"]);
    }

    #[test]
    fn test_scan_with_no_terms_includes_everything() {
        let mut source = source(vec!["b.mp3", "a.wav"]);

        let list = source.scan(&[]).expect("scan should succeed");

        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0).unwrap().display_name, "a.wav");
    }

    #[test]
    fn test_scan_filter_is_case_sensitive() {
        let mut source = source(vec!["Intro.WAV", "intro.wav"]);

        let list = source.scan(&["wav".to_string()]).expect("scan should succeed");

        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().display_name, "intro.wav");
    }

    #[test]
    fn test_scan_trace_records_every_candidate() {
        let mut source = source(vec!["a.wav", "b.mp3"]);

        source.scan(&["wav".to_string()]).expect("scan should succeed");

        assert_eq!(
            source.trace(),
            vec!["a.wav: match".to_string(), "b.mp3: skip".to_string()]
        );
    }

    #[test]
    fn test_unavailable_index_is_reported() {
        let mut source = TrackSource::new(FixedIndex {
            names: vec![],
            unavailable: true,
        });

        let result = source.scan(&[]);

        assert!(matches!(result, Err(ScanError::Unavailable(_))));
    }

    #[test]
    fn test_supported_extension_gate_ignores_case() {
        assert!(is_supported_audio_file(Path::new("/media/a.WAV")));
        assert!(is_supported_audio_file(Path::new("/media/b.flac")));
        assert!(!is_supported_audio_file(Path::new("/media/readme.txt")));
        assert!(!is_supported_audio_file(Path::new("/media/no_extension")));
    }
}
