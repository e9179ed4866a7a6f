//! Event-bus protocol shared by all runtime components.
//!
//! This module defines all message payloads exchanged between the playlist
//! controller, the playback engine adapter, the permission subsystem, the
//! lifecycle host, and the UI front.

use std::path::PathBuf;

use uuid::Uuid;

use crate::session::SessionSnapshot;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Control(ControlMessage),
    Ui(UiMessage),
    Engine(EngineMessage),
    Permission(PermissionMessage),
    Lifecycle(LifecycleMessage),
}

/// A storage/media capability the scan pipeline may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ReadAudio,
    ReadExternalStorage,
}

/// One rendered playlist row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    /// Name shown to the operator.
    pub display_name: String,
    /// Opaque open-locator, forwarded untouched to the playback engine.
    pub locator: PathBuf,
}

/// Operator commands from the UI front.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Re-scan the media store and rebuild the track list.
    Reload,
    /// Highlight a row without touching playback.
    Select(usize),
    /// Play a specific row from the beginning.
    Play(usize),
    /// Play whichever row is currently selected.
    PlaySelected,
    Stop,
    /// Replace the persisted scan filter.
    SetFilter(String),
    /// Ask for the diagnostic trace of the last scan.
    ShowScanTrace,
}

/// Render/notify instructions for the UI front.
#[derive(Debug, Clone)]
pub enum UiMessage {
    RenderList {
        tracks: Vec<TrackRow>,
        selected_index: Option<usize>,
        playing_index: Option<usize>,
    },
    ScrollTo(usize),
    ShowMessage(String),
    /// The pending permission request needs an operator-facing explanation
    /// before it may be dispatched.
    ShowPermissionRationale(Vec<Capability>),
    ShowScanTrace(Vec<String>),
}

/// Asynchronous signals from the playback engine adapter.
///
/// The generation tags the `open` call that produced the signal; the
/// controller discards signals whose generation has been superseded.
#[derive(Debug, Clone, Copy)]
pub enum EngineMessage {
    Finished { generation: u64 },
    Failed { generation: u64, code: i32 },
}

/// Permission subsystem results and rationale-prompt outcomes.
#[derive(Debug, Clone)]
pub enum PermissionMessage {
    RationaleAccepted,
    RationaleDismissed,
    GrantResult {
        request_id: Uuid,
        results: Vec<bool>,
    },
}

/// Host-lifecycle notifications.
#[derive(Debug, Clone)]
pub enum LifecycleMessage {
    /// Screen is being backgrounded; playback pauses but stays loaded.
    Pause,
    /// Screen is foregrounded again; paused playback resumes.
    Resume,
    /// Snapshot selection/playback state before possible teardown.
    SaveState,
    /// Apply a snapshot once the next reload has produced a fresh list.
    RestoreState(SessionSnapshot),
    /// Tear down the engine and exit the controller loop.
    Shutdown,
}
