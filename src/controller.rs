//! Playlist controller: owns the track list and the selection/playback state
//! machine, and orchestrates reload, play, stop, completion-advance, and
//! session save/restore.
//!
//! The controller runs single-threaded over one bus receiver; every state
//! transition happens inside [`PlaylistController::handle_message`]. Engine
//! signals and permission grant results arrive on the same bus and are
//! therefore ordinary sequential events.

use std::path::PathBuf;

use log::{debug, error, info, warn};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

use crate::{
    config::Config,
    config_persistence,
    engine::{EngineError, PlaybackEngine},
    permission::{GateDecision, GateOutcome, PermissionGate, PermissionHost},
    playlist::TrackList,
    protocol::{
        Capability, ControlMessage, EngineMessage, LifecycleMessage, Message, PermissionMessage,
        UiMessage,
    },
    session::{SessionSnapshot, SessionStore},
    track_source::{MediaIndex, ScanError, TrackSource},
};

/// Capabilities the scan pipeline needs from the platform.
const SCAN_CAPABILITIES: [Capability; 2] =
    [Capability::ReadAudio, Capability::ReadExternalStorage];

/// Playback half of the state machine. The playing index only exists while a
/// handle is open, so a playing marker into an empty list is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Stopped,
    Active {
        index: usize,
        generation: u64,
        /// Paused for backgrounding; still "playing" for bookkeeping.
        paused: bool,
    },
}

pub struct PlaylistController<E, M, H>
where
    E: PlaybackEngine,
    M: MediaIndex,
    H: PermissionHost,
{
    tracks: TrackList,
    selected: Option<usize>,
    playback: Playback,
    /// Bumped on every `open`; engine signals carrying an older generation
    /// belong to a superseded handle and are discarded.
    generation: u64,
    /// A reload is waiting on a permission grant.
    pending_reload: bool,
    /// Applied once, after the next successful list swap.
    pending_restore: Option<SessionSnapshot>,
    engine: E,
    source: TrackSource<M>,
    gate: PermissionGate<H>,
    session_store: SessionStore,
    config: Config,
    config_path: Option<PathBuf>,
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
}

impl<E, M, H> PlaylistController<E, M, H>
where
    E: PlaybackEngine,
    M: MediaIndex,
    H: PermissionHost,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: E,
        source: TrackSource<M>,
        gate: PermissionGate<H>,
        session_store: SessionStore,
        config: Config,
        config_path: Option<PathBuf>,
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
    ) -> Self {
        Self {
            tracks: TrackList::empty(),
            selected: None,
            playback: Playback::Stopped,
            generation: 0,
            pending_reload: false,
            pending_restore: None,
            engine,
            source,
            gate,
            session_store,
            config,
            config_path,
            bus_consumer,
            bus_producer,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(message) => {
                    if !self.handle_message(message) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Controller lagged, skipped {} bus messages", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Controller loop exited");
    }

    /// Process one bus message. Returns false when the loop should exit.
    fn handle_message(&mut self, message: Message) -> bool {
        match message {
            Message::Control(control) => self.handle_control(control),
            Message::Engine(EngineMessage::Finished { generation }) => {
                self.on_finished(generation)
            }
            Message::Engine(EngineMessage::Failed { generation, code }) => {
                self.on_failed(generation, code)
            }
            Message::Permission(permission) => self.handle_permission(permission),
            Message::Lifecycle(lifecycle) => return self.handle_lifecycle(lifecycle),
            // Our own render/notify instructions echo back on the broadcast
            // bus; they are for the front, not for us.
            Message::Ui(_) => {}
        }
        true
    }

    fn handle_control(&mut self, control: ControlMessage) {
        match control {
            ControlMessage::Reload => self.reload(),
            ControlMessage::Select(index) => self.select(index),
            ControlMessage::Play(index) => self.play(index, 0),
            ControlMessage::PlaySelected => match self.selected {
                Some(index) => self.play(index, 0),
                None => debug!("PlaySelected with nothing selected"),
            },
            ControlMessage::Stop => self.stop(),
            ControlMessage::SetFilter(filter) => self.set_filter(filter),
            ControlMessage::ShowScanTrace => {
                self.send_ui(UiMessage::ShowScanTrace(self.source.trace()));
            }
        }
    }

    fn handle_permission(&mut self, permission: PermissionMessage) {
        match permission {
            PermissionMessage::RationaleAccepted => self.gate.confirm_rationale(),
            PermissionMessage::RationaleDismissed => {
                self.gate.cancel_rationale();
                self.pending_reload = false;
            }
            PermissionMessage::GrantResult {
                request_id,
                results,
            } => match self.gate.on_grant_result(request_id, &results) {
                GateOutcome::AllGranted => {
                    if self.pending_reload {
                        self.pending_reload = false;
                        self.scan_and_swap();
                    }
                }
                GateOutcome::Denied => {
                    self.pending_reload = false;
                    self.show_message("storage permission denied");
                }
                GateOutcome::Stale => {}
            },
        }
    }

    fn handle_lifecycle(&mut self, lifecycle: LifecycleMessage) -> bool {
        match lifecycle {
            LifecycleMessage::Pause => {
                if let Playback::Active { paused: false, .. } = self.playback {
                    self.engine.pause();
                    self.set_paused(true);
                }
            }
            LifecycleMessage::Resume => {
                if let Playback::Active { paused: true, .. } = self.playback {
                    self.engine.start();
                    self.set_paused(false);
                }
            }
            LifecycleMessage::SaveState => self.save_state(),
            LifecycleMessage::RestoreState(snapshot) => {
                debug!("Snapshot queued for restore: {:?}", snapshot);
                self.pending_restore = Some(snapshot);
            }
            LifecycleMessage::Shutdown => {
                self.dispose();
                return false;
            }
        }
        true
    }

    /// Rescan the media store and rebuild the track list, gated on the
    /// required storage capabilities.
    fn reload(&mut self) {
        if self.stop_engine() {
            self.render();
        }

        match self.gate.ensure(&SCAN_CAPABILITIES) {
            GateDecision::Granted => self.scan_and_swap(),
            GateDecision::PendingRequest(request_id) => {
                debug!("Reload waiting on permission request {}", request_id);
                self.pending_reload = true;
            }
            GateDecision::PendingWithRationale(request_id) => {
                debug!("Reload waiting on rationale for request {}", request_id);
                self.pending_reload = true;
                let capabilities = self.gate.rationale_capabilities().unwrap_or_default();
                self.send_ui(UiMessage::ShowPermissionRationale(capabilities));
            }
        }
    }

    fn scan_and_swap(&mut self) {
        let terms = self.config.filter_terms();
        match self.source.scan(&terms) {
            Ok(list) => self.apply_track_list(list),
            Err(ScanError::Unavailable(reason)) => {
                warn!("Scan failed, keeping previous track list: {}", reason);
                self.show_message("media store unavailable");
            }
        }
    }

    /// Swap in a freshly scanned list and recompute both indices as one
    /// atomic transition. Stale indices are never carried across the swap.
    fn apply_track_list(&mut self, list: TrackList) {
        info!("Track list rebuilt: {} tracks", list.len());
        self.tracks = list;
        self.selected = if self.tracks.is_empty() { None } else { Some(0) };
        self.playback = Playback::Stopped;
        self.render();
        if let Some(selected) = self.selected {
            self.scroll_to(selected);
        }

        if let Some(snapshot) = self.pending_restore.take() {
            self.apply_restore(snapshot);
        }
    }

    /// Best-effort restore against the freshly built list: parts of the
    /// snapshot that no longer fit are dropped, not errored.
    fn apply_restore(&mut self, snapshot: SessionSnapshot) {
        if let Some(index) = snapshot.selected_index {
            if self.tracks.contains_index(index) {
                self.select(index);
            } else {
                debug!("Dropping saved selection {}: out of range", index);
            }
        }
        if let Some(index) = snapshot.playing_index {
            if self.tracks.contains_index(index) {
                self.play(index, snapshot.position_ms);
            } else {
                debug!("Dropping saved playback {}: out of range", index);
            }
        }
    }

    /// Highlight a row. Playback is untouched.
    fn select(&mut self, index: usize) {
        if !self.tracks.contains_index(index) {
            debug!("select: index {} out of bounds", index);
            return;
        }
        self.selected = Some(index);
        self.render();
        self.scroll_to(index);
    }

    fn play(&mut self, index: usize, start_offset_ms: u64) {
        if !self.tracks.contains_index(index) {
            debug!("play: index {} out of bounds", index);
            return;
        }

        self.stop_engine();
        self.generation += 1;
        let generation = self.generation;

        let Some(locator) = self.tracks.locator(index) else {
            return;
        };
        match self.engine.open(locator, generation) {
            Ok(()) => {
                self.engine.seek(start_offset_ms);
                self.engine.start();
                self.playback = Playback::Active {
                    index,
                    generation,
                    paused: false,
                };
                self.render();
            }
            Err(err) => {
                error!("Failed to open track {}: {}", index, err);
                self.render();
                self.show_message("play error");
            }
        }
    }

    /// Stop playback. Idempotent; re-renders even when nothing was playing.
    fn stop(&mut self) {
        self.stop_engine();
        self.render();
    }

    /// Release the engine handle if one is open. Returns whether playback
    /// state changed.
    fn stop_engine(&mut self) -> bool {
        match self.playback {
            Playback::Active { .. } => {
                self.engine.release();
                self.playback = Playback::Stopped;
                true
            }
            Playback::Stopped => false,
        }
    }

    /// Completion signal: advance the selection to the next row (wrapping),
    /// but do not auto-play it.
    fn on_finished(&mut self, signal_generation: u64) {
        let Playback::Active {
            index, generation, ..
        } = self.playback
        else {
            debug!("Discarding completion signal with nothing playing");
            return;
        };
        if generation != signal_generation {
            debug!(
                "Discarding stale completion signal (generation {} < {})",
                signal_generation, generation
            );
            return;
        }

        let next = (index + 1) % self.tracks.len();
        self.playback = Playback::Stopped;
        self.selected = Some(next);
        self.render();
        self.scroll_to(next);
    }

    /// Error signal: the platform has already invalidated the handle, so no
    /// `release` here.
    fn on_failed(&mut self, signal_generation: u64, code: i32) {
        let Playback::Active { generation, .. } = self.playback else {
            debug!("Discarding error signal with nothing playing");
            return;
        };
        if generation != signal_generation {
            debug!(
                "Discarding stale error signal (generation {} < {})",
                signal_generation, generation
            );
            return;
        }

        error!("Playback engine failed: {}", EngineError::Runtime(code));
        self.playback = Playback::Stopped;
        self.render();
        self.show_message("play error");
    }

    fn save_state(&mut self) {
        let (playing_index, position_ms) = match self.playback {
            Playback::Active { index, .. } => (Some(index), self.engine.position_ms()),
            Playback::Stopped => (None, 0),
        };
        let snapshot = SessionSnapshot {
            selected_index: self.selected,
            playing_index,
            position_ms,
        };
        info!("Saving session snapshot: {:?}", snapshot);
        self.session_store.save(snapshot);
    }

    /// Tear down the engine. The one path that does not reset the playback
    /// bookkeeping: the process may be going away with it.
    fn dispose(&mut self) {
        self.engine.release();
    }

    fn set_filter(&mut self, filter: String) {
        info!("Filter changed to {:?}", filter);
        self.config.filter = filter;
        if let Some(path) = self.config_path.clone() {
            config_persistence::persist_config_file(&self.config, &path);
        }
    }

    fn set_paused(&mut self, value: bool) {
        if let Playback::Active { paused, .. } = &mut self.playback {
            *paused = value;
        }
    }

    fn playing_index(&self) -> Option<usize> {
        match self.playback {
            Playback::Active { index, .. } => Some(index),
            Playback::Stopped => None,
        }
    }

    fn render(&self) {
        self.send_ui(UiMessage::RenderList {
            tracks: self.tracks.rows(),
            selected_index: self.selected,
            playing_index: self.playing_index(),
        });
    }

    fn scroll_to(&self, index: usize) {
        self.send_ui(UiMessage::ScrollTo(index));
    }

    fn show_message(&self, text: &str) {
        self.send_ui(UiMessage::ShowMessage(text.to_string()));
    }

    fn send_ui(&self, message: UiMessage) {
        let _ = self.bus_producer.send(Message::Ui(message));
    }
}
