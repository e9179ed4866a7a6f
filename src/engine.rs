//! Playback engine adapter boundary.
//!
//! The controller treats playback as an opaque transport: it opens a locator,
//! seeks, starts, pauses, and releases, and receives completion/error signals
//! back over the bus. Exactly one platform handle is live at any instant and
//! the engine owns it; `open` implicitly releases a previous handle.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;
use tokio::sync::broadcast::Sender;

use crate::protocol::{EngineMessage, Message};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open {0}")]
    OpenFailed(String),
    /// Asynchronous engine failure, reported through the error signal.
    #[error("playback engine error code {0}")]
    Runtime(i32),
}

/// Narrow contract over the platform media-playback primitive.
///
/// Calls are fire-and-forget from the controller's point of view. Signals
/// for the handle opened with a given generation arrive on the bus as
/// [`EngineMessage`]s tagged with that generation. Generations handed to
/// `open` are always non-zero.
pub trait PlaybackEngine {
    fn open(&mut self, locator: &Path, generation: u64) -> Result<(), EngineError>;
    fn seek(&mut self, position_ms: u64);
    fn start(&mut self);
    fn pause(&mut self);
    /// Idempotent; always safe, even with no handle open.
    fn release(&mut self);
    /// Queried only while a handle is live.
    fn position_ms(&self) -> u64;
}

/// Transport stand-in used by the console shell: logs every call and keeps a
/// nominal position so save/restore is observable without audio hardware.
///
/// It never signals completion on its own; the shell injects completion and
/// error signals for the currently open handle through an [`EngineProbe`].
pub struct NullEngine {
    bus_producer: Sender<Message>,
    /// Generation of the open handle; 0 means none.
    open_generation: Arc<AtomicU64>,
    position_ms: u64,
}

/// Shell-side handle that stands in for the platform delivering asynchronous
/// engine signals.
#[derive(Clone)]
pub struct EngineProbe {
    bus_producer: Sender<Message>,
    open_generation: Arc<AtomicU64>,
}

impl NullEngine {
    pub fn new(bus_producer: Sender<Message>) -> NullEngine {
        NullEngine {
            bus_producer,
            open_generation: Arc::new(AtomicU64::new(0)),
            position_ms: 0,
        }
    }

    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            bus_producer: self.bus_producer.clone(),
            open_generation: self.open_generation.clone(),
        }
    }
}

impl EngineProbe {
    /// Simulate the platform finishing the currently open handle.
    pub fn signal_finished(&self) {
        let generation = self.open_generation.load(Ordering::SeqCst);
        if generation != 0 {
            let _ = self
                .bus_producer
                .send(Message::Engine(EngineMessage::Finished { generation }));
        }
    }

    /// Simulate an asynchronous platform failure; the handle is gone.
    pub fn signal_failed(&self, code: i32) {
        let generation = self.open_generation.swap(0, Ordering::SeqCst);
        if generation != 0 {
            let _ = self
                .bus_producer
                .send(Message::Engine(EngineMessage::Failed { generation, code }));
        }
    }
}

impl PlaybackEngine for NullEngine {
    fn open(&mut self, locator: &Path, generation: u64) -> Result<(), EngineError> {
        self.release();
        info!(
            "engine: open {} (generation {})",
            locator.display(),
            generation
        );
        self.open_generation.store(generation, Ordering::SeqCst);
        self.position_ms = 0;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) {
        debug!("engine: seek to {}ms", position_ms);
        self.position_ms = position_ms;
    }

    fn start(&mut self) {
        debug!("engine: start");
    }

    fn pause(&mut self) {
        debug!("engine: pause");
    }

    fn release(&mut self) {
        if self.open_generation.swap(0, Ordering::SeqCst) != 0 {
            debug!("engine: release");
        }
        self.position_ms = 0;
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }
}
