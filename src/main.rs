//! Single-screen audio playlist player.
//!
//! Scans a device media folder for playable audio files, renders them as a
//! selectable list, and drives playback through an opaque engine adapter.
//! Components communicate over a broadcast bus: the controller consumes
//! operator commands, engine signals, and lifecycle events, and emits
//! render/scroll/notify instructions that the console front displays.

mod config;
mod config_persistence;
mod controller;
mod engine;
mod front;
mod permission;
mod playlist;
mod protocol;
mod session;
mod track_source;

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::{
    config::Config,
    controller::PlaylistController,
    engine::NullEngine,
    front::ConsoleFront,
    permission::{PermissionGate, UnrestrictedHost},
    protocol::{ControlMessage, LifecycleMessage, Message},
    session::SessionStore,
    track_source::{FsMediaIndex, TrackSource},
};

fn log_level_from_config(config: &Config) -> log::LevelFilter {
    match config.log_level.as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        other => {
            eprintln!("Unknown log_level {:?}, using debug", other);
            log::LevelFilter::Debug
        }
    }
}

fn media_root(config: &Config) -> PathBuf {
    if let Some(media_dir) = &config.media_dir {
        return media_dir.clone();
    }
    dirs::audio_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn main() {
    let config_path = config_persistence::config_file_path();
    let config = config_persistence::load_config_file(&config_path);

    let mut clog = colog::default_builder();
    clog.filter(None, log_level_from_config(&config));
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    info!("Config loaded from {}", config_path.display());

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(1024);

    let session_store = SessionStore::new(config_persistence::session_file_path());
    let saved_session = session_store.load();

    // Setup playlist controller
    let controller_bus_receiver = bus_sender.subscribe();
    let controller_bus_sender = bus_sender.clone();
    // The front must be subscribed before the initial reload is posted.
    let front_bus_receiver = bus_sender.subscribe();
    let engine = NullEngine::new(bus_sender.clone());
    let engine_probe = engine.probe();
    let source = TrackSource::new(FsMediaIndex::new(media_root(&config)));
    let gate = PermissionGate::new(UnrestrictedHost);
    let controller_handle = thread::Builder::new()
        .name("controller".to_string())
        .spawn(move || {
            let mut controller = PlaylistController::new(
                engine,
                source,
                gate,
                session_store,
                config,
                Some(config_path),
                controller_bus_receiver,
                controller_bus_sender,
            );
            controller.run();
        })
        .expect("Failed to spawn controller thread");

    // Restore the previous session, then trigger the initial scan that the
    // restore is applied against.
    if let Some(snapshot) = saved_session {
        info!("Restoring saved session: {:?}", snapshot);
        let _ = bus_sender.send(Message::Lifecycle(LifecycleMessage::RestoreState(snapshot)));
    }
    let _ = bus_sender.send(Message::Control(ControlMessage::Reload));

    // Spawn a thread to translate operator command lines to bus messages.
    let command_bus_sender = bus_sender.clone();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("Failed to read command line: {}", err);
                    break;
                }
            };
            // Stand-ins for the platform's asynchronous engine signals.
            match line.trim() {
                "finish" => {
                    engine_probe.signal_finished();
                    continue;
                }
                "fail" => {
                    engine_probe.signal_failed(-38);
                    continue;
                }
                _ => {}
            }
            match front::parse_command(&line) {
                Some(messages) => {
                    let quitting = messages.iter().any(|message| {
                        matches!(message, Message::Lifecycle(LifecycleMessage::Shutdown))
                    });
                    for message in messages {
                        debug!("Command: {:?}", message);
                        let _ = command_bus_sender.send(message);
                    }
                    if quitting {
                        break;
                    }
                }
                None => {
                    if !line.trim().is_empty() {
                        println!("commands: reload | select N | play [N] | stop | filter TERMS | trace | pause | resume | finish | fail | quit");
                    }
                }
            }
        }
    });

    // Console front on the main thread, until shutdown.
    let mut front = ConsoleFront::new(front_bus_receiver);
    front.run();

    if controller_handle.join().is_err() {
        log::error!("Controller thread panicked during shutdown");
    }
}
