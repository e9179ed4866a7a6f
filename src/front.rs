//! Console front: the thin UI collaborator.
//!
//! Consumes render/scroll/notify instructions from the bus and prints them;
//! translates operator command lines into bus messages. No design content
//! lives here on purpose.

use log::warn;
use tokio::sync::broadcast::{error::RecvError, Receiver};

use crate::protocol::{
    ControlMessage, LifecycleMessage, Message, PermissionMessage, TrackRow, UiMessage,
};

pub struct ConsoleFront {
    bus_consumer: Receiver<Message>,
}

impl ConsoleFront {
    pub fn new(bus_consumer: Receiver<Message>) -> ConsoleFront {
        ConsoleFront { bus_consumer }
    }

    /// Consume bus traffic until shutdown.
    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Ui(ui)) => render(ui),
                Ok(Message::Lifecycle(LifecycleMessage::Shutdown)) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Front lagged, skipped {} bus messages", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

fn render(ui: UiMessage) {
    match ui {
        UiMessage::RenderList {
            tracks,
            selected_index,
            playing_index,
        } => render_list(&tracks, selected_index, playing_index),
        UiMessage::ScrollTo(index) => println!("(scrolled to row {})", index),
        UiMessage::ShowMessage(text) => println!("* {}", text),
        UiMessage::ShowPermissionRationale(capabilities) => {
            println!(
                "Storage access is needed to list audio files ({:?}).",
                capabilities
            );
            println!("Type 'allow' to continue or 'deny' to cancel.");
        }
        UiMessage::ShowScanTrace(lines) => {
            println!("--- scan trace ---");
            for line in lines {
                println!("{}", line);
            }
        }
    }
}

fn render_list(tracks: &[TrackRow], selected_index: Option<usize>, playing_index: Option<usize>) {
    if tracks.is_empty() {
        println!("(no tracks)");
        return;
    }
    for (index, row) in tracks.iter().enumerate() {
        let selected = if selected_index == Some(index) { '*' } else { ' ' };
        let playing = if playing_index == Some(index) { '>' } else { ' ' };
        println!("{}{} {:3}  {}", playing, selected, index, row.display_name);
    }
    if let Some(row) = playing_index.and_then(|index| tracks.get(index)) {
        println!("playing: {}", row.locator.display());
    }
}

/// Translate one operator command line into bus messages. `None` means the
/// line was not understood.
pub fn parse_command(line: &str) -> Option<Vec<Message>> {
    let mut words = line.split_whitespace();
    let command = words.next()?;

    let messages = match command {
        "reload" => vec![Message::Control(ControlMessage::Reload)],
        "select" => {
            let index: usize = words.next()?.parse().ok()?;
            vec![Message::Control(ControlMessage::Select(index))]
        }
        "play" => match words.next() {
            Some(word) => {
                let index: usize = word.parse().ok()?;
                vec![Message::Control(ControlMessage::Play(index))]
            }
            None => vec![Message::Control(ControlMessage::PlaySelected)],
        },
        "stop" => vec![Message::Control(ControlMessage::Stop)],
        "filter" => {
            let terms: Vec<&str> = words.collect();
            vec![Message::Control(ControlMessage::SetFilter(terms.join(" ")))]
        }
        "trace" => vec![Message::Control(ControlMessage::ShowScanTrace)],
        "pause" => vec![Message::Lifecycle(LifecycleMessage::Pause)],
        "resume" => vec![Message::Lifecycle(LifecycleMessage::Resume)],
        "allow" => vec![Message::Permission(PermissionMessage::RationaleAccepted)],
        "deny" => vec![Message::Permission(PermissionMessage::RationaleDismissed)],
        "quit" => vec![
            Message::Lifecycle(LifecycleMessage::SaveState),
            Message::Lifecycle(LifecycleMessage::Shutdown),
        ],
        _ => return None,
    };
    Some(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_with_and_without_index() {
        assert!(matches!(
            parse_command("play 3").as_deref(),
            Some([Message::Control(ControlMessage::Play(3))])
        ));
        assert!(matches!(
            parse_command("play").as_deref(),
            Some([Message::Control(ControlMessage::PlaySelected)])
        ));
        assert!(parse_command("play x").is_none());
    }

    #[test]
    fn test_parse_filter_joins_terms() {
        let messages = parse_command("filter wav  chime").expect("should parse");
        match messages.as_slice() {
            [Message::Control(ControlMessage::SetFilter(filter))] => {
                assert_eq!(filter, "wav chime")
            }
            other => panic!("unexpected messages: {:?}", other),
        }
    }

    #[test]
    fn test_parse_quit_saves_before_shutdown() {
        assert!(matches!(
            parse_command("quit").as_deref(),
            Some([
                Message::Lifecycle(LifecycleMessage::SaveState),
                Message::Lifecycle(LifecycleMessage::Shutdown),
            ])
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty_lines() {
        assert!(parse_command("").is_none());
        assert!(parse_command("dance").is_none());
        assert!(parse_command("select").is_none());
    }
}
