//! Unix signal handling for minbar.
//!
//! A background thread turns process signals into [`SignalMessage`]s on a
//! tokio channel that the core loop selects on:
//!
//! - SIGINT, SIGTERM, SIGHUP: shut down
//! - SIGUSR1: advance the demo sequence
//! - SIGUSR2: reload the configuration

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Messages delivered to the core loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Stop the loop (SIGINT, SIGTERM, SIGHUP)
    Shutdown,
    /// Step the demo sequence (SIGUSR1)
    DemoAdvance,
    /// Reload the configuration (SIGUSR2 or file watcher)
    Reload,
}

/// Signal handling state shared between the signal thread and the core loop.
pub struct SignalState {
    /// Cleared once a shutdown signal arrives
    pub running: Arc<AtomicBool>,
    pub signal_sender: UnboundedSender<SignalMessage>,
    pub signal_receiver: UnboundedReceiver<SignalMessage>,
}

impl SignalState {
    /// Channel pair without any OS signal registration.
    pub fn detached() -> Self {
        let (signal_sender, signal_receiver) = unbounded_channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal_sender,
            signal_receiver,
        }
    }
}

/// Map a raw signal number to the message it triggers.
pub fn message_for(signal: i32) -> Option<SignalMessage> {
    match signal {
        SIGINT | SIGTERM | SIGHUP => Some(SignalMessage::Shutdown),
        SIGUSR1 => Some(SignalMessage::DemoAdvance),
        SIGUSR2 => Some(SignalMessage::Reload),
        _ => None,
    }
}

/// Register the handled signals and spawn the forwarding thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let state = SignalState::detached();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running = Arc::clone(&state.running);
    let sender = state.signal_sender.clone();

    thread::Builder::new()
        .name("minbar-signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                let Some(message) = message_for(sig) else {
                    continue;
                };

                match message {
                    SignalMessage::Shutdown => {
                        log_pipe!();
                        log_info!("Received shutdown signal");
                        running.store(false, Ordering::SeqCst);
                    }
                    SignalMessage::DemoAdvance => {
                        if debug_enabled {
                            log_pipe!();
                            log_debug!("Received demo advance signal");
                        }
                    }
                    SignalMessage::Reload => {
                        log_pipe!();
                        log_info!("Received configuration reload signal");
                    }
                }

                if sender.send(message).is_err() || message == SignalMessage::Shutdown {
                    break;
                }
            }
        })
        .context("failed to spawn signal handler thread")?;

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_mapping() {
        assert_eq!(message_for(SIGINT), Some(SignalMessage::Shutdown));
        assert_eq!(message_for(SIGTERM), Some(SignalMessage::Shutdown));
        assert_eq!(message_for(SIGHUP), Some(SignalMessage::Shutdown));
        assert_eq!(message_for(SIGUSR1), Some(SignalMessage::DemoAdvance));
        assert_eq!(message_for(SIGUSR2), Some(SignalMessage::Reload));
        assert_eq!(message_for(0), None);
    }

    #[tokio::test]
    async fn test_detached_state_delivers_messages() {
        let mut state = SignalState::detached();
        assert!(state.running.load(Ordering::SeqCst));

        state.signal_sender.send(SignalMessage::Reload).unwrap();
        assert_eq!(state.signal_receiver.recv().await, Some(SignalMessage::Reload));
    }
}
