//! File watching module for hot config reloading.
//!
//! Watches the directory holding `minbar.toml` and sends a reload message to
//! the core loop when the file is written, replaced or removed.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Debounce duration for file change events (in milliseconds).
/// Editors often write a file in several steps.
const DEBOUNCE_MS: u64 = 500;

/// Configuration file watcher that monitors for changes and triggers reloads.
pub struct ConfigWatcher {
    signal_sender: UnboundedSender<SignalMessage>,
    debug_enabled: bool,
    config_path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(
        signal_sender: UnboundedSender<SignalMessage>,
        config_path: PathBuf,
        debug_enabled: bool,
    ) -> Self {
        Self {
            signal_sender,
            debug_enabled,
            config_path,
        }
    }

    /// Spawn the background watcher thread.
    pub fn start(self) -> Result<()> {
        let Some(config_dir) = self.config_path.parent().map(Path::to_path_buf) else {
            return Ok(());
        };

        if !config_dir.is_dir() {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("No configuration directory found to watch for hot reload");
            }
            return Ok(());
        }

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Starting config file watcher for hot reload:");
            log_indented!("Watching: {}", private_path(&self.config_path));
        }

        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                            let _ = tx.send(event);
                        }
                        _ => {}
                    }
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        // Watch the directory so atomic replacements by editors are seen
        watcher
            .watch(&config_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", config_dir.display()))?;

        let ConfigWatcher {
            signal_sender,
            debug_enabled,
            config_path,
        } = self;

        thread::spawn(move || {
            // Keep the watcher alive for the lifetime of the thread
            let _watcher = watcher;
            let mut last_reload_time: Option<Instant> = None;

            for event in rx {
                if !event
                    .paths
                    .iter()
                    .any(|path| affects_config(path, &config_path))
                {
                    continue;
                }

                if let Some(last) = last_reload_time
                    && last.elapsed() < Duration::from_millis(DEBOUNCE_MS)
                {
                    continue;
                }

                if debug_enabled {
                    log_pipe!();
                    log_info!("Configuration file change detected");
                }

                if signal_sender.send(SignalMessage::Reload).is_err() {
                    // Core loop is gone
                    break;
                }
                last_reload_time = Some(Instant::now());
            }
        });

        Ok(())
    }
}

/// Whether a changed path is the config file or an editor temp copy of it.
fn affects_config(event_path: &Path, config_path: &Path) -> bool {
    if event_path == config_path {
        return true;
    }
    if event_path.parent() != config_path.parent() {
        return false;
    }

    match (
        event_path.file_name().and_then(|n| n.to_str()),
        config_path.file_name().and_then(|n| n.to_str()),
    ) {
        (Some(event_name), Some(config_name)) => {
            event_name.starts_with(config_name) || event_name.ends_with(config_name)
        }
        _ => false,
    }
}

/// Start the configuration file watcher for the active config path.
pub fn start_config_watcher(
    signal_sender: UnboundedSender<SignalMessage>,
    debug_enabled: bool,
) -> Result<()> {
    let config_path = super::get_config_path()?;
    ConfigWatcher::new(signal_sender, config_path, debug_enabled).start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affects_config_matches_file_and_editor_copies() {
        let config = PathBuf::from("/home/user/.config/minbar/minbar.toml");
        assert!(affects_config(&config, &config));
        assert!(affects_config(
            Path::new("/home/user/.config/minbar/minbar.toml~"),
            &config
        ));
        assert!(affects_config(
            Path::new("/home/user/.config/minbar/.minbar.toml"),
            &config
        ));
        assert!(!affects_config(
            Path::new("/home/user/.config/minbar/notes.txt"),
            &config
        ));
        assert!(!affects_config(
            Path::new("/home/user/.config/other/minbar.toml"),
            &config
        ));
    }
}
