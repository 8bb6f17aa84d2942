//! Application coordinator that manages the complete lifecycle of minbar.
//!
//! Handles resource acquisition and hands the prepared pieces to the core
//! loop:
//! - configuration loading
//! - lock file management for single-instance enforcement
//! - signal handler and config watcher setup
//! - the async runtime
//!
//! The `Minbar` struct uses a builder pattern for the different startup
//! contexts:
//! - Normal startup: `Minbar::new(debug_enabled).run()`
//! - Demo mode: `Minbar::new(debug_enabled).demo(Some(5)).run()`
//! - Simulation mode: `Minbar::new(debug_enabled).without_lock().without_headers().run()`

use anyhow::Result;
use std::time::Duration;

use crate::{
    commands::runtime,
    common::logger::Log,
    config::{self, Config},
    core::{
        Core, CoreParams,
        demo::DemoSequencer,
        scheduler::ClockMode,
    },
    display::ConsoleRenderer,
    io::{lock, signals::setup_signal_handler},
    schedule::AladhanProvider,
};

/// Builder for configuring and running the minbar display loop.
///
/// # Examples
///
/// ```no_run
/// use minbar::Minbar;
///
/// # fn main() -> anyhow::Result<()> {
/// // Normal application startup
/// Minbar::new(false).run()?;
///
/// // Demo mode advancing every 3 seconds
/// Minbar::new(false).demo(Some(3)).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Minbar {
    debug_enabled: bool,
    create_lock: bool,
    show_headers: bool,
    demo: bool,
    demo_interval: Option<u64>,
}

impl Minbar {
    /// Create a new runner with defaults matching normal run
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            show_headers: true,
            demo: false,
            demo_interval: None,
        }
    }

    /// Skip lock file creation (for simulations)
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    /// Skip header display
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Run in demo mode. `interval` overrides `demo_interval` from the
    /// configuration; 0 means manual stepping only.
    pub fn demo(mut self, interval: Option<u64>) -> Self {
        self.demo = true;
        self.demo_interval = interval;
        self
    }

    /// Execute the application until shutdown.
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Debug mode enabled - showing schedule and refresh details");
            }
        }

        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                log_error_exit!("Configuration failed");
                eprintln!("{:?}", e);
                std::process::exit(1);
            }
        };
        Log::set_display_timezone(config.tz());

        let lock = if self.create_lock {
            match lock::acquire_lock()? {
                Some(lock) => Some(lock),
                None => {
                    log_block_start!("Cannot start - another minbar instance is running");
                    log_end!();
                    return Ok(());
                }
            }
        } else {
            None
        };

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        if let Err(e) =
            config::start_config_watcher(signal_state.signal_sender.clone(), self.debug_enabled)
            && self.debug_enabled
        {
            log_pipe!();
            log_warning!("Config file watching unavailable: {}", e);
            log_indented!("Hot config reload disabled, use SIGUSR2 for manual reload");
        }

        config.log_config();

        let (mode, demo_interval) = if self.demo {
            let secs = self.demo_interval.unwrap_or_else(|| config.demo_interval());
            log_block_start!("Demo mode: send SIGUSR1 to advance");
            if secs > 0 {
                log_indented!("Advancing automatically every {}s", secs);
            }
            (
                ClockMode::Demo(DemoSequencer::new()),
                (secs > 0).then(|| Duration::from_secs(secs)),
            )
        } else {
            (ClockMode::Live, None)
        };

        let provider = AladhanProvider::new()?;

        if lock.is_some() {
            log_block_start!("Lock acquired, starting minbar...");
        }

        let runtime = runtime()?;
        runtime.block_on(async {
            let core = Core::new(CoreParams {
                renderer: Box::new(ConsoleRenderer::new(config.tz(), self.debug_enabled)),
                config,
                provider,
                signal_state,
                time_source: crate::time::source::global(),
                mode,
                demo_interval,
                debug_enabled: self.debug_enabled,
                lock,
            });
            core.run().await
        })
    }
}
