//! `minbar simulate`: run the display loop on an accelerated clock.
//!
//! Installs a [`SimulatedTimeSource`] before any logging so every line carries
//! the simulated wall clock, then hands control back to the caller, which runs
//! the normal live loop until the end time is reached.

use anyhow::{Result, anyhow};
use chrono::Local;
use std::sync::Arc;

use crate::common::logger::{Log, LoggerGuard};
use crate::config::Config;
use crate::time::source::{self, SimulatedTimeSource};

/// Resources kept alive while a simulation runs.
pub struct SimulationGuards {
    _log_guard: Option<LoggerGuard>,
    completed: bool,
}

impl SimulationGuards {
    /// Mark the simulation as having reached its end time.
    pub fn complete_simulation(&mut self) {
        self.completed = true;
    }
}

impl Drop for SimulationGuards {
    fn drop(&mut self) {
        if self.completed {
            log_block_start!("Simulation complete");
        } else {
            log_block_start!("Simulation interrupted");
        }
        log_end!();
    }
}

/// Set up the simulated time source.
///
/// Times are read as wall-clock times in the mosque timezone. A multiplier
/// of 0.0 selects fast-forward mode.
pub fn handle_simulate_command(
    start_time: String,
    end_time: String,
    multiplier: f64,
    debug_enabled: bool,
    log_to_file: bool,
) -> Result<SimulationGuards> {
    let config = Config::load()?;
    let tz = config.tz();

    let start = source::parse_datetime_in_tz(&start_time, tz)
        .map_err(|e| anyhow!("Invalid start time: {}", e))?;
    let end = source::parse_datetime_in_tz(&end_time, tz)
        .map_err(|e| anyhow!("Invalid end time: {}", e))?;

    if end <= start {
        anyhow::bail!("End time must be after start time");
    }

    // The clock and timezone must be in place before the first log line
    source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end, multiplier)));
    Log::set_display_timezone(tz);

    let log_guard = if log_to_file {
        let file_name = format!(
            "minbar-simulation-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        let guard = Log::start_file_logging(file_name.clone())?;
        Some((guard, file_name))
    } else {
        None
    };

    log_version!();
    log_block_start!("Simulation Mode");
    log_decorated!("Simulating from {} to {} ({})", start_time, end_time, tz);

    let duration = end - start;
    log_indented!(
        "Total simulated time: {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );
    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward");
    } else {
        log_indented!(
            "Time acceleration: {}x (will complete in ~{:.1} seconds)",
            multiplier,
            duration.num_seconds() as f64 / multiplier
        );
    }

    let log_guard = log_guard.map(|(guard, file_name)| {
        log_indented!("Writing log to {}", file_name);
        guard
    });

    if debug_enabled {
        log_pipe!();
        log_debug!("Simulated time source initialized");
    }

    Ok(SimulationGuards {
        _log_guard: log_guard,
        completed: false,
    })
}

/// Display help for the simulate command
pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Run the display on an accelerated clock");
    log_block_start!(
        "Usage: minbar simulate <start> <end> [multiplier | --fast-forward] [--log]"
    );
    log_block_start!("Arguments:");
    log_indented!("START, END    \"YYYY-MM-DD HH:MM:SS\" in the mosque timezone");
    log_indented!("MULTIPLIER    Simulated seconds per real second, 0.1 to 3600 (default 60)");
    log_block_start!("Options:");
    log_indented!("--fast-forward  Advance one simulated second per 10ms tick");
    log_indented!("--log           Also write output to minbar-simulation-<time>.log");
    log_block_start!("Examples:");
    log_indented!("minbar simulate \"2025-03-01 11:50:00\" \"2025-03-01 13:00:00\" 30");
    log_end!();
}
