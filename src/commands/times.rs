//! `minbar times [YYYY-MM-DD]`: print one day's prayer and congregation times.
//!
//! Uses the same cache → provider → offline calculation path as the display
//! loop, so running it also warms the cache.

use anyhow::Result;
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;

use super::{parse_date_arg, runtime};
use crate::common::logger::Log;
use crate::config::Config;
use crate::schedule::{
    AladhanProvider, ScheduleCache, ScheduleRepository, TodaysSchedule, fallback_schedule,
};

/// Handle the times command.
pub fn handle_times_command(date: Option<&str>, debug_enabled: bool) -> Result<()> {
    let config = Config::load()?;
    let tz = config.tz();
    let now = crate::time::source::now();
    let date = match date {
        Some(value) => parse_date_arg(value)?,
        None => now.with_timezone(&tz).date_naive(),
    };

    log_version!();
    if debug_enabled {
        config.log_config();
    }

    let runtime = runtime()?;

    // Fetch progress would interleave with the table
    if !debug_enabled {
        Log::set_enabled(false);
    }
    let todays = match AladhanProvider::new() {
        Ok(provider) => {
            let repository =
                ScheduleRepository::new(provider, Arc::new(ScheduleCache::for_config(&config)));
            runtime.block_on(repository.schedule_for(&config, date, now))
        }
        Err(e) => {
            log_warning!("Prayer-time provider unavailable: {}", e);
            fallback_schedule(&config, date)
        }
    };
    Log::set_enabled(true);

    print_schedule(&config, &todays, tz);
    log_end!();
    Ok(())
}

fn print_schedule(config: &Config, todays: &TodaysSchedule, tz: Tz) {
    let hm = |instant: DateTime<chrono::Utc>| instant.with_timezone(&tz).format("%H:%M").to_string();

    log_block_start!("{} | {}, {}", config.name(), config.city(), config.country());
    log_indented!(
        "{} | {}",
        todays.schedule.date().format("%A %Y-%m-%d"),
        todays.hijri_label
    );
    log_pipe!();

    for prayer in todays.schedule.iter() {
        if prayer.name.is_congregational() {
            log_indented!(
                "{:<8} {:<6} {}   iqama {} (+{}m)",
                prayer.display_name,
                prayer.name.arabic_name(),
                hm(prayer.instant),
                hm(prayer.congregation_instant()),
                prayer.congregation_offset_minutes
            );
        } else {
            log_indented!(
                "{:<8} {:<6} {}",
                prayer.display_name,
                prayer.name.arabic_name(),
                hm(prayer.instant)
            );
        }
    }

    log_block_start!("Source: {}", todays.source);
}

/// Display help for the times command
pub fn display_help() {
    log_version!();
    log_block_start!("times - Print prayer and congregation times");
    log_block_start!("Usage: minbar times [YYYY-MM-DD]");
    log_block_start!("Arguments:");
    log_indented!("DATE  Day to show in the mosque timezone (default: today)");
    log_block_start!("Notes:");
    log_indented!("Times come from the schedule cache, the AlAdhan API or, when");
    log_indented!("both are unavailable, the offline calculation.");
    log_block_start!("Examples:");
    log_indented!("minbar times");
    log_indented!("minbar times 2025-03-01 --config ~/mosque");
    log_end!();
}
