//! # Minbar Library
//!
//! Internal library for the minbar binary: a prayer-time scheduling engine for
//! always-on mosque information displays.
//!
//! ## Architecture
//!
//! - **Entry Point**: `Minbar` builder acquires resources and starts the loop
//! - **Core Logic**: `core` hosts the tick loop, the pure screen-state
//!   `scheduler`, the demo sequencer and refresh bookkeeping
//! - **Schedules**: `schedule` combines the AlAdhan provider, the persistent
//!   cache and the offline fallback from `prayer`
//! - **Prayer Model**: `prayer` holds the schedule types, the solar
//!   calculator and the tabular Hijri calendar
//! - **Configuration**: `config` for TOML settings with validation and hot reload
//! - **Display**: `display` turns snapshots into frames for a renderer
//! - **Infrastructure**: signal handling, lock file, logging and the
//!   injectable time source

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod common;

// Public API modules
pub mod args;
pub mod commands;
pub mod config;
pub mod display;
pub mod io;
pub mod prayer;
pub mod schedule;
pub mod time;

pub mod core;
mod minbar;

pub use minbar::Minbar;
