//! Command-line command handlers for minbar.
//!
//! Each one-shot command lives in its own submodule. The long-running display
//! loop is started through [`crate::Minbar`] instead.

pub mod help;
pub mod simulate;
pub mod times;

use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Parse a `YYYY-MM-DD` command argument.
pub(crate) fn parse_date_arg(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}'. Use YYYY-MM-DD"))
}

/// Build a current-thread tokio runtime for commands that need async I/O.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
