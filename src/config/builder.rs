//! Default configuration file generation.
//!
//! Builds a commented `minbar.toml` with aligned inline comments using a small
//! builder, so the generated file documents every accepted range.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Create a default config file at `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));

    Ok(())
}

/// Contents of a freshly generated `minbar.toml`.
pub(crate) fn default_config_content() -> String {
    let content = ConfigBuilder::new()
        .add_section("Mosque")
        .add_setting(
            "name",
            &format!("\"{DEFAULT_NAME}\""),
            "Shown on the dashboard",
        )
        .add_setting(
            "city",
            &format!("\"{DEFAULT_CITY}\""),
            "City sent to the prayer-time provider",
        )
        .add_setting(
            "country",
            &format!("\"{DEFAULT_COUNTRY}\""),
            "Country sent to the prayer-time provider",
        )
        .add_setting(
            "timezone",
            &format!("\"{DEFAULT_TIMEZONE}\""),
            "IANA timezone of the mosque",
        )
        .add_comment("latitude = 24.7136", "Optional, used by the offline calculator")
        .add_comment("longitude = 46.6753", "Optional, used by the offline calculator")
        .add_section("Calculation")
        .add_setting(
            "calculation_method",
            &DEFAULT_CALCULATION_METHOD.to_string(),
            &format!("AlAdhan method id (0-{MAXIMUM_CALCULATION_METHOD}, 4 = Umm al-Qura)"),
        )
        .add_setting(
            "school",
            &DEFAULT_SCHOOL.to_string(),
            "0 = Shafi'i, 1 = Hanafi (Asr shadow factor)",
        )
        .add_setting(
            "calendar_adjustment",
            &DEFAULT_CALENDAR_ADJUSTMENT.to_string(),
            &format!(
                "Minutes added to provider adhan times (-{MAXIMUM_CALENDAR_ADJUSTMENT}..{MAXIMUM_CALENDAR_ADJUSTMENT})"
            ),
        )
        .add_setting(
            "fajr_angle",
            &format!("{DEFAULT_FAJR_ANGLE:.1}"),
            &format!(
                "Offline calculator twilight angle ({MINIMUM_TWILIGHT_ANGLE}-{MAXIMUM_TWILIGHT_ANGLE})"
            ),
        )
        .add_setting(
            "isha_angle",
            &format!("{DEFAULT_ISHA_ANGLE:.1}"),
            &format!(
                "Offline calculator twilight angle ({MINIMUM_TWILIGHT_ANGLE}-{MAXIMUM_TWILIGHT_ANGLE})"
            ),
        )
        .add_section("Screens")
        .add_setting(
            "prayer_duration",
            &format!("{DEFAULT_PRAYER_DURATION:.1}"),
            &format!(
                "Minutes of the in-prayer screen ({MINIMUM_PRAYER_DURATION}-{MAXIMUM_PRAYER_DURATION})"
            ),
        )
        .add_setting(
            "remembrance_duration",
            &format!("{DEFAULT_REMEMBRANCE_DURATION:.1}"),
            &format!(
                "Minutes of the remembrance screen ({MINIMUM_REMEMBRANCE_DURATION}-{MAXIMUM_REMEMBRANCE_DURATION})"
            ),
        )
        .add_setting(
            "demo_interval",
            &DEFAULT_DEMO_INTERVAL.to_string(),
            "Seconds between demo steps (0 = manual only)",
        )
        .add_section("Provider")
        .add_setting(
            "fetch_days",
            &DEFAULT_FETCH_DAYS.to_string(),
            &format!("Days fetched per provider refresh ({MINIMUM_FETCH_DAYS}-{MAXIMUM_FETCH_DAYS})"),
        )
        .add_setting(
            "api_base_url",
            &format!("\"{DEFAULT_API_BASE_URL}\""),
            "AlAdhan-compatible API",
        )
        .add_table(
            "congregation_offsets",
            &format!("Minutes between call and congregation (0-{MAXIMUM_CONGREGATION_OFFSET})"),
        )
        .add_setting("fajr", &DEFAULT_FAJR_OFFSET.to_string(), "")
        .add_setting("dhuhr", &DEFAULT_DHUHR_OFFSET.to_string(), "")
        .add_setting("asr", &DEFAULT_ASR_OFFSET.to_string(), "")
        .add_setting("maghrib", &DEFAULT_MAGHRIB_OFFSET.to_string(), "")
        .add_setting("isha", &DEFAULT_ISHA_OFFSET.to_string(), "")
        .build();

    format!("{content}\n")
}

struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Table { header: String, comment: String },
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    /// Start a real TOML table; every setting after it belongs to the table.
    fn add_table(mut self, name: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Table {
            header: format!("[{name}]"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: if comment.is_empty() {
                String::new()
            } else {
                format!("# {comment}")
            },
        });
        self
    }

    /// A commented-out example setting.
    fn add_comment(mut self, line: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("# {line}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let width = |line: &str| line.chars().count();

        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(width(line)),
                ConfigEntry::Table { header, .. } => Some(width(header)),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_section = true;

        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !first_section {
                        result.push(String::new());
                    }
                    result.push(title);
                    first_section = false;
                }
                ConfigEntry::Table { header, comment } => {
                    result.push(String::new());
                    let padding = " ".repeat(max_width - width(&header));
                    result.push(format!("{header}{padding}{comment}"));
                }
                ConfigEntry::Setting { line, comment } if comment.is_empty() => {
                    result.push(line);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - width(&line));
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}
