//! Persistent cache of the last fetched schedule window.
//!
//! The window is replaced as a whole on every successful fetch: written to a
//! temporary file, renamed over the previous one, then published in memory as
//! a new `Arc`. Readers always see either the old or the new window.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::common::utils::private_path;
use crate::config::Config;
use crate::prayer::{DailySchedule, PrayerTime};

/// Key format of persisted days
pub const DATE_KEY_FORMAT: &str = "%d-%m-%Y";

/// One cached day.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleCacheEntry {
    pub date_key: NaiveDate,
    pub schedule: Arc<DailySchedule>,
    pub hijri_label: String,
}

/// A fetched multi-day window.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheWindow {
    pub fetched_at: DateTime<Utc>,
    pub days: BTreeMap<NaiveDate, ScheduleCacheEntry>,
}

impl CacheWindow {
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            days: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, schedule: DailySchedule, hijri_label: String) {
        let date_key = schedule.date();
        self.days.insert(
            date_key,
            ScheduleCacheEntry {
                date_key,
                schedule: Arc::new(schedule),
                hijri_label,
            },
        );
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedWindow {
    fetched_at: DateTime<Utc>,
    days: BTreeMap<String, PersistedDay>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedDay {
    prayer_times: Vec<PrayerTime>,
    hijri_date_label: String,
}

/// Shared schedule cache, owned by the repository.
pub struct ScheduleCache {
    path: Option<PathBuf>,
    tz: Tz,
    window: RwLock<Option<Arc<CacheWindow>>>,
    write_lock: Mutex<()>,
}

impl ScheduleCache {
    /// Open the cache file at `path`; a missing, unreadable or invalid file
    /// leaves the cache empty.
    pub fn init(path: PathBuf, tz: Tz) -> Self {
        let window = match load_window(&path, tz) {
            Ok(window) => window.map(Arc::new),
            Err(e) => {
                log_warning!(
                    "Ignoring schedule cache {}: {e:#}",
                    private_path(&path)
                );
                None
            }
        };

        Self {
            path: Some(path),
            tz,
            window: RwLock::new(window),
            write_lock: Mutex::new(()),
        }
    }

    /// Cache at [`cache_path`] for `config`, in memory when no state
    /// directory is available.
    pub fn for_config(config: &Config) -> Self {
        match cache_path(config) {
            Some(path) => Self::init(path, config.tz()),
            None => Self::in_memory(config.tz()),
        }
    }

    /// Cache without a backing file.
    pub fn in_memory(tz: Tz) -> Self {
        Self {
            path: None,
            tz,
            window: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Entry for `date`, only if the current window holds exactly that date.
    pub fn get(&self, date: NaiveDate) -> Option<ScheduleCacheEntry> {
        let window = self.window()?;
        window
            .days
            .get(&date)
            .filter(|entry| entry.date_key == date && entry.schedule.date() == date)
            .cloned()
    }

    /// Current window snapshot.
    pub fn window(&self) -> Option<Arc<CacheWindow>> {
        self.window
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the whole window, persisting it first.
    ///
    /// The in-memory window is replaced even when writing the file fails, so
    /// the display keeps working on a read-only disk; the error is returned
    /// for logging.
    pub fn put(&self, window: CacheWindow) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let persisted = match &self.path {
            Some(path) => write_window(path, &window),
            None => Ok(()),
        };

        *self.window.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(window));

        persisted
    }
}

/// Cache file for `config`, namespaced by everything that changes the times.
pub fn cache_path(config: &Config) -> Option<PathBuf> {
    let identity = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        config.city().trim().to_lowercase(),
        config.country().trim().to_lowercase(),
        config.calculation_method(),
        config.school(),
        config.timezone_name(),
        config.calendar_adjustment(),
        config.api_base_url()
    );
    let digest = sha256::digest(identity);
    let state_dir = dirs::state_dir()?;
    Some(
        state_dir
            .join("minbar")
            .join(format!("schedule-{}.json", &digest[..16])),
    )
}

fn load_window(path: &Path, tz: Tz) -> Result<Option<CacheWindow>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).context("Failed to read cache file")?;
    let persisted: PersistedWindow =
        serde_json::from_str(&content).context("Failed to parse cache file")?;

    let mut window = CacheWindow::new(persisted.fetched_at);
    for (key, day) in persisted.days {
        let date = NaiveDate::parse_from_str(&key, DATE_KEY_FORMAT)
            .with_context(|| format!("Invalid date key '{key}'"))?;
        let prayers: [PrayerTime; 6] = day
            .prayer_times
            .try_into()
            .map_err(|v: Vec<PrayerTime>| {
                anyhow::anyhow!("Day {key} has {} prayer times, expected 6", v.len())
            })?;
        let schedule = DailySchedule::new(date, prayers, tz)
            .with_context(|| format!("Invalid schedule for {key}"))?;
        window.insert(schedule, day.hijri_date_label);
    }

    Ok(Some(window))
}

fn write_window(path: &Path, window: &CacheWindow) -> Result<()> {
    let dir = path
        .parent()
        .context("Cache path has no parent directory")?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", private_path(dir)))?;

    let persisted = PersistedWindow {
        fetched_at: window.fetched_at,
        days: window
            .days
            .iter()
            .map(|(date, entry)| {
                (
                    date.format(DATE_KEY_FORMAT).to_string(),
                    PersistedDay {
                        prayer_times: entry.schedule.prayers().to_vec(),
                        hijri_date_label: entry.hijri_label.clone(),
                    },
                )
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&persisted).context("Failed to encode cache")?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", private_path(dir)))?;
    temp.write_all(json.as_bytes())
        .context("Failed to write cache")?;
    temp.flush().context("Failed to flush cache")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", private_path(path)))?;

    Ok(())
}
