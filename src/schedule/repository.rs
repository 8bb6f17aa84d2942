//! Cache → remote → fallback orchestration for today's schedule.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;

use super::cache::{CacheWindow, ScheduleCache};
use super::provider::{RawWindow, ScheduleProvider};
use crate::config::Config;
use crate::prayer::DailySchedule;
use crate::prayer::calculator::{FallbackCalculator, fallback_for};
use crate::prayer::hijri::hijri_label;

/// Where a schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSource {
    Cache,
    Remote,
    Fallback,
}

impl fmt::Display for ScheduleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScheduleSource::Cache => "cache",
            ScheduleSource::Remote => "remote provider",
            ScheduleSource::Fallback => "offline calculation",
        };
        write!(f, "{name}")
    }
}

/// Today's schedule with its Hijri label.
#[derive(Debug, Clone, PartialEq)]
pub struct TodaysSchedule {
    pub schedule: Arc<DailySchedule>,
    pub hijri_label: String,
    pub source: ScheduleSource,
}

/// Resolves schedules for the core loop.
pub struct ScheduleRepository<P> {
    provider: P,
    cache: Arc<ScheduleCache>,
}

impl<P: ScheduleProvider> ScheduleRepository<P> {
    pub fn new(provider: P, cache: Arc<ScheduleCache>) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &Arc<ScheduleCache> {
        &self.cache
    }

    /// Same provider backed by another cache.
    pub fn with_cache(&self, cache: Arc<ScheduleCache>) -> Self
    where
        P: Clone,
    {
        Self {
            provider: self.provider.clone(),
            cache,
        }
    }

    /// Today's schedule, hitting the network only on a cache miss.
    ///
    /// Never fails: provider errors and incomplete windows fall back to the
    /// offline calculator without touching the cache.
    pub async fn todays_schedule(&self, config: &Config, now: DateTime<Utc>) -> TodaysSchedule {
        let today = now.with_timezone(&config.tz()).date_naive();
        self.schedule_for(config, today, now).await
    }

    /// Schedule for `today`, fetching a window starting there on a cache miss.
    pub async fn schedule_for(
        &self,
        config: &Config,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> TodaysSchedule {
        if let Some(entry) = self.cache.get(today) {
            return TodaysSchedule {
                schedule: Arc::new(entry.schedule.with_congregation_offsets(config)),
                hijri_label: entry.hijri_label,
                source: ScheduleSource::Cache,
            };
        }

        match self
            .provider
            .fetch_window(config, today, config.fetch_days())
            .await
        {
            Ok(raw) => {
                let window = build_window(raw, config, now);
                match window.days.get(&today).cloned() {
                    Some(entry) => {
                        let days = window.days.len();
                        if let Err(e) = self.cache.put(window) {
                            log_warning!("Failed to persist schedule cache: {e:#}");
                        }
                        log_decorated!("Fetched {} day(s) of prayer times", days);
                        return TodaysSchedule {
                            schedule: Arc::new(entry.schedule.with_congregation_offsets(config)),
                            hijri_label: entry.hijri_label,
                            source: ScheduleSource::Remote,
                        };
                    }
                    None => {
                        log_warning!("Provider returned no valid schedule for {}", today);
                    }
                }
            }
            Err(e) => {
                log_warning!("Prayer-time provider unavailable: {}", e);
            }
        }

        let calculator = fallback_for(config);
        log_decorated!("Using offline calculation: {}", calculator.describe());
        compute_fallback(calculator.as_ref(), config, today)
    }

    /// Cached or computed schedule for any date, without I/O.
    pub fn peek(&self, config: &Config, date: NaiveDate) -> TodaysSchedule {
        match self.cache.get(date) {
            Some(entry) => TodaysSchedule {
                schedule: Arc::new(entry.schedule.with_congregation_offsets(config)),
                hijri_label: entry.hijri_label,
                source: ScheduleSource::Cache,
            },
            None => fallback_schedule(config, date),
        }
    }
}

/// Offline schedule for `date` with a tabular Hijri label.
pub fn fallback_schedule(config: &Config, date: NaiveDate) -> TodaysSchedule {
    compute_fallback(fallback_for(config).as_ref(), config, date)
}

fn compute_fallback(
    calculator: &dyn FallbackCalculator,
    config: &Config,
    date: NaiveDate,
) -> TodaysSchedule {
    TodaysSchedule {
        schedule: Arc::new(calculator.compute(date, config)),
        hijri_label: hijri_label(date),
        source: ScheduleSource::Fallback,
    }
}

/// Validate raw days into a cache window; invalid days are dropped.
fn build_window(raw: RawWindow, config: &Config, now: DateTime<Utc>) -> CacheWindow {
    let tz = config.tz();
    let mut window = CacheWindow::new(now);

    for (date, day) in raw {
        if let Some(ref reported) = day.reported_timezone
            && reported != config.timezone_name()
        {
            log_warning!(
                "Provider computed {} for timezone {}, mosque timezone is {}",
                date,
                reported,
                config.timezone_name()
            );
        }

        match DailySchedule::from_wall_clock(date, day.timings, tz, config) {
            Ok(schedule) => {
                let label = day.hijri_label.unwrap_or_else(|| hijri_label(date));
                window.insert(schedule, label);
            }
            Err(e) => {
                log_warning!("Discarding provider schedule for {}: {}", date, e);
            }
        }
    }

    window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::PrayerName;
    use crate::schedule::provider::{ProviderError, RawDay};
    use chrono::{Duration, NaiveTime, TimeZone};
    use chrono_tz::Asia::Riyadh;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider answering from a fixed script and counting calls.
    struct ScriptedProvider {
        fail: bool,
        skip_start: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn ok() -> Self {
            Self {
                fail: false,
                skip_start: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }
    }

    impl ScheduleProvider for ScriptedProvider {
        async fn fetch_window(
            &self,
            _config: &Config,
            start: NaiveDate,
            day_count: u32,
        ) -> Result<RawWindow, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Status {
                    date: start,
                    status: 503,
                });
            }
            let timings = [(4, 43), (6, 7), (12, 27), (15, 45), (18, 48), (20, 18)]
                .map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap());
            Ok(start
                .iter_days()
                .take(day_count as usize)
                .skip(usize::from(self.skip_start))
                .map(|date| {
                    (
                        date,
                        RawDay {
                            timings,
                            hijri_label: Some("remote".to_string()),
                            reported_timezone: Some("Asia/Riyadh".to_string()),
                        },
                    )
                })
                .collect())
        }
    }

    fn morning() -> DateTime<Utc> {
        // 2024-07-08 09:00 in Riyadh
        Riyadh
            .with_ymd_and_hms(2024, 7, 8, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn repo(provider: ScriptedProvider) -> ScheduleRepository<ScriptedProvider> {
        ScheduleRepository::new(provider, Arc::new(ScheduleCache::in_memory(Riyadh)))
    }

    #[tokio::test]
    async fn test_remote_then_cache_hit() {
        let repo = repo(ScriptedProvider::ok());
        let config = Config::default();

        let first = repo.todays_schedule(&config, morning()).await;
        assert_eq!(first.source, ScheduleSource::Remote);
        assert_eq!(first.hijri_label, "remote");
        assert_eq!(repo.cache().window().unwrap().days.len(), 7);

        let second = repo
            .todays_schedule(&config, morning() + Duration::hours(3))
            .await;
        assert_eq!(second.source, ScheduleSource::Cache);
        assert_eq!(second.schedule, first.schedule);
        assert_eq!(repo.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_without_touching_cache() {
        let repo = repo(ScriptedProvider::failing());
        let config = Config::default();

        let today = repo.todays_schedule(&config, morning()).await;
        assert_eq!(today.source, ScheduleSource::Fallback);
        assert_eq!(today.schedule.date(), NaiveDate::from_ymd_opt(2024, 7, 8).unwrap());
        assert!(today.hijri_label.ends_with("هـ"));
        assert!(repo.cache().window().is_none());
    }

    #[tokio::test]
    async fn test_window_without_today_falls_back() {
        let repo = repo(ScriptedProvider {
            skip_start: true,
            ..ScriptedProvider::ok()
        });
        let today = repo.todays_schedule(&Config::default(), morning()).await;
        assert_eq!(today.source, ScheduleSource::Fallback);
        assert!(repo.cache().window().is_none());
    }

    #[tokio::test]
    async fn test_offsets_reapplied_from_current_config() {
        let repo = repo(ScriptedProvider::ok());
        repo.todays_schedule(&Config::default(), morning()).await;

        let changed = Config {
            congregation_offsets: Some(crate::config::CongregationOffsets {
                dhuhr: Some(25),
                ..Default::default()
            }),
            ..Config::default()
        };
        let today = repo.todays_schedule(&changed, morning()).await;
        assert_eq!(today.source, ScheduleSource::Cache);
        assert_eq!(
            today.schedule.get(PrayerName::Dhuhr).congregation_offset_minutes,
            25
        );
    }

    #[test]
    fn test_peek_uses_fallback_for_uncached_date() {
        let repo = repo(ScriptedProvider::ok());
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let peeked = repo.peek(&Config::default(), date);
        assert_eq!(peeked.source, ScheduleSource::Fallback);
        assert_eq!(peeked.schedule.date(), date);
    }
}
