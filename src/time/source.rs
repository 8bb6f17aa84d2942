//! Time source abstraction for supporting both real-time and simulated time.
//!
//! The core loop never reads the system clock directly. It asks the installed
//! [`TimeSource`] for the current instant and for how long to wait between
//! ticks, which lets `minbar simulate` replay a whole day of prayer windows in
//! seconds while the scheduler code stays unaware of it.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

/// Global time source instance, defaults to RealTimeSource
static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Real tick period of the live display loop.
pub const REAL_TICK: StdDuration = StdDuration::from_secs(1);

/// Shortest tick period allowed for accelerated clocks.
const MIN_TICK: StdDuration = StdDuration::from_millis(10);

/// Simulated time advanced per tick in fast-forward mode.
const FAST_FORWARD_STEP: StdDuration = StdDuration::from_secs(1);

/// Trait for abstracting time operations
#[cfg_attr(test, mockall::automock)]
pub trait TimeSource: Send + Sync {
    /// Get the current instant
    fn now(&self) -> DateTime<Utc>;

    /// Real time to wait between two scheduler ticks
    fn tick_period(&self) -> StdDuration {
        REAL_TICK
    }

    /// Called by the core loop after every tick
    fn on_tick(&self) {}

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated time source for time-accelerated execution.
///
/// Two modes are supported:
/// - Linear acceleration: simulated time flows at `multiplier` times real time
/// - Fast-forward (`multiplier == 0.0`): every tick jumps one simulated second
pub struct SimulatedTimeSource {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    time_multiplier: f64,
    started_at: Instant,
    fast_forward_current: Mutex<DateTime<Utc>>,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source
    ///
    /// # Arguments
    /// * `start_time` - Starting instant for the simulation
    /// * `end_time` - Ending instant for the simulation
    /// * `multiplier` - Time acceleration (e.g., 60.0 = 1 simulated minute per real second).
    ///   0.0 means fast-forward mode, negative values fall back to 60.0
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, multiplier: f64) -> Self {
        let time_multiplier = if multiplier == 0.0 {
            0.0
        } else if multiplier < 0.0 || !multiplier.is_finite() {
            60.0
        } else {
            multiplier
        };

        Self {
            start_time,
            end_time,
            time_multiplier,
            started_at: Instant::now(),
            fast_forward_current: Mutex::new(start_time),
        }
    }

    fn is_fast_forward(&self) -> bool {
        self.time_multiplier == 0.0
    }

    fn current_time(&self) -> DateTime<Utc> {
        if self.is_fast_forward() {
            let guard = self
                .fast_forward_current
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            return *guard;
        }

        let simulated_secs = self.started_at.elapsed().as_secs_f64() * self.time_multiplier;
        let simulated_elapsed = ChronoDuration::milliseconds((simulated_secs * 1000.0) as i64);
        (self.start_time + simulated_elapsed).min(self.end_time)
    }

    /// Check if the simulation has reached its end time
    pub fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.current_time()
    }

    fn tick_period(&self) -> StdDuration {
        if self.is_fast_forward() {
            return MIN_TICK;
        }
        REAL_TICK.div_f64(self.time_multiplier).max(MIN_TICK)
    }

    fn on_tick(&self) {
        if !self.is_fast_forward() {
            return;
        }
        let mut guard = self
            .fast_forward_current
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let step = ChronoDuration::milliseconds(FAST_FORWARD_STEP.as_millis() as i64);
        *guard = (*guard + step).min(self.end_time);
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.is_ended()
    }
}

/// Initialize the global time source (call once at startup)
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

/// Check if the time source has been initialized
pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

/// The global time source, installing the real clock on first use
pub fn global() -> Arc<dyn TimeSource> {
    TIME_SOURCE
        .get_or_init(|| Arc::new(RealTimeSource))
        .clone()
}

/// Get the current time from the global time source
pub fn now() -> DateTime<Utc> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource)).now()
}

/// Check if we're running in simulation mode
pub fn is_simulated() -> bool {
    TIME_SOURCE
        .get_or_init(|| Arc::new(RealTimeSource))
        .is_simulated()
}

/// Parse a "YYYY-MM-DD HH:MM:SS" wall-clock string in the mosque timezone
pub fn parse_datetime_in_tz(s: &str, tz: Tz) -> Result<DateTime<Utc>, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("{s} does not exist in timezone {tz}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_fast_forward_advances_one_second_per_tick() {
        let start = instant("2024-07-08T09:00:00Z");
        let end = instant("2024-07-08T09:00:03Z");
        let source = SimulatedTimeSource::new(start, end, 0.0);

        assert_eq!(source.now(), start);
        source.on_tick();
        assert_eq!(source.now(), start + ChronoDuration::seconds(1));
        source.on_tick();
        source.on_tick();
        source.on_tick();
        assert_eq!(source.now(), end);
        assert!(TimeSource::is_ended(&source));
    }

    #[test]
    fn test_tick_period_scales_with_multiplier() {
        let start = instant("2024-07-08T09:00:00Z");
        let end = instant("2024-07-08T10:00:00Z");

        let slow = SimulatedTimeSource::new(start, end, 2.0);
        assert_eq!(slow.tick_period(), StdDuration::from_millis(500));

        let fast = SimulatedTimeSource::new(start, end, 3600.0);
        assert_eq!(fast.tick_period(), MIN_TICK);
    }

    #[test]
    fn test_linear_simulation_never_passes_end_time() {
        let start = instant("2024-07-08T09:00:00Z");
        let end = instant("2024-07-08T09:00:01Z");
        let source = SimulatedTimeSource::new(start, end, 1_000_000.0);
        std::thread::sleep(StdDuration::from_millis(5));
        assert_eq!(source.now(), end);
    }

    #[test]
    fn test_real_time_source_is_not_simulated() {
        let source = RealTimeSource;
        assert!(!source.is_simulated());
        assert!(!source.is_ended());
        assert_eq!(source.tick_period(), REAL_TICK);
    }

    #[test]
    fn test_parse_datetime_in_tz_converts_to_utc() {
        let parsed = parse_datetime_in_tz("2024-07-08 12:20:00", chrono_tz::Asia::Riyadh).unwrap();
        assert_eq!(parsed, instant("2024-07-08T09:20:00Z"));
    }

    #[test]
    fn test_parse_datetime_in_tz_rejects_bad_format() {
        assert!(parse_datetime_in_tz("08-07-2024 12:20", chrono_tz::Asia::Riyadh).is_err());
    }
}
