//! Core application logic and the main loop.
//!
//! [`Core`] hosts the scheduler on a single-threaded tokio runtime. One
//! `select!` multiplexes:
//!
//! - the tick timer (1 s for the real clock, scaled in simulations)
//! - the optional demo auto-advance timer
//! - results of background schedule refreshes
//! - messages from the signal thread and the config watcher
//!
//! Schedule refreshes run as spawned tasks and never block ticking. Each one
//! carries a generation number so a stale result can never replace a newer
//! schedule.

pub mod demo;
pub mod refresh;
pub mod scheduler;
pub mod screen;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Interval, MissedTickBehavior, interval, interval_at};

use crate::{
    common::utils,
    config::{self, Config, validation::find_window_overlaps},
    display::{DisplayFrame, Renderer},
    io::{
        lock::LockFile,
        signals::{SignalMessage, SignalState},
    },
    prayer::{PrayerName, PrayerTime},
    schedule::{ScheduleCache, ScheduleProvider, ScheduleRepository, TodaysSchedule, cache_path},
    time::source::TimeSource,
};
use refresh::RefreshTracker;
use scheduler::{ClockMode, Scheduler};

/// Parameters for creating a Core instance.
pub(crate) struct CoreParams<P> {
    pub config: Config,
    pub provider: P,
    pub signal_state: SignalState,
    pub renderer: Box<dyn Renderer>,
    pub time_source: Arc<dyn TimeSource>,
    pub mode: ClockMode,
    /// Auto-advance period for demo mode; `None` advances on SIGUSR1 only
    pub demo_interval: Option<Duration>,
    pub debug_enabled: bool,
    pub lock: Option<LockFile>,
}

/// Outcome of one background refresh.
#[derive(Debug)]
struct RefreshResult {
    generation: u64,
    todays: TodaysSchedule,
}

/// Main loop host.
pub(crate) struct Core<P> {
    state: CoreState<P>,
    running: Arc<AtomicBool>,
    signal_receiver: UnboundedReceiver<SignalMessage>,
    refresh_receiver: UnboundedReceiver<RefreshResult>,
    // Keeps the signal channel open when no other sender is alive
    _signal_sender: UnboundedSender<SignalMessage>,
    demo_interval: Option<Duration>,
    _lock: Option<LockFile>,
}

/// Everything the loop mutates between iterations.
struct CoreState<P> {
    config: Arc<Config>,
    repository: Arc<ScheduleRepository<P>>,
    scheduler: Scheduler,
    renderer: Box<dyn Renderer>,
    time_source: Arc<dyn TimeSource>,
    tracker: RefreshTracker,
    current: TodaysSchedule,
    tomorrow: Option<(NaiveDate, Option<PrayerTime>)>,
    refresh_sender: UnboundedSender<RefreshResult>,
    debug_enabled: bool,
}

impl<P> Core<P>
where
    P: ScheduleProvider + Clone + 'static,
{
    /// Create a Core and compute the startup schedule without network I/O.
    pub fn new(params: CoreParams<P>) -> Self {
        let config = Arc::new(params.config);
        let cache = Arc::new(ScheduleCache::for_config(&config));
        let repository = Arc::new(ScheduleRepository::new(params.provider, cache));

        let now = params.time_source.now();
        let tz = config.tz();
        let today = now.with_timezone(&tz).date_naive();
        let current = repository.peek(&config, today);

        let (refresh_sender, refresh_receiver) = unbounded_channel();
        let SignalState {
            running,
            signal_sender,
            signal_receiver,
        } = params.signal_state;

        let state = CoreState {
            tracker: RefreshTracker::new(now, tz),
            scheduler: Scheduler::new(Arc::clone(&params.time_source), params.mode),
            config,
            repository,
            renderer: params.renderer,
            time_source: params.time_source,
            current,
            tomorrow: None,
            refresh_sender,
            debug_enabled: params.debug_enabled,
        };

        Self {
            state,
            running,
            signal_receiver,
            refresh_receiver,
            _signal_sender: signal_sender,
            demo_interval: params.demo_interval,
            _lock: params.lock,
        }
    }

    /// Run until shutdown or the end of a simulation.
    pub async fn run(self) -> Result<()> {
        let Core {
            mut state,
            running,
            mut signal_receiver,
            mut refresh_receiver,
            _signal_sender,
            demo_interval,
            _lock,
        } = self;

        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!("Base directory: {}", utils::private_path(&custom_dir));
        }
        state.log_schedule_source();
        state.warn_window_overlaps();

        let mut ticker = interval(state.time_source.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut demo_ticker = demo_interval.filter(|_| state.scheduler.is_demo()).map(|period| {
            let mut timer = interval_at(tokio::time::Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });

        state.start_refresh();
        state.render();

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = ticker.tick() => {
                    state.time_source.on_tick();
                    if state.time_source.is_ended() {
                        log_block_start!("Simulation reached its end time");
                        break;
                    }
                    state.on_tick();
                }
                _ = next_demo_tick(&mut demo_ticker) => {
                    state.advance_demo();
                }
                Some(result) = refresh_receiver.recv() => {
                    state.apply_refresh(result);
                }
                message = signal_receiver.recv() => match message {
                    Some(SignalMessage::Shutdown) | None => break,
                    Some(SignalMessage::DemoAdvance) => state.advance_demo(),
                    Some(SignalMessage::Reload) => state.reload(),
                },
            }
        }

        state.renderer.shutdown();
        log_block_start!("Shutting down minbar...");
        log_end!();
        Ok(())
    }
}

impl<P> CoreState<P>
where
    P: ScheduleProvider + Clone + 'static,
{
    fn on_tick(&mut self) {
        let now = self.time_source.now();
        let tz = self.config.tz();

        let rollover = self.tracker.take_rollover(now, tz);
        let stale = self.current.schedule.date() != now.with_timezone(&tz).date_naive();
        if rollover || (stale && !self.tracker.is_in_flight()) {
            if self.debug_enabled {
                log_pipe!();
                log_debug!(
                    "Refreshing schedule ({})",
                    if rollover { "daily rollover" } else { "date changed" }
                );
                log_indented!(
                    "Next daily refresh at {}",
                    self.tracker
                        .next_rollover()
                        .with_timezone(&tz)
                        .format("%Y-%m-%d %H:%M")
                );
            }
            self.start_refresh();
        }

        // Demo screens only change on request
        if !self.scheduler.is_demo() {
            self.render();
        }
    }

    /// Resolve today's schedule in the background.
    fn start_refresh(&mut self) {
        let generation = self.tracker.begin();
        let repository = Arc::clone(&self.repository);
        let config = Arc::clone(&self.config);
        let now = self.time_source.now();
        let sender = self.refresh_sender.clone();

        tokio::spawn(async move {
            let todays = repository.todays_schedule(&config, now).await;
            let _ = sender.send(RefreshResult { generation, todays });
        });
    }

    fn apply_refresh(&mut self, result: RefreshResult) {
        if !self.tracker.accept(result.generation) {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Discarding superseded refresh #{}", result.generation);
            }
            return;
        }

        let changed = result.todays.schedule != self.current.schedule
            || result.todays.hijri_label != self.current.hijri_label;
        self.current = result.todays;
        self.tomorrow = None;

        if changed {
            self.log_schedule_source();
            self.warn_window_overlaps();
        }
        self.render();
    }

    fn advance_demo(&mut self) {
        if self.scheduler.request_demo_advance() {
            self.render();
        } else if self.debug_enabled {
            log_pipe!();
            log_debug!("Ignoring demo advance outside demo mode");
        }
    }

    /// Swap in a freshly loaded configuration; keep the old one on error.
    fn reload(&mut self) {
        let new_config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                log_pipe!();
                log_error!("Failed to reload config: {e:#}");
                log_indented!("Continuing with previous configuration");
                return;
            }
        };

        if new_config == *self.config {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Configuration unchanged, skipping reload");
            }
            return;
        }

        let new_cache_path = cache_path(&new_config);
        if new_config.tz() != self.config.tz()
            || new_cache_path.as_deref() != self.repository.cache().path()
        {
            let cache = Arc::new(ScheduleCache::for_config(&new_config));
            self.repository = Arc::new(self.repository.with_cache(cache));
        }

        self.config = Arc::new(new_config);
        self.config.log_config();
        self.renderer.reconfigure(&self.config);

        let now = self.time_source.now();
        self.tracker.rearm(now, self.config.tz());

        // Offsets apply at once; location changes arrive with the refresh
        self.current.schedule = Arc::new(
            self.current
                .schedule
                .with_congregation_offsets(&self.config),
        );
        self.tomorrow = None;

        self.start_refresh();
        self.render();
    }

    fn render(&mut self) {
        let snapshot = self.scheduler.snapshot(&self.current.schedule, &self.config);
        let tomorrow_fajr = if snapshot.next_upcoming.is_none() && snapshot.active_prayer.is_none()
        {
            self.tomorrow_fajr()
        } else {
            None
        };

        let frame = DisplayFrame::from_snapshot(
            snapshot,
            self.current.hijri_label.clone(),
            tomorrow_fajr,
            self.scheduler.is_demo(),
        );
        self.renderer.render(&frame);
    }

    /// Fajr of the day after the current schedule, computed once per day.
    fn tomorrow_fajr(&mut self) -> Option<PrayerTime> {
        let date = self.current.schedule.date();
        let tomorrow = date.checked_add_days(Days::new(1))?;

        if let Some((cached_date, fajr)) = &self.tomorrow
            && *cached_date == tomorrow
        {
            return fajr.clone();
        }

        let fajr = Some(
            self.repository
                .peek(&self.config, tomorrow)
                .schedule
                .get(PrayerName::Fajr)
                .clone(),
        );
        self.tomorrow = Some((tomorrow, fajr.clone()));
        fajr
    }

    fn log_schedule_source(&self) {
        log_block_start!(
            "Using prayer times for {} from {}",
            self.current.schedule.date(),
            self.current.source
        );
    }

    fn warn_window_overlaps(&self) {
        for (earlier, later) in find_window_overlaps(&self.current.schedule, &self.config) {
            log_warning!(
                "Activity window of {} overlaps {} on {}",
                earlier,
                later,
                self.current.schedule.date()
            );
        }
    }
}

async fn next_demo_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::demo::DemoSequencer;
    use crate::core::screen::ScreenState;
    use crate::display::MockRenderer;
    use crate::schedule::{ProviderError, RawWindow};
    use crate::time::source::MockTimeSource;
    use chrono::{DateTime, TimeZone, Utc};
    use chrono_tz::Asia::Riyadh;

    #[derive(Clone)]
    struct OfflineProvider;

    impl ScheduleProvider for OfflineProvider {
        async fn fetch_window(
            &self,
            _config: &Config,
            _start: NaiveDate,
            _day_count: u32,
        ) -> Result<RawWindow, ProviderError> {
            Err(ProviderError::Setup("offline".to_string()))
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Riyadh
            .with_ymd_and_hms(2024, 7, 8, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn clock(now: DateTime<Utc>, ended: bool) -> Arc<dyn TimeSource> {
        let mut clock = MockTimeSource::new();
        clock.expect_now().returning(move || now);
        clock
            .expect_tick_period()
            .returning(|| Duration::from_millis(10));
        clock.expect_on_tick().returning(|| ());
        clock.expect_is_ended().returning(move || ended);
        clock.expect_is_simulated().returning(|| true);
        Arc::new(clock)
    }

    fn build_core(
        renderer: MockRenderer,
        time_source: Arc<dyn TimeSource>,
        mode: ClockMode,
    ) -> (Core<OfflineProvider>, UnboundedSender<SignalMessage>) {
        let signal_state = SignalState::detached();
        let sender = signal_state.signal_sender.clone();
        let config = Config {
            timezone: Some("Asia/Riyadh".to_string()),
            ..Config::default()
        };
        let mut core = Core::new(CoreParams {
            config,
            provider: OfflineProvider,
            signal_state,
            renderer: Box::new(renderer),
            time_source,
            mode,
            demo_interval: None,
            debug_enabled: false,
            lock: None,
        });
        // Keep tests away from the user's state directory
        core.state.repository = Arc::new(
            core.state
                .repository
                .with_cache(Arc::new(ScheduleCache::in_memory(Riyadh))),
        );
        (core, sender)
    }

    #[tokio::test]
    async fn test_loop_stops_when_simulation_ends() {
        let mut renderer = MockRenderer::new();
        renderer.expect_render().returning(|_| ());
        renderer.expect_shutdown().times(1).returning(|| ());

        let (core, _sender) = build_core(renderer, clock(at(12, 0), true), ClockMode::Live);
        core.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_message_stops_loop() {
        let mut renderer = MockRenderer::new();
        renderer.expect_render().returning(|_| ());
        renderer.expect_shutdown().times(1).returning(|| ());

        let (core, sender) = build_core(renderer, clock(at(12, 0), false), ClockMode::Live);
        sender.send(SignalMessage::Shutdown).unwrap();
        core.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_demo_advance_renders_next_screen() {
        let mut renderer = MockRenderer::new();
        renderer
            .expect_render()
            .withf(|frame| frame.demo && frame.screen_state == ScreenState::Dashboard)
            .returning(|_| ());
        renderer
            .expect_render()
            .withf(|frame| frame.demo && frame.screen_state == ScreenState::PreCall)
            .times(1..)
            .returning(|_| ());
        renderer.expect_shutdown().returning(|| ());

        let (core, sender) = build_core(
            renderer,
            clock(at(12, 0), false),
            ClockMode::Demo(DemoSequencer::new()),
        );
        sender.send(SignalMessage::DemoAdvance).unwrap();
        sender.send(SignalMessage::Shutdown).unwrap();
        core.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        let mut renderer = MockRenderer::new();
        renderer.expect_render().returning(|_| ());

        let (mut core, _sender) = build_core(renderer, clock(at(12, 0), false), ClockMode::Live);
        let state = &mut core.state;

        let stale = state.tracker.begin();
        let current = state.tracker.begin();
        let mut todays = state.repository.peek(&state.config, state.current.schedule.date());
        todays.hijri_label = "stale".to_string();

        state.apply_refresh(RefreshResult {
            generation: stale,
            todays: todays.clone(),
        });
        assert_ne!(state.current.hijri_label, "stale");

        todays.hijri_label = "fresh".to_string();
        state.apply_refresh(RefreshResult {
            generation: current,
            todays,
        });
        assert_eq!(state.current.hijri_label, "fresh");
    }

    #[tokio::test]
    async fn test_tick_past_rollover_starts_refresh_and_rearms() {
        let mut renderer = MockRenderer::new();
        renderer.expect_render().returning(|_| ());

        let (mut core, _sender) = build_core(renderer, clock(at(12, 0), false), ClockMode::Live);
        let state = &mut core.state;
        state.debug_enabled = true;
        state.tracker = RefreshTracker::new(at(0, 0), Riyadh);

        state.on_tick();

        assert!(state.tracker.is_in_flight());
        let tomorrow = Riyadh.with_ymd_and_hms(2024, 7, 9, 0, 5, 0).unwrap();
        assert_eq!(state.tracker.next_rollover(), tomorrow.with_timezone(&Utc));
    }

    #[tokio::test]
    async fn test_tomorrow_fajr_shown_after_isha() {
        let mut renderer = MockRenderer::new();
        renderer
            .expect_render()
            .withf(|frame| {
                frame.screen_state == ScreenState::Dashboard
                    && frame.next_upcoming.is_none()
                    && frame
                        .tomorrow_fajr
                        .as_ref()
                        .is_some_and(|fajr| fajr.instant > frame.current_time)
            })
            .times(1)
            .returning(|_| ());

        let (mut core, _sender) = build_core(renderer, clock(at(23, 30), false), ClockMode::Live);
        core.state.render();
    }
}
