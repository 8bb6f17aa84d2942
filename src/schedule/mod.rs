//! Schedule acquisition: remote provider, persistent cache and the repository
//! that combines them with the offline calculator.

pub mod cache;
pub mod provider;
pub mod repository;

pub use cache::{CacheWindow, ScheduleCache, ScheduleCacheEntry, cache_path};
pub use provider::{AladhanProvider, ProviderError, RawDay, RawWindow, ScheduleProvider};
pub use repository::{ScheduleRepository, ScheduleSource, TodaysSchedule, fallback_schedule};
