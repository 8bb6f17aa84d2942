//! Remote prayer-time provider.
//!
//! Fetches a window of consecutive days from an AlAdhan-compatible API, one
//! request per day issued concurrently. Every failure is folded into a single
//! [`ProviderError`] so callers can fall back without inspecting details.

use chrono::{Duration, NaiveDate, NaiveTime};
use regex::Regex;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::common::constants::*;
use crate::config::Config;
use crate::prayer::PrayerName;

/// Provider failure; any one failing day fails the whole window.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {status} for {date}")]
    Status { date: NaiveDate, status: u16 },

    #[error("provider rejected request for {date}: code {code} ({status})")]
    Api {
        date: NaiveDate,
        code: i64,
        status: String,
    },

    #[error("malformed payload for {date}: {reason}")]
    Malformed { date: NaiveDate, reason: String },

    #[error("provider setup failed: {0}")]
    Setup(String),

    #[error("request task failed: {0}")]
    Task(String),
}

/// One fetched day before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDay {
    /// Wall-clock times in schedule order, calendar adjustment applied
    pub timings: [NaiveTime; 6],
    pub hijri_label: Option<String>,
    /// Timezone the provider computed the times for
    pub reported_timezone: Option<String>,
}

pub type RawWindow = BTreeMap<NaiveDate, RawDay>;

/// Source of authoritative prayer times.
pub trait ScheduleProvider: Send + Sync {
    /// Fetch `day_count` consecutive days starting at `start`.
    fn fetch_window(
        &self,
        config: &Config,
        start: NaiveDate,
        day_count: u32,
    ) -> impl Future<Output = Result<RawWindow, ProviderError>> + Send;
}

// # AlAdhan payload

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    status: serde_json::Value,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DayData {
    timings: HashMap<String, String>,
    date: Option<DateInfo>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct DateInfo {
    hijri: Option<HijriInfo>,
}

#[derive(Debug, Deserialize)]
struct HijriInfo {
    day: String,
    month: HijriMonth,
    year: String,
}

#[derive(Debug, Deserialize)]
struct HijriMonth {
    ar: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    timezone: Option<String>,
}

/// Provider backed by the AlAdhan `timingsByCity` endpoint.
#[derive(Debug, Clone)]
pub struct AladhanProvider {
    client: Client,
    timing_pattern: Regex,
    max_retries: u32,
}

impl AladhanProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("minbar/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .connect_timeout(StdDuration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(StdDuration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        let timing_pattern = Regex::new(r"^\s*(\d{1,2}):(\d{2})")
            .map_err(|e| ProviderError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            timing_pattern,
            max_retries: HTTP_MAX_RETRIES,
        })
    }

    /// Fetch and decode a single day.
    async fn fetch_day(
        client: Client,
        timing_pattern: Regex,
        request: DayRequest,
        max_retries: u32,
    ) -> Result<(NaiveDate, RawDay), ProviderError> {
        let date = request.date;
        let body = send_with_retries(&client, &request, max_retries).await?;
        let day = parse_day(&body, date, &timing_pattern, request.calendar_adjustment)?;
        Ok((date, day))
    }
}

impl ScheduleProvider for AladhanProvider {
    async fn fetch_window(
        &self,
        config: &Config,
        start: NaiveDate,
        day_count: u32,
    ) -> Result<RawWindow, ProviderError> {
        let mut tasks = JoinSet::new();

        for date in start.iter_days().take(day_count as usize) {
            let request = DayRequest::new(config, date);
            tasks.spawn(Self::fetch_day(
                self.client.clone(),
                self.timing_pattern.clone(),
                request,
                self.max_retries,
            ));
        }

        let mut window = RawWindow::new();
        while let Some(joined) = tasks.join_next().await {
            let (date, day) = joined.map_err(|e| ProviderError::Task(e.to_string()))??;
            window.insert(date, day);
        }

        Ok(window)
    }
}

/// Owned request parameters for one day.
#[derive(Debug, Clone)]
struct DayRequest {
    url: String,
    query: [(&'static str, String); 4],
    date: NaiveDate,
    calendar_adjustment: i64,
}

impl DayRequest {
    fn new(config: &Config, date: NaiveDate) -> Self {
        Self {
            url: format!(
                "{}/timingsByCity/{}",
                config.api_base_url(),
                date.format("%d-%m-%Y")
            ),
            query: [
                ("city", config.city().to_string()),
                ("country", config.country().to_string()),
                ("method", config.calculation_method().to_string()),
                ("school", config.school().to_string()),
            ],
            date,
            calendar_adjustment: config.calendar_adjustment(),
        }
    }
}

/// GET with bounded retries on transport errors and server-side statuses.
async fn send_with_retries(
    client: &Client,
    request: &DayRequest,
    max_retries: u32,
) -> Result<String, ProviderError> {
    let mut attempt = 0;
    loop {
        let result = client.get(&request.url).query(&request.query).send().await;

        let retryable = match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.text().await?);
                }
                if !is_retryable(status) || attempt >= max_retries {
                    return Err(ProviderError::Status {
                        date: request.date,
                        status: status.as_u16(),
                    });
                }
                ProviderError::Status {
                    date: request.date,
                    status: status.as_u16(),
                }
            }
            Err(e) => {
                if attempt >= max_retries {
                    return Err(ProviderError::Http(e));
                }
                ProviderError::Http(e)
            }
        };

        attempt += 1;
        log_debug!(
            "Retrying {} (attempt {}/{}): {}",
            request.date,
            attempt,
            max_retries,
            retryable
        );
        tokio::time::sleep(StdDuration::from_millis(
            HTTP_RETRY_BACKOFF_MS * u64::from(attempt),
        ))
        .await;
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Decode one `timingsByCity` response body.
fn parse_day(
    body: &str,
    date: NaiveDate,
    timing_pattern: &Regex,
    calendar_adjustment: i64,
) -> Result<RawDay, ProviderError> {
    let malformed = |reason: String| ProviderError::Malformed { date, reason };

    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    if envelope.code != 200 {
        let status = match envelope.status {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(ProviderError::Api {
            date,
            code: envelope.code,
            status,
        });
    }

    let data: DayData = serde_json::from_value(envelope.data)
        .map_err(|e| malformed(format!("unexpected data: {e}")))?;

    let mut timings = [NaiveTime::MIN; 6];
    for (slot, name) in timings.iter_mut().zip(PrayerName::ALL) {
        let key = name.display_name();
        let raw = data
            .timings
            .get(key)
            .ok_or_else(|| malformed(format!("missing timing {key}")))?;
        let time = parse_timing(timing_pattern, raw)
            .ok_or_else(|| malformed(format!("unparseable {key} timing '{raw}'")))?;

        *slot = if name.is_congregational() {
            adjust_within_day(time, calendar_adjustment)
        } else {
            time
        };
    }

    let hijri_label = data
        .date
        .and_then(|d| d.hijri)
        .and_then(|h| format_hijri_label(&h));

    Ok(RawDay {
        timings,
        hijri_label,
        reported_timezone: data.meta.and_then(|m| m.timezone),
    })
}

/// Shift `time` by `minutes`, saturating at the edges of the day instead of
/// wrapping past midnight.
fn adjust_within_day(time: NaiveTime, minutes: i64) -> NaiveTime {
    let (adjusted, overflow) = time.overflowing_add_signed(Duration::minutes(minutes));
    match overflow.signum() {
        0 => adjusted,
        1 => NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(adjusted),
        _ => NaiveTime::MIN,
    }
}

/// Extract the `HH:MM` prefix of a timing such as `"04:38 (+03)"`.
fn parse_timing(pattern: &Regex, raw: &str) -> Option<NaiveTime> {
    let captures = pattern.captures(raw)?;
    let hour = captures.get(1)?.as_str().parse().ok()?;
    let minute = captures.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn format_hijri_label(hijri: &HijriInfo) -> Option<String> {
    let day: u32 = hijri.day.trim().parse().ok()?;
    Some(format!(
        "{} {} {} هـ",
        day,
        hijri.month.ar.trim(),
        hijri.year.trim()
    ))
}
