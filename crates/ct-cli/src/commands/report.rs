//! Report command for time spent per day and per category.
//!
//! This module implements `ct report`: it resolves the reporting window,
//! loads events (from the cache file when present, otherwise from Google
//! Calendar), runs the statistics engine and renders the result as text or
//! JSON.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use ct_core::{CivilDate, Event, EventList, RuleSet, SkipReason, Statistics, UNCATEGORIZED, compute};
use ct_gcal::{Client, cache};
use serde::Serialize;

use crate::Config;

/// Label printed for the uncategorized bucket.
const UNCATEGORIZED_LABEL: &str = "(uncategorized)";

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Name of the Google Calendar to read [default: primary].
    #[arg(long)]
    pub source: Option<String>,

    /// How many weeks before the current one to look at [default: 0].
    #[arg(long)]
    pub weeks: Option<u32>,

    /// Event cache file. If it exists, events are loaded from it instead of
    /// being fetched; otherwise fetched events are stored there.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Print day totals as decimal hours rather than `XhYmZs`.
    #[arg(long)]
    pub decimal_output: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// How durations are rendered in the text report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationStyle {
    /// `1h30m0s`
    Clock,
    /// `1.500000` hours
    DecimalHours,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub timezone: String,
    pub calendar: String,
    /// Category names in report order.
    pub categories: Vec<String>,
    pub stats: Statistics,
}

// ========== Period Date Calculation ==========

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // DST spring-forward gap at midnight: the day starts an hour later
        LocalResult::None => Local
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc)),
    }
}

/// Calculates the reporting window as a half-open interval: from Monday
/// 00:00 local time `weeks` weeks before the current week, to the Monday
/// 00:00 following the current week.
///
/// Fails when either boundary falls outside the representable date range.
pub fn week_window(today: NaiveDate, weeks: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let days_since_monday = today.weekday().num_days_from_monday();
    let this_monday = today
        .checked_sub_signed(Duration::days(i64::from(days_since_monday)))
        .context("current week starts before the earliest supported date")?;
    let first_monday = this_monday
        .checked_sub_signed(Duration::weeks(i64::from(weeks)))
        .with_context(|| format!("--weeks {weeks} is out of range"))?;
    let next_monday = this_monday
        .checked_add_signed(Duration::weeks(1))
        .context("current week ends after the latest supported date")?;

    Ok((
        local_midnight_to_utc(first_monday),
        local_midnight_to_utc(next_monday),
    ))
}

// ========== Event Loading ==========

/// Report options after applying command-line overrides to the config.
#[derive(Debug, Clone)]
struct Settings {
    calendar: String,
    weeks: u32,
    cache: Option<PathBuf>,
    style: DurationStyle,
    json: bool,
}

impl Settings {
    fn resolve(args: &ReportArgs, config: &Config) -> Self {
        let style = if args.decimal_output || config.decimal_output {
            DurationStyle::DecimalHours
        } else {
            DurationStyle::Clock
        };
        Self {
            calendar: args
                .source
                .clone()
                .unwrap_or_else(|| config.calendar.clone()),
            weeks: args.weeks.unwrap_or(config.weeks),
            cache: args.cache.clone().or_else(|| config.cache.clone()),
            style,
            json: args.json,
        }
    }
}

/// Loads events from the cache if it exists, otherwise fetches them and
/// populates the cache.
fn load_events(
    settings: &Settings,
    config: &Config,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<EventList> {
    if let Some(path) = settings.cache.as_deref() {
        if let Some(events) = cache::load(path)? {
            tracing::info!(path = %path.display(), "using cached events");
            return Ok(events);
        }
    }

    let events = fetch_events(settings, config, window)?;
    if let Some(path) = settings.cache.as_deref() {
        cache::store(path, &events)
            .with_context(|| format!("failed to write cache {}", path.display()))?;
    }
    Ok(events)
}

fn fetch_events(
    settings: &Settings,
    config: &Config,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
) -> Result<EventList> {
    let token = config.google.access_token.as_deref().context(
        "no Google access token configured (set google.access_token or CT_GOOGLE__ACCESS_TOKEN)",
    )?;
    let mut client = Client::new(token)?;
    if let Some(api_url) = config.google.api_url.as_deref() {
        client = client.with_base_url(api_url);
    }

    tracing::debug!(calendar = %settings.calendar, %start, %end, "fetching events");
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime
        .block_on(client.list_events(&settings.calendar, start, end))
        .context("failed to retrieve events")
}

// ========== Report Generation ==========

/// Runs the statistics engine over the events.
pub fn generate_report_data(
    events: &[Event],
    rules: &RuleSet,
    calendar: &str,
    window: (DateTime<Utc>, DateTime<Utc>),
    generated_at: DateTime<Utc>,
) -> ReportData {
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    ReportData {
        generated_at,
        period_start: window.0,
        period_end: window.1,
        timezone,
        calendar: calendar.to_string(),
        categories: rules.report_order().map(str::to_string).collect(),
        stats: compute(events, rules),
    }
}

// ========== Duration Formatting ==========

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Formats a duration as `XhYmZs`, dropping leading zero units.
///
/// Seconds keep their fractional part (`1.5s`, `2m0.25s`). Spans under a
/// second use the largest fitting unit (`500ms`, `1.5ms`, `250µs`, `300ns`).
/// Negative durations carry a leading `-`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = i128::from(duration.num_seconds()) * 1_000_000_000
        + i128::from(duration.subsec_nanos());
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let nanos = nanos.unsigned_abs();

    if nanos < NANOS_PER_MICRO {
        return format!("{sign}{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{sign}{}µs", with_fraction(nanos, NANOS_PER_MICRO, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{sign}{}ms", with_fraction(nanos, NANOS_PER_MILLI, 6));
    }

    let total_secs = nanos / NANOS_PER_SEC;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let sub_minute = (total_secs % 60) * NANOS_PER_SEC + nanos % NANOS_PER_SEC;
    let seconds = with_fraction(sub_minute, NANOS_PER_SEC, 9);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

/// `value / scale` with the remainder as trailing-zero-trimmed decimals.
fn with_fraction(value: u128, scale: u128, width: usize) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Formats a duration as fractional hours with six decimal places.
#[allow(clippy::cast_precision_loss)]
pub fn format_decimal_hours(duration: Duration) -> String {
    format!("{:.6}", duration.num_milliseconds() as f64 / 3_600_000.0)
}

fn format_total(duration: Duration, style: DurationStyle) -> String {
    match style {
        DurationStyle::Clock => format_duration(duration),
        DurationStyle::DecimalHours => format_decimal_hours(duration),
    }
}

fn category_label(name: &str) -> &str {
    if name == UNCATEGORIZED {
        UNCATEGORIZED_LABEL
    } else {
        name
    }
}

/// One line per event: raw start, duration, summary.
/// Events without a usable interval get a `?` placeholder for the duration.
fn format_event_line(event: &Event) -> String {
    let start = event.start_text().unwrap_or("?");
    match event.interval() {
        Ok(interval) => format!(
            "{start} {:>10}  {}",
            format_duration(interval.duration()),
            event.summary
        ),
        Err(reason) => format!("{start} {:>10}  {} ({reason})", "?", event.summary),
    }
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData, style: DurationStyle) -> Result<String> {
    use std::fmt::Write as _;

    let stats = &data.stats;
    let mut output = String::new();

    if !stats.day_totals.is_empty() {
        writeln!(output, "Time spent per day:")?;
    }
    for (day, total) in stats.day_totals.iter_sorted() {
        writeln!(output, "{day}: {}", format_total(total, style))?;
    }

    if !data.categories.is_empty() {
        writeln!(output, "Time spent per category:")?;
    }
    for name in &data.categories {
        let label = category_label(name);
        match stats.category_percentage(name) {
            Some(pct) => writeln!(output, "{pct:>2}% {label}")?,
            // No contributing time at all: there is nothing to divide by
            None => writeln!(output, "--% {label}")?,
        }
    }

    if !stats.unrecognized.is_empty() {
        writeln!(output, "Unrecognized:")?;
    }
    for event in &stats.unrecognized {
        writeln!(output, "{}", format_event_line(event))?;
    }

    if !stats.skipped.is_empty() {
        writeln!(output, "Skipped:")?;
    }
    for skipped in &stats.skipped {
        writeln!(output, "{}", format_event_line(&skipped.event))?;
    }

    Ok(output)
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub timezone: String,
    pub calendar: String,
    pub period: JsonPeriod,
    pub total_ms: i64,
    pub days: Vec<JsonDay>,
    pub categories: Vec<JsonCategory>,
    pub unrecognized: Vec<JsonEvent>,
    pub skipped: Vec<JsonEvent>,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct JsonDay {
    pub date: CivilDate,
    pub total_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct JsonCategory {
    pub name: String,
    pub total_ms: i64,
    /// `None` when no event contributed any time.
    pub percent: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct JsonEvent {
    pub id: Option<String>,
    pub summary: String,
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl JsonEvent {
    fn from_event(event: &Event) -> Self {
        let interval = event.interval();
        Self {
            id: event.id.clone(),
            summary: event.summary.clone(),
            start: event.start_text().map(str::to_string),
            duration_ms: interval.ok().map(|i| i.duration().num_milliseconds()),
            reason: interval.err(),
        }
    }
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let stats = &data.stats;

    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: data.timezone.clone(),
        calendar: data.calendar.clone(),
        period: JsonPeriod {
            start: data.period_start.to_rfc3339(),
            end: data.period_end.to_rfc3339(),
        },
        total_ms: stats.grand_total().num_milliseconds(),
        days: stats
            .day_totals
            .iter_sorted()
            .map(|(day, total)| JsonDay {
                date: day,
                total_ms: total.num_milliseconds(),
            })
            .collect(),
        categories: data
            .categories
            .iter()
            .map(|name| JsonCategory {
                name: name.clone(),
                total_ms: stats.category_totals.duration_of(name).num_milliseconds(),
                percent: stats.category_percentage(name),
            })
            .collect(),
        unrecognized: stats.unrecognized.iter().map(JsonEvent::from_event).collect(),
        skipped: stats
            .skipped
            .iter()
            .map(|s| JsonEvent::from_event(&s.event))
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(writer: &mut W, args: &ReportArgs, config: &Config) -> Result<()> {
    let settings = Settings::resolve(args, config);
    let rules = config.rules().context("invalid category configuration")?;

    let today = Local::now().date_naive();
    let window = week_window(today, settings.weeks)?;
    let events = load_events(&settings, config, window)?;

    if events.is_empty() && !settings.json {
        writeln!(writer, "No events found.")?;
        return Ok(());
    }

    let data = generate_report_data(
        &events.items,
        &rules,
        &settings.calendar,
        window,
        Utc::now(),
    );
    if settings.json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data, settings.style)?)?;
    }
    Ok(())
}
