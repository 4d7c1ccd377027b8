use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::Serialize;

use fat_core::FoodDb;
use fat_core::models::{Stats, to_datetime};
use fat_core::service;

use crate::LogArgs;
use crate::config::Config;

/// Load the configured or given logs and cut them to the requested window.
///
/// Returns the view together with the instant used as "now".
pub(crate) fn load_window(config: &Config, args: &LogArgs) -> Result<(FoodDb, DateTime<Local>)> {
    let now = Local::now();
    let files = config.resolve_files(&args.files)?;
    let db = service::load_paths(&files, epoch_seconds(&now))?;

    let begin = match args.begin.as_deref() {
        Some(s) => parse_when(s, &now)?,
        None => db.begin(),
    };
    let end = match args.end.as_deref() {
        Some(s) => parse_when(s, &now)?,
        None => db.end(),
    };
    if begin > end {
        bail!("Window begins after it ends ({} > {})", format_time(begin), format_time(end));
    }
    tracing::debug!(begin, end, files = files.len(), "loaded food log");
    Ok((db.filtered_range(begin, end), now))
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn epoch_seconds<Tz: TimeZone>(dt: &DateTime<Tz>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6
}

/// Epoch seconds of midnight on the day of `now`, shifted by `days`.
pub(crate) fn midnight<Tz: TimeZone>(now: &DateTime<Tz>, days: i64) -> Result<f64> {
    let date = now.date_naive() + Duration::days(days);
    local_instant(&now.timezone(), start_of(date))
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn local_instant<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<f64> {
    let dt = tz
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("{naive} does not exist in the local time zone"))?;
    Ok(epoch_seconds(&dt))
}

/// Parse a point in time relative to `now`.
///
/// Accepts `now`, `today`, `yesterday`, `tomorrow`, `N days ago`,
/// `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` (local) and `@<epoch seconds>`.
pub(crate) fn parse_when<Tz: TimeZone>(s: &str, now: &DateTime<Tz>) -> Result<f64> {
    let s = s.trim();
    match s.to_lowercase().as_str() {
        "now" => return Ok(epoch_seconds(now)),
        "today" => return midnight(now, 0),
        "yesterday" => return midnight(now, -1),
        "tomorrow" => return midnight(now, 1),
        _ => {}
    }

    if let Some(epoch) = s.strip_prefix('@') {
        let secs: f64 = epoch
            .parse()
            .with_context(|| format!("Invalid epoch time '{s}'"))?;
        if !secs.is_finite() {
            bail!("Invalid epoch time '{s}': must be a finite number of seconds");
        }
        return Ok(secs);
    }

    if let Some(n) = s
        .strip_suffix(" days ago")
        .or_else(|| s.strip_suffix(" day ago"))
    {
        let days: i64 = n
            .trim()
            .parse()
            .with_context(|| format!("Invalid day count in '{s}'"))?;
        #[allow(clippy::cast_precision_loss)]
        let back = days as f64 * 86_400.0;
        return Ok(epoch_seconds(now) - back);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local_instant(&now.timezone(), start_of(date));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local_instant(&now.timezone(), naive);
        }
    }

    bail!(
        "Invalid time '{s}'. Use now/today/yesterday/tomorrow, 'N days ago', YYYY-MM-DD[ HH:MM[:SS]] or @<epoch>"
    )
}

pub(crate) fn format_time(secs: f64) -> String {
    to_datetime(secs, &Local).map_or_else(
        || format!("@{secs}"),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_stats(title: &str, stats: &Stats) {
    println!("{title:^15}");
    for line in stats_lines(stats) {
        println!("{line}");
    }
}

pub(crate) fn stats_lines(stats: &Stats) -> [String; 4] {
    let kcal = no_neg_zero(stats.kcal);
    [
        format!("Calories {kcal:6.1}"),
        format!("Carbs   {:6.1}%", no_neg_zero(stats.carbs_pct)),
        format!("Fat     {:6.1}%", no_neg_zero(stats.fat_pct)),
        format!("Protein {:6.1}%", no_neg_zero(stats.protein_pct)),
    ]
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
