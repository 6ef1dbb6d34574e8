//! Daily statistics over decoded snapshot history: per-field min/max/avg and
//! trapezoidal energy integration. All queries are scoped to a UTC calendar
//! day, `[00:00:00.000, 23:59:59.999]`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::utils::Utils;

/// Anything carrying a capture timestamp; both snapshot kinds implement this.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Extracts one named numeric field from a snapshot, or None when the field
/// was absent from the decoded frame.
pub type FieldFn<T> = fn(&T) -> Option<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// The inclusive UTC day window for a date.
pub fn day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
        .and_utc();
    (start, end)
}

pub fn in_day<T: Timestamped>(item: &T, date: NaiveDate) -> bool {
    let (start, end) = day_window(date);
    let ts = item.timestamp();
    ts >= start && ts <= end
}

/// Min/max/mean for each named field over the snapshots captured on `date`,
/// rounded to 3 decimals. Fields with no qualifying values are omitted, not
/// zero-filled, so re-running over unchanged history is idempotent.
pub fn daily_aggregates<'a, T, I>(
    history: I,
    fields: &[(&'static str, FieldFn<T>)],
    date: NaiveDate,
) -> BTreeMap<&'static str, Aggregate>
where
    T: Timestamped + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let day: Vec<&T> = history.into_iter().filter(|s| in_day(*s, date)).collect();

    let mut out = BTreeMap::new();
    for (name, field) in fields {
        let values: Vec<f64> = day.iter().filter_map(|s| field(s)).collect();
        if values.is_empty() {
            continue;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;

        out.insert(
            *name,
            Aggregate {
                min: Utils::round(min, 3),
                max: Utils::round(max, 3),
                avg: Utils::round(avg, 3),
            },
        );
    }

    out
}

/// Integrate a power field over the day by the trapezoidal rule, in
/// watt-hours rounded to 2 decimals. Uses wall-clock deltas between readings
/// since snapshots arrive at irregular intervals; fewer than two qualifying
/// points yields 0.
pub fn daily_energy<'a, T, I>(history: I, load: FieldFn<T>, date: NaiveDate) -> f64
where
    T: Timestamped + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut points: Vec<(DateTime<Utc>, f64)> = history
        .into_iter()
        .filter(|s| in_day(*s, date))
        .filter_map(|s| load(s).map(|w| (s.timestamp(), w)))
        .collect();
    points.sort_by_key(|(ts, _)| *ts);

    let mut total_wh = 0.0;
    for pair in points.windows(2) {
        let (prev_ts, prev_w) = pair[0];
        let (curr_ts, curr_w) = pair[1];
        let hours = (curr_ts - prev_ts).num_milliseconds() as f64 / 3_600_000.0;
        total_wh += (prev_w + curr_w) / 2.0 * hours;
    }

    Utils::round(total_wh, 2)
}
