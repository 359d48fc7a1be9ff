// storefront/src/services/periods.rs

//! UTC calendar boundaries used by dashboards, reports and affiliate stats.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

fn midnight(date: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
  midnight(now.date_naive())
}

pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
  month_start(now.year(), now.month() as i32)
}

/// First instant of `month` (1-based) in `year`; out-of-range months roll over.
fn month_start(year: i32, month: i32) -> DateTime<Utc> {
  let zero_based = year * 12 + month - 1;
  let (y, m) = (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1);
  midnight(NaiveDate::from_ymd_opt(y, m, 1).unwrap_or_default())
}

/// `[start, end)` of the calendar month `back` months before the one containing `now`.
pub fn month_window(now: DateTime<Utc>, back: u32) -> (DateTime<Utc>, DateTime<Utc>) {
  let shifted = now.month() as i32 - back as i32;
  (month_start(now.year(), shifted), month_start(now.year(), shifted + 1))
}

/// `"Mar 2026"`.
pub fn month_label(start: DateTime<Utc>) -> String {
  start.format("%b %Y").to_string()
}

/// Percent change from `previous` to `current`; 0 when there is no baseline.
pub fn growth_percent(current: f64, previous: f64) -> f64 {
  if previous == 0.0 {
    0.0
  } else {
    (current - previous) / previous * 100.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
  }

  #[test]
  fn day_and_month_starts() {
    let now = at(2026, 3, 17, 15);
    assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2026, 3, 17, 0, 0, 0).unwrap());
    assert_eq!(start_of_month(now), Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn month_windows_cross_year_boundaries() {
    let now = at(2026, 2, 10, 9);
    let (start, end) = month_window(now, 0);
    assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());

    let (start, end) = month_window(now, 3);
    assert_eq!(start, Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
    assert_eq!(month_label(start), "Nov 2025");
  }

  #[test]
  fn growth_without_baseline_is_zero() {
    assert_eq!(growth_percent(500.0, 0.0), 0.0);
    assert_eq!(growth_percent(150.0, 100.0), 50.0);
    assert_eq!(growth_percent(50.0, 100.0), -50.0);
  }
}
