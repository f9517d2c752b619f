// Calendar helpers: the plant's "today", month bounds and business-day counts.
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Civil time zone the plant reports in.
pub const PLANT_TZ: Tz = chrono_tz::America::Argentina::Buenos_Aires;

/// Current calendar date at the plant.
pub fn today() -> NaiveDate {
    today_in(&PLANT_TZ, Utc::now())
}

pub fn today_in<T: TimeZone>(tz: &T, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(tz).date_naive()
}

/// First and last calendar day of `date`'s month.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let end = start
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (start, end)
}

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// Weekdays in the half-open range [from, to); requires from <= to.
fn weekdays_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let span = (to - from).num_days();
    let full_weeks = span / 7;
    let mut count = full_weeks * 5;
    let mut day = from + Days::new((full_weeks * 7) as u64);
    while day < to {
        if is_business_day(day) {
            count += 1;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    count
}

/// Monday–Friday days in the inclusive range `[start, end]`, holidays ignored.
///
/// The count is taken over the half-open range `[start, end + 1)`. For a
/// reversed range that makes it zero when `end` is the day before `start` and
/// negative further back, mirroring a signed business-day difference.
pub fn business_days_count(start: NaiveDate, end: NaiveDate) -> i64 {
    let stop = end.succ_opt().unwrap_or(end);
    if start <= stop {
        weekdays_between(start, stop)
    } else {
        -weekdays_between(stop, start)
    }
}
