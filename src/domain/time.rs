// Date arithmetic, formatting and the slot grid shared by every series producer
use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveTime, TimeDelta, Timelike};

use super::filter::Interval;

const MS_PER_HOUR: u64 = 60 * 60 * 1000;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

const HOURLY_SLOTS: (u64, u64) = (6, 168);
const DAILY_SLOTS: (u64, u64) = (7, 90);
const MONTHLY_SLOTS: (u64, u64) = (3, 24);

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

const MONTHS_NOMINATIVE: [&str; 12] = [
    "Январь",
    "Февраль",
    "Март",
    "Апрель",
    "Май",
    "Июнь",
    "Июль",
    "Август",
    "Сентябрь",
    "Октябрь",
    "Ноябрь",
    "Декабрь",
];

fn abs_millis(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> u64 {
    (b - a).num_milliseconds().unsigned_abs()
}

/// Whole days between two instants, rounded up.
pub fn days_between(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> u64 {
    abs_millis(a, b).div_ceil(MS_PER_DAY)
}

/// Whole hours between two instants, rounded up.
pub fn hours_between(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> u64 {
    abs_millis(a, b).div_ceil(MS_PER_HOUR)
}

pub fn add_days(date: DateTime<FixedOffset>, days: i64) -> DateTime<FixedOffset> {
    date + TimeDelta::days(days)
}

pub fn add_hours(date: DateTime<FixedOffset>, hours: i64) -> DateTime<FixedOffset> {
    date + TimeDelta::hours(hours)
}

/// Calendar month arithmetic; the day is clamped to the target month's length.
pub fn add_months(date: DateTime<FixedOffset>, months: i32) -> DateTime<FixedOffset> {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    // None only outside chrono's representable range
    shifted.unwrap_or(date)
}

pub fn is_valid_range(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
    start <= end
}

/// "15 января 2024 г."
pub fn format_for_display(date: DateTime<FixedOffset>) -> String {
    format!(
        "{} {} {} г.",
        date.day(),
        MONTHS_GENITIVE[date.month0() as usize],
        date.year()
    )
}

/// "14:00"
pub fn format_hour(date: DateTime<FixedOffset>) -> String {
    date.format("%H:%M").to_string()
}

/// "Январь 2024"
pub fn format_month(date: DateTime<FixedOffset>) -> String {
    format!("{} {}", MONTHS_NOMINATIVE[date.month0() as usize], date.year())
}

/// "15.01.2024 14:00"
pub fn format_date_time(date: DateTime<FixedOffset>) -> String {
    date.format("%d.%m.%Y %H:%M").to_string()
}

pub fn format_period(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> String {
    format!("{} - {}", format_for_display(start), format_for_display(end))
}

/// Axis label for a single slot.
pub fn label_for(date: DateTime<FixedOffset>, interval: Interval) -> String {
    match interval {
        Interval::Hourly => format_hour(date),
        Interval::Monthly => format_month(date),
        Interval::Daily | Interval::Auto => format_for_display(date),
    }
}

/// Number of slots emitted for a range, bounded per granularity.
pub fn slot_count(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    interval: Interval,
) -> usize {
    let (requested, (min, max)) = match interval.resolve(start, end) {
        Interval::Hourly => (hours_between(start, end), HOURLY_SLOTS),
        Interval::Monthly => (days_between(start, end).div_ceil(30), MONTHLY_SLOTS),
        Interval::Daily | Interval::Auto => (days_between(start, end), DAILY_SLOTS),
    };
    requested.clamp(min, max) as usize
}

fn local_datetime(date: NaiveDate, hour: u32, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(hour));
    let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// Slot timestamps for a range, in the start's UTC offset.
///
/// Hourly slots start at the top of the start hour, daily slots at noon of the
/// start day, monthly slots at noon on the 15th of the start month.
pub fn slot_timestamps(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    interval: Interval,
) -> Vec<DateTime<FixedOffset>> {
    let offset = *start.offset();
    let date = start.date_naive();
    let count = slot_count(start, end, interval);

    match interval.resolve(start, end) {
        Interval::Hourly => {
            let first = local_datetime(date, start.hour(), offset);
            (0..count).map(|i| add_hours(first, i as i64)).collect()
        }
        Interval::Monthly => {
            let mid_month = date - TimeDelta::days(i64::from(date.day()) - 15);
            let first = local_datetime(mid_month, 12, offset);
            (0..count).map(|i| add_months(first, i as i32)).collect()
        }
        Interval::Daily | Interval::Auto => {
            let first = local_datetime(date, 12, offset);
            (0..count).map(|i| add_days(first, i as i64)).collect()
        }
    }
}

/// Labels for exactly the slots `slot_timestamps` produces.
pub fn generate_labels(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    interval: Interval,
) -> Vec<String> {
    let resolved = interval.resolve(start, end);
    slot_timestamps(start, end, interval)
        .into_iter()
        .map(|ts| label_for(ts, resolved))
        .collect()
}
