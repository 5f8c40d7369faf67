use chrono::{Datelike, Days, Local, NaiveDate};

/// Canonical on-disk representation of a calendar day.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Day of the year (1-366) for a local calendar date.
///
/// Counted as whole calendar days since January 1st of the date's own year,
/// so clock shifts inside a day can never produce a fractional result.
pub fn day_of_year(date: NaiveDate) -> u32 {
    let start_of_year = year_start(date.year()).unwrap_or(date);
    let elapsed = date.signed_duration_since(start_of_year).num_days();
    elapsed as u32 + 1
}

/// The date `day` days into `year` (day 1 is January 1st).
///
/// Days past the end of the year roll over into the next one; callers that
/// care must compare the resulting year.
pub fn date_from_day_of_year(year: i32, day: u32) -> Option<NaiveDate> {
    let offset = day.checked_sub(1)?;
    year_start(year)?.checked_add_days(Days::new(u64::from(offset)))
}

/// Formats a date as `YYYY-MM-DD` using its local calendar fields.
pub fn format_local_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses `YYYY-MM-DD` by splitting the fields explicitly.
///
/// Impossible dates (`2025-02-30`) and anything that is not three numeric
/// fields yield `None`.
pub fn parse_local_date(input: &str) -> Option<NaiveDate> {
    let mut parts = input.trim().split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The `count` most recent days ending at `today`, oldest first.
pub fn past_dates(count: usize, today: NaiveDate) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = (0..count as u64)
        .map_while(|offset| today.checked_sub_days(Days::new(offset)))
        .collect();
    dates.reverse();
    dates
}

pub fn past_dates_from_now(count: usize) -> Vec<NaiveDate> {
    past_dates(count, today())
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}
