use chrono::{DateTime, Datelike, Days, NaiveDate};
use serde_json::Value;

// Permissive formats tried after the hyphen and slash layouts.
const LOOSE_DATE_FORMATS: &[&str] = &[
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
    "%A %B %d %Y",
    "%a, %d %b %Y",
    "%Y/%m/%d",
];

/// Largest spreadsheet serial day we accept (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Parses a spreadsheet cell's text into a calendar date.
///
/// Layouts are tried in order:
/// 1. `YYYY-MM-DD` (an ISO time suffix such as `T00:00:00.000Z` is ignored)
/// 2. `DD/MM/YYYY` (two-digit years are read as 20YY)
/// 3. a permissive parse: RFC 3339, RFC 2822, `Jan 12 2026`, `12 January 2026`,
///    `Mon Jan 12 2026 00:00:00 GMT+0000`, ...
///
/// Returns `None` for empty or unrecognised input.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    parse_hyphen_ymd(text)
        .or_else(|| parse_slash_dmy(text))
        .or_else(|| parse_loose(text))
}

/// Same as [`parse_date`] but accepts any JSON cell. Numbers are read as
/// spreadsheet serial days (epoch 1899-12-30).
pub fn parse_cell_date(cell: &Value) -> Option<NaiveDate> {
    match cell {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n.as_f64().and_then(serial_to_date),
        _ => None,
    }
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL_DAY {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Splits `digits[rest]` and returns the number, provided `rest` is empty or a
/// time suffix.
fn leading_number<T: std::str::FromStr>(part: &str) -> Option<T> {
    let part = part.trim();
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    let (digits, rest) = part.split_at(end);
    if digits.is_empty() {
        return None;
    }
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    digits.parse().ok()
}

fn parse_hyphen_ymd(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.splitn(3, '-').collect();
    if parts.len() != 3 {
        return None;
    }

    let year: i32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let day: u32 = leading_number(parts[2])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_slash_dmy(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.splitn(3, '/').collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let mut year: i32 = leading_number(parts[2])?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_loose(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }

    let try_formats = |candidate: &str| {
        LOOSE_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    };

    if let Some(date) = try_formats(text) {
        return Some(date);
    }

    // JS-style "Mon Jan 12 2026 00:00:00 GMT+0000 (...)": keep the date tokens only.
    let tokens: Vec<&str> = text.split_whitespace().collect();
    [4, 3]
        .iter()
        .filter(|&&n| tokens.len() > n)
        .find_map(|&n| try_formats(&tokens[..n].join(" ")))
}

/// Whole calendar months from `start` to `end` (`year * 12 + month` difference).
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Formats an amount as whole pounds with thousands separators, e.g. `£20,000`.
pub fn format_gbp(amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() } else { 0.0 };
    let negative = rounded < 0.0;
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-£{}", grouped)
    } else {
        format!("£{}", grouped)
    }
}

/// Rounds half away from zero to the nearest integer percentage.
pub fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}
