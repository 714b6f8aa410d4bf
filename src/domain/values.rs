use chrono::format::{Parsed, StrftimeItems, parse};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

const ISO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H",
    "%Y-%m-%d %H",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
    "%Y%m%d",
    "%Y-%m-%d",
];

/// Year assumed when a format carries no year, as `strptime` does.
const DEFAULT_YEAR: i32 = 1900;

/// Parses a sensor reading. Whitespace anywhere in the text is ignored and a
/// comma is read as the decimal separator. Empty or non-finite values yield
/// `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let normalized: String = text
        .chars()
        .filter(|char| !char.is_whitespace())
        .map(|char| if char == ',' { '.' } else { char })
        .collect();

    if normalized.is_empty() {
        return None;
    }

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parses a timestamp cell. Values carrying a UTC offset are normalised to
/// UTC; everything else is taken as naive local time.
pub fn parse_timestamp(text: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match format {
        Some(format) => parse_with_format(text, format),
        None => parse_iso(text),
    }
}

/// The whole text must match `format`. Fields the format leaves out take
/// defaults: minutes and seconds 0, the time midnight when no time field is
/// present, the date 1900-01-01 when no date field is present.
fn parse_with_format(text: &str, format: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, text, StrftimeItems::new(format)).ok()?;

    let date = if has_date_fields(&parsed) {
        if parsed.year().is_none() && parsed.year_mod_100().is_none() && parsed.isoyear().is_none()
        {
            parsed.set_year(i64::from(DEFAULT_YEAR)).ok()?;
        }
        parsed.to_naive_date().ok()?
    } else {
        NaiveDate::from_ymd_opt(DEFAULT_YEAR, 1, 1)?
    };

    let time = if has_time_fields(&parsed) {
        if parsed.hour_mod_12().is_none() {
            parsed.set_hour(0).ok()?;
        } else if parsed.hour_div_12().is_none() {
            // %I without %p
            parsed.set_ampm(false).ok()?;
        }
        if parsed.minute().is_none() {
            parsed.set_minute(0).ok()?;
        }
        parsed.to_naive_time().ok()?
    } else {
        NaiveTime::MIN
    };

    let local = date.and_time(time);
    match parsed.offset() {
        Some(offset) => local.checked_sub_signed(Duration::seconds(i64::from(offset))),
        None => Some(local),
    }
}

fn has_date_fields(parsed: &Parsed) -> bool {
    parsed.year().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some()
        || parsed.month().is_some()
        || parsed.day().is_some()
        || parsed.ordinal().is_some()
        || parsed.isoweek().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some()
}

fn has_time_fields(parsed: &Parsed) -> bool {
    parsed.hour_mod_12().is_some() || parsed.minute().is_some() || parsed.second().is_some()
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    let normalized = match text.strip_suffix(|char: char| char == 'Z' || char == 'z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => text.to_string(),
    };

    if let Ok(datetime) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(datetime.naive_utc());
    }

    ISO_FORMATS
        .iter()
        .find_map(|format| parse_with_format(&normalized, format))
}
