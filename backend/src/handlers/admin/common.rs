//! Shared validation helpers for the admin log viewers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::AppError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 25;
pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000;

/// Clamps pagination inputs to sane bounds.
pub fn clamp_pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

pub fn normalize_filter(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_from_datetime(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw {
        Some(value) => parse_datetime_value(value, true)
            .ok_or_else(|| {
                AppError::BadRequest("`from` must be a valid datetime (RFC3339 or YYYY-MM-DD)".into())
            })
            .map(Some),
        None => Ok(None),
    }
}

pub fn parse_to_datetime(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw {
        Some(value) => parse_datetime_value(value, false)
            .ok_or_else(|| {
                AppError::BadRequest("`to` must be a valid datetime (RFC3339 or YYYY-MM-DD)".into())
            })
            .map(Some),
        None => Ok(None),
    }
}

pub fn ensure_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest(
                "`from` must be before or equal to `to`".into(),
            ));
        }
    }
    Ok(())
}

fn parse_datetime_value(value: &str, is_start: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = if is_start {
            NaiveTime::from_hms_opt(0, 0, 0)
        } else {
            NaiveTime::from_hms_opt(23, 59, 59)
        }?;
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(
            NaiveDateTime::new(date, time),
            Utc,
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn clamp_pagination_applies_defaults_and_bounds() {
        assert_eq!(clamp_pagination(None, None), (1, 25));
        assert_eq!(clamp_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_pagination(Some(5_000), Some(5_000)), (1_000, 100));
        assert_eq!(clamp_pagination(Some(3), Some(50)), (3, 50));
    }

    #[test]
    fn normalize_filter_trims_and_drops_empty() {
        assert_eq!(normalize_filter(Some("  x ".into())).as_deref(), Some("x"));
        assert_eq!(normalize_filter(Some("   ".into())), None);
        assert_eq!(normalize_filter(None), None);
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let from = parse_from_datetime(Some("2026-08-01")).unwrap().unwrap();
        let to = parse_to_datetime(Some("2026-08-01")).unwrap().unwrap();
        assert_eq!((from.hour(), from.minute(), from.second()), (0, 0, 0));
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
    }

    #[test]
    fn rejects_garbage_datetimes_and_inverted_ranges() {
        assert!(parse_from_datetime(Some("yesterday")).is_err());

        let from = parse_from_datetime(Some("2026-08-02")).unwrap();
        let to = parse_to_datetime(Some("2026-08-01")).unwrap();
        assert!(ensure_range(from, to).is_err());
        assert!(ensure_range(to, from).is_ok());
    }

    #[test]
    fn accepts_rfc3339_and_naive_formats() {
        assert!(parse_from_datetime(Some("2026-08-01T10:30:00Z")).unwrap().is_some());
        assert!(parse_from_datetime(Some("2026-08-01T10:30:00")).unwrap().is_some());
        assert!(parse_from_datetime(Some("2026-08-01 10:30:00")).unwrap().is_some());
    }
}
