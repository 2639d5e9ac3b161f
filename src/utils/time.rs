use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;

use super::error::AppError;

pub fn to_chrono(value: BsonDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis()).unwrap_or_default()
}

pub fn to_bson(value: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(value.timestamp_millis())
}

pub fn to_rfc3339(value: BsonDateTime) -> String {
    to_chrono(value).to_rfc3339()
}

/// Parses an RFC 3339 timestamp coming from a client form.
pub fn parse_rfc3339(field: &str, value: &str) -> Result<BsonDateTime, AppError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| to_bson(dt.with_timezone(&Utc)))
        .map_err(|_| AppError::InvalidRequest(format!("{} must be an RFC 3339 timestamp", field)))
}

pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidRequest("Date must use the YYYY-MM-DD format".to_string()))
}

/// Inclusive bounds of a UTC calendar day: 00:00:00.000 to 23:59:59.999.
pub fn day_bounds(date: NaiveDate) -> Result<(BsonDateTime, BsonDateTime), AppError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| AppError::InvalidRequest(format!("Date out of range: {}", date)))?;

    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let end = next.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc() - Duration::milliseconds(1);
    Ok((to_bson(start), to_bson(end)))
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidRequest(format!("Invalid month: {}-{}", year, month)))?;
    let next = if month == 12 {
        year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::InvalidRequest(format!("Invalid month: {}-{}", year, month)))?;

    Ok((first, next - Duration::days(1)))
}

pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(now.year(), now.month(), now.day()).unwrap_or_default();
    date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}
