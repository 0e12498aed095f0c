//! Text encodings for values SQLite has no native type for.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::errors::StorageError;

pub type ValueResult<T> = std::result::Result<T, StorageError>;

pub fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn timestamp_from_db(value: &str) -> ValueResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::invalid_value(format!("timestamp '{}'", value)))
}

pub fn date_to_db(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn date_from_db(value: &str) -> ValueResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| StorageError::invalid_value(format!("date '{}'", value)))
}

pub fn decimal_to_db(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn decimal_from_db(value: &str) -> ValueResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| StorageError::invalid_value(format!("decimal '{}'", value)))
}

/// Applies `parse` to an optional column.
pub fn optional<T>(
    value: Option<&str>,
    parse: fn(&str) -> ValueResult<T>,
) -> ValueResult<Option<T>> {
    value.map(parse).transpose()
}
