//! Column decoding helpers shared by the store modules.

use chrono::{DateTime, Utc};

use crate::shared::clock;

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

/// Decode an integer microsecond column
pub fn timestamp(micros: i64, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    clock::from_micros(micros)
        .ok_or_else(|| decode_error(format!("{} out of range: {}", column, micros)))
}

/// Decode a nullable integer microsecond column
pub fn optional_timestamp(
    micros: Option<i64>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    micros.map(|m| timestamp(m, column)).transpose()
}

/// Decode a text enum column with the type's `from_str`
pub fn enum_column<T>(
    value: &str,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, sqlx::Error> {
    parse(value).ok_or_else(|| decode_error(format!("unexpected {} value: {}", column, value)))
}
