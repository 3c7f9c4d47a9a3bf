// used for the date transformations
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{MapperError, Result};
use crate::value::Value;

/// Converts between a field type and a [`Value`] on behalf of a cursor.
///
/// `transform_from` answers `None` when the value cannot represent a `T`;
/// the read cursor turns that into a type mismatch for the field.
pub trait Transformation<T> {
    fn transform_from(&self, value: &Value) -> Option<T>;
    fn transform_to(&self, object: Option<&T>) -> Value;
}

// ------------- Dates -------------
/// Dates as text in a strftime format. A format without time fields reads as midnight.
#[derive(Debug, Clone)]
pub struct CustomDateFormatTransformation {
    format: String,
}
impl CustomDateFormatTransformation {
    pub fn new(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(MapperError::Config(format!("Invalid date format: {format:?}")));
        }
        Ok(Self { format })
    }
    pub fn format(&self) -> &str {
        &self.format
    }
}
impl Transformation<NaiveDateTime> for CustomDateFormatTransformation {
    fn transform_from(&self, value: &Value) -> Option<NaiveDateTime> {
        let text = value.as_text()?;
        NaiveDateTime::parse_from_str(text, &self.format).ok().or_else(|| {
            NaiveDate::parse_from_str(text, &self.format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
    }
    fn transform_to(&self, object: Option<&NaiveDateTime>) -> Value {
        match object {
            Some(date) => Value::Text(date.format(&self.format).to_string()),
            None => Value::Null,
        }
    }
}

/// Dates as RFC 3339 text, normalized to UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339Transformation;
impl Transformation<DateTime<Utc>> for Rfc3339Transformation {
    fn transform_from(&self, value: &Value) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value.as_text()?)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
    fn transform_to(&self, object: Option<&DateTime<Utc>>) -> Value {
        match object {
            Some(date) => Value::Text(date.to_rfc3339()),
            None => Value::Null,
        }
    }
}

/// Dates as fractional seconds since the unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampTransformation;
impl Transformation<DateTime<Utc>> for TimestampTransformation {
    fn transform_from(&self, value: &Value) -> Option<DateTime<Utc>> {
        let seconds = value.as_number()?.as_f64()?;
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round() as u32;
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
    }
    fn transform_to(&self, object: Option<&DateTime<Utc>>) -> Value {
        match object {
            Some(date) => Value::from(date.timestamp() as f64 + date.timestamp_subsec_nanos() as f64 / 1e9),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_format_reads_and_writes_text() {
        let transformation = CustomDateFormatTransformation::new("%Y%m%d").unwrap();
        let date = NaiveDate::from_ymd_opt(2016, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(transformation.transform_from(&Value::from("20161231")), Some(date));
        assert_eq!(transformation.transform_from(&Value::from(1.0)), None);
        assert_eq!(transformation.transform_to(Some(&date)), Value::from("20161231"));
        assert_eq!(transformation.transform_to(None), Value::Null);
    }

    #[test]
    fn custom_format_rejects_bad_patterns() {
        assert!(CustomDateFormatTransformation::new("%Y-%").is_err());
    }

    #[test]
    fn timestamps_keep_whole_seconds() {
        let date = DateTime::from_timestamp(1_483_142_400, 0).unwrap();
        let value = TimestampTransformation.transform_to(Some(&date));
        assert_eq!(value, Value::from(1_483_142_400.0));
        assert_eq!(TimestampTransformation.transform_from(&value), Some(date));
        assert_eq!(TimestampTransformation.transform_from(&Value::from("x")), None);
    }

    #[test]
    fn rfc3339_normalizes_to_utc() {
        let read = Rfc3339Transformation.transform_from(&Value::from("2016-12-31T01:00:00+01:00")).unwrap();
        assert_eq!(read, DateTime::from_timestamp(1_483_142_400, 0).unwrap());
        assert_eq!(
            Rfc3339Transformation.transform_to(Some(&read)),
            Value::from("2016-12-31T00:00:00+00:00")
        );
    }
}
