//! Field values decoded from caller-supplied JSON.
//!
//! Pipedrive sends composite values (money, ranges, addresses) as loosely shaped
//! objects. They are decoded once here, per field type, into a tagged union.
//! Anything that does not have the expected shape becomes `FieldValue::Raw`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use super::types::FieldType;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  /// `null`, `""`, `[]` or `{}`.
  Empty,
  Text(String),
  Monetary { amount: f64, currency: String },
  DateRange { start: String, end: String },
  TimeRange { start: String, end: String },
  /// Selected option ids in canonical string form.
  Options(Vec<String>),
  Address(Address),
  Raw(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
  pub street_number: String,
  pub route: String,
  pub locality: String,
  pub postal_code: String,
  pub country: String,
}

impl Address {
  /// Parts in display order.
  pub fn parts(&self) -> [&str; 5] {
    [
      self.street_number.as_str(),
      self.route.as_str(),
      self.locality.as_str(),
      self.postal_code.as_str(),
      self.country.as_str(),
    ]
  }
}

impl FieldValue {
  pub fn decode(field_type: &FieldType, value: &Value) -> Self {
    if is_empty(value) {
      return Self::Empty;
    }

    match field_type {
      FieldType::Monetary => decode_monetary(value),
      FieldType::DateRange => decode_pair(value, "start_date", "end_date")
        .map(|(start, end)| Self::DateRange { start, end })
        .unwrap_or_else(|| Self::Raw(value.clone())),
      FieldType::TimeRange => decode_pair(value, "start_time", "end_time")
        .map(|(start, end)| Self::TimeRange { start, end })
        .unwrap_or_else(|| Self::Raw(value.clone())),
      FieldType::Set | FieldType::Enum => match value {
        Value::Array(items) => Self::Options(items.iter().filter_map(canonical_id).collect()),
        Value::Object(_) => Self::Raw(value.clone()),
        scalar => canonical_id(scalar)
          .map(|id| Self::Options(vec![id]))
          .unwrap_or_else(|| Self::Raw(value.clone())),
      },
      FieldType::Address => match value {
        Value::Object(map) => {
          let part = |name: &str| map.get(name).map(raw_string).unwrap_or_default();
          Self::Address(Address {
            street_number: part("street_number"),
            route: part("route"),
            locality: part("locality"),
            postal_code: part("postal_code"),
            country: part("country"),
          })
        }
        _ => Self::Raw(value.clone()),
      },
      _ => match value {
        Value::String(s) => Self::Text(s.clone()),
        other => Self::Raw(other.clone()),
      },
    }
  }
}

fn decode_monetary(value: &Value) -> FieldValue {
  let amount = value.get("amount").and_then(as_number);
  let currency = value.get("currency").and_then(Value::as_str);
  match (amount, currency) {
    (Some(amount), Some(currency)) => FieldValue::Monetary {
      amount,
      currency: currency.to_string(),
    },
    _ => FieldValue::Raw(value.clone()),
  }
}

fn decode_pair(value: &Value, start: &str, end: &str) -> Option<(String, String)> {
  let start = value.get(start).and_then(Value::as_str)?;
  let end = value.get(end).and_then(Value::as_str)?;
  Some((start.to_string(), end.to_string()))
}

/// Values that count as "not provided".
///
/// `0` and `"0"` are real values here, not empty ones.
pub fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    Value::Array(items) => items.is_empty(),
    Value::Object(map) => map.is_empty(),
    Value::Bool(_) | Value::Number(_) => false,
  }
}

/// Plain string rendering of any value. Containers render as compact JSON.
pub fn raw_string(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Array(_) | Value::Object(_) => value.to_string(),
  }
}

/// Option ids compare by their string form so `1` and `"1"` are the same id.
fn canonical_id(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// Numbers and numeric strings. Non-finite values are rejected.
pub fn as_number(value: &Value) -> Option<f64> {
  let number = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }?;
  number.is_finite().then_some(number)
}

const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.naive_local());
  }
  if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
    return Some(dt.naive_local());
  }
  DATETIME_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Parse a date or date-time. Offsets are kept as given, not converted.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  parse_datetime(s).map(|dt| dt.date()).or_else(|| {
    DATE_FORMATS
      .iter()
      .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
  })
}

/// Parse a time of day, alone or as part of a date-time.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
  let s = s.trim();
  TIME_FORMATS
    .iter()
    .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
    .or_else(|| parse_datetime(s).map(|dt| dt.time()))
}
