//! Display formatting of field values.
//!
//! Formatting is best effort. Values that don't fit the field type's expected
//! shape are shown as their raw string form instead of failing.

use serde_json::Value;

use crate::fields::value::{parse_date, parse_time, raw_string};
use crate::fields::{CustomField, FieldType, FieldValue};

pub fn format_value(field: &CustomField, value: &Value) -> String {
  match FieldValue::decode(&field.field_type, value) {
    FieldValue::Empty => String::new(),
    FieldValue::Monetary { amount, currency } => {
      format!("{} {}", format_amount(amount), currency)
    }
    FieldValue::DateRange { start, end } => {
      format!("{} - {}", format_date(&start), format_date(&end))
    }
    FieldValue::TimeRange { start, end } => {
      format!("{} - {}", format_time(&start), format_time(&end))
    }
    FieldValue::Options(ids) if field.has_options() => ids
      .iter()
      .map(|id| field.option_label(id).unwrap_or(id))
      .collect::<Vec<_>>()
      .join(", "),
    FieldValue::Address(address) => address
      .parts()
      .into_iter()
      .filter(|part| !part.is_empty())
      .collect::<Vec<_>>()
      .join(", "),
    FieldValue::Text(text) => match field.field_type {
      FieldType::Date => format_date(&text),
      FieldType::Time => format_time(&text),
      // Phone numbers are shown as stored, without normalization.
      FieldType::Phone => text,
      _ => text,
    },
    FieldValue::Options(_) | FieldValue::Raw(_) => raw_string(value),
  }
}

/// `YYYY-MM-DD`, or the input unchanged if it isn't a date.
fn format_date(s: &str) -> String {
  parse_date(s)
    .map(|date| date.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|| s.to_string())
}

/// 24-hour `HH:MM`, or the input unchanged if it isn't a time.
fn format_time(s: &str) -> String {
  parse_time(s)
    .map(|time| time.format("%H:%M").to_string())
    .unwrap_or_else(|| s.to_string())
}

/// Two decimals with `,` as the thousands separator: `1234567.891` → `1,234,567.89`.
pub fn format_amount(amount: f64) -> String {
  let fixed = format!("{:.2}", amount.abs());
  let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, digit) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }

  let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
  format!("{}{}.{}", sign, grouped, fraction)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::{EntityType, FieldOption};
  use serde_json::json;

  fn field(field_type: FieldType) -> CustomField {
    CustomField::new(EntityType::Deal, 1, "key", "Field", field_type)
  }

  fn colour() -> CustomField {
    let mut field = field(FieldType::Set);
    field.options = vec![FieldOption::new(1, "Red"), FieldOption::new(2, "Blue")];
    field
  }

  #[test]
  fn test_empty_is_empty_string_for_every_type() {
    for field_type in FieldType::KNOWN {
      for value in [Value::Null, json!(""), json!([]), json!({})] {
        assert_eq!(format_value(&field(field_type.clone()), &value), "");
      }
    }
  }

  #[test]
  fn test_zero_is_a_value() {
    assert_eq!(format_value(&field(FieldType::Double), &json!(0)), "0");
    assert_eq!(format_value(&field(FieldType::Varchar), &json!("0")), "0");
  }

  #[test]
  fn test_monetary() {
    let value = json!({"amount": 1500, "currency": "USD"});
    assert_eq!(format_value(&field(FieldType::Monetary), &value), "1,500.00 USD");
  }

  #[test]
  fn test_monetary_malformed_falls_back_to_raw() {
    assert_eq!(format_value(&field(FieldType::Monetary), &json!(1500)), "1500");
    assert_eq!(
      format_value(&field(FieldType::Monetary), &json!({"amount": 5})),
      r#"{"amount":5}"#
    );
  }

  #[test]
  fn test_format_amount() {
    assert_eq!(format_amount(0.0), "0.00");
    assert_eq!(format_amount(999.999), "1,000.00");
    assert_eq!(format_amount(1234567.891), "1,234,567.89");
    assert_eq!(format_amount(-1500.5), "-1,500.50");
    assert_eq!(format_amount(-0.001), "0.00");
  }

  #[test]
  fn test_date() {
    assert_eq!(
      format_value(&field(FieldType::Date), &json!("2024-03-15T10:00:00Z")),
      "2024-03-15"
    );
    assert_eq!(
      format_value(&field(FieldType::Date), &json!("someday")),
      "someday"
    );
  }

  #[test]
  fn test_date_range() {
    let value = json!({"start_date": "2024-03-15", "end_date": "2024-03-20 12:00:00"});
    assert_eq!(
      format_value(&field(FieldType::DateRange), &value),
      "2024-03-15 - 2024-03-20"
    );
  }

  #[test]
  fn test_time_and_time_range() {
    assert_eq!(format_value(&field(FieldType::Time), &json!("14:30:00")), "14:30");
    let value = json!({"start_time": "09:00:00", "end_time": "05:15 PM"});
    assert_eq!(
      format_value(&field(FieldType::TimeRange), &value),
      "09:00 - 17:15"
    );
  }

  #[test]
  fn test_options() {
    assert_eq!(format_value(&colour(), &json!([1, 2])), "Red, Blue");
    assert_eq!(format_value(&colour(), &json!(99)), "99");
    assert_eq!(format_value(&colour(), &json!([2, 99])), "Blue, 99");
    assert_eq!(format_value(&colour(), &json!("1")), "Red");
  }

  #[test]
  fn test_options_without_option_list() {
    assert_eq!(format_value(&field(FieldType::Enum), &json!(5)), "5");
  }

  #[test]
  fn test_phone_is_passthrough() {
    assert_eq!(
      format_value(&field(FieldType::Phone), &json!("+1 (555) 010-9999")),
      "+1 (555) 010-9999"
    );
  }

  #[test]
  fn test_address_skips_empty_parts() {
    let value = json!({
      "street_number": "10",
      "route": "Downing Street",
      "locality": "",
      "postal_code": "SW1A 2AA",
      "country": "United Kingdom"
    });
    assert_eq!(
      format_value(&field(FieldType::Address), &value),
      "10, Downing Street, SW1A 2AA, United Kingdom"
    );
    assert_eq!(
      format_value(&field(FieldType::Address), &json!("10 Downing St")),
      "10 Downing St"
    );
  }

  #[test]
  fn test_other_types_cast_to_string() {
    assert_eq!(format_value(&field(FieldType::Double), &json!(3.5)), "3.5");
    assert_eq!(format_value(&field(FieldType::User), &json!(42)), "42");
    assert_eq!(format_value(&field(FieldType::Varchar), &json!("hi")), "hi");
    assert_eq!(format_value(&field(FieldType::Other("x".into())), &json!(true)), "true");
  }
}
