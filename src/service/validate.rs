//! Type-aware validation of a single field value.

use serde::Serialize;
use serde_json::Value;

use crate::fields::value::{as_number, is_empty, parse_date, raw_string};
use crate::fields::{CustomField, FieldType, FieldValue};

/// Maximum length, in characters, of single-line text values.
pub const MAX_TEXT_LENGTH: usize = 255;

/// Human-readable validation errors, in the order they were found.
/// No errors means the value is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
  errors: Vec<String>,
}

impl ValidationResult {
  pub fn is_valid(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn errors(&self) -> &[String] {
    &self.errors
  }

  fn push(&mut self, error: String) {
    self.errors.push(error);
  }
}

pub fn validate_value(field: &CustomField, value: &Value) -> ValidationResult {
  let mut result = ValidationResult::default();
  let name = &field.name;

  if is_empty(value) {
    if field.is_mandatory() {
      result.push(format!("Field '{}' is mandatory and cannot be empty.", name));
    }
    return result;
  }

  match &field.field_type {
    t if t.is_short_text() => {
      if raw_string(value).chars().count() > MAX_TEXT_LENGTH {
        result.push(format!(
          "Field '{}' cannot exceed {} characters.",
          name, MAX_TEXT_LENGTH
        ));
      }
    }
    t if t.is_numeric() => {
      if as_number(value).is_none() {
        result.push(format!("Field '{}' must be a numeric value.", name));
      }
    }
    t if t.is_option() && field.has_options() => {
      match FieldValue::decode(t, value) {
        FieldValue::Options(ids) => {
          for id in ids.iter().filter(|id| field.option_label(id).is_none()) {
            result.push(format!("Invalid option '{}' for field '{}'.", id, name));
          }
        }
        _ => result.push(format!(
          "Invalid option '{}' for field '{}'.",
          raw_string(value),
          name
        )),
      }
    }
    FieldType::Date => {
      let parsed = value.as_str().and_then(parse_date);
      if parsed.is_none() {
        result.push(format!("Field '{}' must be a valid date.", name));
      }
    }
    _ => {}
  }

  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::{EntityType, FieldOption};
  use serde_json::json;

  fn field(field_type: FieldType) -> CustomField {
    CustomField::new(EntityType::Deal, 1, "key", "Field", field_type)
  }

  fn mandatory(field_type: FieldType) -> CustomField {
    let mut field = field(field_type);
    field.mandatory_flag = true;
    field
  }

  fn colour() -> CustomField {
    let mut field = field(FieldType::Set);
    field.options = vec![FieldOption::new(1, "Red"), FieldOption::new(2, "Blue")];
    field
  }

  #[test]
  fn test_mandatory_empty_values() {
    for value in [Value::Null, json!(""), json!([])] {
      let result = validate_value(&mandatory(FieldType::Varchar), &value);
      assert_eq!(
        result.errors(),
        &["Field 'Field' is mandatory and cannot be empty.".to_string()]
      );
    }
  }

  #[test]
  fn test_zero_and_false_satisfy_mandatory() {
    assert!(validate_value(&mandatory(FieldType::Double), &json!(0)).is_valid());
    assert!(validate_value(&mandatory(FieldType::Varchar), &json!("0")).is_valid());
    let flag = mandatory(FieldType::Other("flag".into()));
    assert!(validate_value(&flag, &json!(false)).is_valid());
  }

  #[test]
  fn test_optional_null_is_valid_for_every_type() {
    for field_type in FieldType::KNOWN {
      assert!(validate_value(&field(field_type.clone()), &Value::Null).is_valid());
    }
  }

  #[test]
  fn test_text_length_limit() {
    let ok = "a".repeat(255);
    let too_long = "a".repeat(256);
    assert!(validate_value(&field(FieldType::Varchar), &json!(ok)).is_valid());
    assert_eq!(
      validate_value(&field(FieldType::VarcharAuto), &json!(too_long)).errors(),
      &["Field 'Field' cannot exceed 255 characters.".to_string()]
    );
    // Long text fields have no limit
    assert!(validate_value(&field(FieldType::Text), &json!("a".repeat(1000))).is_valid());
  }

  #[test]
  fn test_text_length_counts_characters() {
    let value = json!("é".repeat(255));
    assert!(validate_value(&field(FieldType::Varchar), &value).is_valid());
  }

  #[test]
  fn test_numeric() {
    assert!(validate_value(&field(FieldType::Double), &json!(12.5)).is_valid());
    assert!(validate_value(&field(FieldType::Double), &json!("12.5")).is_valid());
    assert!(validate_value(&field(FieldType::Int), &json!("0")).is_valid());
    assert_eq!(
      validate_value(&field(FieldType::Double), &json!("twelve")).errors(),
      &["Field 'Field' must be a numeric value.".to_string()]
    );
  }

  #[test]
  fn test_options_one_error_per_invalid_value() {
    let result = validate_value(&colour(), &json!([1, 3, "4"]));
    assert_eq!(
      result.errors(),
      &[
        "Invalid option '3' for field 'Field'.".to_string(),
        "Invalid option '4' for field 'Field'.".to_string(),
      ]
    );
  }

  #[test]
  fn test_options_accept_string_ids() {
    assert!(validate_value(&colour(), &json!("2")).is_valid());
    assert!(validate_value(&colour(), &json!([1, 2])).is_valid());
  }

  #[test]
  fn test_options_without_option_list_are_not_checked() {
    assert!(validate_value(&field(FieldType::Enum), &json!(42)).is_valid());
  }

  #[test]
  fn test_dates() {
    assert!(validate_value(&field(FieldType::Date), &json!("2024-03-15")).is_valid());
    assert!(validate_value(&field(FieldType::Date), &json!("2024-03-15T10:00:00Z")).is_valid());
    assert_eq!(
      validate_value(&field(FieldType::Date), &json!("someday")).errors(),
      &["Field 'Field' must be a valid date.".to_string()]
    );
    assert!(!validate_value(&field(FieldType::Date), &json!(20240315)).is_valid());
  }

  #[test]
  fn test_mandatory_with_value_checks_type_rules() {
    let result = validate_value(&mandatory(FieldType::Double), &json!("abc"));
    assert_eq!(result.errors().len(), 1);
  }
}
