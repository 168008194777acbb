//! Custom field definitions as stored locally.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::entity::EntityType;
use super::types::FieldType;

/// Identifier of a selectable option.
///
/// Pipedrive uses numeric ids for custom option fields and string ids for some
/// built-in ones (e.g. deal status), so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionId {
  Int(i64),
  Text(String),
}

impl fmt::Display for OptionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(id) => write!(f, "{}", id),
      Self::Text(id) => f.write_str(id),
    }
  }
}

impl From<i64> for OptionId {
  fn from(id: i64) -> Self {
    Self::Int(id)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
  pub id: OptionId,
  pub label: String,
}

impl FieldOption {
  pub fn new(id: impl Into<OptionId>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
    }
  }
}

/// One field definition for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
  pub key: String,
  pub pipedrive_id: i64,
  pub entity_type: EntityType,
  pub name: String,
  pub field_type: FieldType,
  #[serde(default)]
  pub mandatory_flag: bool,
  #[serde(default = "default_true")]
  pub active_flag: bool,
  /// True for user-defined fields, false for Pipedrive built-ins.
  #[serde(default)]
  pub edit_flag: bool,
  #[serde(default)]
  pub add_visible_flag: bool,
  #[serde(default)]
  pub details_visible_flag: bool,
  #[serde(default)]
  pub options: Vec<FieldOption>,
  /// Full provider payload, kept for attributes not modelled above.
  #[serde(default)]
  pub pipedrive_data: Value,
  #[serde(default)]
  pub updated_at: Option<String>,
}

fn default_true() -> bool {
  true
}

impl CustomField {
  /// Minimal active, non-custom field. Mostly useful for building fixtures.
  pub fn new(
    entity_type: EntityType,
    pipedrive_id: i64,
    key: impl Into<String>,
    name: impl Into<String>,
    field_type: FieldType,
  ) -> Self {
    Self {
      key: key.into(),
      pipedrive_id,
      entity_type,
      name: name.into(),
      field_type,
      mandatory_flag: false,
      active_flag: true,
      edit_flag: false,
      add_visible_flag: false,
      details_visible_flag: false,
      options: Vec::new(),
      pipedrive_data: Value::Null,
      updated_at: None,
    }
  }

  pub fn is_mandatory(&self) -> bool {
    self.mandatory_flag
  }

  pub fn is_custom(&self) -> bool {
    self.edit_flag
  }

  pub fn has_options(&self) -> bool {
    !self.options.is_empty()
  }

  pub fn option_label(&self, id: &str) -> Option<&str> {
    self
      .options
      .iter()
      .find(|option| option.id.to_string() == id)
      .map(|option| option.label.as_str())
  }

  /// Build a field from one element of a Pipedrive `/{entity}Fields` response.
  pub fn from_pipedrive(entity_type: EntityType, data: &Value) -> Result<Self> {
    let pipedrive_id = data
      .get("id")
      .and_then(Value::as_i64)
      .ok_or_else(|| eyre!("Pipedrive field is missing a numeric id"))?;
    let key = data
      .get("key")
      .and_then(Value::as_str)
      .ok_or_else(|| eyre!("Pipedrive field {} is missing a key", pipedrive_id))?;
    let name = data.get("name").and_then(Value::as_str).unwrap_or(key);
    let field_type = data
      .get("field_type")
      .and_then(Value::as_str)
      .map(FieldType::from)
      .ok_or_else(|| eyre!("Pipedrive field {} is missing a field_type", key))?;

    let options = match data.get("options") {
      Some(Value::Array(items)) => items
        .iter()
        .map(|item| serde_json::from_value(item.clone()))
        .collect::<std::result::Result<Vec<FieldOption>, _>>()
        .map_err(|e| eyre!("Invalid options for Pipedrive field {}: {}", key, e))?,
      _ => Vec::new(),
    };

    Ok(Self {
      key: key.to_string(),
      pipedrive_id,
      entity_type,
      name: name.to_string(),
      field_type,
      mandatory_flag: flag(data, "mandatory_flag", false),
      active_flag: flag(data, "active_flag", true),
      edit_flag: flag(data, "edit_flag", false),
      add_visible_flag: flag(data, "add_visible_flag", false),
      details_visible_flag: flag(data, "details_visible_flag", false),
      options,
      pipedrive_data: data.clone(),
      updated_at: data
        .get("update_time")
        .and_then(Value::as_str)
        .map(String::from),
    })
  }

  /// Build every field in a saved `/{entity}Fields` response.
  ///
  /// Accepts the API envelope `{"data": [...]}` or a bare array.
  pub fn from_pipedrive_response(entity_type: EntityType, payload: &Value) -> Result<Vec<Self>> {
    let items = match payload {
      Value::Array(items) => items,
      Value::Object(map) => match map.get("data") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) => return Ok(Vec::new()),
        _ => return Err(eyre!("Expected `data` to be an array of fields")),
      },
      _ => return Err(eyre!("Expected a JSON array or an object with a `data` array")),
    };

    items
      .iter()
      .map(|item| Self::from_pipedrive(entity_type, item))
      .collect()
  }
}

/// Pipedrive sends some flags as objects (e.g. conditional mandatory rules);
/// any non-null, non-false value counts as set.
fn flag(data: &Value, name: &str, default: bool) -> bool {
  match data.get(name) {
    None | Some(Value::Null) => default,
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_i64() != Some(0),
    Some(_) => true,
  }
}
