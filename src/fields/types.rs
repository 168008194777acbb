//! Catalogue of Pipedrive field type tags.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Semantic grouping of field types, used to pick validation and formatting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
  Text,
  Numeric,
  DateTime,
  OptionSet,
  Relation,
  Composite,
  Other,
}

/// A Pipedrive field type tag.
///
/// Tags Pipedrive may add later are kept verbatim in `Other` so they survive a
/// round trip through the database and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
  Varchar,
  VarcharAuto,
  Text,
  Double,
  Int,
  Monetary,
  Date,
  DateRange,
  Time,
  TimeRange,
  Set,
  Enum,
  User,
  Org,
  People,
  Phone,
  Address,
  VisibleTo,
  Status,
  Stage,
  Other(String),
}

impl FieldType {
  /// Every recognized tag, in registry order.
  pub const KNOWN: &'static [FieldType] = &[
    FieldType::Varchar,
    FieldType::VarcharAuto,
    FieldType::Text,
    FieldType::Double,
    FieldType::Int,
    FieldType::Monetary,
    FieldType::Date,
    FieldType::DateRange,
    FieldType::Time,
    FieldType::TimeRange,
    FieldType::Set,
    FieldType::Enum,
    FieldType::User,
    FieldType::Org,
    FieldType::People,
    FieldType::Phone,
    FieldType::Address,
    FieldType::VisibleTo,
    FieldType::Status,
    FieldType::Stage,
  ];

  /// Option-backed types (single and multiple choice).
  pub const OPTIONS: &'static [FieldType] = &[FieldType::Set, FieldType::Enum];

  /// Types whose value references another Pipedrive record.
  pub const RELATIONS: &'static [FieldType] = &[FieldType::User, FieldType::Org, FieldType::People];

  /// The tag as stored by Pipedrive and in the local table.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Varchar => "varchar",
      Self::VarcharAuto => "varchar_auto",
      Self::Text => "text",
      Self::Double => "double",
      Self::Int => "int",
      Self::Monetary => "monetary",
      Self::Date => "date",
      Self::DateRange => "daterange",
      Self::Time => "time",
      Self::TimeRange => "timerange",
      Self::Set => "set",
      Self::Enum => "enum",
      Self::User => "user",
      Self::Org => "org",
      Self::People => "people",
      Self::Phone => "phone",
      Self::Address => "address",
      Self::VisibleTo => "visible_to",
      Self::Status => "status",
      Self::Stage => "stage",
      Self::Other(tag) => tag,
    }
  }

  pub fn category(&self) -> FieldCategory {
    match self {
      Self::Varchar | Self::VarcharAuto | Self::Text | Self::Phone => FieldCategory::Text,
      Self::Double | Self::Int => FieldCategory::Numeric,
      Self::Date | Self::Time => FieldCategory::DateTime,
      Self::Set | Self::Enum | Self::VisibleTo | Self::Status => FieldCategory::OptionSet,
      Self::User | Self::Org | Self::People | Self::Stage => FieldCategory::Relation,
      Self::Monetary | Self::DateRange | Self::TimeRange | Self::Address => {
        FieldCategory::Composite
      }
      Self::Other(_) => FieldCategory::Other,
    }
  }

  /// Single-line text types limited to 255 characters.
  pub fn is_short_text(&self) -> bool {
    matches!(self, Self::Varchar | Self::VarcharAuto)
  }

  /// Types whose value must be numeric.
  pub fn is_numeric(&self) -> bool {
    self.category() == FieldCategory::Numeric
  }

  /// Types whose value is one or more option ids from the field's option list.
  pub fn is_option(&self) -> bool {
    matches!(self, Self::Set | Self::Enum)
  }
}

impl FromStr for FieldType {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let tag = s.trim();
    Ok(
      Self::KNOWN
        .iter()
        .find(|known| known.as_str() == tag)
        .cloned()
        .unwrap_or_else(|| Self::Other(tag.to_string())),
    )
  }
}

impl From<&str> for FieldType {
  fn from(s: &str) -> Self {
    match s.parse() {
      Ok(field_type) => field_type,
      Err(never) => match never {},
    }
  }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

impl Serialize for FieldType {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for FieldType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let tag = String::deserialize(deserializer)?;
    Ok(FieldType::from(tag.as_str()))
  }
}
