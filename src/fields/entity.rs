use color_eyre::{eyre::eyre, Report};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipedrive record types that carry their own field definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
  Deal,
  Person,
  #[serde(alias = "organization")]
  Org,
  Product,
  Activity,
  Note,
  Lead,
  Project,
}

impl EntityType {
  pub const ALL: [EntityType; 8] = [
    EntityType::Deal,
    EntityType::Person,
    EntityType::Org,
    EntityType::Product,
    EntityType::Activity,
    EntityType::Note,
    EntityType::Lead,
    EntityType::Project,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Deal => "deal",
      Self::Person => "person",
      Self::Org => "org",
      Self::Product => "product",
      Self::Activity => "activity",
      Self::Note => "note",
      Self::Lead => "lead",
      Self::Project => "project",
    }
  }
}

impl FromStr for EntityType {
  type Err = Report;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_lowercase();
    if normalized == "organization" {
      return Ok(Self::Org);
    }
    Self::ALL
      .into_iter()
      .find(|entity| entity.as_str() == normalized)
      .ok_or_else(|| eyre!("Unknown entity type: {}", s))
  }
}

impl fmt::Display for EntityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}
