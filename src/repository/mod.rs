//! Database-backed access to stored field definitions.

mod query;
mod sqlite;

pub use query::{FieldFilter, FieldQuery};
pub use sqlite::SqliteFieldRepository;

use color_eyre::Result;
use std::collections::BTreeMap;

use crate::fields::{CustomField, EntityType};

/// Read access to stored field definitions.
///
/// `fetch` orders by `name` using byte-wise (case-sensitive) comparison, then by
/// `pipedrive_id`, so "Zeta" sorts before "alpha".
pub trait FieldRepository: Send + Sync {
  /// Fields matching every filter in `query`, ordered by name.
  fn fetch(&self, query: &FieldQuery) -> Result<Vec<CustomField>>;

  /// Number of fields matching `query`.
  fn count(&self, query: &FieldQuery) -> Result<usize>;

  /// Field count per field type tag for one entity type.
  fn count_by_type(&self, entity_type: EntityType) -> Result<BTreeMap<String, usize>>;

  fn find_by_key(&self, key: &str, entity_type: EntityType) -> Result<Option<CustomField>>;

  fn find_by_pipedrive_id(
    &self,
    pipedrive_id: i64,
    entity_type: EntityType,
  ) -> Result<Option<CustomField>>;
}
