//! Custom field service: read-through caching over the field repository,
//! plus validation and display formatting of field values.

mod format;
mod validate;

pub use format::format_amount;
pub use validate::{ValidationResult, MAX_TEXT_LENGTH};

use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStatistics, FieldCache};
use crate::fields::{CustomField, EntityType, FieldType};
use crate::repository::{FieldQuery, FieldRepository};

/// Options for the bulk per-entity reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
  /// Only return fields with `active_flag` set
  pub active_only: bool,
  /// Consult and populate the cache
  pub use_cache: bool,
}

impl Default for ListOptions {
  fn default() -> Self {
    Self {
      active_only: true,
      use_cache: true,
    }
  }
}

impl ListOptions {
  pub fn include_inactive(mut self) -> Self {
    self.active_only = false;
    self
  }

  pub fn bypass_cache(mut self) -> Self {
    self.use_cache = false;
    self
  }
}

/// Live field counts for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldStatistics {
  pub total: usize,
  pub active: usize,
  pub custom: usize,
  pub mandatory: usize,
  pub by_type: BTreeMap<String, usize>,
}

/// Field lookups with a read-through cache in front of the repository.
///
/// Only the bulk per-entity reads go through the cache. Narrow queries (by type,
/// visibility, key or id) and statistics always hit the repository.
///
/// The cache always holds the complete, unfiltered field list of an entity type.
/// `active_only` and custom-only filters are applied after reading, so requests
/// with different filters share one cache entry.
pub struct CustomFieldService<R: FieldRepository, C: FieldCache> {
  repository: R,
  cache: C,
}

impl<R: FieldRepository, C: FieldCache> CustomFieldService<R, C> {
  pub fn new(repository: R, cache: C) -> Self {
    Self { repository, cache }
  }

  pub fn repository(&self) -> &R {
    &self.repository
  }

  pub fn cache(&self) -> &C {
    &self.cache
  }

  /// All fields of an entity type, ordered by name.
  pub fn fields_for_entity(
    &self,
    entity_type: EntityType,
    options: ListOptions,
  ) -> Result<Vec<CustomField>> {
    let query = FieldQuery::for_entity(entity_type).active_if(options.active_only);
    self.read_through(query, options.use_cache)
  }

  /// User-defined fields of an entity type, excluding Pipedrive built-ins.
  pub fn custom_fields_for_entity(
    &self,
    entity_type: EntityType,
    options: ListOptions,
  ) -> Result<Vec<CustomField>> {
    let query = FieldQuery::for_entity(entity_type)
      .custom_only()
      .active_if(options.active_only);
    self.read_through(query, options.use_cache)
  }

  fn read_through(&self, query: FieldQuery, use_cache: bool) -> Result<Vec<CustomField>> {
    let entity_type = query.entity_type();

    if !use_cache || !self.cache.is_enabled() {
      return self.repository.fetch(&query);
    }

    if let Some(cached) = self.cache.get_custom_fields(entity_type) {
      debug!("Serving {} fields from cache", entity_type);
      return Ok(query.apply(cached));
    }

    debug!("Cache miss for {} fields, loading from database", entity_type);
    let all = self.repository.fetch(&FieldQuery::for_entity(entity_type))?;

    if !self.cache.cache_custom_fields(entity_type, &all) {
      warn!("Failed to cache fields for entity type: {}", entity_type);
    }

    Ok(query.apply(all))
  }

  pub fn fields_by_type(
    &self,
    entity_type: EntityType,
    field_type: FieldType,
    active_only: bool,
  ) -> Result<Vec<CustomField>> {
    self.repository.fetch(
      &FieldQuery::for_entity(entity_type)
        .of_type(field_type)
        .active_if(active_only),
    )
  }

  /// Active mandatory fields.
  pub fn mandatory_fields(&self, entity_type: EntityType) -> Result<Vec<CustomField>> {
    self
      .repository
      .fetch(&FieldQuery::for_entity(entity_type).mandatory().active())
  }

  /// Active fields shown in the "add" dialog.
  pub fn add_visible_fields(&self, entity_type: EntityType) -> Result<Vec<CustomField>> {
    self
      .repository
      .fetch(&FieldQuery::for_entity(entity_type).visible_in_add().active())
  }

  /// Active fields shown in the detail view.
  pub fn detail_visible_fields(&self, entity_type: EntityType) -> Result<Vec<CustomField>> {
    self
      .repository
      .fetch(&FieldQuery::for_entity(entity_type).visible_in_details().active())
  }

  /// Active single and multiple choice fields.
  pub fn option_fields(&self, entity_type: EntityType) -> Result<Vec<CustomField>> {
    self.repository.fetch(
      &FieldQuery::for_entity(entity_type)
        .type_in(FieldType::OPTIONS)
        .active(),
    )
  }

  /// Active fields referencing users, organizations or people.
  pub fn relation_fields(&self, entity_type: EntityType) -> Result<Vec<CustomField>> {
    self.repository.fetch(
      &FieldQuery::for_entity(entity_type)
        .type_in(FieldType::RELATIONS)
        .active(),
    )
  }

  pub fn find_by_key(&self, key: &str, entity_type: EntityType) -> Result<Option<CustomField>> {
    self.repository.find_by_key(key, entity_type)
  }

  pub fn find_by_id(
    &self,
    pipedrive_id: i64,
    entity_type: EntityType,
  ) -> Result<Option<CustomField>> {
    self.repository.find_by_pipedrive_id(pipedrive_id, entity_type)
  }

  pub fn field_statistics(&self, entity_type: EntityType) -> Result<FieldStatistics> {
    let all = FieldQuery::for_entity(entity_type);

    Ok(FieldStatistics {
      total: self.repository.count(&all)?,
      active: self.repository.count(&all.clone().active())?,
      custom: self.repository.count(&all.clone().custom_only())?,
      mandatory: self.repository.count(&all.mandatory())?,
      by_type: self.repository.count_by_type(entity_type)?,
    })
  }

  /// Check `value` against the field's rules. Errors are returned, never raised.
  pub fn validate_field_value(&self, field: &CustomField, value: &Value) -> ValidationResult {
    validate::validate_value(field, value)
  }

  /// Render `value` for display according to the field's type.
  pub fn format_field_value(&self, field: &CustomField, value: &Value) -> String {
    format::format_value(field, value)
  }

  /// Drop the cached fields of an entity type.
  /// Succeeds trivially when caching is disabled.
  pub fn invalidate_cache(&self, entity_type: EntityType) -> bool {
    if !self.cache.is_enabled() {
      return true;
    }

    let success = self.cache.invalidate_entity_cache(entity_type);
    if success {
      info!("Cache invalidated for entity type: {}", entity_type);
    } else {
      warn!("Failed to invalidate cache for entity type: {}", entity_type);
    }
    success
  }

  /// Reload the full field list of an entity type into the cache.
  /// Returns false when caching is disabled or the reload fails.
  pub fn refresh_cache(&self, entity_type: EntityType) -> bool {
    if !self.cache.is_enabled() {
      return false;
    }

    let fields = match self.repository.fetch(&FieldQuery::for_entity(entity_type)) {
      Ok(fields) => fields,
      Err(e) => {
        error!("Error refreshing cache for {}: {}", entity_type, e);
        return false;
      }
    };

    let success = self.cache.cache_custom_fields(entity_type, &fields);
    if success {
      info!(
        "Cache refreshed for entity type: {} ({} fields)",
        entity_type,
        fields.len()
      );
    } else {
      warn!("Failed to refresh cache for entity type: {}", entity_type);
    }
    success
  }

  pub fn cache_statistics(&self) -> CacheStatistics {
    if !self.cache.is_enabled() {
      return CacheStatistics::disabled();
    }
    self.cache.statistics()
  }
}
