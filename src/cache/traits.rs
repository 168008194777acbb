//! The cache port and the types shared by its backends.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::fields::{CustomField, EntityType};

/// Key-value cache of field definitions, one entry per entity type.
///
/// Implementations never fail loudly. A disabled cache or a backend error reads
/// as a miss (`None`) and writes as `false`, so callers can always fall back to
/// the database.
pub trait FieldCache: Send + Sync {
  fn is_enabled(&self) -> bool;

  /// All cached fields for `entity_type`, in the order they were stored.
  fn get_custom_fields(&self, entity_type: EntityType) -> Option<Vec<CustomField>>;

  /// Replace the entry for `entity_type`. Returns false if nothing was stored.
  fn cache_custom_fields(&self, entity_type: EntityType, fields: &[CustomField]) -> bool;

  /// Drop the entry for `entity_type`. Dropping a missing entry succeeds.
  fn invalidate_entity_cache(&self, entity_type: EntityType) -> bool;

  /// Drop every entry.
  fn clear(&self) -> bool;

  fn statistics(&self) -> CacheStatistics;
}

impl<C: FieldCache + ?Sized> FieldCache for Box<C> {
  fn is_enabled(&self) -> bool {
    (**self).is_enabled()
  }

  fn get_custom_fields(&self, entity_type: EntityType) -> Option<Vec<CustomField>> {
    (**self).get_custom_fields(entity_type)
  }

  fn cache_custom_fields(&self, entity_type: EntityType, fields: &[CustomField]) -> bool {
    (**self).cache_custom_fields(entity_type, fields)
  }

  fn invalidate_entity_cache(&self, entity_type: EntityType) -> bool {
    (**self).invalidate_entity_cache(entity_type)
  }

  fn clear(&self) -> bool {
    (**self).clear()
  }

  fn statistics(&self) -> CacheStatistics {
    (**self).statistics()
  }
}

impl<C: FieldCache + ?Sized> FieldCache for Arc<C> {
  fn is_enabled(&self) -> bool {
    (**self).is_enabled()
  }

  fn get_custom_fields(&self, entity_type: EntityType) -> Option<Vec<CustomField>> {
    (**self).get_custom_fields(entity_type)
  }

  fn cache_custom_fields(&self, entity_type: EntityType, fields: &[CustomField]) -> bool {
    (**self).cache_custom_fields(entity_type, fields)
  }

  fn invalidate_entity_cache(&self, entity_type: EntityType) -> bool {
    (**self).invalidate_entity_cache(entity_type)
  }

  fn clear(&self) -> bool {
    (**self).clear()
  }

  fn statistics(&self) -> CacheStatistics {
    (**self).statistics()
  }
}

/// Cache key for an entity type's field list.
pub fn cache_key(entity_type: EntityType) -> String {
  format!("pipedrive:custom_fields:{}", entity_type)
}

/// Whether an entry cached at `cached_at` has outlived `ttl`.
pub(crate) fn is_expired(cached_at: DateTime<Utc>, ttl: Option<Duration>) -> bool {
  ttl.is_some_and(|ttl| Utc::now() - cached_at >= ttl)
}

/// Snapshot of a cache backend's state.
///
/// A disabled cache serializes as `{"enabled": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
  pub enabled: bool,
  #[serde(flatten)]
  pub details: Option<CacheDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDetails {
  pub backend: String,
  /// Entity types currently cached
  pub entries: usize,
  /// Field definitions across all entries
  pub cached_fields: usize,
  pub hits: u64,
  pub misses: u64,
  pub ttl_seconds: Option<i64>,
}

impl CacheStatistics {
  pub fn disabled() -> Self {
    Self {
      enabled: false,
      details: None,
    }
  }

  pub fn enabled(details: CacheDetails) -> Self {
    Self {
      enabled: true,
      details: Some(details),
    }
  }
}

/// Hit/miss counters shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
  hits: AtomicU64,
  misses: AtomicU64,
}

impl CacheCounters {
  pub fn hit(&self) {
    self.hits.fetch_add(1, Ordering::Relaxed);
  }

  pub fn miss(&self) {
    self.misses.fetch_add(1, Ordering::Relaxed);
  }

  pub fn hits(&self) -> u64 {
    self.hits.load(Ordering::Relaxed)
  }

  pub fn misses(&self) -> u64 {
    self.misses.load(Ordering::Relaxed)
  }
}
