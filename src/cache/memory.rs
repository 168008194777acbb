//! Process-local cache backend.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{is_expired, CacheCounters, CacheDetails, CacheStatistics, FieldCache};
use crate::fields::{CustomField, EntityType};

struct Entry {
  fields: Vec<CustomField>,
  cached_at: DateTime<Utc>,
}

/// In-memory cache with an optional time-to-live per entry.
pub struct MemoryCache {
  enabled: bool,
  ttl: Option<Duration>,
  entries: Mutex<HashMap<EntityType, Entry>>,
  counters: CacheCounters,
}

impl MemoryCache {
  /// Create an enabled cache whose entries never expire.
  pub fn new() -> Self {
    Self {
      enabled: true,
      ttl: None,
      entries: Mutex::new(HashMap::new()),
      counters: CacheCounters::default(),
    }
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }
}

impl Default for MemoryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl FieldCache for MemoryCache {
  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn get_custom_fields(&self, entity_type: EntityType) -> Option<Vec<CustomField>> {
    if !self.enabled {
      return None;
    }

    let mut entries = match self.entries.lock() {
      Ok(entries) => entries,
      Err(e) => {
        warn!("Memory cache lock poisoned: {}", e);
        return None;
      }
    };

    let fresh = entries
      .get(&entity_type)
      .filter(|entry| !is_expired(entry.cached_at, self.ttl))
      .map(|entry| entry.fields.clone());

    match fresh {
      Some(fields) => {
        self.counters.hit();
        Some(fields)
      }
      None => {
        // Drop an expired entry so it doesn't linger in the statistics.
        entries.remove(&entity_type);
        self.counters.miss();
        debug!("Memory cache miss for {}", entity_type);
        None
      }
    }
  }

  fn cache_custom_fields(&self, entity_type: EntityType, fields: &[CustomField]) -> bool {
    if !self.enabled {
      return false;
    }

    match self.entries.lock() {
      Ok(mut entries) => {
        entries.insert(
          entity_type,
          Entry {
            fields: fields.to_vec(),
            cached_at: Utc::now(),
          },
        );
        true
      }
      Err(e) => {
        warn!("Memory cache lock poisoned: {}", e);
        false
      }
    }
  }

  fn invalidate_entity_cache(&self, entity_type: EntityType) -> bool {
    if !self.enabled {
      return false;
    }

    match self.entries.lock() {
      Ok(mut entries) => {
        entries.remove(&entity_type);
        true
      }
      Err(e) => {
        warn!("Memory cache lock poisoned: {}", e);
        false
      }
    }
  }

  fn clear(&self) -> bool {
    if !self.enabled {
      return false;
    }

    match self.entries.lock() {
      Ok(mut entries) => {
        entries.clear();
        true
      }
      Err(e) => {
        warn!("Memory cache lock poisoned: {}", e);
        false
      }
    }
  }

  fn statistics(&self) -> CacheStatistics {
    if !self.enabled {
      return CacheStatistics::disabled();
    }

    let (entries, cached_fields) = self
      .entries
      .lock()
      .map(|entries| {
        entries
          .values()
          .filter(|entry| !is_expired(entry.cached_at, self.ttl))
          .fold((0, 0), |(count, fields), entry| (count + 1, fields + entry.fields.len()))
      })
      .unwrap_or((0, 0));

    CacheStatistics::enabled(CacheDetails {
      backend: "memory".to_string(),
      entries,
      cached_fields,
      hits: self.counters.hits(),
      misses: self.counters.misses(),
      ttl_seconds: self.ttl.map(|ttl| ttl.num_seconds()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::FieldType;

  fn fields() -> Vec<CustomField> {
    vec![
      CustomField::new(EntityType::Deal, 2, "b", "Beta", FieldType::Varchar),
      CustomField::new(EntityType::Deal, 1, "a", "Alpha", FieldType::Double),
    ]
  }

  #[test]
  fn test_round_trip_preserves_order() {
    let cache = MemoryCache::new();
    assert!(cache.cache_custom_fields(EntityType::Deal, &fields()));
    assert_eq!(cache.get_custom_fields(EntityType::Deal), Some(fields()));
  }

  #[test]
  fn test_entries_are_per_entity() {
    let cache = MemoryCache::new();
    cache.cache_custom_fields(EntityType::Deal, &fields());
    assert_eq!(cache.get_custom_fields(EntityType::Person), None);
  }

  #[test]
  fn test_invalidate() {
    let cache = MemoryCache::new();
    cache.cache_custom_fields(EntityType::Deal, &fields());
    assert!(cache.invalidate_entity_cache(EntityType::Deal));
    assert_eq!(cache.get_custom_fields(EntityType::Deal), None);
    assert!(cache.invalidate_entity_cache(EntityType::Deal));
  }

  #[test]
  fn test_expired_entries_miss() {
    let cache = MemoryCache::new().with_ttl(Duration::zero());
    cache.cache_custom_fields(EntityType::Deal, &fields());
    assert_eq!(cache.get_custom_fields(EntityType::Deal), None);
  }

  #[test]
  fn test_expired_entries_are_not_counted() {
    let cache = MemoryCache::new().with_ttl(Duration::zero());
    cache.cache_custom_fields(EntityType::Deal, &fields());
    let details = cache.statistics().details.unwrap();
    assert_eq!(details.entries, 0);
    assert_eq!(details.cached_fields, 0);
  }

  #[test]
  fn test_disabled_cache_is_pass_through() {
    let cache = MemoryCache::new().with_enabled(false);
    assert!(!cache.is_enabled());
    assert!(!cache.cache_custom_fields(EntityType::Deal, &fields()));
    assert_eq!(cache.get_custom_fields(EntityType::Deal), None);
    assert!(!cache.invalidate_entity_cache(EntityType::Deal));
    assert_eq!(cache.statistics(), CacheStatistics::disabled());
  }

  #[test]
  fn test_statistics_count_hits_and_misses() {
    let cache = MemoryCache::new().with_ttl(Duration::minutes(5));
    cache.get_custom_fields(EntityType::Deal);
    cache.cache_custom_fields(EntityType::Deal, &fields());
    cache.get_custom_fields(EntityType::Deal);
    cache.get_custom_fields(EntityType::Deal);

    let details = cache.statistics().details.unwrap();
    assert_eq!(details.backend, "memory");
    assert_eq!(details.entries, 1);
    assert_eq!(details.cached_fields, 2);
    assert_eq!(details.hits, 2);
    assert_eq!(details.misses, 1);
    assert_eq!(details.ttl_seconds, Some(300));
  }

  #[test]
  fn test_clear() {
    let cache = MemoryCache::new();
    cache.cache_custom_fields(EntityType::Deal, &fields());
    cache.cache_custom_fields(EntityType::Person, &[]);
    assert!(cache.clear());
    assert_eq!(cache.statistics().details.unwrap().entries, 0);
  }
}
