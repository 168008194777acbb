//! SQLite cache backend and the disabled (no-op) backend.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{
  cache_key, is_expired, CacheCounters, CacheDetails, CacheStatistics, FieldCache,
};
use crate::fields::{CustomField, EntityType};

/// Backend used when caching is turned off.
/// Every read misses and every write reports failure.
pub struct DisabledCache;

impl FieldCache for DisabledCache {
  fn is_enabled(&self) -> bool {
    false
  }

  fn get_custom_fields(&self, _entity_type: EntityType) -> Option<Vec<CustomField>> {
    None // Always miss
  }

  fn cache_custom_fields(&self, _entity_type: EntityType, _fields: &[CustomField]) -> bool {
    false // Discard
  }

  fn invalidate_entity_cache(&self, _entity_type: EntityType) -> bool {
    false
  }

  fn clear(&self) -> bool {
    false
  }

  fn statistics(&self) -> CacheStatistics {
    CacheStatistics::disabled()
  }
}

/// SQLite-based cache that survives process restarts.
///
/// Entries are stored as JSON arrays under the SHA-256 of the entity's cache key.
pub struct SqliteCache {
  conn: Mutex<Connection>,
  ttl: Option<Duration>,
  counters: CacheCounters,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS field_cache (
    key_hash TEXT PRIMARY KEY,
    cache_key TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    data BLOB NOT NULL,
    field_count INTEGER NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteCache {
  /// Create a new SQLite cache at `path`, or the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let cache = Self {
      conn: Mutex::new(conn),
      ttl: None,
      counters: CacheCounters::default(),
    };
    cache.run_migrations()?;
    Ok(cache)
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  /// Get the default cache database path.
  pub fn default_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
      .ok_or_else(|| eyre!("Could not determine cache directory"))?;

    Ok(cache_dir.join("pipedrive-fields").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn try_get(&self, entity_type: EntityType) -> Result<Option<Vec<CustomField>>> {
    let conn = self.lock()?;
    let key_hash = hash_key(&cache_key(entity_type));

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM field_cache WHERE key_hash = ?",
        params![key_hash],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    let Some((data, cached_at)) = row else {
      return Ok(None);
    };

    if is_expired(parse_datetime(&cached_at)?, self.ttl) {
      debug!("Cache entry for {} expired", entity_type);
      conn
        .execute("DELETE FROM field_cache WHERE key_hash = ?", params![key_hash])
        .map_err(|e| eyre!("Failed to drop expired cache entry: {}", e))?;
      return Ok(None);
    }

    let fields = serde_json::from_slice(&data)
      .map_err(|e| eyre!("Failed to deserialize cached fields: {}", e))?;
    Ok(Some(fields))
  }

  fn try_store(&self, entity_type: EntityType, fields: &[CustomField]) -> Result<()> {
    let conn = self.lock()?;
    let key = cache_key(entity_type);
    let data =
      serde_json::to_vec(fields).map_err(|e| eyre!("Failed to serialize fields: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO field_cache
           (key_hash, cache_key, entity_type, data, field_count, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![hash_key(&key), key, entity_type.as_str(), data, fields.len()],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn try_delete(&self, entity_type: Option<EntityType>) -> Result<()> {
    let conn = self.lock()?;
    let deleted = match entity_type {
      Some(entity_type) => conn.execute(
        "DELETE FROM field_cache WHERE key_hash = ?",
        params![hash_key(&cache_key(entity_type))],
      ),
      None => conn.execute("DELETE FROM field_cache", []),
    }
    .map_err(|e| eyre!("Failed to delete cache entries: {}", e))?;
    debug!("Removed {} cache entries", deleted);
    Ok(())
  }

  /// Entry and field counts, leaving out entries past their TTL.
  fn try_sizes(&self) -> Result<(usize, usize)> {
    let conn = self.lock()?;
    let cutoff = self.ttl.map(|ttl| format!("-{} seconds", ttl.num_seconds()));
    let (entries, fields): (i64, i64) = conn
      .query_row(
        "SELECT COUNT(*), COALESCE(SUM(field_count), 0) FROM field_cache
         WHERE ?1 IS NULL OR cached_at > datetime('now', ?1)",
        params![cutoff],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .map_err(|e| eyre!("Failed to read cache statistics: {}", e))?;
    Ok((entries as usize, fields as usize))
  }
}

impl FieldCache for SqliteCache {
  fn is_enabled(&self) -> bool {
    true
  }

  fn get_custom_fields(&self, entity_type: EntityType) -> Option<Vec<CustomField>> {
    match self.try_get(entity_type) {
      Ok(Some(fields)) => {
        self.counters.hit();
        Some(fields)
      }
      Ok(None) => {
        self.counters.miss();
        None
      }
      Err(e) => {
        self.counters.miss();
        warn!("Cache read failed for {}, treating as miss: {}", entity_type, e);
        None
      }
    }
  }

  fn cache_custom_fields(&self, entity_type: EntityType, fields: &[CustomField]) -> bool {
    self
      .try_store(entity_type, fields)
      .map_err(|e| warn!("Cache write failed for {}: {}", entity_type, e))
      .is_ok()
  }

  fn invalidate_entity_cache(&self, entity_type: EntityType) -> bool {
    self
      .try_delete(Some(entity_type))
      .map_err(|e| warn!("Cache invalidation failed for {}: {}", entity_type, e))
      .is_ok()
  }

  fn clear(&self) -> bool {
    self
      .try_delete(None)
      .map_err(|e| warn!("Cache clear failed: {}", e))
      .is_ok()
  }

  fn statistics(&self) -> CacheStatistics {
    let (entries, cached_fields) = self.try_sizes().unwrap_or_else(|e| {
      warn!("{}", e);
      (0, 0)
    });

    CacheStatistics::enabled(CacheDetails {
      backend: "sqlite".to_string(),
      entries,
      cached_fields,
      hits: self.counters.hits(),
      misses: self.counters.misses(),
      ttl_seconds: self.ttl.map(|ttl| ttl.num_seconds()),
    })
  }
}

/// SHA256 hash for stable, fixed-length keys
fn hash_key(key: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(key.as_bytes());
  hex::encode(hasher.finalize())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
