use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{DisabledCache, FieldCache, MemoryCache, SqliteCache};
use crate::db::Database;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Path to the field database (defaults to the data directory)
  pub database: Option<PathBuf>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
  /// Per-process map, gone when the process exits
  Memory,
  /// SQLite file that survives restarts
  #[default]
  Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  #[serde(default)]
  pub driver: CacheDriver,
  /// Entry lifetime in seconds; 0 keeps entries until invalidated
  #[serde(default = "default_ttl_seconds")]
  pub ttl_seconds: u64,
  /// Cache database path for the sqlite driver
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: default_enabled(),
      driver: CacheDriver::default(),
      ttl_seconds: default_ttl_seconds(),
      path: None,
    }
  }
}

fn default_enabled() -> bool {
  true
}

fn default_ttl_seconds() -> u64 {
  3600
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Directory for the log file (defaults to the data directory)
  pub directory: Option<PathBuf>,
  /// tracing filter directive, e.g. "info" or "pipedrive_fields=debug"
  pub filter: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pipedrive-fields.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pipedrive-fields/config.yaml
  ///
  /// Falls back to defaults when no file is found. Environment overrides are
  /// applied last.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    Ok(config.with_env_overrides())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pipedrive-fields.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pipedrive-fields").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    // An empty file parses as YAML null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Self = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.cache.validate()?;
    Ok(config)
  }

  /// Apply `PIPEDRIVE_FIELDS_CACHE` (enable/disable) and
  /// `PIPEDRIVE_FIELDS_LOG` (log filter).
  fn with_env_overrides(mut self) -> Self {
    if let Ok(value) = std::env::var("PIPEDRIVE_FIELDS_CACHE") {
      if let Some(enabled) = parse_bool(&value) {
        self.cache.enabled = enabled;
      }
    }
    if let Ok(filter) = std::env::var("PIPEDRIVE_FIELDS_LOG") {
      self.log.filter = Some(filter);
    }
    self
  }

  /// Open the field database.
  pub fn open_database(&self) -> Result<Database> {
    Database::open(self.database.as_deref())
  }

  /// Fail unless the configured cache outlives this process.
  ///
  /// Commands that manage cache entries (refresh, invalidate, clear, stats)
  /// would act on an empty map with the memory driver.
  pub fn ensure_persistent_cache(&self) -> Result<()> {
    if self.cache.enabled && self.cache.driver == CacheDriver::Memory {
      return Err(eyre!(
        "The memory cache only lives for one command. Set `cache.driver: sqlite` to manage it"
      ));
    }
    Ok(())
  }

  /// Build the configured cache backend.
  pub fn build_cache(&self) -> Result<Box<dyn FieldCache>> {
    let cache = &self.cache;
    if !cache.enabled {
      return Ok(Box::new(DisabledCache));
    }

    cache.validate()?;
    let ttl = cache.ttl();
    let backend: Box<dyn FieldCache> = match cache.driver {
      CacheDriver::Memory => {
        let backend = MemoryCache::new();
        Box::new(match ttl {
          Some(ttl) => backend.with_ttl(ttl),
          None => backend,
        })
      }
      CacheDriver::Sqlite => {
        let backend = SqliteCache::open(cache.path.as_deref())?;
        Box::new(match ttl {
          Some(ttl) => backend.with_ttl(ttl),
          None => backend,
        })
      }
    };
    Ok(backend)
  }

  /// Directory the log file is written to.
  pub fn log_directory(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.log.directory {
      return Ok(dir.clone());
    }
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;
    Ok(data_dir.join("pipedrive-fields"))
  }
}

impl CacheConfig {
  /// Entry lifetime, `None` when entries never expire or the value is out of range.
  pub fn ttl(&self) -> Option<Duration> {
    if self.ttl_seconds == 0 {
      return None;
    }
    i64::try_from(self.ttl_seconds)
      .ok()
      .and_then(Duration::try_seconds)
  }

  fn validate(&self) -> Result<()> {
    if self.ttl_seconds > 0 && self.ttl().is_none() {
      return Err(eyre!(
        "cache.ttl_seconds is out of range: {} (use 0 to never expire)",
        self.ttl_seconds
      ));
    }
    Ok(())
  }
}

fn parse_bool(value: &str) -> Option<bool> {
  match value.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::{CustomField, EntityType, FieldType};

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert!(config.cache.enabled);
    assert_eq!(config.cache.driver, CacheDriver::Sqlite);
    assert_eq!(config.cache.ttl(), Some(Duration::hours(1)));
    assert!(config.database.is_none());
  }

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
database: /tmp/fields.db
cache:
  enabled: false
  driver: sqlite
  ttl_seconds: 0
  path: /tmp/cache.db
log:
  filter: debug
"#,
    )
    .unwrap();

    assert_eq!(config.database, Some(PathBuf::from("/tmp/fields.db")));
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.driver, CacheDriver::Sqlite);
    assert_eq!(config.cache.ttl(), None);
    assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/cache.db")));
    assert_eq!(config.log.filter.as_deref(), Some("debug"));
  }

  #[test]
  fn test_unknown_driver_is_rejected() {
    assert!(Config::parse("cache:\n  driver: redis\n").is_err());
  }

  #[test]
  fn test_disabled_cache_builds_pass_through_backend() {
    let mut config = Config::default();
    config.cache.enabled = false;
    let cache = config.build_cache().unwrap();
    assert!(!cache.is_enabled());
  }

  #[test]
  fn test_memory_cache_backend() {
    let config = Config::parse("cache:\n  driver: memory\n").unwrap();
    let cache = config.build_cache().unwrap();
    assert!(cache.is_enabled());
    let details = cache.statistics().details.unwrap();
    assert_eq!(details.backend, "memory");
    assert_eq!(details.ttl_seconds, Some(3600));
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/pipedrive-fields.yaml"))).is_err());
  }

  #[test]
  fn test_ttl_out_of_range_is_rejected() {
    assert!(Config::parse("cache:\n  ttl_seconds: 18446744073709551615\n").is_err());
    assert!(Config::parse("cache:\n  ttl_seconds: 10000000000000000\n").is_err());

    let mut config = Config::default();
    config.cache.driver = CacheDriver::Memory;
    config.cache.ttl_seconds = u64::MAX;
    assert_eq!(config.cache.ttl(), None);
    assert!(config.build_cache().is_err());
  }

  #[test]
  fn test_largest_ttl_is_accepted() {
    let max = (i64::MAX / 1000) as u64;
    let yaml = format!("cache:\n  driver: memory\n  ttl_seconds: {}\n", max);
    let config = Config::parse(&yaml).unwrap();
    assert_eq!(config.cache.ttl(), Some(Duration::seconds(max as i64)));

    let cache = config.build_cache().unwrap();
    let field = CustomField::new(EntityType::Deal, 1, "title", "Title", FieldType::Varchar);
    assert!(cache.cache_custom_fields(EntityType::Deal, &[field]));
    assert!(cache.get_custom_fields(EntityType::Deal).is_some());
  }

  #[test]
  fn test_cache_management_needs_persistent_driver() {
    assert!(Config::default().ensure_persistent_cache().is_ok());

    let mut config = Config::default();
    config.cache.driver = CacheDriver::Memory;
    assert!(config.ensure_persistent_cache().is_err());

    config.cache.enabled = false;
    assert!(config.ensure_persistent_cache().is_ok());
  }

  #[test]
  fn test_parse_bool() {
    assert_eq!(parse_bool("FALSE"), Some(false));
    assert_eq!(parse_bool(" 1 "), Some(true));
    assert_eq!(parse_bool("maybe"), None);
  }
}
