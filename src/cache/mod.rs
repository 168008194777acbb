//! Cache port for field definitions and its backends.
//!
//! The service talks to a `FieldCache`. Three backends are provided:
//! - `DisabledCache`: caching turned off, every read misses
//! - `MemoryCache`: per-process map with optional TTL
//! - `SqliteCache`: on-disk entries that survive restarts, optional TTL

mod memory;
mod storage;
mod traits;

pub use memory::MemoryCache;
pub use storage::{DisabledCache, SqliteCache};
pub use traits::{cache_key, CacheDetails, CacheStatistics, FieldCache};
