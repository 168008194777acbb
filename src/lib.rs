//! Local mirror and read-through cache for Pipedrive custom field definitions.
//!
//! Field definitions live in a SQLite table (`db`, `repository`). The
//! `CustomFieldService` serves them through a pluggable `FieldCache`, and
//! validates and formats field values according to their Pipedrive field type.

pub mod cache;
pub mod config;
pub mod db;
pub mod fields;
pub mod repository;
pub mod service;

pub use cache::{CacheStatistics, FieldCache};
pub use fields::{CustomField, EntityType, FieldType, FieldValue};
pub use repository::{FieldQuery, FieldRepository, SqliteFieldRepository};
pub use service::{CustomFieldService, FieldStatistics, ListOptions, ValidationResult};
