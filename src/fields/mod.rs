//! Pipedrive field definitions: entity types, field type registry, the stored
//! field model and decoded field values.

pub mod entity;
pub mod model;
pub mod types;
pub mod value;

pub use entity::EntityType;
pub use model::{CustomField, FieldOption, OptionId};
pub use types::{FieldCategory, FieldType};
pub use value::FieldValue;
