//! SQLite implementation of the field repository.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::collections::BTreeMap;
use tracing::debug;

use super::{FieldQuery, FieldRepository};
use crate::db::Database;
use crate::fields::{CustomField, EntityType, FieldType};

const COLUMNS: &str = "key, pipedrive_id, entity_type, name, field_type, mandatory_flag, \
  active_flag, edit_flag, add_visible_flag, details_visible_flag, options, pipedrive_data, \
  updated_at";

const ORDER: &str = "ORDER BY name COLLATE BINARY ASC, pipedrive_id ASC";

/// Row as stored, before JSON columns and tags are decoded.
struct FieldRow {
  key: String,
  pipedrive_id: i64,
  entity_type: String,
  name: String,
  field_type: String,
  mandatory_flag: bool,
  active_flag: bool,
  edit_flag: bool,
  add_visible_flag: bool,
  details_visible_flag: bool,
  options: String,
  pipedrive_data: String,
  updated_at: Option<String>,
}

impl FieldRow {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      key: row.get(0)?,
      pipedrive_id: row.get(1)?,
      entity_type: row.get(2)?,
      name: row.get(3)?,
      field_type: row.get(4)?,
      mandatory_flag: row.get(5)?,
      active_flag: row.get(6)?,
      edit_flag: row.get(7)?,
      add_visible_flag: row.get(8)?,
      details_visible_flag: row.get(9)?,
      options: row.get(10)?,
      pipedrive_data: row.get(11)?,
      updated_at: row.get(12)?,
    })
  }

  fn into_field(self) -> Result<CustomField> {
    let options = serde_json::from_str(&self.options)
      .map_err(|e| eyre!("Failed to parse options for field {}: {}", self.key, e))?;
    let pipedrive_data = serde_json::from_str(&self.pipedrive_data)
      .map_err(|e| eyre!("Failed to parse payload for field {}: {}", self.key, e))?;

    Ok(CustomField {
      entity_type: self.entity_type.parse()?,
      field_type: FieldType::from(self.field_type.as_str()),
      key: self.key,
      pipedrive_id: self.pipedrive_id,
      name: self.name,
      mandatory_flag: self.mandatory_flag,
      active_flag: self.active_flag,
      edit_flag: self.edit_flag,
      add_visible_flag: self.add_visible_flag,
      details_visible_flag: self.details_visible_flag,
      options,
      pipedrive_data,
      updated_at: self.updated_at,
    })
  }
}

/// Field repository over the local SQLite mirror.
pub struct SqliteFieldRepository {
  db: Database,
}

impl SqliteFieldRepository {
  pub fn new(db: Database) -> Self {
    Self { db }
  }

  /// Insert or update one field, matched on `(pipedrive_id, entity_type)`.
  pub fn upsert(&self, field: &CustomField) -> Result<()> {
    self.upsert_all(std::slice::from_ref(field))
  }

  /// Insert or update many fields in one transaction.
  pub fn upsert_all(&self, fields: &[CustomField]) -> Result<()> {
    let mut conn = self.db.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for field in fields {
      let options = serde_json::to_string(&field.options)
        .map_err(|e| eyre!("Failed to serialize options for {}: {}", field.key, e))?;
      let pipedrive_data = serde_json::to_string(&field.pipedrive_data)
        .map_err(|e| eyre!("Failed to serialize payload for {}: {}", field.key, e))?;

      // field_type is fixed at creation and is left out of the update.
      tx.execute(
        "INSERT INTO pipedrive_custom_fields
           (key, pipedrive_id, entity_type, name, field_type, mandatory_flag, active_flag,
            edit_flag, add_visible_flag, details_visible_flag, options, pipedrive_data, updated_at,
            synced_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
         ON CONFLICT (pipedrive_id, entity_type) DO UPDATE SET
           key = excluded.key,
           name = excluded.name,
           mandatory_flag = excluded.mandatory_flag,
           active_flag = excluded.active_flag,
           edit_flag = excluded.edit_flag,
           add_visible_flag = excluded.add_visible_flag,
           details_visible_flag = excluded.details_visible_flag,
           options = excluded.options,
           pipedrive_data = excluded.pipedrive_data,
           updated_at = excluded.updated_at,
           synced_at = excluded.synced_at",
        params![
          field.key,
          field.pipedrive_id,
          field.entity_type.as_str(),
          field.name,
          field.field_type.as_str(),
          field.mandatory_flag,
          field.active_flag,
          field.edit_flag,
          field.add_visible_flag,
          field.details_visible_flag,
          options,
          pipedrive_data,
          field.updated_at,
        ],
      )
      .map_err(|e| eyre!("Failed to store field {}: {}", field.key, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    debug!("Stored {} field definitions", fields.len());
    Ok(())
  }

  fn fetch_one(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<CustomField>> {
    let conn = self.db.conn()?;
    let row = conn
      .query_row(sql, params, FieldRow::from_row)
      .optional()
      .map_err(|e| eyre!("Failed to query field: {}", e))?;
    row.map(FieldRow::into_field).transpose()
  }
}

impl FieldRepository for SqliteFieldRepository {
  fn fetch(&self, query: &FieldQuery) -> Result<Vec<CustomField>> {
    let (clause, params) = query.where_clause();
    let sql = format!(
      "SELECT {} FROM pipedrive_custom_fields WHERE {} {}",
      COLUMNS, clause, ORDER
    );

    let conn = self.db.conn()?;
    let mut stmt = conn
      .prepare(&sql)
      .map_err(|e| eyre!("Failed to prepare field query: {}", e))?;

    let rows = stmt
      .query_map(params_from_iter(params.iter()), FieldRow::from_row)
      .map_err(|e| eyre!("Failed to query fields: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read field row: {}", e))?;

    rows.into_iter().map(FieldRow::into_field).collect()
  }

  fn count(&self, query: &FieldQuery) -> Result<usize> {
    let (clause, params) = query.where_clause();
    let sql = format!("SELECT COUNT(*) FROM pipedrive_custom_fields WHERE {}", clause);

    let conn = self.db.conn()?;
    let count: i64 = conn
      .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
      .map_err(|e| eyre!("Failed to count fields: {}", e))?;

    Ok(count as usize)
  }

  fn count_by_type(&self, entity_type: EntityType) -> Result<BTreeMap<String, usize>> {
    let conn = self.db.conn()?;
    let mut stmt = conn
      .prepare(
        "SELECT field_type, COUNT(*) FROM pipedrive_custom_fields
         WHERE entity_type = ?
         GROUP BY field_type",
      )
      .map_err(|e| eyre!("Failed to prepare type count: {}", e))?;

    let counts = stmt
      .query_map(params![entity_type.as_str()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
      })
      .map_err(|e| eyre!("Failed to count fields by type: {}", e))?
      .collect::<rusqlite::Result<BTreeMap<_, _>>>()
      .map_err(|e| eyre!("Failed to read type count: {}", e))?;

    Ok(counts)
  }

  fn find_by_key(&self, key: &str, entity_type: EntityType) -> Result<Option<CustomField>> {
    self.fetch_one(
      &format!(
        "SELECT {} FROM pipedrive_custom_fields WHERE key = ? AND entity_type = ?",
        COLUMNS
      ),
      params![key, entity_type.as_str()],
    )
  }

  fn find_by_pipedrive_id(
    &self,
    pipedrive_id: i64,
    entity_type: EntityType,
  ) -> Result<Option<CustomField>> {
    self.fetch_one(
      &format!(
        "SELECT {} FROM pipedrive_custom_fields WHERE pipedrive_id = ? AND entity_type = ?",
        COLUMNS
      ),
      params![pipedrive_id, entity_type.as_str()],
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::FieldOption;

  fn repo() -> SqliteFieldRepository {
    SqliteFieldRepository::new(Database::open_in_memory().unwrap())
  }

  fn field(id: i64, name: &str, field_type: FieldType) -> CustomField {
    CustomField::new(EntityType::Deal, id, format!("key_{}", id), name, field_type)
  }

  fn seeded() -> SqliteFieldRepository {
    let repo = repo();
    let mut colour = field(1, "colour", FieldType::Set);
    colour.edit_flag = true;
    colour.add_visible_flag = true;
    colour.options = vec![FieldOption::new(1, "Red"), FieldOption::new(2, "Blue")];

    let mut budget = field(2, "Budget", FieldType::Monetary);
    budget.edit_flag = true;
    budget.mandatory_flag = true;
    budget.details_visible_flag = true;

    let mut legacy = field(3, "Legacy", FieldType::Varchar);
    legacy.active_flag = false;

    let title = field(4, "Title", FieldType::Varchar);

    let person = CustomField::new(EntityType::Person, 5, "email", "Email", FieldType::Varchar);

    repo
      .upsert_all(&[colour, budget, legacy, title, person])
      .unwrap();
    repo
  }

  fn names(fields: &[CustomField]) -> Vec<&str> {
    fields.iter().map(|f| f.name.as_str()).collect()
  }

  #[test]
  fn test_fetch_orders_by_name_case_sensitive() {
    let repo = seeded();
    let fields = repo.fetch(&FieldQuery::for_entity(EntityType::Deal)).unwrap();
    assert_eq!(names(&fields), vec!["Budget", "Legacy", "Title", "colour"]);
  }

  #[test]
  fn test_fetch_with_filters() {
    let repo = seeded();

    let active = repo
      .fetch(&FieldQuery::for_entity(EntityType::Deal).active())
      .unwrap();
    assert_eq!(names(&active), vec!["Budget", "Title", "colour"]);

    let custom = repo
      .fetch(&FieldQuery::for_entity(EntityType::Deal).custom_only())
      .unwrap();
    assert_eq!(names(&custom), vec!["Budget", "colour"]);

    let mandatory = repo
      .fetch(&FieldQuery::for_entity(EntityType::Deal).mandatory())
      .unwrap();
    assert_eq!(names(&mandatory), vec!["Budget"]);

    let add = repo
      .fetch(&FieldQuery::for_entity(EntityType::Deal).visible_in_add())
      .unwrap();
    assert_eq!(names(&add), vec!["colour"]);

    let details = repo
      .fetch(&FieldQuery::for_entity(EntityType::Deal).visible_in_details())
      .unwrap();
    assert_eq!(names(&details), vec!["Budget"]);

    let typed = repo
      .fetch(
        &FieldQuery::for_entity(EntityType::Deal)
          .type_in(&[FieldType::Set, FieldType::Monetary]),
      )
      .unwrap();
    assert_eq!(names(&typed), vec!["Budget", "colour"]);
  }

  #[test]
  fn test_round_trips_options_and_payload() {
    let repo = seeded();
    let colour = repo.find_by_key("key_1", EntityType::Deal).unwrap().unwrap();
    assert_eq!(colour.options.len(), 2);
    assert_eq!(colour.option_label("1"), Some("Red"));
    assert_eq!(colour.field_type, FieldType::Set);
  }

  #[test]
  fn test_find_is_scoped_to_entity() {
    let repo = seeded();
    assert!(repo.find_by_key("email", EntityType::Person).unwrap().is_some());
    assert!(repo.find_by_key("email", EntityType::Deal).unwrap().is_none());
    assert!(repo.find_by_pipedrive_id(5, EntityType::Person).unwrap().is_some());
    assert!(repo.find_by_pipedrive_id(5, EntityType::Deal).unwrap().is_none());
  }

  #[test]
  fn test_upsert_updates_existing_row() {
    let repo = seeded();
    let mut title = repo.find_by_pipedrive_id(4, EntityType::Deal).unwrap().unwrap();
    title.name = "Deal title".to_string();
    title.active_flag = false;
    repo.upsert(&title).unwrap();

    let stored = repo.find_by_pipedrive_id(4, EntityType::Deal).unwrap().unwrap();
    assert_eq!(stored.name, "Deal title");
    assert!(!stored.active_flag);
    assert_eq!(repo.count(&FieldQuery::for_entity(EntityType::Deal)).unwrap(), 4);
  }

  #[test]
  fn test_duplicate_key_is_rejected() {
    let repo = seeded();
    let clash = CustomField::new(EntityType::Deal, 99, "key_1", "Clash", FieldType::Text);
    assert!(repo.upsert(&clash).is_err());
  }

  #[test]
  fn test_counts() {
    let repo = seeded();
    let query = FieldQuery::for_entity(EntityType::Deal);
    assert_eq!(repo.count(&query).unwrap(), 4);
    assert_eq!(repo.count(&query.clone().active()).unwrap(), 3);

    let by_type = repo.count_by_type(EntityType::Deal).unwrap();
    assert_eq!(by_type.get("varchar"), Some(&2));
    assert_eq!(by_type.get("set"), Some(&1));
    assert_eq!(by_type.get("monetary"), Some(&1));
    assert_eq!(by_type.values().sum::<usize>(), 4);
  }
}
