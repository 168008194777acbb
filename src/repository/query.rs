//! Composable filters over stored field definitions.

use crate::fields::{CustomField, EntityType, FieldType};

/// A single named predicate. Predicates in a `FieldQuery` are ANDed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
  Active,
  /// User-defined fields only (`edit_flag`).
  CustomOnly,
  TypeIn(Vec<FieldType>),
  Mandatory,
  VisibleInAdd,
  VisibleInDetails,
}

impl FieldFilter {
  fn matches(&self, field: &CustomField) -> bool {
    match self {
      Self::Active => field.active_flag,
      Self::CustomOnly => field.edit_flag,
      Self::TypeIn(types) => types.contains(&field.field_type),
      Self::Mandatory => field.mandatory_flag,
      Self::VisibleInAdd => field.add_visible_flag,
      Self::VisibleInDetails => field.details_visible_flag,
    }
  }

  fn sql(&self, params: &mut Vec<String>) -> String {
    match self {
      Self::Active => "active_flag = 1".to_string(),
      Self::CustomOnly => "edit_flag = 1".to_string(),
      Self::TypeIn(types) if types.is_empty() => "0".to_string(),
      Self::TypeIn(types) => {
        params.extend(types.iter().map(|t| t.as_str().to_string()));
        let placeholders = vec!["?"; types.len()].join(", ");
        format!("field_type IN ({})", placeholders)
      }
      Self::Mandatory => "mandatory_flag = 1".to_string(),
      Self::VisibleInAdd => "add_visible_flag = 1".to_string(),
      Self::VisibleInDetails => "details_visible_flag = 1".to_string(),
    }
  }
}

/// Query over the fields of one entity type.
///
/// The same predicates run as SQL against the repository and in memory against
/// cached fields, so both paths agree on what a filter means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldQuery {
  entity_type: EntityType,
  filters: Vec<FieldFilter>,
}

impl FieldQuery {
  pub fn for_entity(entity_type: EntityType) -> Self {
    Self {
      entity_type,
      filters: Vec::new(),
    }
  }

  pub fn filter(mut self, filter: FieldFilter) -> Self {
    if !self.filters.contains(&filter) {
      self.filters.push(filter);
    }
    self
  }

  pub fn active(self) -> Self {
    self.filter(FieldFilter::Active)
  }

  /// Add the active filter only when `active_only` is set.
  pub fn active_if(self, active_only: bool) -> Self {
    if active_only {
      self.active()
    } else {
      self
    }
  }

  pub fn custom_only(self) -> Self {
    self.filter(FieldFilter::CustomOnly)
  }

  pub fn of_type(self, field_type: FieldType) -> Self {
    self.filter(FieldFilter::TypeIn(vec![field_type]))
  }

  pub fn type_in(self, field_types: &[FieldType]) -> Self {
    self.filter(FieldFilter::TypeIn(field_types.to_vec()))
  }

  pub fn mandatory(self) -> Self {
    self.filter(FieldFilter::Mandatory)
  }

  pub fn visible_in_add(self) -> Self {
    self.filter(FieldFilter::VisibleInAdd)
  }

  pub fn visible_in_details(self) -> Self {
    self.filter(FieldFilter::VisibleInDetails)
  }

  pub fn entity_type(&self) -> EntityType {
    self.entity_type
  }

  pub fn filters(&self) -> &[FieldFilter] {
    &self.filters
  }

  /// True when `field` belongs to this entity type and passes every filter.
  pub fn matches(&self, field: &CustomField) -> bool {
    field.entity_type == self.entity_type && self.filters.iter().all(|f| f.matches(field))
  }

  /// Keep the fields that match, preserving order.
  pub fn apply(&self, fields: Vec<CustomField>) -> Vec<CustomField> {
    fields.into_iter().filter(|f| self.matches(f)).collect()
  }

  /// SQL `WHERE` clause (without the keyword) and its positional parameters.
  pub(crate) fn where_clause(&self) -> (String, Vec<String>) {
    let mut params = vec![self.entity_type.as_str().to_string()];
    let mut clauses = vec!["entity_type = ?".to_string()];
    for filter in &self.filters {
      clauses.push(filter.sql(&mut params));
    }
    (clauses.join(" AND "), params)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn field(key: &str, field_type: FieldType) -> CustomField {
    CustomField::new(EntityType::Deal, 1, key, key, field_type)
  }

  #[test]
  fn test_where_clause_composes_filters() {
    let query = FieldQuery::for_entity(EntityType::Deal)
      .active()
      .custom_only()
      .type_in(&[FieldType::Set, FieldType::Enum]);

    let (sql, params) = query.where_clause();
    assert_eq!(
      sql,
      "entity_type = ? AND active_flag = 1 AND edit_flag = 1 AND field_type IN (?, ?)"
    );
    assert_eq!(params, vec!["deal", "set", "enum"]);
  }

  #[test]
  fn test_duplicate_filters_are_ignored() {
    let query = FieldQuery::for_entity(EntityType::Person).active().active();
    assert_eq!(query.filters(), &[FieldFilter::Active]);
  }

  #[test]
  fn test_empty_type_list_matches_nothing() {
    let query = FieldQuery::for_entity(EntityType::Deal).type_in(&[]);
    assert!(!query.matches(&field("a", FieldType::Varchar)));
    assert_eq!(query.where_clause().0, "entity_type = ? AND 0");
  }

  #[test]
  fn test_matches_uses_and_semantics() {
    let query = FieldQuery::for_entity(EntityType::Deal).active().custom_only();

    let mut custom_inactive = field("a", FieldType::Varchar);
    custom_inactive.edit_flag = true;
    custom_inactive.active_flag = false;
    assert!(!query.matches(&custom_inactive));

    let mut custom_active = field("b", FieldType::Varchar);
    custom_active.edit_flag = true;
    assert!(query.matches(&custom_active));

    let builtin_active = field("c", FieldType::Varchar);
    assert!(!query.matches(&builtin_active));
  }

  #[test]
  fn test_matches_checks_entity_type() {
    let query = FieldQuery::for_entity(EntityType::Person);
    assert!(!query.matches(&field("a", FieldType::Varchar)));
  }

  #[test]
  fn test_active_if() {
    let query = FieldQuery::for_entity(EntityType::Deal).active_if(false);
    assert!(query.filters().is_empty());
    let query = FieldQuery::for_entity(EntityType::Deal).active_if(true);
    assert_eq!(query.filters(), &[FieldFilter::Active]);
  }
}
