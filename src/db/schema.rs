/// Schema for the local mirror of Pipedrive field definitions.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pipedrive_custom_fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipedrive_id INTEGER NOT NULL,
    key TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    name TEXT NOT NULL,
    field_type TEXT NOT NULL,
    mandatory_flag INTEGER NOT NULL DEFAULT 0,
    active_flag INTEGER NOT NULL DEFAULT 1,
    edit_flag INTEGER NOT NULL DEFAULT 0,
    add_visible_flag INTEGER NOT NULL DEFAULT 0,
    details_visible_flag INTEGER NOT NULL DEFAULT 0,
    options TEXT NOT NULL DEFAULT '[]',
    pipedrive_data TEXT NOT NULL DEFAULT 'null',
    updated_at TEXT,
    synced_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (key, entity_type),
    UNIQUE (pipedrive_id, entity_type)
);

CREATE INDEX IF NOT EXISTS idx_custom_fields_entity
    ON pipedrive_custom_fields(entity_type, active_flag, name);

CREATE INDEX IF NOT EXISTS idx_custom_fields_type
    ON pipedrive_custom_fields(entity_type, field_type);
"#;
