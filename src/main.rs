use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pipedrive_fields::config::Config;
use pipedrive_fields::{
  CustomField, CustomFieldService, EntityType, FieldCache, FieldType, ListOptions,
  SqliteFieldRepository,
};

type Service = CustomFieldService<SqliteFieldRepository, Box<dyn FieldCache>>;

#[derive(Parser, Debug)]
#[command(name = "pipedrive-fields")]
#[command(about = "Inspect and cache locally mirrored Pipedrive field definitions")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pipedrive-fields/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Disable the cache for this run
  #[arg(long, global = true)]
  no_cache: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List the fields of an entity type
  List {
    entity: EntityType,
    /// Include inactive fields
    #[arg(long)]
    all: bool,
    /// Only user-defined fields
    #[arg(long)]
    custom: bool,
    /// Only fields of this type (e.g. varchar, set, monetary)
    #[arg(long = "type")]
    field_type: Option<String>,
    /// Narrow to a predefined subset of active fields
    #[arg(long, value_enum)]
    only: Option<Subset>,
  },
  /// Show one field definition as JSON
  Show { entity: EntityType, key: String },
  /// Field counts for an entity type
  Stats { entity: EntityType },
  /// Load fields from a saved Pipedrive `*Fields` API response
  Import { entity: EntityType, file: PathBuf },
  /// Format a JSON value for display using a field's type
  Format {
    entity: EntityType,
    key: String,
    value: String,
  },
  /// Validate a JSON value against a field's rules
  Validate {
    entity: EntityType,
    key: String,
    value: String,
  },
  /// Reload an entity type's fields into the cache
  Refresh { entity: EntityType },
  /// Drop an entity type's cached fields
  Invalidate { entity: EntityType },
  /// Cache maintenance
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

impl Command {
  fn manages_cache(&self) -> bool {
    matches!(self, Command::Refresh { .. } | Command::Invalidate { .. } | Command::Cache { .. })
  }
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Show cache statistics
  Stats,
  /// Drop every cached entry
  Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Subset {
  Mandatory,
  Add,
  Detail,
  Options,
  Relations,
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if args.no_cache {
    config.cache.enabled = false;
  }

  let _guard = init_logging(&config)?;

  if args.command.manages_cache() {
    config.ensure_persistent_cache()?;
  }

  let repository = SqliteFieldRepository::new(config.open_database()?);
  let service = CustomFieldService::new(repository, config.build_cache()?);

  run(&service, args.command)
}

/// Log to a file so command output stays clean.
fn init_logging(config: &Config) -> Result<WorkerGuard> {
  let dir = config.log_directory()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&dir, "pipedrive-fields.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let directive = config.log.filter.as_deref().unwrap_or("info");
  let filter = EnvFilter::try_new(directive)
    .map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

fn run(service: &Service, command: Command) -> Result<()> {
  match command {
    Command::List {
      entity,
      all,
      custom,
      field_type,
      only,
    } => {
      let fields = match (field_type, only) {
        (Some(field_type), _) => {
          service.fields_by_type(entity, FieldType::from(field_type.as_str()), !all)?
        }
        (None, Some(subset)) => match subset {
          Subset::Mandatory => service.mandatory_fields(entity)?,
          Subset::Add => service.add_visible_fields(entity)?,
          Subset::Detail => service.detail_visible_fields(entity)?,
          Subset::Options => service.option_fields(entity)?,
          Subset::Relations => service.relation_fields(entity)?,
        },
        (None, None) => {
          let options = if all {
            ListOptions::default().include_inactive()
          } else {
            ListOptions::default()
          };
          if custom {
            service.custom_fields_for_entity(entity, options)?
          } else {
            service.fields_for_entity(entity, options)?
          }
        }
      };
      print_fields(&fields);
    }
    Command::Show { entity, key } => {
      let field = find_field(service, entity, &key)?;
      print_json(&field)?;
    }
    Command::Stats { entity } => {
      print_json(&service.field_statistics(entity)?)?;
    }
    Command::Import { entity, file } => {
      let count = import(service, entity, &file)?;
      println!("Imported {} {} fields", count, entity);
    }
    Command::Format { entity, key, value } => {
      let field = find_field(service, entity, &key)?;
      println!("{}", service.format_field_value(&field, &parse_value(value)));
    }
    Command::Validate { entity, key, value } => {
      let field = find_field(service, entity, &key)?;
      let result = service.validate_field_value(&field, &parse_value(value));
      if !result.is_valid() {
        for error in result.errors() {
          eprintln!("{}", error);
        }
        return Err(eyre!("{} validation error(s)", result.errors().len()));
      }
      println!("valid");
    }
    Command::Refresh { entity } => {
      if !service.refresh_cache(entity) {
        return Err(eyre!("Cache refresh failed for {} (is the cache enabled?)", entity));
      }
      println!("Cache refreshed for {}", entity);
    }
    Command::Invalidate { entity } => {
      if !service.invalidate_cache(entity) {
        return Err(eyre!("Cache invalidation failed for {}", entity));
      }
      println!("Cache invalidated for {}", entity);
    }
    Command::Cache { action } => match action {
      CacheAction::Stats => print_json(&service.cache_statistics())?,
      CacheAction::Clear => {
        if !service.cache().is_enabled() {
          println!("Cache is disabled");
        } else if service.cache().clear() {
          println!("Cache cleared");
        } else {
          return Err(eyre!("Failed to clear cache"));
        }
      }
    },
  }

  Ok(())
}

fn find_field(service: &Service, entity: EntityType, key: &str) -> Result<CustomField> {
  service
    .find_by_key(key, entity)?
    .ok_or_else(|| eyre!("No {} field with key '{}'", entity, key))
}

fn import(service: &Service, entity: EntityType, file: &std::path::Path) -> Result<usize> {
  let contents = std::fs::read_to_string(file)
    .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
  let payload: Value = serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse {}: {}", file.display(), e))?;

  let fields = CustomField::from_pipedrive_response(entity, &payload)
    .map_err(|e| eyre!("Invalid field payload in {}: {}", file.display(), e))?;

  service.repository().upsert_all(&fields)?;
  info!("Imported {} {} fields from {}", fields.len(), entity, file.display());

  if !service.invalidate_cache(entity) {
    warn!("Cached {} fields are stale after import", entity);
    eprintln!(
      "warning: could not invalidate cached {} fields; run `pipedrive-fields invalidate {}`",
      entity, entity
    );
  }

  Ok(fields.len())
}

/// Values that aren't valid JSON are taken as plain strings.
fn parse_value(raw: String) -> Value {
  serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn print_fields(fields: &[CustomField]) {
  for field in fields {
    let mut flags = Vec::new();
    if !field.active_flag {
      flags.push("inactive");
    }
    if field.edit_flag {
      flags.push("custom");
    }
    if field.mandatory_flag {
      flags.push("mandatory");
    }
    println!(
      "{:<42} {:<12} {:<32} {}",
      field.key,
      field.field_type,
      field.name,
      flags.join(",")
    );
  }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  let json = serde_json::to_string_pretty(value).map_err(|e| eyre!("{}", e))?;
  println!("{}", json);
  Ok(())
}
