//! CLI command implementations
//!
//! Every command that touches models loads the config, then the model
//! directory, before doing anything else. Per-line validation failures are
//! responses, not command failures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::{
    DefaultFactory, DefaultSource, FieldResolutionEngine, FieldSpec, FieldType, ModelLoader,
    ModelResult, ModelSpec,
};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_json, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding model definition files (required)
    pub model_dir: String,

    /// Report output keys by serialization alias (optional, default false)
    #[serde(default)]
    pub serialize_by_alias: bool,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.model_dir.trim().is_empty() {
            return Err(CliError::config_error("model_dir must not be empty"));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(|e| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    pub fn model_path(&self) -> &Path {
        Path::new(&self.model_dir)
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Validate {
            config,
            model,
            by_alias,
        } => validate(&config, &model, by_alias),
        Command::Inspect { config, model } => inspect(&config, &model),
        Command::List { config } => list(&config),
        Command::Pitfall => pitfall(),
    }
}

/// Loads config, applies its log level, then loads every model.
fn boot(config_path: &Path) -> CliResult<(Config, ModelLoader)> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    let path = config_path.display().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("config", path.as_str()), ("model_dir", config.model_dir.as_str())],
    );

    let mut loader = ModelLoader::new(config.model_path());
    loader.load_all()?;
    Ok((config, loader))
}

/// Validate stdin lines against a model, one response line per input line
pub fn validate(config_path: &Path, model_name: &str, by_alias: bool) -> CliResult<()> {
    let (config, loader) = boot(config_path)?;
    let model = loader.require(model_name)?;
    let by_alias = by_alias || config.serialize_by_alias;
    let engine = FieldResolutionEngine::new();

    for request in read_requests() {
        match request {
            Ok(raw) => write_json(&validate_value(&engine, model, &raw, by_alias))?,
            Err(e) => write_error(e.code_str(), e.message())?,
        }
    }

    Ok(())
}

/// Builds the response for one input value
pub fn validate_value(
    engine: &FieldResolutionEngine,
    model: &ModelSpec,
    raw: &Value,
    by_alias: bool,
) -> Value {
    match engine.instantiate(model, raw) {
        Ok(instance) => json!({
            "status": "ok",
            "data": engine.serialize(&instance, by_alias),
        }),
        Err(e) => json!({
            "status": "error",
            "code": e.code(),
            "message": e.to_string(),
        }),
    }
}

/// Print how each field of a model resolves
pub fn inspect(config_path: &Path, model_name: &str) -> CliResult<()> {
    let (_config, loader) = boot(config_path)?;
    let model = loader.require(model_name)?;
    write_response(describe_model(model))
}

/// Requiredness, default source and aliases of every field
pub fn describe_model(model: &ModelSpec) -> Value {
    let engine = FieldResolutionEngine::new();
    let fields: Vec<Value> = model
        .fields()
        .iter()
        .map(|field| describe_field(&engine, field))
        .collect();

    json!({
        "model": model.name(),
        "fields": fields,
        "shared_mutable_defaults": model.shared_mutable_defaults(),
    })
}

fn describe_field(engine: &FieldResolutionEngine, field: &FieldSpec) -> Value {
    let mut out = json!({
        "name": field.name(),
        "type": field.declared_type().to_string(),
        "union_with_none": field.is_union_with_none(),
        "required": engine.resolve_requiredness(field),
        "default_source": field.default_source().kind(),
        "aliases": field.aliases(),
        "serialization_alias": field.output_alias(),
    });
    match field.default_source() {
        DefaultSource::Explicit(_) => {
            out["default"] = field.explicit_default_value().unwrap_or(Value::Null);
        }
        DefaultSource::Factory(factory) => {
            out["default_factory"] = Value::String(factory.name().to_string());
        }
        DefaultSource::None => {}
    }
    out
}

/// List loaded models
pub fn list(config_path: &Path) -> CliResult<()> {
    let (_config, loader) = boot(config_path)?;
    write_response(json!({ "models": loader.model_names() }))
}

/// Show the shared-default pitfall next to the factory fix
pub fn pitfall() -> CliResult<()> {
    write_response(pitfall_report()?)
}

/// Two instances of each model omit `middle_name`; the first one appends to it.
///
/// With an explicit `[]` default both instances see the append; with a
/// `list` factory only the first does.
pub fn pitfall_report() -> ModelResult<Value> {
    let engine = FieldResolutionEngine::new();
    let shared = defaults_model("DefaultsModel", |f| f.default_value(json!([])))?;
    let factory = defaults_model("DefaultsModelField", |f| {
        f.default_factory(DefaultFactory::list())
    })?;

    Ok(json!({
        "explicit_default": append_to_first(&engine, &shared, "Marie")?,
        "default_factory": append_to_first(&engine, &factory, "Holden")?,
    }))
}

fn defaults_model(name: &str, middle: impl FnOnce(FieldSpec) -> FieldSpec) -> ModelResult<ModelSpec> {
    ModelSpec::new(
        name,
        vec![
            FieldSpec::new("first_name", FieldType::String).default_value(json!("Cynthia")),
            middle(FieldSpec::new("middle_name", FieldType::list(FieldType::Any))),
            FieldSpec::new("last_name", FieldType::String).default_value(json!("Frong")),
        ],
    )
}

fn append_to_first(engine: &FieldResolutionEngine, model: &ModelSpec, name: &str) -> ModelResult<Value> {
    let mut first = engine.instantiate(model, &json!({}))?;
    let second = engine.instantiate(model, &json!({}))?;

    first.update("middle_name", |value| {
        if let Some(items) = value.as_array_mut() {
            items.push(Value::String(name.to_string()));
        }
    })?;

    Ok(json!({
        "model": model.name(),
        "first": first.get("middle_name"),
        "second": second.get("middle_name"),
        "shared": first.shares_value_with(&second, "middle_name"),
    }))
}
