//! Model loader for reading model definitions from disk
//!
//! - `load_all` reads every `*.json` file in `<model_dir>`, one model per file
//! - `save_definition` writes `<model_dir>/model_<name>.json`
//! - A bad file fails the whole load, naming the file
//! - A registered model name cannot be replaced

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::errors::{ModelError, ModelResult};
use super::factory::FactoryRegistry;
use super::types::{ExtraPolicy, FieldSpec, FieldType, ModelSpec, ValidationMode};
use crate::observability::{log_event_with_fields, Event};

/// On-disk form of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub model: String,
    #[serde(default)]
    pub extra: ExtraPolicy,
    #[serde(default)]
    pub mode: ValidationMode,
    pub fields: Vec<FieldDefinition>,
}

/// On-disk form of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Type expression, e.g. `list<string>` or `string | none`
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// Explicit default; `null` is a present default of none
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_factory: Option<String>,
    /// Validation aliases, in lookup order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Alias used for both lookup (before `aliases`) and output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization_alias: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Distinguishes a present `null` from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldDefinition {
    /// Builds the field, resolving its type expression and default factory.
    pub fn build(&self, factories: &FactoryRegistry) -> ModelResult<FieldSpec> {
        let (declared_type, union_with_none) = FieldType::parse(&self.type_expr)?;
        let mut field = FieldSpec::new(&self.name, declared_type);
        if union_with_none || self.nullable {
            field = field.nullable();
        }

        match (&self.default, &self.default_factory) {
            (Some(_), Some(_)) => return Err(ModelError::ConflictingDefaults(self.name.clone())),
            (Some(value), None) => field = field.default_value(value.clone()),
            (None, Some(name)) => {
                let factory = factories.get(name).ok_or_else(|| ModelError::UnknownFactory {
                    field: self.name.clone(),
                    factory: name.clone(),
                })?;
                field = field.default_factory(factory);
            }
            (None, None) => {}
        }

        if let Some(alias) = &self.alias {
            field = field.alias(alias);
        }
        for alias in &self.aliases {
            field = field.validation_alias(alias);
        }
        if let Some(alias) = &self.serialization_alias {
            field = field.serialization_alias(alias);
        }

        Ok(field)
    }
}

impl ModelDefinition {
    /// Parses a definition from JSON text
    pub fn from_json(origin: &str, content: &str) -> ModelResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ModelError::malformed(origin, format!("Invalid JSON: {}", e)))
    }

    /// Builds the model spec, resolving factories by name.
    pub fn build(&self, factories: &FactoryRegistry) -> ModelResult<ModelSpec> {
        if self.model.trim().is_empty() {
            return Err(ModelError::malformed("<definition>", "model name must not be empty"));
        }
        let fields = self
            .fields
            .iter()
            .map(|f| f.build(factories))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(ModelSpec::new(&self.model, fields)?
            .with_extra(self.extra)
            .with_mode(self.mode))
    }
}

/// Model loader that reads definition files and keeps an in-memory registry.
pub struct ModelLoader {
    /// Directory containing definition files
    model_dir: PathBuf,
    factories: FactoryRegistry,
    /// Built models indexed by name
    models: HashMap<String, ModelSpec>,
}

impl ModelLoader {
    /// Creates a loader for `model_dir` with the built-in factories.
    pub fn new(model_dir: &Path) -> Self {
        Self::with_factories(model_dir, FactoryRegistry::default())
    }

    pub fn with_factories(model_dir: &Path, factories: FactoryRegistry) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            factories,
            models: HashMap::new(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// Loads every `*.json` definition in the model directory.
    ///
    /// A missing directory holds no models.
    pub fn load_all(&mut self) -> ModelResult<usize> {
        if !self.model_dir.exists() {
            return Ok(0);
        }

        let dir = self.model_dir.display().to_string();
        let entries = fs::read_dir(&self.model_dir).map_err(|e| {
            ModelError::malformed(&dir, format!("Failed to read model directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ModelError::malformed(&dir, format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // directory order is platform-dependent
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            self.load_file(&path)?;
            loaded += 1;
        }

        let count = loaded.to_string();
        log_event_with_fields(
            Event::ModelsLoaded,
            &[("model_dir", dir.as_str()), ("count", count.as_str())],
        );
        Ok(loaded)
    }

    /// Loads and registers a single definition file.
    pub fn load_file(&mut self, path: &Path) -> ModelResult<()> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path)
            .map_err(|e| ModelError::malformed(&origin, format!("Failed to read file: {}", e)))?;
        let definition = ModelDefinition::from_json(&origin, &content)?;
        let model = definition.build(&self.factories).map_err(|e| match e {
            ModelError::MalformedDefinition { reason, .. } => ModelError::malformed(&origin, reason),
            other => ModelError::DefinitionFile {
                origin: origin.clone(),
                source: Box::new(other),
            },
        })?;
        self.register(model)
    }

    /// Registers a model built in code.
    pub fn register(&mut self, model: ModelSpec) -> ModelResult<()> {
        if self.models.contains_key(model.name()) {
            return Err(ModelError::ModelImmutable(model.name().to_string()));
        }
        log_event_with_fields(Event::ModelRegistered, &[("model", model.name())]);
        self.models.insert(model.name().to_string(), model);
        Ok(())
    }

    /// Builds and registers a definition.
    pub fn register_definition(&mut self, definition: &ModelDefinition) -> ModelResult<()> {
        let model = definition.build(&self.factories)?;
        self.register(model)
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    /// Gets a model or fails with `UnknownModel`
    pub fn require(&self, name: &str) -> ModelResult<&ModelSpec> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered model names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Writes a definition to `<model_dir>/model_<name>.json`.
    ///
    /// An existing file for the same model is never overwritten.
    pub fn save_definition(&self, definition: &ModelDefinition) -> ModelResult<PathBuf> {
        let name = definition.model.as_str();
        if name.trim().is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ModelError::malformed(
                name,
                "model name must be a plain file name component",
            ));
        }

        let path = self.model_dir.join(format!("model_{}.json", name));
        let origin = path.display().to_string();

        if path.exists() {
            return Err(ModelError::ModelImmutable(definition.model.clone()));
        }

        fs::create_dir_all(&self.model_dir).map_err(|e| {
            ModelError::malformed(&origin, format!("Failed to create model directory: {}", e))
        })?;

        let content = serde_json::to_string_pretty(definition)
            .map_err(|e| ModelError::malformed(&origin, format!("Failed to serialize: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| ModelError::malformed(&origin, format!("Failed to write file: {}", e)))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn person_definition() -> ModelDefinition {
        serde_json::from_value(json!({
            "model": "Person",
            "fields": [
                {"name": "first_name", "type": "string", "aliases": ["fname", "given_name"]},
                {"name": "middle_name", "type": "string | none"},
                {"name": "title", "type": "optional<string>", "default": null},
                {"name": "skills", "type": "list<string>", "default_factory": "list"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_null_default_is_present() {
        let definition = person_definition();
        assert_eq!(definition.fields[2].default, Some(Value::Null));
        assert_eq!(definition.fields[1].default, None);
    }

    #[test]
    fn test_build_definition() {
        let model = person_definition().build(&FactoryRegistry::default()).unwrap();
        assert_eq!(model.name(), "Person");

        let middle = model.field("middle_name").unwrap();
        assert!(middle.is_union_with_none());
        assert!(!middle.has_explicit_default());

        let title = model.field("title").unwrap();
        assert_eq!(title.explicit_default_value(), Some(Value::Null));

        assert!(model.field("skills").unwrap().has_default_factory());
        assert_eq!(model.field("first_name").unwrap().aliases(), ["fname", "given_name"]);
    }

    #[test]
    fn test_conflicting_defaults_rejected() {
        let mut definition = person_definition();
        definition.fields[3].default = Some(json!([]));
        let err = definition.build(&FactoryRegistry::default()).unwrap_err();
        assert_eq!(err, ModelError::ConflictingDefaults("skills".into()));
    }

    #[test]
    fn test_unknown_factory_rejected() {
        let mut definition = person_definition();
        definition.fields[3].default_factory = Some("set".into());
        let err = definition.build(&FactoryRegistry::default()).unwrap_err();
        assert_eq!(err.code(), "FM_UNKNOWN_FACTORY");
    }

    #[test]
    fn test_register_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ModelLoader::new(temp_dir.path());
        loader.register_definition(&person_definition()).unwrap();

        assert!(loader.exists("Person"));
        assert_eq!(loader.require("Person").unwrap().fields().len(), 4);
        assert_eq!(
            loader.require("Nobody").unwrap_err(),
            ModelError::UnknownModel("Nobody".into())
        );
    }

    #[test]
    fn test_model_immutability() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ModelLoader::new(temp_dir.path());
        loader.register_definition(&person_definition()).unwrap();

        let err = loader.register_definition(&person_definition()).unwrap_err();
        assert_eq!(err.code(), "FM_MODEL_IMMUTABLE");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ModelLoader::new(temp_dir.path());
        let path = loader.save_definition(&person_definition()).unwrap();
        assert!(path.ends_with("model_Person.json"));

        let mut loader2 = ModelLoader::new(temp_dir.path());
        assert_eq!(loader2.load_all().unwrap(), 1);
        assert!(loader2.exists("Person"));
        assert_eq!(
            loader2.get("Person").unwrap().field("title").unwrap().explicit_default_value(),
            Some(Value::Null)
        );
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ModelLoader::new(temp_dir.path());
        loader.save_definition(&person_definition()).unwrap();
        assert!(loader.save_definition(&person_definition()).is_err());
    }

    #[test]
    fn test_save_rejects_path_in_model_name() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ModelLoader::new(&temp_dir.path().join("models"));

        for name in ["../escape", "nested/model", "back\\slash"] {
            let mut definition = person_definition();
            definition.model = name.to_string();
            let err = loader.save_definition(&definition).unwrap_err();
            assert_eq!(err.code(), "FM_MALFORMED_DEFINITION");
        }
        assert!(!temp_dir.path().join("models").exists());
    }

    #[test]
    fn test_build_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let definition = json!({
            "model": "Person",
            "fields": [{"name": "x", "type": "strng"}]
        });
        fs::write(temp_dir.path().join("model_person.json"), definition.to_string()).unwrap();

        let mut loader = ModelLoader::new(temp_dir.path());
        let err = loader.load_all().unwrap_err();
        assert_eq!(err.code(), "FM_INVALID_TYPE");
        assert!(err.to_string().contains("model_person.json"));
    }

    #[test]
    fn test_malformed_file_names_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        let mut loader = ModelLoader::new(temp_dir.path());
        let err = loader.load_all().unwrap_err();
        assert_eq!(err.code(), "FM_MALFORMED_DEFINITION");
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_non_json_files_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.md"), "# notes").unwrap();

        let mut loader = ModelLoader::new(temp_dir.path());
        assert_eq!(loader.load_all().unwrap(), 0);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ModelLoader::new(&temp_dir.path().join("absent"));
        assert_eq!(loader.load_all().unwrap(), 0);
        assert_eq!(loader.model_count(), 0);
    }
}
