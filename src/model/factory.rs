//! Named default factories
//!
//! Model definitions loaded from disk refer to factories by name. The
//! registry ships with `list`, `dict` and `now`; callers may add their own.

use std::collections::HashMap;

use serde_json::Value;

use super::types::DefaultFactory;

/// Registry of default factories keyed by name
#[derive(Debug, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<String, DefaultFactory>,
}

impl FactoryRegistry {
    /// Creates an empty registry with no built-in factories
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in `list`, `dict` and `now` factories
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.insert(DefaultFactory::list());
        registry.insert(DefaultFactory::dict());
        registry.insert(DefaultFactory::now());
        registry
    }

    /// Registers a factory under `name`, replacing any existing one
    pub fn register(&mut self, name: impl Into<String>, produce: impl Fn() -> Value + 'static) {
        self.insert(DefaultFactory::new(name, produce));
    }

    pub fn insert(&mut self, factory: DefaultFactory) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<DefaultFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
