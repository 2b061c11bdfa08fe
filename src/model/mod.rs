//! Field resolution for validated data models
//!
//! A `ModelSpec` is built once and applied to raw input many times. Each field
//! declares a type, whether "none" is allowed, at most one default source
//! (an explicit default or a default factory) and its aliases.
//!
//! # Design Principles
//!
//! - A union-with-none field without a default is still required
//! - An explicit default is one object, shared by every instance that omits the field
//! - A default factory produces a new object per instance
//! - Aliases are searched in declaration order, first match wins
//! - Fail-fast by default, collect-all when configured

mod coerce;
mod engine;
mod errors;
mod factory;
mod instance;
mod loader;
mod types;

pub use engine::{instantiate, resolve_requiredness, serialize, FieldResolutionEngine};
pub use errors::{ModelError, ModelResult};
pub use factory::FactoryRegistry;
pub use instance::Instance;
pub use loader::{FieldDefinition, ModelDefinition, ModelLoader};
pub use types::{
    DefaultFactory, DefaultSource, ExtraPolicy, FieldSpec, FieldType, ModelSpec, SharedValue,
    ValidationMode,
};
