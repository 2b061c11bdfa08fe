//! Field resolution engine
//!
//! Resolution semantics, per field in declaration order:
//! - Look up the value under the field's own name, then each validation alias
//!   in order; the first key present wins
//! - Omitted: default factory -> fresh value; explicit default -> the shared
//!   default object; neither -> MissingRequiredField
//! - Supplied: "none" only if the field is union-with-none; otherwise the
//!   declared type, then its defined coercions; else TypeMismatch
//! - Stored under the canonical field name
//!
//! Instantiation is fail-fast unless the model is in collect-all mode.
//! The engine never mutates a model.

use std::rc::Rc;

use serde_json::{Map, Value};

use super::coerce::conform;
use super::errors::{ModelError, ModelResult};
use super::instance::{Instance, Slot};
use super::types::{DefaultSource, ExtraPolicy, FieldSpec, ModelSpec, ValidationMode};
use crate::observability::{log_event_with_fields, EngineMetrics, Event, MetricsSnapshot};

/// Resolves requiredness, instantiates models and serializes instances.
#[derive(Debug, Default)]
pub struct FieldResolutionEngine {
    metrics: EngineMetrics,
}

impl FieldResolutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of this engine's counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the field must be present in the input.
    ///
    /// A union-with-none field without a default is still required: "none"
    /// being allowed does not make it an implicit default.
    pub fn resolve_requiredness(&self, field: &FieldSpec) -> bool {
        let defaults_to_none = field.is_union_with_none()
            && field.explicit_default_value().map_or(false, |v| v.is_null());
        !(field.has_explicit_default() || field.has_default_factory() || defaults_to_none)
    }

    /// Applies a model to raw input, producing a fresh instance.
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` with field `$root` if the input is not a JSON object
    /// - `MissingRequiredField` / `TypeMismatch` for the first failing field
    ///   (or `Multiple` in collect-all mode)
    /// - `ExtraField` for unclaimed keys when the model forbids extras
    pub fn instantiate(&self, model: &ModelSpec, raw_input: &Value) -> ModelResult<Instance> {
        let input = match raw_input.as_object() {
            Some(input) => input,
            None => {
                return Err(self.reject(model, ModelError::mismatch("$root", "object", raw_input)))
            }
        };

        let fail_fast = model.mode() == ValidationMode::FailFast;
        let mut instance = Instance::new(model.name());
        let mut errors = Vec::new();

        for (index, field) in model.fields().iter().enumerate() {
            match self.resolve_field(model, index, field, input) {
                Ok(slot) => instance.push(field.name(), field.output_alias(), slot),
                Err(err) if fail_fast => return Err(self.reject(model, err)),
                Err(err) => errors.push(err),
            }
        }

        if model.extra() == ExtraPolicy::Forbid {
            for key in input.keys().filter(|key| model.claimant(key).is_none()) {
                let err = ModelError::ExtraField {
                    model: model.name().to_string(),
                    key: key.clone(),
                };
                if fail_fast {
                    return Err(self.reject(model, err));
                }
                errors.push(err);
            }
        }

        if !errors.is_empty() {
            let err = if errors.len() == 1 {
                errors.remove(0)
            } else {
                ModelError::Multiple(errors)
            };
            return Err(self.reject(model, err));
        }

        self.metrics.increment_instances_created();
        log_event_with_fields(Event::InstanceCreated, &[("model", model.name())]);
        Ok(instance)
    }

    /// Produces the output mapping, keyed by canonical names or, with
    /// `use_aliases`, by each field's first serialization alias where one exists.
    pub fn serialize(&self, instance: &Instance, use_aliases: bool) -> Map<String, Value> {
        instance.to_map(use_aliases)
    }

    fn resolve_field(
        &self,
        model: &ModelSpec,
        index: usize,
        field: &FieldSpec,
        input: &Map<String, Value>,
    ) -> ModelResult<Slot> {
        match model.lookup(index, input) {
            Some((_, Value::Null)) if field.is_union_with_none() => Ok(Slot::Owned(Value::Null)),
            Some((_, value)) => {
                let conformed = conform(value, field.declared_type(), field.name(), true)?;
                if conformed.coerced {
                    self.metrics.increment_coercions_applied();
                }
                Ok(Slot::Owned(conformed.value))
            }
            None => match field.default_source() {
                DefaultSource::Factory(factory) => {
                    self.metrics.increment_factory_invocations();
                    log_event_with_fields(
                        Event::DefaultFactoryInvoked,
                        &[
                            ("model", model.name()),
                            ("field", field.name()),
                            ("factory", factory.name()),
                        ],
                    );
                    Ok(Slot::Owned(factory.produce()))
                }
                DefaultSource::Explicit(shared) => {
                    self.metrics.increment_shared_defaults_bound();
                    Ok(Slot::Shared(Rc::clone(shared)))
                }
                DefaultSource::None => Err(ModelError::missing(field.name())),
            },
        }
    }

    fn reject(&self, model: &ModelSpec, err: ModelError) -> ModelError {
        self.metrics.increment_validations_rejected();
        let message = err.to_string();
        log_event_with_fields(
            Event::ValidationFailed,
            &[
                ("model", model.name()),
                ("code", err.code()),
                ("message", message.as_str()),
            ],
        );
        err
    }
}

/// Whether the field must be present in the input
pub fn resolve_requiredness(field: &FieldSpec) -> bool {
    FieldResolutionEngine::new().resolve_requiredness(field)
}

/// Applies a model to raw input with a throwaway engine
pub fn instantiate(model: &ModelSpec, raw_input: &Value) -> ModelResult<Instance> {
    FieldResolutionEngine::new().instantiate(model, raw_input)
}

/// Serializes an instance by canonical name or by serialization alias
pub fn serialize(instance: &Instance, use_aliases: bool) -> Map<String, Value> {
    instance.to_map(use_aliases)
}
