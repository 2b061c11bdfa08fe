//! Resolved model instances
//!
//! Each slot is either owned by the instance (supplied values and factory
//! output) or a handle to the model's explicit default, which every instance
//! that omitted the field holds at the same time.

use std::rc::Rc;

use serde_json::{Map, Value};

use super::errors::{ModelError, ModelResult};
use super::types::SharedValue;

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Owned(Value),
    Shared(SharedValue),
}

impl Slot {
    fn snapshot(&self) -> Value {
        match self {
            Slot::Owned(value) => value.clone(),
            Slot::Shared(shared) => shared.borrow().clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct InstanceField {
    name: String,
    output_alias: Option<String>,
    slot: Slot,
}

/// Field values of one model instance, in declaration order.
#[derive(Debug, Clone)]
pub struct Instance {
    model: String,
    fields: Vec<InstanceField>,
}

impl Instance {
    pub(crate) fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &str, output_alias: Option<&str>, slot: Slot) {
        self.fields.push(InstanceField {
            name: name.to_string(),
            output_alias: output_alias.map(str::to_string),
            slot,
        });
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Canonical field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns a copy of the field's current value
    pub fn get(&self, name: &str) -> Option<Value> {
        self.position(name).map(|i| self.fields[i].slot.snapshot())
    }

    /// Rebinds a field to a new value owned by this instance.
    ///
    /// A field bound to a shared explicit default is detached from it; other
    /// instances keep seeing the default.
    pub fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        let index = self.require(name)?;
        self.fields[index].slot = Slot::Owned(value);
        Ok(())
    }

    /// Mutates a field's value in place.
    ///
    /// For a field bound to a shared explicit default this mutates the default
    /// itself, which every instance holding it observes.
    pub fn update<R>(&mut self, name: &str, f: impl FnOnce(&mut Value) -> R) -> ModelResult<R> {
        let index = self.require(name)?;
        match &mut self.fields[index].slot {
            Slot::Owned(value) => Ok(f(value)),
            Slot::Shared(shared) => {
                let mut value = shared.borrow_mut();
                Ok(f(&mut *value))
            }
        }
    }

    /// True when the field is bound to the model's explicit default object
    pub fn is_shared(&self, name: &str) -> bool {
        self.position(name)
            .map(|i| matches!(self.fields[i].slot, Slot::Shared(_)))
            .unwrap_or(false)
    }

    /// True when both instances hold the very same object for `name`
    pub fn shares_value_with(&self, other: &Instance, name: &str) -> bool {
        match (self.slot(name), other.slot(name)) {
            (Some(Slot::Shared(a)), Some(Slot::Shared(b))) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Builds the output mapping keyed by canonical name, or by each field's
    /// first serialization alias when `by_alias` is set.
    pub fn to_map(&self, by_alias: bool) -> Map<String, Value> {
        let mut out = Map::new();
        for field in &self.fields {
            let key = match (&field.output_alias, by_alias) {
                (Some(alias), true) => alias.clone(),
                _ => field.name.clone(),
            };
            out.insert(key, field.slot.snapshot());
        }
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.position(name).map(|i| &self.fields[i].slot)
    }

    fn require(&self, name: &str) -> ModelResult<usize> {
        self.position(name).ok_or_else(|| ModelError::UnknownField {
            model: self.model.clone(),
            field: name.to_string(),
        })
    }
}

/// Instances are equal when they belong to the same model and hold equal values.
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.slot.snapshot() == b.slot.snapshot())
    }
}
