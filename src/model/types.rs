//! Field and model definitions
//!
//! Supported declared types:
//! - string, int, float, bool, timestamp, any
//! - list<T>: homogeneous list with item type T
//! - dict<T>: string-keyed mapping with value type T
//! - union<A, B, ..>: first matching alternative wins
//!
//! A "none" alternative at the top level of a field's type is not kept in the
//! type itself; it becomes the field's `nullable` flag. Nested "none"
//! alternatives (e.g. `list<string | none>`) stay as `FieldType::Null`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ModelError, ModelResult};
use crate::observability::{log_event_with_fields, Event};

/// A value bound once at definition time and shared by every instance that omits the field.
pub type SharedValue = Rc<RefCell<Value>>;

/// Declared field types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// RFC 3339 timestamp, normalized to UTC
    Timestamp,
    /// Any non-none value
    Any,
    /// The "none" value; only appears nested inside other types
    Null,
    /// Homogeneous list
    List(Box<FieldType>),
    /// String-keyed mapping
    Dict(Box<FieldType>),
    /// Ordered alternatives
    Union(Vec<FieldType>),
}

impl FieldType {
    pub fn list(item: FieldType) -> Self {
        FieldType::List(Box::new(item))
    }

    pub fn dict(value: FieldType) -> Self {
        FieldType::Dict(Box::new(value))
    }

    /// Returns the short type name for logs and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Timestamp => "timestamp",
            FieldType::Any => "any",
            FieldType::Null => "none",
            FieldType::List(_) => "list",
            FieldType::Dict(_) => "dict",
            FieldType::Union(_) => "union",
        }
    }

    /// Container types hold state that outlives a single assignment.
    pub fn is_container(&self) -> bool {
        match self {
            FieldType::List(_) | FieldType::Dict(_) => true,
            FieldType::Union(alternatives) => alternatives.iter().any(FieldType::is_container),
            _ => false,
        }
    }

    /// Parses a type expression such as `list<union<string, timestamp>>` or `string | none`.
    ///
    /// Returns the declared type and whether a top-level "none" alternative was present.
    pub fn parse(expr: &str) -> ModelResult<(FieldType, bool)> {
        let alternatives = parse_alternatives(expr, expr)?;
        split_none(expr, alternatives)
    }

    /// Removes top-level `Null` alternatives, reporting whether any were present.
    fn strip_none(self) -> (Option<FieldType>, bool) {
        match self {
            FieldType::Null => (None, true),
            FieldType::Union(alternatives) => {
                let nullable = alternatives.contains(&FieldType::Null);
                let mut rest: Vec<FieldType> = alternatives
                    .into_iter()
                    .filter(|alt| *alt != FieldType::Null)
                    .collect();
                let ty = match rest.len() {
                    0 => None,
                    1 => rest.pop(),
                    _ => Some(FieldType::Union(rest)),
                };
                (ty, nullable)
            }
            other => (Some(other), false),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::List(item) => write!(f, "list<{}>", item),
            FieldType::Dict(value) => write!(f, "dict<{}>", value),
            FieldType::Union(alternatives) => {
                write!(f, "union<")?;
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", alt)?;
                }
                write!(f, ">")
            }
            scalar => write!(f, "{}", scalar.type_name()),
        }
    }
}

fn split_none(expr: &str, mut alternatives: Vec<FieldType>) -> ModelResult<(FieldType, bool)> {
    let ty = if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        FieldType::Union(alternatives)
    };
    match ty.strip_none() {
        (Some(ty), nullable) => Ok((ty, nullable)),
        (None, _) => Err(ModelError::invalid_type(
            expr,
            "a field cannot be only 'none'",
        )),
    }
}

/// Parses `A | B | ..` into its alternatives.
fn parse_alternatives(expr: &str, whole: &str) -> ModelResult<Vec<FieldType>> {
    let mut out = Vec::new();
    for part in split_top_level(expr, '|', whole)? {
        out.extend(parse_single(part, whole)?);
    }
    Ok(out)
}

/// Parses one term; `union<..>` and `optional<..>` expand to several alternatives.
fn parse_single(term: &str, whole: &str) -> ModelResult<Vec<FieldType>> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ModelError::invalid_type(whole, "empty type term"));
    }

    if let Some(open) = term.find('<') {
        if !term.ends_with('>') {
            return Err(ModelError::invalid_type(whole, format!("unclosed '<' in '{}'", term)));
        }
        let head = term[..open].trim().to_ascii_lowercase();
        let inner = &term[open + 1..term.len() - 1];
        return match head.as_str() {
            "list" => Ok(vec![FieldType::list(parse_nested(inner, whole)?)]),
            "dict" => Ok(vec![FieldType::dict(parse_nested(inner, whole)?)]),
            "union" => {
                let mut out = Vec::new();
                for part in split_top_level(inner, ',', whole)? {
                    out.extend(parse_alternatives(part, whole)?);
                }
                Ok(out)
            }
            "optional" => {
                let mut out = parse_alternatives(inner, whole)?;
                out.push(FieldType::Null);
                Ok(out)
            }
            other => Err(ModelError::invalid_type(
                whole,
                format!("unknown generic type '{}'", other),
            )),
        };
    }

    let ty = match term.to_ascii_lowercase().as_str() {
        "string" | "str" => FieldType::String,
        "int" | "integer" => FieldType::Int,
        "float" | "number" => FieldType::Float,
        "bool" | "boolean" => FieldType::Bool,
        "timestamp" | "datetime" => FieldType::Timestamp,
        "any" => FieldType::Any,
        "none" | "null" => FieldType::Null,
        other => {
            return Err(ModelError::invalid_type(
                whole,
                format!("unknown type '{}'", other),
            ))
        }
    };
    Ok(vec![ty])
}

/// Parses the argument of `list<..>` / `dict<..>`, keeping nested "none" alternatives.
fn parse_nested(inner: &str, whole: &str) -> ModelResult<FieldType> {
    let mut alternatives = parse_alternatives(inner, whole)?;
    if alternatives.len() == 1 {
        Ok(alternatives.remove(0))
    } else {
        Ok(FieldType::Union(alternatives))
    }
}

/// Splits on `sep` outside of angle brackets.
fn split_top_level<'e>(expr: &'e str, sep: char, whole: &str) -> ModelResult<Vec<&'e str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in expr.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ModelError::invalid_type(whole, "unbalanced '>'"))?;
            }
            c if c == sep && depth == 0 => {
                parts.push(&expr[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ModelError::invalid_type(whole, "unbalanced '<'"));
    }
    parts.push(&expr[start..]);
    Ok(parts)
}

/// A named zero-argument producer invoked once per instance.
#[derive(Clone)]
pub struct DefaultFactory {
    name: String,
    produce: Rc<dyn Fn() -> Value>,
}

impl DefaultFactory {
    pub fn new(name: impl Into<String>, produce: impl Fn() -> Value + 'static) -> Self {
        Self {
            name: name.into(),
            produce: Rc::new(produce),
        }
    }

    /// Produces an empty list
    pub fn list() -> Self {
        Self::new("list", || Value::Array(Vec::new()))
    }

    /// Produces an empty mapping
    pub fn dict() -> Self {
        Self::new("dict", || Value::Object(serde_json::Map::new()))
    }

    /// Produces the current time as an RFC 3339 UTC timestamp
    pub fn now() -> Self {
        Self::new("now", || {
            Value::String(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            )
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the factory, producing a value owned by the caller
    pub fn produce(&self) -> Value {
        (self.produce)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Where an omitted field's value comes from
#[derive(Debug, Clone)]
pub enum DefaultSource {
    /// No default: the field must be supplied
    None,
    /// One object, bound by reference into every instance that omits the field
    Explicit(SharedValue),
    /// A fresh object per instance
    Factory(DefaultFactory),
}

impl DefaultSource {
    pub fn kind(&self) -> &'static str {
        match self {
            DefaultSource::None => "none",
            DefaultSource::Explicit(_) => "explicit",
            DefaultSource::Factory(_) => "factory",
        }
    }
}

/// One declared field of a model
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    declared_type: FieldType,
    nullable: bool,
    default: DefaultSource,
    aliases: Vec<String>,
    serialization_aliases: Vec<String>,
}

impl FieldSpec {
    /// Creates a field with no default and no aliases.
    ///
    /// A top-level "none" alternative in `declared_type` marks the field nullable.
    pub fn new(name: impl Into<String>, declared_type: FieldType) -> Self {
        let (declared_type, nullable) = match declared_type.strip_none() {
            (Some(ty), nullable) => (ty, nullable),
            (None, _) => (FieldType::Any, true),
        };
        Self {
            name: name.into(),
            declared_type,
            nullable,
            default: DefaultSource::None,
            aliases: Vec::new(),
            serialization_aliases: Vec::new(),
        }
    }

    /// Permits "none" as a supplied value. Does not make the field optional to supply.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Binds an explicit default, replacing any default factory.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = DefaultSource::Explicit(Rc::new(RefCell::new(value)));
        self
    }

    /// Binds a default factory, replacing any explicit default.
    pub fn default_factory(mut self, factory: DefaultFactory) -> Self {
        self.default = DefaultSource::Factory(factory);
        self
    }

    /// Adds a key the value may be supplied under.
    pub fn validation_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds a key the value may be reported under.
    pub fn serialization_alias(mut self, alias: impl Into<String>) -> Self {
        self.serialization_aliases.push(alias.into());
        self
    }

    /// Adds an alias used both for input lookup and for output.
    pub fn alias(self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.validation_alias(alias.clone()).serialization_alias(alias)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &FieldType {
        &self.declared_type
    }

    pub fn is_union_with_none(&self) -> bool {
        self.nullable
    }

    pub fn default_source(&self) -> &DefaultSource {
        &self.default
    }

    pub fn has_explicit_default(&self) -> bool {
        matches!(self.default, DefaultSource::Explicit(_))
    }

    pub fn has_default_factory(&self) -> bool {
        matches!(self.default, DefaultSource::Factory(_))
    }

    /// Returns a snapshot of the explicit default's current value.
    pub fn explicit_default_value(&self) -> Option<Value> {
        match &self.default {
            DefaultSource::Explicit(shared) => Some(shared.borrow().clone()),
            _ => None,
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn serialization_aliases(&self) -> &[String] {
        &self.serialization_aliases
    }

    /// Key used on output when serializing by alias
    pub fn output_alias(&self) -> Option<&str> {
        self.serialization_aliases.first().map(String::as_str)
    }

    /// Own name first, then validation aliases in declaration order
    pub fn lookup_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// An explicit default on a container type is shared mutable state across instances.
    pub fn has_shared_mutable_default(&self) -> bool {
        self.has_explicit_default() && self.declared_type.is_container()
    }
}

/// How keys not claimed by any field are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPolicy {
    #[default]
    Ignore,
    Forbid,
}

/// Whether instantiation stops at the first error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    FailFast,
    CollectAll,
}

/// An ordered, immutable set of uniquely named fields
#[derive(Debug, Clone)]
pub struct ModelSpec {
    name: String,
    fields: Vec<FieldSpec>,
    extra: ExtraPolicy,
    mode: ValidationMode,
    /// Input key -> index of the field that owns it
    claims: HashMap<String, usize>,
}

impl ModelSpec {
    /// Builds a model from fields in declaration order.
    ///
    /// Every field owns its own name as an input key. When two fields list the
    /// same validation alias, the earlier declared field owns it; an alias equal
    /// to another field's name is never used.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> ModelResult<Self> {
        let name = name.into();

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name()) {
                return Err(ModelError::DuplicateField(field.name().to_string()));
            }
        }

        // Own names first: an alias never takes a key away from a field's own name.
        let mut claims: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.name().to_string(), index))
            .collect();
        for (index, field) in fields.iter().enumerate() {
            for key in field.aliases().iter().map(String::as_str) {
                let owner = *claims.entry(key.to_string()).or_insert(index);
                if owner != index {
                    log_event_with_fields(
                        Event::AliasOverlap,
                        &[
                            ("model", name.as_str()),
                            ("key", key),
                            ("owner", fields[owner].name()),
                            ("ignored_for", field.name()),
                        ],
                    );
                }
            }
        }

        for field in fields.iter().filter(|f| f.has_shared_mutable_default()) {
            let ty = field.declared_type().to_string();
            log_event_with_fields(
                Event::SharedMutableDefault,
                &[("model", name.as_str()), ("field", field.name()), ("type", ty.as_str())],
            );
        }

        Ok(Self {
            name,
            fields,
            extra: ExtraPolicy::default(),
            mode: ValidationMode::default(),
            claims,
        })
    }

    pub fn with_extra(mut self, extra: ExtraPolicy) -> Self {
        self.extra = extra;
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn extra(&self) -> ExtraPolicy {
        self.extra
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Returns the index of the field that owns an input key
    pub fn claimant(&self, key: &str) -> Option<usize> {
        self.claims.get(key).copied()
    }

    /// Finds the supplied value for the field at `index`: own name first, then
    /// aliases in order, skipping keys owned by an earlier field.
    pub fn lookup<'v>(
        &self,
        index: usize,
        input: &'v serde_json::Map<String, Value>,
    ) -> Option<(&str, &'v Value)> {
        let field = self.fields.get(index)?;
        field
            .lookup_keys()
            .filter(|key| self.claimant(key) == Some(index))
            .find_map(|key| input.get(key).map(|value| (key, value)))
    }

    /// Fields whose explicit default is a container shared by every instance
    pub fn shared_mutable_defaults(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.has_shared_mutable_default())
            .map(FieldSpec::name)
            .collect()
    }
}
