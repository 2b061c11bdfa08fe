//! Type conformance and coercion
//!
//! A value is first checked for an exact match against the declared type.
//! Only when that fails are the type's defined coercions attempted:
//! - int: integral float, integer-literal string
//! - float: numeric string
//! - bool: "true"/"false"/"1"/"0"/"yes"/"no", integers 0 and 1
//! - timestamp: epoch seconds (number or numeric string), `YYYY-MM-DD`,
//!   naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC)
//! - string: none
//!
//! Unions try every alternative exactly before trying any coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use super::errors::{ModelError, ModelResult};
use super::types::FieldType;

/// Outcome of conforming a value to a type
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Conformed {
    pub value: Value,
    /// At least one coercion was applied somewhere in the value
    pub coerced: bool,
}

impl Conformed {
    fn exact(value: Value) -> Self {
        Self {
            value,
            coerced: false,
        }
    }

    fn coerced(value: Value) -> Self {
        Self {
            value,
            coerced: true,
        }
    }
}

/// Conforms a supplied value to `ty`, reporting failures against `path`.
pub(crate) fn conform(
    value: &Value,
    ty: &FieldType,
    path: &str,
    allow_coercion: bool,
) -> ModelResult<Conformed> {
    match ty {
        FieldType::String => match value {
            Value::String(_) => Ok(Conformed::exact(value.clone())),
            _ => Err(mismatch(path, ty, value)),
        },
        FieldType::Int => {
            if value.is_i64() || value.is_u64() {
                return Ok(Conformed::exact(value.clone()));
            }
            if allow_coercion {
                if let Some(n) = coerce_int(value) {
                    return Ok(Conformed::coerced(Value::from(n)));
                }
            }
            Err(mismatch(path, ty, value))
        }
        FieldType::Float => {
            if value.is_number() {
                return Ok(Conformed::exact(value.clone()));
            }
            if allow_coercion {
                if let Some(n) = coerce_float(value) {
                    return Ok(Conformed::coerced(Value::Number(n)));
                }
            }
            Err(mismatch(path, ty, value))
        }
        FieldType::Bool => {
            if value.is_boolean() {
                return Ok(Conformed::exact(value.clone()));
            }
            if allow_coercion {
                if let Some(b) = coerce_bool(value) {
                    return Ok(Conformed::coerced(Value::Bool(b)));
                }
            }
            Err(mismatch(path, ty, value))
        }
        FieldType::Timestamp => {
            if let Some(ts) = value.as_str().and_then(parse_rfc3339) {
                return Ok(Conformed::exact(Value::String(format_timestamp(&ts))));
            }
            if allow_coercion {
                if let Some(ts) = coerce_timestamp(value) {
                    return Ok(Conformed::coerced(Value::String(format_timestamp(&ts))));
                }
            }
            Err(mismatch(path, ty, value))
        }
        FieldType::Any => match value {
            Value::Null => Err(mismatch(path, ty, value)),
            _ => Ok(Conformed::exact(value.clone())),
        },
        FieldType::Null => match value {
            Value::Null => Ok(Conformed::exact(Value::Null)),
            _ => Err(mismatch(path, ty, value)),
        },
        FieldType::List(item_type) => {
            let items = value.as_array().ok_or_else(|| mismatch(path, ty, value))?;
            let mut out = Vec::with_capacity(items.len());
            let mut coerced = false;
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                let conformed = conform(item, item_type, &item_path, allow_coercion)?;
                coerced |= conformed.coerced;
                out.push(conformed.value);
            }
            Ok(Conformed {
                value: Value::Array(out),
                coerced,
            })
        }
        FieldType::Dict(value_type) => {
            let entries = value.as_object().ok_or_else(|| mismatch(path, ty, value))?;
            let mut out = Map::new();
            let mut coerced = false;
            for (key, entry) in entries {
                let entry_path = format!("{}.{}", path, key);
                let conformed = conform(entry, value_type, &entry_path, allow_coercion)?;
                coerced |= conformed.coerced;
                out.insert(key.clone(), conformed.value);
            }
            Ok(Conformed {
                value: Value::Object(out),
                coerced,
            })
        }
        FieldType::Union(alternatives) => {
            for alt in alternatives {
                if let Ok(conformed) = conform(value, alt, path, false) {
                    return Ok(conformed);
                }
            }
            if allow_coercion {
                for alt in alternatives {
                    if let Ok(conformed) = conform(value, alt, path, true) {
                        return Ok(Conformed::coerced(conformed.value));
                    }
                }
            }
            Err(mismatch(path, ty, value))
        }
    }
}

fn mismatch(path: &str, ty: &FieldType, value: &Value) -> ModelError {
    ModelError::mismatch(path, ty.to_string(), value)
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            let f = n.as_f64()?;
            (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
                .then_some(f as i64)
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<Number> {
    let f = value.as_str()?.trim().parse::<f64>().ok()?;
    Number::from_f64(f)
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Number(n) => match n.as_i64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => from_epoch_seconds(n.as_f64()?),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<f64>() {
                return from_epoch_seconds(secs);
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.and_utc())
        }
        _ => None,
    }
}

fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
