use std::fmt::{Display, Formatter};

use vizpipe_types::serde_json::{self, json};
use vizpipe_types::Extent;

use super::registry::KeyRegistry;
use super::{Information, InformationVector};
use crate::collector::GarbageCollector;
use crate::data_object::DataObjectHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The shape of the value a key stores.
pub enum ValueKind {
    Integer,
    Double,
    String,
    IntegerVector,
    DoubleVector,
    StringVector,
    DataObject,
    InformationVector,
    Request,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Integer => "Integer",
            ValueKind::Double => "Double",
            ValueKind::String => "String",
            ValueKind::IntegerVector => "IntegerVector",
            ValueKind::DoubleVector => "DoubleVector",
            ValueKind::StringVector => "StringVector",
            ValueKind::DataObject => "DataObject",
            ValueKind::InformationVector => "InformationVector",
            ValueKind::Request => "Request",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
/// A value stored in an [`Information`] map.
///
/// Cloning is shallow: data objects are shared, nested information vectors are copied.
pub enum Value {
    Integer(i64),
    Double(f64),
    String(String),
    IntegerVector(Vec<i64>),
    DoubleVector(Vec<f64>),
    StringVector(Vec<String>),
    DataObject(DataObjectHandle),
    InformationVector(InformationVector),
    Request,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::IntegerVector(_) => ValueKind::IntegerVector,
            Value::DoubleVector(_) => ValueKind::DoubleVector,
            Value::StringVector(_) => ValueKind::StringVector,
            Value::DataObject(_) => ValueKind::DataObject,
            Value::InformationVector(_) => ValueKind::InformationVector,
            Value::Request => ValueKind::Request,
        }
    }

    /// Copies the value, duplicating data objects and nested information instead of sharing
    /// them.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::DataObject(handle) => Value::DataObject(handle.deep_copy()),
            Value::InformationVector(vector) => Value::InformationVector(vector.deep_copy()),
            other => other.clone(),
        }
    }

    pub fn report(&self, collector: &mut GarbageCollector) {
        match self {
            Value::DataObject(handle) => collector.report(handle),
            Value::InformationVector(vector) => vector.report(collector),
            _ => {}
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(v) => json!(v),
            Value::Double(v) => json!(v),
            Value::String(v) => json!(v),
            Value::IntegerVector(v) => json!(v),
            Value::DoubleVector(v) => json!(v),
            Value::StringVector(v) => json!(v),
            Value::DataObject(handle) => json!({
                "class": handle.class_name(),
                "id": handle.id().to_string(),
            }),
            Value::InformationVector(vector) => {
                serde_json::Value::Array(vector.iter().map(Information::to_json).collect())
            }
            Value::Request => json!(true),
        }
    }

    /// Parses `json` as a value of `kind`. Data objects cannot be restored from JSON.
    pub fn from_json(
        kind: ValueKind,
        json: &serde_json::Value,
        registry: &KeyRegistry,
    ) -> Option<Value> {
        let value = match kind {
            ValueKind::Integer => Value::Integer(json.as_i64()?),
            ValueKind::Double => Value::Double(json.as_f64()?),
            ValueKind::String => Value::String(json.as_str()?.to_string()),
            ValueKind::IntegerVector => Value::IntegerVector(
                json.as_array()?
                    .iter()
                    .map(|v| v.as_i64())
                    .collect::<Option<_>>()?,
            ),
            ValueKind::DoubleVector => Value::DoubleVector(
                json.as_array()?
                    .iter()
                    .map(|v| v.as_f64())
                    .collect::<Option<_>>()?,
            ),
            ValueKind::StringVector => Value::StringVector(
                json.as_array()?
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<_>>()?,
            ),
            ValueKind::InformationVector => {
                let mut vector = InformationVector::new();
                for item in json.as_array()? {
                    vector.append(Information::from_json(item, registry).ok()?);
                }
                Value::InformationVector(vector)
            }
            ValueKind::Request => Value::Request,
            ValueKind::DataObject => return None,
        };
        Some(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::DataObject(handle) => write!(f, "{}({})", handle.class_name(), handle.id()),
            Value::InformationVector(vector) => write!(f, "[{} item(s)]", vector.len()),
            Value::Request => f.write_str("<request>"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Rust types that can be stored under an [`InformationKey`](super::InformationKey).
pub trait KeyValue: Clone + Sized {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;

    /// Rejects values that do not satisfy the key's required class.
    fn check(&self, _required_class: Option<&'static str>) -> Result<(), String> {
        Ok(())
    }
}

impl KeyValue for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl KeyValue for bool {
    const KIND: ValueKind = ValueKind::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl KeyValue for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl KeyValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl KeyValue for Vec<i64> {
    const KIND: ValueKind = ValueKind::IntegerVector;

    fn into_value(self) -> Value {
        Value::IntegerVector(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerVector(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl KeyValue for Vec<f64> {
    const KIND: ValueKind = ValueKind::DoubleVector;

    fn into_value(self) -> Value {
        Value::DoubleVector(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DoubleVector(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl KeyValue for Vec<String> {
    const KIND: ValueKind = ValueKind::StringVector;

    fn into_value(self) -> Value {
        Value::StringVector(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringVector(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl KeyValue for Extent {
    const KIND: ValueKind = ValueKind::IntegerVector;

    fn into_value(self) -> Value {
        Value::IntegerVector(self.to_vec())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerVector(v) => Extent::from_slice(v),
            _ => None,
        }
    }
}

impl KeyValue for DataObjectHandle {
    const KIND: ValueKind = ValueKind::DataObject;

    fn into_value(self) -> Value {
        Value::DataObject(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DataObject(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    fn check(&self, required_class: Option<&'static str>) -> Result<(), String> {
        match required_class {
            Some(class) if !self.is_a(class) => Err(format!(
                "{} is not a {}",
                self.class_name(),
                class
            )),
            _ => Ok(()),
        }
    }
}

impl KeyValue for InformationVector {
    const KIND: ValueKind = ValueKind::InformationVector;

    fn into_value(self) -> Value {
        Value::InformationVector(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::InformationVector(v) => Some(v.clone()),
            _ => None,
        }
    }
}
