//! The values the preparer walks over.
//!
//! [`Data`] is a closed union: a lookup either indexes a mapping, reads an
//! attribute of a [`Record`], or hits a plain value. No reflection happens at
//! runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// An attribute-bearing entity, typically one persisted row.
pub trait Record: Send + Sync + fmt::Debug {
    /// Resource name used for linking (e.g. `"user"`).
    fn resource(&self) -> &str;

    /// Primary key, `None` while unsaved.
    fn pk(&self) -> Option<Value>;

    /// Attribute lookup; `None` means the record has no such attribute.
    fn attr(&self, name: &str) -> Option<Data>;

    /// Canonical location of the record. When present it replaces the record
    /// at the end of a lookup path.
    fn absolute_url(&self) -> Option<String> {
        None
    }

    /// Whole-record serialization, used when no field map is declared.
    fn to_json(&self) -> Value;
}

/// A relation manager: a handle on related records that is never invoked
/// implicitly, only under the `+` lookup modifier.
pub trait Manager: Send + Sync + fmt::Debug {
    fn all(&self) -> Vec<Data>;
}

/// A zero-argument computed value (method-valued attribute).
#[derive(Clone)]
pub struct Callable(Arc<dyn Fn() -> Data + Send + Sync>);

impl Callable {
    pub fn new(f: impl Fn() -> Data + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> Data {
        (self.0)()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

#[derive(Clone, Debug, Default)]
pub enum Data {
    #[default]
    Null,
    /// Plain JSON; objects count as mappings, everything else as opaque values.
    Value(Value),
    Mapping(BTreeMap<String, Data>),
    List(Vec<Data>),
    Record(Arc<dyn Record>),
    Callable(Callable),
    Manager(Arc<dyn Manager>),
}

impl Data {
    pub fn record<R: Record + 'static>(record: R) -> Self {
        Data::Record(Arc::new(record))
    }

    pub fn callable(f: impl Fn() -> Data + Send + Sync + 'static) -> Self {
        Data::Callable(Callable::new(f))
    }

    pub fn manager<M: Manager + 'static>(manager: M) -> Self {
        Data::Manager(Arc::new(manager))
    }

    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Data)>,
    {
        Data::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null | Data::Value(Value::Null))
    }

    /// Python-style truthiness: null, false, zero and empty containers are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Data::Null => true,
            Data::Value(v) => match v {
                Value::Null => true,
                Value::Bool(b) => !b,
                Value::Number(n) => n.as_f64() == Some(0.0),
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
            },
            Data::Mapping(m) => m.is_empty(),
            Data::List(l) => l.is_empty(),
            Data::Record(_) | Data::Callable(_) | Data::Manager(_) => false,
        }
    }

    /// Short type label used in resolver error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Data::Null => "null".to_string(),
            Data::Value(v) => match v {
                Value::Null => "null",
                Value::Bool(_) => "bool",
                Value::Number(_) => "number",
                Value::String(_) => "str",
                Value::Array(_) => "list",
                Value::Object(_) => "dict",
            }
            .to_string(),
            Data::Mapping(_) => "dict".to_string(),
            Data::List(_) => "list".to_string(),
            Data::Record(r) => r.resource().to_string(),
            Data::Callable(_) => "callable".to_string(),
            Data::Manager(_) => "manager".to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Data::Null => Value::Null,
            Data::Value(v) => v.clone(),
            Data::Mapping(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Data::List(items) => Value::Array(items.iter().map(Data::to_json).collect()),
            Data::Record(r) => r.to_json(),
            Data::Callable(f) => f.call().to_json(),
            Data::Manager(m) => Value::Array(m.all().iter().map(Data::to_json).collect()),
        }
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Data::Null,
            other => Data::Value(other),
        }
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::Value(Value::String(value))
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Value(Value::Bool(value))
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Data::Value(Value::from(value))
    }
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Data::Null)
    }
}
