//! Field maps and the dotted-path resolver.
//!
//! A [`FieldMap`] declares which keys a client sees and where each value comes
//! from. Each entry is either a dotted lookup path or a [`FieldDescriptor`]:
//!
//! ```text
//! "user"     => ":author.pk"        // ':' - author may be null, stop there
//! "name"     => "+get_full_name"    // '+' - invoke before continuing
//! "url"      => Field(id, primary key)   // absolute detail URL of the record
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::data::Data;

const NULLABLE: char = ':';
const CALLABLE: char = '+';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("'{owner}' object has no attribute '{name}'")]
    MissingAttribute { owner: String, name: String },

    #[error("key '{0}' not found")]
    MissingKey(String),

    #[error("'{0}' is not callable")]
    NotCallable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Plain,
    PrimaryKey,
    ForeignKey,
}

/// Model-level description of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Storage name; differs from `name` for foreign keys (`owner` → `owner_id`).
    pub attname: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attname: name.clone(),
            name,
            kind: FieldKind::Plain,
        }
    }

    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::PrimaryKey,
            ..Self::plain(name)
        }
    }

    pub fn foreign_key(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attname: format!("{name}_id"),
            name,
            kind: FieldKind::ForeignKey,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Path(String),
    Field(FieldDescriptor),
}

impl From<&str> for Lookup {
    fn from(path: &str) -> Self {
        Lookup::Path(path.to_string())
    }
}

impl From<String> for Lookup {
    fn from(path: String) -> Self {
        Lookup::Path(path)
    }
}

impl From<FieldDescriptor> for Lookup {
    fn from(field: FieldDescriptor) -> Self {
        Lookup::Field(field)
    }
}

/// Ordered exposed-key → lookup map. Re-inserting a key replaces its lookup
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, Lookup)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn field(mut self, key: impl Into<String>, lookup: impl Into<Lookup>) -> Self {
        self.insert(key, lookup);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, lookup: impl Into<Lookup>) {
        let key = key.into();
        let lookup = lookup.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = lookup,
            None => self.0.push((key, lookup)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Lookup> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, l)| l)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Lookup)> {
        self.0.iter().map(|(k, l)| (k.as_str(), l))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Default exposure for a model: every field by descriptor, the primary key
    /// also as `url` (detail link) with its own key holding the raw value, and
    /// foreign keys also by their raw column.
    pub fn from_descriptors(fields: &[FieldDescriptor]) -> Self {
        let mut map = FieldMap::new();
        for fld in fields {
            map.insert(fld.name.clone(), fld.clone());
            match fld.kind {
                FieldKind::PrimaryKey => {
                    map.insert("url", fld.clone());
                    map.insert(fld.name.clone(), fld.attname.clone());
                }
                FieldKind::ForeignKey => map.insert(fld.attname.clone(), fld.attname.clone()),
                FieldKind::Plain => {}
            }
        }
        map
    }
}

impl<K, L> FromIterator<(K, L)> for FieldMap
where
    K: Into<String>,
    L: Into<Lookup>,
{
    fn from_iter<I: IntoIterator<Item = (K, L)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, l) in iter {
            map.insert(k, l);
        }
        map
    }
}

/// Builds canonical URLs for records referenced through field descriptors.
pub trait Linker: Send + Sync + fmt::Debug {
    fn detail_url(&self, resource: &str, pk: &Value) -> Option<String>;
}

/// Shapes records into the field set exposed to clients.
#[derive(Debug, Clone, Default)]
pub struct Preparer {
    fields: Option<FieldMap>,
    linker: Option<Arc<dyn Linker>>,
}

impl Preparer {
    pub fn new(fields: Option<FieldMap>) -> Self {
        Self {
            fields,
            linker: None,
        }
    }

    pub fn with_linker(mut self, linker: Option<Arc<dyn Linker>>) -> Self {
        self.linker = linker;
        self
    }

    pub fn fields(&self) -> Option<&FieldMap> {
        self.fields.as_ref()
    }

    /// With no non-empty field map the data is serialized as-is.
    pub fn prepare(&self, data: &Data) -> Result<Value, ResolveError> {
        let Some(fields) = self.fields.as_ref().filter(|f| !f.is_empty()) else {
            return Ok(data.to_json());
        };

        let mut result = Map::new();
        for (key, lookup) in fields.iter() {
            let value = match lookup {
                Lookup::Path(path) => resolve(path, data)?.to_json(),
                Lookup::Field(field) => self.lookup_field(field, data),
            };
            result.insert(key.to_string(), value);
        }
        Ok(Value::Object(result))
    }

    /// Primary keys and foreign keys become absolute detail URLs; plain fields
    /// yield their value. Anything unresolvable is `null`.
    pub fn lookup_field(&self, field: &FieldDescriptor, data: &Data) -> Value {
        match field.kind {
            FieldKind::Plain => member(data, &field.name)
                .map(|d| d.to_json())
                .unwrap_or(Value::Null),
            FieldKind::PrimaryKey => match data {
                Data::Record(record) => self.link(record.resource(), record.pk()),
                _ => Value::Null,
            },
            FieldKind::ForeignKey => match member(data, &field.name) {
                Ok(Data::Record(related)) => self.link(related.resource(), related.pk()),
                _ => Value::Null,
            },
        }
    }

    fn link(&self, resource: &str, pk: Option<Value>) -> Value {
        let (Some(linker), Some(pk)) = (self.linker.as_ref(), pk) else {
            return Value::Null;
        };
        linker
            .detail_url(resource, &pk)
            .map(Value::String)
            .unwrap_or(Value::Null)
    }
}

/// Descend through `data` following a dotted lookup path.
pub fn resolve(path: &str, data: &Data) -> Result<Data, ResolveError> {
    let (chunk, remaining) = path.split_once('.').unwrap_or((path, ""));
    if chunk.is_empty() {
        return Ok(data.clone());
    }

    let (nullable, chunk) = match chunk.strip_prefix(NULLABLE) {
        Some(rest) => (true, rest.trim_start_matches(NULLABLE)),
        None => (false, chunk),
    };
    let (invoke, chunk) = match chunk.strip_prefix(CALLABLE) {
        Some(rest) => (true, rest.trim_start_matches(CALLABLE)),
        None => (false, chunk),
    };

    let value = match member(data, chunk) {
        Ok(value) => value,
        Err(_) if nullable => Data::Null,
        Err(err) => return Err(err),
    };

    let value = match value {
        Data::Callable(f) => f.call(),
        Data::Manager(m) if invoke => Data::List(m.all()),
        other if invoke && !other.is_null() => {
            return Err(ResolveError::NotCallable(chunk.to_string()))
        }
        other => other,
    };

    if nullable && value.is_falsy() {
        return Ok(value);
    }

    if remaining.is_empty() {
        if let Data::Record(record) = &value {
            if let Some(url) = record.absolute_url() {
                return Ok(Data::from(url));
            }
        }
        return Ok(value);
    }

    resolve(remaining, &value)
}

/// One step of a lookup: key access on mappings, attribute access otherwise.
fn member(data: &Data, name: &str) -> Result<Data, ResolveError> {
    match data {
        Data::Null | Data::Value(Value::Null) => Ok(Data::Null),
        Data::Mapping(map) => map
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::MissingKey(name.to_string())),
        Data::Value(Value::Object(obj)) => obj
            .get(name)
            .cloned()
            .map(Data::from)
            .ok_or_else(|| ResolveError::MissingKey(name.to_string())),
        Data::Record(record) => {
            record
                .attr(name)
                .ok_or_else(|| ResolveError::MissingAttribute {
                    owner: record.resource().to_string(),
                    name: name.to_string(),
                })
        }
        other => Err(ResolveError::MissingAttribute {
            owner: other.kind_name(),
            name: name.to_string(),
        }),
    }
}
