//! Typed, heterogeneous key/value maps that carry pipeline metadata and requests.

use std::fmt::{Display, Formatter};

use vizpipe_types::indexmap::IndexMap;
use vizpipe_types::prettytable::{row, table, Table as PrettyTable};
use vizpipe_types::serde_json;
use vizpipe_types::{MTime, TimeStamp};

use crate::collector::GarbageCollector;
use crate::errors::InformationError;

mod key;
pub mod keys;
mod registry;
mod request;
mod value;
mod vector;

pub use key::{InformationKey, KeyDescriptor, KeyId};
pub use registry::KeyRegistry;
pub use request::{RequestKey, RequestKind};
pub use value::{KeyValue, Value, ValueKind};
pub use vector::InformationVector;

#[derive(Debug, Clone, Default)]
/// A map from keys to values. Every change bumps the map's modification time.
pub struct Information {
    entries: IndexMap<KeyId, Value>,
    mtime: TimeStamp,
}

impl Information {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mtime(&self) -> MTime {
        self.mtime.get()
    }

    pub fn modified(&mut self) {
        self.mtime.modified();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeyId> {
        self.entries.keys()
    }

    pub fn entry(&self, id: &KeyId) -> Option<&Value> {
        self.entries.get(id)
    }

    pub(crate) fn insert_entry(&mut self, id: KeyId, value: Value) {
        self.entries.insert(id, value);
        self.mtime.modified();
    }

    pub fn remove_entry(&mut self, id: &KeyId) {
        if self.entries.shift_remove(id).is_some() {
            self.mtime.modified();
        }
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.mtime.modified();
        }
    }

    /// The request key currently set, if any.
    pub fn request_key(&self) -> Option<KeyId> {
        self.entries
            .iter()
            .find(|(_, value)| matches!(value, Value::Request))
            .map(|(id, _)| *id)
    }

    /// Replaces the entries of `self` with those of `from`. With `deep`, nested information
    /// vectors are duplicated instead of shared.
    pub fn copy_from(&mut self, from: &Information, deep: bool) {
        self.entries.clear();
        for (id, value) in &from.entries {
            let value = if deep { value.deep_copy() } else { value.clone() };
            self.entries.insert(*id, value);
        }
        self.mtime.modified();
    }

    pub fn deep_copy(&self) -> Information {
        let mut copy = Information::new();
        copy.copy_from(self, true);
        copy
    }

    pub fn report(&self, collector: &mut GarbageCollector) {
        for value in self.entries.values() {
            value.report(collector);
        }
    }

    /// Drops every data object reference held directly or in nested information.
    pub(crate) fn remove_object_references(&mut self) {
        self.entries.retain(|_, value| !matches!(value, Value::DataObject(_)));
        for value in self.entries.values_mut() {
            if let Value::InformationVector(vector) = value {
                for info in vector.iter_mut() {
                    info.remove_object_references();
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(id, value)| (id.to_string(), value.to_json()))
                .collect(),
        )
    }

    /// Rebuilds an information object from [`to_json`](Self::to_json) output. Keys are
    /// resolved through `registry`.
    pub fn from_json(
        json: &serde_json::Value,
        registry: &KeyRegistry,
    ) -> Result<Information, InformationError> {
        let object = json.as_object().ok_or_else(|| InformationError::InvalidValue {
            key: "<root>".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;
        let mut info = Information::new();
        for (name, value) in object {
            let descriptor = registry
                .lookup_qualified(name)
                .ok_or_else(|| InformationError::UnknownKey(name.clone()))?;
            let value = Value::from_json(descriptor.kind, value, registry).ok_or_else(|| {
                InformationError::InvalidValue {
                    key: name.clone(),
                    reason: format!("cannot be read as {}", descriptor.kind),
                }
            })?;
            info.insert_entry(descriptor.id, value);
        }
        Ok(info)
    }

    pub fn convert_to_table(&self) -> PrettyTable {
        let mut table = table!();
        for (id, value) in &self.entries {
            table.add_row(row![id, value.kind(), value]);
        }
        table
    }
}

impl Display for Information {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.convert_to_table())
    }
}
