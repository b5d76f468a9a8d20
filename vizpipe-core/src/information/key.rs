use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;

use vizpipe_types::log::error;

use super::value::{KeyValue, ValueKind};
use super::Information;
use crate::collector::GarbageCollector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identity of a key. Two keys are the same key only if name and location match.
pub struct KeyId {
    pub location: &'static str,
    pub name: &'static str,
}

impl KeyId {
    pub const fn new(name: &'static str, location: &'static str) -> Self {
        Self { location, name }
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.location, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a registry knows about a key: enough to parse and print its values.
pub struct KeyDescriptor {
    pub id: KeyId,
    pub kind: ValueKind,
    pub required_class: Option<&'static str>,
}

/// A typed key. Keys are compile-time constants and are compared by [`KeyId`].
pub struct InformationKey<T> {
    id: KeyId,
    required_class: Option<&'static str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for InformationKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InformationKey<T> {}

impl<T> Debug for InformationKey<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "InformationKey({})", self.id)
    }
}

impl<T: KeyValue> InformationKey<T> {
    pub const fn new(name: &'static str, location: &'static str) -> Self {
        Self {
            id: KeyId::new(name, location),
            required_class: None,
            _marker: PhantomData,
        }
    }

    /// A data object key that only accepts instances of `class`.
    pub const fn with_required_class(
        name: &'static str,
        location: &'static str,
        class: &'static str,
    ) -> Self {
        Self {
            id: KeyId::new(name, location),
            required_class: Some(class),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name
    }

    pub fn location(&self) -> &'static str {
        self.id.location
    }

    pub fn descriptor(&self) -> KeyDescriptor {
        KeyDescriptor {
            id: self.id,
            kind: T::KIND,
            required_class: self.required_class,
        }
    }

    /// Stores `value`, replacing any previous value.
    ///
    /// A value rejected by the key's required class is not stored, and the key is removed.
    pub fn set(&self, info: &mut Information, value: T) {
        if let Err(reason) = value.check(self.required_class) {
            error!("Cannot set {}: {}. Removing the key.", self.id, reason);
            info.remove_entry(&self.id);
            return;
        }
        info.insert_entry(self.id, value.into_value());
    }

    pub fn get(&self, info: &Information) -> Option<T> {
        info.entry(&self.id).and_then(T::from_value)
    }

    pub fn has(&self, info: &Information) -> bool {
        info.entry(&self.id).is_some_and(|v| v.kind() == T::KIND)
    }

    pub fn remove(&self, info: &mut Information) {
        info.remove_entry(&self.id);
    }

    /// Makes `to` hold the same value as `from`, or nothing if `from` has none.
    pub fn shallow_copy(&self, from: &Information, to: &mut Information) {
        match from.entry(&self.id) {
            Some(value) if value.kind() == T::KIND => to.insert_entry(self.id, value.clone()),
            _ => to.remove_entry(&self.id),
        }
    }

    /// Like [`shallow_copy`](Self::shallow_copy) but nested information is duplicated.
    pub fn deep_copy(&self, from: &Information, to: &mut Information) {
        match from.entry(&self.id) {
            Some(value) if value.kind() == T::KIND => to.insert_entry(self.id, value.deep_copy()),
            _ => to.remove_entry(&self.id),
        }
    }

    pub fn report(&self, info: &Information, collector: &mut GarbageCollector) {
        if let Some(value) = info.entry(&self.id) {
            value.report(collector);
        }
    }
}

impl InformationKey<Vec<String>> {
    pub fn append(&self, info: &mut Information, value: impl Into<String>) {
        let mut values = self.get(info).unwrap_or_default();
        values.push(value.into());
        self.set(info, values);
    }

    pub fn length(&self, info: &Information) -> usize {
        self.get(info).map_or(0, |v| v.len())
    }
}

impl InformationKey<Vec<f64>> {
    pub fn append(&self, info: &mut Information, value: f64) {
        let mut values = self.get(info).unwrap_or_default();
        values.push(value);
        self.set(info, values);
    }

    pub fn length(&self, info: &Information) -> usize {
        self.get(info).map_or(0, |v| v.len())
    }
}
