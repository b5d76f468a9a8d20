use std::collections::HashMap;

use super::key::{KeyDescriptor, KeyId};
use super::keys::standard_key_descriptors;
use crate::errors::InformationError;

#[derive(Debug, Clone, Default)]
/// Lookup of keys by name, used to print and parse information objects.
///
/// Keys are plain constants, so a registry is only needed where a key has to be found from
/// its textual name.
pub struct KeyRegistry {
    keys: HashMap<(String, String), KeyDescriptor>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standard_keys() -> Self {
        let mut registry = Self::new();
        for descriptor in standard_key_descriptors() {
            // Standard keys are distinct by construction.
            let _ = registry.register(descriptor);
        }
        registry
    }

    /// Registers a key. Registering the same key twice is a no-op; registering a different
    /// key under an existing name is an error.
    pub fn register(&mut self, descriptor: KeyDescriptor) -> Result<(), InformationError> {
        let lookup = (
            descriptor.id.location.to_string(),
            descriptor.id.name.to_string(),
        );
        match self.keys.get(&lookup) {
            Some(existing) if *existing != descriptor => Err(InformationError::KeyConflict {
                key: descriptor.id,
                registered: existing.kind,
                requested: descriptor.kind,
            }),
            Some(_) => Ok(()),
            None => {
                self.keys.insert(lookup, descriptor);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str, location: &str) -> Option<&KeyDescriptor> {
        self.keys.get(&(location.to_string(), name.to_string()))
    }

    /// Finds a key from its `location::name` form.
    pub fn lookup_qualified(&self, qualified: &str) -> Option<&KeyDescriptor> {
        let (location, name) = qualified.split_once("::")?;
        self.lookup(name, location)
    }

    pub fn contains(&self, id: &KeyId) -> bool {
        self.lookup(id.name, id.location).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
