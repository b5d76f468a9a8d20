use std::slice::{Iter, IterMut};

use super::keys::DATA_OBJECT;
use super::Information;
use crate::collector::GarbageCollector;
use crate::data_object::DataObjectHandle;

#[derive(Debug, Clone, Default)]
/// An ordered list of information objects, one per connection or port.
pub struct InformationVector {
    items: Vec<Information>,
}

impl InformationVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vector holding `len` empty information objects.
    pub fn with_len(len: usize) -> Self {
        Self {
            items: (0..len).map(|_| Information::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn set_len(&mut self, len: usize) {
        self.items.resize_with(len, Information::new);
    }

    pub fn get(&self, index: usize) -> Option<&Information> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Information> {
        self.items.get_mut(index)
    }

    pub fn set(&mut self, index: usize, info: Information) {
        if index >= self.items.len() {
            self.set_len(index + 1);
        }
        self.items[index] = info;
    }

    pub fn append(&mut self, info: Information) {
        self.items.push(info);
    }

    pub fn remove(&mut self, index: usize) -> Option<Information> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn iter(&self) -> Iter<'_, Information> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, Information> {
        self.items.iter_mut()
    }

    /// The data object stored at `index`, if any.
    pub fn data_object(&self, index: usize) -> Option<DataObjectHandle> {
        self.get(index).and_then(|info| DATA_OBJECT.get(info))
    }

    pub fn deep_copy(&self) -> Self {
        Self {
            items: self.items.iter().map(Information::deep_copy).collect(),
        }
    }

    pub fn report(&self, collector: &mut GarbageCollector) {
        for info in &self.items {
            info.report(collector);
        }
    }
}

impl FromIterator<Information> for InformationVector {
    fn from_iter<I: IntoIterator<Item = Information>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InformationVector {
    type Item = &'a Information;
    type IntoIter = Iter<'a, Information>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
