use vizpipe_types::{MTime, TimeStamp};

use super::composite::CompositeDataSet;
use super::{DataObjectHandle, WeakDataObjectHandle};

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    input: Option<WeakDataObjectHandle>,
    output: Option<DataObjectHandle>,
}

impl CacheEntry {
    fn same_as(&self, other: &CacheEntry) -> bool {
        let inputs = match (&self.input, &other.input) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        let outputs = match (&self.output, &other.output) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        inputs && outputs
    }

    fn holds_input(&self, input: &DataObjectHandle) -> bool {
        self.input.as_ref().is_some_and(|weak| weak.points_to(input))
    }
}

#[derive(Debug, Default)]
/// Remembers which output leaf an algorithm produced for which input leaf of a composite
/// input, by flat index.
///
/// Inputs are held weakly and outputs strongly. An entry is only reused while its output is
/// at least as new as its input.
pub struct DataObjectCache {
    entries: Vec<CacheEntry>,
    mtime: TimeStamp,
}

impl DataObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mtime(&self) -> MTime {
        self.mtime.get()
    }

    /// Rebuilds the cache for the leaves of `input`, keeping the outputs that are still
    /// valid. Returns whether the cache changed.
    pub fn update(&mut self, input: Option<&dyn CompositeDataSet>) -> bool {
        let Some(input) = input else {
            return self.clear();
        };
        let iterator = input.new_iterator();
        let leaves: Vec<_> = iterator
            .visited()
            .filter_map(|item| Some((item.flat_index, item.data.clone()?)))
            .collect();
        let Some(last) = leaves.iter().map(|(flat_index, _)| *flat_index).max() else {
            return self.clear();
        };

        let mut entries = vec![CacheEntry::default(); last + 1];
        let mut changed = entries.len() != self.entries.len();
        for (flat_index, leaf) in leaves {
            let output = self
                .find_object(&leaf, Some(flat_index))
                .filter(|output| output.mtime() >= leaf.mtime());
            entries[flat_index] = CacheEntry {
                input: Some(leaf.downgrade()),
                output,
            };
            if !changed && !self.entries[flat_index].same_as(&entries[flat_index]) {
                changed = true;
            }
        }
        self.entries = entries;
        if changed {
            self.mtime.modified();
        }
        changed
    }

    /// Records the output leaves produced for the leaves of `input`. Returns whether the cache
    /// changed.
    pub fn finalize(
        &mut self,
        input: Option<&dyn CompositeDataSet>,
        output: Option<&dyn CompositeDataSet>,
    ) -> bool {
        let (Some(input), Some(output)) = (input, output) else {
            return false;
        };
        let iterator = input.new_iterator();
        let was_empty = self.entries.is_empty();
        let mut changed = false;
        for item in iterator.visited() {
            let Some(leaf) = &item.data else {
                continue;
            };
            let flat_index = item.flat_index;
            if flat_index >= self.entries.len() {
                self.entries.resize(flat_index + 1, CacheEntry::default());
                changed = true;
            }
            let produced = output.data_set(flat_index);
            let entry = &mut self.entries[flat_index];
            if was_empty {
                *entry = CacheEntry {
                    input: Some(leaf.downgrade()),
                    output: produced,
                };
                changed = true;
            } else {
                let same_output = match (&entry.output, &produced) {
                    (Some(a), Some(b)) => a.ptr_eq(b),
                    (None, None) => true,
                    _ => false,
                };
                if !same_output {
                    entry.output = produced;
                    changed = true;
                }
            }
        }
        if changed {
            self.mtime.modified();
        }
        changed
    }

    pub fn contains(&self, input: &DataObjectHandle, hint: Option<usize>) -> bool {
        self.find_entry(input, hint).is_some()
    }

    /// The cached output for `input`. `hint` is the flat index to check first.
    pub fn find_object(
        &self,
        input: &DataObjectHandle,
        hint: Option<usize>,
    ) -> Option<DataObjectHandle> {
        self.find_entry(input, hint)
            .and_then(|entry| entry.output.clone())
    }

    /// Number of flat indices the cache covers.
    pub fn cache_size(&self) -> usize {
        self.entries.len()
    }

    /// Entries that cannot be reused: dropped or missing input, missing output, or an input
    /// newer than its output.
    pub fn number_of_invalid_items(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                match (
                    entry.input.as_ref().and_then(WeakDataObjectHandle::upgrade),
                    &entry.output,
                ) {
                    (Some(input), Some(output)) => input.mtime() > output.mtime(),
                    _ => true,
                }
            })
            .count()
    }

    /// Drops every entry and frees the storage.
    pub fn release(&mut self) {
        self.entries = Vec::new();
        self.mtime.modified();
    }

    /// Drops every entry. Returns whether there was anything to drop.
    pub fn clear(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.clear();
        self.mtime.modified();
        true
    }

    fn find_entry(&self, input: &DataObjectHandle, hint: Option<usize>) -> Option<&CacheEntry> {
        if let Some(entry) = hint.and_then(|hint| self.entries.get(hint)) {
            if entry.holds_input(input) {
                return Some(entry);
            }
        }
        self.entries.iter().find(|entry| entry.holds_input(input))
    }
}
