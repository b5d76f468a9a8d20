//! Composite data sets: trees of blocks, partitions and AMR hierarchies.

mod amr;
mod iterator;
mod multi_block;
mod partitioned;
mod tree;

pub use amr::OverlappingAmr;
pub use iterator::{AmrDataIterator, CompositeDataIterator, CompositeItem, IteratorOptions};
pub use multi_block::MultiBlockDataSet;
pub use partitioned::{PartitionedDataSet, PartitionedDataSetCollection};

use super::{DataObject, DataObjectHandle};
use crate::errors::DataObjectError;

/// Common interface of data objects made of other data objects.
///
/// Every node of the structure has a flat index: the root is 0 and the rest are numbered in
/// pre-order.
pub trait CompositeDataSet {
    /// Appends the nodes below the root, numbered from `first_flat + 1`. Returns the flat
    /// index following the last appended node.
    fn collect_items(&self, first_flat: usize, depth: usize, items: &mut Vec<CompositeItem>)
        -> usize;

    /// Number of flat indices used by this data set, root included.
    fn flat_size(&self) -> usize;

    fn data_set(&self, flat_index: usize) -> Option<DataObjectHandle>;

    fn set_data_set(
        &mut self,
        flat_index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError>;

    /// Replaces the structure with an empty copy of `source`'s: same shape and metadata,
    /// nested composites recreated, no leaves.
    fn copy_structure(&mut self, source: &dyn DataObject) -> Result<(), DataObjectError>;

    fn new_iterator(&self) -> CompositeDataIterator {
        let mut items = Vec::new();
        self.collect_items(0, 1, &mut items);
        CompositeDataIterator::new(items)
    }

    /// Number of non-empty leaves.
    fn number_of_leaves(&self) -> usize {
        self.new_iterator().visited().count()
    }
}

/// Builds an empty copy of `source`'s structure if it is composite.
pub(crate) fn copy_composite_structure(
    source: &DataObjectHandle,
) -> Result<Option<DataObjectHandle>, DataObjectError> {
    let object = source.read();
    if !object.is_composite() {
        return Ok(None);
    }
    let mut instance = object.new_instance();
    let composite = instance
        .as_composite_mut()
        .ok_or(DataObjectError::NotComposite(object.class_name()))?;
    composite.copy_structure(&**object)?;
    Ok(Some(DataObjectHandle::from_box(instance)))
}
