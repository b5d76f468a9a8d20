use super::tree::{BlockRule, DataObjectTree};
use super::{CompositeDataSet, CompositeItem};
use crate::collector::GarbageCollector;
use crate::data_object::{data_types, DataObject, DataObjectBase, DataObjectHandle};
use crate::errors::DataObjectError;
use crate::information::Information;

#[derive(Debug, Clone)]
/// A tree of blocks. Blocks are leaves, nested multi-blocks or partitioned data sets.
pub struct MultiBlockDataSet {
    base: DataObjectBase,
    tree: DataObjectTree,
}

impl Default for MultiBlockDataSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiBlockDataSet {
    pub fn new() -> Self {
        Self {
            base: DataObjectBase::new(),
            tree: DataObjectTree::new(data_types::MULTI_BLOCK_DATA_SET, BlockRule::MultiBlock),
        }
    }

    pub fn number_of_blocks(&self) -> usize {
        self.tree.len()
    }

    pub fn set_number_of_blocks(&mut self, count: usize) {
        self.tree.set_len(count);
        self.modified();
    }

    pub fn block(&self, index: usize) -> Option<DataObjectHandle> {
        self.tree.child(index)
    }

    /// Stores `block` at `index`, growing the block list if needed.
    pub fn set_block(
        &mut self,
        index: usize,
        block: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        self.tree.set_child(index, block)?;
        self.modified();
        Ok(())
    }

    /// Removes the block at `index`; later blocks move down by one.
    pub fn remove_block(&mut self, index: usize) -> Option<DataObjectHandle> {
        let removed = self.tree.remove_child(index);
        self.modified();
        removed
    }

    pub fn has_meta_data(&self, index: usize) -> bool {
        self.tree.has_meta_data(index)
    }

    pub fn meta_data(&self, index: usize) -> Option<&Information> {
        self.tree.meta_data(index)
    }

    pub fn meta_data_mut(&mut self, index: usize) -> Option<&mut Information> {
        self.tree.meta_data_mut(index)
    }
}

impl DataObject for MultiBlockDataSet {
    fn class_name(&self) -> &'static str {
        data_types::MULTI_BLOCK_DATA_SET
    }

    fn type_lineage(&self) -> &'static [&'static str] {
        &[
            data_types::MULTI_BLOCK_DATA_SET,
            data_types::DATA_OBJECT_TREE,
            data_types::COMPOSITE_DATA_SET,
            data_types::DATA_OBJECT,
        ]
    }

    fn base(&self) -> &DataObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DataObjectBase {
        &mut self.base
    }

    fn deep_copy(&self) -> Box<dyn DataObject> {
        Box::new(Self {
            base: self.base.deep_copied(),
            tree: self.tree.deep_copy(),
        })
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(Self::new())
    }

    fn initialize(&mut self) {
        self.tree.clear();
        self.base.information.clear();
        self.modified();
    }

    fn as_composite(&self) -> Option<&dyn CompositeDataSet> {
        Some(self)
    }

    fn as_composite_mut(&mut self) -> Option<&mut dyn CompositeDataSet> {
        Some(self)
    }

    fn report_references(&self, collector: &mut GarbageCollector) {
        self.information().report(collector);
        self.tree.report(collector);
    }

    fn remove_references(&mut self) {
        self.information_mut().remove_object_references();
        self.tree.remove_references();
    }
}

impl CompositeDataSet for MultiBlockDataSet {
    fn collect_items(
        &self,
        first_flat: usize,
        depth: usize,
        items: &mut Vec<CompositeItem>,
    ) -> usize {
        self.tree.collect_items(first_flat, depth, items)
    }

    fn flat_size(&self) -> usize {
        self.tree.flat_size()
    }

    fn data_set(&self, flat_index: usize) -> Option<DataObjectHandle> {
        self.tree.data_set(flat_index)
    }

    fn set_data_set(
        &mut self,
        flat_index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        self.tree.set_data_set(flat_index, data)
    }

    fn copy_structure(&mut self, source: &dyn DataObject) -> Result<(), DataObjectError> {
        let source = source.downcast_ref::<MultiBlockDataSet>().ok_or(
            DataObjectError::IncompatibleStructure {
                from: source.class_name(),
                into: data_types::MULTI_BLOCK_DATA_SET,
            },
        )?;
        self.tree.copy_structure_from(&source.tree)?;
        self.modified();
        Ok(())
    }
}
