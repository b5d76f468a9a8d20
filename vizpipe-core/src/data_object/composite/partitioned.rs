use super::tree::{BlockRule, DataObjectTree};
use super::{CompositeDataSet, CompositeItem};
use crate::collector::GarbageCollector;
use crate::data_object::{data_types, DataObject, DataObjectBase, DataObjectHandle};
use crate::errors::DataObjectError;
use crate::information::Information;

#[derive(Debug, Clone)]
/// Partitions of one logical data set. Partitions are never composite.
pub struct PartitionedDataSet {
    base: DataObjectBase,
    tree: DataObjectTree,
}

impl Default for PartitionedDataSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionedDataSet {
    pub fn new() -> Self {
        Self {
            base: DataObjectBase::new(),
            tree: DataObjectTree::new(data_types::PARTITIONED_DATA_SET, BlockRule::Partitioned),
        }
    }

    pub fn number_of_partitions(&self) -> usize {
        self.tree.len()
    }

    pub fn set_number_of_partitions(&mut self, count: usize) {
        self.tree.set_len(count);
        self.modified();
    }

    pub fn partition(&self, index: usize) -> Option<DataObjectHandle> {
        self.tree.child(index)
    }

    pub fn set_partition(
        &mut self,
        index: usize,
        partition: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        self.tree.set_child(index, partition)?;
        self.modified();
        Ok(())
    }

    /// Drops empty partitions, keeping the order of the others.
    pub fn remove_null_partitions(&mut self) {
        let mut index = 0;
        while index < self.tree.len() {
            if self.tree.child(index).is_none() {
                self.tree.remove_child(index);
            } else {
                index += 1;
            }
        }
        self.modified();
    }
}

#[derive(Debug, Clone)]
/// A collection of partitioned data sets.
pub struct PartitionedDataSetCollection {
    base: DataObjectBase,
    tree: DataObjectTree,
}

impl Default for PartitionedDataSetCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionedDataSetCollection {
    pub fn new() -> Self {
        Self {
            base: DataObjectBase::new(),
            tree: DataObjectTree::new(
                data_types::PARTITIONED_DATA_SET_COLLECTION,
                BlockRule::PartitionedCollection,
            ),
        }
    }

    pub fn number_of_partitioned_data_sets(&self) -> usize {
        self.tree.len()
    }

    pub fn set_number_of_partitioned_data_sets(&mut self, count: usize) {
        self.tree.set_len(count);
        self.modified();
    }

    pub fn partitioned_data_set(&self, index: usize) -> Option<DataObjectHandle> {
        self.tree.child(index)
    }

    pub fn set_partitioned_data_set(
        &mut self,
        index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        self.tree.set_child(index, data)?;
        self.modified();
        Ok(())
    }

    pub fn number_of_partitions(&self, index: usize) -> usize {
        self.tree
            .child(index)
            .and_then(|handle| {
                handle
                    .read_as::<PartitionedDataSet>()
                    .map(|pds| pds.number_of_partitions())
            })
            .unwrap_or(0)
    }

    /// Stores `partition` in partitioned data set `index`, creating that set if needed.
    pub fn set_partition(
        &mut self,
        index: usize,
        partition_index: usize,
        partition: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        let handle = match self.tree.child(index) {
            Some(handle) => handle,
            None => {
                let handle = DataObjectHandle::new(PartitionedDataSet::new());
                self.tree.set_child(index, Some(handle.clone()))?;
                handle
            }
        };
        let mut pds = handle
            .write_as::<PartitionedDataSet>()
            .ok_or(DataObjectError::InvalidBlock {
                parent: data_types::PARTITIONED_DATA_SET_COLLECTION,
                child: data_types::DATA_OBJECT,
            })?;
        pds.set_partition(partition_index, partition)?;
        drop(pds);
        self.modified();
        Ok(())
    }

    pub fn meta_data(&self, index: usize) -> Option<&Information> {
        self.tree.meta_data(index)
    }

    pub fn meta_data_mut(&mut self, index: usize) -> Option<&mut Information> {
        self.tree.meta_data_mut(index)
    }
}

macro_rules! impl_tree_data_object {
    ($ty:ty, $class:expr, $lineage:expr) => {
        impl DataObject for $ty {
            fn class_name(&self) -> &'static str {
                $class
            }

            fn type_lineage(&self) -> &'static [&'static str] {
                $lineage
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

        impl CompositeDataSet for $ty {
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
                let source = source.downcast_ref::<$ty>().ok_or(
                    DataObjectError::IncompatibleStructure {
                        from: source.class_name(),
                        into: $class,
                    },
                )?;
                self.tree.copy_structure_from(&source.tree)?;
                self.modified();
                Ok(())
            }
        }
    };
}

impl_tree_data_object!(
    PartitionedDataSet,
    data_types::PARTITIONED_DATA_SET,
    &[
        data_types::PARTITIONED_DATA_SET,
        data_types::DATA_OBJECT_TREE,
        data_types::COMPOSITE_DATA_SET,
        data_types::DATA_OBJECT,
    ]
);

impl_tree_data_object!(
    PartitionedDataSetCollection,
    data_types::PARTITIONED_DATA_SET_COLLECTION,
    &[
        data_types::PARTITIONED_DATA_SET_COLLECTION,
        data_types::DATA_OBJECT_TREE,
        data_types::COMPOSITE_DATA_SET,
        data_types::DATA_OBJECT,
    ]
);
