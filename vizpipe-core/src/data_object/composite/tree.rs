use crate::collector::GarbageCollector;
use crate::data_object::{data_types, DataObject, DataObjectHandle};
use crate::errors::DataObjectError;
use crate::information::Information;

use super::{copy_composite_structure, CompositeItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which children a tree accepts.
pub(crate) enum BlockRule {
    /// Non-composite data, multi-blocks and partitioned data sets.
    MultiBlock,
    /// Non-composite data only.
    Partitioned,
    /// Partitioned data sets only.
    PartitionedCollection,
}

impl BlockRule {
    fn accepts(&self, child: &dyn DataObject) -> bool {
        match self {
            BlockRule::MultiBlock => {
                !child.is_composite()
                    || child.is_a(data_types::MULTI_BLOCK_DATA_SET)
                    || child.is_a(data_types::PARTITIONED_DATA_SET)
            }
            BlockRule::Partitioned => !child.is_composite(),
            BlockRule::PartitionedCollection => child.is_a(data_types::PARTITIONED_DATA_SET),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TreeChild {
    data: Option<DataObjectHandle>,
    meta_data: Option<Information>,
}

#[derive(Debug, Clone)]
/// Ordered children shared by the tree-shaped composite types.
pub(crate) struct DataObjectTree {
    owner: &'static str,
    rule: BlockRule,
    children: Vec<TreeChild>,
}

impl DataObjectTree {
    pub fn new(owner: &'static str, rule: BlockRule) -> Self {
        Self {
            owner,
            rule,
            children: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn set_len(&mut self, len: usize) {
        self.children.resize_with(len, TreeChild::default);
    }

    pub fn child(&self, index: usize) -> Option<DataObjectHandle> {
        self.children.get(index).and_then(|c| c.data.clone())
    }

    /// Stores `data` at `index`, growing the tree if needed.
    pub fn set_child(
        &mut self,
        index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        if let Some(handle) = &data {
            // A write-locked child is being mutated by the caller, most likely this very tree.
            let child = handle.try_read().ok_or(DataObjectError::BlockLocked {
                parent: self.owner,
            })?;
            if !self.rule.accepts(&**child) {
                return Err(DataObjectError::InvalidBlock {
                    parent: self.owner,
                    child: child.class_name(),
                });
            }
        }
        if index >= self.children.len() {
            self.set_len(index + 1);
        }
        self.children[index].data = data;
        Ok(())
    }

    pub fn remove_child(&mut self, index: usize) -> Option<DataObjectHandle> {
        if index < self.children.len() {
            self.children.remove(index).data
        } else {
            None
        }
    }

    pub fn has_meta_data(&self, index: usize) -> bool {
        self.children
            .get(index)
            .is_some_and(|c| c.meta_data.is_some())
    }

    pub fn meta_data(&self, index: usize) -> Option<&Information> {
        self.children.get(index)?.meta_data.as_ref()
    }

    /// Metadata of child `index`, created on first access.
    pub fn meta_data_mut(&mut self, index: usize) -> Option<&mut Information> {
        Some(
            self.children
                .get_mut(index)?
                .meta_data
                .get_or_insert_with(Information::new),
        )
    }

    pub fn collect_items(
        &self,
        first_flat: usize,
        depth: usize,
        items: &mut Vec<CompositeItem>,
    ) -> usize {
        let mut next = first_flat + 1;
        for (index, child) in self.children.iter().enumerate() {
            let flat_index = next;
            let nested = child.data.as_ref().filter(|handle| handle.is_composite());
            items.push(CompositeItem {
                flat_index,
                index,
                level: None,
                depth,
                is_leaf: nested.is_none(),
                data: child.data.clone(),
            });
            next = match nested.and_then(|handle| {
                let object = handle.read();
                object
                    .as_composite()
                    .map(|composite| composite.collect_items(flat_index, depth + 1, items))
            }) {
                Some(after_subtree) => after_subtree,
                None => flat_index + 1,
            };
        }
        next
    }

    pub fn flat_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Self::child_flat_size)
            .sum::<usize>()
    }

    pub fn data_set(&self, flat_index: usize) -> Option<DataObjectHandle> {
        if flat_index == 0 {
            return None;
        }
        let mut next = 1;
        for child in &self.children {
            if flat_index == next {
                return child.data.clone();
            }
            let size = Self::child_flat_size(child);
            if flat_index < next + size {
                let handle = child.data.as_ref()?;
                let object = handle.read();
                return object.as_composite()?.data_set(flat_index - next);
            }
            next += size;
        }
        None
    }

    pub fn set_data_set(
        &mut self,
        flat_index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        let owner = self.owner;
        let out_of_range = move || DataObjectError::IndexOutOfRange {
            class: owner,
            index: flat_index,
        };
        if flat_index == 0 {
            return Err(out_of_range());
        }
        let mut next = 1;
        for index in 0..self.children.len() {
            if flat_index == next {
                return self.set_child(index, data);
            }
            let size = Self::child_flat_size(&self.children[index]);
            if flat_index < next + size {
                let handle = self.children[index].data.clone().ok_or_else(out_of_range)?;
                let mut object = handle.write();
                let class = object.class_name();
                let composite = object
                    .as_composite_mut()
                    .ok_or(DataObjectError::NotComposite(class))?;
                return composite.set_data_set(flat_index - next, data);
            }
            next += size;
        }
        Err(out_of_range())
    }

    pub fn copy_structure_from(&mut self, source: &DataObjectTree) -> Result<(), DataObjectError> {
        let mut children = Vec::with_capacity(source.children.len());
        for child in &source.children {
            let data = match &child.data {
                Some(handle) => copy_composite_structure(handle)?,
                None => None,
            };
            children.push(TreeChild {
                data,
                meta_data: child.meta_data.clone(),
            });
        }
        self.children = children;
        Ok(())
    }

    pub fn deep_copy(&self) -> Self {
        Self {
            owner: self.owner,
            rule: self.rule,
            children: self
                .children
                .iter()
                .map(|child| TreeChild {
                    data: child.data.as_ref().map(DataObjectHandle::deep_copy),
                    meta_data: child.meta_data.as_ref().map(Information::deep_copy),
                })
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn report(&self, collector: &mut GarbageCollector) {
        for child in &self.children {
            if let Some(handle) = &child.data {
                collector.report(handle);
            }
            if let Some(meta_data) = &child.meta_data {
                meta_data.report(collector);
            }
        }
    }

    pub fn remove_references(&mut self) {
        for child in &mut self.children {
            child.data = None;
            if let Some(meta_data) = &mut child.meta_data {
                meta_data.remove_object_references();
            }
        }
    }

    fn child_flat_size(child: &TreeChild) -> usize {
        match &child.data {
            Some(handle) => handle
                .read()
                .as_composite()
                .map_or(1, |composite| composite.flat_size()),
            None => 1,
        }
    }
}
