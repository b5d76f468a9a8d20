use super::iterator::AmrDataIterator;
use super::{CompositeDataSet, CompositeItem};
use crate::collector::GarbageCollector;
use crate::data_object::{data_types, DataObject, DataObjectBase, DataObjectHandle};
use crate::errors::DataObjectError;

#[derive(Debug, Clone, Default)]
struct AmrLevel {
    blocks: Vec<Option<DataObjectHandle>>,
    refinement_ratio: i32,
}

#[derive(Debug, Clone, Default)]
/// Refinement levels of image blocks. Level 0 is the coarsest.
///
/// Flat index `0` is the data set itself; blocks follow level by level from `1`.
pub struct OverlappingAmr {
    base: DataObjectBase,
    levels: Vec<AmrLevel>,
    origin: [f64; 3],
}

impl OverlappingAmr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the hierarchy to `blocks_per_level.len()` levels of empty blocks.
    pub fn initialize_levels(&mut self, blocks_per_level: &[usize]) {
        self.levels = blocks_per_level
            .iter()
            .map(|count| AmrLevel {
                blocks: vec![None; *count],
                refinement_ratio: 2,
            })
            .collect();
        self.modified();
    }

    pub fn number_of_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn number_of_blocks(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, |l| l.blocks.len())
    }

    pub fn total_number_of_blocks(&self) -> usize {
        self.levels.iter().map(|l| l.blocks.len()).sum()
    }

    pub fn refinement_ratio(&self, level: usize) -> Option<i32> {
        self.levels.get(level).map(|l| l.refinement_ratio)
    }

    pub fn set_refinement_ratio(&mut self, level: usize, ratio: i32) {
        if let Some(l) = self.levels.get_mut(level) {
            l.refinement_ratio = ratio;
            self.modified();
        }
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn set_origin(&mut self, origin: [f64; 3]) {
        self.origin = origin;
        self.modified();
    }

    pub fn data_set_at(&self, level: usize, index: usize) -> Option<DataObjectHandle> {
        self.levels.get(level)?.blocks.get(index)?.clone()
    }

    /// Stores an image block. Blocks of any other type are rejected.
    pub fn set_data_set_at(
        &mut self,
        level: usize,
        index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        if let Some(handle) = &data {
            let object = handle.try_read().ok_or(DataObjectError::BlockLocked {
                parent: data_types::OVERLAPPING_AMR,
            })?;
            if !object.is_a(data_types::IMAGE_DATA) {
                return Err(DataObjectError::InvalidBlock {
                    parent: data_types::OVERLAPPING_AMR,
                    child: object.class_name(),
                });
            }
        }
        let slot = self
            .levels
            .get_mut(level)
            .and_then(|l| l.blocks.get_mut(index))
            .ok_or(DataObjectError::IndexOutOfRange {
                class: data_types::OVERLAPPING_AMR,
                index,
            })?;
        *slot = data;
        self.modified();
        Ok(())
    }

    pub fn flat_index(&self, level: usize, index: usize) -> Option<usize> {
        if index >= self.number_of_blocks(level) {
            return None;
        }
        let before: usize = self.levels[..level].iter().map(|l| l.blocks.len()).sum();
        Some(1 + before + index)
    }

    pub fn level_and_index(&self, flat_index: usize) -> Option<(usize, usize)> {
        let mut remaining = flat_index.checked_sub(1)?;
        for (level, l) in self.levels.iter().enumerate() {
            if remaining < l.blocks.len() {
                return Some((level, remaining));
            }
            remaining -= l.blocks.len();
        }
        None
    }

    pub fn new_amr_iterator(&self) -> AmrDataIterator {
        let mut items = Vec::new();
        self.collect_items(0, 1, &mut items);
        AmrDataIterator::new(items)
    }
}

impl DataObject for OverlappingAmr {
    fn class_name(&self) -> &'static str {
        data_types::OVERLAPPING_AMR
    }

    fn type_lineage(&self) -> &'static [&'static str] {
        &[
            data_types::OVERLAPPING_AMR,
            data_types::UNIFORM_GRID_AMR,
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
            levels: self
                .levels
                .iter()
                .map(|l| AmrLevel {
                    blocks: l
                        .blocks
                        .iter()
                        .map(|b| b.as_ref().map(DataObjectHandle::deep_copy))
                        .collect(),
                    refinement_ratio: l.refinement_ratio,
                })
                .collect(),
            origin: self.origin,
        })
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(Self::new())
    }

    fn initialize(&mut self) {
        self.levels.clear();
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
        for handle in self.levels.iter().flat_map(|l| l.blocks.iter().flatten()) {
            collector.report(handle);
        }
    }

    fn remove_references(&mut self) {
        self.information_mut().remove_object_references();
        for level in &mut self.levels {
            level.blocks.iter_mut().for_each(|b| *b = None);
        }
    }
}

impl CompositeDataSet for OverlappingAmr {
    fn collect_items(
        &self,
        first_flat: usize,
        depth: usize,
        items: &mut Vec<CompositeItem>,
    ) -> usize {
        let mut next = first_flat + 1;
        for (level, l) in self.levels.iter().enumerate() {
            for (index, block) in l.blocks.iter().enumerate() {
                items.push(CompositeItem {
                    flat_index: next,
                    index,
                    level: Some(level),
                    depth,
                    is_leaf: true,
                    data: block.clone(),
                });
                next += 1;
            }
        }
        next
    }

    fn flat_size(&self) -> usize {
        1 + self.total_number_of_blocks()
    }

    fn data_set(&self, flat_index: usize) -> Option<DataObjectHandle> {
        let (level, index) = self.level_and_index(flat_index)?;
        self.data_set_at(level, index)
    }

    fn set_data_set(
        &mut self,
        flat_index: usize,
        data: Option<DataObjectHandle>,
    ) -> Result<(), DataObjectError> {
        let (level, index) =
            self.level_and_index(flat_index)
                .ok_or(DataObjectError::IndexOutOfRange {
                    class: data_types::OVERLAPPING_AMR,
                    index: flat_index,
                })?;
        self.set_data_set_at(level, index, data)
    }

    fn copy_structure(&mut self, source: &dyn DataObject) -> Result<(), DataObjectError> {
        let source = source.downcast_ref::<OverlappingAmr>().ok_or(
            DataObjectError::IncompatibleStructure {
                from: source.class_name(),
                into: data_types::OVERLAPPING_AMR,
            },
        )?;
        self.levels = source
            .levels
            .iter()
            .map(|l| AmrLevel {
                blocks: vec![None; l.blocks.len()],
                refinement_ratio: l.refinement_ratio,
            })
            .collect();
        self.origin = source.origin;
        self.modified();
        Ok(())
    }
}
