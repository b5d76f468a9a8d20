use std::ops::{Deref, DerefMut};

use crate::data_object::DataObjectHandle;

#[derive(Debug, Clone)]
/// One node of a composite data set as seen when its iterator was created.
pub struct CompositeItem {
    /// Pre-order position in the whole structure. The root is 0.
    pub flat_index: usize,
    /// Position within the parent, or within the level for AMR.
    pub index: usize,
    /// Refinement level, only for AMR.
    pub level: Option<usize>,
    /// 1 for children of the root.
    pub depth: usize,
    /// False for nested composite data sets.
    pub is_leaf: bool,
    pub data: Option<DataObjectHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IteratorOptions {
    pub skip_empty_nodes: bool,
    pub visit_only_leaves: bool,
    pub traverse_sub_tree: bool,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            skip_empty_nodes: true,
            visit_only_leaves: true,
            traverse_sub_tree: true,
        }
    }
}

impl IteratorOptions {
    fn visits(&self, item: &CompositeItem) -> bool {
        if self.skip_empty_nodes && item.data.is_none() {
            return false;
        }
        if self.visit_only_leaves && !item.is_leaf {
            return false;
        }
        self.traverse_sub_tree || item.depth == 1
    }
}

#[derive(Debug, Clone)]
/// External cursor over a composite data set.
///
/// The structure is captured when the iterator is created, so later changes to the data set
/// are not observed. A new iterator is positioned before the first item; call
/// [`init_traversal`](Self::init_traversal) to move to it.
pub struct CompositeDataIterator {
    items: Vec<CompositeItem>,
    options: IteratorOptions,
    position: Option<usize>,
}

impl CompositeDataIterator {
    pub fn new(items: Vec<CompositeItem>) -> Self {
        Self {
            items,
            options: IteratorOptions::default(),
            position: None,
        }
    }

    pub fn options(&self) -> IteratorOptions {
        self.options
    }

    pub fn set_skip_empty_nodes(&mut self, skip: bool) {
        self.options.skip_empty_nodes = skip;
    }

    pub fn set_visit_only_leaves(&mut self, only_leaves: bool) {
        self.options.visit_only_leaves = only_leaves;
    }

    pub fn set_traverse_sub_tree(&mut self, traverse: bool) {
        self.options.traverse_sub_tree = traverse;
    }

    pub fn init_traversal(&mut self) {
        self.position = Some(self.next_visited(0));
    }

    /// Moves to the next visited item. On a fresh iterator this is the first item.
    pub fn go_to_next_item(&mut self) {
        let from = match self.position {
            Some(position) if position >= self.items.len() => return,
            Some(position) => position + 1,
            None => 0,
        };
        self.position = Some(self.next_visited(from));
    }

    pub fn is_done_with_traversal(&self) -> bool {
        match self.position {
            Some(position) => position >= self.items.len(),
            None => !self.items.iter().any(|item| self.options.visits(item)),
        }
    }

    pub fn current(&self) -> Option<&CompositeItem> {
        self.items.get(self.position?)
    }

    pub fn current_data_object(&self) -> Option<DataObjectHandle> {
        self.current().and_then(|item| item.data.clone())
    }

    pub fn current_flat_index(&self) -> Option<usize> {
        self.current().map(|item| item.flat_index)
    }

    /// Position of the current item within its parent.
    pub fn current_index(&self) -> Option<usize> {
        self.current().map(|item| item.index)
    }

    /// Every visited item in order, independent of the cursor.
    pub fn visited(&self) -> impl Iterator<Item = &CompositeItem> {
        let options = self.options;
        self.items.iter().filter(move |item| options.visits(item))
    }

    fn next_visited(&self, from: usize) -> usize {
        (from..self.items.len())
            .find(|position| self.options.visits(&self.items[*position]))
            .unwrap_or(self.items.len())
    }
}

#[derive(Debug, Clone)]
/// Iterator over an AMR data set, visiting level by level.
pub struct AmrDataIterator {
    inner: CompositeDataIterator,
}

impl AmrDataIterator {
    pub(crate) fn new(items: Vec<CompositeItem>) -> Self {
        Self {
            inner: CompositeDataIterator::new(items),
        }
    }

    pub fn current_level(&self) -> Option<usize> {
        self.inner.current().and_then(|item| item.level)
    }
}

impl Deref for AmrDataIterator {
    type Target = CompositeDataIterator;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AmrDataIterator {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
