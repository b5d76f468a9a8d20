//! Breaks reference cycles between data objects.
//!
//! Data objects are shared through reference-counted handles, so a composite that ends up
//! holding itself, directly or through other objects, is never freed. The collector walks
//! the references an object reports and, when a strongly connected group of objects is only
//! referenced from inside itself, clears the members' references so they can be dropped.

use std::collections::HashMap;

use daggy::petgraph::algo::tarjan_scc;
use daggy::petgraph::graph::{DiGraph, NodeIndex};
use vizpipe_types::log::debug;

use crate::data_object::{DataObjectHandle, ObjectId};

#[derive(Debug, Default)]
pub struct GarbageCollector {
    graph: DiGraph<DataObjectHandle, ()>,
    lookup: HashMap<ObjectId, NodeIndex>,
    pending: Vec<NodeIndex>,
    current: Option<NodeIndex>,
}

impl GarbageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reference from the object being traversed to `handle`.
    pub fn report(&mut self, handle: &DataObjectHandle) {
        let target = self.intern(handle);
        if let Some(current) = self.current {
            self.graph.add_edge(current, target, ());
        }
    }

    /// Drops `handle` and frees the cycle it belongs to if nothing outside that cycle still
    /// references it. Returns the number of objects whose references were cleared.
    pub fn collect(handle: DataObjectHandle) -> usize {
        let mut collector = GarbageCollector::new();
        let root = collector.intern(&handle);
        drop(handle);
        collector.traverse();
        collector.break_cycle(root)
    }

    fn intern(&mut self, handle: &DataObjectHandle) -> NodeIndex {
        if let Some(index) = self.lookup.get(&handle.id()) {
            return *index;
        }
        let index = self.graph.add_node(handle.clone());
        self.lookup.insert(handle.id(), index);
        self.pending.push(index);
        index
    }

    fn traverse(&mut self) {
        while let Some(index) = self.pending.pop() {
            self.current = Some(index);
            let handle = self.graph[index].clone();
            let Some(object) = handle.try_read() else {
                // Locked objects are in use and therefore reachable.
                continue;
            };
            object.report_references(self);
        }
        self.current = None;
    }

    fn break_cycle(&mut self, root: NodeIndex) -> usize {
        let Some(component) = tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&root))
        else {
            return 0;
        };
        let is_cycle = component.len() > 1 || self.graph.contains_edge(root, root);
        if !is_cycle {
            return 0;
        }

        for member in &component {
            let internal = self
                .graph
                .neighbors_directed(*member, daggy::petgraph::Direction::Incoming)
                .filter(|source| component.contains(source))
                .count();
            // One strong reference is held by the collector's own graph.
            let external = self.graph[*member]
                .strong_count()
                .saturating_sub(1 + internal);
            if external > 0 {
                return 0;
            }
        }

        for member in &component {
            self.graph[*member].write().remove_references();
        }
        debug!("Collected a cycle of {} data object(s)", component.len());
        component.len()
    }
}
