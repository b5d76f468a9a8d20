use daggy::NodeIndex;
use vizpipe_types::log::trace;

use super::passes::ExecutionReason;
use super::DagExecutor;
use crate::data_object::{data_types, DataObjectCache, DataObjectHandle};
use crate::errors::{DataObjectError, ExecutionError};
use crate::information::keys::{DATA_OBJECT, DATA_TYPE_NAME, UPDATE_EXTENT, WHOLE_EXTENT};
use crate::information::{InformationVector, RequestKind};
use crate::node::PortHandle;

impl DagExecutor {
    /// Runs the algorithm once per leaf of the composite input on `port` and assembles the
    /// results into composite outputs of the same structure.
    ///
    /// Leaves whose input did not change are taken from the output caches when the only
    /// reason to execute is a modified composite input.
    pub(super) fn execute_composite(
        &mut self,
        node_index: NodeIndex,
        port: PortHandle,
        reasons: &[ExecutionReason],
    ) -> Result<(), ExecutionError> {
        let handle = self.dag.node_at(node_index).handle.clone();
        let inputs = self.gather_inputs(node_index)?;
        let input = inputs
            .get(port)
            .and_then(|connections| connections.data_object(0))
            .ok_or_else(|| ExecutionError::MissingInputData {
                node: handle.clone(),
                port,
            })?;

        let released_input = self.dag.upstream(node_index)?[port]
            .iter()
            .any(|(upstream, upstream_port)| self.releases_output(*upstream, *upstream_port));
        let reuse = self.options.data_caching
            && !released_input
            && reasons
                .iter()
                .all(|reason| *reason == ExecutionReason::InputModified { port });

        let leaves: Vec<(usize, DataObjectHandle)> = {
            let object = input.read();
            let composite = object
                .as_composite()
                .ok_or(DataObjectError::NotComposite(object.class_name()))?;
            let iterator = composite.new_iterator();
            let leaves = iterator
                .visited()
                .filter_map(|item| Some((item.flat_index, item.data.clone()?)))
                .collect();
            leaves
        };

        let outputs = self.dag.node_at(node_index).executive.output_data_objects();
        for output in &outputs {
            let source = input.read();
            let mut target = output.write();
            let class_name = target.class_name();
            target
                .as_composite_mut()
                .ok_or(DataObjectError::NotComposite(class_name))?
                .copy_structure(&**source)?;
        }

        let executive = &mut self.dag.node_at_mut(node_index).executive;
        executive
            .output_caches
            .resize_with(outputs.len(), DataObjectCache::new);
        {
            let source = input.read();
            for cache in executive.output_caches.iter_mut() {
                if !reuse {
                    cache.clear();
                }
                cache.update(source.as_composite());
            }
        }

        let mut executed = 0;
        for (flat_index, leaf) in &leaves {
            if self.token.is_cancelled() {
                return Err(ExecutionError::Aborted(handle));
            }
            let cached: Option<Vec<DataObjectHandle>> = if reuse {
                self.dag
                    .node_at(node_index)
                    .executive
                    .output_caches
                    .iter()
                    .map(|cache| cache.find_object(leaf, Some(*flat_index)))
                    .collect()
            } else {
                None
            };
            let produced = match cached {
                Some(produced) => {
                    trace!("{} reuses block {}", handle, flat_index);
                    produced
                }
                None => {
                    executed += 1;
                    self.execute_leaf(node_index, &inputs, port, leaf)?
                }
            };
            for (output, block) in outputs.iter().zip(produced) {
                let mut target = output.write();
                let class_name = target.class_name();
                target
                    .as_composite_mut()
                    .ok_or(DataObjectError::NotComposite(class_name))?
                    .set_data_set(*flat_index, Some(block))?;
            }
        }
        trace!(
            "{} executed {} of {} block(s)",
            handle,
            executed,
            leaves.len()
        );

        let executive = &mut self.dag.node_at_mut(node_index).executive;
        let source = input.read();
        for (cache, output) in executive.output_caches.iter_mut().zip(&outputs) {
            let target = output.read();
            cache.finalize(source.as_composite(), target.as_composite());
        }
        Ok(())
    }

    /// Executes the algorithm on one leaf. Returns one output block per output port.
    fn execute_leaf(
        &mut self,
        node_index: NodeIndex,
        inputs: &[InformationVector],
        port: PortHandle,
        leaf: &DataObjectHandle,
    ) -> Result<Vec<DataObjectHandle>, ExecutionError> {
        let mut leaf_inputs = inputs.to_vec();
        if let Some(info) = leaf_inputs.get_mut(port).and_then(|infos| infos.get_mut(0)) {
            DATA_OBJECT.set(info, leaf.clone());
            match leaf.read().extent() {
                Some(extent) => {
                    WHOLE_EXTENT.set(info, extent);
                    UPDATE_EXTENT.set(info, extent);
                }
                None => {
                    WHOLE_EXTENT.remove(info);
                    UPDATE_EXTENT.remove(info);
                }
            }
        }

        let node = self.dag.node_at(node_index);
        let mut outputs = node.executive.output_information.clone();
        for info in outputs.iter_mut() {
            DATA_OBJECT.remove(info);
        }
        self.process_with_outputs(node_index, RequestKind::DataObject, &mut leaf_inputs, &mut outputs)?;

        let node = self.dag.node_at(node_index);
        for (output_port, info) in outputs.iter_mut().enumerate() {
            if DATA_OBJECT.has(info) {
                continue;
            }
            let type_name = node
                .executive
                .output_port_information(output_port)
                .and_then(|port_info| DATA_TYPE_NAME.get(port_info))
                .unwrap_or_else(|| data_types::DATA_OBJECT.to_string());
            let block = self.factory.create_handle(&type_name).map_err(|_| {
                ExecutionError::CannotInstantiate {
                    node: node.handle.clone(),
                    port: output_port,
                    type_name: type_name.clone(),
                }
            })?;
            DATA_OBJECT.set(info, block);
        }

        self.process_with_outputs(node_index, RequestKind::Data, &mut leaf_inputs, &mut outputs)?;

        let mut blocks = Vec::with_capacity(outputs.len());
        for output_port in 0..outputs.len() {
            let block = outputs.data_object(output_port).ok_or_else(|| {
                ExecutionError::CannotInstantiate {
                    node: self.dag.node_at(node_index).handle.clone(),
                    port: output_port,
                    type_name: data_types::DATA_OBJECT.to_string(),
                }
            })?;
            block.modified();
            blocks.push(block);
        }
        Ok(blocks)
    }
}
