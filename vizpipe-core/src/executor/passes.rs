use std::collections::{HashMap, HashSet};

use daggy::NodeIndex;
use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::log::{debug, trace};
use vizpipe_types::node::NodeHandle;

use super::{Aborted, DagExecutor, ExecutionContext};
use crate::collector::GarbageCollector;
use crate::data_object::{data_types, DataObjectHandle};
use crate::errors::ExecutionError;
use crate::information::keys::{
    BOUNDS, DATA_EXTENT, DATA_NUMBER_OF_GHOST_LEVELS, DATA_NUMBER_OF_PIECES, DATA_OBJECT,
    DATA_PIECE_NUMBER, DATA_TIME_STEP, DATA_TYPE_NAME, INPUT_IS_OPTIONAL,
    INPUT_REQUIRED_DATA_TYPE, RELEASE_DATA, TIME_RANGE, TIME_STEPS, UPDATE_EXTENT,
    UPDATE_EXTENT_INITIALIZED, UPDATE_NUMBER_OF_GHOST_LEVELS, UPDATE_NUMBER_OF_PIECES,
    UPDATE_PIECE_NUMBER, UPDATE_REQUEST_KEYS, UPDATE_TIME_STEP, WHOLE_EXTENT,
};
use crate::information::{Information, InformationKey, InformationVector, RequestKind};
use crate::node::PortHandle;
use crate::trivial_producer::TrivialProducer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Why the data pass executes a node.
pub(crate) enum ExecutionReason {
    NeverExecuted,
    AlgorithmModified,
    /// An output data object was created or replaced since the last execution.
    OutputReplaced,
    InputModified { port: PortHandle },
    OutputReleased,
    /// The request on an output is not satisfied by the data it holds.
    RequestChanged { port: PortHandle },
}

/// Update keys and the data keys recording what an output holds.
const PIECE_KEYS: [(InformationKey<i64>, InformationKey<i64>); 3] = [
    (UPDATE_PIECE_NUMBER, DATA_PIECE_NUMBER),
    (UPDATE_NUMBER_OF_PIECES, DATA_NUMBER_OF_PIECES),
    (UPDATE_NUMBER_OF_GHOST_LEVELS, DATA_NUMBER_OF_GHOST_LEVELS),
];

impl DagExecutor {
    /// `node_index` and every node it depends on, each after the nodes it depends on.
    pub(super) fn upstream_order(
        &self,
        node_index: NodeIndex,
    ) -> Result<Vec<NodeIndex>, ExecutionError> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(node_index, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                order.push(index);
                continue;
            }
            if !visited.insert(index) {
                continue;
            }
            stack.push((index, true));
            for (upstream, _) in self.dag.upstream(index)?.into_iter().flatten().rev() {
                if !visited.contains(&upstream) {
                    stack.push((upstream, false));
                }
            }
        }
        Ok(order)
    }

    pub(super) fn data_object_pass(&mut self, order: &[NodeIndex]) -> Result<(), ExecutionError> {
        for &node_index in order {
            if !self.needs_data_object(node_index)? {
                continue;
            }
            if let Err(error) = self.execute_data_object(node_index) {
                return Err(self.fail(node_index, error));
            }
        }
        Ok(())
    }

    pub(super) fn information_pass(&mut self, order: &[NodeIndex]) -> Result<(), ExecutionError> {
        for &node_index in order {
            if !self.needs_information(node_index)? {
                continue;
            }
            if let Err(error) = self.execute_information(node_index) {
                return Err(self.fail(node_index, error));
            }
        }
        Ok(())
    }

    /// Walks from the requested node upstream. `port` is the output the caller asked for.
    pub(super) fn update_extent_pass(
        &mut self,
        order: &[NodeIndex],
        port: Option<PortHandle>,
    ) -> Result<(), ExecutionError> {
        let mut requested = HashMap::new();
        if let (Some(&target), Some(port)) = (order.last(), port) {
            requested.insert(target, port);
        }
        for &node_index in order.iter().rev() {
            let port = requested.get(&node_index).copied();
            if let Err(error) = self.execute_update_extent(node_index, port, &mut requested) {
                return Err(self.fail(node_index, error));
            }
        }
        Ok(())
    }

    pub(super) fn data_pass(&mut self, order: &[NodeIndex]) -> Result<(), ExecutionError> {
        let mut releases = Vec::new();
        let result = self.execute_data_in_order(order, &mut releases);
        for (node_index, port) in releases {
            trace!(
                "Releasing output {} of {}",
                port,
                self.dag.node_at(node_index).handle
            );
            self.dag
                .node_at_mut(node_index)
                .executive
                .release_output(port);
        }
        result
    }

    /// The nodes of `order` the data pass executes.
    ///
    /// A node is stale when it has a reason of its own to execute or depends on a stale node.
    /// Walking from the requested node upstream, a node executes when it is stale, or when
    /// its output was released and a node executing downstream reads it.
    fn execution_plan(&self, order: &[NodeIndex]) -> Result<HashSet<NodeIndex>, ExecutionError> {
        let mut stale = HashSet::new();
        for &node_index in order {
            let upstream_stale = self
                .dag
                .upstream(node_index)?
                .iter()
                .flatten()
                .any(|(upstream, _)| stale.contains(upstream));
            let outdated = self
                .execution_reasons(node_index)?
                .iter()
                .any(|reason| *reason != ExecutionReason::OutputReleased);
            if upstream_stale || outdated {
                stale.insert(node_index);
            }
        }

        let mut demanded: HashSet<NodeIndex> = order.last().copied().into_iter().collect();
        let mut plan = HashSet::new();
        for &node_index in order.iter().rev() {
            if !demanded.contains(&node_index) {
                continue;
            }
            let executive = &self.dag.node_at(node_index).executive;
            let released =
                (0..executive.number_of_output_ports()).any(|port| executive.is_released(port));
            if stale.contains(&node_index) || released {
                plan.insert(node_index);
                for (upstream, _) in self.dag.upstream(node_index)?.into_iter().flatten() {
                    demanded.insert(upstream);
                }
            }
        }
        Ok(plan)
    }

    fn execute_data_in_order(
        &mut self,
        order: &[NodeIndex],
        releases: &mut Vec<(NodeIndex, PortHandle)>,
    ) -> Result<(), ExecutionError> {
        let plan = self.execution_plan(order)?;
        for &node_index in order {
            let handle = self.dag.node_at(node_index).handle.clone();
            if !plan.contains(&node_index) {
                trace!("{} is up to date", handle);
                continue;
            }
            if self.token.is_cancelled() {
                return Err(ExecutionError::Aborted(handle));
            }
            let reasons = self.execution_reasons(node_index)?;
            debug!("Executing {}: {:?}", handle, reasons);
            if let Err(error) = self.execute_data(node_index, &reasons) {
                return Err(self.fail(node_index, error));
            }
            for (upstream, port) in self.dag.upstream(node_index)?.into_iter().flatten() {
                if self.releases_output(upstream, port) {
                    releases.push((upstream, port));
                }
            }
        }
        Ok(())
    }

    /// Releases the outputs of a failed node and records the error.
    fn fail(&mut self, node_index: NodeIndex, error: ExecutionError) -> ExecutionError {
        let node = self.dag.node_at_mut(node_index);
        // The data of a trivial producer belongs to the caller.
        if (*node.algorithm).downcast_ref::<TrivialProducer>().is_none() {
            node.executive.release_outputs();
        }
        if !matches!(error, ExecutionError::Aborted(_)) {
            self.error_manager.report(&error);
        }
        error
    }

    /// Copies of the information of every upstream output, one vector per input port.
    pub(super) fn gather_inputs(
        &self,
        node_index: NodeIndex,
    ) -> Result<Vec<InformationVector>, ExecutionError> {
        let upstream = self.dag.upstream(node_index)?;
        Ok(upstream
            .iter()
            .map(|connections| {
                connections
                    .iter()
                    .map(|(upstream, port)| {
                        self.dag
                            .node_at(*upstream)
                            .executive
                            .output_information(*port)
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect())
    }

    /// Sends `kind` to the node with its own output information.
    pub(super) fn process(
        &mut self,
        node_index: NodeIndex,
        kind: RequestKind,
        inputs: &mut [InformationVector],
    ) -> Result<(), ExecutionError> {
        let node = self.dag.node_at_mut(node_index);
        let mut outputs = std::mem::take(&mut node.executive.output_information);
        let result = self.process_with_outputs(node_index, kind, inputs, &mut outputs);
        self.dag.node_at_mut(node_index).executive.output_information = outputs;
        result
    }

    pub(super) fn process_with_outputs(
        &mut self,
        node_index: NodeIndex,
        kind: RequestKind,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
    ) -> Result<(), ExecutionError> {
        let request = kind.new_request();
        let Self {
            dag,
            factory,
            token,
            ..
        } = self;
        let node = dag.node_at_mut(node_index);
        let handle = node.handle.clone();
        let ctx = ExecutionContext::new(factory, token, &handle);
        node.algorithm
            .process_request(kind, &request, inputs, outputs, &ctx)
            .map_err(|source| request_error(&handle, kind, source))
    }

    fn needs_data_object(&self, node_index: NodeIndex) -> Result<bool, ExecutionError> {
        let node = self.dag.node_at(node_index);
        let time = node.executive.data_object_time.get();
        if time == 0 || node.mtime() > time {
            return Ok(true);
        }
        if node.executive.output_data_objects().len() < node.executive.number_of_output_ports() {
            return Ok(true);
        }
        Ok(self
            .dag
            .upstream(node_index)?
            .iter()
            .flatten()
            .any(|(upstream, _)| self.dag.node_at(*upstream).executive.output_time.get() > time))
    }

    fn execute_data_object(&mut self, node_index: NodeIndex) -> Result<(), ExecutionError> {
        let mut inputs = self.gather_inputs(node_index)?;
        let composite_port = self.check_inputs(node_index, &inputs)?;
        let composite_input = composite_port.and_then(|port| inputs[port].data_object(0));

        let executive = &self.dag.node_at(node_index).executive;
        let previous: Vec<_> = (0..executive.number_of_output_ports())
            .map(|port| executive.output_data_object(port))
            .collect();

        self.process(node_index, RequestKind::DataObject, &mut inputs)?;

        let node = self.dag.node_at_mut(node_index);
        if let Some(input) = &composite_input {
            // Composite input run block by block produces a composite of the same kind.
            for port in 0..node.executive.number_of_output_ports() {
                let same_kind = node
                    .executive
                    .output_data_object(port)
                    .is_some_and(|output| output.class_name() == input.class_name());
                if !same_kind {
                    let instance = input.read().new_instance();
                    node.executive
                        .replace_output(port, Some(DataObjectHandle::from_box(instance)));
                }
            }
        }
        self.create_missing_outputs(node_index, composite_input.is_some())?;

        let collect_garbage = self.options.collect_garbage;
        let node = self.dag.node_at_mut(node_index);
        if node.executive.composite_port != composite_port {
            node.executive.composite_port = composite_port;
            node.executive.output_caches.clear();
        }
        let mut replaced = false;
        for (port, previous) in previous.into_iter().enumerate() {
            let current = node.executive.output_data_object(port);
            match (previous, current) {
                (Some(previous), Some(current)) if previous.ptr_eq(&current) => {}
                (previous, _) => {
                    replaced = true;
                    if let Some(previous) = previous {
                        debug!(
                            "{} replaced its {} output on port {}",
                            node.handle,
                            previous.class_name(),
                            port
                        );
                        if collect_garbage {
                            GarbageCollector::collect(previous);
                        }
                    }
                }
            }
        }
        if replaced {
            node.executive.output_time.modified();
        }
        node.executive.data_object_time.modified();
        Ok(())
    }

    /// Checks connections and data types of every input port. Returns the port whose
    /// composite input is executed block by block, if any.
    fn check_inputs(
        &self,
        node_index: NodeIndex,
        inputs: &[InformationVector],
    ) -> Result<Option<PortHandle>, ExecutionError> {
        let node = self.dag.node_at(node_index);
        let mut composite_port = None;
        for (port, port_info) in node.executive.input_port_information.iter().enumerate() {
            let connections = inputs.get(port).map_or(0, InformationVector::len);
            if connections == 0 {
                if INPUT_IS_OPTIONAL.get(port_info) == Some(true) {
                    continue;
                }
                return Err(ExecutionError::MissingInput {
                    node: node.handle.clone(),
                    port,
                });
            }
            let accepted = INPUT_REQUIRED_DATA_TYPE.get(port_info).unwrap_or_default();
            for connection in 0..connections {
                let data = inputs[port].data_object(connection).ok_or_else(|| {
                    ExecutionError::MissingInputData {
                        node: node.handle.clone(),
                        port,
                    }
                })?;
                if accepts(&accepted, &data) {
                    continue;
                }
                let block_wise = composite_port.map_or(true, |composite| composite == port)
                    && leaves_accepted(&accepted, &data);
                if !block_wise {
                    return Err(ExecutionError::InputTypeMismatch {
                        node: node.handle.clone(),
                        port,
                        expected: accepted,
                        actual: data.class_name().to_string(),
                    });
                }
                composite_port = Some(port);
            }
        }
        Ok(composite_port)
    }

    /// Instantiates the `DATA_TYPE_NAME` of every output the algorithm left empty or filled
    /// with an object of another type.
    fn create_missing_outputs(
        &mut self,
        node_index: NodeIndex,
        composite: bool,
    ) -> Result<(), ExecutionError> {
        let Self { dag, factory, .. } = self;
        let node = dag.node_at_mut(node_index);
        for port in 0..node.executive.number_of_output_ports() {
            let type_name = node
                .executive
                .output_port_information(port)
                .and_then(|info| DATA_TYPE_NAME.get(info))
                .unwrap_or_else(|| data_types::DATA_OBJECT.to_string());
            let valid = node
                .executive
                .output_data_object(port)
                .is_some_and(|output| composite || output.is_a(&type_name));
            if valid {
                continue;
            }
            let output = factory.create_handle(&type_name).map_err(|_| {
                ExecutionError::CannotInstantiate {
                    node: node.handle.clone(),
                    port,
                    type_name: type_name.clone(),
                }
            })?;
            node.executive.replace_output(port, Some(output));
        }
        Ok(())
    }

    fn needs_information(&self, node_index: NodeIndex) -> Result<bool, ExecutionError> {
        let node = self.dag.node_at(node_index);
        let time = node.executive.information_time.get();
        if time == 0 || node.mtime() > time || node.executive.data_object_time.get() > time {
            return Ok(true);
        }
        Ok(self
            .dag
            .upstream(node_index)?
            .iter()
            .flatten()
            .any(|(upstream, _)| {
                self.dag.node_at(*upstream).executive.information_time.get() > time
            }))
    }

    fn execute_information(&mut self, node_index: NodeIndex) -> Result<(), ExecutionError> {
        let mut inputs = self.gather_inputs(node_index)?;
        if let Some(first) = inputs.first().and_then(|connections| connections.get(0)) {
            let node = self.dag.node_at_mut(node_index);
            for info in node.executive.output_information.iter_mut() {
                WHOLE_EXTENT.shallow_copy(first, info);
                TIME_STEPS.shallow_copy(first, info);
                TIME_RANGE.shallow_copy(first, info);
                BOUNDS.shallow_copy(first, info);
            }
        }
        self.process(node_index, RequestKind::Information, &mut inputs)?;
        self.dag
            .node_at_mut(node_index)
            .executive
            .information_time
            .modified();
        Ok(())
    }

    fn execute_update_extent(
        &mut self,
        node_index: NodeIndex,
        port: Option<PortHandle>,
        requested: &mut HashMap<NodeIndex, PortHandle>,
    ) -> Result<(), ExecutionError> {
        let node = self.dag.node_at_mut(node_index);
        for (output_port, info) in node.executive.output_information.iter_mut().enumerate() {
            complete_request(info);
            if let (Some(update), Some(whole)) = (UPDATE_EXTENT.get(info), WHOLE_EXTENT.get(info)) {
                if !whole.contains(&update) {
                    return Err(ExecutionError::UpdateExtentOutOfBounds {
                        node: node.handle.clone(),
                        port: output_port,
                        update,
                        whole,
                    });
                }
            }
        }
        let request = port
            .and_then(|port| node.executive.output_information(port))
            .cloned();

        let mut inputs = self.gather_inputs(node_index)?;
        if let Some(request) = &request {
            for input in inputs.iter_mut().flat_map(InformationVector::iter_mut) {
                forward_request(request, input);
            }
        }
        self.process(node_index, RequestKind::UpdateExtent, &mut inputs)?;

        let upstream = self.dag.upstream(node_index)?;
        for (connections, infos) in upstream.iter().zip(&inputs) {
            for ((upstream, upstream_port), input) in connections.iter().zip(infos.iter()) {
                requested.entry(*upstream).or_insert(*upstream_port);
                let executive = &mut self.dag.node_at_mut(*upstream).executive;
                if let Some(output) = executive.output_information.get_mut(*upstream_port) {
                    UPDATE_EXTENT.shallow_copy(input, output);
                    UPDATE_EXTENT_INITIALIZED.shallow_copy(input, output);
                    UPDATE_TIME_STEP.shallow_copy(input, output);
                    for key in UPDATE_REQUEST_KEYS {
                        key.shallow_copy(input, output);
                    }
                }
            }
        }
        Ok(())
    }

    pub(super) fn execution_reasons(
        &self,
        node_index: NodeIndex,
    ) -> Result<Vec<ExecutionReason>, ExecutionError> {
        let node = self.dag.node_at(node_index);
        let executive = &node.executive;
        let time = executive.execute_time.get();
        let mut reasons = Vec::new();
        if time == 0 {
            reasons.push(ExecutionReason::NeverExecuted);
        }
        if node.mtime() > time {
            reasons.push(ExecutionReason::AlgorithmModified);
        }
        if executive.output_time.get() > time {
            reasons.push(ExecutionReason::OutputReplaced);
        }
        for (port, connections) in self.dag.upstream(node_index)?.iter().enumerate() {
            // Releasing an input empties it but leaves this node's result valid.
            let modified = connections.iter().any(|(upstream, upstream_port)| {
                let upstream = &self.dag.node_at(*upstream).executive;
                !upstream.is_released(*upstream_port)
                    && upstream
                        .output_data_object(*upstream_port)
                        .is_some_and(|data| data.mtime() > time)
            });
            if modified {
                reasons.push(ExecutionReason::InputModified { port });
            }
        }
        if (0..executive.number_of_output_ports()).any(|port| executive.is_released(port)) {
            reasons.push(ExecutionReason::OutputReleased);
        }
        for (port, info) in executive.output_information.iter().enumerate() {
            if executive.is_released(port) {
                continue;
            }
            let changed = DATA_OBJECT
                .get(info)
                .map_or(true, |data| !request_satisfied(info, data.read().information()));
            if changed {
                reasons.push(ExecutionReason::RequestChanged { port });
            }
        }
        Ok(reasons)
    }

    fn execute_data(
        &mut self,
        node_index: NodeIndex,
        reasons: &[ExecutionReason],
    ) -> Result<(), ExecutionError> {
        match self.dag.node_at(node_index).executive.composite_port {
            Some(port) => self.execute_composite(node_index, port, reasons)?,
            None => {
                let mut inputs = self.gather_inputs(node_index)?;
                self.process(node_index, RequestKind::Data, &mut inputs)?;
            }
        }
        let node = self.dag.node_at_mut(node_index);
        // The caller's data changes only when the caller modifies it.
        let produced = (*node.algorithm).downcast_ref::<TrivialProducer>().is_none();
        let executive = &mut node.executive;
        for info in executive.output_information.iter() {
            if let Some(data) = DATA_OBJECT.get(info) {
                stamp_output(info, &data, produced);
            }
        }
        executive.released.fill(false);
        executive.execute_time.modified();
        Ok(())
    }

    /// Whether output `port` of `node_index` is released once a consumer executed.
    pub(super) fn releases_output(&self, node_index: NodeIndex, port: PortHandle) -> bool {
        let node = self.dag.node_at(node_index);
        if (*node.algorithm).downcast_ref::<TrivialProducer>().is_some() {
            return false;
        }
        self.options.release_data
            || node
                .executive
                .output_information(port)
                .and_then(|info| RELEASE_DATA.get(info))
                .unwrap_or(false)
    }
}

fn request_error(node: &NodeHandle, kind: RequestKind, source: BoxedError) -> ExecutionError {
    if source.is::<Aborted>() {
        return ExecutionError::Aborted(node.clone());
    }
    ExecutionError::RequestFailed {
        node: node.clone(),
        kind,
        source,
    }
}

fn accepts(accepted: &[String], data: &DataObjectHandle) -> bool {
    accepted.is_empty() || accepted.iter().any(|type_name| data.is_a(type_name))
}

/// Whether every leaf of the composite `data` is accepted on its own.
fn leaves_accepted(accepted: &[String], data: &DataObjectHandle) -> bool {
    let object = data.read();
    let Some(composite) = object.as_composite() else {
        return false;
    };
    let iterator = composite.new_iterator();
    let all_accepted = iterator
        .visited()
        .all(|item| item.data.as_ref().is_some_and(|leaf| accepts(accepted, leaf)));
    all_accepted
}

/// Fills in the parts of an output's request nobody set.
fn complete_request(info: &mut Information) {
    if UPDATE_EXTENT_INITIALIZED.get(info) != Some(true) {
        match WHOLE_EXTENT.get(info) {
            Some(whole) => UPDATE_EXTENT.set(info, whole),
            None => UPDATE_EXTENT.remove(info),
        }
    }
    if !UPDATE_PIECE_NUMBER.has(info) {
        UPDATE_PIECE_NUMBER.set(info, 0);
    }
    if !UPDATE_NUMBER_OF_PIECES.has(info) {
        UPDATE_NUMBER_OF_PIECES.set(info, 1);
    }
    if !UPDATE_NUMBER_OF_GHOST_LEVELS.has(info) {
        UPDATE_NUMBER_OF_GHOST_LEVELS.set(info, 0);
    }
}

/// Copies the request of an output to the copy of an upstream output feeding the node.
fn forward_request(request: &Information, input: &mut Information) {
    match (UPDATE_EXTENT.get(request), WHOLE_EXTENT.get(input)) {
        (Some(update), Some(whole)) => {
            UPDATE_EXTENT.set(input, update.intersection(&whole));
            UPDATE_EXTENT_INITIALIZED.set(input, true);
        }
        _ => {
            UPDATE_EXTENT.remove(input);
            UPDATE_EXTENT_INITIALIZED.remove(input);
        }
    }
    UPDATE_TIME_STEP.shallow_copy(request, input);
    for key in UPDATE_REQUEST_KEYS {
        key.shallow_copy(request, input);
    }
}

/// Whether the data described by `data_info` answers the request in `info`.
fn request_satisfied(info: &Information, data_info: &Information) -> bool {
    if let (Some(update), Some(data_extent)) = (UPDATE_EXTENT.get(info), DATA_EXTENT.get(data_info))
    {
        if !data_extent.contains(&update) {
            return false;
        }
    }
    if let Some(time) = UPDATE_TIME_STEP.get(info) {
        if DATA_TIME_STEP.get(data_info) != Some(time) {
            return false;
        }
    }
    PIECE_KEYS.iter().all(|(update_key, data_key)| {
        update_key
            .get(info)
            .map_or(true, |requested| data_key.get(data_info) == Some(requested))
    })
}

/// Records on `data` what it was produced for. Newly produced data is marked modified.
fn stamp_output(info: &Information, data: &DataObjectHandle, produced: bool) {
    let mut object = data.write();
    let extent = object.extent();
    let data_info = object.information_mut();
    match extent {
        Some(extent) => DATA_EXTENT.set(data_info, extent),
        None => DATA_EXTENT.remove(data_info),
    }
    match UPDATE_TIME_STEP.get(info) {
        Some(time) => DATA_TIME_STEP.set(data_info, time),
        None => DATA_TIME_STEP.remove(data_info),
    }
    for (update_key, data_key) in PIECE_KEYS {
        match update_key.get(info) {
            Some(value) => data_key.set(data_info, value),
            None => data_key.remove(data_info),
        }
    }
    if produced {
        object.modified();
    }
}
