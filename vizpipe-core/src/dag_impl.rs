use daggy::petgraph::visit::EdgeRef;
use daggy::petgraph::Direction;
use vizpipe_types::log::debug;
use vizpipe_types::node::NodeHandle;
use vizpipe_types::{MTime, TimeStamp};

use crate::data_object::DataObjectHandle;
use crate::errors::ExecutionError;
use crate::executor::Executive;
use crate::information::keys::{DATA_OBJECT, INPUT_IS_REPEATABLE, RELEASE_DATA};
use crate::information::Information;
use crate::node::{Algorithm, PortHandle};
use crate::trivial_producer::TrivialProducer;
use std::collections::HashMap;
use std::fmt::{Debug, Display};

pub const DEFAULT_PORT_HANDLE: PortHandle = 0;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: NodeHandle,
    pub port: PortHandle,
}

impl Endpoint {
    pub fn new(node: NodeHandle, port: PortHandle) -> Self {
        Self { node, port }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: Endpoint,
    pub to: Endpoint,
}

impl Edge {
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self { from, to }
    }
}

#[derive(Debug)]
/// The node type of the pipeline graph.
pub struct NodeType {
    /// The node handle, unique across the DAG.
    pub handle: NodeHandle,
    pub algorithm: Box<dyn Algorithm>,
    pub(crate) executive: Executive,
    /// Upstream endpoints feeding each input port, in connection order.
    pub(crate) inputs: Vec<Vec<Endpoint>>,
    connections_mtime: TimeStamp,
}

impl NodeType {
    /// Latest change to the algorithm's parameters or to the node's connections.
    pub fn mtime(&self) -> MTime {
        self.algorithm.mtime().max(self.connections_mtime.get())
    }

    pub fn executive(&self) -> &Executive {
        &self.executive
    }

    pub fn input_connections(&self, port: PortHandle) -> &[Endpoint] {
        self.inputs.get(port).map_or(&[], Vec::as_slice)
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.handle.id)
    }
}

#[derive(Debug, Clone, Copy)]
/// The edge type of the pipeline graph.
pub struct EdgeType {
    pub from: PortHandle,
    pub to: PortHandle,
}

impl EdgeType {
    pub fn new(from: PortHandle, to: PortHandle) -> Self {
        Self { from, to }
    }
}

#[derive(Debug)]
/// What is left of a node after [`Dag::remove_algorithm`].
pub struct RemovedNode {
    pub algorithm: Box<dyn Algorithm>,
    /// The node's output data objects, no longer referenced by the pipeline.
    pub outputs: Vec<DataObjectHandle>,
}

#[derive(Debug)]
/// The pipeline graph. Owns every algorithm together with its executive state.
pub struct Dag {
    /// The underlying graph.
    graph: daggy::Dag<NodeType, EdgeType>,
    /// Map from node handle to node index.
    node_lookup_table: HashMap<NodeHandle, daggy::NodeIndex>,
}

impl Default for Dag {
    fn default() -> Self {
        Self::new()
    }
}

impl Dag {
    /// Creates an empty DAG.
    pub fn new() -> Self {
        Self {
            graph: daggy::Dag::new(),
            node_lookup_table: HashMap::new(),
        }
    }

    /// Returns the underlying daggy graph.
    pub fn graph(&self) -> &daggy::Dag<NodeType, EdgeType> {
        &self.graph
    }

    /// Adds an algorithm and fills its port information.
    pub fn add_algorithm(
        &mut self,
        handle: NodeHandle,
        algorithm: Box<dyn Algorithm>,
    ) -> Result<daggy::NodeIndex, ExecutionError> {
        if self.node_lookup_table.contains_key(&handle) {
            return Err(ExecutionError::DuplicateNodeHandle(handle));
        }
        let executive = Executive::new(&handle, algorithm.as_ref())?;
        let inputs = vec![Vec::new(); algorithm.number_of_input_ports()];
        let node_index = self.graph.add_node(NodeType {
            handle: handle.clone(),
            algorithm,
            executive,
            inputs,
            connections_mtime: TimeStamp::now(),
        });
        self.node_lookup_table.insert(handle, node_index);
        Ok(node_index)
    }

    /// Removes an algorithm and every connection to or from it. Consumers of its outputs lose
    /// those inputs. Trivial producers left without a consumer are removed too.
    pub fn remove_algorithm(&mut self, handle: &NodeHandle) -> Result<RemovedNode, ExecutionError> {
        let node_index = self.node_index(handle)?;
        let producers: Vec<NodeHandle> = self.graph[node_index]
            .inputs
            .iter()
            .flatten()
            .map(|endpoint| endpoint.node.clone())
            .collect();

        let consumers: Vec<daggy::NodeIndex> = self
            .graph
            .graph()
            .edges_directed(node_index, Direction::Outgoing)
            .map(|edge| edge.target())
            .collect();
        for consumer in consumers {
            let node = &mut self.graph[consumer];
            for connections in &mut node.inputs {
                connections.retain(|endpoint| endpoint.node != *handle);
            }
            node.connections_mtime.modified();
        }

        let node = self
            .graph
            .remove_node(node_index)
            .ok_or_else(|| ExecutionError::InvalidNodeHandle(handle.clone()))?;
        self.rebuild_lookup_table();
        debug!("Removed node {}", handle);

        for producer in producers {
            let orphan = self.algorithm_as::<TrivialProducer>(&producer).is_some()
                && self.consumers(&producer).is_empty();
            if orphan {
                self.remove_algorithm(&producer)?;
            }
        }

        let outputs = node.executive.output_data_objects();
        Ok(RemovedNode {
            algorithm: node.algorithm,
            outputs,
        })
    }

    /// Appends a connection from output `from` to input `to`.
    ///
    /// Returns an error if a port cannot be found, the input port already has a connection
    /// and is not repeatable, or the edge would create a cycle.
    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> Result<(), ExecutionError> {
        let from_node_index = validate_endpoint(self, &from, PortDirection::Output)?;
        let to_node_index = validate_endpoint(self, &to, PortDirection::Input)?;

        let node = &self.graph[to_node_index];
        let connections = &node.inputs[to.port];
        let repeatable =
            INPUT_IS_REPEATABLE.get(&node.executive.input_port_information[to.port]) == Some(true);
        if connections.contains(&from) || (!connections.is_empty() && !repeatable) {
            return Err(ExecutionError::DuplicateInput {
                node: to.node,
                port: to.port,
            });
        }

        self.graph.add_edge(
            from_node_index,
            to_node_index,
            EdgeType::new(from.port, to.port),
        )?;
        let node = &mut self.graph[to_node_index];
        node.inputs[to.port].push(from);
        node.connections_mtime.modified();
        Ok(())
    }

    /// Makes `from` the only connection of input `to`.
    pub fn set_input_connection(&mut self, from: Endpoint, to: Endpoint) -> Result<(), ExecutionError> {
        let from_node_index = validate_endpoint(self, &from, PortDirection::Output)?;
        let to_node_index = validate_endpoint(self, &to, PortDirection::Input)?;
        if self.graph[to_node_index].inputs[to.port] == [from.clone()] {
            return Ok(());
        }
        if daggy::petgraph::algo::has_path_connecting(
            self.graph.graph(),
            to_node_index,
            from_node_index,
            None,
        ) {
            return Err(ExecutionError::WouldCycle);
        }
        self.remove_all_input_connections(&to)?;
        self.connect(from, to)
    }

    /// Removes one connection. Other connections of the port keep their order.
    pub fn remove_input_connection(
        &mut self,
        from: &Endpoint,
        to: &Endpoint,
    ) -> Result<(), ExecutionError> {
        let to_node_index = validate_endpoint(self, to, PortDirection::Input)?;
        let position = self.graph[to_node_index].inputs[to.port]
            .iter()
            .position(|endpoint| endpoint == from)
            .ok_or_else(|| ExecutionError::NotConnected {
                node: to.node.clone(),
                port: to.port,
                from_node: from.node.clone(),
                from_port: from.port,
            })?;
        let from_node_index = self.node_index(&from.node)?;

        let node = &mut self.graph[to_node_index];
        node.inputs[to.port].remove(position);
        node.connections_mtime.modified();
        self.remove_edge(from_node_index, from.port, to_node_index, to.port);
        Ok(())
    }

    pub fn remove_all_input_connections(&mut self, to: &Endpoint) -> Result<(), ExecutionError> {
        let to_node_index = validate_endpoint(self, to, PortDirection::Input)?;
        let connections = std::mem::take(&mut self.graph[to_node_index].inputs[to.port]);
        if connections.is_empty() {
            return Ok(());
        }
        for from in connections {
            let from_node_index = self.node_index(&from.node)?;
            self.remove_edge(from_node_index, from.port, to_node_index, to.port);
        }
        self.graph[to_node_index].connections_mtime.modified();
        Ok(())
    }

    /// Feeds `data` to input `to` through a [`TrivialProducer`], replacing the port's
    /// connections. Returns the producer's handle.
    pub fn set_input_data_object(
        &mut self,
        to: &Endpoint,
        data: DataObjectHandle,
    ) -> Result<NodeHandle, ExecutionError> {
        validate_endpoint(self, to, PortDirection::Input)?;
        let producer = NodeHandle::new(to.node.ns, format!("{}#input{}", to.node.id, to.port));
        match self.algorithm_as_mut::<TrivialProducer>(&producer) {
            Some(trivial_producer) => trivial_producer.set_output(data),
            None => {
                self.add_algorithm(producer.clone(), Box::new(TrivialProducer::new(data)))?;
            }
        }
        self.set_input_connection(Endpoint::new(producer.clone(), DEFAULT_PORT_HANDLE), to.clone())?;
        Ok(producer)
    }

    /// Connection `index` of input `port`.
    pub fn input_connection(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
        index: usize,
    ) -> Option<&Endpoint> {
        self.node(handle).ok()?.inputs.get(port)?.get(index)
    }

    pub fn number_of_input_connections(&self, handle: &NodeHandle, port: PortHandle) -> usize {
        self.node(handle)
            .map_or(0, |node| node.input_connections(port).len())
    }

    /// Inputs fed by output `port` of `handle`.
    pub fn consumers_of(&self, handle: &NodeHandle, port: PortHandle) -> Vec<Endpoint> {
        let Ok(node_index) = self.node_index(handle) else {
            return Vec::new();
        };
        self.graph
            .graph()
            .edges_directed(node_index, Direction::Outgoing)
            .filter(|edge| edge.weight().from == port)
            .map(|edge| Endpoint::new(self.graph[edge.target()].handle.clone(), edge.weight().to))
            .collect()
    }

    /// Inputs fed by any output of `handle`.
    pub fn consumers(&self, handle: &NodeHandle) -> Vec<Endpoint> {
        let Ok(node_index) = self.node_index(handle) else {
            return Vec::new();
        };
        self.graph
            .graph()
            .edges_directed(node_index, Direction::Outgoing)
            .map(|edge| Endpoint::new(self.graph[edge.target()].handle.clone(), edge.weight().to))
            .collect()
    }

    /// Returns an iterator over all node handles.
    pub fn node_handles(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes().map(|node| &node.handle)
    }

    /// Returns an iterator over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeType> {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }

    /// Returns all edges.
    pub fn edge_handles(&self) -> Vec<Edge> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| {
                Edge::new(
                    Endpoint::new(self.graph[edge.source()].handle.clone(), edge.weight.from),
                    Endpoint::new(self.graph[edge.target()].handle.clone(), edge.weight.to),
                )
            })
            .collect()
    }

    pub fn node(&self, handle: &NodeHandle) -> Result<&NodeType, ExecutionError> {
        Ok(&self.graph[self.node_index(handle)?])
    }

    pub fn algorithm(&self, handle: &NodeHandle) -> Result<&dyn Algorithm, ExecutionError> {
        Ok(self.node(handle)?.algorithm.as_ref())
    }

    /// Mutable access to an algorithm, e.g. to change its parameters.
    pub fn algorithm_mut(
        &mut self,
        handle: &NodeHandle,
    ) -> Result<&mut dyn Algorithm, ExecutionError> {
        let node_index = self.node_index(handle)?;
        Ok(self.graph[node_index].algorithm.as_mut())
    }

    pub fn algorithm_as<T: Algorithm>(&self, handle: &NodeHandle) -> Option<&T> {
        let node_index = self.node_lookup_table.get(handle)?;
        (*self.graph[*node_index].algorithm).downcast_ref::<T>()
    }

    pub fn algorithm_as_mut<T: Algorithm>(&mut self, handle: &NodeHandle) -> Option<&mut T> {
        let node_index = *self.node_lookup_table.get(handle)?;
        (*self.graph[node_index].algorithm).downcast_mut::<T>()
    }

    /// Forces the node to re-execute on the next update.
    pub fn mark_modified(&mut self, handle: &NodeHandle) -> Result<(), ExecutionError> {
        let node_index = self.node_index(handle)?;
        self.graph[node_index].connections_mtime.modified();
        Ok(())
    }

    pub fn input_port_information(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<&Information, ExecutionError> {
        self.node(handle)?
            .executive
            .input_port_information(port)
            .ok_or_else(|| invalid_port(handle, port))
    }

    pub fn output_port_information(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<&Information, ExecutionError> {
        self.node(handle)?
            .executive
            .output_port_information(port)
            .ok_or_else(|| invalid_port(handle, port))
    }

    pub fn output_information(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<&Information, ExecutionError> {
        self.node(handle)?
            .executive
            .output_information(port)
            .ok_or_else(|| invalid_port(handle, port))
    }

    pub fn output_information_mut(
        &mut self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<&mut Information, ExecutionError> {
        let node_index = self.node_index(handle)?;
        self.graph[node_index]
            .executive
            .output_information
            .get_mut(port)
            .ok_or_else(|| invalid_port(handle, port))
    }

    pub fn output_data_object(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<Option<DataObjectHandle>, ExecutionError> {
        Ok(DATA_OBJECT.get(self.output_information(handle, port)?))
    }

    /// Releases the data of output `port` once all its consumers have executed.
    pub fn set_release_data_flag(
        &mut self,
        handle: &NodeHandle,
        port: PortHandle,
        release: bool,
    ) -> Result<(), ExecutionError> {
        RELEASE_DATA.set(self.output_information_mut(handle, port)?, release);
        Ok(())
    }

    pub(crate) fn node_index(&self, handle: &NodeHandle) -> Result<daggy::NodeIndex, ExecutionError> {
        self.node_lookup_table
            .get(handle)
            .copied()
            .ok_or_else(|| ExecutionError::InvalidNodeHandle(handle.clone()))
    }

    pub(crate) fn node_at(&self, node_index: daggy::NodeIndex) -> &NodeType {
        &self.graph[node_index]
    }

    pub(crate) fn node_at_mut(&mut self, node_index: daggy::NodeIndex) -> &mut NodeType {
        &mut self.graph[node_index]
    }

    /// Upstream node index and output port of every connection of `node_index`, by input port.
    pub(crate) fn upstream(
        &self,
        node_index: daggy::NodeIndex,
    ) -> Result<Vec<Vec<(daggy::NodeIndex, PortHandle)>>, ExecutionError> {
        self.graph[node_index]
            .inputs
            .iter()
            .map(|connections| {
                connections
                    .iter()
                    .map(|endpoint| Ok((self.node_index(&endpoint.node)?, endpoint.port)))
                    .collect()
            })
            .collect()
    }

    fn remove_edge(
        &mut self,
        from_node_index: daggy::NodeIndex,
        from_port: PortHandle,
        to_node_index: daggy::NodeIndex,
        to_port: PortHandle,
    ) {
        let edge = self
            .graph
            .graph()
            .edges_connecting(from_node_index, to_node_index)
            .find(|edge| edge.weight().from == from_port && edge.weight().to == to_port)
            .map(|edge| edge.id());
        if let Some(edge) = edge {
            self.graph.remove_edge(edge);
        }
    }

    fn rebuild_lookup_table(&mut self) {
        self.node_lookup_table = self
            .graph
            .graph()
            .node_indices()
            .map(|node_index| (self.graph[node_index].handle.clone(), node_index))
            .collect();
    }
}

fn invalid_port(handle: &NodeHandle, port: PortHandle) -> ExecutionError {
    ExecutionError::InvalidPortHandle {
        node: handle.clone(),
        port,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PortDirection {
    Input,
    Output,
}

fn validate_endpoint(
    dag: &Dag,
    endpoint: &Endpoint,
    direction: PortDirection,
) -> Result<daggy::NodeIndex, ExecutionError> {
    let node_index = dag.node_index(&endpoint.node)?;
    let algorithm = &dag.graph[node_index].algorithm;
    let ports = match direction {
        PortDirection::Input => algorithm.number_of_input_ports(),
        PortDirection::Output => algorithm.number_of_output_ports(),
    };
    if endpoint.port >= ports {
        return Err(invalid_port(&endpoint.node, endpoint.port));
    }
    Ok(node_index)
}
