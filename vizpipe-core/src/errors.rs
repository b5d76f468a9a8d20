use crate::information::{KeyId, RequestKind, ValueKind};
use crate::node::PortHandle;
use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::node::NodeHandle;
use vizpipe_types::thiserror;
use vizpipe_types::thiserror::Error;
use vizpipe_types::Extent;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Adding this edge would have created a cycle")]
    WouldCycle,
    #[error("Invalid node handle: {0}")]
    InvalidNodeHandle(NodeHandle),
    #[error("Duplicate node handle: {0}")]
    DuplicateNodeHandle(NodeHandle),
    #[error("Invalid port handle {port} on node {node}")]
    InvalidPortHandle { node: NodeHandle, port: PortHandle },
    #[error("Missing input for node {node} on port {port}")]
    MissingInput { node: NodeHandle, port: PortHandle },
    #[error("Duplicate input for node {node} on port {port}")]
    DuplicateInput { node: NodeHandle, port: PortHandle },
    #[error("Port {port} of node {node} is not connected to {from_node}:{from_port}")]
    NotConnected {
        node: NodeHandle,
        port: PortHandle,
        from_node: NodeHandle,
        from_port: PortHandle,
    },
    #[error("Input {port} of node {node} requires one of {expected:?} but received {actual}")]
    InputTypeMismatch {
        node: NodeHandle,
        port: PortHandle,
        expected: Vec<String>,
        actual: String,
    },
    #[error("Input {port} of node {node} has no data object")]
    MissingInputData { node: NodeHandle, port: PortHandle },
    #[error("Node {node} did not create an output for port {port} and its type {type_name} cannot be instantiated")]
    CannotInstantiate {
        node: NodeHandle,
        port: PortHandle,
        type_name: String,
    },
    #[error("Update extent {update} requested from port {port} of node {node} is outside the whole extent {whole}")]
    UpdateExtentOutOfBounds {
        node: NodeHandle,
        port: PortHandle,
        update: Extent,
        whole: Extent,
    },
    #[error("{kind} failed on node {node}: {source}")]
    RequestFailed {
        node: NodeHandle,
        kind: RequestKind,
        #[source]
        source: BoxedError,
    },
    #[error("Cannot fill port information of node {node}: {source}")]
    PortInformation {
        node: NodeHandle,
        #[source]
        source: BoxedError,
    },
    #[error("Execution aborted at node {0}")]
    Aborted(NodeHandle),
    #[error("Error threshold reached: {0}")]
    ErrorThresholdReached(u64),
    #[error(transparent)]
    DataObject(#[from] DataObjectError),
    #[error(transparent)]
    Information(#[from] InformationError),
}

impl<T> From<daggy::WouldCycle<T>> for ExecutionError {
    fn from(_: daggy::WouldCycle<T>) -> Self {
        ExecutionError::WouldCycle
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataObjectError {
    #[error("{child} cannot be stored as a block of {parent}")]
    InvalidBlock {
        parent: &'static str,
        child: &'static str,
    },
    #[error("Cannot add a block to {parent}: the block is locked for writing")]
    BlockLocked { parent: &'static str },
    #[error("Index {index} is out of range for {class}")]
    IndexOutOfRange { class: &'static str, index: usize },
    #[error("Cannot copy the structure of {from} into {into}")]
    IncompatibleStructure {
        from: &'static str,
        into: &'static str,
    },
    #[error("{0} is not a composite data set")]
    NotComposite(&'static str),
    #[error("Unknown data object type {0}")]
    UnknownType(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InformationError {
    #[error("Request {requested} cannot be set while {current} is set")]
    RequestConflict { current: KeyId, requested: KeyId },
    #[error("Unknown information key {0}")]
    UnknownKey(String),
    #[error("Key {key} is registered as {registered} and cannot be registered as {requested}")]
    KeyConflict {
        key: KeyId,
        registered: ValueKind,
        requested: ValueKind,
    },
    #[error("Invalid value for key {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
