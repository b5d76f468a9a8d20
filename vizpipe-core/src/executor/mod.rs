use vizpipe_types::log::debug;
use vizpipe_types::models::config::PipelineConfig;
use vizpipe_types::node::NodeHandle;
use vizpipe_types::tracing::{span, Level};
use vizpipe_types::Extent;

use crate::collector::GarbageCollector;
use crate::dag_impl::{Dag, RemovedNode};
use crate::data_object::{DataObjectFactory, DataObjectHandle};
use crate::error_manager::ErrorManager;
use crate::errors::ExecutionError;
use crate::information::keys::{
    UPDATE_EXTENT, UPDATE_EXTENT_INITIALIZED, UPDATE_NUMBER_OF_GHOST_LEVELS,
    UPDATE_NUMBER_OF_PIECES, UPDATE_PIECE_NUMBER, UPDATE_TIME_STEP, WHOLE_EXTENT,
};
use crate::information::Information;
use crate::node::PortHandle;

mod composite;
mod context;
mod executive;
mod passes;

pub use context::{Aborted, CancellationToken, ExecutionContext};
pub use executive::Executive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Reuse the per-block outputs of composite executions whose input block did not change.
    pub data_caching: bool,
    /// Release every output once its consumers have executed.
    pub release_data: bool,
    pub error_threshold: Option<u64>,
    /// Collect reference cycles among the output data objects the executive drops.
    pub collect_garbage: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for ExecutorOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            data_caching: config.data_caching,
            release_data: config.release_data,
            error_threshold: config.error_threshold,
            collect_garbage: config.collect_garbage,
        }
    }
}

/// Drives the demand-driven update of a [`Dag`].
///
/// Each update runs four passes over the nodes the requested node depends on: data object,
/// information, update extent and data. Nodes whose parameters, connections, inputs and
/// requests did not change since their last execution are not executed again.
#[derive(Debug)]
pub struct DagExecutor {
    dag: Dag,
    options: ExecutorOptions,
    factory: DataObjectFactory,
    error_manager: ErrorManager,
    token: CancellationToken,
}

impl DagExecutor {
    pub fn new(dag: Dag, options: ExecutorOptions) -> Self {
        let error_manager = ErrorManager::new(options.error_threshold);
        Self {
            dag,
            options,
            factory: DataObjectFactory::with_standard_types(),
            error_manager,
            token: CancellationToken::new(),
        }
    }

    /// Replaces the factory the executive creates output data objects with.
    pub fn with_factory(mut self, factory: DataObjectFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    pub fn dag_mut(&mut self) -> &mut Dag {
        &mut self.dag
    }

    pub fn into_dag(self) -> Dag {
        self.dag
    }

    pub fn factory(&self) -> &DataObjectFactory {
        &self.factory
    }

    /// A token that aborts the running update when cancelled. It stays cancelled until reset.
    pub fn abort_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn error_count(&self) -> u64 {
        self.error_manager.count()
    }

    pub fn reset_errors(&self) {
        self.error_manager.reset();
    }

    /// Brings the first output of `handle` up to date, or runs the node if it has no outputs.
    pub fn update(&mut self, handle: &NodeHandle) -> Result<(), ExecutionError> {
        let node_index = self.dag.node_index(handle)?;
        let port = (self.dag.node_at(node_index).executive.number_of_output_ports() > 0).then_some(0);
        self.run(node_index, port)
    }

    /// Brings output `port` of `handle` up to date.
    pub fn update_port(&mut self, handle: &NodeHandle, port: PortHandle) -> Result<(), ExecutionError> {
        let node_index = self.dag.node_index(handle)?;
        if port >= self.dag.node_at(node_index).executive.number_of_output_ports() {
            return Err(ExecutionError::InvalidPortHandle {
                node: handle.clone(),
                port,
            });
        }
        self.run(node_index, Some(port))
    }

    /// Requests the whole extent of output `port` and updates it.
    pub fn update_whole_extent(
        &mut self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<(), ExecutionError> {
        self.update_information(handle)?;
        let info = self.dag.output_information_mut(handle, port)?;
        match WHOLE_EXTENT.get(info) {
            Some(whole) => UPDATE_EXTENT.set(info, whole),
            None => UPDATE_EXTENT.remove(info),
        }
        UPDATE_EXTENT_INITIALIZED.set(info, true);
        self.update_port(handle, port)
    }

    /// Runs the data object and information passes only, so that `WHOLE_EXTENT` and
    /// `TIME_STEPS` of the outputs can be inspected before requesting data.
    pub fn update_information(&mut self, handle: &NodeHandle) -> Result<(), ExecutionError> {
        let node_index = self.dag.node_index(handle)?;
        self.error_manager.check()?;
        let order = self.upstream_order(node_index)?;
        self.data_object_pass(&order)?;
        self.information_pass(&order)
    }

    /// Restricts the next update of output `port` to `extent`.
    pub fn set_update_extent(
        &mut self,
        handle: &NodeHandle,
        port: PortHandle,
        extent: Extent,
    ) -> Result<(), ExecutionError> {
        let info = self.dag.output_information_mut(handle, port)?;
        UPDATE_EXTENT.set(info, extent);
        UPDATE_EXTENT_INITIALIZED.set(info, true);
        Ok(())
    }

    pub fn set_update_time_step(
        &mut self,
        handle: &NodeHandle,
        port: PortHandle,
        time: f64,
    ) -> Result<(), ExecutionError> {
        UPDATE_TIME_STEP.set(self.dag.output_information_mut(handle, port)?, time);
        Ok(())
    }

    /// Requests piece `piece` of `pieces` with `ghost_levels` layers of ghost cells.
    pub fn set_update_piece(
        &mut self,
        handle: &NodeHandle,
        port: PortHandle,
        piece: i64,
        pieces: i64,
        ghost_levels: i64,
    ) -> Result<(), ExecutionError> {
        let info = self.dag.output_information_mut(handle, port)?;
        UPDATE_PIECE_NUMBER.set(info, piece);
        UPDATE_NUMBER_OF_PIECES.set(info, pieces);
        UPDATE_NUMBER_OF_GHOST_LEVELS.set(info, ghost_levels);
        Ok(())
    }

    pub fn output_data_object(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<Option<DataObjectHandle>, ExecutionError> {
        self.dag.output_data_object(handle, port)
    }

    pub fn output_information(
        &self,
        handle: &NodeHandle,
        port: PortHandle,
    ) -> Result<&Information, ExecutionError> {
        self.dag.output_information(handle, port)
    }

    /// Removes an algorithm from the pipeline and collects the outputs nobody else holds.
    pub fn remove_algorithm(&mut self, handle: &NodeHandle) -> Result<RemovedNode, ExecutionError> {
        let removed = self.dag.remove_algorithm(handle)?;
        if self.options.collect_garbage {
            for output in &removed.outputs {
                GarbageCollector::collect(output.clone());
            }
        }
        Ok(removed)
    }

    fn run(
        &mut self,
        node_index: daggy::NodeIndex,
        port: Option<PortHandle>,
    ) -> Result<(), ExecutionError> {
        let handle = self.dag.node_at(node_index).handle.clone();
        let span = span!(Level::DEBUG, "update", node = %handle);
        let _enter = span.enter();

        self.error_manager.check()?;
        if self.token.is_cancelled() {
            return Err(ExecutionError::Aborted(handle));
        }

        let order = self.upstream_order(node_index)?;
        debug!("Updating {} through {} node(s)", handle, order.len());
        self.data_object_pass(&order)?;
        self.information_pass(&order)?;
        self.update_extent_pass(&order, port)?;
        self.data_pass(&order)
    }
}
