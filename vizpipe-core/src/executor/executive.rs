use vizpipe_types::node::NodeHandle;
use vizpipe_types::TimeStamp;

use crate::data_object::{DataObjectCache, DataObjectHandle};
use crate::errors::ExecutionError;
use crate::information::keys::DATA_OBJECT;
use crate::information::{Information, InformationVector};
use crate::node::{Algorithm, PortHandle};

#[derive(Debug)]
/// Pipeline state of one node: its port contracts, the information of its outputs and the
/// times of the passes it last completed.
pub struct Executive {
    /// Contracts filled by the algorithm, one per input port.
    pub(crate) input_port_information: Vec<Information>,
    /// Contracts filled by the algorithm, one per output port.
    pub(crate) output_port_information: Vec<Information>,
    /// Pipeline information of each output port, including its data object.
    pub(crate) output_information: InformationVector,
    pub(crate) data_object_time: TimeStamp,
    /// Last time an output data object was created or replaced.
    pub(crate) output_time: TimeStamp,
    pub(crate) information_time: TimeStamp,
    pub(crate) execute_time: TimeStamp,
    /// Outputs whose data was released since the last execution.
    pub(crate) released: Vec<bool>,
    /// Input port whose composite data is executed leaf by leaf.
    pub(crate) composite_port: Option<PortHandle>,
    pub(crate) output_caches: Vec<DataObjectCache>,
}

impl Executive {
    pub(crate) fn new(
        handle: &NodeHandle,
        algorithm: &dyn Algorithm,
    ) -> Result<Self, ExecutionError> {
        let port_information_error = |source| ExecutionError::PortInformation {
            node: handle.clone(),
            source,
        };

        let mut input_port_information = Vec::new();
        for port in 0..algorithm.number_of_input_ports() {
            let mut info = Information::new();
            algorithm
                .fill_input_port_information(port, &mut info)
                .map_err(port_information_error)?;
            input_port_information.push(info);
        }

        let outputs = algorithm.number_of_output_ports();
        let mut output_port_information = Vec::new();
        for port in 0..outputs {
            let mut info = Information::new();
            algorithm
                .fill_output_port_information(port, &mut info)
                .map_err(port_information_error)?;
            output_port_information.push(info);
        }

        Ok(Self {
            input_port_information,
            output_port_information,
            output_information: InformationVector::with_len(outputs),
            data_object_time: TimeStamp::new(),
            output_time: TimeStamp::new(),
            information_time: TimeStamp::new(),
            execute_time: TimeStamp::new(),
            released: vec![false; outputs],
            composite_port: None,
            output_caches: Vec::new(),
        })
    }

    pub fn number_of_output_ports(&self) -> usize {
        self.output_information.len()
    }

    pub fn input_port_information(&self, port: PortHandle) -> Option<&Information> {
        self.input_port_information.get(port)
    }

    pub fn output_port_information(&self, port: PortHandle) -> Option<&Information> {
        self.output_port_information.get(port)
    }

    pub fn output_information(&self, port: PortHandle) -> Option<&Information> {
        self.output_information.get(port)
    }

    pub fn output_data_object(&self, port: PortHandle) -> Option<DataObjectHandle> {
        self.output_information.data_object(port)
    }

    pub fn output_data_objects(&self) -> Vec<DataObjectHandle> {
        (0..self.number_of_output_ports())
            .filter_map(|port| self.output_data_object(port))
            .collect()
    }

    pub fn is_released(&self, port: PortHandle) -> bool {
        self.released.get(port).copied().unwrap_or(false)
    }

    /// Empties every output and forces the next update to execute.
    pub(crate) fn release_outputs(&mut self) {
        for port in 0..self.number_of_output_ports() {
            self.release_output(port);
        }
        self.execute_time.reset();
    }

    /// Empties output `port` and forces the next update to execute the node again.
    pub(crate) fn release_output(&mut self, port: PortHandle) {
        if let Some(data) = self.output_data_object(port) {
            data.write().initialize();
        }
        if let Some(released) = self.released.get_mut(port) {
            *released = true;
        }
    }

    /// Replaces the output of `port`, returning the previous one.
    pub(crate) fn replace_output(
        &mut self,
        port: PortHandle,
        data: Option<DataObjectHandle>,
    ) -> Option<DataObjectHandle> {
        let info = self.output_information.get_mut(port)?;
        let previous = DATA_OBJECT.get(info);
        match data {
            Some(data) => DATA_OBJECT.set(info, data),
            None => DATA_OBJECT.remove(info),
        }
        previous
    }
}
