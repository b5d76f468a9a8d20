use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::{MTime, TimeStamp};

use crate::data_object::{data_types, DataObjectHandle};
use crate::executor::ExecutionContext;
use crate::information::keys::{DATA_OBJECT, DATA_TYPE_NAME, WHOLE_EXTENT};
use crate::information::{Information, InformationVector};
use crate::node::{Algorithm, PortHandle};

#[derive(Debug)]
/// Source that publishes a data object owned by the caller. Created by
/// [`Dag::set_input_data_object`](crate::Dag::set_input_data_object).
pub struct TrivialProducer {
    output: DataObjectHandle,
    mtime: TimeStamp,
}

impl TrivialProducer {
    pub fn new(output: DataObjectHandle) -> Self {
        Self {
            output,
            mtime: TimeStamp::now(),
        }
    }

    pub fn output(&self) -> &DataObjectHandle {
        &self.output
    }

    pub fn set_output(&mut self, output: DataObjectHandle) {
        if self.output.ptr_eq(&output) {
            return;
        }
        self.output = output;
        self.mtime.modified();
    }
}

impl Algorithm for TrivialProducer {
    fn type_name(&self) -> String {
        "TrivialProducer".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        0
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    fn mtime(&self) -> MTime {
        // Editing the published object in place changes its extent and time steps.
        self.mtime.get().max(self.output.mtime())
    }

    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        // The output may be replaced by an object of any type.
        DATA_TYPE_NAME.set(info, data_types::DATA_OBJECT.to_string());
        Ok(())
    }

    fn request_data_object(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        let info = outputs.get_mut(0).ok_or("missing output information")?;
        if !DATA_OBJECT.get(info).is_some_and(|current| current.ptr_eq(&self.output)) {
            DATA_OBJECT.set(info, self.output.clone());
        }
        Ok(())
    }

    fn request_information(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        let info = outputs.get_mut(0).ok_or("missing output information")?;
        match self.output.read().extent() {
            Some(extent) => WHOLE_EXTENT.set(info, extent),
            None => WHOLE_EXTENT.remove(info),
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        _outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        Ok(())
    }
}
