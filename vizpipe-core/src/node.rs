use std::fmt::Debug;

use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::MTime;

use crate::as_any::AsAny;
use crate::data_object::{data_types, DataObjectHandle};
use crate::executor::ExecutionContext;
use crate::information::keys::{DATA_OBJECT, DATA_TYPE_NAME, INPUT_REQUIRED_DATA_TYPE};
use crate::information::{Information, InformationVector, RequestKind};

pub type PortHandle = usize;

/// A pipeline stage.
///
/// The executive owns the port information and drives the stage through
/// [`process_request`](Algorithm::process_request), once per request kind and update. Handlers
/// receive one information vector per input port (one entry per connection) and one
/// information vector with an entry per output port.
pub trait Algorithm: AsAny + Send + Sync + Debug {
    fn type_name(&self) -> String;

    fn number_of_input_ports(&self) -> usize;

    fn number_of_output_ports(&self) -> usize;

    /// Modification time of the algorithm's parameters.
    fn mtime(&self) -> MTime;

    /// Declares the contract of an input port. Called once per port when the algorithm is
    /// added to a pipeline.
    fn fill_input_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        INPUT_REQUIRED_DATA_TYPE.append(info, data_types::DATA_OBJECT);
        Ok(())
    }

    /// Declares the contract of an output port, usually its `DATA_TYPE_NAME`.
    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        DATA_TYPE_NAME.set(info, data_types::DATA_OBJECT.to_string());
        Ok(())
    }

    fn process_request(
        &mut self,
        kind: RequestKind,
        request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        match kind {
            RequestKind::DataObject => self.request_data_object(request, inputs, outputs, ctx),
            RequestKind::Information => self.request_information(request, inputs, outputs, ctx),
            RequestKind::UpdateExtent => {
                self.request_update_extent(request, inputs, outputs, ctx)
            }
            RequestKind::Data => self.request_data(request, inputs, outputs, ctx),
        }
    }

    /// Creates output data objects. Outputs left unset are created by the executive from
    /// `DATA_TYPE_NAME`.
    fn request_data_object(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        _outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        Ok(())
    }

    /// Publishes metadata such as `WHOLE_EXTENT` or `TIME_STEPS` on the outputs. Defaults
    /// from the first input are already copied.
    fn request_information(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        _outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        Ok(())
    }

    /// Translates the update request of the outputs into requests on the inputs. The
    /// request of the output is already copied to every input.
    fn request_update_extent(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        _outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        Ok(())
    }

    fn request_data(
        &mut self,
        request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError>;
}

impl dyn Algorithm {
    pub fn downcast_ref<T: Algorithm>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Algorithm>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// The data object of connection `connection` on input `port`.
pub fn input_data(
    inputs: &[InformationVector],
    port: PortHandle,
    connection: usize,
) -> Option<DataObjectHandle> {
    inputs.get(port)?.data_object(connection)
}

/// The data object of output `port`.
pub fn output_data(outputs: &InformationVector, port: PortHandle) -> Option<DataObjectHandle> {
    outputs.data_object(port)
}

/// Makes every output a new instance of the type of the first input, unless it already is.
/// For algorithms whose output type follows their input.
pub fn pass_input_type_to_outputs(
    inputs: &[InformationVector],
    outputs: &mut InformationVector,
) -> Result<(), BoxedError> {
    let Some(input) = input_data(inputs, 0, 0) else {
        return Err("no input to take the output type from".into());
    };
    let class_name = input.class_name();
    for info in outputs.iter_mut() {
        if DATA_OBJECT.get(info).is_some_and(|output| output.class_name() == class_name) {
            continue;
        }
        let instance = input.read().new_instance();
        DATA_OBJECT.set(info, DataObjectHandle::from_box(instance));
    }
    Ok(())
}
