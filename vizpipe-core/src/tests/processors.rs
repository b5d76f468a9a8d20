use crate::data_object::{data_types, DataObject, ImageData, PolyData};
use crate::executor::ExecutionContext;
use crate::information::keys::{
    DATA_TYPE_NAME, INPUT_IS_OPTIONAL, INPUT_IS_REPEATABLE, INPUT_REQUIRED_DATA_TYPE,
    UPDATE_EXTENT,
};
use crate::information::{Information, InformationVector};
use crate::node::{input_data, output_data, pass_input_type_to_outputs, Algorithm, PortHandle};
use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::{MTime, TimeStamp};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
/// Shares its input with its output.
pub(crate) struct PassThrough {
    mtime: TimeStamp,
    executions: Arc<AtomicUsize>,
}

impl PassThrough {
    pub fn new(executions: Arc<AtomicUsize>) -> Self {
        Self {
            mtime: TimeStamp::now(),
            executions,
        }
    }
}

impl Algorithm for PassThrough {
    fn type_name(&self) -> String {
        "PassThrough".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        1
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    fn mtime(&self) -> MTime {
        self.mtime.get()
    }

    fn request_data_object(
        &mut self,
        _request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        pass_input_type_to_outputs(inputs, outputs)
    }

    fn request_data(
        &mut self,
        _request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        let input = input_data(inputs, 0, 0).ok_or("missing input")?;
        let output = output_data(outputs, 0).ok_or("missing output")?;
        output.shallow_copy_from(&input);
        Ok(())
    }
}

#[derive(Debug)]
/// Multiplies the scalars of an image over the requested extent.
pub(crate) struct ImageScale {
    scale: f64,
    mtime: TimeStamp,
    executions: Arc<AtomicUsize>,
}

impl ImageScale {
    pub fn new(scale: f64, executions: Arc<AtomicUsize>) -> Self {
        Self {
            scale,
            mtime: TimeStamp::now(),
            executions,
        }
    }

    pub fn set_scale(&mut self, scale: f64) {
        if self.scale != scale {
            self.scale = scale;
            self.mtime.modified();
        }
    }
}

impl Algorithm for ImageScale {
    fn type_name(&self) -> String {
        "ImageScale".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        1
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    fn mtime(&self) -> MTime {
        self.mtime.get()
    }

    fn fill_input_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        INPUT_REQUIRED_DATA_TYPE.append(info, data_types::IMAGE_DATA);
        Ok(())
    }

    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        DATA_TYPE_NAME.set(info, data_types::IMAGE_DATA.to_string());
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        let input = input_data(inputs, 0, 0).ok_or("missing input")?;
        let output = output_data(outputs, 0).ok_or("missing output")?;
        let input = input.read_as::<ImageData>().ok_or("input is not an image")?;
        let extent = outputs
            .get(0)
            .and_then(|info| UPDATE_EXTENT.get(info))
            .or_else(|| input.extent())
            .ok_or("no extent to scale")?;

        let mut image = output.write_as::<ImageData>().ok_or("output is not an image")?;
        image.set_extent(extent);
        let e = extent.0;
        for k in e[4]..=e[5] {
            ctx.check_abort()?;
            for j in e[2]..=e[3] {
                for i in e[0]..=e[1] {
                    let value = input.scalar([i, j, k]).ok_or("input does not cover extent")?;
                    image.set_scalar([i, j, k], value * self.scale);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
/// Copies poly data and appends one point.
pub(crate) struct PointAppender {
    mtime: TimeStamp,
    executions: Arc<AtomicUsize>,
}

impl PointAppender {
    pub fn new(executions: Arc<AtomicUsize>) -> Self {
        Self {
            mtime: TimeStamp::now(),
            executions,
        }
    }

    pub fn modified(&mut self) {
        self.mtime.modified();
    }
}

impl Algorithm for PointAppender {
    fn type_name(&self) -> String {
        "PointAppender".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        1
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    fn mtime(&self) -> MTime {
        self.mtime.get()
    }

    fn fill_input_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        INPUT_REQUIRED_DATA_TYPE.append(info, data_types::POLY_DATA);
        Ok(())
    }

    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        DATA_TYPE_NAME.set(info, data_types::POLY_DATA.to_string());
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        let input = input_data(inputs, 0, 0).ok_or("missing input")?;
        let output = output_data(outputs, 0).ok_or("missing output")?;
        let points = input
            .read_as::<PolyData>()
            .ok_or("input is not poly data")?
            .points()
            .to_vec();
        output.write().initialize();
        let mut poly = output.write_as::<PolyData>().ok_or("output is not poly data")?;
        for point in points {
            poly.insert_point(point);
        }
        poly.insert_point([0.0, 0.0, 1.0]);
        Ok(())
    }
}

#[derive(Debug)]
/// Concatenates the points of every connection of port 0 and of the optional port 1.
pub(crate) struct Merge {
    mtime: TimeStamp,
    executions: Arc<AtomicUsize>,
}

impl Merge {
    pub fn new(executions: Arc<AtomicUsize>) -> Self {
        Self {
            mtime: TimeStamp::now(),
            executions,
        }
    }
}

impl Algorithm for Merge {
    fn type_name(&self) -> String {
        "Merge".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        2
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    fn mtime(&self) -> MTime {
        self.mtime.get()
    }

    fn fill_input_port_information(
        &self,
        port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        INPUT_REQUIRED_DATA_TYPE.append(info, data_types::POLY_DATA);
        match port {
            0 => INPUT_IS_REPEATABLE.set(info, true),
            _ => INPUT_IS_OPTIONAL.set(info, true),
        }
        Ok(())
    }

    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        DATA_TYPE_NAME.set(info, data_types::POLY_DATA.to_string());
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        let output = output_data(outputs, 0).ok_or("missing output")?;
        output.write().initialize();
        let mut merged = Vec::new();
        for port in inputs.iter() {
            for connection in 0..port.len() {
                let input = port.data_object(connection).ok_or("missing input")?;
                let poly = input.read_as::<PolyData>().ok_or("input is not poly data")?;
                merged.extend_from_slice(poly.points());
            }
        }
        let mut poly = output.write_as::<PolyData>().ok_or("output is not poly data")?;
        for point in merged {
            poly.insert_point(point);
        }
        Ok(())
    }
}
