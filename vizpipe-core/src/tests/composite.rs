use crate::data_object::{
    data_types, CompositeDataSet, DataObject, DataObjectHandle, ImageData, MultiBlockDataSet,
    OverlappingAmr, PolyData,
};
use crate::errors::{DataObjectError, ExecutionError};
use crate::executor::{DagExecutor, ExecutionContext, ExecutorOptions};
use crate::information::keys::{DATA_TYPE_NAME, INPUT_REQUIRED_DATA_TYPE};
use crate::information::{Information, InformationVector};
use crate::node::{input_data, output_data, Algorithm, PortHandle};
use crate::tests::processors::{ImageScale, PointAppender};
use crate::tests::sources::{AmrSource, MultiBlockSource};
use crate::{Dag, Endpoint, DEFAULT_PORT_HANDLE};
use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::node::NodeHandle;
use vizpipe_types::{MTime, TimeStamp};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn poly_leaf(points: usize) -> DataObjectHandle {
    let mut poly = PolyData::new();
    for i in 0..points {
        poly.insert_point([i as f64, 0.0, 0.0]);
    }
    DataObjectHandle::new(poly)
}

#[derive(Debug)]
/// Turns an image into poly data with one point per image point.
struct ImageToPoints {
    mtime: TimeStamp,
}

impl Algorithm for ImageToPoints {
    fn type_name(&self) -> String {
        "ImageToPoints".to_string()
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
        let input = input_data(inputs, 0, 0).ok_or("missing input")?;
        let output = output_data(outputs, 0).ok_or("missing output")?;
        let points = input.read_as::<ImageData>().ok_or("input is not an image")?.scalars().len();
        let mut poly = output.write_as::<PolyData>().ok_or("output is not poly data")?;
        for i in 0..points {
            poly.insert_point([i as f64, 0.0, 0.0]);
        }
        Ok(())
    }
}

#[test]
fn test_multi_block_iteration() {
    let mut multi_block = MultiBlockDataSet::new();
    for i in 0..3 {
        multi_block.set_block(i, Some(poly_leaf(i + 1))).unwrap();
    }

    let mut iterator = multi_block.new_iterator();
    iterator.init_traversal();
    let mut visited = Vec::new();
    while !iterator.is_done_with_traversal() {
        visited.push((
            iterator.current_index().unwrap(),
            iterator.current_flat_index().unwrap(),
        ));
        iterator.go_to_next_item();
    }
    assert_eq!(visited, vec![(0, 1), (1, 2), (2, 3)]);
    assert!(iterator.current_data_object().is_none());

    // Advancing past the end stays done.
    iterator.go_to_next_item();
    assert!(iterator.is_done_with_traversal());
}

#[test]
fn test_iterator_skips_empty_nodes() {
    let mut multi_block = MultiBlockDataSet::new();
    multi_block.set_block(0, Some(poly_leaf(1))).unwrap();
    multi_block.set_block(1, None).unwrap();
    multi_block.set_block(2, Some(poly_leaf(2))).unwrap();

    let iterator = multi_block.new_iterator();
    let flat: Vec<_> = iterator.visited().map(|item| item.flat_index).collect();
    assert_eq!(flat, vec![1, 3]);

    let mut iterator = multi_block.new_iterator();
    iterator.set_skip_empty_nodes(false);
    let flat: Vec<_> = iterator.visited().map(|item| item.flat_index).collect();
    assert_eq!(flat, vec![1, 2, 3]);
    assert_eq!(multi_block.number_of_leaves(), 2);
}

#[test]
fn test_nested_traversal_options() {
    let mut inner = MultiBlockDataSet::new();
    inner.set_block(0, Some(poly_leaf(1))).unwrap();
    let mut outer = MultiBlockDataSet::new();
    outer.set_block(0, Some(DataObjectHandle::new(inner))).unwrap();
    outer.set_block(1, Some(poly_leaf(2))).unwrap();

    let mut iterator = outer.new_iterator();
    assert_eq!(iterator.visited().count(), 2);

    iterator.set_traverse_sub_tree(false);
    let flat: Vec<_> = iterator.visited().map(|item| item.flat_index).collect();
    assert_eq!(flat, vec![3]);

    iterator.set_visit_only_leaves(false);
    let flat: Vec<_> = iterator.visited().map(|item| item.flat_index).collect();
    assert_eq!(flat, vec![1, 3]);
}

#[test]
fn test_amr_iteration() {
    let mut amr = OverlappingAmr::new();
    amr.initialize_levels(&[1, 2]);
    for (level, index) in [(0, 0), (1, 0), (1, 1)] {
        amr.set_data_set_at(level, index, Some(DataObjectHandle::new(ImageData::new())))
            .unwrap();
    }

    let mut iterator = amr.new_amr_iterator();
    iterator.init_traversal();
    let mut visited = Vec::new();
    while !iterator.is_done_with_traversal() {
        visited.push((
            iterator.current_level().unwrap(),
            iterator.current_index().unwrap(),
        ));
        iterator.go_to_next_item();
    }
    assert_eq!(visited, vec![(0, 0), (1, 0), (1, 1)]);
    assert_eq!(amr.flat_index(1, 1), Some(3));
    assert_eq!(amr.level_and_index(2), Some((1, 0)));
}

#[test]
fn test_composite_execution_per_block() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("blocks");
    let appender = NodeHandle::root("appender");
    let runs = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(source.clone(), Box::new(MultiBlockSource::new(3)))
        .unwrap();
    dag.add_algorithm(appender.clone(), Box::new(PointAppender::new(runs.clone())))
        .unwrap();
    dag.connect(
        Endpoint::new(source.clone(), DEFAULT_PORT_HANDLE),
        Endpoint::new(appender.clone(), DEFAULT_PORT_HANDLE),
    )
    .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    executor.update(&appender).unwrap();
    assert_eq!(runs.load(Ordering::Relaxed), 3);
    let output = executor.output_data_object(&appender, 0).unwrap().unwrap();
    assert!(output.is_a(data_types::MULTI_BLOCK_DATA_SET));
    let first_leaf = {
        let multi_block = output.read_as::<MultiBlockDataSet>().unwrap();
        assert_eq!(multi_block.number_of_blocks(), 3);
        for index in 0..3 {
            let block = multi_block.block(index).unwrap();
            assert_eq!(block.read_as::<PolyData>().unwrap().number_of_points(), 2);
        }
        multi_block.block(0).unwrap()
    };

    executor.update(&appender).unwrap();
    assert_eq!(runs.load(Ordering::Relaxed), 3);

    // Only the modified block is executed again.
    executor
        .dag_mut()
        .algorithm_as_mut::<MultiBlockSource>(&source)
        .unwrap()
        .touch_block(1);
    executor.update(&appender).unwrap();
    assert_eq!(runs.load(Ordering::Relaxed), 4);
    let multi_block = output.read_as::<MultiBlockDataSet>().unwrap();
    assert!(multi_block.block(0).unwrap().ptr_eq(&first_leaf));
    assert_eq!(
        multi_block
            .block(1)
            .unwrap()
            .read_as::<PolyData>()
            .unwrap()
            .number_of_points(),
        3
    );
}

#[test]
fn test_composite_execution_without_caching() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("blocks");
    let appender = NodeHandle::root("appender");
    let runs = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(source.clone(), Box::new(MultiBlockSource::new(2)))
        .unwrap();
    dag.add_algorithm(appender.clone(), Box::new(PointAppender::new(runs.clone())))
        .unwrap();
    dag.connect(
        Endpoint::new(source.clone(), DEFAULT_PORT_HANDLE),
        Endpoint::new(appender.clone(), DEFAULT_PORT_HANDLE),
    )
    .unwrap();
    let options = ExecutorOptions {
        data_caching: false,
        ..Default::default()
    };
    let mut executor = DagExecutor::new(dag, options);

    executor.update(&appender).unwrap();
    executor
        .dag_mut()
        .algorithm_as_mut::<MultiBlockSource>(&source)
        .unwrap()
        .touch_block(0);
    executor.update(&appender).unwrap();
    assert_eq!(runs.load(Ordering::Relaxed), 4);
}

#[test]
fn test_composite_structure_follows_input() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("blocks");
    let appender = NodeHandle::root("appender");
    let runs = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(source.clone(), Box::new(MultiBlockSource::new(2)))
        .unwrap();
    dag.add_algorithm(appender.clone(), Box::new(PointAppender::new(runs.clone())))
        .unwrap();
    dag.connect(
        Endpoint::new(source.clone(), DEFAULT_PORT_HANDLE),
        Endpoint::new(appender.clone(), DEFAULT_PORT_HANDLE),
    )
    .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());
    executor.update(&appender).unwrap();

    executor
        .dag_mut()
        .algorithm_as_mut::<MultiBlockSource>(&source)
        .unwrap()
        .add_block();
    executor.update(&appender).unwrap();

    let output = executor.output_data_object(&appender, 0).unwrap().unwrap();
    let multi_block = output.read_as::<MultiBlockDataSet>().unwrap();
    assert_eq!(multi_block.number_of_blocks(), 3);
    assert_eq!(
        multi_block
            .block(2)
            .unwrap()
            .read_as::<PolyData>()
            .unwrap()
            .number_of_points(),
        1
    );
    assert_eq!(runs.load(Ordering::Relaxed), 3);
}

#[test]
fn test_amr_execution_per_block() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("amr");
    let scale = NodeHandle::root("scale");
    let runs = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(source.clone(), Box::new(AmrSource::new()))
        .unwrap();
    dag.add_algorithm(scale.clone(), Box::new(ImageScale::new(2.0, runs.clone())))
        .unwrap();
    dag.connect(
        Endpoint::new(source, DEFAULT_PORT_HANDLE),
        Endpoint::new(scale.clone(), DEFAULT_PORT_HANDLE),
    )
    .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    executor.update(&scale).unwrap();
    assert_eq!(runs.load(Ordering::Relaxed), 3);
    let output = executor.output_data_object(&scale, 0).unwrap().unwrap();
    let amr = output.read_as::<OverlappingAmr>().unwrap();
    let coarse = amr.data_set_at(0, 0).unwrap();
    assert_eq!(coarse.read_as::<ImageData>().unwrap().scalar([1, 1, 0]), Some(0.0));
    let fine = amr.data_set_at(1, 1).unwrap();
    let fine = fine.read_as::<ImageData>().unwrap();
    assert_eq!(fine.extent(), Some(vizpipe_types::Extent::new(4, 7, 0, 7, 0, 0)));
    assert_eq!(fine.scalar([5, 5, 0]), Some(2.0));
}

#[test]
fn test_amr_output_accepts_images_only() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("amr");
    let points = NodeHandle::root("points");
    dag.add_algorithm(source.clone(), Box::new(AmrSource::new()))
        .unwrap();
    dag.add_algorithm(
        points.clone(),
        Box::new(ImageToPoints {
            mtime: TimeStamp::now(),
        }),
    )
    .unwrap();
    dag.connect(
        Endpoint::new(source, DEFAULT_PORT_HANDLE),
        Endpoint::new(points.clone(), DEFAULT_PORT_HANDLE),
    )
    .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    assert!(matches!(
        executor.update(&points),
        Err(ExecutionError::DataObject(DataObjectError::InvalidBlock {
            parent: data_types::OVERLAPPING_AMR,
            child: data_types::POLY_DATA,
        }))
    ));
}
