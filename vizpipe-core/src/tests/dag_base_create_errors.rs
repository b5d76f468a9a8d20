use crate::data_object::PolyData;
use crate::errors::ExecutionError;
use crate::executor::{CancellationToken, DagExecutor, ExecutionContext, ExecutorOptions};
use crate::information::keys::DATA_TYPE_NAME;
use crate::information::{Information, InformationVector, RequestKind};
use crate::node::{Algorithm, PortHandle};
use crate::tests::processors::{PassThrough, PointAppender};
use crate::tests::sources::{ImageSource, PolySource};
use crate::{Dag, Endpoint, DEFAULT_PORT_HANDLE};
use vizpipe_types::errors::internal::BoxedError;
use vizpipe_types::node::NodeHandle;
use vizpipe_types::{Extent, MTime, TimeStamp};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
/// Copies poly data, or fails while `fail` is set.
struct FailingFilter {
    fail: bool,
    mtime: TimeStamp,
}

impl FailingFilter {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            mtime: TimeStamp::now(),
        }
    }

    fn set_fail(&mut self, fail: bool) {
        self.fail = fail;
        self.mtime.modified();
    }
}

impl Algorithm for FailingFilter {
    fn type_name(&self) -> String {
        "FailingFilter".to_string()
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

    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        DATA_TYPE_NAME.set(info, crate::data_object::data_types::POLY_DATA.to_string());
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &Information,
        inputs: &mut [InformationVector],
        outputs: &mut InformationVector,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        if self.fail {
            return Err("Generated Error".to_string().into());
        }
        let input = inputs[0].data_object(0).ok_or("missing input")?;
        let output = outputs.data_object(0).ok_or("missing output")?;
        output.shallow_copy_from(&input);
        Ok(())
    }
}

#[derive(Debug)]
/// Declares an output type nobody can instantiate.
struct UnknownOutputSource;

impl Algorithm for UnknownOutputSource {
    fn type_name(&self) -> String {
        "UnknownOutputSource".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        0
    }

    fn number_of_output_ports(&self) -> usize {
        1
    }

    fn mtime(&self) -> MTime {
        0
    }

    fn fill_output_port_information(
        &self,
        _port: PortHandle,
        info: &mut Information,
    ) -> Result<(), BoxedError> {
        DATA_TYPE_NAME.set(info, "Unknown".to_string());
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

#[derive(Debug)]
/// Cancels the running update from inside its own execution.
struct AbortingSink {
    token: Option<CancellationToken>,
    executions: Arc<AtomicUsize>,
}

impl Algorithm for AbortingSink {
    fn type_name(&self) -> String {
        "AbortingSink".to_string()
    }

    fn number_of_input_ports(&self) -> usize {
        1
    }

    fn number_of_output_ports(&self) -> usize {
        0
    }

    fn mtime(&self) -> MTime {
        0
    }

    fn request_data(
        &mut self,
        _request: &Information,
        _inputs: &mut [InformationVector],
        _outputs: &mut InformationVector,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), BoxedError> {
        if let Some(token) = &self.token {
            token.cancel();
        }
        ctx.check_abort()?;
        self.executions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn connect(dag: &mut Dag, from: &NodeHandle, to: &NodeHandle) -> Result<(), ExecutionError> {
    dag.connect(
        Endpoint::new(from.clone(), DEFAULT_PORT_HANDLE),
        Endpoint::new(to.clone(), DEFAULT_PORT_HANDLE),
    )
}

fn failing_pipeline(options: ExecutorOptions) -> (DagExecutor, NodeHandle) {
    let mut dag = Dag::new();
    let source = NodeHandle::root("source");
    let filter = NodeHandle::root("filter");
    dag.add_algorithm(
        source.clone(),
        Box::new(PolySource::new(3, Arc::new(AtomicUsize::new(0)))),
    )
    .unwrap();
    dag.add_algorithm(filter.clone(), Box::new(FailingFilter::new(false)))
        .unwrap();
    connect(&mut dag, &source, &filter).unwrap();
    (DagExecutor::new(dag, options), filter)
}

fn set_fail(executor: &mut DagExecutor, filter: &NodeHandle, fail: bool) {
    executor
        .dag_mut()
        .algorithm_as_mut::<FailingFilter>(filter)
        .unwrap()
        .set_fail(fail);
}

#[test]
fn test_duplicate_node_handle() {
    let mut dag = Dag::new();
    let handle = NodeHandle::root("source");
    dag.add_algorithm(handle.clone(), Box::new(FailingFilter::new(false)))
        .unwrap();
    assert!(matches!(
        dag.add_algorithm(handle, Box::new(FailingFilter::new(false))),
        Err(ExecutionError::DuplicateNodeHandle(_))
    ));
}

#[test]
fn test_invalid_handles_and_ports() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("source");
    let filter = NodeHandle::root("filter");
    dag.add_algorithm(
        source.clone(),
        Box::new(PolySource::new(1, Arc::new(AtomicUsize::new(0)))),
    )
    .unwrap();
    dag.add_algorithm(filter.clone(), Box::new(FailingFilter::new(false)))
        .unwrap();

    assert!(matches!(
        dag.connect(
            Endpoint::new(source.clone(), 3),
            Endpoint::new(filter.clone(), DEFAULT_PORT_HANDLE),
        ),
        Err(ExecutionError::InvalidPortHandle { port: 3, .. })
    ));
    assert!(matches!(
        dag.connect(
            Endpoint::new(source.clone(), DEFAULT_PORT_HANDLE),
            Endpoint::new(NodeHandle::root("missing"), DEFAULT_PORT_HANDLE),
        ),
        Err(ExecutionError::InvalidNodeHandle(_))
    ));

    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());
    assert!(matches!(
        executor.update_port(&source, 1),
        Err(ExecutionError::InvalidPortHandle { port: 1, .. })
    ));
    assert!(matches!(
        executor.update(&NodeHandle::root("missing")),
        Err(ExecutionError::InvalidNodeHandle(_))
    ));
}

#[test]
fn test_duplicate_input() {
    let mut dag = Dag::new();
    let first = NodeHandle::root("first");
    let second = NodeHandle::root("second");
    let filter = NodeHandle::root("filter");
    for handle in [&first, &second] {
        dag.add_algorithm(
            handle.clone(),
            Box::new(PolySource::new(1, Arc::new(AtomicUsize::new(0)))),
        )
        .unwrap();
    }
    dag.add_algorithm(filter.clone(), Box::new(FailingFilter::new(false)))
        .unwrap();

    connect(&mut dag, &first, &filter).unwrap();
    assert!(matches!(
        connect(&mut dag, &second, &filter),
        Err(ExecutionError::DuplicateInput { port: 0, .. })
    ));
    assert_eq!(dag.number_of_input_connections(&filter, 0), 1);
}

#[test]
fn test_cycle_is_rejected() {
    let mut dag = Dag::new();
    let a = NodeHandle::root("a");
    let b = NodeHandle::root("b");
    let counter = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(a.clone(), Box::new(PassThrough::new(counter.clone())))
        .unwrap();
    dag.add_algorithm(b.clone(), Box::new(PassThrough::new(counter)))
        .unwrap();

    connect(&mut dag, &a, &b).unwrap();
    assert!(matches!(
        connect(&mut dag, &b, &a),
        Err(ExecutionError::WouldCycle)
    ));
    assert!(matches!(
        dag.set_input_connection(
            Endpoint::new(b.clone(), DEFAULT_PORT_HANDLE),
            Endpoint::new(a.clone(), DEFAULT_PORT_HANDLE),
        ),
        Err(ExecutionError::WouldCycle)
    ));
    assert_eq!(dag.edge_handles().len(), 1);
}

#[test]
fn test_missing_required_input() {
    let mut dag = Dag::new();
    let filter = NodeHandle::root("filter");
    dag.add_algorithm(filter.clone(), Box::new(FailingFilter::new(false)))
        .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    assert!(matches!(
        executor.update(&filter),
        Err(ExecutionError::MissingInput { port: 0, .. })
    ));
    assert_eq!(executor.error_count(), 1);
}

#[test]
fn test_input_type_mismatch() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("image");
    let appender = NodeHandle::root("appender");
    let appender_runs = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(
        source.clone(),
        Box::new(ImageSource::new(
            Extent::new(0, 1, 0, 1, 0, 0),
            Arc::new(AtomicUsize::new(0)),
        )),
    )
    .unwrap();
    dag.add_algorithm(
        appender.clone(),
        Box::new(PointAppender::new(appender_runs.clone())),
    )
    .unwrap();
    connect(&mut dag, &source, &appender).unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    match executor.update(&appender) {
        Err(ExecutionError::InputTypeMismatch {
            port,
            expected,
            actual,
            ..
        }) => {
            assert_eq!(port, 0);
            assert_eq!(expected, vec!["PolyData".to_string()]);
            assert_eq!(actual, "ImageData");
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(appender_runs.load(Ordering::Relaxed), 0);
}

#[test]
fn test_cannot_instantiate_output() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("unknown");
    dag.add_algorithm(source.clone(), Box::new(UnknownOutputSource))
        .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    assert!(matches!(
        executor.update(&source),
        Err(ExecutionError::CannotInstantiate { port: 0, ref type_name, .. }) if type_name == "Unknown"
    ));
}

#[test]
fn test_failing_request_releases_outputs() {
    let (mut executor, filter) = failing_pipeline(ExecutorOptions::default());
    executor.update(&filter).unwrap();
    let output = executor.output_data_object(&filter, 0).unwrap().unwrap();
    assert_eq!(output.read_as::<PolyData>().unwrap().number_of_points(), 3);

    set_fail(&mut executor, &filter, true);
    assert!(matches!(
        executor.update(&filter),
        Err(ExecutionError::RequestFailed {
            kind: RequestKind::Data,
            ..
        })
    ));
    assert_eq!(output.read_as::<PolyData>().unwrap().number_of_points(), 0);
    assert_eq!(executor.error_count(), 1);

    set_fail(&mut executor, &filter, false);
    executor.update(&filter).unwrap();
    assert_eq!(output.read_as::<PolyData>().unwrap().number_of_points(), 3);
}

#[test]
fn test_error_threshold() {
    let options = ExecutorOptions {
        error_threshold: Some(1),
        ..Default::default()
    };
    let (mut executor, filter) = failing_pipeline(options);
    set_fail(&mut executor, &filter, true);

    assert!(matches!(
        executor.update(&filter),
        Err(ExecutionError::RequestFailed { .. })
    ));
    assert!(matches!(
        executor.update(&filter),
        Err(ExecutionError::RequestFailed { .. })
    ));
    assert!(matches!(
        executor.update(&filter),
        Err(ExecutionError::ErrorThresholdReached(1))
    ));

    executor.reset_errors();
    set_fail(&mut executor, &filter, false);
    executor.update(&filter).unwrap();
}

#[test]
fn test_update_extent_out_of_bounds() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("image");
    let runs = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(
        source.clone(),
        Box::new(ImageSource::new(Extent::new(0, 9, 0, 9, 0, 0), runs.clone())),
    )
    .unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());

    executor
        .set_update_extent(&source, 0, Extent::new(0, 20, 0, 9, 0, 0))
        .unwrap();
    assert!(matches!(
        executor.update(&source),
        Err(ExecutionError::UpdateExtentOutOfBounds { port: 0, .. })
    ));
    assert_eq!(runs.load(Ordering::Relaxed), 0);
}

#[test]
fn test_abort_during_execution() {
    let mut dag = Dag::new();
    let source = NodeHandle::root("source");
    let sink = NodeHandle::root("sink");
    let executions = Arc::new(AtomicUsize::new(0));
    dag.add_algorithm(
        source.clone(),
        Box::new(PolySource::new(1, Arc::new(AtomicUsize::new(0)))),
    )
    .unwrap();
    dag.add_algorithm(
        sink.clone(),
        Box::new(AbortingSink {
            token: None,
            executions: executions.clone(),
        }),
    )
    .unwrap();
    connect(&mut dag, &source, &sink).unwrap();
    let mut executor = DagExecutor::new(dag, ExecutorOptions::default());
    let token = executor.abort_token();
    executor
        .dag_mut()
        .algorithm_as_mut::<AbortingSink>(&sink)
        .unwrap()
        .token = Some(token.clone());

    assert!(matches!(
        executor.update(&sink),
        Err(ExecutionError::Aborted(ref node)) if *node == sink
    ));
    assert_eq!(executions.load(Ordering::Relaxed), 0);
    assert_eq!(executor.error_count(), 0);

    executor
        .dag_mut()
        .algorithm_as_mut::<AbortingSink>(&sink)
        .unwrap()
        .token = None;
    token.reset();
    executor.update(&sink).unwrap();
    assert_eq!(executions.load(Ordering::Relaxed), 1);
}
