use crate::errors::ExecutionError;
use crate::information::keys::{
    DATA_TYPE_NAME, INPUT_IS_OPTIONAL, INPUT_IS_REPEATABLE, INPUT_REQUIRED_DATA_TYPE,
};
use crate::tests::processors::{Merge, PointAppender};
use crate::tests::sources::PolySource;
use crate::{Dag, Edge, Endpoint, DEFAULT_PORT_HANDLE};
use vizpipe_types::node::NodeHandle;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

fn merge_dag() -> (Dag, NodeHandle, Vec<NodeHandle>) {
    let mut dag = Dag::new();
    let merge = NodeHandle::new(Some(1), "merge".to_string());
    dag.add_algorithm(
        merge.clone(),
        Box::new(Merge::new(Arc::new(AtomicUsize::new(0)))),
    )
    .unwrap();
    let sources: Vec<_> = (0..3)
        .map(|i| {
            let handle = NodeHandle::new(Some(1), format!("source{i}"));
            dag.add_algorithm(
                handle.clone(),
                Box::new(PolySource::new(i, Arc::new(AtomicUsize::new(0)))),
            )
            .unwrap();
            handle
        })
        .collect();
    (dag, merge, sources)
}

#[test]
fn test_port_contracts() {
    let (dag, merge, sources) = merge_dag();

    let repeatable = dag.input_port_information(&merge, 0).unwrap();
    assert_eq!(INPUT_IS_REPEATABLE.get(repeatable), Some(true));
    assert_eq!(
        INPUT_REQUIRED_DATA_TYPE.get(repeatable),
        Some(vec!["PolyData".to_string()])
    );
    let optional = dag.input_port_information(&merge, 1).unwrap();
    assert_eq!(INPUT_IS_OPTIONAL.get(optional), Some(true));
    assert!(matches!(
        dag.input_port_information(&merge, 2),
        Err(ExecutionError::InvalidPortHandle { port: 2, .. })
    ));

    let output = dag.output_port_information(&sources[0], 0).unwrap();
    assert_eq!(DATA_TYPE_NAME.get(output), Some("PolyData".to_string()));
}

#[test]
fn test_repeatable_port_keeps_connection_order() {
    let (mut dag, merge, sources) = merge_dag();
    for source in &sources {
        dag.connect(
            Endpoint::new(source.clone(), DEFAULT_PORT_HANDLE),
            Endpoint::new(merge.clone(), 0),
        )
        .unwrap();
    }
    assert_eq!(dag.number_of_input_connections(&merge, 0), 3);
    assert_eq!(dag.number_of_input_connections(&merge, 1), 0);

    dag.remove_input_connection(
        &Endpoint::new(sources[1].clone(), DEFAULT_PORT_HANDLE),
        &Endpoint::new(merge.clone(), 0),
    )
    .unwrap();
    let remaining: Vec<_> = (0..2)
        .map(|index| dag.input_connection(&merge, 0, index).unwrap().node.clone())
        .collect();
    assert_eq!(remaining, vec![sources[0].clone(), sources[2].clone()]);
    assert!(dag.input_connection(&merge, 0, 2).is_none());

    assert!(matches!(
        dag.remove_input_connection(
            &Endpoint::new(sources[1].clone(), DEFAULT_PORT_HANDLE),
            &Endpoint::new(merge.clone(), 0),
        ),
        Err(ExecutionError::NotConnected { .. })
    ));
    assert!(matches!(
        dag.connect(
            Endpoint::new(sources[0].clone(), DEFAULT_PORT_HANDLE),
            Endpoint::new(merge.clone(), 0),
        ),
        Err(ExecutionError::DuplicateInput { .. })
    ));

    dag.remove_all_input_connections(&Endpoint::new(merge.clone(), 0))
        .unwrap();
    assert_eq!(dag.number_of_input_connections(&merge, 0), 0);
    assert!(dag.edge_handles().is_empty());
}

#[test]
fn test_consumers_and_edges() {
    let (mut dag, merge, sources) = merge_dag();
    let appender = NodeHandle::new(Some(1), "appender".to_string());
    dag.add_algorithm(
        appender.clone(),
        Box::new(PointAppender::new(Arc::new(AtomicUsize::new(0)))),
    )
    .unwrap();

    let from = Endpoint::new(sources[0].clone(), DEFAULT_PORT_HANDLE);
    dag.connect(from.clone(), Endpoint::new(merge.clone(), 1))
        .unwrap();
    dag.connect(from.clone(), Endpoint::new(appender.clone(), 0))
        .unwrap();

    let consumers = dag.consumers_of(&sources[0], DEFAULT_PORT_HANDLE);
    assert_eq!(consumers.len(), 2);
    assert!(consumers.contains(&Endpoint::new(merge.clone(), 1)));
    assert!(consumers.contains(&Endpoint::new(appender.clone(), 0)));
    assert!(dag.consumers(&sources[1]).is_empty());

    let edges = dag.edge_handles();
    assert_eq!(edges.len(), 2);
    assert!(edges.contains(&Edge::new(from.clone(), Endpoint::new(merge.clone(), 1))));

    // Setting the only connection replaces the previous one.
    dag.set_input_connection(
        Endpoint::new(sources[2].clone(), DEFAULT_PORT_HANDLE),
        Endpoint::new(appender.clone(), 0),
    )
    .unwrap();
    assert_eq!(dag.consumers_of(&sources[0], DEFAULT_PORT_HANDLE).len(), 1);
    assert_eq!(
        dag.input_connection(&appender, 0, 0),
        Some(&Endpoint::new(sources[2].clone(), DEFAULT_PORT_HANDLE))
    );
    assert_eq!(dag.node_handles().count(), 5);
    assert_eq!(Endpoint::new(appender, 0).to_string(), "1_appender:0");
}
