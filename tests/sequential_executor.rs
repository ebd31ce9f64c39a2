// tests/sequential_executor.rs

mod common;
use crate::common::builders::ConfigBuilder;
use crate::common::fake_executor::SequentialExecutor;
use crate::common::{emulated, init_tracing};

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use heteroflow::{GraphBuilder, NodeId, StreamHandle};

#[test]
fn executor_round_trips_data_through_the_device() {
    init_tracing();
    let rt = emulated(1);
    let exec = SequentialExecutor::new(rt.clone());

    let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let mut output = vec![0.0f32; 100];
    let launched = AtomicUsize::new(0);

    let cfg = ConfigBuilder::new().grid([4, 1, 1]).block([25, 1, 1]).build();
    {
        let mut b = GraphBuilder::with_config(&cfg);
        let a = b.pull("A", &input);
        let k = b.kernel(
            "B",
            |_i, hits: &&AtomicUsize| {
                hits.fetch_add(1, Ordering::Relaxed);
            },
            &launched,
        );
        let c = b.push("C", &mut output, a);
        b.linearize(&[a, k, c]).unwrap();
        let graph = b.freeze().unwrap();

        let order = exec.run(&graph).unwrap();
        assert_eq!(order, vec![a, k, c]);
        assert!(graph.nodes().all(|n| n.is_ready()));
        assert_eq!(rt.live_allocations(), 1);
    }

    assert_eq!(output, input);
    assert_eq!(launched.load(Ordering::Relaxed), 100);
    assert_eq!(rt.launch_count(), 1);
    assert_eq!(rt.release_count(), 1);
    assert_eq!(rt.live_allocations(), 0);
}

#[test]
fn host_tasks_run_in_dependency_order() {
    init_tracing();
    let exec = SequentialExecutor::new(emulated(1));
    let log = Mutex::new(Vec::new());

    let mut b = GraphBuilder::new();
    let ids: Vec<NodeId> = ["fetch", "parse", "index", "report"]
        .iter()
        .map(|&name| {
            let log = &log;
            b.host(name, move || log.lock().unwrap().push(name))
        })
        .collect();
    // fetch -> {parse, index} -> report
    b.precede_all(ids[0], &[ids[1], ids[2]]).unwrap();
    b.precede(ids[1], ids[3]).unwrap();
    b.precede(ids[2], ids[3]).unwrap();
    let graph = b.freeze().unwrap();

    exec.run(&graph).unwrap();
    drop(graph);

    let log = log.into_inner().unwrap();
    assert_eq!(log.first(), Some(&"fetch"));
    assert_eq!(log.last(), Some(&"report"));
    assert_eq!(log.len(), 4);
}

#[test]
fn reset_allows_a_second_run_reusing_the_buffer() {
    init_tracing();
    let rt = emulated(1);
    let exec = SequentialExecutor::new(rt.clone());

    let input = [5u32; 32];
    let mut output = [0u32; 32];
    {
        let mut b = GraphBuilder::new();
        let a = b.pull("A", &input);
        let c = b.push("C", &mut output, a);
        b.precede(a, c).unwrap();
        let mut graph = b.freeze().unwrap();

        exec.run(&graph).unwrap();
        graph.reset();
        assert_eq!(graph.ready(), vec![a]);
        exec.run(&graph).unwrap();

        assert_eq!(rt.allocation_count(), 1);
    }
    assert_eq!(output, input);
    assert_eq!(rt.release_count(), 1);
}

#[test]
fn running_twice_without_reset_underflows() {
    init_tracing();
    let exec = SequentialExecutor::new(emulated(1));

    let mut b = GraphBuilder::new();
    let a = b.host("a", || {});
    let c = b.host("c", || {});
    b.precede(a, c).unwrap();
    let graph = b.freeze().unwrap();

    exec.run(&graph).unwrap();
    assert!(exec.run(&graph).is_err());
}

#[test]
fn kernels_follow_their_own_launch_configuration() {
    init_tracing();
    let rt = emulated(2);
    let exec = SequentialExecutor::new(rt.clone());
    let hits = AtomicUsize::new(0);

    let kernel = heteroflow::Kernel::new(
        |_i, hits: &&AtomicUsize| {
            hits.fetch_add(1, Ordering::Relaxed);
        },
        &hits,
    )
    .on_device(1)
    .grid([2u32, 3, 1])
    .block(8u32)
    .stream(StreamHandle(3));

    let mut b = GraphBuilder::new();
    b.emplace("k", kernel);
    let graph = b.freeze().unwrap();
    exec.run(&graph).unwrap();

    assert_eq!(hits.load(Ordering::Relaxed), 48);
    assert_eq!(rt.launch_count(), 1);
}
