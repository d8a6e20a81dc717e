//! Registration and dispatch from many tasks at once.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};

use common::init_tracing;
use moonpool_wiring::prelude::*;

#[derive(Debug)]
struct Tick(u64);

#[derive(Default)]
struct Meter {
    total: u64,
}

impl Describe for Meter {
    fn describe(spec: &mut TypeSpec<Self>) {
        spec.handler::<Tick, _>("on_tick", |m, tick| {
            m.total += tick.0;
            Ok(())
        });
        spec.constructor().build(|_| Ok(Meter::default()));
    }
}

#[derive(Debug)]
struct Reading {
    sensor: i32,
}

impl Describe for Reading {
    fn describe(spec: &mut TypeSpec<Self>) {
        spec.getter("sensor", |r: &Reading| Some(r.sensor)).entity_key();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_publishes_one_table() {
    init_tracing();
    let wiring = Arc::new(Wiring::builder().build().expect("default settings"));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let wiring = Arc::clone(&wiring);
        handles.push(tokio::spawn(async move {
            wiring.register::<Meter>().expect("register")
        }));
    }

    let mut tables = Vec::new();
    for handle in handles {
        tables.push(handle.await.expect("task"));
    }

    let first = &tables[0];
    for table in &tables {
        assert!(Arc::ptr_eq(first, table));
    }
    let again = wiring.register::<Meter>().expect("register");
    assert!(Arc::ptr_eq(first, &again));
    assert_eq!(first.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_on_separate_instances() {
    init_tracing();
    let wiring = Arc::new(Wiring::builder().build().expect("default settings"));
    let grand_total = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for task in 0..16_u64 {
        let wiring = Arc::clone(&wiring);
        let grand_total = Arc::clone(&grand_total);
        handles.push(tokio::spawn(async move {
            let mut meter: Meter = wiring.create(args![]).expect("create");
            let ctx = ReceiveContext::detached();
            for _ in 0..100 {
                wiring
                    .dispatch(&mut meter, &Tick(task), &ctx)
                    .expect("dispatch");
            }
            grand_total.fetch_add(meter.total, Ordering::SeqCst);
            meter.total
        }));
    }

    for (task, handle) in handles.into_iter().enumerate() {
        let total = handle.await.expect("task");
        assert_eq!(total, task as u64 * 100);
    }
    // 100 * (0 + 1 + ... + 15)
    assert_eq!(grand_total.load(Ordering::SeqCst), 12_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shard_ids_agree() {
    init_tracing();
    let wiring = Arc::new(
        Wiring::builder()
            .shard_cardinality(7)
            .build()
            .expect("valid settings"),
    );

    let mut handles = Vec::new();
    for sensor in 0..64_i32 {
        let wiring = Arc::clone(&wiring);
        handles.push(tokio::spawn(async move {
            let id = wiring
                .shard_id_of(&Reading { sensor })
                .expect("shard id");
            (sensor, id)
        }));
    }

    for handle in handles {
        let (sensor, id) = handle.await.expect("task");
        assert_eq!(id, (sensor % 7).to_string());
    }
}
