//! Criterion benchmarks for hot paths in the taskd daemon.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - JSON-RPC request parsing (serde_json)
//!   - Store lookups and pagination window computation (linear scans)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Value;
use taskd::tasks::{service, TaskStore};

// ─── JSON-RPC parsing ────────────────────────────────────────────────────────

static TASK_CREATE_MSG: &str = r#"{
    "jsonrpc": "2.0",
    "id": 42,
    "method": "task.create",
    "params": {
        "title": "Ship the quarterly report",
        "description": "Numbers from finance land on Thursday."
    }
}"#;

fn bench_rpc_parse(c: &mut Criterion) {
    c.bench_function("rpc_parse_task_create", |b| {
        b.iter(|| {
            let v: Value = serde_json::from_str(black_box(TASK_CREATE_MSG)).unwrap();
            black_box(v);
        });
    });
}

// ─── Store scans ─────────────────────────────────────────────────────────────

fn seeded_store(count: usize) -> (TaskStore, Vec<String>) {
    let store = TaskStore::new();
    let ids = (0..count)
        .map(|i| store.create(format!("task {i}"), None).id)
        .collect();
    (store, ids)
}

fn bench_store(c: &mut Criterion) {
    let (store, ids) = seeded_store(1000);
    let middle = ids[ids.len() / 2].clone();

    c.bench_function("store_get_by_id_1000", |b| {
        b.iter(|| {
            let task = store.get_by_id(black_box(&middle)).unwrap();
            black_box(task);
        });
    });

    c.bench_function("paginate_1000_limit_20", |b| {
        b.iter(|| {
            let page = service::get_paginated(&store, 20, Some(black_box(&middle))).unwrap();
            black_box(page);
        });
    });
}

criterion_group!(benches, bench_rpc_parse, bench_store);
criterion_main!(benches);
