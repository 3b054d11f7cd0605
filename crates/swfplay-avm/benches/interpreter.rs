//! Interpreter throughput benchmarks.
//!
//! Measures dispatch for arithmetic loops, scope-chain lookups through
//! `with` blocks, scripted calls and listener broadcasts.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use swfplay_avm::vm::{ActionCode, ActionWriter, PushItem};
use swfplay_avm::{ActionBuffer, Avm, ListenerBroadcast, PropFlags, Value, VmConfig};

/// `i = 0; while (i < n) i++`
fn counting_loop(n: i32) -> ActionBuffer {
    let mut w = ActionWriter::new();
    let top = w.new_label();
    let done = w.new_label();
    w.push(&[PushItem::str("i"), PushItem::Integer(0)])
        .action(ActionCode::SetVariable)
        .place(top)
        .push(&[PushItem::str("i")])
        .action(ActionCode::GetVariable)
        .push(&[PushItem::Integer(n)])
        .action(ActionCode::Less2)
        .action(ActionCode::Not)
        .branch_if(done)
        .push(&[PushItem::str("i"), PushItem::str("i")])
        .action(ActionCode::GetVariable)
        .action(ActionCode::Increment)
        .action(ActionCode::SetVariable)
        .jump(top)
        .place(done);
    w.finish()
}

fn bench_counting_loop(c: &mut Criterion) {
    let buffer = counting_loop(10_000);
    let mut avm = Avm::new(VmConfig::default().with_max_actions(None));

    c.bench_function("counting_loop_10000", |b| {
        b.iter(|| {
            let result = avm.run(black_box(&buffer)).unwrap();
            black_box(result)
        });
    });
}

/// Reads a global through eight nested `with` scopes.
fn bench_with_lookup(c: &mut Criterion) {
    let mut avm = Avm::new(VmConfig::default().with_max_actions(None));
    let scope = avm.new_object();
    avm.global().define("scope", Value::Object(scope), PropFlags::empty());
    avm.global().define("target", Value::from(1.0), PropFlags::empty());

    fn nest(w: &mut ActionWriter, depth: usize) {
        if depth == 0 {
            for _ in 0..100 {
                w.push_str("target")
                    .action(ActionCode::GetVariable)
                    .action(ActionCode::Pop);
            }
            return;
        }
        w.push_str("scope")
            .action(ActionCode::GetVariable)
            .with_block(|w| nest(w, depth - 1));
    }
    let mut w = ActionWriter::new();
    nest(&mut w, 8);
    let buffer = w.finish();

    c.bench_function("with_lookup_depth_8", |b| {
        b.iter(|| avm.run(black_box(&buffer)).unwrap());
    });
}

/// Calls a two-argument scripted function in a loop.
fn bench_function_calls(c: &mut Criterion) {
    let mut avm = Avm::new(VmConfig::default().with_max_actions(None));
    let mut w = ActionWriter::new();
    w.define_function("add", &["a", "b"], |w| {
        w.push_str("a")
            .action(ActionCode::GetVariable)
            .push_str("b")
            .action(ActionCode::GetVariable)
            .action(ActionCode::Add2)
            .action(ActionCode::Return);
    });
    for i in 0..100 {
        w.push(&[
            PushItem::Integer(i),
            PushItem::Integer(1),
            PushItem::Integer(2),
            PushItem::str("add"),
        ])
        .action(ActionCode::CallFunction)
        .action(ActionCode::Pop);
    }
    let buffer = w.finish();

    c.bench_function("function_calls_100", |b| {
        b.iter(|| avm.run(black_box(&buffer)).unwrap());
    });
}

fn noop(_avm: &mut Avm, _this: &Value, _args: &[Value]) -> swfplay_avm::Result<Value> {
    Ok(Value::Undefined)
}

fn bench_broadcast(c: &mut Criterion) {
    let mut avm = Avm::default();
    let handler = Value::Function(avm.native_function("onPing", noop, None));
    let listeners: Vec<_> = (0..64)
        .map(|_| {
            let obj = avm.new_object();
            obj.define("onPing", handler.clone(), PropFlags::empty());
            obj
        })
        .collect();
    let mut registry = ListenerBroadcast::new();
    for listener in &listeners {
        registry.add(listener);
    }

    c.bench_function("broadcast_64_listeners", |b| {
        b.iter(|| registry.notify(&mut avm, black_box("onPing")).unwrap());
    });
}

criterion_group!(
    benches,
    bench_counting_loop,
    bench_with_lookup,
    bench_function_calls,
    bench_broadcast
);
criterion_main!(benches);
