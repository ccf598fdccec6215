use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tether_engine::{Engine, Machine};
use tether_sdk::{globals, new_table};

fn bench_table_access(c: &mut Criterion) {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("x").set(1).unwrap();

    c.bench_function("node_set", |b| {
        b.iter(|| table.index(black_box("x")).set(black_box(42)).unwrap());
    });

    c.bench_function("node_value", |b| {
        b.iter(|| table.index(black_box("x")).value(0i64));
    });

    c.bench_function("object_clone", |b| {
        b.iter(|| black_box(table.clone()));
    });
}

fn bench_calls(c: &mut Criterion) {
    let engine = Engine::new();
    engine.register("add", |engine| {
        let sum = engine.to_integer(1).unwrap_or(0) + engine.to_integer(2).unwrap_or(0);
        engine.push_integer(sum);
        Ok(1)
    });
    let add = globals(&engine).index("add").get();

    let mut group = c.benchmark_group("calls");
    group.bench_function("call_result", |b| {
        b.iter(|| add.call::<i64, _>(black_box((3, 4))).unwrap());
    });
    group.bench_function("call_discard", |b| {
        b.iter(|| add.call::<(), _>(black_box((3, 4))).unwrap());
    });
    group.bench_function("call_error", |b| {
        let fail = globals(&engine).index("error").get();
        b.iter(|| fail.call::<(), _>(black_box(("boom",))).is_err());
    });
    group.finish();
}

criterion_group!(benches, bench_table_access, bench_calls);
criterion_main!(benches);
