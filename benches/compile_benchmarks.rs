//! Compile throughput on generated trees.
//!
//! - `member_init`: wide object initializers, mostly normalization work
//! - `nested_conditionals`: deep branch chains, mostly label and jump traffic
//!
//! Run with the `profiling` feature to see per-phase scopes:
//!
//! ```bash
//! cargo bench --features profiling
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use exprtree::{
    compile_chunk, ConstructorDef, DataType, Expr, MemberBinding, NewExpr, TypeRegistry, VarId,
    Variable,
};
use std::hint::black_box;

/// A class with `width` auto-properties and an initializer setting each one.
fn member_init_tree(width: usize) -> (TypeRegistry, Expr) {
    let mut registry = TypeRegistry::new();
    let record = DataType::class("Record");
    registry.register_type(&record).unwrap();
    let ctor = registry
        .add_constructor(ConstructorDef::new(&record, vec![]))
        .unwrap();
    let bindings = (0..width)
        .map(|i| {
            let prop = registry
                .add_auto_property(&record, &format!("P{i}"), DataType::int32())
                .unwrap();
            MemberBinding::new(prop, Expr::int(i as i32))
        })
        .collect();
    (registry, Expr::member_init(NewExpr::new(ctor, vec![]), bindings))
}

/// `x == 0 ? 0 : (x == 1 ? 1 : ...)` with nullable comparisons at each level.
fn conditional_chain(depth: usize) -> (Variable, Expr) {
    let x = Variable::new(VarId(0), "x", DataType::nullable(&DataType::int32()));
    let tree = (0..depth).rev().fold(Expr::int(-1), |rest, i| {
        Expr::conditional(
            Expr::equal(Expr::variable(&x), Expr::int(i as i32)),
            Expr::int(i as i32),
            rest,
        )
    });
    (x, tree)
}

fn bench_member_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("member_init");
    for width in [4, 32, 256] {
        let (registry, tree) = member_init_tree(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &tree, |b, tree| {
            b.iter(|| compile_chunk(black_box(tree), &[], &registry).unwrap());
        });
    }
    group.finish();
}

fn bench_conditionals(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    let mut group = c.benchmark_group("nested_conditionals");
    for depth in [8, 64, 256] {
        let (x, tree) = conditional_chain(depth);
        let params = [x];
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &tree, |b, tree| {
            b.iter(|| compile_chunk(black_box(tree), &params, &registry).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_member_init, bench_conditionals);
criterion_main!(benches);
