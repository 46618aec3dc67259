//! Throughput of the alignment pass over generated pipelines and a
//! synthetic statement with many independent loads.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pixir::align_loads;
use pixir::config::target::Target;
use pixir::generator::{register_builtin_generators, GeneratorParamValues, GeneratorRegistry};
use pixir::ir::{Expr, Parameter, Stmt, Type};

/// `n` stores, each summing two loads at offsets that cycle through
/// every rewrite rule.
fn synthetic(n: i64) -> Stmt {
    let input = Parameter::buffer("in", Type::uint(8)).with_host_alignment(64);
    let out = Parameter::buffer("out", Type::uint(8)).with_host_alignment(64);
    let stores = (0..n)
        .map(|i| {
            let lanes = [8u32, 16, 16, 40][(i % 4) as usize];
            let stride = if i % 3 == 0 { 2 } else { 1 };
            let base = Expr::var("x") * 64 + i % 16;
            let ty = Type::uint(8).with_lanes(lanes);
            let load = |b: Expr| Expr::load_param(ty, &input, Expr::ramp(b, Expr::int(stride), lanes));
            Stmt::store_param(
                &out,
                load(base.clone()) + load(base.clone() + 1),
                Expr::ramp(base, Expr::int(1), lanes),
            )
        })
        .collect();
    Stmt::serial_for("x", Expr::int(0), Expr::int(16), Stmt::block(stores))
}

fn bench_synthetic(c: &mut Criterion) {
    let target = Target::parse("x86-64-linux").unwrap();
    let mut group = c.benchmark_group("synthetic");
    for n in [16, 256] {
        let s = synthetic(n);
        group.bench_function(format!("{}_stores", n), |b| {
            b.iter(|| align_loads(black_box(&s), &target).unwrap())
        });
    }
    group.finish();
}

fn bench_generators(c: &mut Criterion) {
    let registry = GeneratorRegistry::new();
    register_builtin_generators(&registry).unwrap();
    let target = Target::parse("x86-64-linux-avx2").unwrap();
    let mut group = c.benchmark_group("generators");
    for name in registry.enumerate() {
        let params = GeneratorParamValues::from([("extent".to_string(), "64".to_string())]);
        let pipeline = registry
            .create(&name, &params)
            .ok()
            .unwrap()
            .build(&target)
            .unwrap();
        group.bench_function(name.as_str(), |b| {
            b.iter(|| align_loads(black_box(&pipeline.body), &target).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_synthetic, bench_generators);
criterion_main!(benches);
