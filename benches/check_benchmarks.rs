//! Performance benchmarks for checking whole packages.
//!
//! Workloads are synthesized with the `meridian_ast::testing` builders:
//! - Size-based: packages of 10 to 1000 functions
//! - Generics: many call sites sharing few instances
//! - Barrier: inline vs parallel leaf checks on argument-heavy bodies
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use meridian::ast::testing::*;
use meridian::ast::{Decl, File};
use meridian::{CheckOptions, Session};
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// `count` independent functions with a few statements each, plus a `main`
/// calling all of them.
fn flat_package(count: usize) -> Vec<File> {
    let mut decls: Vec<Decl> = Vec::with_capacity(count + 2);
    decls.push(struct_("Point").pub_field("x", "int").pub_field("y", "int").decl());
    let mut calls = Vec::with_capacity(count);
    for i in 0..count {
        let name = format!("f{i}");
        decls.push(
            func(&name)
                .param("a", "int")
                .param_default("b", "int", "2")
                .ret("int")
                .body(vec![
                    let_("p", "Point{x: a, y: b}"),
                    let_mut("total", "p.x * p.y"),
                    if_else(
                        "total > 10",
                        vec![assign(&["total"], &["total - 10"])],
                        vec![incr("total")],
                    ),
                    ret(&["total"]),
                ])
                .decl(),
        );
        calls.push(expr_stmt(&format!("{name}({i})")));
    }
    decls.push(func("main").body(calls).decl());
    vec![file("bench/main.mer", decls)]
}

/// One generic function called from `calls` sites with three distinct
/// argument types.
fn generic_package(calls: usize) -> Vec<File> {
    let pick = func("pick")
        .generics(&["T"])
        .param("a", "T")
        .param("b", "T")
        .param("first", "bool")
        .ret("T")
        .body(vec![if_("first", vec![ret(&["a"])]), ret(&["b"])])
        .decl();
    let args = ["1, 2", "\"a\", \"b\"", "1.5, 2.5"];
    let body = (0..calls)
        .map(|i| expr_stmt(&format!("pick({}, true)", args[i % args.len()])))
        .collect();
    vec![file("bench/main.mer", vec![pick, func("main").body(body).decl()])]
}

fn check(files: Vec<File>, options: CheckOptions) -> usize {
    let mut session = Session::new(options);
    session.add_package("bench", files).unwrap();
    let functions = session.check("bench").unwrap().functions.len();
    end_profiling_frame();
    functions
}

/// Check time across package sizes.
fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("check/package_sizes");
    for count in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || flat_package(count),
                |files| black_box(check(files, CheckOptions::default())),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Memoized instances: call sites grow, instances stay at three.
fn generic_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("check/generic_calls");
    for calls in [30usize, 300] {
        group.throughput(Throughput::Elements(calls as u64));
        group.bench_with_input(BenchmarkId::from_parameter(calls), &calls, |b, &calls| {
            b.iter_batched(
                || generic_package(calls),
                |files| black_box(check(files, CheckOptions::default())),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Leaf checks run inline vs on the rayon pool.
fn barrier_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("check/barrier");
    for (label, parallel) in [("inline", false), ("parallel", true)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || flat_package(500),
                |files| {
                    let options = CheckOptions::default().with_parallel_leaf_checks(parallel);
                    black_box(check(files, options))
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, size_based_benchmarks, generic_benchmarks, barrier_benchmarks);
criterion_main!(benches);
