use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use courseweave_core::graph::find_cycles;
use courseweave_core::model::{Course, CourseType, PrerequisiteEdge};

fn catalog(n: usize) -> Vec<Course> {
    (0..n)
        .map(|i| Course::new(format!("C{i}"), format!("Course {i}"), 4, "MS_CS", CourseType::Core))
        .collect()
}

/// Each course requires the next two, a layered DAG.
fn layered(n: usize) -> Vec<PrerequisiteEdge> {
    let mut edges = Vec::new();
    for i in 0..n {
        for step in 1..=2 {
            if i + step < n {
                edges.push(PrerequisiteEdge::new(format!("C{i}"), format!("C{}", i + step)));
            }
        }
    }
    edges
}

/// The layered DAG plus one back edge closing a long cycle.
fn with_back_edge(n: usize) -> Vec<PrerequisiteEdge> {
    let mut edges = layered(n);
    edges.push(PrerequisiteEdge::new(format!("C{}", n - 1), "C0"));
    edges
}

fn bench_find_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_cycles");

    for n in [50, 200, 800] {
        let courses = catalog(n);
        let acyclic = layered(n);
        let cyclic = with_back_edge(n);

        group.bench_with_input(BenchmarkId::new("acyclic", n), &n, |b, _| {
            b.iter(|| find_cycles(black_box(&courses), black_box(&acyclic)))
        });
        group.bench_with_input(BenchmarkId::new("one_cycle", n), &n, |b, _| {
            b.iter(|| find_cycles(black_box(&courses), black_box(&cyclic)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find_cycles);
criterion_main!(benches);
