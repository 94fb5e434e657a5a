//! 地址规范化基准测试
//!
//! 测试不同形态的基础地址和子路径的规范化开销

use criterion::{criterion_group, criterion_main, Criterion};
use server_pulse::health::url::normalize;
use std::hint::black_box;

/// 地址规范化基准测试
fn normalize_benchmark(c: &mut Criterion) {
    c.bench_function("normalize_bare_host", |b| {
        b.iter(|| normalize(black_box("example.com"), black_box(Some("health"))));
    });

    c.bench_function("normalize_qualified_with_slashes", |b| {
        b.iter(|| {
            normalize(
                black_box("http://api.internal:8080/"),
                black_box(Some("/v1/ping")),
            )
        });
    });

    c.bench_function("normalize_without_sub_path", |b| {
        b.iter(|| normalize(black_box("https://example.com"), black_box(None)));
    });

    c.bench_function("normalize_unusable", |b| {
        b.iter(|| normalize(black_box(""), black_box(Some("health"))));
    });
}

/// 批量地址规范化基准测试
fn normalize_fleet_benchmark(c: &mut Criterion) {
    let fleet: Vec<(String, Option<String>)> = (0..500)
        .map(|i| {
            let base = if i % 2 == 0 {
                format!("host-{i}.internal")
            } else {
                format!("https://host-{i}.internal/")
            };
            let sub_path = (i % 3 != 0).then(|| format!("/status/{i}"));
            (base, sub_path)
        })
        .collect();

    c.bench_function("normalize_fleet_500", |b| {
        b.iter(|| {
            for (base, sub_path) in &fleet {
                black_box(normalize(base, sub_path.as_deref()));
            }
        });
    });
}

criterion_group!(benches, normalize_benchmark, normalize_fleet_benchmark);
criterion_main!(benches);
