// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-type detector throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn log_block(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("2024-03-01T10:00:{:02}Z [ERROR] Connection refused to 10.0.0.{}:{}", i % 60, i % 250, 8000 + i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_block(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("src/mod{i}.ts({i},5): error TS2304: Cannot find name 'sym{i}'."))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_detect(c: &mut Criterion) {
    let logs = log_block(500);
    let build = build_block(500);
    let code = "import { x } from './x';\nexport function f() { return x; }\n".repeat(250);

    let mut group = c.benchmark_group("detect");
    group.bench_function("logs_500", |b| {
        b.iter(|| cxo_detect::detect(black_box(&logs)));
    });
    group.bench_function("build_500", |b| {
        b.iter(|| cxo_detect::detect(black_box(&build)));
    });
    group.bench_function("code_500", |b| {
        b.iter(|| cxo_detect::detect(black_box(&code)));
    });
    group.finish();
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
