// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hot-path compressor throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cxo_compress::{Compressor, LogDedupe, SemanticSelect};
use cxo_core::{Blob, CancellationToken, CompressOptions};

fn noisy_logs(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            if i % 10 == 0 {
                format!("[WARN] slow request {} took {}ms", i, 100 + i)
            } else {
                format!("[ERROR] Connection refused to 10.0.0.{}:{}", i % 250, 8000 + i)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prose(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("line {i} carries a distinct marker token_{i} among repeated filler words"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_compressors(c: &mut Criterion) {
    let cancel = CancellationToken::new();
    let options = CompressOptions::default();

    let logs = Blob::new(noisy_logs(1000));
    let text = Blob::new(prose(500));

    let mut group = c.benchmark_group("compress");
    group.bench_function("log_dedupe_1000", |b| {
        b.iter(|| LogDedupe.compress(black_box(&logs), &options, &cancel).unwrap());
    });
    group.bench_function("semantic_select_500", |b| {
        b.iter(|| SemanticSelect.compress(black_box(&text), &options, &cancel).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_compressors);
criterion_main!(benches);
