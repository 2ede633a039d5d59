use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use certledger_core::{fingerprint_bytes, Fingerprinter};

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for size in [1024usize, 64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let doc: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("in_memory", size), &doc, |b, doc| {
            b.iter(|| fingerprint_bytes(black_box(doc)))
        });

        let fp = Fingerprinter::default();
        group.bench_with_input(BenchmarkId::new("streamed", size), &doc, |b, doc| {
            b.iter(|| fp.fingerprint(black_box(&doc[..]), None).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprint);
criterion_main!(benches);
