//! Benchmarks for devmem.
//!
//! Run with: cargo bench
//!
//! These measure facade overhead over the host-simulated backend.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use devmem::{kb, mb, DeviceConfig, DeviceMemory, HostBackend};

fn bench_allocate_free(c: &mut Criterion) {
    let memory = DeviceMemory::new(HostBackend::new(), DeviceConfig::default());

    let mut group = c.benchmark_group("allocate_free");

    for size in [256, kb(4), kb(64)] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let buffer = memory.allocate(black_box(size)).unwrap();
                buffer.free().unwrap();
            })
        });
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let memory = DeviceMemory::new(HostBackend::new(), DeviceConfig::default());

    let mut group = c.benchmark_group("round_trip");

    for size in [kb(4), kb(256), mb(4)] {
        let host = vec![0x5Au8; size];
        let mut readback = vec![0u8; size];
        let mut buffer = memory.allocate(size).unwrap();

        group.throughput(Throughput::Bytes(2 * size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                memory.upload(&host, &mut buffer, size).unwrap();
                memory.download(&buffer, &mut readback, size).unwrap();
                black_box(&readback);
            })
        });
    }

    group.finish();
}

fn bench_allocate_from(c: &mut Criterion) {
    let memory = DeviceMemory::new(HostBackend::new(), DeviceConfig::default());
    let host = vec![0x11u8; kb(16)];

    c.bench_function("allocate_from_16kb", |b| {
        b.iter(|| {
            let buffer = memory.allocate_from(black_box(&host)).unwrap();
            black_box(buffer.device_ptr());
        })
    });
}

criterion_group!(benches, bench_allocate_free, bench_round_trip, bench_allocate_from);
criterion_main!(benches);
