//! Benchmarks for the hot pool paths.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::convert::Infallible;
use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;
use tenant_pool::{PoolRegistry, PoolableResource, TableIdentity};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

struct NoopWriter;

impl PoolableResource for NoopWriter {
    type Error = Infallible;

    fn reactivate(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn close(&mut self) {}
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_return");

    group.bench_function("reuse_cycle_hot_identity", |b| {
        let registry = PoolRegistry::builder()
            .factory(|_identity: &TableIdentity, _slot| Ok(NoopWriter))
            .max_slots_per_identity(nz!(1))
            .idle_ttl(Duration::from_secs(3600))
            .build();
        let identity = TableIdentity::new("bench", 1);

        // Prime the slot so every iteration takes the reuse path.
        drop(registry.acquire(&identity).expect("capacity is free"));

        b.iter(|| {
            let tenant = registry
                .acquire(black_box(&identity))
                .expect("idle instance exists");
            drop(black_box(tenant));
        });
    });

    group.bench_function("exhausted_fail_fast", |b| {
        let registry = PoolRegistry::builder()
            .factory(|_identity: &TableIdentity, _slot| Ok(NoopWriter))
            .max_slots_per_identity(nz!(1))
            .build();
        let identity = TableIdentity::new("bench", 1);

        let _held = registry.acquire(&identity).expect("capacity is free");

        b.iter(|| {
            let error = registry.acquire(black_box(&identity));
            assert!(black_box(error).is_err());
        });
    });

    group.finish();
}
