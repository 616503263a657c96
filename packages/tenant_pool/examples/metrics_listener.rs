//! Wiring a metrics collaborator to the pool's event stream.
//!
//! The pool only emits transitions; turning them into gauges and counters is the
//! subscriber's job. This example keeps three counters the way an external
//! metrics layer would.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tenant_pool::{
    PoolEvent, PoolEventKind, PoolListener, PoolRegistry, PoolableResource, SourceTag,
    TableIdentity,
};

#[derive(Debug, Default)]
struct PoolGauges {
    open: AtomicUsize,
    idle: AtomicUsize,
    expelled: AtomicUsize,
}

impl PoolListener for PoolGauges {
    fn on_event(&self, event: &PoolEvent) {
        match event.kind {
            PoolEventKind::Created => {
                self.open.fetch_add(1, Ordering::Relaxed);
            }
            PoolEventKind::Acquired => {
                self.idle.fetch_sub(1, Ordering::Relaxed);
            }
            PoolEventKind::Returned => {
                self.idle.fetch_add(1, Ordering::Relaxed);
            }
            PoolEventKind::Expelled => {
                self.open.fetch_sub(1, Ordering::Relaxed);
                self.expelled.fetch_add(1, Ordering::Relaxed);
            }
            PoolEventKind::Reaped => {
                self.open.fetch_sub(1, Ordering::Relaxed);
                self.idle.fetch_sub(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

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

fn main() {
    let gauges = Arc::new(PoolGauges::default());

    let registry = PoolRegistry::builder()
        .factory(|_identity: &TableIdentity, _slot| Ok(NoopWriter))
        .idle_ttl(Duration::ZERO)
        .source(SourceTag::new("journal_writer"))
        .listener(Arc::clone(&gauges) as Arc<dyn PoolListener>)
        .build();

    let trades = TableIdentity::new("trades", 1);
    let orders = TableIdentity::new("orders", 2);

    drop(registry.acquire(&trades).expect("capacity is free"));
    drop(registry.acquire(&orders).expect("capacity is free"));
    drop(registry.acquire(&trades).expect("idle instance exists"));

    let mut distressed = registry.acquire(&orders).expect("idle instance exists");
    distressed.mark_distressed();
    drop(distressed);

    registry.reap_idle();

    println!("source: {}", registry.source_tag());
    println!("open: {}", gauges.open.load(Ordering::Relaxed));
    println!("idle: {}", gauges.idle.load(Ordering::Relaxed));
    println!("expelled: {}", gauges.expelled.load(Ordering::Relaxed));
}
