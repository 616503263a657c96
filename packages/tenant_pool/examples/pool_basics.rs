//! Basic pool walkthrough: construct on first use, reuse on the next, tear down
//! on distress.

use std::convert::Infallible;
use std::time::Duration;

use new_zealand::nz;
use tenant_pool::{PoolRegistry, PoolableResource, TableIdentity};

/// Stand-in for an expensive write resource, e.g. a write-ahead-log writer.
struct JournalWriter {
    table: TableIdentity,
    activations: usize,
}

impl PoolableResource for JournalWriter {
    type Error = Infallible;

    fn reactivate(&mut self) -> Result<(), Self::Error> {
        self.activations += 1;
        println!(
            "reactivated writer for {} (activation #{})",
            self.table, self.activations
        );
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn close(&mut self) {
        println!("tore down writer for {}", self.table);
    }
}

fn main() {
    let registry = PoolRegistry::builder()
        .factory(|identity: &TableIdentity, slot| {
            println!("constructing writer for {identity} in slot {slot}");
            Ok(JournalWriter {
                table: identity.clone(),
                activations: 0,
            })
        })
        .max_slots_per_identity(nz!(2))
        .idle_ttl(Duration::from_secs(30))
        .build();

    let trades = TableIdentity::new("trades", 1);

    // First acquisition pays the construction cost.
    let writer = registry.acquire(&trades).expect("capacity is free");
    println!("holding writer for {}", writer.identity());
    drop(writer);

    // The second one reuses the idle instance.
    let writer = registry.acquire(&trades).expect("idle instance exists");
    println!(
        "idle before reuse: {}, live now: {}",
        registry.idle_count(&trades),
        registry.live_count(&trades)
    );
    drop(writer);

    // A distressed instance never re-enters rotation.
    let mut writer = registry.acquire(&trades).expect("idle instance exists");
    writer.mark_distressed();
    drop(writer);
    println!("live after distress: {}", registry.live_count(&trades));

    registry.shutdown();
}
