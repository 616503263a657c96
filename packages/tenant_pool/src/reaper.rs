use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::PoolRegistry;
use crate::constants::ERR_POISONED_LOCK;
use crate::resource::PoolableResource;

/// Background sweep enforcing the idle TTL of a [`PoolRegistry`].
///
/// Owns one worker thread that calls [`PoolRegistry::reap_idle()`] at a fixed
/// interval, independent of request traffic. Dropping the reaper wakes the
/// worker, stops it and joins it.
///
/// A registry works fine without a reaper: embedders that already run a
/// maintenance cycle can piggyback by calling
/// [`PoolRegistry::reap_idle()`] from it instead.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
/// use std::time::Duration;
///
/// use tenant_pool::{PoolRegistry, PoolableResource, Reaper, TableIdentity};
///
/// struct JournalWriter;
///
/// impl PoolableResource for JournalWriter {
///     type Error = Infallible;
///
///     fn reactivate(&mut self) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn rollback(&mut self) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn close(&mut self) {}
/// }
///
/// let registry = PoolRegistry::builder()
///     .factory(|_identity: &TableIdentity, _slot| Ok(JournalWriter))
///     .idle_ttl(Duration::from_secs(30))
///     .build();
///
/// let reaper = Reaper::spawn(registry.clone(), Duration::from_secs(5));
///
/// // ... serve traffic ...
///
/// drop(reaper); // stops and joins the sweep thread
/// ```
#[derive(Debug)]
pub struct Reaper {
    signal: Arc<StopSignal>,
    worker: Option<thread::JoinHandle<()>>,
}

#[derive(Debug)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Reaper {
    /// Spawns the sweep thread for a registry.
    ///
    /// The registry handle is cheap to clone; the reaper keeps its clone alive
    /// for as long as it runs.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to spawn a thread.
    #[must_use]
    pub fn spawn<R: PoolableResource>(registry: PoolRegistry<R>, interval: Duration) -> Self {
        let signal = Arc::new(StopSignal {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let worker_signal = Arc::clone(&signal);

        let worker = thread::Builder::new()
            .name("pool-reaper".to_string())
            .spawn(move || run(&registry, &worker_signal, interval))
            .expect("the operating system refused to spawn the reaper thread");

        Self {
            signal,
            worker: Some(worker),
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        *self.signal.stopped.lock().expect(ERR_POISONED_LOCK) = true;
        self.signal.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            // A worker that panicked already stopped sweeping; there is nothing
            // more to clean up either way.
            drop(worker.join());
        }
    }
}

fn run<R: PoolableResource>(
    registry: &PoolRegistry<R>,
    signal: &StopSignal,
    interval: Duration,
) {
    let mut stopped = signal.stopped.lock().expect(ERR_POISONED_LOCK);

    loop {
        if *stopped {
            return;
        }

        let (guard, wait) = signal
            .wake
            .wait_timeout(stopped, interval)
            .expect(ERR_POISONED_LOCK);
        stopped = guard;

        if *stopped {
            return;
        }

        if wait.timed_out() {
            // Sweep without holding the stop lock; teardown of expired
            // instances can be slow.
            drop(stopped);
            registry.reap_idle();
            stopped = signal.stopped.lock().expect(ERR_POISONED_LOCK);
        }

        // A wakeup without stop or timeout is spurious; wait again.
    }
}
