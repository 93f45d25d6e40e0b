//! A cancellable periodic-tick abstraction.
//!
//! Modeled on the `TickTask` fields and `set_routine`/`.tick()`/`.stop()` usage seen
//! throughout `routing_table/mod.rs` and the `*/tasks/mod.rs` wiring in the teacher
//! codebase; reimplemented standalone here on top of `tokio::spawn` + `tokio::time`
//! since the actual `veilid-tools::TickTask` source was not part of the retrieved pack.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub(crate) type Routine = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct Inner {
    routine: Option<Routine>,
    handle: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

/// A periodic task: set a routine once, then either run it on demand (`run_now`) or arm
/// the recurring schedule (`spawn_periodic`). Re-arming while already running is a
/// no-op, guarding against the double-arming hazard called out in SPEC_FULL.md §9
/// ("only the periodic path arms the timer").
#[derive(Clone)]
pub struct TickTask {
    interval: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl TickTask {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            inner: Arc::new(Mutex::new(Inner {
                routine: None,
                handle: None,
                stop_tx: None,
            })),
        }
    }

    /// Registers the routine to run on each tick. Replaces any previously set routine.
    pub fn set_routine<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let routine: Routine = Arc::new(move || Box::pin(f()));
        self.inner.lock().routine = Some(routine);
    }

    /// Runs the routine exactly once, immediately, independent of the periodic
    /// schedule. Used for triggered updates (SPEC_FULL.md §4.3 step 7) that must not
    /// re-arm or disturb the outstanding periodic timer.
    pub async fn run_now(&self) {
        let routine = self.inner.lock().routine.clone();
        if let Some(routine) = routine {
            routine().await;
        }
    }

    /// Arms the recurring schedule: run the routine, sleep for `interval`, repeat,
    /// until `stop()` is called. A no-op if the schedule is already armed.
    pub fn spawn_periodic(&self) {
        let mut guard = self.inner.lock();
        if guard.handle.is_some() {
            return;
        }
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let inner = self.inner.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            loop {
                let routine = inner.lock().routine.clone();
                if let Some(routine) = routine {
                    routine().await;
                }
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
        guard.handle = Some(handle);
        guard.stop_tx = Some(stop_tx);
    }

    /// Cancels the outstanding periodic schedule, if any, and waits for the spawned
    /// task to finish its current iteration.
    pub async fn stop(&self) {
        let (handle, stop_tx) = {
            let mut guard = self.inner.lock();
            (guard.handle.take(), guard.stop_tx.take())
        };
        if let Some(tx) = stop_tx {
            let _ = tx.send(());
        }
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().handle.is_some()
    }
}
