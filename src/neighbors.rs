//! Neighbors (SPEC_FULL.md §4.1): direct-link cost bookkeeping plus reliable,
//! retried, acknowledged unicast cost mutation.
//!
//! Structured as an `Inner`/`UnlockedInner` pair behind one cloneable handle, the same
//! split used throughout the teacher codebase (see `attachment_manager.rs`): `Inner`
//! holds everything that changes and lives behind one `parking_lot::Mutex`;
//! `UnlockedInner` holds the config and the transport handle, which never change after
//! construction and so need no lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::time::{Clock, SystemClock};
use crate::transport::{MessageHandler, NeighborStorage, Payload, Transport};
use crate::types::{Cost, Hostname, WireCost};

/// Invoked exactly once when a reliable cost mutation either acks or exhausts retries.
pub type SuccessCallback = Box<dyn FnOnce() + Send>;
pub type FailCallback = Box<dyn FnOnce() + Send>;

/// Invoked whenever the neighbor table changes; `None` cost means the neighbor was
/// removed. Used by the Algorithm layer to shortcut routing entries (SPEC_FULL.md §4.2).
pub type UpdateCallback = Arc<dyn Fn(Hostname, Option<Cost>) + Send + Sync>;

struct PendingEntry {
    /// Decremented on every timer fire; the attempt is abandoned at zero.
    remaining_attempts: u32,
    cost: WireCost,
    on_success: Option<SuccessCallback>,
    on_fail: Option<FailCallback>,
    /// Cancels the currently-armed retry timer for this attempt chain.
    cancel: Option<oneshot::Sender<()>>,
}

struct Inner {
    pending: HashMap<Hostname, PendingEntry>,
    update_callbacks: Vec<UpdateCallback>,
}

struct UnlockedInner {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn NeighborStorage>,
    clock: Arc<dyn Clock>,
    max_retry: u32,
    neighbor_timeout: Duration,
}

/// A cloneable handle to the Neighbors component. Cloning shares the same underlying
/// state; this is how the Algorithm layer and the dispatcher both get a reference
/// without this crate owning any global registry.
#[derive(Clone)]
pub struct Neighbors {
    inner: Arc<Mutex<Inner>>,
    unlocked_inner: Arc<UnlockedInner>,
}

impl Neighbors {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn NeighborStorage>,
        max_retry: u32,
        neighbor_timeout: Duration,
    ) -> Self {
        Self::new_with_clock(
            transport,
            storage,
            max_retry,
            neighbor_timeout,
            Arc::new(SystemClock),
        )
    }

    pub fn new_with_clock(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn NeighborStorage>,
        max_retry: u32,
        neighbor_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: HashMap::new(),
                update_callbacks: Vec::new(),
            })),
            unlocked_inner: Arc::new(UnlockedInner {
                transport,
                storage,
                clock,
                max_retry,
                neighbor_timeout,
            }),
        }
    }

    /// Registers a callback invoked whenever the neighbor table changes.
    pub fn on_update(&self, cb: UpdateCallback) {
        self.inner.lock().update_callbacks.push(cb);
    }

    /// Registers this component with the dispatcher under the `neighbor` tag
    /// (SPEC_FULL.md §4.1, §6), mirroring the way `Algorithm::start` registers under
    /// `algorithm`.
    pub fn register(&self, dispatcher: &dyn crate::transport::Dispatcher) {
        dispatcher.register("neighbor", Arc::new(self.clone()) as Arc<dyn crate::transport::MessageHandler>);
    }

    /// Snapshot enumeration of current neighbor costs (SPEC_FULL.md §4.1 `get()`).
    pub fn get(&self) -> Vec<(Hostname, Cost)> {
        self.unlocked_inner.storage.enumerate()
    }

    /// Handles an inbound `neighbor` payload (SPEC_FULL.md §4.1 `receive`).
    ///
    /// Malformed costs are logged and dropped with no state change and no ack. An
    /// unsolicited update (no pending entry for `source`) is acknowledged by echoing
    /// the cost back. A pending entry for `source` is treated as the ack for that
    /// attempt chain, invoking its success continuation exactly once.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn receive(&self, source: Hostname, wire_cost: WireCost) {
        let stored = match wire_cost.into_stored() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(hostname = %source, raw = wire_cost.0, error = %err, "dropping malformed neighbor cost");
                return;
            }
        };

        let ack_owner = {
            let mut inner = self.inner.lock();
            match inner.pending.remove(&source) {
                Some(mut pending) => {
                    if let Some(cancel) = pending.cancel.take() {
                        let _ = cancel.send(());
                    }
                    pending.on_success.take()
                }
                None => None,
            }
        };

        match ack_owner {
            Some(on_success) => on_success(),
            None => {
                // Unsolicited update: acknowledge by echoing the cost back.
                self.send_neighbor_payload(&source, wire_cost, false).await;
            }
        }

        self.apply_locally(source, stored);
    }

    fn apply_locally(&self, hostname: Hostname, stored: Option<Cost>) {
        match stored {
            Some(cost) => self.unlocked_inner.storage.update(hostname.clone(), cost),
            None => self.unlocked_inner.storage.remove(&hostname),
        }
        let callbacks = self.inner.lock().update_callbacks.clone();
        for cb in callbacks {
            cb(hostname.clone(), stored);
        }
    }

    async fn send_neighbor_payload(&self, hostname: &Hostname, cost: WireCost, is_new: bool) {
        let payload: Payload = serde_json::json!({
            "type": "neighbor",
            "data": { "cost": cost.0 },
        });
        self.unlocked_inner
            .transport
            .send(hostname, payload, is_new)
            .await;
    }

    /// Initiates a reliable unicast of `cost` to `hostname`, retried up to
    /// `MAX_RETRY` times at `NEIGHBOR_TIMEOUT` spacing (SPEC_FULL.md §4.1 `update`). A
    /// second call while an attempt chain is pending overwrites its continuations,
    /// per spec (caller's responsibility to avoid if undesired).
    #[tracing::instrument(level = "debug", skip(self, on_success, on_fail))]
    pub async fn update(
        &self,
        hostname: Hostname,
        cost: Cost,
        on_success: SuccessCallback,
        on_fail: FailCallback,
    ) {
        self.start_attempt_chain(hostname, WireCost::from(cost), on_success, on_fail)
            .await;
    }

    /// `delete(hostname, ...)` is `update(hostname, -1, ...)`, short-circuited if the
    /// neighbor is not currently known (SPEC_FULL.md §4.1 `delete`).
    #[tracing::instrument(level = "debug", skip(self, on_success, on_fail))]
    pub async fn delete(
        &self,
        hostname: Hostname,
        on_success: SuccessCallback,
        on_fail: FailCallback,
    ) {
        if self.unlocked_inner.storage.get_cost(&hostname).is_none() {
            return;
        }
        self.start_attempt_chain(hostname, WireCost::REMOVE, on_success, on_fail)
            .await;
    }

    async fn start_attempt_chain(
        &self,
        hostname: Hostname,
        wire_cost: WireCost,
        on_success: SuccessCallback,
        on_fail: FailCallback,
    ) {
        {
            let mut inner = self.inner.lock();
            if let Some(mut old) = inner.pending.remove(&hostname) {
                if let Some(cancel) = old.cancel.take() {
                    let _ = cancel.send(());
                }
            }
            inner.pending.insert(
                hostname.clone(),
                PendingEntry {
                    // The first send below consumes one of `max_retry` attempts; this
                    // counts the retries still available after it.
                    remaining_attempts: self.unlocked_inner.max_retry.saturating_sub(1),
                    cost: wire_cost,
                    on_success: Some(on_success),
                    on_fail: Some(on_fail),
                    cancel: None,
                },
            );
        }
        self.send_attempt(hostname).await;
    }

    /// Sends one attempt and arms its timer. On fire, the attempt count is
    /// decremented and the send re-issued; on exhaustion the fail continuation runs
    /// exactly once and the pending entry is cleared.
    async fn send_attempt(&self, hostname: Hostname) {
        self.send_neighbor_payload(&hostname, self.pending_cost(&hostname), true)
            .await;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock();
            if let Some(pending) = inner.pending.get_mut(&hostname) {
                pending.cancel = Some(cancel_tx);
            } else {
                // Already resolved (e.g. raced with an ack) between the send above and
                // here; nothing left to arm.
                return;
            }
        }

        let this = self.clone();
        let timeout = self.unlocked_inner.neighbor_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel_rx => {
                    // Ack (or a superseding update) won the race; this attempt is a no-op.
                }
                _ = tokio::time::sleep(timeout) => {
                    this.on_attempt_timeout(hostname).await;
                }
            }
        });
    }

    fn pending_cost(&self, hostname: &Hostname) -> WireCost {
        self.inner
            .lock()
            .pending
            .get(hostname)
            .map(|p| p.cost)
            .unwrap_or(WireCost::REMOVE)
    }

    async fn on_attempt_timeout(&self, hostname: Hostname) {
        let should_retry = {
            let mut inner = self.inner.lock();
            match inner.pending.get_mut(&hostname) {
                Some(pending) => {
                    pending.cancel = None;
                    if pending.remaining_attempts == 0 {
                        false
                    } else {
                        pending.remaining_attempts -= 1;
                        true
                    }
                }
                None => return, // resolved by an ack in the meantime: no-op
            }
        };

        if should_retry {
            self.send_attempt(hostname).await;
            return;
        }

        let on_fail = {
            let mut inner = self.inner.lock();
            inner
                .pending
                .remove(&hostname)
                .and_then(|mut p| p.on_fail.take())
        };
        if let Some(on_fail) = on_fail {
            let err = CoreError::RetryExhausted {
                hostname: hostname.clone(),
            };
            tracing::warn!(hostname = %hostname, error = %err, "retry exhausted");
            on_fail();
        }
    }
}

#[async_trait]
impl MessageHandler for Neighbors {
    /// Decodes a `neighbor`-tagged payload into a [`WireCost`] and dispatches to
    /// [`Neighbors::receive`] (SPEC_FULL.md §4.1, §6). Malformed bodies (missing or
    /// non-numeric `cost`) are logged and dropped, same as an out-of-range cost.
    async fn receive(&self, source: Hostname, payload: Payload) {
        let body: crate::messages::NeighborPayload = match serde_json::from_value(payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(hostname = %source, error = %err, "dropping malformed neighbor payload");
                return;
            }
        };
        Neighbors::receive(self, source, body.cost).await;
    }
}
