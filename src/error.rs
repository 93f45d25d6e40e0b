use crate::types::Hostname;

/// The core's public error type. Every fallible public entry point returns
/// `Result<_, CoreError>`; nothing in this crate panics on peer- or config-supplied
/// input (SPEC_FULL.md §7, §10.2).
#[derive(thiserror::Error, Debug, Clone)]
pub enum CoreError {
    /// A wire payload failed validation (§7 "Malformed payload"). Logged and dropped by
    /// the caller; never surfaced as a retry or a stored value.
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// A `Neighbors::update`/`delete` exhausted `MAX_RETRY` attempts without an ack.
    #[error("retry exhausted for neighbor {hostname}")]
    RetryExhausted { hostname: Hostname },

    /// `CentralizedMember::receive` needed the direct cost to the controller, but the
    /// controller is not currently a neighbor (SPEC_FULL.md §4.5, §9 open question).
    #[error("controller {controller} is not a direct neighbor")]
    ControllerUnreachable { controller: Hostname },

    /// A link-state computation was asked to operate on a `LinkState` that violates an
    /// internal invariant (e.g. Dijkstra over a DB missing the source's own row). This
    /// should be unreachable given the update ordering the spec mandates; it is typed
    /// rather than `unreachable!()` so a future bug here is recoverable, not a panic.
    #[error("inconsistent link-state database: {reason}")]
    InconsistentLinkState { reason: String },
}
