//! `overlay-routing-core`: the routing core of a distributed overlay-routing daemon.
//!
//! A node picks one of three interchangeable algorithms — [`algorithm::dv`] (distance
//! vector), [`algorithm::ls`] (link-state), or the [`algorithm::centralized`] split
//! between a controller and its members — and wires it to a [`neighbors::Neighbors`]
//! instance for direct-link maintenance. All three share the [`algorithm::AlgorithmCore`]
//! lifecycle: locked routing/link-state/alive tables, periodic ticks, and snapshot
//! publication to an externally-owned [`transport::RoutingModel`].
//!
//! The wire transport, the inbound-message dispatcher, the forwarding table, and the
//! `tracing` subscriber are all external collaborators (SPEC_FULL.md §1, §6): this crate
//! only declares the traits it needs from them (see [`transport`]) and never owns a
//! socket, a registry, or a global logger.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod messages;
pub mod neighbors;
pub mod tick_task;
pub mod time;
pub mod transport;
pub mod types;

pub use algorithm::{Algorithm, AlgorithmCore, Variant};
pub use config::{AlgorithmKind, RoutingConfig};
pub use error::CoreError;
pub use neighbors::Neighbors;
pub use types::{Cost, Hostname, RoutingEntry, WireCost};
