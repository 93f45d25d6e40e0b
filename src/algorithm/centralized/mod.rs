//! The centralized variant (SPEC_FULL.md §4.5, §4.6): LS duties split between a
//! controller, which aggregates and redistributes the global link-state database, and
//! members, which report their own adjacency and run Dijkstra locally against whatever
//! the controller last sent.
//!
//! Per SPEC_FULL.md §9 ("`CentralizedMember` reuses LS's Dijkstra and routing-derivation
//! helpers"), [`Member`] calls straight into [`super::ls::Ls::recompute_and_publish`]
//! rather than duplicating it.

pub mod controller;
pub mod member;

pub use controller::Controller;
pub use member::Member;
