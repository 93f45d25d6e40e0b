use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque node identifier. Cheap to clone: the string bytes are shared via `Arc`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hostname(Arc<str>);

impl Hostname {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Hostname {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Hostname {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// A non-negative link or path cost, as stored in any table.
///
/// The wire-level `-1` ("remove"/"unreachable") sentinel never reaches this type; see
/// [`WireCost`] for the boundary representation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(pub u64);

impl Cost {
    pub const ZERO: Cost = Cost(0);

    pub fn saturating_add(self, other: Cost) -> Cost {
        Cost(self.0.saturating_add(other.0))
    }
}

impl fmt::Debug for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The wire-level representation of a neighbor cost: any integer in `[-1, i64::MAX]`,
/// where `-1` means "remove this neighbor" and is never stored. Keeping this distinct
/// from [`Cost`] prevents the sentinel from leaking into any stored table (see
/// SPEC_FULL.md §9 "Sentinel -1").
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireCost(pub i64);

impl WireCost {
    pub const REMOVE: WireCost = WireCost(-1);

    /// Validates and converts to a stored [`Cost`], or `None` if the wire value is
    /// the removal sentinel. Returns `Err` if the value is malformed (`< -1`).
    pub fn into_stored(self) -> Result<Option<Cost>, crate::error::CoreError> {
        if self.0 < -1 {
            return Err(crate::error::CoreError::MalformedPayload {
                reason: format!("cost {} is less than -1", self.0),
            });
        }
        if self.0 == -1 {
            return Ok(None);
        }
        Ok(Some(Cost(self.0 as u64)))
    }
}

impl From<Cost> for WireCost {
    fn from(c: Cost) -> Self {
        WireCost(c.0 as i64)
    }
}

/// A single routing table entry: where to forward, and at what cost.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub next_hop: Hostname,
    pub cost: Cost,
}

impl RoutingEntry {
    pub fn new(next_hop: Hostname, cost: Cost) -> Self {
        Self { next_hop, cost }
    }
}
