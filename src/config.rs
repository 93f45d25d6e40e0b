//! Layered configuration, modeled on `veilid_config.rs`'s per-concern section structs
//! (`#[derive(Default, Clone, Serialize, Deserialize)]`), simplified to this crate's
//! single `algorithm`-keyed section instead of veilid's multi-protocol tree.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Hostname;

/// Which of the three interchangeable algorithms (SPEC_FULL.md §2) this node runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlgorithmKind {
    Dv,
    Ls,
    CentralizedController,
    CentralizedMember { controller: Hostname },
}

impl Default for AlgorithmKind {
    fn default() -> Self {
        AlgorithmKind::Dv
    }
}

/// The full configuration surface of a routing-core instance (SPEC_FULL.md §6, §10.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub hostname: Hostname,
    pub update_interval_secs: u64,
    pub timeout_secs: u64,
    pub neighbor_timeout_secs: u64,
    pub max_retry: u32,
    pub algorithm: AlgorithmKind,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            hostname: Hostname::from("localhost"),
            update_interval_secs: 30,
            timeout_secs: 180,
            neighbor_timeout_secs: 10,
            max_retry: 3,
            algorithm: AlgorithmKind::default(),
        }
    }
}

impl RoutingConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn neighbor_timeout(&self) -> Duration {
        Duration::from_secs(self.neighbor_timeout_secs)
    }

    /// Loads configuration by layering, in ascending priority: built-in defaults, an
    /// optional config file (YAML/TOML/JSON, detected by the `config` crate from the
    /// extension), then explicit key=value overrides. Mirrors the layering direction of
    /// `veilid_config.rs`'s config-file-then-callback-overrides approach, collapsed to
    /// this crate's single section.
    pub fn load(
        file: Option<&Path>,
        overrides: &[(&str, &str)],
    ) -> Result<Self, CoreError> {
        let defaults = RoutingConfig::default();
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults)
                .map_err(|e| CoreError::MalformedPayload {
                    reason: format!("invalid built-in defaults: {e}"),
                })?,
        );

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        for (key, value) in overrides {
            builder = builder
                .set_override(*key, *value)
                .map_err(|e| CoreError::MalformedPayload {
                    reason: format!("invalid override {key}={value}: {e}"),
                })?;
        }

        let settled = builder.build().map_err(|e| CoreError::MalformedPayload {
            reason: format!("failed to assemble configuration: {e}"),
        })?;

        settled
            .try_deserialize()
            .map_err(|e| CoreError::MalformedPayload {
                reason: format!("failed to parse configuration: {e}"),
            })
    }
}
