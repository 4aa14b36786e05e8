//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::ScaKitError;

/// How long a confirmed, denied or expired authorization stays visible, in seconds.
pub const DEFAULT_FINAL_RETENTION_SECS: u64 = 4;

/// Language tag sent with signed requests when the host does not provide one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Configuration shared by the reconciler and the handshake coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct ScaKitConfig {
    /// Seconds a record in a final state (or flagged expired) remains in the projection.
    pub final_retention_secs: u64,
    /// UI language tag sent with every signed request (e.g. `en`, `ro`).
    pub language: String,
    /// Also require connectivity for `deep_link` and `first_connect` entries.
    /// By default only `connect` and `reconnect` check reachability.
    pub require_connectivity_for_deep_links: bool,
}

impl Default for ScaKitConfig {
    fn default() -> Self {
        Self {
            final_retention_secs: DEFAULT_FINAL_RETENTION_SECS,
            language: DEFAULT_LANGUAGE.to_string(),
            require_connectivity_for_deep_links: false,
        }
    }
}

impl ScaKitConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the JSON cannot be parsed or the language is empty.
    pub fn from_json(json: &str) -> Result<Self, ScaKitError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ScaKitError::InvalidInput {
                attribute: "config".to_string(),
                reason: e.to_string(),
            })?;
        if config.language.trim().is_empty() {
            return Err(ScaKitError::InvalidInput {
                attribute: "language".to_string(),
                reason: "language tag must not be empty".to_string(),
            });
        }
        Ok(config)
    }
}

/// Parses a [`ScaKitConfig`] from JSON for foreign callers.
///
/// # Errors
/// See [`ScaKitConfig::from_json`].
#[uniffi::export]
pub fn config_from_json(json: &str) -> Result<ScaKitConfig, ScaKitError> {
    ScaKitConfig::from_json(json)
}
