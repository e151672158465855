// ── Runtime SDK configuration ──
//
// Plain data handed to the SDK at construction. skylink-core never reads
// configuration files; skylink-config resolves these from disk and env.

use serde::{Deserialize, Serialize};

/// Top-level SDK configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub auto_connection: AutoConnectionConfig,
}

/// Auto-connection engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoConnectionConfig {
    /// Start auto-connection as soon as the engine starts.
    pub at_startup: bool,
}

impl Default for AutoConnectionConfig {
    fn default() -> Self {
        Self { at_startup: true }
    }
}
