//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use skylink_config::ConfigError;
use skylink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Scenario ─────────────────────────────────────────────────────

    #[error("Could not read scenario {}", path.display())]
    #[diagnostic(code(skylink::scenario_unreadable), help("Check that the file exists and is readable."))]
    ScenarioUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scenario {} is not valid TOML", path.display())]
    #[diagnostic(
        code(skylink::scenario_syntax),
        help(
            "Scenarios declare [[drone]] and [[remote_control]] tables, then [[step]] tables \
             with an `action` field."
        )
    )]
    ScenarioSyntax {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Invalid scenario: {reason}")]
    #[diagnostic(code(skylink::scenario_invalid))]
    InvalidScenario { reason: String },

    #[error("Unknown connector '{raw}'")]
    #[diagnostic(
        code(skylink::connector),
        help("Connectors are one of: usb, wifi, ble, unknown, rc:<remote-control uid>")
    )]
    InvalidConnector { raw: String },

    #[error("Step {step} refers to unknown device '{uid}'")]
    #[diagnostic(
        code(skylink::device_not_found),
        help("Declare the device in a [[drone]] or [[remote_control]] table, and do not use it after a `remove` step.")
    )]
    DeviceNotFound { step: usize, uid: String },

    // ── Config ───────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(skylink::config),
        help("Run `skylink config path` to see which file is loaded.")
    )]
    Config(#[from] ConfigError),

    // ── Core ─────────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(skylink::core))]
    Core(#[from] CoreError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(skylink::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(skylink::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ScenarioUnreadable { .. } | Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::ScenarioSyntax { .. }
            | Self::InvalidScenario { .. }
            | Self::InvalidConnector { .. } => exit_code::USAGE,
            Self::Config(_) => exit_code::CONFIG,
            Self::Core(_) | Self::Io(_) | Self::Json(_) | Self::Toml(_) => exit_code::GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_errors_are_usage_errors() {
        let err = CliError::InvalidConnector { raw: "lora".into() };
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert_eq!(err.to_string(), "Unknown connector 'lora'");
    }

    #[test]
    fn missing_device_maps_to_not_found() {
        let err = CliError::DeviceNotFound {
            step: 3,
            uid: "d9".into(),
        };
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("Step 3"));
    }

    #[test]
    fn core_errors_are_general_failures() {
        let err = CliError::from(CoreError::DeviceAlreadyPresent { uid: "d1".into() });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
