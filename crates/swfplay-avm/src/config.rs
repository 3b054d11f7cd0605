//! Virtual machine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default bytecode version when the container does not say otherwise.
pub const DEFAULT_SWF_VERSION: u8 = 7;

/// Default per-tick action budget.
pub const DEFAULT_MAX_ACTIONS: u64 = 1_000_000;

/// Default nested call bound. Each nested script call costs several
/// interpreter frames, so this stays well inside a 2 MiB thread stack.
pub const DEFAULT_RECURSION_LIMIT: u32 = 64;

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML decoding failed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML encoding failed
    #[error("failed to encode configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Version outside the supported range
    #[error("unsupported bytecode version {0} (expected 1..=10)")]
    UnsupportedVersion(u8),

    /// A recursion limit of zero would refuse every call
    #[error("recursion limit must be at least 1")]
    ZeroRecursionLimit,
}

/// Configuration for one VM context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Bytecode version negotiated by the container
    pub swf_version: u8,

    /// Actions allowed between budget resets; `None` disables the watchdog.
    /// A budget of zero read from TOML also disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<u64>,

    /// Nested call bound
    pub recursion_limit: u32,

    /// Emit a trace event per decoded action
    pub trace_actions: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            swf_version: DEFAULT_SWF_VERSION,
            max_actions: Some(DEFAULT_MAX_ACTIONS),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            trace_actions: false,
        }
    }
}

impl VmConfig {
    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Encodes the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Checks ranges and normalizes a zero budget to "disabled".
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if !(1..=10).contains(&self.swf_version) {
            return Err(ConfigError::UnsupportedVersion(self.swf_version));
        }
        if self.recursion_limit == 0 {
            return Err(ConfigError::ZeroRecursionLimit);
        }
        if self.max_actions == Some(0) {
            self.max_actions = None;
        }
        Ok(self)
    }

    /// Sets the bytecode version.
    pub fn with_version(mut self, version: u8) -> Self {
        self.swf_version = version;
        self
    }

    /// Sets the action budget.
    pub fn with_max_actions(mut self, max_actions: Option<u64>) -> Self {
        self.max_actions = max_actions;
        self
    }

    /// Sets the recursion limit.
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Enables per-action tracing.
    pub fn with_trace_actions(mut self, enabled: bool) -> Self {
        self.trace_actions = enabled;
        self
    }
}
