//! Engine configuration: stack, call-depth and traceback limits.
//!
//! Loadable from a TOML document; missing keys keep their defaults.
//!
//! ```toml
//! max_stack_slots = 100000
//! max_call_depth = 64
//! traceback_levels = 12
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum evaluation stack size in slots (default: 1_000_000)
    pub max_stack_slots: usize,
    /// Maximum nesting of native calls (default: 200)
    pub max_call_depth: usize,
    /// Maximum frames listed in a traceback before eliding the middle
    /// (default: 22)
    pub traceback_levels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_stack_slots: 1_000_000,
            max_call_depth: 200,
            traceback_levels: 22,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        tracing::debug!(?config, "engine config loaded");
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check that every limit is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_stack_slots == 0 {
            return Err(ConfigError::InvalidLimit {
                field: "max_stack_slots",
                reason: "must be positive",
            });
        }
        if self.max_stack_slots > i32::MAX as usize {
            return Err(ConfigError::InvalidLimit {
                field: "max_stack_slots",
                reason: "must fit in a stack index",
            });
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::InvalidLimit {
                field: "max_call_depth",
                reason: "must be positive",
            });
        }
        if self.traceback_levels < 2 {
            return Err(ConfigError::InvalidLimit {
                field: "traceback_levels",
                reason: "must be at least 2",
            });
        }
        Ok(())
    }
}
