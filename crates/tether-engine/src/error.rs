//! Engine error types

use crate::value::Value;

/// An error value travelling up through native frames.
///
/// Created when a native function raises; becomes the error object of the
/// innermost protected call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{value}")]
pub struct Raised {
    value: Value,
    state: HandlerState,
}

/// Whether the active message handler has seen the error yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerState {
    Pending,
    Handled,
    Failed,
}

impl Raised {
    /// Raise an arbitrary value
    pub fn new(value: Value) -> Self {
        Self {
            value,
            state: HandlerState::Pending,
        }
    }

    /// The error object
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume into the error object
    pub fn into_value(self) -> Value {
        self.value
    }

    pub(crate) fn state(&self) -> HandlerState {
        self.state
    }

    pub(crate) fn with_state(value: Value, state: HandlerState) -> Self {
        Self { value, state }
    }
}

impl From<&str> for Raised {
    fn from(message: &str) -> Self {
        Raised::new(Value::string(message))
    }
}

impl From<String> for Raised {
    fn from(message: String) -> Self {
        Raised::new(Value::string(&message))
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML or has wrong field types
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A limit is out of range
    #[error("invalid limit `{field}`: {reason}")]
    InvalidLimit {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },
}
