//! Error types for the binding layer

use crate::machine::{Fault, Kind};

/// Result type for binding operations
pub type BindResult<T> = Result<T, Error>;

/// Binding layer error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The handle is not bound to a machine
    #[error("attempt to use an invalid handle")]
    InvalidHandle,

    /// A protected call failed inside the machine
    #[error("{message}")]
    Call {
        /// What failed
        fault: Fault,
        /// Error object rendered as text, including the traceback
        message: String,
    },

    /// Table write through a value that is not a table
    #[error("attempt to index a {kind} value")]
    NotIndexable {
        /// Kind of the value that was indexed
        kind: Kind,
    },

    /// Table write with a key the machine cannot store
    #[error("table index is {reason}")]
    InvalidKey {
        /// `"nil"` or `"NaN"`
        reason: &'static str,
    },

    /// A call result could not be converted to the requested type
    #[error("bad result: expected {expected}, got {got}")]
    ResultType {
        /// Requested native type
        expected: &'static str,
        /// Kind of the first result
        got: Kind,
    },
}

impl Error {
    /// Message text for call failures, `None` for other errors
    pub fn call_message(&self) -> Option<&str> {
        match self {
            Error::Call { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::NotIndexable { kind: Kind::Nil };
        assert_eq!(err.to_string(), "attempt to index a nil value");

        let err = Error::InvalidKey { reason: "NaN" };
        assert_eq!(err.to_string(), "table index is NaN");

        let err = Error::ResultType {
            expected: "i64",
            got: Kind::String,
        };
        assert_eq!(err.to_string(), "bad result: expected i64, got string");
    }

    #[test]
    fn test_call_message() {
        let err = Error::Call {
            fault: Fault::Runtime,
            message: "boom\nstack traceback:".to_string(),
        };
        assert_eq!(err.to_string(), "boom\nstack traceback:");
        assert_eq!(err.call_message(), Some("boom\nstack traceback:"));
        assert_eq!(Error::InvalidHandle.call_message(), None);
    }
}
