//! Error types for scopevars.
//!
//! Store operations are total except for token resets against a variable the
//! registry has never seen. Everything else in this module covers the ambient
//! setup around the store.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for scopevars operations.
#[derive(Debug, Error)]
pub enum ScopevarsError {
    /// A token was reset against a variable that was never registered.
    #[error("{0}")]
    UnknownVariable(#[from] UnknownVariableError),

    /// The tracing subscriber could not be installed.
    #[error("Subscriber error: {0}")]
    Subscriber(String),
}

impl ScopevarsError {
    /// Creates a subscriber error.
    #[must_use]
    pub fn subscriber(message: impl Into<String>) -> Self {
        Self::Subscriber(message.into())
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        match self {
            Self::UnknownVariable(err) => err.to_dict(),
            Self::Subscriber(message) => {
                let mut map = HashMap::new();
                map.insert("type".to_string(), serde_json::json!("SubscriberError"));
                map.insert("message".to_string(), serde_json::json!(message));
                map
            }
        }
    }
}

/// Error raised when resetting a key whose variable does not exist.
///
/// Tokens only come from `set`, so hitting this means the caller paired a
/// token with the wrong prefix or key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown context variable: '{name}' was never registered")]
pub struct UnknownVariableError {
    /// The fully-qualified variable name.
    pub name: String,
}

impl UnknownVariableError {
    /// Creates a new unknown variable error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("UnknownVariable"));
        map.insert("name".to_string(), serde_json::json!(self.name));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variable_message() {
        let err = UnknownVariableError::new("log_request_id");
        assert!(err.to_string().contains("log_request_id"));
    }

    #[test]
    fn test_unknown_variable_to_dict() {
        let dict = UnknownVariableError::new("task_x").to_dict();

        assert_eq!(dict.get("type").unwrap(), "UnknownVariable");
        assert_eq!(dict.get("name").unwrap(), "task_x");
    }

    #[test]
    fn test_scopevars_error_from_unknown_variable() {
        let err: ScopevarsError = UnknownVariableError::new("log_a").into();

        assert!(matches!(err, ScopevarsError::UnknownVariable(_)));
        assert_eq!(err.to_dict().get("name").unwrap(), "log_a");
    }

    #[test]
    fn test_subscriber_error_to_dict() {
        let err = ScopevarsError::subscriber("already set");
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "SubscriberError");
        assert!(err.to_string().contains("already set"));
    }
}
