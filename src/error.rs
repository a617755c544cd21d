//! Error types for the wallet bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wallet_bridge::{Result, WalletClient};
//!
//! async fn example(client: &WalletClient) -> Result<()> {
//!     let items = client.items().await?;
//!     println!("{items}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidTarget`] |
//! | Protocol | [`Error::UnknownAction`], [`Error::UnknownEvent`], [`Error::InvalidArgument`], [`Error::Protocol`], [`Error::Unsupported`] |
//! | Timeout | [`Error::RequestTimeout`] |
//! | Remote | [`Error::Remote`] |
//! | Lifecycle | [`Error::InvalidState`], [`Error::ChannelClosed`], [`Error::Transport`] |
//! | External | [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;

use crate::identifiers::RequestId;
use crate::state::ChannelState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The iframe destination could not be resolved.
    #[error("Invalid target element: {message}")]
    InvalidTarget {
        /// Description of the target problem.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Action name not part of the protocol.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The unrecognized action name.
        action: String,
    },

    /// Event kind not part of the protocol.
    #[error("Unknown event: {event} (expected one of: {expected})")]
    UnknownEvent {
        /// The unrecognized event key.
        event: String,
        /// Comma-separated list of valid event keys.
        expected: String,
    },

    /// Invalid argument in action params.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The wallet application does not implement this action.
    #[error("Unsupported action: {action}")]
    Unsupported {
        /// The action name.
        action: String,
    },

    // ========================================================================
    // Timeout Errors
    // ========================================================================
    /// Request timeout.
    ///
    /// Returned when no response envelope arrives before the deadline.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The wallet application answered with an `error` payload.
    #[error("Wallet error: {}", describe_remote(.error))]
    Remote {
        /// Raw error payload from the response envelope.
        error: Value,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation not permitted in the current channel state.
    #[error("Invalid channel state: {state} ({operation})")]
    InvalidState {
        /// Current state of the channel.
        state: ChannelState,
        /// Operation that was attempted.
        operation: String,
    },

    /// The channel was destroyed before the operation completed.
    #[error("Channel closed")]
    ChannelClosed,

    /// Posting to the browsing context failed.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Renders a remote error payload for display.
fn describe_remote(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid target error.
    #[inline]
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates an unknown event error.
    #[inline]
    pub fn unknown_event(event: impl Into<String>, expected: &[&str]) -> Self {
        Self::UnknownEvent {
            event: event.into(),
            expected: expected.join(", "),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unsupported action error.
    #[inline]
    pub fn unsupported(action: impl Into<String>) -> Self {
        Self::Unsupported {
            action: action.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a remote error from a response `error` payload.
    #[inline]
    pub fn remote(error: Value) -> Self {
        Self::Remote { error }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(state: ChannelState, operation: impl Into<String>) -> Self {
        Self::InvalidState {
            state,
            operation: operation.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Conversion
// ============================================================================

impl Error {
    /// Converts this error into the payload carried by a response envelope.
    ///
    /// Remote errors pass through unchanged so a relayed failure keeps its shape.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Remote { error } => error.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidTarget { .. })
    }

    /// Returns `true` if the channel or its browsing context is gone.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::ChannelClosed | Self::Transport { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. }
                | Self::Remote { .. }
                | Self::UnknownAction { .. }
                | Self::UnknownEvent { .. }
                | Self::InvalidArgument { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_config_error() {
        let err = Error::config("wallet app url is required");
        assert_eq!(
            err.to_string(),
            "Configuration error: wallet app url is required"
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn test_request_timeout_names_request() {
        let err = Error::request_timeout(RequestId::sequence(7), 1000);
        assert_eq!(err.to_string(), "Request action-7 timed out after 1000ms");
        assert!(err.is_timeout());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unknown_event_lists_expected() {
        let err = Error::unknown_event("bogus", &["all", "close"]);
        assert_eq!(
            err.to_string(),
            "Unknown event: bogus (expected one of: all, close)"
        );
    }

    #[test]
    fn test_remote_display() {
        assert_eq!(
            Error::remote(json!("Not logged in")).to_string(),
            "Wallet error: Not logged in"
        );
        assert_eq!(
            Error::remote(json!({"message": "Listing sold"})).to_string(),
            "Wallet error: Listing sold"
        );
        assert_eq!(
            Error::remote(json!({"code": 4})).to_string(),
            "Wallet error: {\"code\":4}"
        );
    }

    #[test]
    fn test_to_payload() {
        let remote = json!({"status": 500});
        assert_eq!(Error::remote(remote.clone()).to_payload(), remote);
        assert_eq!(
            Error::unknown_action("fly").to_payload(),
            json!("Unknown action: fly")
        );
    }

    #[test]
    fn test_is_transport_error() {
        assert!(Error::ChannelClosed.is_transport_error());
        assert!(Error::transport("context closed").is_transport_error());
        assert!(!Error::config("test").is_transport_error());
        assert!(!Error::ChannelClosed.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
