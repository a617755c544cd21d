//! Envelope message types.
//!
//! Every message exchanged over `postMessage` is one [`Envelope`],
//! discriminated by its `type` field before any other processing.
//!
//! # Format
//!
//! Host → wallet:
//! ```json
//! { "type": "WalletClientRequest", "requestId": "action-1", "action": "items", "params": {} }
//! ```
//!
//! Wallet → host (response):
//! ```json
//! { "type": "WalletClientResponse", "requestId": "action-1", "response": [] }
//! ```
//!
//! Wallet → host (event):
//! ```json
//! { "type": "WalletEvent", "event": "route_change", "data": { "path": "/items" } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::{Action, EventKind};

// ============================================================================
// Constants
// ============================================================================

/// Discriminator of host → wallet requests.
pub const REQUEST_TYPE: &str = "WalletClientRequest";

/// Discriminator of wallet → host responses.
pub const RESPONSE_TYPE: &str = "WalletClientResponse";

/// Discriminator of wallet → host events.
pub const EVENT_TYPE: &str = "WalletEvent";

// ============================================================================
// Envelope
// ============================================================================

/// One discriminated message exchanged between host and wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Host → wallet request.
    #[serde(rename = "WalletClientRequest")]
    Request(RequestEnvelope),

    /// Wallet → host response.
    #[serde(rename = "WalletClientResponse")]
    Response(ResponseEnvelope),

    /// Wallet → host unsolicited event.
    #[serde(rename = "WalletEvent")]
    Event(EventEnvelope),
}

impl Envelope {
    /// Classifies a raw message.
    ///
    /// Returns `None` for anything that is not one of our envelopes; the
    /// `message` surface is shared with unrelated traffic.
    #[must_use]
    pub fn from_message(data: &Value) -> Option<Self> {
        data.get("type")?.as_str().filter(|kind| {
            matches!(*kind, REQUEST_TYPE | RESPONSE_TYPE | EVENT_TYPE)
        })?;
        Self::deserialize(data).ok()
    }

    /// Serializes the envelope into a postable message through [`sanitize`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_message(&self) -> Result<Value> {
        sanitize(self)
    }
}

impl From<RequestEnvelope> for Envelope {
    fn from(envelope: RequestEnvelope) -> Self {
        Self::Request(envelope)
    }
}

impl From<ResponseEnvelope> for Envelope {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self::Response(envelope)
    }
}

impl From<EventEnvelope> for Envelope {
    fn from(envelope: EventEnvelope) -> Self {
        Self::Event(envelope)
    }
}

// ============================================================================
// RequestEnvelope
// ============================================================================

/// A request from host to wallet.
///
/// Kept in wire form (`action` name + raw `params`) so the wallet can answer
/// unknown actions with an error instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation key.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,

    /// Action name.
    pub action: String,

    /// Action-specific payload.
    #[serde(default)]
    pub params: Value,
}

impl RequestEnvelope {
    /// Creates a request envelope for a typed action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the action params cannot be serialized.
    pub fn new(request_id: RequestId, action: &Action) -> Result<Self> {
        let mut value = sanitize(action)?;
        let params = value
            .get_mut("params")
            .map(Value::take)
            .unwrap_or_else(|| json!({}));

        Ok(Self {
            request_id,
            action: action.name().to_string(),
            params,
        })
    }

    /// Parses the wire action into a typed [`Action`].
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAction`] if the action name is not part of the protocol
    /// - [`Error::InvalidArgument`] if the params do not match the action
    pub fn parse_action(&self) -> Result<Action> {
        if !Action::is_known(&self.action) {
            return Err(Error::unknown_action(&self.action));
        }

        let params = match &self.params {
            Value::Null => json!({}),
            other => other.clone(),
        };

        serde_json::from_value(json!({ "action": self.action, "params": params }))
            .map_err(|e| Error::invalid_argument(format!("{}: {e}", self.action)))
    }
}

// ============================================================================
// ResponseEnvelope
// ============================================================================

/// A response from wallet to host.
///
/// A non-null `error` is authoritative; otherwise `response` is the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Matches the request's `requestId`.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,

    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    /// Error payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(request_id: RequestId, response: Value) -> Self {
        Self {
            request_id,
            response: Some(response),
            error: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(request_id: RequestId, error: Value) -> Self {
        Self {
            request_id,
            response: None,
            error: Some(error),
        }
    }

    /// Creates the readiness handshake response.
    #[inline]
    #[must_use]
    pub fn init() -> Self {
        Self::success(RequestId::init(), Value::Null)
    }

    /// Returns `true` if this response carries an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] carrying the `error` payload if present.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(Error::remote(error)),
            None => Ok(self.response.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// EventEnvelope
// ============================================================================

/// An unsolicited event from wallet to host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event key.
    pub event: String,

    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventEnvelope {
    /// Creates an event envelope.
    #[inline]
    #[must_use]
    pub fn new(kind: EventKind, data: Option<Value>) -> Self {
        Self {
            event: kind.as_str().to_string(),
            data,
        }
    }

    /// Parses the event key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if the key is not part of the protocol.
    pub fn kind(&self) -> Result<EventKind> {
        self.event.parse()
    }
}

// ============================================================================
// Sanitizing
// ============================================================================

/// Converts a payload into a clone-safe message value.
///
/// Values that cannot cross the transport fail here instead of at post time;
/// non-finite floats become `null`.
///
/// # Errors
///
/// Returns [`Error::Json`] if the value cannot be represented.
pub fn sanitize<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

// ============================================================================
// Tests
// ============================================================================
