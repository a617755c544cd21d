//! Event message types.
//!
//! Events are notifications sent from the wallet to the host when something
//! happens inside the embedded context.
//!
//! # Event Kinds
//!
//! | Kind | Key | Payload |
//! |------|-----|---------|
//! | [`EventKind::All`] | `all` | wildcard, subscription only |
//! | [`EventKind::LogIn`] | `log_in` | `{ address }` |
//! | [`EventKind::LogOut`] | `log_out` | none |
//! | [`EventKind::LogInRequested`] | `log_in_requested` | none |
//! | [`EventKind::RouteChange`] | `route_change` | `{ path }` |
//! | [`EventKind::Resize`] | `resize` | `{ width, height }` |
//! | [`EventKind::Close`] | `close` | none |
//! | [`EventKind::Loaded`] | `loaded` | none |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

use super::EventEnvelope;

// ============================================================================
// EventKind
// ============================================================================

/// The closed set of event kinds, plus the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Wildcard: matches every concrete kind.
    #[serde(rename = "all")]
    All,
    /// A user logged in.
    #[serde(rename = "log_in")]
    LogIn,
    /// The user logged out.
    #[serde(rename = "log_out")]
    LogOut,
    /// The wallet wants the host to present login.
    #[serde(rename = "log_in_requested")]
    LogInRequested,
    /// The wallet route changed.
    #[serde(rename = "route_change")]
    RouteChange,
    /// The wallet layout changed size.
    #[serde(rename = "resize")]
    Resize,
    /// The embedded context is going away.
    #[serde(rename = "close")]
    Close,
    /// The wallet finished loading.
    #[serde(rename = "loaded")]
    Loaded,
}

impl EventKind {
    /// Every kind, wildcard first.
    pub const ALL: [Self; 8] = [
        Self::All,
        Self::LogIn,
        Self::LogOut,
        Self::LogInRequested,
        Self::RouteChange,
        Self::Resize,
        Self::Close,
        Self::Loaded,
    ];

    /// Returns the wire key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::LogIn => "log_in",
            Self::LogOut => "log_out",
            Self::LogInRequested => "log_in_requested",
            Self::RouteChange => "route_change",
            Self::Resize => "resize",
            Self::Close => "close",
            Self::Loaded => "loaded",
        }
    }

    /// Returns `true` for the wildcard kind.
    #[inline]
    #[must_use]
    pub const fn is_wildcard(self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns every wire key.
    #[must_use]
    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::unknown_event(s, &Self::keys()))
    }
}

// ============================================================================
// WalletEvent
// ============================================================================

/// An event as delivered to host listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Event payload (`null` if absent).
    pub data: Value,
}

impl WalletEvent {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self { kind, data }
    }

    /// Creates an event without payload.
    #[inline]
    #[must_use]
    pub fn bare(kind: EventKind) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.kind {
            EventKind::All => ParsedEvent::All {
                data: self.data.clone(),
            },
            EventKind::LogIn => ParsedEvent::LogIn {
                address: self.get_string("address"),
            },
            EventKind::LogOut => ParsedEvent::LogOut,
            EventKind::LogInRequested => ParsedEvent::LogInRequested,
            EventKind::RouteChange => ParsedEvent::RouteChange {
                path: self.get_string("path"),
            },
            EventKind::Resize => ParsedEvent::Resize {
                width: self.get_u32("width"),
                height: self.get_u32("height"),
            },
            EventKind::Close => ParsedEvent::Close,
            EventKind::Loaded => ParsedEvent::Loaded,
        }
    }

    /// Gets a string from data.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u32 from data, accepting fractional pixel values.
    #[inline]
    fn get_u32(&self, key: &str) -> u32 {
        self.data
            .get(key)
            .and_then(|v| v.as_f64())
            .map(|v| v.max(0.0).round() as u32)
            .unwrap_or_default()
    }
}

impl TryFrom<EventEnvelope> for WalletEvent {
    type Error = Error;

    fn try_from(envelope: EventEnvelope) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: envelope.kind()?,
            data: envelope.data.unwrap_or(Value::Null),
        })
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Typed event payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// Broadcast sent with the wildcard key.
    All {
        /// Raw payload.
        data: Value,
    },
    /// A user logged in.
    LogIn {
        /// Wallet address of the user.
        address: String,
    },
    /// The user logged out.
    LogOut,
    /// The wallet wants the host to present login.
    LogInRequested,
    /// The wallet route changed.
    RouteChange {
        /// New route path.
        path: String,
    },
    /// The wallet layout changed size.
    Resize {
        /// Width in CSS pixels.
        width: u32,
        /// Height in CSS pixels.
        height: u32,
    },
    /// The embedded context is going away.
    Close,
    /// The wallet finished loading.
    Loaded,
}

// ============================================================================
// Tests
// ============================================================================
