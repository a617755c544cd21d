//! `postMessage` protocol message types.
//!
//! This module defines the message format for communication between the
//! host page (client) and the embedded wallet application (listener).
//!
//! # Protocol Overview
//!
//! | Envelope | Direction | Purpose |
//! |----------|-----------|---------|
//! | `Request` | Host → Wallet | Action request |
//! | `Response` | Wallet → Host | Action result or error, plus the `init` handshake |
//! | `Event` | Wallet → Host | Unsolicited notification |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Closed set of actions |
//! | `envelope` | Envelope types and sanitizing |
//! | `event` | Event kinds and typed payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Action definitions.
pub mod action;

/// Envelope message types.
pub mod envelope;

/// Event kinds and payloads.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{ACTION_NAMES, Action};
pub use envelope::{
    EVENT_TYPE, Envelope, EventEnvelope, REQUEST_TYPE, RESPONSE_TYPE, RequestEnvelope,
    ResponseEnvelope, sanitize,
};
pub use event::{EventKind, ParsedEvent, WalletEvent};
