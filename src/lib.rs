//! Wallet Bridge - host↔wallet RPC over browsing-context messaging.
//!
//! This library lets a host page drive an embedded wallet application that
//! lives in a popup window or an iframe, over `postMessage`-style transport.
//!
//! # Architecture
//!
//! The channel follows a client-listener model:
//!
//! - **Host (client)**: opens the wallet, sends requests, receives events
//! - **Wallet (listener)**: serves requests, emits events
//!
//! Key design principles:
//!
//! - Three envelope kinds (request, response, event) discriminated by `type`
//! - Requests correlate to responses strictly by `requestId`
//! - Each pending request owns its own `message` listener and timer
//! - A `close` event from the wallet always tears the channel down
//!
//! # Quick Start
//!
//! ```ignore
//! use wallet_bridge::{EventKind, Result, WalletClient};
//!
//! async fn example(host: &dyn wallet_bridge::HostWindow) -> Result<()> {
//!     let client = WalletClient::builder()
//!         .wallet_app_url("https://wallet.example/app")
//!         .target_id("wallet")
//!         .frame(host)
//!         .await?;
//!
//!     client.add_event_listener(EventKind::LogIn, |event| {
//!         println!("{:?}", event.parse());
//!         Ok(())
//!     });
//!
//!     let items = client.items().await?;
//!     println!("{items}");
//!
//!     client.destroy();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Host side: [`WalletClient`], builder, correlation, events |
//! | [`listener`] | Wallet side: [`WalletListener`], [`WalletApp`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Envelopes, actions and events |
//! | [`state`] | Channel lifecycle |
//! | [`transport`] | Browsing contexts, popup and iframe adapters, loopback |

// ============================================================================
// Modules
// ============================================================================

/// Host-side channel.
///
/// Use [`WalletClient::builder()`] to open one.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for channel entities.
pub mod identifiers;

/// Wallet-side channel.
pub mod listener;

/// Wire message types.
pub mod protocol;

/// Channel lifecycle state machine.
pub mod state;

/// Browsing-context transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientOptions, WalletClient};

// Listener types
pub use listener::{WalletApp, WalletListener};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChannelId, ContextId, ListenerId, RequestId};

// Protocol types
pub use protocol::{Action, EventKind, ParsedEvent, WalletEvent};

// State types
pub use state::ChannelState;

// Transport types
pub use transport::{
    BrowsingContext, Element, FrameTarget, HostWindow, LoopbackHost, MessageSurface,
    TransportMode,
};
