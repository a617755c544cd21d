//! Browsing-context transport layer.
//!
//! This module moves JSON envelopes between the host page and the wallet's
//! browsing context with `postMessage` semantics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Host page      │        postMessage           │  Wallet app     │
//! │                 │  ───── target: wallet ─────► │                 │
//! │  WalletClient   │                              │  WalletListener │
//! │  MessageSurface │  ◄──── target: "*" ───────── │  MessageSurface │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `adapter` | Popup / iframe handle owned by the client |
//! | `context` | Traits over windows and DOM elements |
//! | `frame` | Iframe creation and sandboxing |
//! | `loopback` | In-process implementation of the traits |
//! | `popup` | Centered popup geometry |
//! | `surface` | Window-level `message` event target |

// ============================================================================
// Submodules
// ============================================================================

/// Popup / iframe adapter.
pub mod adapter;

/// Window and element traits.
pub mod context;

/// Iframe hosting mode.
pub mod frame;

/// In-process browsing contexts.
pub mod loopback;

/// Popup hosting mode.
pub mod popup;

/// `message` event target.
pub mod surface;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{TransportAdapter, TransportMode};
pub use context::{BrowsingContext, Element, HostWindow, Viewport, WILDCARD_ORIGIN};
pub use frame::{ALLOW_PERMISSIONS, FrameTarget, SANDBOX_PERMISSIONS};
pub use loopback::{EmbeddedContext, LoopbackElement, LoopbackHost, LoopbackWindow, PopupRecord};
pub use popup::{DEFAULT_POPUP_HEIGHT, DEFAULT_POPUP_WIDTH, PopupGeometry};
pub use surface::{MessageEvent, MessageListener, MessageSurface, SenderFilter};
