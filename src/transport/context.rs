//! Browsing-context abstractions.
//!
//! These traits are the seam between the channel and whatever actually hosts
//! the documents: a browser binding, or the in-process [`loopback`](super::loopback)
//! implementation.
//!
//! | Trait | Browser counterpart |
//! |-------|---------------------|
//! | [`BrowsingContext`] | a `WindowProxy` (popup window, iframe `contentWindow`, `opener`, `parent`) |
//! | [`Element`] | a DOM element (container or `<iframe>`) |
//! | [`HostWindow`] | the host page's own `window` + `document` |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::identifiers::ContextId;

use super::MessageSurface;

// ============================================================================
// Constants
// ============================================================================

/// Target origin that matches any receiving document.
pub const WILDCARD_ORIGIN: &str = "*";

// ============================================================================
// BrowsingContext
// ============================================================================

/// A postable destination.
pub trait BrowsingContext: Send + Sync {
    /// Identity of the context this handle posts into.
    ///
    /// Messages the context posts carry the same ID as their
    /// [`source`](super::MessageEvent::source).
    fn id(&self) -> ContextId;

    /// Posts a message.
    ///
    /// The receiving document only sees the message if `target_origin` is
    /// its own origin or [`WILDCARD_ORIGIN`]. Delivery is always asynchronous.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the context is gone.
    fn post_message(&self, message: Value, target_origin: &str) -> Result<()>;

    /// Closes the context (`window.close()`).
    fn close(&self);

    /// Returns `true` once the context has been closed or unloaded.
    fn is_closed(&self) -> bool;
}

// ============================================================================
// Element
// ============================================================================

/// A DOM element that can host the wallet iframe.
pub trait Element: Send + Sync {
    /// Lower-case tag name (`iframe`, `div`, ...).
    fn tag_name(&self) -> String;

    /// Removes every child node.
    fn clear_children(&self);

    /// Creates an `<iframe>`, appends it as last child and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot take children.
    fn append_iframe(&self) -> Result<Arc<dyn Element>>;

    /// Sets an attribute.
    fn set_attribute(&self, name: &str, value: &str);

    /// Reads an attribute.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Sets the navigation source of an iframe and returns its content window.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not an iframe or cannot navigate.
    fn navigate(&self, url: &Url) -> Result<Arc<dyn BrowsingContext>>;

    /// Detaches the element from its parent, unloading any content.
    fn remove(&self);
}

// ============================================================================
// Viewport
// ============================================================================

/// Host window geometry used to center popups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// `window.screenLeft` (or `screenX`).
    pub screen_left: i32,
    /// `window.screenTop` (or `screenY`).
    pub screen_top: i32,
    /// `window.innerWidth`.
    pub inner_width: u32,
    /// `window.innerHeight`.
    pub inner_height: u32,
    /// `window.devicePixelRatio`.
    pub device_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            screen_left: 0,
            screen_top: 0,
            inner_width: 1280,
            inner_height: 800,
            device_pixel_ratio: 1.0,
        }
    }
}

// ============================================================================
// HostWindow
// ============================================================================

/// The host page: its `message` surface, geometry, popup opener and DOM.
pub trait HostWindow: Send + Sync {
    /// The host window's `message` event target.
    fn message_surface(&self) -> Arc<MessageSurface>;

    /// Current window geometry.
    fn viewport(&self) -> Viewport;

    /// Opens a new top-level browsing context (`window.open`).
    ///
    /// # Errors
    ///
    /// Returns an error if the popup was blocked or could not be created.
    fn open(&self, url: &Url, name: &str, features: &str) -> Result<Arc<dyn BrowsingContext>>;

    /// Looks up an element by ID (`document.getElementById`).
    fn element_by_id(&self, id: &str) -> Option<Arc<dyn Element>>;
}
