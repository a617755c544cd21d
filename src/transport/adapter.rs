//! Uniform handle over the two hosting modes.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};
use url::Url;

use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::Envelope;

use super::frame::{FrameTarget, open_frame};
use super::popup::open_popup;
use super::{BrowsingContext, Element, HostWindow};

// ============================================================================
// TransportMode
// ============================================================================

/// How the wallet is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// A new top-level window.
    Popup,
    /// An iframe in the host document.
    Frame,
}

// ============================================================================
// TransportAdapter
// ============================================================================

/// Owns the wallet's browsing context and knows how to close it.
pub enum TransportAdapter {
    /// Wallet opened with `window.open`.
    Popup {
        /// The popup window.
        window: Arc<dyn BrowsingContext>,
    },
    /// Wallet loaded into an iframe.
    Frame {
        /// The iframe element.
        frame: Arc<dyn Element>,
        /// The iframe's content window.
        window: Arc<dyn BrowsingContext>,
    },
}

impl fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("mode", &self.mode())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl TransportAdapter {
    /// Opens the wallet in a centered popup.
    ///
    /// # Errors
    ///
    /// Propagates the host's failure to open the window.
    pub fn popup(host: &dyn HostWindow, url: &Url, size: (u32, u32)) -> Result<Self> {
        let window = open_popup(host, url, size.0, size.1)?;
        Ok(Self::Popup { window })
    }

    /// Loads the wallet into an iframe at `target`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTarget`](crate::Error::InvalidTarget) if the target cannot be resolved
    /// - any error from creating or navigating the iframe
    pub fn frame(host: &dyn HostWindow, target: &FrameTarget, url: &Url) -> Result<Self> {
        let (frame, window) = open_frame(host, target, url)?;
        Ok(Self::Frame { frame, window })
    }

    /// Returns the hosting mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        match self {
            Self::Popup { .. } => TransportMode::Popup,
            Self::Frame { .. } => TransportMode::Frame,
        }
    }

    /// Returns the postable wallet window.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Arc<dyn BrowsingContext> {
        match self {
            Self::Popup { window } | Self::Frame { window, .. } => window,
        }
    }

    /// Returns the identity of the wallet window.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> ContextId {
        self.target().id()
    }

    /// Posts an envelope to the wallet window.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or posting fails.
    pub fn post(&self, envelope: &Envelope, target_origin: &str) -> Result<()> {
        let message = envelope.to_message()?;
        trace!(mode = ?self.mode(), target_origin, "Posting envelope");
        self.target().post_message(message, target_origin)
    }

    /// Returns `true` once the wallet window is gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.target().is_closed()
    }

    /// Releases the browsing context.
    ///
    /// Popups are closed; iframes are removed from their parent.
    pub fn close(&self) {
        debug!(mode = ?self.mode(), "Closing wallet browsing context");
        match self {
            Self::Popup { window } => window.close(),
            Self::Frame { frame, .. } => frame.remove(),
        }
    }
}
