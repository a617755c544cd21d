//! Popup hosting mode.
//!
//! Opens the wallet in a new top-level window centered over the host window.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::Result;

use super::{BrowsingContext, HostWindow, Viewport};

// ============================================================================
// Constants
// ============================================================================

/// Default popup width in CSS pixels.
pub const DEFAULT_POPUP_WIDTH: u32 = 500;

/// Default popup height in CSS pixels.
pub const DEFAULT_POPUP_HEIGHT: u32 = 850;

/// Browsing-context name passed to `window.open`.
pub const POPUP_NAME: &str = "_blank";

// ============================================================================
// PopupGeometry
// ============================================================================

/// Screen placement of a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    /// Left edge in screen pixels.
    pub left: i32,
    /// Top edge in screen pixels.
    pub top: i32,
    /// Width in screen pixels.
    pub width: u32,
    /// Height in screen pixels.
    pub height: u32,
}

impl PopupGeometry {
    /// Centers a `width` x `height` popup over the host viewport.
    ///
    /// Offsets and size are divided by the device pixel ratio so the popup
    /// keeps its apparent size on zoomed or high-density displays. The popup
    /// never starts left of or above the host window.
    #[must_use]
    pub fn centered(viewport: &Viewport, width: u32, height: u32) -> Self {
        let zoom = if viewport.device_pixel_ratio.is_finite() && viewport.device_pixel_ratio > 0.0
        {
            viewport.device_pixel_ratio
        } else {
            1.0
        };

        let offset_x = (f64::from(viewport.inner_width) - f64::from(width)) / 2.0 / zoom;
        let offset_y = (f64::from(viewport.inner_height) - f64::from(height)) / 2.0 / zoom;

        Self {
            left: viewport.screen_left + offset_x.max(0.0).round() as i32,
            top: viewport.screen_top + offset_y.max(0.0).round() as i32,
            width: (f64::from(width) / zoom).round().max(1.0) as u32,
            height: (f64::from(height) / zoom).round().max(1.0) as u32,
        }
    }

    /// Renders the `window.open` feature string.
    #[must_use]
    pub fn features(&self) -> String {
        format!(
            "scrollbars=yes,width={},height={},top={},left={}",
            self.width, self.height, self.top, self.left
        )
    }
}

// ============================================================================
// Opening
// ============================================================================

/// Opens a centered popup at `url`.
///
/// # Errors
///
/// Propagates the host's failure to open the window.
pub fn open_popup(
    host: &dyn HostWindow,
    url: &Url,
    width: u32,
    height: u32,
) -> Result<Arc<dyn BrowsingContext>> {
    let geometry = PopupGeometry::centered(&host.viewport(), width, height);
    let features = geometry.features();

    debug!(url = %url, %features, "Opening wallet popup");

    host.open(url, POPUP_NAME, &features)
}

// ============================================================================
// Tests
// ============================================================================
