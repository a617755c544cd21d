//! Iframe hosting mode.
//!
//! Ensures an `<iframe>` exists at the requested destination, applies the
//! fixed sandbox and permission policy, and points it at the wallet.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

use super::{BrowsingContext, Element, HostWindow};

// ============================================================================
// Constants
// ============================================================================

/// Sandbox tokens applied to the wallet iframe.
pub const SANDBOX_PERMISSIONS: &[&str] = &[
    "allow-downloads",
    "allow-scripts",
    "allow-forms",
    "allow-modals",
    "allow-pointer-lock",
    "allow-orientation-lock",
    "allow-popups",
    "allow-popups-to-escape-sandbox",
    "allow-presentation",
    "allow-same-origin",
    "allow-downloads-without-user-activation",
    "allow-storage-access-by-user-activation",
];

/// Permissions policy (`allow` attribute) applied to the wallet iframe.
pub const ALLOW_PERMISSIONS: &str = "encrypted-media *; fullscreen *; autoplay *; clipboard-write";

// ============================================================================
// FrameTarget
// ============================================================================

/// Where the wallet iframe should live.
#[derive(Clone)]
pub enum FrameTarget {
    /// A concrete element: used directly if it is an iframe, otherwise its
    /// children are replaced by a new iframe.
    Element(Arc<dyn Element>),
    /// The ID of such an element in the host document.
    Id(String),
}

impl fmt::Debug for FrameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => f
                .debug_tuple("Element")
                .field(&element.tag_name())
                .finish(),
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
        }
    }
}

impl FrameTarget {
    /// Resolves the target to an element in the host document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if no element has the given ID.
    pub fn resolve(&self, host: &dyn HostWindow) -> Result<Arc<dyn Element>> {
        match self {
            Self::Element(element) => Ok(Arc::clone(element)),
            Self::Id(id) => host
                .element_by_id(id)
                .ok_or_else(|| Error::invalid_target(format!("no element with id '{id}'"))),
        }
    }
}

// ============================================================================
// Frame Preparation
// ============================================================================

/// Returns an iframe at `target`, creating one if needed, with the sandbox
/// and permissions policy applied.
///
/// # Errors
///
/// - [`Error::InvalidTarget`] if the target cannot be resolved
/// - any error from creating the iframe
pub fn prepare_frame(host: &dyn HostWindow, target: &FrameTarget) -> Result<Arc<dyn Element>> {
    let element = target.resolve(host)?;

    let frame = if element.tag_name().eq_ignore_ascii_case("iframe") {
        element
    } else {
        debug!(tag = %element.tag_name(), "Replacing target children with wallet iframe");
        element.clear_children();
        element.append_iframe()?
    };

    frame.set_attribute("sandbox", &SANDBOX_PERMISSIONS.join(" "));
    frame.set_attribute("allow", ALLOW_PERMISSIONS);
    frame.set_attribute("allowfullscreen", "");

    Ok(frame)
}

/// Prepares the iframe and navigates it to `url`.
///
/// # Errors
///
/// See [`prepare_frame`]; also propagates navigation failures.
pub fn open_frame(
    host: &dyn HostWindow,
    target: &FrameTarget,
    url: &Url,
) -> Result<(Arc<dyn Element>, Arc<dyn BrowsingContext>)> {
    let frame = prepare_frame(host, target)?;
    let window = frame.navigate(url)?;

    debug!(url = %url, "Wallet iframe navigated");

    Ok((frame, window))
}

// ============================================================================
// Tests
// ============================================================================
