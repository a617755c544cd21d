//! Builder pattern for channel configuration.
//!
//! Provides a fluent API for configuring and opening [`WalletClient`] channels.
//! Everything is validated at the terminal call, before any browsing context
//! is created.
//!
//! # Example
//!
//! ```ignore
//! use wallet_bridge::WalletClient;
//!
//! let client = WalletClient::builder()
//!     .wallet_app_url("https://wallet.example/app")
//!     .target_id("wallet")
//!     .marketplace_id("iq__market")
//!     .dark_mode(true)
//!     .frame(&*host)
//!     .await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{DEFAULT_POPUP_HEIGHT, DEFAULT_POPUP_WIDTH, Element, FrameTarget, HostWindow};

use super::core::WalletClient;

// ============================================================================
// Constants
// ============================================================================

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default handshake timeout in seconds.
pub const DEFAULT_INIT_TIMEOUT_SECS: u64 = 30;

/// Query parameter enabling dark mode.
const DARK_MODE_PARAM: &str = "dark";

/// Query parameter carrying the marketplace ID.
const MARKETPLACE_ID_PARAM: &str = "mid";

/// Query parameter carrying the marketplace hash.
const MARKETPLACE_HASH_PARAM: &str = "mhash";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a [`WalletClient`] channel.
///
/// Use [`WalletClient::builder()`] to create one.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Wallet application URL.
    wallet_app_url: Option<String>,
    /// Request timeout in seconds.
    timeout: Option<u64>,
    /// Handshake timeout in seconds.
    init_timeout: Option<u64>,
    /// Iframe destination.
    target: Option<FrameTarget>,
    /// Whether to request dark mode.
    dark_mode: bool,
    /// Marketplace object ID.
    marketplace_id: Option<String>,
    /// Marketplace version hash.
    marketplace_hash: Option<String>,
    /// Popup width and height.
    popup_size: Option<(u32, u32)>,
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wallet application URL. Required.
    ///
    /// Its origin becomes the target origin of every request.
    #[inline]
    #[must_use]
    pub fn wallet_app_url(mut self, url: impl Into<String>) -> Self {
        self.wallet_app_url = Some(url.into());
        self
    }

    /// Sets the request timeout in seconds. `0` disables it.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Sets the handshake timeout in seconds. `0` disables it.
    #[inline]
    #[must_use]
    pub fn init_timeout(mut self, secs: u64) -> Self {
        self.init_timeout = Some(secs);
        self
    }

    /// Hosts the wallet in or at `element`.
    #[inline]
    #[must_use]
    pub fn target(mut self, element: Arc<dyn Element>) -> Self {
        self.target = Some(FrameTarget::Element(element));
        self
    }

    /// Hosts the wallet in or at the element with ID `id`.
    #[inline]
    #[must_use]
    pub fn target_id(mut self, id: impl Into<String>) -> Self {
        self.target = Some(FrameTarget::Id(id.into()));
        self
    }

    /// Asks the wallet to start in dark mode.
    #[inline]
    #[must_use]
    pub fn dark_mode(mut self, enabled: bool) -> Self {
        self.dark_mode = enabled;
        self
    }

    /// Preselects a marketplace by ID.
    #[inline]
    #[must_use]
    pub fn marketplace_id(mut self, id: impl Into<String>) -> Self {
        self.marketplace_id = Some(id.into());
        self
    }

    /// Pins the marketplace version hash.
    #[inline]
    #[must_use]
    pub fn marketplace_hash(mut self, hash: impl Into<String>) -> Self {
        self.marketplace_hash = Some(hash.into());
        self
    }

    /// Overrides the popup size (default 500x850).
    #[inline]
    #[must_use]
    pub fn popup_size(mut self, width: u32, height: u32) -> Self {
        self.popup_size = Some((width, height));
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing, unparsable or has no concrete origin
    /// - [`Error::Config`] if the popup size or target ID is empty
    pub fn build(self) -> Result<ClientOptions> {
        let wallet_url = self.validate_url()?;
        self.validate_target()?;

        let popup_size = self
            .popup_size
            .unwrap_or((DEFAULT_POPUP_WIDTH, DEFAULT_POPUP_HEIGHT));
        if popup_size.0 == 0 || popup_size.1 == 0 {
            return Err(Error::config(format!(
                "Popup size must be non-zero, got {}x{}",
                popup_size.0, popup_size.1
            )));
        }

        Ok(ClientOptions {
            wallet_url,
            timeout: Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            init_timeout: Duration::from_secs(
                self.init_timeout.unwrap_or(DEFAULT_INIT_TIMEOUT_SECS),
            ),
            target: self.target,
            popup_size,
        })
    }

    /// Opens the wallet in an iframe and waits for the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if validation fails or no target was set
    /// - [`Error::InvalidTarget`] if the target cannot be resolved
    /// - [`Error::RequestTimeout`] if the handshake does not complete in time
    pub async fn frame(self, host: &dyn HostWindow) -> Result<WalletClient> {
        let options = self.build()?;
        WalletClient::initialize_frame(host, options).await
    }

    /// Opens the wallet in a centered popup and waits for the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if validation fails
    /// - [`Error::RequestTimeout`] if the handshake does not complete in time
    pub async fn popup(self, host: &dyn HostWindow) -> Result<WalletClient> {
        let options = self.build()?;
        WalletClient::initialize_popup(host, options).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Parses the wallet URL and appends the channel query parameters.
    fn validate_url(&self) -> Result<Url> {
        let raw = self.wallet_app_url.as_deref().ok_or_else(|| {
            Error::config(
                "Wallet app URL is required. Use .wallet_app_url() to set it.\n\
                 Example: WalletClient::builder().wallet_app_url(\"https://wallet.example\")",
            )
        })?;

        let mut url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid wallet app URL '{raw}': {e}")))?;

        if !url.origin().is_tuple() {
            return Err(Error::config(format!(
                "Wallet app URL '{raw}' has no concrete origin"
            )));
        }

        {
            let mut query = url.query_pairs_mut();
            if self.dark_mode {
                query.append_pair(DARK_MODE_PARAM, "true");
            }
            if let Some(id) = &self.marketplace_id {
                query.append_pair(MARKETPLACE_ID_PARAM, id);
            }
            if let Some(hash) = &self.marketplace_hash {
                query.append_pair(MARKETPLACE_HASH_PARAM, hash);
            }
        }
        // An empty serializer still leaves a bare `?` behind.
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    /// Rejects an empty target ID.
    fn validate_target(&self) -> Result<()> {
        if let Some(FrameTarget::Id(id)) = &self.target
            && id.trim().is_empty()
        {
            return Err(Error::config("Target element ID must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Validated channel configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    wallet_url: Url,
    timeout: Duration,
    init_timeout: Duration,
    target: Option<FrameTarget>,
    popup_size: (u32, u32),
}

impl ClientOptions {
    /// Navigation URL, query parameters included.
    #[inline]
    #[must_use]
    pub fn wallet_url(&self) -> &Url {
        &self.wallet_url
    }

    /// Serialized wallet origin used as `targetOrigin`.
    #[must_use]
    pub fn target_origin(&self) -> String {
        self.wallet_url.origin().ascii_serialization()
    }

    /// Request timeout, `None` if disabled.
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }

    /// Handshake timeout, `None` if disabled.
    #[inline]
    #[must_use]
    pub fn init_timeout(&self) -> Option<Duration> {
        (!self.init_timeout.is_zero()).then_some(self.init_timeout)
    }

    /// Iframe destination, if configured.
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&FrameTarget> {
        self.target.as_ref()
    }

    /// Popup width and height.
    #[inline]
    #[must_use]
    pub fn popup_size(&self) -> (u32, u32) {
        self.popup_size
    }
}

// ============================================================================
// Tests
// ============================================================================
