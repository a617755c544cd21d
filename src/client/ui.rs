//! Wallet chrome toggles.
//!
//! All of these are fire-and-forget: they resolve as soon as the request is
//! posted, without waiting for the wallet.

use tracing::debug;

use crate::error::Result;
use crate::protocol::Action;

use super::WalletClient;

// ============================================================================
// WalletClient - UI
// ============================================================================

impl WalletClient {
    /// Shows or hides the wallet navigation bar.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is not ready or posting fails.
    pub async fn toggle_navigation(&self, enabled: bool) -> Result<()> {
        debug!(channel = %self.channel_id(), enabled, "Toggling navigation");
        self.send(Action::ToggleNavigation { enabled }).await?;
        Ok(())
    }

    /// Switches the compact side-panel layout on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is not ready or posting fails.
    pub async fn toggle_side_panel_mode(&self, enabled: bool) -> Result<()> {
        debug!(channel = %self.channel_id(), enabled, "Toggling side-panel mode");
        self.send(Action::ToggleSidePanelMode { enabled }).await?;
        Ok(())
    }

    /// Switches dark mode on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is not ready or posting fails.
    pub async fn set_dark_mode(&self, enabled: bool) -> Result<()> {
        debug!(channel = %self.channel_id(), enabled, "Setting dark mode");
        self.send(Action::SetDarkMode { enabled }).await?;
        Ok(())
    }
}
