//! Account methods.

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::protocol::Action;

use super::WalletClient;

// ============================================================================
// WalletClient - Profile
// ============================================================================

impl WalletClient {
    /// Gets the current user's profile.
    pub async fn user_profile(&self) -> Result<Value> {
        self.send(Action::UserProfile {}).await
    }

    /// Gets the current user's balances.
    pub async fn balances(&self) -> Result<Value> {
        self.send(Action::Balances {}).await
    }

    /// Starts the wallet login flow.
    ///
    /// Waits for the user with no timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet rejects the login or the channel closes.
    pub async fn log_in(&self) -> Result<Value> {
        debug!(channel = %self.channel_id(), "Requesting login");
        self.send(Action::LogIn {}).await
    }

    /// Logs the current user out.
    pub async fn log_out(&self) -> Result<()> {
        debug!(channel = %self.channel_id(), "Requesting logout");
        self.send(Action::LogOut {}).await?;
        Ok(())
    }
}
