//! Wallet navigation methods.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::Action;

use super::WalletClient;

// ============================================================================
// WalletClient - Navigation
// ============================================================================

impl WalletClient {
    /// Navigates the wallet to a named page.
    ///
    /// # Arguments
    ///
    /// * `page` - Page name (e.g. `marketplace`, `item`)
    /// * `params` - Page parameters, if the page takes any
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet rejects the page or the request fails.
    pub async fn navigate(&self, page: &str, params: Option<Value>) -> Result<Value> {
        debug!(channel = %self.channel_id(), page, "Navigating wallet");

        self.send(Action::Navigate {
            page: Some(page.to_string()),
            path: None,
            params,
        })
        .await
    }

    /// Navigates the wallet to a raw route path.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn navigate_path(&self, path: &str) -> Result<Value> {
        debug!(channel = %self.channel_id(), path, "Navigating wallet to path");

        self.send(Action::Navigate {
            page: None,
            path: Some(path.to_string()),
            params: None,
        })
        .await
    }

    /// Gets the wallet's current route path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the wallet answers with something other
    /// than a string.
    pub async fn current_path(&self) -> Result<String> {
        let response = self.send(Action::CurrentPath {}).await?;

        response
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::protocol(format!("currentPath returned {response}")))
    }
}
