//! Embedded-side channel.
//!
//! Runs inside the wallet application: answers the host's requests through
//! a [`WalletApp`] and reports wallet activity as events.
//!
//! # Example
//!
//! ```ignore
//! struct Wallet;
//!
//! #[async_trait]
//! impl WalletApp for Wallet {
//!     async fn items(&self) -> Result<Value> {
//!         Ok(json!([]))
//!     }
//! }
//!
//! let listener = WalletListener::attach(window.surface(), parent, Wallet)?;
//! listener.notify_log_in("0xabc")?;
//! window.on_unload(move || listener.handle_unload());
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod app;
mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use app::{ListingDraft, MarketplaceSelection, NavigationTarget, PurchaseRequest, WalletApp};
pub use core::WalletListener;
