//! Host-side channel.
//!
//! A [`WalletClient`] opens the wallet in a popup or iframe, waits for the
//! `init` handshake, and then exposes the wallet's actions as async methods.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Configuration and validation |
//! | `core` | Channel lifecycle, raw request path, event registration |
//! | `correlation` | Pending requests keyed by request ID |
//! | `events` | Event listener registry and dispatch |
//! | `marketplace` | Items, marketplace, listings, purchases |
//! | `navigation` | Wallet routing |
//! | `profile` | Profile, balances, login |
//! | `ui` | Fire-and-forget chrome toggles |
//!
//! # Example
//!
//! ```ignore
//! let client = WalletClient::builder()
//!     .wallet_app_url("https://wallet.example")
//!     .popup(&*host)
//!     .await?;
//!
//! client.add_event_listener(EventKind::LogIn, |event| {
//!     println!("logged in: {:?}", event.parse());
//!     Ok(())
//! });
//!
//! let items = client.items().await?;
//! client.set_dark_mode(true).await?;
//! client.destroy();
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod builder;
mod core;
mod correlation;
mod events;
mod marketplace;
mod navigation;
mod profile;
mod ui;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, ClientOptions, DEFAULT_INIT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
pub use core::{CLOSE_POLL_INTERVAL, WalletClient};
pub use correlation::{CorrelationRegistry, MAX_PENDING_REQUESTS, PendingResponse};
pub use events::{EventBus, EventCallback, ListenerResult};
