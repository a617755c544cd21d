//! The wallet application seam.
//!
//! A [`WalletApp`] is whatever actually performs the wallet's side effects.
//! The [`WalletListener`](super::WalletListener) parses incoming requests and
//! calls one method per action; every method defaults to
//! [`Error::Unsupported`], so an application implements only what it offers.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Request Payloads
// ============================================================================

/// Where a `navigate` request points.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    /// A named page with optional parameters.
    Page {
        /// Page name.
        page: String,
        /// Page parameters.
        params: Option<Value>,
    },
    /// A raw route path.
    Path(String),
}

/// Marketplace selection of a `setMarketplace` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceSelection {
    /// Marketplace object ID.
    pub marketplace_id: Option<String>,
    /// Marketplace version hash.
    pub marketplace_hash: Option<String>,
    /// Tenant slug.
    pub tenant_slug: Option<String>,
    /// Marketplace slug.
    pub marketplace_slug: Option<String>,
}

/// A `listItem` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    /// NFT contract address.
    pub contract_address: String,
    /// Token ID within the contract.
    pub token_id: String,
    /// Asking price.
    pub price: f64,
    /// Existing listing to update.
    pub listing_id: Option<String>,
}

/// A `purchase` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Marketplace of the SKU.
    pub marketplace_id: Option<String>,
    /// Marketplace SKU.
    pub sku: Option<String>,
    /// Listing to buy instead of a SKU.
    pub listing_id: Option<String>,
    /// Number of units.
    pub quantity: u32,
}

// ============================================================================
// WalletApp
// ============================================================================

/// Side effects behind each protocol action.
///
/// Return values become the `response` of the reply envelope; errors become
/// its `error` (see [`Error::to_payload`]). Methods for fire-and-forget
/// actions return `()` because nothing is sent back.
#[async_trait]
pub trait WalletApp: Send + Sync + 'static {
    /// `items`
    async fn items(&self) -> Result<Value> {
        Err(Error::unsupported("items"))
    }

    /// `item`
    async fn item(&self, contract_address: &str, token_id: &str) -> Result<Value> {
        let _ = (contract_address, token_id);
        Err(Error::unsupported("item"))
    }

    /// `navigate`
    async fn navigate(&self, target: NavigationTarget) -> Result<Value> {
        let _ = target;
        Err(Error::unsupported("navigate"))
    }

    /// `currentPath`
    async fn current_path(&self) -> Result<String> {
        Err(Error::unsupported("currentPath"))
    }

    /// `setMarketplace`
    async fn set_marketplace(&self, selection: MarketplaceSelection) -> Result<Value> {
        let _ = selection;
        Err(Error::unsupported("setMarketplace"))
    }

    /// `setMarketplaceFilters`
    async fn set_marketplace_filters(&self, filters: Vec<String>) -> Result<Value> {
        let _ = filters;
        Err(Error::unsupported("setMarketplaceFilters"))
    }

    /// `clearMarketplaceFilters`
    async fn clear_marketplace_filters(&self) -> Result<Value> {
        Err(Error::unsupported("clearMarketplaceFilters"))
    }

    /// `userProfile`
    async fn user_profile(&self) -> Result<Value> {
        Err(Error::unsupported("userProfile"))
    }

    /// `balances`
    async fn balances(&self) -> Result<Value> {
        Err(Error::unsupported("balances"))
    }

    /// `logIn`
    async fn log_in(&self) -> Result<Value> {
        Err(Error::unsupported("logIn"))
    }

    /// `logOut`
    async fn log_out(&self) -> Result<Value> {
        Err(Error::unsupported("logOut"))
    }

    /// `listings`
    async fn listings(&self, marketplace_id: Option<String>, filters: Option<Value>) -> Result<Value> {
        let _ = (marketplace_id, filters);
        Err(Error::unsupported("listings"))
    }

    /// `listing`
    async fn listing(&self, listing_id: &str) -> Result<Value> {
        let _ = listing_id;
        Err(Error::unsupported("listing"))
    }

    /// `listItem`
    async fn list_item(&self, draft: ListingDraft) -> Result<Value> {
        let _ = draft;
        Err(Error::unsupported("listItem"))
    }

    /// `removeListing`
    async fn remove_listing(&self, listing_id: &str) -> Result<Value> {
        let _ = listing_id;
        Err(Error::unsupported("removeListing"))
    }

    /// `purchase`
    async fn purchase(&self, request: PurchaseRequest) -> Result<Value> {
        let _ = request;
        Err(Error::unsupported("purchase"))
    }

    /// `claim`
    async fn claim(&self, marketplace_id: &str, sku: &str) -> Result<Value> {
        let _ = (marketplace_id, sku);
        Err(Error::unsupported("claim"))
    }

    /// `toggleNavigation`
    async fn toggle_navigation(&self, enabled: bool) -> Result<()> {
        let _ = enabled;
        Err(Error::unsupported("toggleNavigation"))
    }

    /// `toggleSidePanelMode`
    async fn toggle_side_panel_mode(&self, enabled: bool) -> Result<()> {
        let _ = enabled;
        Err(Error::unsupported("toggleSidePanelMode"))
    }

    /// `setDarkMode`
    async fn set_dark_mode(&self, enabled: bool) -> Result<()> {
        let _ = enabled;
        Err(Error::unsupported("setDarkMode"))
    }
}
