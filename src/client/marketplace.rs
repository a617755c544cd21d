//! Marketplace, listing and purchase methods.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::Action;

use super::WalletClient;

// ============================================================================
// WalletClient - Items
// ============================================================================

impl WalletClient {
    /// Lists items owned by the current user.
    pub async fn items(&self) -> Result<Value> {
        self.send(Action::Items {}).await
    }

    /// Looks up one owned item.
    ///
    /// # Arguments
    ///
    /// * `contract_address` - NFT contract address
    /// * `token_id` - Token ID within the contract
    pub async fn item(&self, contract_address: &str, token_id: &str) -> Result<Value> {
        self.send(Action::Item {
            contract_address: contract_address.to_string(),
            token_id: token_id.to_string(),
        })
        .await
    }
}

// ============================================================================
// WalletClient - Marketplace
// ============================================================================

impl WalletClient {
    /// Selects the active marketplace by ID, optionally pinned to a version hash.
    pub async fn set_marketplace(&self, marketplace_id: &str, hash: Option<&str>) -> Result<Value> {
        debug!(channel = %self.channel_id(), marketplace_id, "Setting marketplace");

        self.send(Action::SetMarketplace {
            marketplace_id: Some(marketplace_id.to_string()),
            marketplace_hash: hash.map(str::to_string),
            tenant_slug: None,
            marketplace_slug: None,
        })
        .await
    }

    /// Selects the active marketplace by tenant and marketplace slug.
    pub async fn set_marketplace_by_slug(
        &self,
        tenant_slug: &str,
        marketplace_slug: &str,
    ) -> Result<Value> {
        debug!(channel = %self.channel_id(), tenant_slug, marketplace_slug, "Setting marketplace");

        self.send(Action::SetMarketplace {
            marketplace_id: None,
            marketplace_hash: None,
            tenant_slug: Some(tenant_slug.to_string()),
            marketplace_slug: Some(marketplace_slug.to_string()),
        })
        .await
    }

    /// Restricts the storefront to `filters`.
    pub async fn set_marketplace_filters<I, S>(&self, filters: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(Action::SetMarketplaceFilters {
            filters: filters.into_iter().map(Into::into).collect(),
        })
        .await
    }

    /// Removes all storefront filters.
    pub async fn clear_marketplace_filters(&self) -> Result<Value> {
        self.send(Action::ClearMarketplaceFilters {}).await
    }
}

// ============================================================================
// WalletClient - Listings
// ============================================================================

impl WalletClient {
    /// Lists active listings, optionally limited to one marketplace.
    pub async fn listings(&self, marketplace_id: Option<&str>, filters: Option<Value>) -> Result<Value> {
        self.send(Action::Listings {
            marketplace_id: marketplace_id.map(str::to_string),
            filters,
        })
        .await
    }

    /// Looks up one listing.
    pub async fn listing(&self, listing_id: &str) -> Result<Value> {
        self.send(Action::Listing {
            listing_id: listing_id.to_string(),
        })
        .await
    }

    /// Lists an owned item for sale, or reprices an existing listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `price` is not a positive number.
    pub async fn list_item(
        &self,
        contract_address: &str,
        token_id: &str,
        price: f64,
        listing_id: Option<&str>,
    ) -> Result<Value> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::invalid_argument(format!(
                "listing price must be positive, got {price}"
            )));
        }

        debug!(channel = %self.channel_id(), contract_address, token_id, price, "Listing item");

        self.send(Action::ListItem {
            contract_address: contract_address.to_string(),
            token_id: token_id.to_string(),
            price,
            listing_id: listing_id.map(str::to_string),
        })
        .await
    }

    /// Removes a listing.
    pub async fn remove_listing(&self, listing_id: &str) -> Result<Value> {
        debug!(channel = %self.channel_id(), listing_id, "Removing listing");

        self.send(Action::RemoveListing {
            listing_id: listing_id.to_string(),
        })
        .await
    }
}

// ============================================================================
// WalletClient - Purchases
// ============================================================================

impl WalletClient {
    /// Purchases `quantity` units of a marketplace SKU.
    ///
    /// Waits for the user with no timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `quantity` is zero.
    pub async fn purchase(&self, marketplace_id: &str, sku: &str, quantity: u32) -> Result<Value> {
        if quantity == 0 {
            return Err(Error::invalid_argument("purchase quantity must be at least 1"));
        }

        debug!(channel = %self.channel_id(), marketplace_id, sku, quantity, "Purchasing");

        self.send(Action::Purchase {
            marketplace_id: Some(marketplace_id.to_string()),
            sku: Some(sku.to_string()),
            listing_id: None,
            quantity,
        })
        .await
    }

    /// Purchases a listing.
    ///
    /// Waits for the user with no timeout.
    pub async fn purchase_listing(&self, listing_id: &str) -> Result<Value> {
        debug!(channel = %self.channel_id(), listing_id, "Purchasing listing");

        self.send(Action::Purchase {
            marketplace_id: None,
            sku: None,
            listing_id: Some(listing_id.to_string()),
            quantity: 1,
        })
        .await
    }

    /// Claims a free marketplace SKU.
    ///
    /// Waits for the user with no timeout.
    pub async fn claim(&self, marketplace_id: &str, sku: &str) -> Result<Value> {
        debug!(channel = %self.channel_id(), marketplace_id, sku, "Claiming");

        self.send(Action::Claim {
            marketplace_id: marketplace_id.to_string(),
            sku: sku.to_string(),
        })
        .await
    }
}
