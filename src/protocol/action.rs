//! Action definitions.
//!
//! Actions are the closed set of operations the host may request from the
//! wallet. On the wire each action is an `action` name plus a `params`
//! object with camelCase fields.
//!
//! # Action Groups
//!
//! | Group | Actions |
//! |-------|---------|
//! | Items | `items`, `item` |
//! | Navigation | `navigate`, `currentPath` |
//! | Marketplace | `setMarketplace`, `setMarketplaceFilters`, `clearMarketplaceFilters` |
//! | Profile | `userProfile`, `balances`, `logIn`, `logOut` |
//! | Listings | `listings`, `listing`, `listItem`, `removeListing`, `purchase`, `claim` |
//! | UI chrome | `toggleNavigation`, `toggleSidePanelMode`, `setDarkMode` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Every action name known to the protocol.
pub const ACTION_NAMES: &[&str] = &[
    "items",
    "item",
    "navigate",
    "currentPath",
    "setMarketplace",
    "setMarketplaceFilters",
    "clearMarketplaceFilters",
    "userProfile",
    "balances",
    "logIn",
    "logOut",
    "listings",
    "listing",
    "listItem",
    "removeListing",
    "purchase",
    "claim",
    "toggleNavigation",
    "toggleSidePanelMode",
    "setDarkMode",
];

// ============================================================================
// Action
// ============================================================================

/// All protocol actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all_fields = "camelCase")]
pub enum Action {
    /// List items owned by the current user.
    #[serde(rename = "items")]
    Items {},

    /// Look up a single owned item.
    #[serde(rename = "item")]
    Item {
        /// NFT contract address.
        contract_address: String,
        /// Token ID within the contract.
        token_id: String,
    },

    /// Navigate to a named page or a raw path.
    #[serde(rename = "navigate")]
    Navigate {
        /// Named page (e.g. `marketplace`, `item`).
        #[serde(skip_serializing_if = "Option::is_none")]
        page: Option<String>,
        /// Raw route path, used when `page` is absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        /// Page parameters.
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },

    /// Get the wallet's current route path.
    #[serde(rename = "currentPath")]
    CurrentPath {},

    /// Select the active marketplace.
    #[serde(rename = "setMarketplace")]
    SetMarketplace {
        /// Marketplace object ID.
        #[serde(skip_serializing_if = "Option::is_none")]
        marketplace_id: Option<String>,
        /// Marketplace version hash.
        #[serde(skip_serializing_if = "Option::is_none")]
        marketplace_hash: Option<String>,
        /// Tenant slug, paired with `marketplace_slug`.
        #[serde(skip_serializing_if = "Option::is_none")]
        tenant_slug: Option<String>,
        /// Marketplace slug.
        #[serde(skip_serializing_if = "Option::is_none")]
        marketplace_slug: Option<String>,
    },

    /// Restrict the storefront to the given filters.
    #[serde(rename = "setMarketplaceFilters")]
    SetMarketplaceFilters {
        /// Filter tags.
        filters: Vec<String>,
    },

    /// Remove all storefront filters.
    #[serde(rename = "clearMarketplaceFilters")]
    ClearMarketplaceFilters {},

    /// Get the current user's profile.
    #[serde(rename = "userProfile")]
    UserProfile {},

    /// Get the current user's balances.
    #[serde(rename = "balances")]
    Balances {},

    /// Start the login flow.
    #[serde(rename = "logIn")]
    LogIn {},

    /// Log the current user out.
    #[serde(rename = "logOut")]
    LogOut {},

    /// List active marketplace listings.
    #[serde(rename = "listings")]
    Listings {
        /// Limit to one marketplace.
        #[serde(skip_serializing_if = "Option::is_none")]
        marketplace_id: Option<String>,
        /// Additional listing filters.
        #[serde(skip_serializing_if = "Option::is_none")]
        filters: Option<Value>,
    },

    /// Look up one listing.
    #[serde(rename = "listing")]
    Listing {
        /// Listing ID.
        listing_id: String,
    },

    /// Create or update a listing for an owned item.
    #[serde(rename = "listItem")]
    ListItem {
        /// NFT contract address.
        contract_address: String,
        /// Token ID within the contract.
        token_id: String,
        /// Asking price.
        price: f64,
        /// Existing listing to update.
        #[serde(skip_serializing_if = "Option::is_none")]
        listing_id: Option<String>,
    },

    /// Remove a listing.
    #[serde(rename = "removeListing")]
    RemoveListing {
        /// Listing ID.
        listing_id: String,
    },

    /// Purchase a marketplace SKU or a listing.
    #[serde(rename = "purchase")]
    Purchase {
        /// Marketplace of the SKU.
        #[serde(skip_serializing_if = "Option::is_none")]
        marketplace_id: Option<String>,
        /// Marketplace SKU.
        #[serde(skip_serializing_if = "Option::is_none")]
        sku: Option<String>,
        /// Listing to buy instead of a SKU.
        #[serde(skip_serializing_if = "Option::is_none")]
        listing_id: Option<String>,
        /// Number of units.
        #[serde(default = "default_quantity")]
        quantity: u32,
    },

    /// Claim a free marketplace SKU.
    #[serde(rename = "claim")]
    Claim {
        /// Marketplace of the SKU.
        marketplace_id: String,
        /// Marketplace SKU.
        sku: String,
    },

    /// Show or hide the wallet navigation bar.
    #[serde(rename = "toggleNavigation")]
    ToggleNavigation {
        /// Whether navigation is visible.
        enabled: bool,
    },

    /// Switch the compact side-panel layout on or off.
    #[serde(rename = "toggleSidePanelMode")]
    ToggleSidePanelMode {
        /// Whether side-panel mode is on.
        enabled: bool,
    },

    /// Switch dark mode on or off.
    #[serde(rename = "setDarkMode")]
    SetDarkMode {
        /// Whether dark mode is on.
        enabled: bool,
    },
}

fn default_quantity() -> u32 {
    1
}

// ============================================================================
// Action - Properties
// ============================================================================

impl Action {
    /// Returns the wire name of the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Items {} => "items",
            Self::Item { .. } => "item",
            Self::Navigate { .. } => "navigate",
            Self::CurrentPath {} => "currentPath",
            Self::SetMarketplace { .. } => "setMarketplace",
            Self::SetMarketplaceFilters { .. } => "setMarketplaceFilters",
            Self::ClearMarketplaceFilters {} => "clearMarketplaceFilters",
            Self::UserProfile {} => "userProfile",
            Self::Balances {} => "balances",
            Self::LogIn {} => "logIn",
            Self::LogOut {} => "logOut",
            Self::Listings { .. } => "listings",
            Self::Listing { .. } => "listing",
            Self::ListItem { .. } => "listItem",
            Self::RemoveListing { .. } => "removeListing",
            Self::Purchase { .. } => "purchase",
            Self::Claim { .. } => "claim",
            Self::ToggleNavigation { .. } => "toggleNavigation",
            Self::ToggleSidePanelMode { .. } => "toggleSidePanelMode",
            Self::SetDarkMode { .. } => "setDarkMode",
        }
    }

    /// Returns `true` if `name` is a protocol action.
    #[inline]
    #[must_use]
    pub fn is_known(name: &str) -> bool {
        ACTION_NAMES.contains(&name)
    }

    /// Returns `false` for fire-and-forget commands.
    ///
    /// The client posts these without registering a pending request.
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        !matches!(
            self,
            Self::ToggleNavigation { .. }
                | Self::ToggleSidePanelMode { .. }
                | Self::SetDarkMode { .. }
        )
    }

    /// Returns `true` for user-driven flows that may take arbitrarily long.
    ///
    /// These are sent with the timeout disabled.
    #[must_use]
    pub const fn is_long_running(&self) -> bool {
        matches!(
            self,
            Self::Purchase { .. } | Self::Claim { .. } | Self::LogIn {}
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_items_serializes_empty_params() {
        let json = serde_json::to_value(Action::Items {}).expect("serialize");
        assert_eq!(json, json!({"action": "items", "params": {}}));
    }

    #[test]
    fn test_navigate_skips_missing_fields() {
        let action = Action::Navigate {
            page: Some("marketplace".to_string()),
            path: None,
            params: Some(json!({"tenantSlug": "acme"})),
        };
        let json = serde_json::to_value(&action).expect("serialize");
        assert_eq!(
            json,
            json!({
                "action": "navigate",
                "params": {"page": "marketplace", "params": {"tenantSlug": "acme"}}
            })
        );
    }

    #[test]
    fn test_set_marketplace_camel_case() {
        let action = Action::SetMarketplace {
            marketplace_id: Some("iq__abc".to_string()),
            marketplace_hash: None,
            tenant_slug: None,
            marketplace_slug: None,
        };
        let json = serde_json::to_string(&action).expect("serialize");
        assert!(json.contains("setMarketplace"));
        assert!(json.contains("marketplaceId"));
        assert!(!json.contains("marketplaceHash"));
    }

    #[test]
    fn test_purchase_quantity_defaults_to_one() {
        let action: Action = serde_json::from_value(json!({
            "action": "purchase",
            "params": {"marketplaceId": "iq__m", "sku": "sku1"}
        }))
        .expect("parse");

        match action {
            Action::Purchase { quantity, sku, .. } => {
                assert_eq!(quantity, 1);
                assert_eq!(sku.as_deref(), Some("sku1"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_names_match_serde() {
        let actions = [
            Action::Items {},
            Action::CurrentPath {},
            Action::Balances {},
            Action::LogOut {},
            Action::ClearMarketplaceFilters {},
            Action::SetDarkMode { enabled: true },
            Action::Listing {
                listing_id: "l1".to_string(),
            },
        ];

        for action in actions {
            let json = serde_json::to_value(&action).expect("serialize");
            assert_eq!(json["action"], action.name());
            assert!(Action::is_known(action.name()));
        }
    }

    #[test]
    fn test_response_and_timeout_classes() {
        assert!(!Action::ToggleNavigation { enabled: false }.expects_response());
        assert!(!Action::SetDarkMode { enabled: true }.expects_response());
        assert!(Action::Items {}.expects_response());

        assert!(Action::LogIn {}.is_long_running());
        assert!(
            Action::Claim {
                marketplace_id: "m".to_string(),
                sku: "s".to_string()
            }
            .is_long_running()
        );
        assert!(!Action::Balances {}.is_long_running());
    }

    #[test]
    fn test_unknown_name() {
        assert!(!Action::is_known("launchRocket"));
        assert_eq!(ACTION_NAMES.len(), 20);
    }
}
