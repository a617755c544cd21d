//! Shared fixtures for integration tests.
//!
//! A [`StubWallet`] answers a handful of actions; `install_wallet` loads it
//! into every context the loopback host opens.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use wallet_bridge::listener::{NavigationTarget, PurchaseRequest};
use wallet_bridge::transport::{EmbeddedContext, LoopbackWindow};
use wallet_bridge::{LoopbackHost, Result, WalletApp, WalletClient, WalletListener};

pub const HOST_ORIGIN: &str = "https://host.example";
pub const WALLET_URL: &str = "https://wallet.example/app";
pub const WALLET_ORIGIN: &str = "https://wallet.example";

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// StubWallet
// ============================================================================

/// Wallet double. `balances` never answers; `purchase` takes five seconds.
#[derive(Default)]
pub struct StubWallet {
    pub calls: Mutex<Vec<String>>,
}

impl StubWallet {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl WalletApp for StubWallet {
    async fn items(&self) -> Result<Value> {
        self.record("items");
        Ok(json!([]))
    }

    async fn item(&self, contract_address: &str, token_id: &str) -> Result<Value> {
        self.record("item");
        Ok(json!({ "contractAddress": contract_address, "tokenId": token_id }))
    }

    async fn navigate(&self, target: NavigationTarget) -> Result<Value> {
        self.record("navigate");
        Ok(match target {
            NavigationTarget::Page { page, params } => json!({ "page": page, "params": params }),
            NavigationTarget::Path(path) => json!({ "path": path }),
        })
    }

    async fn current_path(&self) -> Result<String> {
        Ok("/items".to_string())
    }

    async fn user_profile(&self) -> Result<Value> {
        Ok(json!({ "address": "0xabc" }))
    }

    async fn balances(&self) -> Result<Value> {
        std::future::pending().await
    }

    async fn purchase(&self, request: PurchaseRequest) -> Result<Value> {
        self.record("purchase");
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(json!({ "status": "complete", "quantity": request.quantity }))
    }

    async fn set_dark_mode(&self, enabled: bool) -> Result<()> {
        self.record(format!("setDarkMode:{enabled}"));
        Ok(())
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A loopback host with the stub wallet installed.
pub struct Fixture {
    pub host: Arc<LoopbackHost>,
    pub wallet: Arc<StubWallet>,
    /// Listeners attached in each loaded context, in load order.
    pub listeners: Arc<Mutex<Vec<WalletListener>>>,
}

impl Fixture {
    /// Host with a `<div id="wallet">` container.
    pub fn new() -> Self {
        init_tracing();

        let host = LoopbackHost::new(HOST_ORIGIN);
        host.add_element("wallet", "div");

        let wallet = Arc::new(StubWallet::default());
        let listeners = Arc::new(Mutex::new(Vec::new()));

        let app = Arc::clone(&wallet);
        let attached = Arc::clone(&listeners);
        host.set_wallet(move |ctx: EmbeddedContext| {
            let listener = WalletListener::attach_shared(
                ctx.window.surface(),
                ctx.parent,
                Arc::clone(&app) as Arc<dyn WalletApp>,
            )
            .expect("attach wallet listener");

            let on_unload = listener.clone();
            ctx.window.on_unload(move || on_unload.handle_unload());
            attached.lock().push(listener);
        });

        Self {
            host,
            wallet,
            listeners,
        }
    }

    /// Host whose contexts stay blank.
    pub fn without_wallet() -> Self {
        init_tracing();

        let host = LoopbackHost::new(HOST_ORIGIN);
        host.add_element("wallet", "div");

        Self {
            host,
            wallet: Arc::new(StubWallet::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Opens an iframe channel into `#wallet` with a one-second timeout.
    pub async fn frame(&self) -> WalletClient {
        self.frame_in("wallet").await
    }

    /// Opens an iframe channel into `#<container>` with a one-second timeout.
    pub async fn frame_in(&self, container: &str) -> WalletClient {
        WalletClient::builder()
            .wallet_app_url(WALLET_URL)
            .target_id(container)
            .timeout(1)
            .frame(&*self.host)
            .await
            .expect("frame channel")
    }

    /// The wallet window loaded into `#<container>`.
    pub fn frame_window(&self, container: &str) -> Arc<LoopbackWindow> {
        self.host
            .element(container)
            .expect("container")
            .children()
            .first()
            .and_then(|frame| frame.content_window())
            .expect("wallet loaded")
    }

    /// Opens a popup channel with a one-second timeout.
    pub async fn popup(&self) -> WalletClient {
        WalletClient::builder()
            .wallet_app_url(WALLET_URL)
            .timeout(1)
            .popup(&*self.host)
            .await
            .expect("popup channel")
    }

    /// The most recently attached wallet listener.
    pub fn wallet_listener(&self) -> WalletListener {
        self.listeners
            .lock()
            .last()
            .cloned()
            .expect("a wallet was loaded")
    }

    /// Calls recorded by the stub wallet.
    pub fn calls(&self) -> Vec<String> {
        self.wallet.calls.lock().clone()
    }
}

/// Polls `condition` until it holds, failing after two seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Awaits `future`, failing after two seconds.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("completed within 2s")
}
