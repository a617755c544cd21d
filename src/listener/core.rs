//! The embedded-side channel.
//!
//! A [`WalletListener`] runs inside the wallet's browsing context. On attach
//! it announces readiness with the `init` response, then serves each request
//! on its own task so a slow action never blocks the others.
//!
//! Everything it posts goes to the parent with the wildcard target origin;
//! the wallet cannot know the host's origin in advance.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ListenerId;
use crate::protocol::{
    Action, Envelope, EventEnvelope, EventKind, RequestEnvelope, ResponseEnvelope,
};
use crate::state::{ChannelState, StateCell};
use crate::transport::{BrowsingContext, MessageEvent, MessageSurface, WILDCARD_ORIGIN};

use super::app::{ListingDraft, MarketplaceSelection, NavigationTarget, PurchaseRequest, WalletApp};

// ============================================================================
// ListenerInner
// ============================================================================

/// Shared state of an attached listener.
struct ListenerInner {
    /// The application performing actions.
    app: Arc<dyn WalletApp>,
    /// The wallet window's `message` surface.
    surface: Arc<MessageSurface>,
    /// `window.parent` or `window.opener`.
    parent: Arc<dyn BrowsingContext>,
    /// Lifecycle.
    state: StateCell,
    /// Request listener on `surface`.
    message_listener: Mutex<Option<ListenerId>>,
    /// Skip the `close` event on unload.
    suppress_close: AtomicBool,
}

impl ListenerInner {
    /// Surface listener body.
    fn handle_message(self: &Arc<Self>, message: &MessageEvent) {
        let Some(Envelope::Request(request)) = Envelope::from_message(&message.data) else {
            return;
        };
        if self.state.get() != ChannelState::Ready {
            return;
        }

        trace!(
            request_id = %request.request_id,
            action = %request.action,
            origin = %message.origin,
            "Request received"
        );

        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.serve(request).await });
    }

    /// Runs one request and replies if the action expects it.
    async fn serve(&self, request: RequestEnvelope) {
        let request_id = request.request_id.clone();

        let action = match request.parse_action() {
            Ok(action) => action,
            Err(e) => {
                warn!(%request_id, action = %request.action, error = %e, "Rejecting request");
                self.reply(ResponseEnvelope::failure(request_id, e.to_payload()));
                return;
            }
        };

        let name = action.name();
        let expects_response = action.expects_response();

        let outcome = match AssertUnwindSafe(self.perform(action)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::protocol(format!("{name} handler panicked"))),
        };

        if !expects_response {
            if let Err(e) = outcome {
                warn!(%request_id, action = name, error = %e, "Fire-and-forget action failed");
            }
            return;
        }

        let response = match outcome {
            Ok(value) => ResponseEnvelope::success(request_id, value),
            Err(e) => {
                debug!(%request_id, action = name, error = %e, "Action failed");
                ResponseEnvelope::failure(request_id, e.to_payload())
            }
        };
        self.reply(response);
    }

    /// Routes a typed action to the application.
    async fn perform(&self, action: Action) -> Result<Value> {
        let app = &self.app;

        match action {
            Action::Items {} => app.items().await,
            Action::Item {
                contract_address,
                token_id,
            } => app.item(&contract_address, &token_id).await,
            Action::Navigate { page, path, params } => {
                let target = match (page, path) {
                    (Some(page), _) => NavigationTarget::Page { page, params },
                    (None, Some(path)) => NavigationTarget::Path(path),
                    (None, None) => {
                        return Err(Error::invalid_argument("navigate needs a page or a path"));
                    }
                };
                app.navigate(target).await
            }
            Action::CurrentPath {} => app.current_path().await.map(Value::String),
            Action::SetMarketplace {
                marketplace_id,
                marketplace_hash,
                tenant_slug,
                marketplace_slug,
            } => {
                app.set_marketplace(MarketplaceSelection {
                    marketplace_id,
                    marketplace_hash,
                    tenant_slug,
                    marketplace_slug,
                })
                .await
            }
            Action::SetMarketplaceFilters { filters } => app.set_marketplace_filters(filters).await,
            Action::ClearMarketplaceFilters {} => app.clear_marketplace_filters().await,
            Action::UserProfile {} => app.user_profile().await,
            Action::Balances {} => app.balances().await,
            Action::LogIn {} => app.log_in().await,
            Action::LogOut {} => app.log_out().await,
            Action::Listings {
                marketplace_id,
                filters,
            } => app.listings(marketplace_id, filters).await,
            Action::Listing { listing_id } => app.listing(&listing_id).await,
            Action::ListItem {
                contract_address,
                token_id,
                price,
                listing_id,
            } => {
                app.list_item(ListingDraft {
                    contract_address,
                    token_id,
                    price,
                    listing_id,
                })
                .await
            }
            Action::RemoveListing { listing_id } => app.remove_listing(&listing_id).await,
            Action::Purchase {
                marketplace_id,
                sku,
                listing_id,
                quantity,
            } => {
                app.purchase(PurchaseRequest {
                    marketplace_id,
                    sku,
                    listing_id,
                    quantity,
                })
                .await
            }
            Action::Claim {
                marketplace_id,
                sku,
            } => app.claim(&marketplace_id, &sku).await,
            Action::ToggleNavigation { enabled } => {
                app.toggle_navigation(enabled).await.map(|()| Value::Null)
            }
            Action::ToggleSidePanelMode { enabled } => {
                app.toggle_side_panel_mode(enabled).await.map(|()| Value::Null)
            }
            Action::SetDarkMode { enabled } => app.set_dark_mode(enabled).await.map(|()| Value::Null),
        }
    }

    /// Posts a response, logging failures.
    fn reply(&self, response: ResponseEnvelope) {
        let request_id = response.request_id.clone();
        if let Err(e) = self.post(&Envelope::from(response)) {
            warn!(%request_id, error = %e, "Failed to post response");
        }
    }

    /// Posts an envelope to the parent.
    fn post(&self, envelope: &Envelope) -> Result<()> {
        self.parent
            .post_message(envelope.to_message()?, WILDCARD_ORIGIN)
    }

    /// Removes the request listener. Returns `true` for the call that did it.
    fn detach(&self) -> bool {
        if !self.state.close() {
            return false;
        }

        let listener = self.message_listener.lock().take();
        if let Some(listener) = listener {
            self.surface.remove_listener(listener);
        }
        debug!("Wallet listener detached");
        true
    }
}

// ============================================================================
// WalletListener
// ============================================================================

/// Embedded-side RPC endpoint.
///
/// The window's `message` surface keeps the listener alive until
/// [`detach`](Self::detach) or [`handle_unload`](Self::handle_unload);
/// handles may be dropped freely.
#[derive(Clone)]
pub struct WalletListener {
    inner: Arc<ListenerInner>,
}

impl fmt::Debug for WalletListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletListener")
            .field("state", &self.state())
            .field("suppress_close", &self.is_close_suppressed())
            .finish_non_exhaustive()
    }
}

impl WalletListener {
    /// Attaches `app` to the wallet window and posts the `init` response.
    ///
    /// # Arguments
    ///
    /// * `surface` - The wallet window's `message` surface
    /// * `parent` - The host window (`window.parent` or `window.opener`)
    /// * `app` - The application performing actions
    ///
    /// # Errors
    ///
    /// Returns an error if the `init` response cannot be posted; the
    /// listener is detached again in that case.
    pub fn attach<A: WalletApp>(
        surface: Arc<MessageSurface>,
        parent: Arc<dyn BrowsingContext>,
        app: A,
    ) -> Result<Self> {
        Self::attach_shared(surface, parent, Arc::new(app))
    }

    /// Like [`attach`](Self::attach) for an application shared elsewhere.
    ///
    /// # Errors
    ///
    /// See [`attach`](Self::attach).
    pub fn attach_shared(
        surface: Arc<MessageSurface>,
        parent: Arc<dyn BrowsingContext>,
        app: Arc<dyn WalletApp>,
    ) -> Result<Self> {
        let inner = Arc::new(ListenerInner {
            app,
            surface: Arc::clone(&surface),
            parent,
            state: StateCell::new(),
            message_listener: Mutex::new(None),
            suppress_close: AtomicBool::new(false),
        });
        inner.state.transition(ChannelState::Ready);

        let handler = Arc::clone(&inner);
        let listener = surface.add_listener(move |message| handler.handle_message(message));
        *inner.message_listener.lock() = Some(listener);

        if let Err(e) = inner.post(&Envelope::from(ResponseEnvelope::init())) {
            inner.detach();
            return Err(e);
        }

        debug!("Wallet listener attached");
        Ok(Self { inner })
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.inner.state.get()
    }

    /// Stops serving requests. Calling it again does nothing.
    pub fn detach(&self) {
        self.inner.detach();
    }
}

// ============================================================================
// WalletListener - Events
// ============================================================================

impl WalletListener {
    /// Posts an event to the host.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] once detached
    /// - [`Error::Transport`] if the host window is gone
    pub fn emit(&self, kind: EventKind, data: Option<Value>) -> Result<()> {
        if self.state() != ChannelState::Ready {
            return Err(Error::ChannelClosed);
        }

        trace!(%kind, "Emitting event");
        self.inner
            .post(&Envelope::from(EventEnvelope::new(kind, data)))
    }

    /// Reports a login with the user's wallet address.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify_log_in(&self, address: &str) -> Result<()> {
        self.emit(EventKind::LogIn, Some(json!({ "address": address })))
    }

    /// Reports a logout.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify_log_out(&self) -> Result<()> {
        self.emit(EventKind::LogOut, None)
    }

    /// Asks the host to present login.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify_log_in_requested(&self) -> Result<()> {
        self.emit(EventKind::LogInRequested, None)
    }

    /// Reports a route change.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify_route_change(&self, path: &str) -> Result<()> {
        self.emit(EventKind::RouteChange, Some(json!({ "path": path })))
    }

    /// Reports new layout dimensions.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify_resize(&self, width: u32, height: u32) -> Result<()> {
        self.emit(
            EventKind::Resize,
            Some(json!({ "width": width, "height": height })),
        )
    }

    /// Reports that the wallet finished loading.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify_loaded(&self) -> Result<()> {
        self.emit(EventKind::Loaded, None)
    }
}

// ============================================================================
// WalletListener - Unload
// ============================================================================

impl WalletListener {
    /// Skips the `close` event on the next unload.
    ///
    /// Used when the host is about to recreate the channel.
    pub fn suppress_close(&self, suppress: bool) {
        self.inner.suppress_close.store(suppress, Ordering::Release);
    }

    /// Returns `true` if the `close` event is suppressed.
    #[inline]
    #[must_use]
    pub fn is_close_suppressed(&self) -> bool {
        self.inner.suppress_close.load(Ordering::Acquire)
    }

    /// `beforeunload` handler: emits `close` unless suppressed, then detaches.
    pub fn handle_unload(&self) {
        if self.state() != ChannelState::Ready {
            return;
        }

        if self.is_close_suppressed() {
            debug!("Close event suppressed");
        } else if let Err(e) = self.emit(EventKind::Close, None) {
            debug!(error = %e, "Could not deliver close event");
        }

        self.detach();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    use crate::identifiers::{ContextId, RequestId};

    /// Records everything posted to it.
    struct RecordingParent {
        id: ContextId,
        tx: tokio::sync::mpsc::UnboundedSender<(Value, String)>,
        closed: AtomicBool,
    }

    impl BrowsingContext for RecordingParent {
        fn id(&self) -> ContextId {
            self.id
        }

        fn post_message(&self, message: Value, target_origin: &str) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::transport("parent gone"));
            }
            let _ = self.tx.send((message, target_origin.to_string()));
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    struct Shop;

    #[async_trait]
    impl WalletApp for Shop {
        async fn items(&self) -> Result<Value> {
            Ok(json!([{ "name": "sword" }]))
        }

        async fn current_path(&self) -> Result<String> {
            Ok("/wallet/items".to_string())
        }

        async fn balances(&self) -> Result<Value> {
            panic!("ledger offline")
        }

        async fn set_dark_mode(&self, _enabled: bool) -> Result<()> {
            Ok(())
        }
    }

    fn attach() -> (
        WalletListener,
        Arc<MessageSurface>,
        UnboundedReceiver<(Value, String)>,
    ) {
        let (tx, rx) = unbounded_channel();
        let parent = Arc::new(RecordingParent {
            id: ContextId::generate(),
            tx,
            closed: AtomicBool::new(false),
        });
        let surface = Arc::new(MessageSurface::new());
        let listener = WalletListener::attach(Arc::clone(&surface), parent, Shop).expect("attach");
        (listener, surface, rx)
    }

    fn request(id: &str, action: &str, params: Value) -> MessageEvent {
        let envelope = Envelope::from(RequestEnvelope {
            request_id: RequestId::new(id),
            action: action.to_string(),
            params,
        });
        MessageEvent::new(
            "https://host.example",
            envelope.to_message().expect("serialize"),
        )
    }

    async fn next_response(rx: &mut UnboundedReceiver<(Value, String)>) -> ResponseEnvelope {
        let (message, origin) = rx.recv().await.expect("posted");
        assert_eq!(origin, WILDCARD_ORIGIN);
        match Envelope::from_message(&message) {
            Some(Envelope::Response(response)) => response,
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attach_posts_init() {
        let (listener, surface, mut rx) = attach();

        let init = next_response(&mut rx).await;
        assert!(init.request_id.is_init());
        assert!(!init.is_error());
        assert_eq!(listener.state(), ChannelState::Ready);
        assert_eq!(surface.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_serves_request() {
        let (_listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "items", json!({})));

        let response = next_response(&mut rx).await;
        assert_eq!(response.request_id, RequestId::new("action-1"));
        assert_eq!(response.response, Some(json!([{ "name": "sword" }])));
    }

    #[tokio::test]
    async fn test_current_path_is_string() {
        let (_listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "currentPath", Value::Null));

        let response = next_response(&mut rx).await;
        assert_eq!(response.response, Some(json!("/wallet/items")));
    }

    #[tokio::test]
    async fn test_unknown_action_replies_error() {
        let (_listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "teleport", json!({})));

        let response = next_response(&mut rx).await;
        let error = response.error.expect("error payload");
        assert!(error.as_str().expect("string").contains("teleport"));
    }

    #[tokio::test]
    async fn test_malformed_params_reply_error() {
        let (_listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "item", json!({ "tokenId": 3 })));

        let response = next_response(&mut rx).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_unimplemented_action_is_unsupported() {
        let (_listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "userProfile", json!({})));

        let response = next_response(&mut rx).await;
        assert_eq!(response.error, Some(json!("Unsupported action: userProfile")));
    }

    #[tokio::test]
    async fn test_panicking_handler_replies_error() {
        let (_listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "balances", json!({})));

        let response = next_response(&mut rx).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_fire_and_forget_gets_no_reply() {
        let (listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        surface.dispatch(&request("action-1", "setDarkMode", json!({ "enabled": true })));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());

        listener.notify_loaded().expect("emit");
        let (message, _) = rx.recv().await.expect("event");
        assert!(matches!(
            Envelope::from_message(&message),
            Some(Envelope::Event(_))
        ));
    }

    #[tokio::test]
    async fn test_notify_payloads() {
        let (listener, _surface, mut rx) = attach();
        next_response(&mut rx).await;

        listener.notify_log_in("0xabc").expect("emit");
        listener.notify_resize(320, 640).expect("emit");

        let (login, _) = rx.recv().await.expect("event");
        assert_eq!(login["event"], "log_in");
        assert_eq!(login["data"]["address"], "0xabc");

        let (resize, _) = rx.recv().await.expect("event");
        assert_eq!(resize["data"], json!({ "width": 320, "height": 640 }));
    }

    #[tokio::test]
    async fn test_unload_emits_close_once() {
        let (listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        listener.handle_unload();
        listener.handle_unload();

        let (close, _) = rx.recv().await.expect("event");
        assert_eq!(close["event"], "close");
        assert!(rx.try_recv().is_err());
        assert_eq!(listener.state(), ChannelState::Closed);
        assert_eq!(surface.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_suppressed_unload_is_silent() {
        let (listener, _surface, mut rx) = attach();
        next_response(&mut rx).await;

        listener.suppress_close(true);
        listener.handle_unload();

        assert!(rx.try_recv().is_err());
        assert!(matches!(
            listener.notify_loaded(),
            Err(Error::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_detached_ignores_requests() {
        let (listener, surface, mut rx) = attach();
        next_response(&mut rx).await;

        listener.detach();
        surface.dispatch(&request("action-1", "items", json!({})));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
