//! The host-side channel.
//!
//! A [`WalletClient`] owns one transport adapter, one correlation registry
//! and one event bus. It installs a single long-lived `message` listener on
//! the host surface for event delivery; each request installs its own
//! short-lived listener through the registry.
//!
//! Both kinds of listener only accept messages from the channel's own wallet
//! context at the wallet origin, so several channels can share one host page.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, ListenerId, RequestCounter, RequestId};
use crate::protocol::{Action, Envelope, EventKind, RequestEnvelope, WalletEvent};
use crate::state::{ChannelState, StateCell};
use crate::transport::{
    FrameTarget, HostWindow, MessageEvent, MessageSurface, SenderFilter, TransportAdapter,
    TransportMode,
};

use super::builder::{ClientBuilder, ClientOptions};
use super::correlation::CorrelationRegistry;
use super::events::{EventBus, ListenerResult};

// ============================================================================
// Constants
// ============================================================================

/// How often the wallet browsing context is checked for closure.
pub const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// Types
// ============================================================================

/// How the adapter should be opened.
enum Opening {
    Popup,
    Frame(FrameTarget),
}

// ============================================================================
// ClientInner
// ============================================================================

/// Shared state of one channel.
pub(crate) struct ClientInner {
    /// Session ID used in logs.
    channel_id: ChannelId,
    /// Validated configuration.
    options: ClientOptions,
    /// Serialized wallet origin.
    target_origin: String,
    /// Host `message` surface.
    surface: Arc<MessageSurface>,
    /// The wallet context messages must come from.
    sender: Arc<SenderFilter>,
    /// Outstanding requests.
    registry: Arc<CorrelationRegistry>,
    /// Event listeners.
    events: EventBus,
    /// Lifecycle.
    state: StateCell,
    /// Wallet browsing context, `None` once destroyed.
    adapter: Mutex<Option<TransportAdapter>>,
    /// The channel's event listener on the host surface.
    message_listener: Mutex<Option<ListenerId>>,
    /// Closure watcher task.
    watcher: Mutex<Option<JoinHandle<()>>>,
    /// Request ID source.
    requests: RequestCounter,
}

impl ClientInner {
    /// Host surface listener body.
    fn handle_message(&self, message: &MessageEvent) {
        let Some(Envelope::Event(envelope)) = Envelope::from_message(&message.data) else {
            return;
        };
        if !self.sender.accepts(message) {
            warn!(
                channel = %self.channel_id,
                origin = %message.origin,
                source = ?message.source,
                "Ignoring event from foreign sender"
            );
            return;
        }

        match WalletEvent::try_from(envelope) {
            Ok(event) => self.handle_event(&event),
            Err(e) => {
                warn!(channel = %self.channel_id, error = %e, "Ignoring unknown wallet event");
            }
        }
    }

    /// Dispatches an event; `Close` then tears the channel down.
    fn handle_event(&self, event: &WalletEvent) {
        if self.state.get() == ChannelState::Closed {
            return;
        }

        trace!(channel = %self.channel_id, kind = %event.kind, "Wallet event");
        self.events.dispatch(event);

        if event.kind == EventKind::Close {
            debug!(channel = %self.channel_id, "Close event received");
            self.destroy();
        }
    }

    /// Posts an envelope to the wallet.
    fn post(&self, envelope: &Envelope) -> Result<()> {
        let adapter = self.adapter.lock();
        let adapter = adapter.as_ref().ok_or(Error::ChannelClosed)?;
        adapter.post(envelope, &self.target_origin)
    }

    /// Idempotent teardown. Returns `true` for the call that did the work.
    fn destroy(&self) -> bool {
        if !self.state.close() {
            return false;
        }

        let listener = self.message_listener.lock().take();
        if let Some(listener) = listener {
            self.surface.remove_listener(listener);
        }

        let watcher = self.watcher.lock().take();
        if let Some(watcher) = watcher {
            watcher.abort();
        }

        self.registry.fail_all();

        let adapter = self.adapter.lock().take();
        if let Some(adapter) = adapter {
            adapter.close();
        }

        self.events.clear();

        info!(channel = %self.channel_id, "Wallet channel closed");
        true
    }

    /// Returns `true` if the wallet browsing context is gone.
    fn target_closed(&self) -> bool {
        self.adapter
            .lock()
            .as_ref()
            .is_none_or(TransportAdapter::is_closed)
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// WalletClient
// ============================================================================

/// Host-side RPC channel to the wallet application.
///
/// Cheap to clone; clones share one channel. The channel is released by
/// [`destroy`](Self::destroy), by a `close` event from the wallet, when the
/// wallet browsing context disappears, or when the last clone is dropped.
#[derive(Clone)]
pub struct WalletClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletClient")
            .field("channel_id", &self.inner.channel_id)
            .field("state", &self.state())
            .field("target_origin", &self.inner.target_origin)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WalletClient - Construction
// ============================================================================

impl WalletClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Opens the wallet in an iframe and waits for the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` has no target
    /// - [`Error::InvalidTarget`] if the target cannot be resolved
    /// - [`Error::RequestTimeout`] if the handshake does not complete in time
    pub async fn initialize_frame(host: &dyn HostWindow, options: ClientOptions) -> Result<Self> {
        let target = options.target().cloned().ok_or_else(|| {
            Error::config(
                "Iframe mode needs a target. Use .target() or .target_id() to set it.\n\
                 Example: WalletClient::builder().target_id(\"wallet\")",
            )
        })?;

        Self::connect(host, options, Opening::Frame(target)).await
    }

    /// Opens the wallet in a centered popup and waits for the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the popup cannot be opened
    /// - [`Error::RequestTimeout`] if the handshake does not complete in time
    pub async fn initialize_popup(host: &dyn HostWindow, options: ClientOptions) -> Result<Self> {
        Self::connect(host, options, Opening::Popup).await
    }

    /// Shared open sequence.
    async fn connect(host: &dyn HostWindow, options: ClientOptions, opening: Opening) -> Result<Self> {
        let surface = host.message_surface();
        let target_origin = options.target_origin();
        let sender = Arc::new(SenderFilter::new(target_origin.clone()));

        let inner = Arc::new(ClientInner {
            channel_id: ChannelId::generate(),
            target_origin,
            surface: Arc::clone(&surface),
            registry: CorrelationRegistry::new(Arc::clone(&surface), Arc::clone(&sender)),
            sender,
            events: EventBus::new(),
            state: StateCell::new(),
            adapter: Mutex::new(None),
            message_listener: Mutex::new(None),
            watcher: Mutex::new(None),
            requests: RequestCounter::new(),
            options,
        });
        let client = Self { inner };

        client.inner.state.transition(ChannelState::AwaitingInit);

        let weak: Weak<ClientInner> = Arc::downgrade(&client.inner);
        let listener = surface.add_listener(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(message);
            }
        });
        *client.inner.message_listener.lock() = Some(listener);

        // Registered before the wallet exists so its first message cannot be missed.
        let handshake = client
            .inner
            .registry
            .register(RequestId::init(), client.inner.options.init_timeout())?;

        let url = client.inner.options.wallet_url().clone();
        let opened = client.inner.sender.bind_with(
            || match &opening {
                Opening::Popup => {
                    TransportAdapter::popup(host, &url, client.inner.options.popup_size())
                }
                Opening::Frame(target) => TransportAdapter::frame(host, target, &url),
            },
            TransportAdapter::target_id,
        );
        let adapter = match opened {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(channel = %client.inner.channel_id, error = %e, "Failed to open wallet");
                client.destroy();
                return Err(e);
            }
        };
        let mode = adapter.mode();
        *client.inner.adapter.lock() = Some(adapter);

        debug!(channel = %client.inner.channel_id, ?mode, url = %url, "Awaiting wallet handshake");

        if let Err(e) = handshake.wait().await {
            warn!(channel = %client.inner.channel_id, error = %e, "Wallet handshake failed");
            client.destroy();
            return Err(e);
        }

        if client.inner.state.transition(ChannelState::Ready).is_none() {
            return Err(Error::ChannelClosed);
        }

        client.spawn_watcher();

        info!(
            channel = %client.inner.channel_id,
            ?mode,
            origin = %client.inner.target_origin,
            "Wallet channel ready"
        );

        Ok(client)
    }

    /// Polls the wallet browsing context and synthesizes `close` once it is gone.
    fn spawn_watcher(&self) {
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(CLOSE_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.state.get() == ChannelState::Closed {
                    break;
                }
                if inner.target_closed() {
                    debug!(channel = %inner.channel_id, "Wallet browsing context closed");
                    inner.handle_event(&WalletEvent::bare(EventKind::Close));
                    break;
                }
            }
        });

        *self.inner.watcher.lock() = Some(handle);
    }
}

// ============================================================================
// WalletClient - Accessors
// ============================================================================

impl WalletClient {
    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.inner.channel_id
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.inner.state.get()
    }

    /// Returns `true` once destroyed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == ChannelState::Closed
    }

    /// Returns the wallet navigation URL, query parameters included.
    #[inline]
    #[must_use]
    pub fn wallet_url(&self) -> &Url {
        self.inner.options.wallet_url()
    }

    /// Returns the origin requests are posted to.
    #[inline]
    #[must_use]
    pub fn target_origin(&self) -> &str {
        &self.inner.target_origin
    }

    /// Returns the hosting mode, `None` once destroyed.
    #[must_use]
    pub fn mode(&self) -> Option<TransportMode> {
        self.inner.adapter.lock().as_ref().map(TransportAdapter::mode)
    }

    /// Returns the number of outstanding requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.registry.pending_count()
    }

    /// Tears the channel down.
    ///
    /// Removes the event listener, rejects outstanding requests with
    /// [`Error::ChannelClosed`], and closes the popup or removes the iframe.
    /// Calling it again does nothing.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

// ============================================================================
// WalletClient - Requests
// ============================================================================

impl WalletClient {
    /// Sends an action with the configured timeout.
    ///
    /// Long-running actions (`purchase`, `claim`, `logIn`) wait indefinitely;
    /// fire-and-forget actions resolve to `null` as soon as they are posted.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] before the handshake completes
    /// - [`Error::ChannelClosed`] after teardown
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Remote`] if the wallet answers with an error
    pub async fn send(&self, action: Action) -> Result<Value> {
        let limit = if action.is_long_running() {
            None
        } else {
            self.inner.options.request_timeout()
        };
        self.dispatch(action, limit).await
    }

    /// Sends an action with an explicit timeout. `Duration::ZERO` disables it.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_with_timeout(&self, action: Action, limit: Duration) -> Result<Value> {
        self.dispatch(action, (!limit.is_zero()).then_some(limit))
            .await
    }

    /// Sends an action by wire name with raw params.
    ///
    /// For wallet actions without a typed method. Always expects a response
    /// and uses the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn request(&self, action: impl Into<String>, params: Value) -> Result<Value> {
        self.ensure_ready("request")?;

        let envelope = RequestEnvelope {
            request_id: self.inner.requests.next_id(),
            action: action.into(),
            params,
        };
        self.round_trip(envelope, self.inner.options.request_timeout())
            .await
    }

    /// Posts a typed action, awaiting its response if it has one.
    async fn dispatch(&self, action: Action, limit: Option<Duration>) -> Result<Value> {
        self.ensure_ready(action.name())?;

        let envelope = RequestEnvelope::new(self.inner.requests.next_id(), &action)?;

        if !action.expects_response() {
            trace!(
                channel = %self.inner.channel_id,
                request_id = %envelope.request_id,
                action = action.name(),
                "Posting fire-and-forget request"
            );
            self.inner.post(&Envelope::from(envelope))?;
            return Ok(Value::Null);
        }

        self.round_trip(envelope, limit).await
    }

    /// Registers, posts and awaits one request.
    async fn round_trip(&self, envelope: RequestEnvelope, limit: Option<Duration>) -> Result<Value> {
        let request_id = envelope.request_id.clone();
        let pending = self.inner.registry.register(request_id.clone(), limit)?;

        debug!(
            channel = %self.inner.channel_id,
            %request_id,
            action = %envelope.action,
            "Sending request"
        );

        // On failure `pending` is dropped, which unregisters it.
        self.inner.post(&Envelope::from(envelope))?;

        pending.wait().await
    }

    /// Rejects calls outside [`ChannelState::Ready`].
    fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state() {
            ChannelState::Ready => Ok(()),
            ChannelState::Closed => Err(Error::ChannelClosed),
            state => Err(Error::invalid_state(state, operation)),
        }
    }
}

// ============================================================================
// WalletClient - Events
// ============================================================================

impl WalletClient {
    /// Registers `callback` for `kind` ([`EventKind::All`] for every event).
    ///
    /// Listeners run in registration order; a listener that fails or panics
    /// is logged and does not affect the others.
    pub fn add_event_listener<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&WalletEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.events.add_listener(kind, callback)
    }

    /// Registers `callback` for the event key `name` (`"log_in"`, `"all"`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] listing the valid keys.
    pub fn add_event_listener_named<F>(&self, name: &str, callback: F) -> Result<ListenerId>
    where
        F: Fn(&WalletEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.events.add_listener_named(name, callback)
    }

    /// Removes a listener. Returns `false` if it was not registered for `kind`.
    pub fn remove_event_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.events.remove_listener(kind, id)
    }

    /// Removes a listener by event key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if `name` is not an event key.
    pub fn remove_event_listener_named(&self, name: &str, id: ListenerId) -> Result<bool> {
        self.inner.events.remove_listener_named(name, id)
    }

    /// Returns the number of registered event listeners.
    #[inline]
    #[must_use]
    pub fn event_listener_count(&self) -> usize {
        self.inner.events.listener_count()
    }
}
