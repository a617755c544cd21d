//! In-process browsing contexts.
//!
//! The loopback transport implements [`HostWindow`], [`Element`] and
//! [`BrowsingContext`] without a browser. Each [`LoopbackWindow`] owns a
//! delivery task, so posting never dispatches synchronously and messages to
//! one window arrive in posting order.
//!
//! A wallet factory installed on the [`LoopbackHost`] plays the document
//! loaded into every new iframe or popup.
//!
//! # Example
//!
//! ```ignore
//! let host = LoopbackHost::new("https://host.example");
//! host.set_wallet(|ctx: EmbeddedContext| {
//!     let listener = WalletListener::attach(ctx.window.surface(), ctx.parent, MyWallet)
//!         .expect("attach");
//!     ctx.window.on_unload(move || listener.handle_unload());
//! });
//! host.add_element("wallet", "div");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ContextId;

use super::{
    BrowsingContext, Element, HostWindow, MessageEvent, MessageSurface, Viewport,
    WILDCARD_ORIGIN,
};

// ============================================================================
// Types
// ============================================================================

/// Builds the wallet document for a freshly loaded context.
pub type WalletFactory = Arc<dyn Fn(EmbeddedContext) + Send + Sync>;

/// Hook run when a window unloads.
type UnloadHook = Box<dyn FnOnce() + Send>;

// ============================================================================
// LoopbackWindow
// ============================================================================

/// One in-process browsing context.
pub struct LoopbackWindow {
    /// Stamped as `source` on messages this window posts.
    id: ContextId,
    /// Serialized origin of the document.
    origin: String,
    /// The window's `message` event target.
    surface: Arc<MessageSurface>,
    /// Queue feeding the delivery task.
    inbox: mpsc::UnboundedSender<MessageEvent>,
    /// Set once unloaded; shared with the delivery task.
    closed: Arc<AtomicBool>,
    /// `beforeunload` handlers.
    unload_hooks: Mutex<Vec<UnloadHook>>,
}

impl fmt::Debug for LoopbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackWindow")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl LoopbackWindow {
    /// Creates a window and spawns its delivery task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        let surface = Arc::new(MessageSurface::new());
        let closed = Arc::new(AtomicBool::new(false));
        let (inbox, mut inbox_rx) = mpsc::unbounded_channel::<MessageEvent>();

        let pump_surface = Arc::clone(&surface);
        let pump_closed = Arc::clone(&closed);
        tokio::spawn(async move {
            while let Some(event) = inbox_rx.recv().await {
                if pump_closed.load(Ordering::Acquire) {
                    break;
                }
                pump_surface.dispatch(&event);
            }
        });

        Arc::new(Self {
            id: ContextId::generate(),
            origin: origin.into(),
            surface,
            inbox,
            closed,
            unload_hooks: Mutex::new(Vec::new()),
        })
    }

    /// Returns the window's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Returns the document origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the window's `message` event target.
    #[inline]
    #[must_use]
    pub fn surface(&self) -> Arc<MessageSurface> {
        Arc::clone(&self.surface)
    }

    /// Returns a handle `source` uses to post into this window.
    ///
    /// Messages posted through the handle carry the origin and ID of `source`.
    #[must_use]
    pub fn proxy(self: &Arc<Self>, source: &LoopbackWindow) -> Arc<dyn BrowsingContext> {
        Arc::new(WindowProxy {
            target: Arc::clone(self),
            source_origin: source.origin.clone(),
            source: source.id,
        })
    }

    /// Registers a `beforeunload` handler.
    pub fn on_unload<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() {
            return;
        }
        self.unload_hooks.lock().push(Box::new(hook));
    }

    /// Unloads the document: runs unload handlers once and stops delivery.
    pub fn unload(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let hooks = std::mem::take(&mut *self.unload_hooks.lock());
        debug!(origin = %self.origin, hooks = hooks.len(), "Window unloading");

        for hook in hooks {
            hook();
        }
    }

    /// Returns `true` once unloaded.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queues a message for delivery.
    fn deliver(&self, event: MessageEvent) -> Result<()> {
        if self.is_closed() {
            return Err(Error::transport(format!(
                "browsing context {} is closed",
                self.origin
            )));
        }
        self.inbox
            .send(event)
            .map_err(|_| Error::transport("delivery task stopped"))
    }
}

// ============================================================================
// WindowProxy
// ============================================================================

/// Postable handle onto a [`LoopbackWindow`].
struct WindowProxy {
    target: Arc<LoopbackWindow>,
    source_origin: String,
    source: ContextId,
}

impl BrowsingContext for WindowProxy {
    fn id(&self) -> ContextId {
        self.target.id
    }

    fn post_message(&self, message: Value, target_origin: &str) -> Result<()> {
        if target_origin != WILDCARD_ORIGIN && target_origin != self.target.origin {
            warn!(
                target_origin,
                actual = %self.target.origin,
                "Target origin mismatch, message dropped"
            );
            return Ok(());
        }

        trace!(from = %self.source_origin, to = %self.target.origin, "postMessage");
        self.target.deliver(MessageEvent::from_source(
            self.source_origin.clone(),
            self.source,
            message,
        ))
    }

    fn close(&self) {
        self.target.unload();
    }

    fn is_closed(&self) -> bool {
        self.target.is_closed()
    }
}

// ============================================================================
// EmbeddedContext
// ============================================================================

/// What a wallet document sees when it is loaded.
pub struct EmbeddedContext {
    /// URL the context was navigated to, query included.
    pub url: Url,
    /// The wallet's own window.
    pub window: Arc<LoopbackWindow>,
    /// `window.parent` (iframe) or `window.opener` (popup).
    pub parent: Arc<dyn BrowsingContext>,
}

// ============================================================================
// PopupRecord
// ============================================================================

/// A popup opened through [`LoopbackHost`].
#[derive(Debug, Clone)]
pub struct PopupRecord {
    /// Requested URL.
    pub url: Url,
    /// Requested window name.
    pub name: String,
    /// Requested feature string.
    pub features: String,
    /// The popup window.
    pub window: Arc<LoopbackWindow>,
}

// ============================================================================
// LoopbackHost
// ============================================================================

/// In-process host page.
pub struct LoopbackHost {
    /// The host's own window.
    window: Arc<LoopbackWindow>,
    /// Reported geometry.
    viewport: Mutex<Viewport>,
    /// Elements addressable by ID.
    elements: Mutex<FxHashMap<String, Arc<LoopbackElement>>>,
    /// Document loaded into new contexts.
    wallet: Mutex<Option<WalletFactory>>,
    /// Popups opened so far.
    popups: Mutex<Vec<PopupRecord>>,
    /// Weak self reference handed to elements.
    self_ref: Weak<LoopbackHost>,
}

impl fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackHost")
            .field("origin", &self.window.origin())
            .field("elements", &self.elements.lock().len())
            .field("popups", &self.popups.lock().len())
            .finish_non_exhaustive()
    }
}

impl LoopbackHost {
    /// Creates a host page at `origin` with no elements and no wallet.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        let window = LoopbackWindow::new(origin);
        Arc::new_cyclic(|self_ref| Self {
            window,
            viewport: Mutex::new(Viewport::default()),
            elements: Mutex::new(FxHashMap::default()),
            wallet: Mutex::new(None),
            popups: Mutex::new(Vec::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// Installs the wallet document factory.
    pub fn set_wallet<F>(&self, factory: F)
    where
        F: Fn(EmbeddedContext) + Send + Sync + 'static,
    {
        *self.wallet.lock() = Some(Arc::new(factory));
    }

    /// Returns the host's own window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &Arc<LoopbackWindow> {
        &self.window
    }

    /// Overrides the reported geometry.
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.lock() = viewport;
    }

    /// Adds an element addressable by `id`.
    pub fn add_element(&self, id: impl Into<String>, tag: &str) -> Arc<LoopbackElement> {
        let element = LoopbackElement::new(tag, self.self_ref.clone());
        self.elements.lock().insert(id.into(), Arc::clone(&element));
        element
    }

    /// Looks up an element added with [`add_element`](Self::add_element).
    #[must_use]
    pub fn element(&self, id: &str) -> Option<Arc<LoopbackElement>> {
        self.elements.lock().get(id).cloned()
    }

    /// Returns every popup opened so far.
    #[must_use]
    pub fn popups(&self) -> Vec<PopupRecord> {
        self.popups.lock().clone()
    }

    /// Creates a window for `url` and runs the wallet factory in it.
    fn load(&self, url: &Url) -> (Arc<LoopbackWindow>, Arc<dyn BrowsingContext>) {
        let origin = url.origin().ascii_serialization();
        let embedded = LoopbackWindow::new(origin);
        let parent = self.window.proxy(&embedded);
        let handle = embedded.proxy(&self.window);

        let factory = self.wallet.lock().clone();
        match factory {
            Some(factory) => factory(EmbeddedContext {
                url: url.clone(),
                window: Arc::clone(&embedded),
                parent,
            }),
            None => debug!(url = %url, "No wallet installed, context stays blank"),
        }

        (embedded, handle)
    }

    /// Forgets an element that left the document.
    fn forget(&self, element: &LoopbackElement) {
        self.elements
            .lock()
            .retain(|_, registered| !std::ptr::eq(registered.as_ref(), element));
    }
}

impl HostWindow for LoopbackHost {
    fn message_surface(&self) -> Arc<MessageSurface> {
        self.window.surface()
    }

    fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }

    fn open(&self, url: &Url, name: &str, features: &str) -> Result<Arc<dyn BrowsingContext>> {
        let (window, handle) = self.load(url);
        self.popups.lock().push(PopupRecord {
            url: url.clone(),
            name: name.to_string(),
            features: features.to_string(),
            window,
        });
        Ok(handle)
    }

    fn element_by_id(&self, id: &str) -> Option<Arc<dyn Element>> {
        self.element(id).map(|element| element as Arc<dyn Element>)
    }
}

// ============================================================================
// LoopbackElement
// ============================================================================

/// In-process DOM element.
pub struct LoopbackElement {
    tag: String,
    attributes: Mutex<BTreeMap<String, String>>,
    children: Mutex<Vec<Arc<LoopbackElement>>>,
    parent: Mutex<Weak<LoopbackElement>>,
    /// Content window of an iframe.
    content: Mutex<Option<Arc<LoopbackWindow>>>,
    host: Weak<LoopbackHost>,
    self_ref: Weak<LoopbackElement>,
    removed: AtomicBool,
}

impl fmt::Debug for LoopbackElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackElement")
            .field("tag", &self.tag)
            .field("attributes", &*self.attributes.lock())
            .field("children", &self.children.lock().len())
            .finish_non_exhaustive()
    }
}

impl LoopbackElement {
    fn new(tag: &str, host: Weak<LoopbackHost>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Mutex::new(BTreeMap::new()),
            children: Mutex::new(Vec::new()),
            parent: Mutex::new(Weak::new()),
            content: Mutex::new(None),
            host,
            self_ref: self_ref.clone(),
            removed: AtomicBool::new(false),
        })
    }

    /// Returns the current children.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<LoopbackElement>> {
        self.children.lock().clone()
    }

    /// Returns the loaded content window, if any.
    #[must_use]
    pub fn content_window(&self) -> Option<Arc<LoopbackWindow>> {
        self.content.lock().clone()
    }

    /// Returns `true` once removed from the document.
    #[inline]
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Marks this subtree detached and unloads its documents.
    fn detach(&self) {
        self.removed.store(true, Ordering::Release);

        if let Some(window) = self.content.lock().take() {
            window.unload();
        }

        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            child.detach();
        }
    }
}

impl Element for LoopbackElement {
    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn clear_children(&self) {
        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            child.detach();
        }
    }

    fn append_iframe(&self) -> Result<Arc<dyn Element>> {
        if self.tag == "iframe" {
            return Err(Error::invalid_target("an iframe cannot contain elements"));
        }

        let child = LoopbackElement::new("iframe", self.host.clone());
        *child.parent.lock() = self.self_ref.clone();
        self.children.lock().push(Arc::clone(&child));
        Ok(child)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .lock()
            .insert(name.to_string(), value.to_string());
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().get(name).cloned()
    }

    fn navigate(&self, url: &Url) -> Result<Arc<dyn BrowsingContext>> {
        if self.tag != "iframe" {
            return Err(Error::invalid_target(format!(
                "<{}> cannot be navigated",
                self.tag
            )));
        }
        let host = self
            .host
            .upgrade()
            .ok_or_else(|| Error::transport("host document is gone"))?;

        if let Some(previous) = self.content.lock().take() {
            previous.unload();
        }

        let (window, handle) = host.load(url);
        *self.content.lock() = Some(window);
        self.set_attribute("src", url.as_str());
        Ok(handle)
    }

    fn remove(&self) {
        if self.is_removed() {
            return;
        }

        let parent = self.parent.lock().upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .lock()
                .retain(|child| !std::ptr::eq(child.as_ref(), self));
        }
        if let Some(host) = self.host.upgrade() {
            host.forget(self);
        }

        self.detach();
    }
}

// ============================================================================
// Tests
// ============================================================================
