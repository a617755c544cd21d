//! Window-level `message` event target.
//!
//! A [`MessageSurface`] is the Rust counterpart of `window.addEventListener("message", ..)`:
//! every message posted to a browsing context is dispatched to every listener
//! registered on that context's surface, in registration order.
//!
//! Listeners are plain synchronous callbacks. A listener may add or remove
//! listeners (including itself) while being dispatched; the change takes
//! effect for the next message.
//!
//! A surface is shared by every channel of a page and reachable by any window
//! that holds a handle to it. Channel code checks each message with a
//! [`SenderFilter`] before looking at its payload.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{error, trace};

use crate::error::Result;
use crate::identifiers::{ContextId, ListenerId};

// ============================================================================
// Types
// ============================================================================

/// Callback invoked for each message delivered to a surface.
pub type MessageListener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

// ============================================================================
// MessageEvent
// ============================================================================

/// A delivered `postMessage` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Origin of the sending browsing context.
    pub origin: String,
    /// The sending browsing context, `None` if unknown.
    pub source: Option<ContextId>,
    /// Structured-clone of the posted message.
    pub data: Value,
}

impl MessageEvent {
    /// Creates a message event with no known source.
    #[inline]
    #[must_use]
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            source: None,
            data,
        }
    }

    /// Creates a message event posted by `source`.
    #[inline]
    #[must_use]
    pub fn from_source(origin: impl Into<String>, source: ContextId, data: Value) -> Self {
        Self {
            origin: origin.into(),
            source: Some(source),
            data,
        }
    }
}

// ============================================================================
// SenderFilter
// ============================================================================

/// Accepts only messages posted by one browsing context at one origin.
///
/// The source is bound once the context exists; until then every message
/// is rejected.
#[derive(Debug)]
pub struct SenderFilter {
    origin: String,
    source: Mutex<Option<ContextId>>,
}

impl SenderFilter {
    /// Creates an unbound filter for `origin`.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            source: Mutex::new(None),
        }
    }

    /// Creates a filter already bound to `source`.
    #[must_use]
    pub fn bound(origin: impl Into<String>, source: ContextId) -> Self {
        Self {
            origin: origin.into(),
            source: Mutex::new(Some(source)),
        }
    }

    /// Returns the expected origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the bound source, if any.
    #[must_use]
    pub fn source(&self) -> Option<ContextId> {
        *self.source.lock()
    }

    /// Runs `open` and binds the source of what it returns.
    ///
    /// The filter stays locked while `open` runs, so a listener checking a
    /// message on another thread waits for the binding instead of rejecting
    /// the first reply of the new context. `open` must not dispatch on a
    /// surface guarded by this filter.
    ///
    /// # Errors
    ///
    /// Propagates the error of `open`; the filter stays unbound.
    pub fn bind_with<T, F, S>(&self, open: F, source_of: S) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
        S: FnOnce(&T) -> ContextId,
    {
        let mut source = self.source.lock();
        let opened = open()?;
        *source = Some(source_of(&opened));
        Ok(opened)
    }

    /// Returns `true` if `event` comes from the bound source and origin.
    #[must_use]
    pub fn accepts(&self, event: &MessageEvent) -> bool {
        if event.origin != self.origin {
            return false;
        }
        match (event.source, *self.source.lock()) {
            (Some(actual), Some(expected)) => actual == expected,
            _ => false,
        }
    }
}

// ============================================================================
// MessageSurface
// ============================================================================

/// The `message` event target of one browsing context.
#[derive(Default)]
pub struct MessageSurface {
    /// Registered listeners in registration order.
    listeners: Mutex<Vec<(ListenerId, MessageListener)>>,
}

impl fmt::Debug for MessageSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSurface")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl MessageSurface {
    /// Creates a surface with no listeners.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its handle.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&MessageEvent) + Send + Sync + 'static,
    {
        let id = ListenerId::generate();
        self.listeners.lock().push((id, Arc::new(listener)));
        trace!(listener = %id, "Message listener added");
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        let removed = listeners.len() != before;
        if removed {
            trace!(listener = %id, "Message listener removed");
        }
        removed
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Delivers a message to every listener.
    ///
    /// A panicking listener is logged and does not stop delivery.
    pub fn dispatch(&self, event: &MessageEvent) {
        let snapshot: Vec<(ListenerId, MessageListener)> = self.listeners.lock().clone();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(listener = %id, origin = %event.origin, "Message listener panicked");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
