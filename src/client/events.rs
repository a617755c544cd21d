//! Host-side event bus.
//!
//! Listeners register for one [`EventKind`] or for the wildcard
//! [`EventKind::All`]. A concrete event reaches its specific listeners
//! first, then every wildcard listener; an event sent with the wildcard key
//! reaches wildcard listeners only.
//!
//! A listener that returns an error or panics is logged and skipped.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace};

use crate::error::Result;
use crate::identifiers::ListenerId;
use crate::protocol::{EventKind, WalletEvent};

// ============================================================================
// Types
// ============================================================================

/// Outcome of an event listener.
pub type ListenerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Event listener callback.
pub type EventCallback = Arc<dyn Fn(&WalletEvent) -> ListenerResult + Send + Sync>;

/// Listener lists keyed by kind.
type ListenerMap = FxHashMap<EventKind, Vec<(ListenerId, EventCallback)>>;

// ============================================================================
// EventBus
// ============================================================================

/// Per-channel registry of event listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<ListenerMap>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind`.
    pub fn add_listener<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&WalletEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let id = ListenerId::generate();
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        trace!(%kind, listener = %id, "Event listener added");
        id
    }

    /// Registers `callback` for the event key `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`](crate::Error::UnknownEvent) listing the
    /// valid keys if `name` is not one.
    pub fn add_listener_named<F>(&self, name: &str, callback: F) -> Result<ListenerId>
    where
        F: Fn(&WalletEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let kind: EventKind = name.parse()?;
        Ok(self.add_listener(kind, callback))
    }

    /// Removes a listener from `kind`. Returns `false` if it was not there.
    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(registered, _)| *registered != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }

    /// Removes a listener from the event key `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`](crate::Error::UnknownEvent) if `name`
    /// is not an event key.
    pub fn remove_listener_named(&self, name: &str, id: ListenerId) -> Result<bool> {
        let kind: EventKind = name.parse()?;
        Ok(self.remove_listener(kind, id))
    }

    /// Returns the total number of listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().values().map(Vec::len).sum()
    }

    /// Returns the number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count_for(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Delivers `event` to matching listeners.
    pub fn dispatch(&self, event: &WalletEvent) {
        let snapshot: Vec<(ListenerId, EventCallback)> = {
            let listeners = self.listeners.lock();
            let specific = if event.kind.is_wildcard() {
                None
            } else {
                listeners.get(&event.kind)
            };
            specific
                .into_iter()
                .chain(listeners.get(&EventKind::All))
                .flatten()
                .cloned()
                .collect()
        };

        trace!(kind = %event.kind, listeners = snapshot.len(), "Dispatching event");

        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(kind = %event.kind, listener = %id, error = %e, "Event listener failed");
                }
                Err(_) => {
                    error!(kind = %event.kind, listener = %id, "Event listener panicked");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::error::Error;

    fn recorder(bus: &EventBus, kind: EventKind, tag: &'static str, log: &Arc<Mutex<Vec<String>>>) {
        let log = Arc::clone(log);
        bus.add_listener(kind, move |event| {
            log.lock().push(format!("{tag}:{}", event.kind));
            Ok(())
        });
    }

    #[test]
    fn test_specific_then_wildcard() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, EventKind::All, "all", &log);
        recorder(&bus, EventKind::LogIn, "login", &log);
        recorder(&bus, EventKind::LogOut, "logout", &log);

        bus.dispatch(&WalletEvent::new(EventKind::LogIn, json!({ "address": "0xabc" })));

        assert_eq!(*log.lock(), vec!["login:log_in", "all:log_in"]);
    }

    #[test]
    fn test_wildcard_event_not_duplicated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, EventKind::All, "all", &log);
        recorder(&bus, EventKind::LogIn, "login", &log);

        bus.dispatch(&WalletEvent::bare(EventKind::All));

        assert_eq!(*log.lock(), vec!["all:all"]);
    }

    #[test]
    fn test_failing_listeners_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.add_listener(EventKind::Resize, |_| Err("listener bug".into()));
        bus.add_listener(EventKind::Resize, |_| panic!("listener panic"));
        recorder(&bus, EventKind::Resize, "ok", &log);

        bus.dispatch(&WalletEvent::new(
            EventKind::Resize,
            json!({ "width": 1, "height": 2 }),
        ));

        assert_eq!(*log.lock(), vec!["ok:resize"]);
    }

    #[test]
    fn test_named_registration() {
        let bus = EventBus::new();
        let id = bus
            .add_listener_named("route_change", |_| Ok(()))
            .expect("known key");
        assert_eq!(bus.listener_count_for(EventKind::RouteChange), 1);

        let err = bus.add_listener_named("sneeze", |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::UnknownEvent { .. }));
        assert!(err.to_string().contains("route_change"));

        assert!(bus.remove_listener_named("route_change", id).expect("known key"));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_remove_from_wrong_kind() {
        let bus = EventBus::new();
        let id = bus.add_listener(EventKind::Close, |_| Ok(()));
        assert!(!bus.remove_listener(EventKind::Loaded, id));
        assert!(bus.remove_listener(EventKind::Close, id));
        assert!(!bus.remove_listener(EventKind::Close, id));
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        bus.add_listener(EventKind::Close, |_| Ok(()));
        bus.add_listener(EventKind::All, |_| Ok(()));
        bus.clear();
        assert_eq!(bus.listener_count(), 0);
    }
}
