//! Type-safe identifiers for channel entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Wraps | Scope |
//! |------|-------|-------|
//! | [`RequestId`] | `String` | Unique per outstanding request within one channel |
//! | [`ListenerId`] | `u64` | Handle for a `message` or event listener registration |
//! | [`ContextId`] | `u64` | One browsing context, stamped on the messages it posts |
//! | [`ChannelId`] | `Uuid` | One host↔wallet session, used in logs |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Reserved request ID of the readiness handshake.
const INIT_REQUEST_ID: &str = "init";

/// Prefix of sequential request IDs.
const SEQUENCE_PREFIX: &str = "action-";

/// Process-wide source of listener handles.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide source of browsing context IDs.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// RequestId
// ============================================================================

/// Correlation key of a request/response pair.
///
/// Sequential IDs have the form `action-<n>`; the handshake uses the reserved
/// ID `init`. Only uniqueness within a channel matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request ID from a raw string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reserved handshake ID.
    #[inline]
    #[must_use]
    pub fn init() -> Self {
        Self(INIT_REQUEST_ID.to_string())
    }

    /// Returns the sequential ID for counter value `n`.
    #[inline]
    #[must_use]
    pub fn sequence(n: u64) -> Self {
        Self(format!("{SEQUENCE_PREFIX}{n}"))
    }

    /// Returns `true` if this is the handshake ID.
    #[inline]
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.0 == INIT_REQUEST_ID
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// RequestCounter
// ============================================================================

/// Per-channel monotonic source of [`RequestId`]s.
#[derive(Debug, Default)]
pub struct RequestCounter(AtomicU64);

impl RequestCounter {
    /// Creates a counter whose first ID is `action-1`.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Allocates the next request ID.
    #[inline]
    pub fn next_id(&self) -> RequestId {
        RequestId::sequence(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Handle returned by listener registration, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generates a fresh, process-unique listener ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ============================================================================
// ContextId
// ============================================================================

/// Identity of a browsing context, the `event.source` of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Generates a fresh, process-unique context ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context-{}", self.0)
    }
}

// ============================================================================
// ChannelId
// ============================================================================

/// Identifies one host↔wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Generates a random channel ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_init_id() {
        let id = RequestId::init();
        assert!(id.is_init());
        assert_eq!(id.as_str(), "init");
        assert!(!RequestId::sequence(1).is_init());
    }

    #[test]
    fn test_counter_starts_at_one() {
        let counter = RequestCounter::new();
        assert_eq!(counter.next_id().as_str(), "action-1");
        assert_eq!(counter.next_id().as_str(), "action-2");
    }

    #[test]
    fn test_counters_are_independent() {
        let a = RequestCounter::new();
        let b = RequestCounter::new();
        a.next_id();
        assert_eq!(b.next_id(), RequestId::sequence(1));
    }

    #[test]
    fn test_request_id_serde_transparent() {
        let id = RequestId::sequence(3);
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"action-3\"");
        let parsed: RequestId = serde_json::from_str("\"init\"").expect("parse");
        assert!(parsed.is_init());
    }

    #[test]
    fn test_listener_ids_unique() {
        let a = ListenerId::generate();
        let b = ListenerId::generate();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_context_ids_unique() {
        let a = ContextId::generate();
        let b = ContextId::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("context-"));
    }

    proptest! {
        #[test]
        fn prop_counter_ids_are_unique(n in 1usize..200) {
            let counter = RequestCounter::new();
            let ids: std::collections::HashSet<_> = (0..n).map(|_| counter.next_id()).collect();
            prop_assert_eq!(ids.len(), n);
            prop_assert!(!ids.contains(&RequestId::init()));
        }
    }
}
