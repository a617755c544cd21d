//! Channel lifecycle state machine.
//!
//! ```text
//! Uninitialized ──► AwaitingInit ──► Ready ──► Closed
//!        │                │                      ▲
//!        └────────────────┴──────────────────────┘
//! ```
//!
//! Any state may move to [`ChannelState::Closed`]; nothing leaves it.

use std::fmt;

use parking_lot::Mutex;

// ============================================================================
// ChannelState
// ============================================================================

/// Lifecycle state of one side of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Constructed, nothing posted or attached yet.
    Uninitialized,
    /// Waiting for the `init` handshake response.
    AwaitingInit,
    /// Handshake complete; requests may flow.
    Ready,
    /// Torn down. Terminal.
    Closed,
}

impl ChannelState {
    /// Returns `true` if moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use ChannelState::*;
        matches!(
            (self, next),
            (Uninitialized, AwaitingInit)
                | (Uninitialized, Ready)
                | (AwaitingInit, Ready)
                | (Uninitialized | AwaitingInit | Ready, Closed)
        )
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingInit => "awaiting_init",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Shared, guarded [`ChannelState`].
#[derive(Debug)]
pub struct StateCell(Mutex<ChannelState>);

impl StateCell {
    /// Creates a cell in [`ChannelState::Uninitialized`].
    #[must_use]
    pub fn new() -> Self {
        Self(Mutex::new(ChannelState::Uninitialized))
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn get(&self) -> ChannelState {
        *self.0.lock()
    }

    /// Attempts a transition, returning the previous state on success.
    ///
    /// Returns `None` (leaving the state untouched) when the transition is
    /// not allowed, including any attempt to re-enter `Closed`.
    pub fn transition(&self, next: ChannelState) -> Option<ChannelState> {
        let mut state = self.0.lock();
        let previous = *state;
        if !previous.can_transition_to(next) {
            return None;
        }
        *state = next;
        Some(previous)
    }

    /// Moves to `Closed`. Returns `true` only for the call that closed it.
    #[inline]
    pub fn close(&self) -> bool {
        self.transition(ChannelState::Closed).is_some()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let cell = StateCell::new();
        assert_eq!(cell.transition(ChannelState::AwaitingInit), Some(ChannelState::Uninitialized));
        assert_eq!(cell.transition(ChannelState::Ready), Some(ChannelState::AwaitingInit));
        assert!(cell.close());
        assert_eq!(cell.get(), ChannelState::Closed);
    }

    #[test]
    fn test_closed_is_terminal() {
        let cell = StateCell::new();
        assert!(cell.close());
        assert!(!cell.close());
        assert_eq!(cell.transition(ChannelState::Ready), None);
        assert_eq!(cell.transition(ChannelState::AwaitingInit), None);
        assert_eq!(cell.get(), ChannelState::Closed);
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!ChannelState::Ready.can_transition_to(ChannelState::AwaitingInit));
        assert!(!ChannelState::AwaitingInit.can_transition_to(ChannelState::Uninitialized));
        assert!(!ChannelState::Ready.can_transition_to(ChannelState::Ready));
    }

    #[test]
    fn test_any_state_may_close() {
        for state in [
            ChannelState::Uninitialized,
            ChannelState::AwaitingInit,
            ChannelState::Ready,
        ] {
            assert!(state.can_transition_to(ChannelState::Closed));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ChannelState::AwaitingInit.to_string(), "awaiting_init");
    }
}
