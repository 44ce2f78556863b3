//! # Routing State
//!
//! Per-request routing flags: whether a route matched, whether routing was
//! canceled and whether propagation stops after the first match.
//!
//! The flags live in `Cell`s so handlers running inside a dispatch can flip
//! them through a shared reference. The type is deliberately `!Sync`: one
//! request, one state.

use std::cell::Cell;

/// Match, cancel and propagation flags for one routing pass
#[derive(Debug, Default)]
pub struct RouteState {
    did_match: Cell<bool>,
    canceled: Cell<bool>,
    stop_propagation: Cell<bool>,
}

impl RouteState {
    /// Create a fresh state (nothing matched, nothing canceled)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether further route attempts must be skipped without evaluation
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.canceled() || (self.did_match() && self.is_propagation_stopped())
    }

    /// Record a successful match
    pub fn mark_match(&self) {
        self.did_match.set(true);
    }

    /// Returns true if a route has matched
    #[must_use]
    pub fn did_match(&self) -> bool {
        self.did_match.get()
    }

    /// Invalidate a route match
    pub fn purge_match(&self) {
        self.did_match.set(false);
    }

    /// Suppress every further route attempt
    pub fn cancel(&self) {
        self.canceled.set(true);
    }

    /// Returns true if routing is canceled
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.canceled.get()
    }

    /// Avoid routes being called after the first match
    pub fn stop_propagation(&self) {
        self.stop_propagation.set(true);
    }

    /// Returns true if propagation has stopped
    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.stop_propagation.get()
    }

    /// Clear the cancel and stop-propagation flags (the match flag is kept)
    pub fn resume(&self) {
        self.stop_propagation.set(false);
        self.canceled.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_open() {
        let state = RouteState::new();
        assert!(!state.did_match());
        assert!(!state.canceled());
        assert!(!state.is_propagation_stopped());
        assert!(!state.is_blocked());
    }

    #[test]
    fn test_cancel_blocks_until_resume() {
        let state = RouteState::new();
        state.cancel();
        assert!(state.is_blocked());

        state.resume();
        assert!(!state.is_blocked());
    }

    #[test]
    fn test_stop_propagation_needs_a_match() {
        let state = RouteState::new();
        state.stop_propagation();
        assert!(!state.is_blocked());

        state.mark_match();
        assert!(state.is_blocked());

        state.purge_match();
        assert!(!state.is_blocked());
    }

    #[test]
    fn test_resume_keeps_match_flag() {
        let state = RouteState::new();
        state.mark_match();
        state.stop_propagation();
        state.resume();

        assert!(state.did_match());
        assert!(!state.is_propagation_stopped());
    }
}
