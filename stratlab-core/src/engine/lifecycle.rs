//! Strategy lifecycle state machine and the warm-up gate.
//!
//! ```text
//! Constructed -> Started -> (Trading <-> Suspended) -> Stopped -> (reset) -> Stopped
//!                   ^                                     |
//!                   +---------------- start --------------+
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Parameters declared, nothing subscribed.
    Constructed,
    /// `on_started` ran; indicators warming up.
    Started,
    /// Warm-up gate open: strategy intents are executed.
    Trading,
    /// Was trading, gate closed again (offline or trading disallowed).
    Suspended,
    Stopped,
}

impl LifecycleState {
    /// Started, Trading or Suspended.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            LifecycleState::Started | LifecycleState::Trading | LifecycleState::Suspended
        )
    }

    pub fn can_start(&self) -> bool {
        matches!(self, LifecycleState::Constructed | LifecycleState::Stopped)
    }

    pub fn can_reset(&self) -> bool {
        matches!(self, LifecycleState::Stopped)
    }

    /// Parameters are writable only while nothing is running.
    pub fn params_writable(&self) -> bool {
        !self.is_running()
    }

    /// Next state for a running instance given the warm-up predicate.
    pub fn after_gate(self, gate_open: bool) -> Self {
        match (self, gate_open) {
            (LifecycleState::Started, true) => LifecycleState::Trading,
            (LifecycleState::Trading, false) => LifecycleState::Suspended,
            (LifecycleState::Suspended, true) => LifecycleState::Trading,
            (state, _) => state,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Constructed => "Constructed",
            LifecycleState::Started => "Started",
            LifecycleState::Trading => "Trading",
            LifecycleState::Suspended => "Suspended",
            LifecycleState::Stopped => "Stopped",
        };
        write!(f, "{s}")
    }
}

/// Warm-up predicate: `formed && online && allowed_to_trade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupGate {
    pub formed: bool,
    pub online: bool,
    pub allowed_to_trade: bool,
}

impl WarmupGate {
    pub fn new(online: bool, allowed_to_trade: bool) -> Self {
        Self {
            formed: false,
            online,
            allowed_to_trade,
        }
    }

    pub fn is_open(&self) -> bool {
        self.formed && self.online && self.allowed_to_trade
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_requires_all_three() {
        let mut gate = WarmupGate::new(true, true);
        assert!(!gate.is_open());
        gate.formed = true;
        assert!(gate.is_open());
        gate.online = false;
        assert!(!gate.is_open());
        gate.online = true;
        gate.allowed_to_trade = false;
        assert!(!gate.is_open());
    }

    #[test]
    fn transitions_follow_gate() {
        use LifecycleState::*;
        assert_eq!(Started.after_gate(false), Started);
        assert_eq!(Started.after_gate(true), Trading);
        assert_eq!(Trading.after_gate(true), Trading);
        assert_eq!(Trading.after_gate(false), Suspended);
        assert_eq!(Suspended.after_gate(true), Trading);
        assert_eq!(Stopped.after_gate(true), Stopped);
        assert_eq!(Constructed.after_gate(true), Constructed);
    }

    #[test]
    fn start_and_reset_rules() {
        use LifecycleState::*;
        assert!(Constructed.can_start());
        assert!(Stopped.can_start());
        assert!(!Trading.can_start());
        assert!(Stopped.can_reset());
        assert!(!Suspended.can_reset());
        assert!(!Started.params_writable());
        assert!(Stopped.params_writable());
    }
}
