use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, unique within one strategy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ord-{}", self.0)
    }
}

/// Subscription ID, unique within one strategy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub usize);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Content hash of a parameter set (BLAKE3, hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamSetHash(pub String);

impl ParamSetHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for ParamSetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a whole run: strategy, parameters, and intent journal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunHash(pub String);

impl RunHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex chars, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic ID generator.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    next_order: u64,
    next_subscription: usize,
}

impl IdGen {
    pub fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(self.next_order)
    }

    pub fn next_subscription_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_deterministic() {
        assert_eq!(
            ParamSetHash::from_bytes(b"fast=10"),
            ParamSetHash::from_bytes(b"fast=10")
        );
        assert_ne!(
            ParamSetHash::from_bytes(b"fast=10"),
            ParamSetHash::from_bytes(b"fast=11")
        );
    }

    #[test]
    fn run_hash_short_prefix() {
        let h = RunHash::from_bytes(b"run");
        assert_eq!(h.short().len(), 12);
        assert!(h.0.starts_with(h.short()));
    }

    #[test]
    fn id_gen_is_monotonic() {
        let mut ids = IdGen::default();
        assert_eq!(ids.next_order_id(), OrderId(1));
        assert_eq!(ids.next_order_id(), OrderId(2));
        assert_eq!(ids.next_subscription_id(), SubscriptionId(0));
        assert_eq!(ids.next_subscription_id(), SubscriptionId(1));
    }
}
