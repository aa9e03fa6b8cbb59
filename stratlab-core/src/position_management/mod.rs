//! Protective exits attached to open positions.

pub mod protection;
pub mod ratchet;

pub use protection::{
    ProtectionFire, ProtectionModule, ProtectionSpec, ProtectionTrigger, ProtectionUnit,
};
pub use ratchet::StopRatchet;
