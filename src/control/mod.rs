//! Controller and plant sides of the encrypted loop
//!
//! The controller evaluates a linear state-space law
//!
//! ```text
//! x⁺ = F·x + G·y
//! u  = H·x + J·y
//! ```
//!
//! entirely on ciphertexts. It never holds the secret key: [`EncryptedController`]
//! is built from evaluation keys and encrypted matrices only. The plant owns
//! the key ([`Plant`]), encrypts measurements, decrypts outputs and gates them
//! through the [`SafetyGovernor`] before actuation.

mod controller;
mod model;
mod plant;
mod safety;
mod serve;

use std::fmt;

pub use controller::{ControllerKeys, EncryptedController, PendingUpdate};
pub use model::{ControllerMatrices, PidGains, ReferenceController};
pub use plant::{LoopSummary, Plant, PlantLoop, PlantLoopOptions};
pub use safety::{Governed, SafetyGovernor, SafetyLimits};
pub use serve::{ControllerSession, SessionReport};

/// Lifecycle of [`EncryptedController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, or the session has finished
    Idle,
    AwaitingMeasurement,
    Computing,
    /// Output produced; state update pending until the output is flushed
    AwaitingAck,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingMeasurement => "awaiting-measurement",
            Phase::Computing => "computing",
            Phase::AwaitingAck => "awaiting-ack",
        };
        f.write_str(name)
    }
}
