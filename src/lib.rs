//! encctl: encrypted state-space control over RLWE/RGSW
//!
//! A linear controller `x⁺ = F·x + G·y`, `u = H·x + J·y` runs on a remote
//! host that never sees plaintext: the plant encrypts each measurement,
//! the controller evaluates the law with RGSW-encrypted matrices, and only
//! the plant can decrypt the resulting output.
//!
//! Key components:
//! - Packing codec: up to τ scalars per RLWE ciphertext, unpacked with
//!   Galois automorphisms and key switching
//! - Encrypted linear algebra: RGSW(column) ⊡ RLWE(scalar) products that
//!   land back in the packed layout
//! - Controller state machine and plant loop over a framed TCP protocol,
//!   with a safety governor in front of the actuator

pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod ks;
pub mod linalg;
pub mod math;
pub mod packing;
pub mod params;
pub mod quantize;
pub mod rgsw;
pub mod rlwe;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod wire;

pub use control::{
    ControllerKeys, ControllerMatrices, ControllerSession, EncryptedController, Phase, PidGains,
    Plant, PlantLoop, ReferenceController, SafetyGovernor, SafetyLimits,
};
pub use error::{ControlError, Result};
pub use packing::{PackedCiphertext, PackingLayout};
pub use params::{Dimensions, ScalingParams, SchemeParams, SecurityLevel};
pub use session::{SessionArtifacts, SessionBuilder, SessionManifest};
