//! Key-switching module
//!
//! Key switching transforms a ciphertext valid under secret key s into one
//! valid under s'. Here it only ever follows a Galois automorphism: after
//! σ_g the ciphertext is encrypted under σ_g(s), and the Galois key for g
//! brings it back to s.
//!
//! # Key-Switching Matrix
//!
//! ```text
//! K = [RLWE_{s'}(s·z^0), RLWE_{s'}(s·z^1), ..., RLWE_{s'}(s·z^(ℓ-1))]
//! ```
//!
//! # Algorithm
//!
//! To switch (a, b) from key s to key s':
//! 1. Decompose a using gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
//! 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]

mod keyset;
mod setup;
mod switch;

pub use keyset::GaloisKeySet;
pub use setup::{generate_automorphism_ks_matrix, generate_ks_matrix, KeySwitchingMatrix};
pub use switch::key_switch;
