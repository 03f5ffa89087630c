//! Parameter sets for the encrypted controller
//!
//! Three groups of parameters are fixed for the lifetime of a session and
//! must agree between plant and controller:
//!
//! - [`SchemeParams`]: ring dimension, modulus, noise and gadget shape
//! - [`ScalingParams`]: fixed-point steps `r`, `s` and packing scale `L`
//! - [`Dimensions`]: controller state `n`, output `m` and measurement `p` sizes

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::math::gaussian::DEFAULT_SIGMA;
use crate::math::{NttContext, DEFAULT_Q};
use crate::rgsw::GadgetVector;

/// Security level for parameter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// 128-bit security (recommended)
    Bits128,
    /// Toy parameters for tests and benchmarks only
    Insecure,
}

/// Core cryptographic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeParams {
    /// Ring dimension N (power of two)
    pub ring_dim: usize,

    /// Ciphertext modulus q
    /// Must be NTT-friendly: q ≡ 1 (mod 2N)
    pub q: u64,

    /// Standard deviation for Gaussian error sampling
    pub sigma: f64,

    /// Gadget decomposition base z (power of two)
    pub gadget_base: u64,

    /// Number of digits in gadget decomposition: ℓ = ⌈log_z(q)⌉
    pub gadget_len: usize,

    /// Target security level
    pub security_level: SecurityLevel,
}

impl SchemeParams {
    /// 128-bit secure parameters for N=2048
    pub fn secure_128_d2048() -> Self {
        // q = 2^60 - 2^14 + 1 ≡ 1 (mod 4096)
        let q = DEFAULT_Q;
        // Unpack noise grows with z·√ℓ and reaches u multiplied by J̄;
        // z = 2^4 keeps default sessions within 1e-2 of the plaintext law.
        let gadget_base: u64 = 1 << 4;
        let gadget_len = ((q as f64).log2() / 4.0).ceil() as usize; // 15

        Self {
            ring_dim: 2048,
            q,
            sigma: DEFAULT_SIGMA,
            gadget_base,
            gadget_len,
            security_level: SecurityLevel::Bits128,
        }
    }

    /// Small ring for tests and benches. Not secure.
    pub fn insecure_d256() -> Self {
        Self {
            ring_dim: 256,
            q: DEFAULT_Q,
            sigma: DEFAULT_SIGMA,
            gadget_base: 1 << 10,
            gadget_len: 6,
            security_level: SecurityLevel::Insecure,
        }
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two() || self.ring_dim < 2 {
            return Err(ControlError::InvalidParams(
                "ring_dim must be a power of two".into(),
            ));
        }

        if self.q % (2 * self.ring_dim as u64) != 1 {
            return Err(ControlError::InvalidParams(
                "q must be ≡ 1 (mod 2N) for NTT".into(),
            ));
        }

        if !self.gadget_base.is_power_of_two() || self.gadget_base < 2 {
            return Err(ControlError::InvalidParams(
                "gadget_base must be a power of two".into(),
            ));
        }

        let log_z = self.gadget_base.trailing_zeros() as usize;
        if log_z * self.gadget_len < 64 - self.q.leading_zeros() as usize {
            return Err(ControlError::InvalidParams(format!(
                "gadget z^ℓ = 2^{} does not cover q",
                log_z * self.gadget_len
            )));
        }

        if !(self.sigma > 0.0) {
            return Err(ControlError::InvalidParams("sigma must be positive".into()));
        }

        Ok(())
    }

    pub fn ntt_context(&self) -> NttContext {
        NttContext::new(self.ring_dim, self.q)
    }

    pub fn gadget(&self) -> GadgetVector {
        GadgetVector::new(self.gadget_base, self.gadget_len, self.q)
    }
}

impl Default for SchemeParams {
    fn default() -> Self {
        Self::secure_128_d2048()
    }
}

/// Fixed-point scaling: measurement step `r`, matrix step `s`, packing scale `L`.
///
/// A value packed at matrix power k decodes as `v / (r · s^k · L)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub r: f64,
    pub s: f64,
    #[serde(rename = "L")]
    pub l: f64,
}

impl ScalingParams {
    pub fn new(r: f64, s: f64, l: f64) -> Result<Self> {
        let params = Self { r, s, l };
        params.validate()?;
        Ok(params)
    }

    /// All steps positive and `1/L` a positive integer.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("r", self.r), ("s", self.s), ("L", self.l)] {
            if !(v > 0.0) || !v.is_finite() {
                return Err(ControlError::InvalidParams(format!(
                    "scaling parameter {} must be positive, got {}",
                    name, v
                )));
            }
        }

        let inv = 1.0 / self.l;
        let rounded = inv.round();
        if rounded < 1.0 || ((inv - rounded) / inv).abs() > 1e-9 {
            return Err(ControlError::InvalidParams(format!(
                "1/L must be a positive integer, got {}",
                inv
            )));
        }
        if rounded >= u64::MAX as f64 {
            return Err(ControlError::InvalidParams("1/L is too large".into()));
        }
        Ok(())
    }

    /// The integer packing factor `1/L`
    pub fn packing_factor(&self) -> u64 {
        (1.0 / self.l).round() as u64
    }

    /// Decode factor `r · s^k · L` for a value at matrix power `k`
    pub fn rescale(&self, k: u32) -> f64 {
        self.r * self.s.powi(k as i32) * self.l
    }
}

impl Default for ScalingParams {
    fn default() -> Self {
        Self {
            r: 1e-3,
            s: 1e-1,
            l: 1e-9,
        }
    }
}

/// Controller dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// State size
    pub n: usize,
    /// Output size
    pub m: usize,
    /// Measurement size
    pub p: usize,
}

impl Dimensions {
    pub fn new(n: usize, m: usize, p: usize) -> Result<Self> {
        let dims = Self { n, m, p };
        dims.validate()?;
        Ok(dims)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n == 0 || self.m == 0 || self.p == 0 {
            return Err(ControlError::Dimension(format!(
                "dimensions must be positive: n={}, m={}, p={}",
                self.n, self.m, self.p
            )));
        }
        Ok(())
    }

    /// Packing group size τ = 2^⌈log2 max(n, m, p)⌉
    pub fn tau(&self) -> usize {
        self.n.max(self.m).max(self.p).next_power_of_two()
    }

    pub fn log_tau(&self) -> u32 {
        self.tau().trailing_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        assert!(SchemeParams::default().validate().is_ok());
        assert!(SchemeParams::insecure_d256().validate().is_ok());
        let secure = SchemeParams::secure_128_d2048();
        assert_eq!((secure.gadget_base, secure.gadget_len), (16, 15));
    }

    #[test]
    fn test_invalid_scheme_params() {
        let mut p = SchemeParams::insecure_d256();
        p.ring_dim = 300;
        assert!(p.validate().is_err());

        let mut p = SchemeParams::insecure_d256();
        p.gadget_len = 2;
        assert!(p.validate().is_err());

        let mut p = SchemeParams::insecure_d256();
        p.q = 1 << 40;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_scaling_packing_factor() {
        let s = ScalingParams::new(1e-3, 0.1, 1e-10).unwrap();
        assert_eq!(s.packing_factor(), 10_000_000_000);
        assert!((s.rescale(2) - 1e-15).abs() < 1e-27);
    }

    #[test]
    fn test_scaling_rejects_non_integer_inverse() {
        assert!(ScalingParams::new(1e-3, 0.1, 0.3).is_err());
        assert!(ScalingParams::new(0.0, 0.1, 1e-4).is_err());
        assert!(ScalingParams::new(1e-3, -0.1, 1e-4).is_err());
    }

    #[test]
    fn test_tau() {
        assert_eq!(Dimensions::new(4, 1, 2).unwrap().tau(), 4);
        assert_eq!(Dimensions::new(5, 1, 2).unwrap().tau(), 8);
        assert_eq!(Dimensions::new(1, 1, 1).unwrap().tau(), 1);
        assert_eq!(Dimensions::new(4, 1, 2).unwrap().log_tau(), 2);
        assert!(Dimensions::new(0, 1, 2).is_err());
    }
}
