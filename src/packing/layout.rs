//! Slot layout for packed vectors
//!
//! A packed vector of group size τ lives in the sub-ring generated by
//! Y = X^stride (stride = N/τ). Slot j sits at coefficient
//! `stride · bitrev_{log2 τ}(j)`, which makes each halving step of the
//! unpacking tree split the slots into contiguous index ranges.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::params::Dimensions;

/// Reverse the low `bits` bits of `x`
#[inline]
pub fn bit_reverse(x: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    x.reverse_bits() >> (usize::BITS - bits)
}

/// Packing geometry for one ring dimension and group size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingLayout {
    ring_dim: usize,
    tau: usize,
}

impl PackingLayout {
    /// τ must be a power of two no larger than N.
    pub fn new(ring_dim: usize, tau: usize) -> Result<Self> {
        if !ring_dim.is_power_of_two() {
            return Err(ControlError::InvalidParams(format!(
                "ring dimension {} is not a power of two",
                ring_dim
            )));
        }
        if tau == 0 || !tau.is_power_of_two() {
            return Err(ControlError::InvalidParams(format!(
                "packing group size {} is not a power of two",
                tau
            )));
        }
        if tau > ring_dim {
            return Err(ControlError::InvalidParams(format!(
                "packing group size {} exceeds ring dimension {}",
                tau, ring_dim
            )));
        }
        Ok(Self { ring_dim, tau })
    }

    pub fn for_dimensions(ring_dim: usize, dims: &Dimensions) -> Result<Self> {
        Self::new(ring_dim, dims.tau())
    }

    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    pub fn tau(&self) -> usize {
        self.tau
    }

    pub fn log_tau(&self) -> u32 {
        self.tau.trailing_zeros()
    }

    /// N/τ
    pub fn stride(&self) -> usize {
        self.ring_dim / self.tau
    }

    pub fn log_stride(&self) -> u32 {
        self.stride().trailing_zeros()
    }

    /// Coefficient index holding slot `j`
    #[inline]
    pub fn slot_index(&self, j: usize) -> usize {
        debug_assert!(j < self.tau, "slot {} out of range for τ={}", j, self.tau);
        self.stride() * bit_reverse(j, self.log_tau())
    }

    /// Rejects `count > τ`.
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count > self.tau {
            return Err(ControlError::Dimension(format!(
                "{} slots requested but packing group holds {}",
                count, self.tau
            )));
        }
        Ok(())
    }

    /// Galois elements for the ring-switch trace, outermost first
    pub fn trace_elements(&self) -> Vec<usize> {
        (0..self.log_stride())
            .map(|k| (self.ring_dim >> k) + 1)
            .collect()
    }

    /// Galois element and X-exponent shift for splitting stage `i`
    pub fn split_stage(&self, i: u32) -> (usize, usize) {
        let g = (self.tau >> i) + 1;
        let shift = self.stride() << i;
        (g, shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_reverse() {
        assert_eq!(bit_reverse(0b001, 3), 0b100);
        assert_eq!(bit_reverse(0b110, 3), 0b011);
        assert_eq!(bit_reverse(1, 1), 1);
        assert_eq!(bit_reverse(0, 0), 0);
        assert_eq!((0..4).map(|j| bit_reverse(j, 2)).collect::<Vec<_>>(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_slot_indices() {
        let layout = PackingLayout::new(256, 4).unwrap();
        assert_eq!(layout.stride(), 64);
        let idx: Vec<usize> = (0..4).map(|j| layout.slot_index(j)).collect();
        assert_eq!(idx, vec![0, 128, 64, 192]);
    }

    #[test]
    fn test_rejects_bad_tau() {
        assert!(PackingLayout::new(256, 3).is_err());
        assert!(PackingLayout::new(256, 512).is_err());
        assert!(PackingLayout::new(256, 0).is_err());
        assert!(PackingLayout::new(256, 4).unwrap().check_count(5).is_err());
    }

    #[test]
    fn test_galois_schedule_covers_key_set() {
        let layout = PackingLayout::new(256, 4).unwrap();
        assert_eq!(layout.trace_elements(), vec![257, 129, 65, 33, 17, 9]);
        assert_eq!(layout.split_stage(0), (5, 64));
        assert_eq!(layout.split_stage(1), (3, 128));
    }

    #[test]
    fn test_tau_one() {
        let layout = PackingLayout::new(256, 1).unwrap();
        assert_eq!(layout.slot_index(0), 0);
        assert_eq!(layout.trace_elements().len(), 8);
    }
}
