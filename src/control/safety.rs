//! Output gating on the plant side

use serde::{Deserialize, Serialize};

/// Physical envelope of the cart-pole
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    pub angle_limit: f64,
    pub position_limit: f64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            angle_limit: 40.0,
            position_limit: 50.0,
        }
    }
}

impl SafetyLimits {
    /// `y = (angle, position, ..)`; extra entries are ignored
    pub fn exceeded(&self, y: &[f64]) -> bool {
        let angle = y.first().copied().unwrap_or(0.0);
        let position = y.get(1).copied().unwrap_or(0.0);
        angle.abs() > self.angle_limit || position.abs() > self.position_limit
    }
}

/// Result of one governor decision
#[derive(Debug, Clone, PartialEq)]
pub struct Governed {
    pub output: Vec<f64>,
    pub clamped: bool,
}

/// Forces the output to zero while the measurement is out of bounds.
///
/// With `release_after = 0` a single in-bound sample releases the clamp.
/// With `release_after = k` the clamp holds until k consecutive in-bound
/// samples have been seen.
#[derive(Debug, Clone)]
pub struct SafetyGovernor {
    limits: SafetyLimits,
    release_after: u32,
    latched: bool,
    in_bounds: u32,
}

impl SafetyGovernor {
    pub fn new(limits: SafetyLimits, release_after: u32) -> Self {
        Self {
            limits,
            release_after,
            latched: false,
            in_bounds: 0,
        }
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub fn govern(&mut self, y: &[f64], u: &[f64]) -> Governed {
        if self.limits.exceeded(y) {
            self.latched = self.release_after > 0;
            self.in_bounds = 0;
            return Governed {
                output: vec![0.0; u.len()],
                clamped: true,
            };
        }

        if self.latched {
            self.in_bounds += 1;
            if self.in_bounds < self.release_after {
                return Governed {
                    output: vec![0.0; u.len()],
                    clamped: true,
                };
            }
            self.latched = false;
        }

        Governed {
            output: u.to_vec(),
            clamped: false,
        }
    }

    pub fn reset(&mut self) {
        self.latched = false;
        self.in_bounds = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_within_limits() {
        let mut gov = SafetyGovernor::new(SafetyLimits::default(), 0);
        let out = gov.govern(&[10.0, -20.0], &[3.5]);
        assert_eq!(out, Governed { output: vec![3.5], clamped: false });
    }

    #[test]
    fn test_limits_are_strict() {
        let mut gov = SafetyGovernor::new(SafetyLimits::default(), 0);
        assert!(!gov.govern(&[40.0, 50.0], &[1.0]).clamped);
        assert!(gov.govern(&[40.001, 0.0], &[1.0]).clamped);
        assert!(gov.govern(&[0.0, -50.5], &[1.0]).clamped);
    }

    #[test]
    fn test_immediate_release_without_hysteresis() {
        let mut gov = SafetyGovernor::new(SafetyLimits::default(), 0);
        let clamped = gov.govern(&[45.0, 0.0], &[2.0, -1.0]);
        assert_eq!(clamped.output, vec![0.0, 0.0]);
        assert!(clamped.clamped);
        assert!(!gov.govern(&[1.0, 0.0], &[2.0]).clamped);
    }

    #[test]
    fn test_debounced_release() {
        let mut gov = SafetyGovernor::new(SafetyLimits::default(), 3);
        assert!(gov.govern(&[41.0, 0.0], &[1.0]).clamped);
        assert!(gov.govern(&[0.0, 0.0], &[1.0]).clamped);
        assert!(gov.govern(&[0.0, 0.0], &[1.0]).clamped);
        assert!(!gov.govern(&[0.0, 0.0], &[1.0]).clamped);

        // An excursion restarts the count
        assert!(gov.govern(&[0.0, 60.0], &[1.0]).clamped);
        assert!(gov.govern(&[0.0, 0.0], &[1.0]).clamped);
        gov.reset();
        assert!(!gov.govern(&[0.0, 0.0], &[1.0]).clamped);
    }
}
