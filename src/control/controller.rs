//! Encrypted controller state machine

use rayon::join;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ControlError, Result};
use crate::ks::GaloisKeySet;
use crate::linalg::{add_packed, EncryptedMatrix, PreparedVector};
use crate::math::NttContext;
use crate::packing::{unpack, PackedCiphertext, PackingLayout};
use crate::params::{Dimensions, SchemeParams};
use crate::quantize::QuantizedMatrices;
use crate::rgsw::GadgetVector;

use super::Phase;

/// Evaluation material loaded by the controller host.
///
/// Nothing in here can decrypt: the Galois keys are key-switching matrices
/// and the rest are ciphertexts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerKeys {
    pub galois: GaloisKeySet,
    pub f: EncryptedMatrix,
    pub g: EncryptedMatrix,
    pub h: EncryptedMatrix,
    pub j: EncryptedMatrix,
    pub x0: PackedCiphertext,
}

/// Prepared x and y of the cycle whose output has been produced but whose
/// state update has not been applied yet.
#[derive(Debug)]
pub struct PendingUpdate {
    x: PreparedVector,
    y: PreparedVector,
}

/// Evaluates `u = H·x + J·y` and `x⁺ = F·x + G·y` on ciphertexts.
///
/// ```text
/// Idle ─start→ AwaitingMeasurement ─compute_output→ AwaitingAck ─commit→ AwaitingMeasurement
///                                   (via Computing)
/// any ─finish→ Idle
/// ```
pub struct EncryptedController {
    dims: Dimensions,
    layout: PackingLayout,
    gadget: GadgetVector,
    ctx: NttContext,
    keys: ControllerKeys,
    x: PackedCiphertext,
    phase: Phase,
}

impl EncryptedController {
    pub fn new(params: &SchemeParams, dims: Dimensions, keys: ControllerKeys) -> Result<Self> {
        params.validate()?;
        dims.validate()?;
        let layout = PackingLayout::for_dimensions(params.ring_dim, &dims)?;
        let Dimensions { n, m, p } = dims;

        keys.f.expect_shape("F", n, n)?;
        keys.g.expect_shape("G", n, p)?;
        keys.h.expect_shape("H", m, n)?;
        keys.j.expect_shape("J", m, p)?;

        let gadget = params.gadget();
        for (name, matrix, expected) in [
            ("F", &keys.f, QuantizedMatrices::F_POWER),
            ("G", &keys.g, QuantizedMatrices::G_POWER),
            ("H", &keys.h, QuantizedMatrices::H_POWER),
            ("J", &keys.j, QuantizedMatrices::J_POWER),
        ] {
            matrix.expect_gadget(name, &gadget)?;
            if matrix.s_power() != expected {
                return Err(ControlError::ScaleMismatch {
                    left: matrix.s_power(),
                    right: expected,
                });
            }
            if matrix.ring_dim() != params.ring_dim {
                return Err(ControlError::Dimension(format!(
                    "encrypted matrix ring dimension {} does not match {}",
                    matrix.ring_dim(),
                    params.ring_dim
                )));
            }
        }

        if keys.x0.s_power != 1 {
            return Err(ControlError::ScaleMismatch {
                left: keys.x0.s_power,
                right: 1,
            });
        }
        keys.x0.ct.check_ring(params.ring_dim, params.q)?;
        if keys.x0.slots != n {
            return Err(ControlError::Dimension(format!(
                "initial state holds {} slots, expected {}",
                keys.x0.slots, n
            )));
        }

        if keys.galois.ring_dim() != params.ring_dim {
            return Err(ControlError::Dimension(format!(
                "Galois keys are for ring dimension {}, expected {}",
                keys.galois.ring_dim(),
                params.ring_dim
            )));
        }
        keys.galois.expect_gadget(&gadget)?;
        if let Some(g) = GaloisKeySet::elements(params.ring_dim)
            .into_iter()
            .find(|&g| !keys.galois.contains(g))
        {
            return Err(ControlError::InvalidParams(format!(
                "missing Galois key for element {}",
                g
            )));
        }

        let x = keys.x0.clone();
        Ok(Self {
            dims,
            layout,
            gadget,
            ctx: params.ntt_context(),
            keys,
            x,
            phase: Phase::Idle,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current encrypted state
    pub fn state(&self) -> &PackedCiphertext {
        &self.x
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<()> {
        if self.phase != expected {
            return Err(ControlError::InvalidPhase {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.expect_phase("start", Phase::Idle)?;
        self.phase = Phase::AwaitingMeasurement;
        Ok(())
    }

    /// Produce the packed output for measurement `y`.
    ///
    /// The returned [`PendingUpdate`] must be passed to [`commit`](Self::commit)
    /// once the output has been delivered. On error the controller stays
    /// ready for another measurement with its state untouched.
    pub fn compute_output(
        &mut self,
        y: &PackedCiphertext,
    ) -> Result<(PackedCiphertext, PendingUpdate)> {
        self.expect_phase("compute_output", Phase::AwaitingMeasurement)?;
        self.phase = Phase::Computing;

        match self.evaluate_output(y) {
            Ok(result) => {
                self.phase = Phase::AwaitingAck;
                Ok(result)
            }
            Err(e) => {
                self.phase = Phase::AwaitingMeasurement;
                Err(e)
            }
        }
    }

    fn evaluate_output(&self, y: &PackedCiphertext) -> Result<(PackedCiphertext, PendingUpdate)> {
        if y.s_power != 0 {
            return Err(ControlError::ScaleMismatch {
                left: y.s_power,
                right: 0,
            });
        }
        if y.slots != self.dims.p {
            return Err(ControlError::Dimension(format!(
                "measurement holds {} slots, expected {}",
                y.slots, self.dims.p
            )));
        }

        let galois = &self.keys.galois;
        let (x_cts, y_cts) = join(
            || unpack(&self.x, self.dims.n, &self.layout, galois, &self.ctx),
            || unpack(y, self.dims.p, &self.layout, galois, &self.ctx),
        );
        let x = PreparedVector::new(&x_cts?, self.x.s_power, &self.gadget, &self.ctx);
        let y = PreparedVector::new(&y_cts?, y.s_power, &self.gadget, &self.ctx);

        let (hx, jy) = join(
            || self.keys.h.mult_pack(&x, &self.ctx),
            || self.keys.j.mult_pack(&y, &self.ctx),
        );
        let u = add_packed(&hx?, &jy?)?;
        debug!(slots = u.slots, s_power = u.s_power, "computed output");

        Ok((u, PendingUpdate { x, y }))
    }

    /// Apply x⁺ = F·x + G·y for the cycle that produced `pending`
    pub fn commit(&mut self, pending: PendingUpdate) -> Result<()> {
        self.expect_phase("commit", Phase::AwaitingAck)?;

        let (fx, gy) = join(
            || self.keys.f.mult_pack(&pending.x, &self.ctx),
            || self.keys.g.mult_pack(&pending.y, &self.ctx),
        );
        self.x = add_packed(&fx?, &gy?)?;
        self.phase = Phase::AwaitingMeasurement;
        Ok(())
    }

    /// compute_output followed by commit
    pub fn step(&mut self, y: &PackedCiphertext) -> Result<PackedCiphertext> {
        let (u, pending) = self.compute_output(y)?;
        self.commit(pending)?;
        Ok(u)
    }

    /// End the session. The state is kept so a later `start` resumes it.
    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
    }
}
