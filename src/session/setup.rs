//! Offline key generation and encryption of the controller

use tracing::info;

use crate::control::{ControllerKeys, ControllerMatrices};
use crate::error::Result;
use crate::ks::GaloisKeySet;
use crate::linalg::EncryptedMatrix;
use crate::math::{GaussianSampler, Matrix};
use crate::packing::{encrypt_packed, PackingLayout};
use crate::params::{ScalingParams, SchemeParams};
use crate::quantize::{quantize_state, QuantizedMatrices};
use crate::rlwe::RlweSecretKey;

use super::{SessionArtifacts, SessionManifest, MANIFEST_VERSION};

/// Builds a complete session from plaintext matrices.
///
/// # Example
///
/// ```no_run
/// use encctl::control::{ControllerMatrices, PidGains};
/// use encctl::params::{ScalingParams, SchemeParams};
/// use encctl::session::SessionBuilder;
///
/// let session = SessionBuilder::new(
///     SchemeParams::secure_128_d2048(),
///     ScalingParams::default(),
///     ControllerMatrices::pid(&PidGains::default()),
/// )
/// .build()?;
/// # Ok::<(), encctl::error::ControlError>(())
/// ```
pub struct SessionBuilder {
    scheme: SchemeParams,
    scaling: ScalingParams,
    matrices: ControllerMatrices,
    seed: Option<u64>,
}

impl SessionBuilder {
    pub fn new(scheme: SchemeParams, scaling: ScalingParams, matrices: ControllerMatrices) -> Self {
        Self {
            scheme,
            scaling,
            matrices,
            seed: None,
        }
    }

    /// Deterministic keys and encryption randomness
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SessionArtifacts> {
        self.scheme.validate()?;
        self.scaling.validate()?;
        self.matrices.validate()?;

        let dims = self.matrices.dimensions();
        let layout = PackingLayout::for_dimensions(self.scheme.ring_dim, &dims)?;
        let ctx = self.scheme.ntt_context();
        let gadget = self.scheme.gadget();
        let mut sampler = match self.seed {
            Some(seed) => GaussianSampler::with_seed(self.scheme.sigma, seed),
            None => GaussianSampler::new(self.scheme.sigma),
        };

        let m = &self.matrices;
        let quantized = QuantizedMatrices::new(&m.f, &m.g, &m.h, &m.j, &self.scaling)?;
        info!(
            n = dims.n,
            m = dims.m,
            p = dims.p,
            tau = layout.tau(),
            "quantized controller matrices"
        );

        let sk = RlweSecretKey::generate(&self.scheme, &mut sampler);
        let galois = GaloisKeySet::generate(&sk, &gadget, &mut sampler, &ctx);
        info!(keys = galois.len(), "generated Galois keys");

        let mut encrypt = |matrix: &Matrix<i64>, power: u32| {
            EncryptedMatrix::encrypt(&sk, matrix, power, &layout, &gadget, &mut sampler, &ctx)
        };
        let f = encrypt(&quantized.f, QuantizedMatrices::F_POWER)?;
        let g = encrypt(&quantized.g, QuantizedMatrices::G_POWER)?;
        let h = encrypt(&quantized.h, QuantizedMatrices::H_POWER)?;
        let j = encrypt(&quantized.j, QuantizedMatrices::J_POWER)?;
        info!("encrypted F, G, H, J");

        let x0_bar = quantize_state(&m.x0, &self.scaling);
        let x0 = encrypt_packed(
            &sk,
            &x0_bar,
            &layout,
            self.scaling.packing_factor(),
            1,
            &mut sampler,
            &ctx,
        )?;

        let manifest = SessionManifest {
            version: MANIFEST_VERSION,
            scheme: self.scheme.clone(),
            scaling: self.scaling,
            dims,
            key_fingerprint: galois.fingerprint()?,
        };

        Ok(SessionArtifacts {
            manifest,
            secret_key: sk,
            controller_keys: ControllerKeys {
                galois,
                f,
                g,
                h,
                j,
                x0,
            },
            reference: self.matrices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PidGains;
    use crate::error::ControlError;

    #[test]
    fn test_build_shapes_and_fingerprint() {
        let session = SessionBuilder::new(
            SchemeParams::insecure_d256(),
            ScalingParams::default(),
            ControllerMatrices::pid(&PidGains::default()),
        )
        .with_seed(111)
        .build()
        .unwrap();

        let keys = &session.controller_keys;
        assert_eq!((keys.f.rows(), keys.f.cols()), (4, 4));
        assert_eq!((keys.g.rows(), keys.g.cols()), (4, 2));
        assert_eq!((keys.h.rows(), keys.h.cols()), (1, 4));
        assert_eq!((keys.j.rows(), keys.j.cols()), (1, 2));
        assert_eq!(keys.j.s_power(), 2);
        assert_eq!(keys.x0.s_power, 1);
        assert_eq!(session.manifest.key_fingerprint, keys.galois.fingerprint().unwrap());
        assert_eq!(session.descriptor().tau, 4);
    }

    #[test]
    fn test_rejects_non_integer_f() {
        let mut matrices = ControllerMatrices::pid(&PidGains::default());
        matrices.f = Matrix::from_rows(vec![
            vec![0.5, 0.0, 0.0, 0.0],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
        ])
        .unwrap();
        let result = SessionBuilder::new(SchemeParams::insecure_d256(), ScalingParams::default(), matrices)
            .with_seed(112)
            .build();
        assert!(matches!(result, Err(ControlError::NonIntegerMatrix { name: "F", .. })));
    }
}
