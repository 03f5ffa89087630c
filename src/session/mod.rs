//! Session artifacts
//!
//! The offline setup produces everything both hosts need:
//!
//! | File              | Content                                | Used by    |
//! |-------------------|----------------------------------------|------------|
//! | `session.json`    | [`SessionManifest`]                    | both       |
//! | `secret_key.bin`  | RLWE secret key                        | plant      |
//! | `galois_keys.bin` | Galois key set for unpacking           | controller |
//! | `ct_{f,g,h,j}.bin`| RGSW-encrypted controller matrices     | controller |
//! | `x0.bin`          | packed encrypted initial state         | controller |
//! | `reference.json`  | plaintext matrices and x₀              | plant      |
//!
//! The controller host never opens `secret_key.bin`.

mod setup;
mod store;

use serde::{Deserialize, Serialize};

use crate::control::{ControllerKeys, ControllerMatrices, EncryptedController, Plant, ReferenceController};
use crate::error::Result;
use crate::math::GaussianSampler;
use crate::params::{Dimensions, ScalingParams, SchemeParams};
use crate::rlwe::RlweSecretKey;
use crate::wire::SessionDescriptor;

pub use setup::SessionBuilder;
pub use store::{
    load_controller_keys, load_manifest, load_reference, load_secret_key, save_session,
};

pub const MANIFEST_VERSION: u32 = 1;

/// Public session parameters, written as `session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub version: u32,
    pub scheme: SchemeParams,
    pub scaling: ScalingParams,
    pub dims: Dimensions,
    /// SHA-256 of the serialized Galois key set
    pub key_fingerprint: [u8; 32],
}

impl SessionManifest {
    pub fn descriptor(&self) -> SessionDescriptor {
        SessionDescriptor::new(&self.scheme, &self.scaling, &self.dims, self.key_fingerprint)
    }
}

/// Complete in-memory session, as produced by [`SessionBuilder`]
#[derive(Clone)]
pub struct SessionArtifacts {
    pub manifest: SessionManifest,
    pub secret_key: RlweSecretKey,
    pub controller_keys: ControllerKeys,
    pub reference: ControllerMatrices,
}

impl SessionArtifacts {
    /// Plant with a freshly seeded sampler
    pub fn plant(&self) -> Result<Plant> {
        let m = &self.manifest;
        Plant::new(
            &m.scheme,
            m.scaling,
            m.dims,
            self.secret_key.clone(),
            GaussianSampler::new(m.scheme.sigma),
        )
    }

    pub fn controller(&self) -> Result<EncryptedController> {
        EncryptedController::new(
            &self.manifest.scheme,
            self.manifest.dims,
            self.controller_keys.clone(),
        )
    }

    pub fn reference_controller(&self) -> Result<ReferenceController> {
        ReferenceController::new(self.reference.clone())
    }

    pub fn descriptor(&self) -> SessionDescriptor {
        self.manifest.descriptor()
    }
}
