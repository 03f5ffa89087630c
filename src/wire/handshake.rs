//! Session parameter handshake
//!
//! The plant opens with `Hello(descriptor)`; the controller compares it with
//! its own descriptor and answers `HelloAck`. Both sides fail with
//! [`ControlError::ParameterMismatch`] when the descriptors differ.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{ControlError, Result};
use crate::params::{Dimensions, ScalingParams, SchemeParams};

use super::frame::{read_expected, write_frame, FrameKind, PROTOCOL_VERSION};

/// Everything both ends must agree on before exchanging ciphertexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub version: u8,
    pub scaling: ScalingParams,
    pub dims: Dimensions,
    pub tau: usize,
    pub ring_dim: usize,
    pub q: u64,
    pub gadget_base: u64,
    pub gadget_len: usize,
    pub key_fingerprint: [u8; 32],
}

impl SessionDescriptor {
    pub fn new(
        params: &SchemeParams,
        scaling: &ScalingParams,
        dims: &Dimensions,
        key_fingerprint: [u8; 32],
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            scaling: *scaling,
            dims: *dims,
            tau: dims.tau(),
            ring_dim: params.ring_dim,
            q: params.q,
            gadget_base: params.gadget_base,
            gadget_len: params.gadget_len,
            key_fingerprint,
        }
    }

    /// SHA-256 of the serialized descriptor
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        let bytes = bincode::serialize(self)?;
        let digest = Sha256::digest(&bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Ok(out)
    }

    /// Names of the fields that differ from `other`
    pub fn differences(&self, other: &SessionDescriptor) -> Vec<&'static str> {
        let mut diffs = Vec::new();
        if self.version != other.version {
            diffs.push("version");
        }
        if self.scaling != other.scaling {
            diffs.push("scaling");
        }
        if self.dims != other.dims {
            diffs.push("dimensions");
        }
        if self.tau != other.tau {
            diffs.push("tau");
        }
        if self.ring_dim != other.ring_dim {
            diffs.push("ring_dim");
        }
        if self.q != other.q {
            diffs.push("q");
        }
        if self.gadget_base != other.gadget_base || self.gadget_len != other.gadget_len {
            diffs.push("gadget");
        }
        if self.key_fingerprint != other.key_fingerprint {
            diffs.push("key_fingerprint");
        }
        diffs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAck {
    pub accepted: bool,
    /// Fingerprint of the controller's own descriptor
    pub fingerprint: [u8; 32],
}

/// Plant side: send our descriptor and wait for the verdict.
pub fn client_handshake<S: Read + Write>(stream: &mut S, local: &SessionDescriptor) -> Result<()> {
    write_frame(stream, FrameKind::Hello, local)?;
    let ack: HelloAck = read_expected(stream, FrameKind::HelloAck)?.ok_or_else(|| {
        ControlError::Protocol("connection closed during handshake".into())
    })?;

    if !ack.accepted {
        return Err(ControlError::ParameterMismatch(
            "controller rejected the session descriptor".into(),
        ));
    }
    if ack.fingerprint != local.fingerprint()? {
        return Err(ControlError::ParameterMismatch(
            "controller accepted with a different descriptor fingerprint".into(),
        ));
    }
    info!("handshake accepted");
    Ok(())
}

/// Controller side: read the peer's descriptor, compare and answer.
pub fn server_handshake<S: Read + Write>(stream: &mut S, local: &SessionDescriptor) -> Result<()> {
    let remote: SessionDescriptor = read_expected(stream, FrameKind::Hello)?.ok_or_else(|| {
        ControlError::Protocol("connection closed before handshake".into())
    })?;

    let diffs = local.differences(&remote);
    let ack = HelloAck {
        accepted: diffs.is_empty(),
        fingerprint: local.fingerprint()?,
    };
    write_frame(stream, FrameKind::HelloAck, &ack)?;

    if !diffs.is_empty() {
        warn!(fields = ?diffs, "rejecting session descriptor");
        return Err(ControlError::ParameterMismatch(format!(
            "peer disagrees on {}",
            diffs.join(", ")
        )));
    }
    info!("handshake accepted");
    Ok(())
}
