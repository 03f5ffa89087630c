//! On-disk session directory

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::control::{ControllerKeys, ControllerMatrices};
use crate::error::{ControlError, Result};
use crate::rlwe::RlweSecretKey;

use super::{SessionArtifacts, SessionManifest, MANIFEST_VERSION};

pub const MANIFEST_FILE: &str = "session.json";
pub const SECRET_KEY_FILE: &str = "secret_key.bin";
pub const GALOIS_KEYS_FILE: &str = "galois_keys.bin";
pub const CT_F_FILE: &str = "ct_f.bin";
pub const CT_G_FILE: &str = "ct_g.bin";
pub const CT_H_FILE: &str = "ct_h.bin";
pub const CT_J_FILE: &str = "ct_j.bin";
pub const X0_FILE: &str = "x0.bin";
pub const REFERENCE_FILE: &str = "reference.json";

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(fs::metadata(path)?.len())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write every artifact into `dir`, creating it if needed.
pub fn save_session(dir: &Path, session: &SessionArtifacts) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_json(&dir.join(MANIFEST_FILE), &session.manifest)?;
    write_bincode(&dir.join(SECRET_KEY_FILE), &session.secret_key)?;

    let keys = &session.controller_keys;
    let galois_size = write_bincode(&dir.join(GALOIS_KEYS_FILE), &keys.galois)?;
    info!("Galois keys saved: {:.2} MB", galois_size as f64 / (1024.0 * 1024.0));

    let mut matrix_bytes = 0;
    for (file, matrix) in [
        (CT_F_FILE, &keys.f),
        (CT_G_FILE, &keys.g),
        (CT_H_FILE, &keys.h),
        (CT_J_FILE, &keys.j),
    ] {
        matrix_bytes += write_bincode(&dir.join(file), matrix)?;
    }
    info!("encrypted matrices saved: {:.2} MB", matrix_bytes as f64 / (1024.0 * 1024.0));

    write_bincode(&dir.join(X0_FILE), &keys.x0)?;
    write_json(&dir.join(REFERENCE_FILE), &session.reference)?;
    Ok(())
}

pub fn load_manifest(dir: &Path) -> Result<SessionManifest> {
    let manifest: SessionManifest = read_json(&dir.join(MANIFEST_FILE))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ControlError::InvalidParams(format!(
            "session manifest version {} is not supported",
            manifest.version
        )));
    }
    manifest.scheme.validate()?;
    manifest.scaling.validate()?;
    manifest.dims.validate()?;
    Ok(manifest)
}

/// Everything the controller host loads; never touches the secret key
pub fn load_controller_keys(dir: &Path) -> Result<ControllerKeys> {
    Ok(ControllerKeys {
        galois: read_bincode(&dir.join(GALOIS_KEYS_FILE))?,
        f: read_bincode(&dir.join(CT_F_FILE))?,
        g: read_bincode(&dir.join(CT_G_FILE))?,
        h: read_bincode(&dir.join(CT_H_FILE))?,
        j: read_bincode(&dir.join(CT_J_FILE))?,
        x0: read_bincode(&dir.join(X0_FILE))?,
    })
}

pub fn load_secret_key(dir: &Path) -> Result<RlweSecretKey> {
    read_bincode(&dir.join(SECRET_KEY_FILE))
}

pub fn load_reference(dir: &Path) -> Result<ControllerMatrices> {
    let reference: ControllerMatrices = read_json(&dir.join(REFERENCE_FILE))?;
    reference.validate()?;
    Ok(reference)
}

impl SessionArtifacts {
    /// Load the full session (plant and controller material)
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = load_manifest(dir)?;
        let controller_keys = load_controller_keys(dir)?;
        let fingerprint = controller_keys.galois.fingerprint()?;
        if fingerprint != manifest.key_fingerprint {
            return Err(ControlError::ParameterMismatch(
                "Galois keys do not match the manifest fingerprint".into(),
            ));
        }
        Ok(Self {
            manifest,
            secret_key: load_secret_key(dir)?,
            controller_keys,
            reference: load_reference(dir)?,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        save_session(dir, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PidGains;
    use crate::params::{ScalingParams, SchemeParams};
    use crate::session::SessionBuilder;

    fn make_session(seed: u64) -> SessionArtifacts {
        SessionBuilder::new(
            SchemeParams::insecure_d256(),
            ScalingParams::new(1e-3, 0.1, 1e-10).unwrap(),
            ControllerMatrices::pid(&PidGains::default()),
        )
        .with_seed(seed)
        .build()
        .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = make_session(121);
        session.save(dir.path()).unwrap();

        for file in [
            MANIFEST_FILE,
            SECRET_KEY_FILE,
            GALOIS_KEYS_FILE,
            CT_F_FILE,
            CT_G_FILE,
            CT_H_FILE,
            CT_J_FILE,
            X0_FILE,
            REFERENCE_FILE,
        ] {
            assert!(dir.path().join(file).exists(), "missing {}", file);
        }

        let loaded = SessionArtifacts::load(dir.path()).unwrap();
        assert_eq!(loaded.manifest, session.manifest);
        assert_eq!(loaded.reference, session.reference);
        assert_eq!(loaded.controller_keys.x0, session.controller_keys.x0);
        assert!(loaded.controller().is_ok());
    }

    #[test]
    fn test_detects_swapped_keys() {
        let dir = tempfile::tempdir().unwrap();
        make_session(122).save(dir.path()).unwrap();

        let other = tempfile::tempdir().unwrap();
        make_session(123).save(other.path()).unwrap();
        fs::copy(
            other.path().join(GALOIS_KEYS_FILE),
            dir.path().join(GALOIS_KEYS_FILE),
        )
        .unwrap();

        assert!(matches!(
            SessionArtifacts::load(dir.path()),
            Err(ControlError::ParameterMismatch(_))
        ));
    }
}
