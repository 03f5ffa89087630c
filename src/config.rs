//! Loop configuration, loaded once at startup.
//!
//! Scheme, scaling and dimension parameters are not configured here: they
//! belong to the session manifest written by the offline setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::SafetyLimits;
use crate::error::{ControlError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Controller data socket (`host:port`)
    pub data_addr: String,
    /// Optional pause/resume channel
    pub control_addr: Option<String>,
    pub serial_path: PathBuf,
    pub baud: u32,
    pub safety: SafetyLimits,
    /// In-bound samples required before a clamp releases (0 = immediately)
    pub release_after: u32,
    /// Cycles between timing reports
    pub report_interval: u64,
    pub period_ms: Option<u64>,
    pub max_cycles: Option<u64>,
    pub handshake: bool,
    pub session_dir: PathBuf,
    pub csv_path: Option<PathBuf>,
    pub reference_controller: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            data_addr: "192.168.0.115:8080".to_string(),
            control_addr: None,
            serial_path: PathBuf::from("/dev/ttyACM0"),
            baud: 115_200,
            safety: SafetyLimits::default(),
            release_after: 0,
            report_interval: 100,
            period_ms: None,
            max_cycles: None,
            handshake: true,
            session_dir: PathBuf::from("session"),
            csv_path: None,
            reference_controller: true,
        }
    }
}

impl LoopConfig {
    /// Read a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.report_interval == 0 {
            return Err(ControlError::InvalidParams(
                "report_interval must be positive".into(),
            ));
        }
        if self.period_ms == Some(0) {
            return Err(ControlError::InvalidParams("period_ms must be positive".into()));
        }
        let SafetyLimits {
            angle_limit,
            position_limit,
        } = self.safety;
        if !(angle_limit > 0.0) || !(position_limit > 0.0) {
            return Err(ControlError::InvalidParams(format!(
                "safety limits must be positive, got angle {} position {}",
                angle_limit, position_limit
            )));
        }
        Ok(())
    }

    pub fn period(&self) -> Option<Duration> {
        self.period_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.data_addr, "192.168.0.115:8080");
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.report_interval, 100);
        assert!(config.handshake);
        assert_eq!(config.safety.angle_limit, 40.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.json");
        fs::write(&path, r#"{ "data_addr": "127.0.0.1:9000", "period_ms": 20 }"#).unwrap();

        let config = LoopConfig::load(&path).unwrap();
        assert_eq!(config.data_addr, "127.0.0.1:9000");
        assert_eq!(config.period(), Some(Duration::from_millis(20)));
        assert_eq!(config.serial_path, PathBuf::from("/dev/ttyACM0"));

        config.save(&path).unwrap();
        assert_eq!(LoopConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = LoopConfig {
            report_interval: 0,
            ..LoopConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LoopConfig {
            safety: SafetyLimits {
                angle_limit: -1.0,
                position_limit: 50.0,
            },
            ..LoopConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
