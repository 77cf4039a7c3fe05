//! Startup capability detection for the optional camera and LED hardware.

use crate::camera::LibcameraDevice;
use crate::config::LapsecamConfig;
use crate::indicator::SysfsLedDriver;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Whether a piece of optional hardware can be driven
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HardwareStatus {
    Available,
    Absent { reason: String },
}

impl HardwareStatus {
    pub fn absent<S: Into<String>>(reason: S) -> Self {
        Self::Absent {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for HardwareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Absent { reason } => write!(f, "absent ({})", reason),
        }
    }
}

/// Detection results for every optional device
#[derive(Debug, Clone, Serialize)]
pub struct HardwareReport {
    pub camera: HardwareStatus,
    pub indicator: HardwareStatus,
}

impl HardwareReport {
    pub fn detect(config: &LapsecamConfig) -> Self {
        let report = Self {
            camera: LibcameraDevice::detect(&config.camera),
            indicator: SysfsLedDriver::detect(&config.indicator.device),
        };

        if report.camera.is_available() {
            info!("Camera: {}", report.camera);
        } else {
            warn!("Camera: {}; captures will be skipped", report.camera);
        }

        if report.indicator.is_available() {
            info!("Indicator: {}", report.indicator);
        } else {
            warn!("Indicator: {}; LED commands will be ignored", report.indicator);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_hardware_is_absent() {
        let mut config = LapsecamConfig::default();
        config.camera.enabled = false;
        config.indicator.device = "/nonexistent/leds/lapsecam".to_string();

        let report = HardwareReport::detect(&config);
        assert!(!report.camera.is_available());
        assert!(!report.indicator.is_available());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(HardwareStatus::Available.to_string(), "available");
        assert_eq!(
            HardwareStatus::absent("no camera").to_string(),
            "absent (no camera)"
        );
    }
}
