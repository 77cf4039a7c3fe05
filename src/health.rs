//! Host metrics shown on the dashboard: disk usage and SoC temperature.

use crate::config::SystemConfig;
use crate::error::{LapsecamError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Raw filesystem figures in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    /// `total - used`, including blocks reserved for root
    pub free_bytes: u64,
    /// Space an unprivileged process can still write
    pub available_bytes: u64,
}

/// Disk usage in gigabytes, rounded to one decimal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskUsageReport {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub available_gb: f64,
}

impl DiskUsage {
    pub fn report(&self) -> DiskUsageReport {
        DiskUsageReport {
            total_gb: to_gb(self.total_bytes),
            used_gb: to_gb(self.used_bytes),
            free_gb: to_gb(self.free_bytes),
            available_gb: to_gb(self.available_bytes),
        }
    }
}

pub fn to_gb(bytes: u64) -> f64 {
    round_tenth(bytes as f64 / BYTES_PER_GB)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Reads host metrics fresh on every call
#[derive(Debug, Clone)]
pub struct HealthReporter {
    disk_path: PathBuf,
    thermal_zone: PathBuf,
}

impl HealthReporter {
    pub fn new<P: Into<PathBuf>, T: Into<PathBuf>>(disk_path: P, thermal_zone: T) -> Self {
        Self {
            disk_path: disk_path.into(),
            thermal_zone: thermal_zone.into(),
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(&config.disk_path, &config.thermal_zone_path)
    }

    pub async fn disk_usage(&self) -> Result<DiskUsage> {
        let path = self.disk_path.clone();
        tokio::task::spawn_blocking(move || read_disk_usage(&path))
            .await
            .map_err(|e| LapsecamError::system(format!("Disk usage task failed: {}", e)))?
    }

    /// Degrees Celsius, `None` when the thermal zone cannot be read
    pub async fn cpu_temperature(&self) -> Option<f64> {
        let raw = match tokio::fs::read_to_string(&self.thermal_zone).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No temperature from {}: {}", self.thermal_zone.display(), e);
                return None;
            }
        };

        raw.trim()
            .parse::<f64>()
            .ok()
            .map(|millidegrees| round_tenth(millidegrees / 1000.0))
    }
}

#[cfg(unix)]
fn read_disk_usage(path: &Path) -> Result<DiskUsage> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| LapsecamError::system(format!("Invalid disk path {}", path.display())))?;

    // SAFETY: statvfs only writes into the zeroed struct we own
    let stat = unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        stat
    };

    let frsize = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * frsize;
    let used = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64) * frsize;

    Ok(DiskUsage {
        total_bytes: total,
        used_bytes: used,
        free_bytes: total - used,
        available_bytes: stat.f_bavail as u64 * frsize,
    })
}

#[cfg(not(unix))]
fn read_disk_usage(_path: &Path) -> Result<DiskUsage> {
    Err(LapsecamError::system(
        "Disk usage not supported on this platform",
    ))
}
