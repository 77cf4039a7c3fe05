use crate::error::{HardwareError, Result};
use crate::hardware::HardwareStatus;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub type Rgb = (u8, u8, u8);

/// Low-level LED output. Implementations do no settling or error swallowing.
pub trait IndicatorDriver: Send + Sync {
    fn name(&self) -> &str;
    fn set_color(&self, color: Rgb) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Driver used when no LED hardware is present
#[derive(Debug, Default)]
pub struct NullIndicatorDriver;

impl IndicatorDriver for NullIndicatorDriver {
    fn name(&self) -> &str {
        "none"
    }

    fn set_color(&self, _color: Rgb) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Linux LED class device (`/sys/class/leds/<name>`), optionally multicolor
pub struct SysfsLedDriver {
    dir: PathBuf,
    name: String,
    max_brightness: u32,
}

impl SysfsLedDriver {
    /// Check for a writable LED class directory
    pub fn detect<P: AsRef<Path>>(dir: P) -> HardwareStatus {
        let dir = dir.as_ref();
        if dir.join("brightness").is_file() {
            HardwareStatus::Available
        } else {
            HardwareStatus::absent(format!("no LED class device at {}", dir.display()))
        }
    }

    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        let dir = dir.into();
        let max_brightness = fs::read_to_string(dir.join("max_brightness"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(255);
        let name = dir.display().to_string();

        Self {
            dir,
            name,
            max_brightness,
        }
    }

    fn write_attr(&self, attr: &str, value: &str) -> Result<()> {
        fs::write(self.dir.join(attr), value).map_err(|e| {
            HardwareError::IndicatorWrite {
                device: self.name.clone(),
                source: e,
            }
            .into()
        })
    }
}

impl IndicatorDriver for SysfsLedDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_color(&self, color: Rgb) -> Result<()> {
        // Single-colour LEDs have no multi_intensity; they just light up
        if self.dir.join("multi_intensity").is_file() {
            let intensity = format!("{} {} {}", color.0, color.1, color.2);
            self.write_attr("multi_intensity", &intensity)?;
        }

        let brightness = if color == (0, 0, 0) {
            0
        } else {
            self.max_brightness
        };
        self.write_attr("brightness", &brightness.to_string())?;

        debug!("LED {} set to {:?}", self.name, color);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.write_attr("brightness", "0")?;
        debug!("LED {} cleared", self.name);
        Ok(())
    }
}
