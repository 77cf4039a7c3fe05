use super::driver::{IndicatorDriver, NullIndicatorDriver, Rgb, SysfsLedDriver};
use crate::config::IndicatorConfig;
use crate::hardware::HardwareStatus;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Capture indicator. Driver failures are logged and never propagate.
pub struct IndicatorController {
    driver: Arc<dyn IndicatorDriver>,
    color: Rgb,
    on_settle: Duration,
    off_settle: Duration,
}

impl IndicatorController {
    pub fn new(
        driver: Arc<dyn IndicatorDriver>,
        color: Rgb,
        on_settle: Duration,
        off_settle: Duration,
    ) -> Self {
        Self {
            driver,
            color,
            on_settle,
            off_settle,
        }
    }

    /// Build the controller for whatever hardware detection found
    pub fn from_config(config: &IndicatorConfig, status: &HardwareStatus) -> Self {
        let driver: Arc<dyn IndicatorDriver> = match status {
            HardwareStatus::Available => Arc::new(SysfsLedDriver::new(&config.device)),
            HardwareStatus::Absent { .. } => Arc::new(NullIndicatorDriver),
        };

        info!("Indicator controller using driver '{}'", driver.name());

        Self::new(
            driver,
            config.color,
            Duration::from_millis(config.on_settle_ms),
            Duration::from_millis(config.off_settle_ms),
        )
    }

    /// Switch on in the configured colour and wait for the light to settle
    pub async fn turn_on(&self) {
        self.turn_on_with(self.color).await;
    }

    pub async fn turn_on_with(&self, color: Rgb) {
        info!("Turning on indicator");
        if let Err(e) = self.driver.set_color(color) {
            warn!("Indicator on failed, continuing: {}", e);
        }
        sleep(self.on_settle).await;
    }

    pub async fn turn_off(&self) {
        info!("Turning off indicator");
        if let Err(e) = self.driver.clear() {
            warn!("Indicator off failed, continuing: {}", e);
        }
        sleep(self.off_settle).await;
    }

    /// Run `work` with the indicator on; it is switched off afterwards whatever
    /// the outcome, and also if the future is dropped part way through.
    pub async fn while_lit<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        self.turn_on().await;
        let guard = LitGuard {
            driver: Arc::clone(&self.driver),
            armed: true,
        };

        let output = work.await;

        guard.disarm();
        self.turn_off().await;
        output
    }
}

/// Best-effort switch-off for a lit section that never reached its end
struct LitGuard {
    driver: Arc<dyn IndicatorDriver>,
    armed: bool,
}

impl LitGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LitGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.driver.clear() {
                warn!("Indicator off after cancelled capture failed: {}", e);
            }
        }
    }
}
