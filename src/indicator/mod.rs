mod controller;
mod driver;

pub use controller::IndicatorController;
pub use driver::{IndicatorDriver, NullIndicatorDriver, Rgb, SysfsLedDriver};
