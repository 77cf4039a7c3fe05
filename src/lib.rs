pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod hardware;
pub mod health;
pub mod indicator;
pub mod media;
pub mod power;
pub mod server;
pub mod session;
pub mod tools;

pub use app::{Component, ComponentState, ShutdownReason, StationOptions, StationOrchestrator};
pub use camera::{CaptureDevice, CaptureOutcome, CaptureProfile, LibcameraDevice, MockCaptureDevice};
pub use config::LapsecamConfig;
pub use error::{LapsecamError, Result};
pub use hardware::{HardwareReport, HardwareStatus};
pub use health::{DiskUsage, DiskUsageReport, HealthReporter};
pub use indicator::{IndicatorController, IndicatorDriver, Rgb};
pub use media::{Category, MediaAsset, MediaStore, ThumbnailGenerator};
pub use server::{StationServer, StationServerBuilder};
pub use session::{CaptureSession, SessionStatus, TimelapseParameters, VideoParameters};
pub use tools::{ShellToolRunner, ToolRunner};
