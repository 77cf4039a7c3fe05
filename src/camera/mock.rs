use super::device::{CaptureDevice, CaptureOutcome, CaptureProfile, FrameStream};
use crate::error::{LapsecamError, Result, ToolError};
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, Rgb, RgbImage};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Encode a small moving test pattern as JPEG
pub fn synthetic_jpeg(width: u32, height: u32, seed: u32) -> Result<Vec<u8>> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        let shift = seed.wrapping_mul(7);
        Rgb([
            ((x + shift) % 256) as u8,
            ((y + shift) % 256) as u8,
            ((x + y) / 2 % 256) as u8,
        ])
    });

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, 80).encode(
        image.as_raw(),
        width,
        height,
        ColorType::Rgb8,
    )?;
    Ok(encoded)
}

fn simulated_failure(program: &str) -> LapsecamError {
    LapsecamError::Tool(ToolError::Failed {
        program: program.to_string(),
        code: Some(1),
        stderr: "simulated capture failure".to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCaptureMode {
    Working,
    /// Every capture reports a tool failure
    Failing,
    /// Every second still fails; recordings and the preview work
    Flaky,
    Unavailable,
}

/// Camera stand-in producing synthetic images, for tests and `--simulate`
pub struct MockCaptureDevice {
    mode: MockCaptureMode,
    profile: Mutex<CaptureProfile>,
    preview_resolution: (u32, u32),
    preview_fps: u32,
    realtime_video: bool,
    stills: AtomicU32,
    still_attempts: AtomicU32,
}

impl MockCaptureDevice {
    pub fn new(mode: MockCaptureMode) -> Self {
        Self {
            mode,
            profile: Mutex::new(CaptureProfile::Still),
            preview_resolution: (160, 120),
            preview_fps: 20,
            realtime_video: false,
            stills: AtomicU32::new(0),
            still_attempts: AtomicU32::new(0),
        }
    }

    pub fn working() -> Self {
        Self::new(MockCaptureMode::Working)
    }

    /// Make recordings take as long as requested
    pub fn with_realtime_video(mut self) -> Self {
        self.realtime_video = true;
        self
    }

    pub fn with_preview(mut self, resolution: (u32, u32), fps: u32) -> Self {
        self.preview_resolution = resolution;
        self.preview_fps = fps.max(1);
        self
    }

    pub fn stills_captured(&self) -> u32 {
        self.stills.load(Ordering::Relaxed)
    }

    pub fn current_profile(&self) -> CaptureProfile {
        *self.profile.lock()
    }

    fn check(&self, program: &str) -> Result<Option<CaptureOutcome>> {
        match self.mode {
            MockCaptureMode::Working | MockCaptureMode::Flaky => Ok(None),
            MockCaptureMode::Unavailable => Ok(Some(CaptureOutcome::Unavailable)),
            MockCaptureMode::Failing => Err(simulated_failure(program)),
        }
    }
}

#[async_trait]
impl CaptureDevice for MockCaptureDevice {
    fn is_available(&self) -> bool {
        self.mode != MockCaptureMode::Unavailable
    }

    fn configure(&self, profile: CaptureProfile) {
        *self.profile.lock() = profile;
    }

    async fn capture_still(&self, dest: &Path) -> Result<CaptureOutcome> {
        if let Some(outcome) = self.check("mock-still")? {
            return Ok(outcome);
        }
        let attempt = self.still_attempts.fetch_add(1, Ordering::Relaxed);
        if self.mode == MockCaptureMode::Flaky && attempt % 2 == 1 {
            return Err(simulated_failure("mock-still"));
        }

        let seed = self.stills.fetch_add(1, Ordering::Relaxed);
        let (width, height) = match self.current_profile() {
            CaptureProfile::Preview => self.preview_resolution,
            CaptureProfile::Still | CaptureProfile::Video => (320, 240),
        };
        let jpeg = synthetic_jpeg(width, height, seed)?;
        tokio::fs::write(dest, jpeg).await?;

        debug!("Mock still written to {}", dest.display());
        Ok(CaptureOutcome::Captured)
    }

    async fn record_video(&self, dest: &Path, duration: Duration) -> Result<CaptureOutcome> {
        if let Some(outcome) = self.check("mock-vid")? {
            return Ok(outcome);
        }

        if self.realtime_video {
            tokio::time::sleep(duration).await;
        }
        tokio::fs::write(dest, b"\x00\x00\x00\x01mock-h264").await?;

        debug!("Mock video written to {}", dest.display());
        Ok(CaptureOutcome::Captured)
    }

    async fn open_stream(&self) -> Result<Option<FrameStream>> {
        if self.check("mock-preview")?.is_some() {
            return Ok(None);
        }

        let (producer, stream) = FrameStream::channel();
        let (width, height) = self.preview_resolution;
        let period = Duration::from_millis(1000 / u64::from(self.preview_fps));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut seed = 0u32;

            loop {
                tokio::select! {
                    _ = producer.stopped() => break,
                    _ = ticker.tick() => {}
                }

                let frame = match synthetic_jpeg(width, height, seed) {
                    Ok(frame) => Bytes::from(frame),
                    Err(_) => break,
                };
                if !producer.publish(frame) {
                    break;
                }
                seed = seed.wrapping_add(1);
            }

            info!("Mock preview stopped after {} frames", seed);
        });

        Ok(Some(stream))
    }
}
