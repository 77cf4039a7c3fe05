use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Camera configuration selected before an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProfile {
    /// Low resolution for the live preview
    Preview,
    /// Full resolution stills, including timelapse frames
    Still,
    Video,
}

impl fmt::Display for CaptureProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preview => write!(f, "preview"),
            Self::Still => write!(f, "still"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Result of a capture request that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured,
    /// No camera present; nothing was written
    Unavailable,
}

/// Abstract camera. Implementations are not required to be reentrant; the
/// capture session guarantees one operation at a time.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    fn is_available(&self) -> bool;

    fn configure(&self, profile: CaptureProfile);

    /// Write one JPEG to `dest`
    async fn capture_still(&self, dest: &Path) -> Result<CaptureOutcome>;

    /// Record raw H.264 for `duration` into `dest`
    async fn record_video(&self, dest: &Path, duration: Duration) -> Result<CaptureOutcome>;

    /// Start the live preview. `None` when there is no camera.
    async fn open_stream(&self) -> Result<Option<FrameStream>>;
}

/// Device used when camera detection failed
pub struct UnavailableDevice {
    reason: String,
}

impl UnavailableDevice {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CaptureDevice for UnavailableDevice {
    fn is_available(&self) -> bool {
        false
    }

    fn configure(&self, profile: CaptureProfile) {
        debug!("Ignoring {} profile, camera absent: {}", profile, self.reason);
    }

    async fn capture_still(&self, _dest: &Path) -> Result<CaptureOutcome> {
        Ok(CaptureOutcome::Unavailable)
    }

    async fn record_video(&self, _dest: &Path, _duration: Duration) -> Result<CaptureOutcome> {
        Ok(CaptureOutcome::Unavailable)
    }

    async fn open_stream(&self) -> Result<Option<FrameStream>> {
        Ok(None)
    }
}

/// Consumer side of a live preview. Dropping it stops the producer.
pub struct FrameStream {
    frames: watch::Receiver<Option<Bytes>>,
    _stop: DropGuard,
}

/// Producer side of a live preview, owned by the device's capture task
pub struct FrameProducer {
    frames: watch::Sender<Option<Bytes>>,
    stop: CancellationToken,
}

impl FrameStream {
    pub fn channel() -> (FrameProducer, FrameStream) {
        let (tx, rx) = watch::channel(None);
        let stop = CancellationToken::new();

        let producer = FrameProducer {
            frames: tx,
            stop: stop.clone(),
        };
        let stream = FrameStream {
            frames: rx,
            _stop: stop.drop_guard(),
        };

        (producer, stream)
    }

    /// Wait for a frame newer than the last one returned. `None` once the
    /// producer has gone away; the stream cannot be restarted.
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            if self.frames.changed().await.is_err() {
                return None;
            }
            if let Some(frame) = self.frames.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }
}

impl FrameProducer {
    /// Publish the latest frame, replacing any the consumer has not read yet.
    /// Returns false once the consumer is gone.
    pub fn publish(&self, frame: Bytes) -> bool {
        !self.stop.is_cancelled() && self.frames.send(Some(frame)).is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled() || self.frames.is_closed()
    }

    /// Resolves when the consumer drops its stream
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }
}
