use super::params::{TimelapseParameters, VideoParameters};
use super::state::{SessionGate, SessionLease, SessionSnapshot, SessionStatus};
use crate::camera::{CaptureDevice, CaptureOutcome, CaptureProfile, FrameStream};
use crate::config::LapsecamConfig;
use crate::error::Result;
use crate::indicator::IndicatorController;
use crate::media::{Category, MediaAsset, MediaStore};
use crate::tools::{templates, ToolRunner};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ffmpeg_command: String,
    pub video_fps: u32,
    pub tool_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &LapsecamConfig) -> Self {
        Self {
            ffmpeg_command: config.tools.ffmpeg_command.clone(),
            video_fps: config.camera.video_fps,
            tool_timeout: Duration::from_secs(config.tools.timeout_seconds),
        }
    }
}

/// Summary of a finished timelapse run
#[derive(Debug, Clone)]
pub struct TimelapseReport {
    pub folder: MediaAsset,
    pub frames_captured: u32,
    pub frames_failed: u32,
    pub cancelled: bool,
}

/// Live preview holding the session until dropped
pub struct PreviewStream {
    frames: FrameStream,
    _lease: SessionLease,
}

impl PreviewStream {
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        self.frames.next_frame().await
    }
}

/// Coordinates every use of the camera: at most one photo, video,
/// timelapse or preview at a time.
pub struct CaptureSession {
    gate: Arc<SessionGate>,
    device: Arc<dyn CaptureDevice>,
    indicator: Arc<IndicatorController>,
    store: Arc<MediaStore>,
    runner: Arc<dyn ToolRunner>,
    settings: SessionSettings,
}

impl CaptureSession {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        indicator: Arc<IndicatorController>,
        store: Arc<MediaStore>,
        runner: Arc<dyn ToolRunner>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            gate: SessionGate::new(),
            device,
            indicator,
            store,
            runner,
            settings,
        }
    }

    pub fn status(&self) -> SessionSnapshot {
        self.gate.snapshot()
    }

    pub fn camera_available(&self) -> bool {
        self.device.is_available()
    }

    /// Request the running activity to stop; no-op when idle
    pub fn stop(&self) -> bool {
        self.gate.request_stop()
    }

    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.gate.wait_idle(timeout).await
    }

    /// Take one photo and return once it is stored. `Ok(None)` if there is
    /// no camera.
    pub async fn capture_photo(&self) -> Result<Option<MediaAsset>> {
        let _lease = self.gate.try_begin(SessionStatus::CapturingPhoto)?;

        let result = self.run_photo().await;
        if let Err(e) = &result {
            error!("Photo capture failed: {}", e);
        }
        result
    }

    /// Start a recording in the background
    pub fn start_video(
        self: &Arc<Self>,
        params: VideoParameters,
    ) -> Result<JoinHandle<Result<Option<MediaAsset>>>> {
        let lease = self.gate.try_begin(SessionStatus::RecordingVideo)?;
        let session = Arc::clone(self);

        Ok(tokio::spawn(async move {
            let _lease = lease;
            let result = session.run_video(params).await;
            if let Err(e) = &result {
                error!("Video recording failed: {}", e);
            }
            result
        }))
    }

    /// Start a timelapse in the background; it runs until its duration has
    /// elapsed or `stop` is called
    pub fn start_timelapse(
        self: &Arc<Self>,
        params: TimelapseParameters,
    ) -> Result<JoinHandle<Result<Option<TimelapseReport>>>> {
        let lease = self.gate.try_begin(SessionStatus::RunningTimelapse)?;
        let session = Arc::clone(self);

        Ok(tokio::spawn(async move {
            let _lease = lease;
            let result = session.run_timelapse(params).await;
            if let Err(e) = &result {
                error!("Timelapse failed: {}", e);
            }
            result
        }))
    }

    /// Switch the camera to preview and start streaming frames. The session
    /// stays busy until the returned stream is dropped.
    pub async fn open_preview(&self) -> Result<Option<PreviewStream>> {
        let lease = self.gate.try_begin(SessionStatus::Streaming)?;

        self.device.configure(CaptureProfile::Preview);
        match self.device.open_stream().await? {
            Some(frames) => Ok(Some(PreviewStream {
                frames,
                _lease: lease,
            })),
            None => {
                warn!("Preview requested but no camera is available");
                Ok(None)
            }
        }
    }

    async fn run_photo(&self) -> Result<Option<MediaAsset>> {
        let temp = self.store.temp_path("jpg").await?;

        self.device.configure(CaptureProfile::Still);
        let outcome = self
            .indicator
            .while_lit(self.device.capture_still(&temp))
            .await;

        match outcome {
            Ok(CaptureOutcome::Captured) => {}
            Ok(CaptureOutcome::Unavailable) => {
                warn!("Photo requested but no camera is available");
                return Ok(None);
            }
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        }

        let asset = match self.store.add_asset(Category::Photos, &temp).await {
            Ok(asset) => asset,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };

        self.generate_thumbnail(&asset).await;
        info!("Photo saved as {}", asset.key());
        Ok(Some(asset))
    }

    async fn run_video(&self, params: VideoParameters) -> Result<Option<MediaAsset>> {
        let raw = self.store.temp_path("h264").await?;
        let mp4 = self.store.temp_path("mp4").await?;

        self.device.configure(CaptureProfile::Video);
        let outcome = self
            .indicator
            .while_lit(self.device.record_video(&raw, params.duration))
            .await;

        match outcome {
            Ok(CaptureOutcome::Captured) => {}
            Ok(CaptureOutcome::Unavailable) => {
                warn!("Video requested but no camera is available");
                return Ok(None);
            }
            Err(e) => {
                discard(&raw).await;
                return Err(e);
            }
        }

        let transcode = templates::transcode_to_mp4(
            &self.settings.ffmpeg_command,
            &raw,
            &mp4,
            self.settings.video_fps,
        );
        let transcoded = self.runner.run(&transcode, self.settings.tool_timeout).await;
        discard(&raw).await;
        if let Err(e) = transcoded {
            discard(&mp4).await;
            return Err(e);
        }

        let asset = match self.store.add_asset(Category::Videos, &mp4).await {
            Ok(asset) => asset,
            Err(e) => {
                discard(&mp4).await;
                return Err(e);
            }
        };

        self.generate_thumbnail(&asset).await;
        info!("Video saved as {} ({:?})", asset.key(), params.duration);
        Ok(Some(asset))
    }

    async fn run_timelapse(&self, params: TimelapseParameters) -> Result<Option<TimelapseReport>> {
        if !self.device.is_available() {
            warn!("Timelapse requested but no camera is available");
            return Ok(None);
        }

        let folder = self.store.create_timelapse_folder().await?;
        info!(
            "Timelapse into {} every {:?} for {:?} (~{} frames)",
            folder.key(),
            params.interval,
            params.duration,
            params.expected_frames()
        );

        self.device.configure(CaptureProfile::Still);
        let report = self
            .indicator
            .while_lit(self.timelapse_frames(folder, params))
            .await;

        info!(
            "Timelapse {} finished: {} frames, {} failed{}",
            report.folder.key(),
            report.frames_captured,
            report.frames_failed,
            if report.cancelled { ", stopped early" } else { "" }
        );
        Ok(Some(report))
    }

    async fn timelapse_frames(
        &self,
        folder: MediaAsset,
        params: TimelapseParameters,
    ) -> TimelapseReport {
        let started = Instant::now();
        let deadline = started + params.duration;
        let mut ticker = tokio::time::interval_at(started, params.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut report = TimelapseReport {
            folder,
            frames_captured: 0,
            frames_failed: 0,
            cancelled: false,
        };
        loop {
            tokio::select! {
                biased;
                _ = self.gate.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                _ = ticker.tick() => {}
            }

            if self.gate.cancel_requested() {
                report.cancelled = true;
                break;
            }
            if Instant::now() >= deadline {
                break;
            }

            let index = report.frames_captured + 1;
            let guard = self
                .store
                .lock_asset(Category::Timelapses, &report.folder.name)
                .await;
            if !report.folder.path.is_dir() {
                warn!("Timelapse folder {} was removed, stopping", report.folder.key());
                break;
            }

            // A failed frame's slot is reused, so numbering stays contiguous
            let frame = report.folder.path.join(frame_name(index));
            match self.device.capture_still(&frame).await {
                Ok(CaptureOutcome::Captured) => {
                    report.frames_captured += 1;
                    debug!("Timelapse frame {} captured", index);
                }
                Ok(CaptureOutcome::Unavailable) => {
                    warn!("Camera went away during timelapse");
                    break;
                }
                Err(e) => {
                    report.frames_failed += 1;
                    discard(&frame).await;
                    warn!("Timelapse frame {} failed: {}", index, e);
                }
            }
            drop(guard);
        }

        report
    }

    async fn generate_thumbnail(&self, asset: &MediaAsset) {
        if let Err(e) = self.store.thumbnail_for(asset).await {
            warn!("Thumbnail for {} failed: {}", asset.key(), e);
        }
    }
}

/// Six digits keep a week of one-second frames in lexical order
pub(crate) fn frame_name(index: u32) -> String {
    format!("image_{:06}.jpg", index)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
