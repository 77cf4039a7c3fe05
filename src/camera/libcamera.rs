use super::device::{CaptureDevice, CaptureOutcome, CaptureProfile, FrameStream};
use super::mjpeg::JpegSplitter;
use crate::config::CameraConfig;
use crate::error::{Result, ToolError};
use crate::hardware::HardwareStatus;
use crate::tools::{find_in_path, templates, ToolInvocation, ToolRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

/// Camera driven through the libcamera command-line apps
pub struct LibcameraDevice {
    config: CameraConfig,
    runner: Arc<dyn ToolRunner>,
    tool_timeout: Duration,
    profile: Mutex<CaptureProfile>,
}

impl LibcameraDevice {
    pub fn detect(config: &CameraConfig) -> HardwareStatus {
        if !config.enabled {
            return HardwareStatus::absent("camera disabled in configuration");
        }

        for program in [&config.still_command, &config.video_command] {
            if find_in_path(program).is_none() {
                return HardwareStatus::absent(format!("{} not found in PATH", program));
            }
        }

        HardwareStatus::Available
    }

    pub fn new(config: CameraConfig, runner: Arc<dyn ToolRunner>, tool_timeout: Duration) -> Self {
        info!(
            "Using libcamera tools {} / {} (preview {}x{} @ {}fps)",
            config.still_command,
            config.video_command,
            config.preview_resolution.0,
            config.preview_resolution.1,
            config.preview_fps
        );

        Self {
            config,
            runner,
            tool_timeout,
            profile: Mutex::new(CaptureProfile::Still),
        }
    }

    fn still_invocation(&self, dest: &Path) -> ToolInvocation {
        let invocation = templates::still_capture(&self.config.still_command, dest);
        match *self.profile.lock() {
            CaptureProfile::Preview => {
                let (width, height) = self.config.preview_resolution;
                invocation
                    .arg("--width")
                    .arg(width.to_string())
                    .arg("--height")
                    .arg(height.to_string())
            }
            CaptureProfile::Still | CaptureProfile::Video => invocation,
        }
    }
}

fn ensure_output(program: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::MissingOutput {
            program: program.to_string(),
            path: path.display().to_string(),
        }
        .into())
    }
}

#[async_trait]
impl CaptureDevice for LibcameraDevice {
    fn is_available(&self) -> bool {
        true
    }

    fn configure(&self, profile: CaptureProfile) {
        let mut current = self.profile.lock();
        if *current != profile {
            debug!("Camera profile {} -> {}", *current, profile);
            *current = profile;
        }
    }

    async fn capture_still(&self, dest: &Path) -> Result<CaptureOutcome> {
        let invocation = self.still_invocation(dest);
        self.runner.run(&invocation, self.tool_timeout).await?;
        ensure_output(&invocation.program, dest)?;

        debug!("Captured still to {}", dest.display());
        Ok(CaptureOutcome::Captured)
    }

    async fn record_video(&self, dest: &Path, duration: Duration) -> Result<CaptureOutcome> {
        let invocation = templates::video_capture(
            &self.config.video_command,
            dest,
            duration,
            self.config.video_fps,
            self.config.video_resolution,
        );

        self.runner
            .run(&invocation, duration + self.tool_timeout)
            .await?;
        ensure_output(&invocation.program, dest)?;

        debug!("Recorded {:?} of video to {}", duration, dest.display());
        Ok(CaptureOutcome::Captured)
    }

    async fn open_stream(&self) -> Result<Option<FrameStream>> {
        let invocation = templates::mjpeg_preview(
            &self.config.video_command,
            self.config.preview_resolution,
            self.config.preview_fps,
        );

        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ToolError::Spawn {
                program: invocation.program.clone(),
                source: e,
            })?;

        let Some(mut stdout) = child.stdout.take() else {
            return Err(ToolError::MissingOutput {
                program: invocation.program.clone(),
                path: "stdout".to_string(),
            }
            .into());
        };

        let (producer, stream) = FrameStream::channel();
        info!("Preview started: {}", invocation);

        tokio::spawn(async move {
            let mut splitter = JpegSplitter::new();
            let mut buf = vec![0u8; 64 * 1024];
            let mut frames: u64 = 0;

            'read: loop {
                let read = tokio::select! {
                    _ = producer.stopped() => break,
                    read = stdout.read(&mut buf) => read,
                };

                match read {
                    Ok(0) => {
                        warn!("Preview encoder closed its output");
                        break;
                    }
                    Ok(n) => {
                        for frame in splitter.push(&buf[..n]) {
                            frames += 1;
                            if !producer.publish(frame) {
                                break 'read;
                            }
                        }
                    }
                    Err(e) => {
                        error!("Preview read failed: {}", e);
                        break;
                    }
                }
            }

            if let Err(e) = child.kill().await {
                debug!("Preview encoder already exited: {}", e);
            }
            info!("Preview stopped after {} frames", frames);
        });

        Ok(Some(stream))
    }
}
