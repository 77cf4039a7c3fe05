use super::types::AssetKind;
use crate::config::{StorageConfig, ToolsConfig};
use crate::error::{LapsecamError, Result, ToolError};
use crate::tools::{templates, ToolRunner};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ThumbnailSettings {
    /// Bounding box edge in pixels; aspect ratio is preserved
    pub size: u32,
    pub video_offset_seconds: u32,
    pub ffmpeg_command: String,
    pub tool_timeout: Duration,
}

impl ThumbnailSettings {
    pub fn from_config(storage: &StorageConfig, tools: &ToolsConfig) -> Self {
        Self {
            size: storage.thumbnail_size,
            video_offset_seconds: storage.video_thumbnail_offset_seconds,
            ffmpeg_command: tools.ffmpeg_command.clone(),
            tool_timeout: Duration::from_secs(tools.timeout_seconds),
        }
    }
}

/// Builds JPEG previews for photos and videos
pub struct ThumbnailGenerator {
    settings: ThumbnailSettings,
    runner: Arc<dyn ToolRunner>,
}

impl ThumbnailGenerator {
    pub fn new(settings: ThumbnailSettings, runner: Arc<dyn ToolRunner>) -> Self {
        Self { settings, runner }
    }

    /// Make sure `thumbnail` exists and is not older than `source`.
    /// Returns true if it had to be (re)generated.
    pub async fn ensure(&self, kind: AssetKind, source: &Path, thumbnail: &Path) -> Result<bool> {
        if kind == AssetKind::TimelapseFolder {
            return Ok(false);
        }
        if is_fresh(source, thumbnail).await {
            return Ok(false);
        }

        if let Some(parent) = thumbnail.parent() {
            fs::create_dir_all(parent).await?;
        }

        match kind {
            AssetKind::Photo => self.resize(source, thumbnail).await?,
            AssetKind::Video => self.from_video(source, thumbnail).await?,
            AssetKind::TimelapseFolder => return Ok(false),
        }

        debug!("Thumbnail written to {}", thumbnail.display());
        Ok(true)
    }

    async fn resize(&self, source: &Path, dest: &Path) -> Result<()> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        let size = self.settings.size;

        tokio::task::spawn_blocking(move || resize_image(&source, &dest, size))
            .await
            .map_err(|e| LapsecamError::system(format!("Thumbnail task failed: {}", e)))?
    }

    async fn from_video(&self, video: &Path, thumbnail: &Path) -> Result<()> {
        let mut offsets = vec![self.settings.video_offset_seconds];
        // Clips shorter than the offset have no frame there
        if self.settings.video_offset_seconds > 0 {
            offsets.push(0);
        }

        let mut last_error = None;
        for offset in offsets {
            let invocation = templates::extract_frame(
                &self.settings.ffmpeg_command,
                video,
                thumbnail,
                offset,
            );

            match self.runner.run(&invocation, self.settings.tool_timeout).await {
                Ok(_) if thumbnail.is_file() => return self.resize(thumbnail, thumbnail).await,
                Ok(_) => debug!("No frame at {}s in {}", offset, video.display()),
                Err(e) => {
                    warn!("Frame extraction at {}s failed: {}", offset, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ToolError::MissingOutput {
                program: self.settings.ffmpeg_command.clone(),
                path: thumbnail.display().to_string(),
            }
            .into()
        }))
    }
}

async fn is_fresh(source: &Path, thumbnail: &Path) -> bool {
    let (Ok(source_meta), Ok(thumb_meta)) =
        (fs::metadata(source).await, fs::metadata(thumbnail).await)
    else {
        return false;
    };

    match (source_meta.modified(), thumb_meta.modified()) {
        (Ok(source_time), Ok(thumb_time)) => thumb_time >= source_time,
        _ => true,
    }
}

fn resize_image(source: &Path, dest: &Path, size: u32) -> Result<()> {
    let image = image::open(source)?;
    let thumbnail = image.thumbnail(size, size).to_rgb8();
    thumbnail.save_with_format(dest, ImageFormat::Jpeg)?;
    Ok(())
}

/// Where the thumbnail of `name` lives below a category's thumbnail root
pub(crate) fn thumbnail_name(kind: AssetKind, root: &Path, name: &str) -> Option<PathBuf> {
    match kind {
        AssetKind::Photo => Some(root.join(name)),
        AssetKind::Video => Some(root.join(name).with_extension("jpg")),
        AssetKind::TimelapseFolder => None,
    }
}
