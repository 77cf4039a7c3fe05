use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LapsecamConfig {
    pub camera: CameraConfig,
    pub indicator: IndicatorConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub stream: StreamConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Disable to run without touching the camera at all
    #[serde(default = "default_camera_enabled")]
    pub enabled: bool,

    /// Still capture tool (libcamera-still or rpicam-still)
    #[serde(default = "default_still_command")]
    pub still_command: String,

    /// Video capture tool, also used for the MJPEG preview
    #[serde(default = "default_video_command")]
    pub video_command: String,

    /// Live preview resolution (width, height)
    #[serde(default = "default_preview_resolution")]
    pub preview_resolution: (u32, u32),

    /// Live preview frames per second
    #[serde(default = "default_preview_fps")]
    pub preview_fps: u32,

    /// Recorded video resolution (width, height)
    #[serde(default = "default_video_resolution")]
    pub video_resolution: (u32, u32),

    /// Recorded video frames per second
    #[serde(default = "default_video_fps")]
    pub video_fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndicatorConfig {
    /// LED class device directory (e.g. /sys/class/leds/lapsecam)
    #[serde(default = "default_indicator_device")]
    pub device: String,

    /// Colour used when the indicator is switched on
    #[serde(default = "default_indicator_color")]
    pub color: (u8, u8, u8),

    /// Delay after switching on, before a capture starts
    #[serde(default = "default_on_settle_ms")]
    pub on_settle_ms: u64,

    /// Delay after switching off
    #[serde(default = "default_off_settle_ms")]
    pub off_settle_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Base directory holding photos/, videos/, timelapses/ and thumbnails/
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Bounding box edge for thumbnails, in pixels
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// Offset into a video for its thumbnail frame
    #[serde(default = "default_video_thumbnail_offset")]
    pub video_thumbnail_offset_seconds: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg_command")]
    pub ffmpeg_command: String,

    /// Upper bound for a single tool invocation; recordings add their duration
    #[serde(default = "default_tool_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// IP address to bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_stream_port")]
    pub port: u16,

    /// Minimum spacing between MJPEG parts sent to a client
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Filesystem reported by /disk_usage
    #[serde(default = "default_disk_path")]
    pub disk_path: String,

    /// Thermal zone file reporting millidegrees Celsius
    #[serde(default = "default_thermal_zone_path")]
    pub thermal_zone_path: String,

    /// Command run by POST /shutdown
    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: Vec<String>,

    /// How long process shutdown waits for a running capture to wind down
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl LapsecamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("lapsecam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.enabled", default_camera_enabled())?
            .set_default("camera.still_command", default_still_command())?
            .set_default("camera.video_command", default_video_command())?
            .set_default(
                "camera.preview_resolution",
                vec![
                    default_preview_resolution().0,
                    default_preview_resolution().1,
                ],
            )?
            .set_default("camera.preview_fps", default_preview_fps())?
            .set_default(
                "camera.video_resolution",
                vec![default_video_resolution().0, default_video_resolution().1],
            )?
            .set_default("camera.video_fps", default_video_fps())?
            .set_default("indicator.device", default_indicator_device())?
            .set_default(
                "indicator.color",
                vec![
                    default_indicator_color().0 as u32,
                    default_indicator_color().1 as u32,
                    default_indicator_color().2 as u32,
                ],
            )?
            .set_default("indicator.on_settle_ms", default_on_settle_ms())?
            .set_default("indicator.off_settle_ms", default_off_settle_ms())?
            .set_default("storage.root", default_storage_root())?
            .set_default("storage.thumbnail_size", default_thumbnail_size())?
            .set_default(
                "storage.video_thumbnail_offset_seconds",
                default_video_thumbnail_offset(),
            )?
            .set_default("tools.ffmpeg_command", default_ffmpeg_command())?
            .set_default("tools.timeout_seconds", default_tool_timeout())?
            .set_default("stream.ip", default_stream_ip())?
            .set_default("stream.port", default_stream_port())?
            .set_default("stream.frame_interval_ms", default_frame_interval_ms())?
            .set_default("system.disk_path", default_disk_path())?
            .set_default("system.thermal_zone_path", default_thermal_zone_path())?
            .set_default("system.shutdown_command", default_shutdown_command())?
            .set_default("system.drain_timeout_seconds", default_drain_timeout())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with LAPSECAM_ prefix
            .add_source(Environment::with_prefix("LAPSECAM").separator("_"))
            .build()?;

        let config: LapsecamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.preview_resolution.0 == 0 || self.camera.preview_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera preview resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.video_resolution.0 == 0 || self.camera.video_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera video resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.preview_fps == 0 || self.camera.video_fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.still_command.trim().is_empty()
            || self.camera.video_command.trim().is_empty()
            || self.tools.ffmpeg_command.trim().is_empty()
        {
            return Err(ConfigError::Message(
                "Tool commands must not be empty".to_string(),
            ));
        }

        if self.storage.thumbnail_size == 0 {
            return Err(ConfigError::Message(
                "Thumbnail size must be greater than 0".to_string(),
            ));
        }

        if self.tools.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Tool timeout must be greater than 0".to_string(),
            ));
        }

        if self.stream.frame_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Stream frame interval must be greater than 0".to_string(),
            ));
        }

        if self.system.shutdown_command.is_empty() {
            return Err(ConfigError::Message(
                "Shutdown command must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LapsecamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                enabled: default_camera_enabled(),
                still_command: default_still_command(),
                video_command: default_video_command(),
                preview_resolution: default_preview_resolution(),
                preview_fps: default_preview_fps(),
                video_resolution: default_video_resolution(),
                video_fps: default_video_fps(),
            },
            indicator: IndicatorConfig {
                device: default_indicator_device(),
                color: default_indicator_color(),
                on_settle_ms: default_on_settle_ms(),
                off_settle_ms: default_off_settle_ms(),
            },
            storage: StorageConfig {
                root: default_storage_root(),
                thumbnail_size: default_thumbnail_size(),
                video_thumbnail_offset_seconds: default_video_thumbnail_offset(),
            },
            tools: ToolsConfig {
                ffmpeg_command: default_ffmpeg_command(),
                timeout_seconds: default_tool_timeout(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                port: default_stream_port(),
                frame_interval_ms: default_frame_interval_ms(),
            },
            system: SystemConfig {
                disk_path: default_disk_path(),
                thermal_zone_path: default_thermal_zone_path(),
                shutdown_command: default_shutdown_command(),
                drain_timeout_seconds: default_drain_timeout(),
            },
        }
    }
}

// Default value functions
fn default_camera_enabled() -> bool {
    true
}
fn default_still_command() -> String {
    "libcamera-still".to_string()
}
fn default_video_command() -> String {
    "libcamera-vid".to_string()
}
fn default_preview_resolution() -> (u32, u32) {
    (320, 240)
}
fn default_preview_fps() -> u32 {
    10
}
fn default_video_resolution() -> (u32, u32) {
    (1920, 1080)
}
fn default_video_fps() -> u32 {
    24
}

fn default_indicator_device() -> String {
    "/sys/class/leds/lapsecam".to_string()
}
fn default_indicator_color() -> (u8, u8, u8) {
    (255, 255, 255)
}
fn default_on_settle_ms() -> u64 {
    500
}
fn default_off_settle_ms() -> u64 {
    1000
}

fn default_storage_root() -> String {
    ".".to_string()
}
fn default_thumbnail_size() -> u32 {
    128
}
fn default_video_thumbnail_offset() -> u32 {
    1
}

fn default_ffmpeg_command() -> String {
    "ffmpeg".to_string()
}
fn default_tool_timeout() -> u64 {
    60
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_stream_port() -> u16 {
    8000
}
fn default_frame_interval_ms() -> u64 {
    100
}

fn default_disk_path() -> String {
    "/".to_string()
}
fn default_thermal_zone_path() -> String {
    "/sys/class/thermal/thermal_zone0/temp".to_string()
}
fn default_shutdown_command() -> Vec<String> {
    vec![
        "sudo".to_string(),
        "shutdown".to_string(),
        "-h".to_string(),
        "now".to_string(),
    ]
}
fn default_drain_timeout() -> u64 {
    10
}
