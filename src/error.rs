use crate::session::SessionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LapsecamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures of external command-line tools (libcamera, ffmpeg, shutdown)
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {seconds}s")]
    Timeout { program: String, seconds: u64 },

    #[error("{program} produced no output at {path}")]
    MissingOutput { program: String, path: String },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Capture session busy ({current})")]
    Busy { current: SessionStatus },

    #[error("Invalid capture parameters: {details}")]
    InvalidParameters { details: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid media path: {path}")]
    InvalidPath { path: String },

    #[error("Unknown media category: {name}")]
    UnknownCategory { name: String },

    #[error("Media not found: {path}")]
    NotFound { path: String },
}

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Indicator write failed on {device}: {source}")]
    IndicatorWrite {
        device: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server failed: {details}")]
    Serve { details: String },
}

impl LapsecamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// True when the error means the session refused to start an activity
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Session(SessionError::Busy { .. }))
    }
}

pub type Result<T> = std::result::Result<T, LapsecamError>;
