use serde::Serialize;
use std::fmt;

/// Parts of the station whose lifecycle the orchestrator tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Storage,
    Indicator,
    Camera,
    Server,
}

impl Component {
    /// Startup order; shutdown walks it from the other end
    pub const ALL: [Component; 4] = [
        Component::Storage,
        Component::Indicator,
        Component::Camera,
        Component::Server,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Indicator => "indicator",
            Self::Camera => "camera",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl ComponentState {
    /// Optional hardware is either running or absent, never failed
    pub fn from_presence(present: bool) -> Self {
        if present {
            Self::Running
        } else {
            Self::Stopped
        }
    }
}

/// Why the station is going down
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(&'static str),
    Error(String),
    UserRequest,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {}", name),
            Self::Error(message) => write!(f, "server failed: {}", message),
            Self::UserRequest => f.write_str("requested from the dashboard"),
        }
    }
}
