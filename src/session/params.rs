use crate::error::SessionError;
use std::time::Duration;

const MAX_VIDEO_SECONDS: u64 = 60 * 60;
const MAX_INTERVAL_SECONDS: u64 = 24 * 60 * 60;
const MAX_TIMELAPSE_MINUTES: u64 = 7 * 24 * 60;

/// Non-positive or missing values fall back to one unit
fn positive_or_one(value: Option<i64>) -> u64 {
    match value {
        Some(v) if v > 0 => v as u64,
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParameters {
    pub duration: Duration,
}

impl Default for VideoParameters {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(1),
        }
    }
}

impl VideoParameters {
    /// From the `duration` query value, in seconds
    pub fn from_request(duration_seconds: Option<i64>) -> Result<Self, SessionError> {
        let seconds = positive_or_one(duration_seconds);
        if seconds > MAX_VIDEO_SECONDS {
            return Err(SessionError::InvalidParameters {
                details: format!(
                    "video duration {}s exceeds {}s",
                    seconds, MAX_VIDEO_SECONDS
                ),
            });
        }

        Ok(Self {
            duration: Duration::from_secs(seconds),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelapseParameters {
    pub interval: Duration,
    pub duration: Duration,
}

impl Default for TimelapseParameters {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            duration: Duration::from_secs(60),
        }
    }
}

impl TimelapseParameters {
    /// From the `interval` (seconds) and `duration` (minutes) query values
    pub fn from_request(
        interval_seconds: Option<i64>,
        duration_minutes: Option<i64>,
    ) -> Result<Self, SessionError> {
        let interval = positive_or_one(interval_seconds);
        let minutes = positive_or_one(duration_minutes);

        if interval > MAX_INTERVAL_SECONDS {
            return Err(SessionError::InvalidParameters {
                details: format!("interval {}s exceeds {}s", interval, MAX_INTERVAL_SECONDS),
            });
        }
        if minutes > MAX_TIMELAPSE_MINUTES {
            return Err(SessionError::InvalidParameters {
                details: format!(
                    "duration {}min exceeds {}min",
                    minutes, MAX_TIMELAPSE_MINUTES
                ),
            });
        }

        Ok(Self {
            interval: Duration::from_secs(interval),
            duration: Duration::from_secs(minutes * 60),
        })
    }

    pub fn expected_frames(&self) -> u64 {
        let interval = self.interval.as_millis().max(1);
        (self.duration.as_millis() / interval) as u64
    }
}
