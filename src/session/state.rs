use crate::error::SessionError;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

/// What the camera is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    CapturingPhoto,
    RecordingVideo,
    RunningTimelapse,
    Streaming,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CapturingPhoto => "capturing_photo",
            Self::RecordingVideo => "recording_video",
            Self::RunningTimelapse => "running_timelapse",
            Self::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub cancel_requested: bool,
}

#[derive(Debug)]
struct GateState {
    status: SessionStatus,
    cancel_requested: bool,
}

/// Single owner of the camera. Starting an activity is an atomic
/// check-and-set; the returned lease puts the gate back to idle on drop.
#[derive(Debug)]
pub struct SessionGate {
    state: Mutex<GateState>,
    changed: Notify,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self {
            state: Mutex::new(GateState {
                status: SessionStatus::Idle,
                cancel_requested: false,
            }),
            changed: Notify::new(),
        }
    }
}

impl SessionGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn try_begin(self: &Arc<Self>, status: SessionStatus) -> Result<SessionLease, SessionError> {
        {
            let mut state = self.state.lock();
            if state.status != SessionStatus::Idle {
                debug!("Refusing {}: session is {}", status, state.status);
                return Err(SessionError::Busy {
                    current: state.status,
                });
            }
            state.status = status;
            state.cancel_requested = false;
        }

        info!("Session: idle -> {}", status);
        Ok(SessionLease {
            gate: Arc::clone(self),
            status,
        })
    }

    /// Ask a running timelapse to stop. Photos, videos and the preview run
    /// to completion on their own, so the request is ignored for them and
    /// when idle; returns whether the stop was accepted.
    pub fn request_stop(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.status != SessionStatus::RunningTimelapse {
                debug!("Ignoring stop while {}", state.status);
                return false;
            }
            state.cancel_requested = true;
        }

        info!("Stop requested for running timelapse");
        self.changed.notify_waiters();
        true
    }

    pub fn cancel_requested(&self) -> bool {
        self.state.lock().cancel_requested
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            status: state.status,
            cancel_requested: state.cancel_requested,
        }
    }

    /// Resolves once a stop has been requested for the current activity
    pub async fn cancelled(&self) {
        self.wait_for(|state| state.cancel_requested).await
    }

    /// Wait for the gate to return to idle, up to `timeout`
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(
            timeout,
            self.wait_for(|state| state.status == SessionStatus::Idle),
        )
        .await
        .is_ok()
    }

    async fn wait_for(&self, condition: impl Fn(&GateState) -> bool) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if condition(&*self.state.lock()) {
                return;
            }
            notified.await;
        }
    }

    fn release(&self, status: SessionStatus) {
        {
            let mut state = self.state.lock();
            state.status = SessionStatus::Idle;
            state.cancel_requested = false;
        }

        info!("Session: {} -> idle", status);
        self.changed.notify_waiters();
    }
}

/// Proof of ownership of the session; releasing it is the only way back to idle
#[derive(Debug)]
pub struct SessionLease {
    gate: Arc<SessionGate>,
    status: SessionStatus,
}

impl SessionLease {
    pub fn status(&self) -> SessionStatus {
        self.status
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.gate.release(self.status);
    }
}
