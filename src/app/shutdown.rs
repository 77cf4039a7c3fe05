use super::{Component, ComponentState, StationOrchestrator};
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl StationOrchestrator {
    /// Stop accepting requests, wind down any capture and switch the LED off.
    /// Returns the process exit code.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");
        let drain = Duration::from_secs(self.config.system.drain_timeout_seconds);
        let mut exit_code = 0;

        // Ends the HTTP server and any open preview stream
        self.cancellation_token.cancel();

        self.set_component_state(Component::Camera, ComponentState::Stopping)
            .await;
        if self.session.stop() {
            info!("Waiting up to {:?} for the running capture to stop", drain);
        }
        if self.session.wait_until_idle(drain).await {
            self.set_component_state(Component::Camera, ComponentState::Stopped)
                .await;
        } else {
            warn!(
                "Capture still {} after {:?}, exiting anyway",
                self.session.status().status,
                drain
            );
            self.set_component_state(Component::Camera, ComponentState::Failed)
                .await;
            exit_code = 1;
        }

        if let Some(task) = self.server_task.take() {
            self.set_component_state(Component::Server, ComponentState::Stopping)
                .await;
            match timeout(drain, task).await {
                Ok(Ok(Ok(()))) => {
                    self.set_component_state(Component::Server, ComponentState::Stopped)
                        .await;
                    info!("server component stopped");
                }
                Ok(Ok(Err(e))) => {
                    self.set_component_state(Component::Server, ComponentState::Failed)
                        .await;
                    error!("Error stopping server component: {}", e);
                    exit_code = 1;
                }
                Ok(Err(e)) => {
                    self.set_component_state(Component::Server, ComponentState::Failed)
                        .await;
                    error!("Server task panicked: {}", e);
                    exit_code = 1;
                }
                Err(_) => {
                    self.set_component_state(Component::Server, ComponentState::Failed)
                        .await;
                    error!("server component stop timeout");
                    exit_code = 1;
                }
            }
        }

        self.set_component_state(Component::Indicator, ComponentState::Stopping)
            .await;
        self.indicator.turn_off().await;
        self.set_component_state(Component::Indicator, ComponentState::Stopped)
            .await;

        self.set_component_state(Component::Storage, ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
