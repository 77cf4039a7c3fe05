use super::{Component, ComponentState, ShutdownReason, StationOrchestrator};
use crate::error::{LapsecamError, Result};
use std::sync::Arc;
use tracing::{error, info};

impl StationOrchestrator {
    /// Prepare storage and record the initial component states
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing capture station components");

        self.reset_component_states().await;

        self.set_component_state(Component::Storage, ComponentState::Starting)
            .await;
        if let Err(e) = self.store.prepare().await {
            self.set_component_state(Component::Storage, ComponentState::Failed)
                .await;
            error!("Failed to prepare media storage: {}", e);
            return Err(e);
        }
        self.set_component_state(Component::Storage, ComponentState::Running)
            .await;

        self.set_component_state(
            Component::Indicator,
            ComponentState::from_presence(self.hardware.indicator.is_available()),
        )
        .await;
        self.set_component_state(
            Component::Camera,
            ComponentState::from_presence(self.hardware.camera.is_available()),
        )
        .await;

        // Leave the LED in a known state
        self.indicator.turn_off().await;

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start serving HTTP in the background
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting capture station");

        let server = self.server.take().ok_or_else(|| {
            LapsecamError::system("Server already started")
        })?;

        self.set_component_state(Component::Server, ComponentState::Starting)
            .await;

        let states = Arc::clone(&self.component_states);
        let shutdown_on_failure = Arc::clone(&self.shutdown_sender);
        self.server_task = Some(tokio::spawn(async move {
            let result = server.start().await;
            let final_state = match &result {
                Ok(()) => ComponentState::Stopped,
                Err(e) => {
                    error!("Server stopped with error: {}", e);
                    if let Some(sender) = shutdown_on_failure.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Error(e.to_string()));
                    }
                    ComponentState::Failed
                }
            };
            states.lock().await.insert(Component::Server, final_state);
            result
        }));

        self.set_component_state(Component::Server, ComponentState::Running)
            .await;
        info!(
            "Capture station started on {}:{}",
            self.config.stream.ip, self.config.stream.port
        );
        Ok(())
    }
}

