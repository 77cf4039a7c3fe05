use super::handlers::{
    cpu_temperature_handler, dashboard_handler, delete_all_handler, delete_handler,
    disk_usage_handler, download_all_handler, download_handler, mjpeg_stream_handler,
    shutdown_handler, start_photo_capture_handler, start_timelapse_handler,
    start_video_capture_handler, status_handler, stop_timelapse_handler, thumbnail_handler,
};
use crate::config::StreamConfig;
use crate::error::{LapsecamError, Result, ServerError};
use crate::health::HealthReporter;
use crate::media::MediaStore;
use crate::power::PowerControl;
use crate::session::CaptureSession;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub(crate) session: Arc<CaptureSession>,
    pub(crate) store: Arc<MediaStore>,
    pub(crate) health: Arc<HealthReporter>,
    pub(crate) power: Arc<PowerControl>,
    pub(crate) frame_interval: Duration,
    /// Cancelled when the process shuts down; ends open preview streams
    pub(crate) shutdown: CancellationToken,
}

/// HTTP front end: dashboard, capture triggers, media access and preview
pub struct StationServer {
    config: StreamConfig,
    state: AppState,
}

impl StationServer {
    pub fn new(config: StreamConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Serve until the shutdown token is cancelled, then drain open connections
    pub async fn start(&self) -> Result<()> {
        let shutdown = self.state.shutdown.clone();
        let addr = self.address();
        info!("Starting capture station server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        info!("Capture station listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServerError::Serve {
                details: e.to_string(),
            })?;

        info!("Capture station server stopped");
        Ok(())
    }
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/start_photo_capture", get(start_photo_capture_handler))
        .route("/start_video_capture", get(start_video_capture_handler))
        .route("/start_timelapse", get(start_timelapse_handler))
        .route("/stop_timelapse", get(stop_timelapse_handler))
        .route("/stream", get(mjpeg_stream_handler))
        .route("/download/*filepath", get(download_handler))
        .route("/download_all/:category", get(download_all_handler))
        .route("/thumbnail/*filepath", get(thumbnail_handler))
        .route("/delete", post(delete_handler))
        .route("/delete_all/:category", post(delete_all_handler))
        .route("/disk_usage", get(disk_usage_handler))
        .route("/cpu_temperature", get(cpu_temperature_handler))
        .route("/status", get(status_handler))
        .route("/shutdown", post(shutdown_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server builder for configuration
#[derive(Default)]
pub struct StationServerBuilder {
    config: Option<StreamConfig>,
    session: Option<Arc<CaptureSession>>,
    store: Option<Arc<MediaStore>>,
    health: Option<Arc<HealthReporter>>,
    power: Option<Arc<PowerControl>>,
    shutdown: Option<CancellationToken>,
}

impl StationServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn session(mut self, session: Arc<CaptureSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn store(mut self, store: Arc<MediaStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn health(mut self, health: Arc<HealthReporter>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn power(mut self, power: Arc<PowerControl>) -> Self {
        self.power = Some(power);
        self
    }

    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn build(self) -> Result<StationServer> {
        let config = self.config.ok_or_else(|| missing("Stream configuration"))?;
        let session = self.session.ok_or_else(|| missing("Capture session"))?;
        let store = self.store.ok_or_else(|| missing("Media store"))?;
        let health = self.health.ok_or_else(|| missing("Health reporter"))?;
        let power = self.power.ok_or_else(|| missing("Power control"))?;

        let frame_interval = Duration::from_millis(config.frame_interval_ms);
        let state = AppState {
            session,
            store,
            health,
            power,
            frame_interval,
            shutdown: self.shutdown.unwrap_or_default(),
        };

        Ok(StationServer::new(config, state))
    }
}

fn missing(what: &str) -> LapsecamError {
    LapsecamError::component("server", format!("{} is required", what))
}
