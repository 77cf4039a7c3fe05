use super::types::{Component, ComponentState, ShutdownReason};
use crate::camera::{CaptureDevice, LibcameraDevice, MockCaptureDevice, UnavailableDevice};
use crate::config::LapsecamConfig;
use crate::error::Result;
use crate::hardware::{HardwareReport, HardwareStatus};
use crate::health::HealthReporter;
use crate::indicator::IndicatorController;
use crate::media::MediaStore;
use crate::power::PowerControl;
use crate::server::{StationServer, StationServerBuilder};
use crate::session::{CaptureSession, SessionSettings};
use crate::tools::{MockToolRunner, ShellToolRunner, ToolRunner};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runtime switches that do not belong in the configuration file
#[derive(Debug, Clone, Copy, Default)]
pub struct StationOptions {
    /// Use a synthetic camera and never run external tools
    pub simulate: bool,
}

/// Main application coordinator that wires and runs all components
pub struct StationOrchestrator {
    pub(super) config: LapsecamConfig,
    pub(super) hardware: HardwareReport,

    // Components
    pub(super) store: Arc<MediaStore>,
    pub(super) indicator: Arc<IndicatorController>,
    pub(super) session: Arc<CaptureSession>,
    pub(super) server: Option<StationServer>,
    pub(super) server_task: Option<JoinHandle<Result<()>>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<Component, ComponentState>>>,
    pub(super) shutdown_sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl StationOrchestrator {
    /// Detect hardware and build every component for `config`
    pub async fn new(config: LapsecamConfig, options: StationOptions) -> Result<Self> {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let cancellation_token = CancellationToken::new();
        let tool_timeout = Duration::from_secs(config.tools.timeout_seconds);

        let (hardware, runner, device): (HardwareReport, Arc<dyn ToolRunner>, Arc<dyn CaptureDevice>) =
            if options.simulate {
                warn!("Simulation mode: synthetic camera, external tools are not run");
                let hardware = HardwareReport {
                    camera: HardwareStatus::Available,
                    indicator: HardwareStatus::absent("simulation mode"),
                };
                let device = MockCaptureDevice::working()
                    .with_realtime_video()
                    .with_preview(config.camera.preview_resolution, config.camera.preview_fps);
                (hardware, Arc::new(MockToolRunner::simulated()), Arc::new(device))
            } else {
                let hardware = HardwareReport::detect(&config);
                let runner: Arc<dyn ToolRunner> = Arc::new(ShellToolRunner::new());
                let device: Arc<dyn CaptureDevice> = match &hardware.camera {
                    HardwareStatus::Available => Arc::new(LibcameraDevice::new(
                        config.camera.clone(),
                        Arc::clone(&runner),
                        tool_timeout,
                    )),
                    HardwareStatus::Absent { reason } => {
                        Arc::new(UnavailableDevice::new(reason.clone()))
                    }
                };
                (hardware, runner, device)
            };

        let indicator = Arc::new(IndicatorController::from_config(
            &config.indicator,
            &hardware.indicator,
        ));

        let store = Arc::new(MediaStore::from_config(
            &config.storage,
            &config.tools,
            Arc::clone(&runner),
        ));

        let session = Arc::new(CaptureSession::new(
            device,
            Arc::clone(&indicator),
            Arc::clone(&store),
            Arc::clone(&runner),
            SessionSettings::from_config(&config),
        ));

        let server = StationServerBuilder::new()
            .config(config.stream.clone())
            .session(Arc::clone(&session))
            .store(Arc::clone(&store))
            .health(Arc::new(HealthReporter::from_config(&config.system)))
            .power(Arc::new(PowerControl::new(
                config.system.shutdown_command.clone(),
                runner,
                tool_timeout,
            )))
            .shutdown(cancellation_token.child_token())
            .build()?;

        info!("Capture station components created");

        Ok(Self {
            config,
            hardware,
            store,
            indicator,
            session,
            server: Some(server),
            server_task: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token,
        })
    }

    pub fn hardware(&self) -> &HardwareReport {
        &self.hardware
    }

    pub fn session(&self) -> Arc<CaptureSession> {
        Arc::clone(&self.session)
    }

    pub fn store(&self) -> Arc<MediaStore> {
        Arc::clone(&self.store)
    }

    /// Ask a running station to shut down, as a signal would
    pub async fn request_shutdown(&self, reason: ShutdownReason) -> bool {
        match self.shutdown_sender.lock().await.take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }
}
