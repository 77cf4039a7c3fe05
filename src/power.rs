use crate::tools::{templates, ToolRunner};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fire-and-forget host power-off
pub struct PowerControl {
    command: Vec<String>,
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
}

impl PowerControl {
    pub fn new(command: Vec<String>, runner: Arc<dyn ToolRunner>, timeout: Duration) -> Self {
        Self {
            command,
            runner,
            timeout,
        }
    }

    /// Launch the power-off command in the background. Returns false when no
    /// command is configured.
    pub fn request_power_off(&self) -> bool {
        let Some(invocation) = templates::power_off(&self.command) else {
            warn!("Power-off requested but no shutdown command is configured");
            return false;
        };

        info!("Powering off host: {}", invocation);
        let runner = Arc::clone(&self.runner);
        let timeout = self.timeout;
        tokio::spawn(async move {
            if let Err(e) = runner.run(&invocation, timeout).await {
                error!("Power-off command failed: {}", e);
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockToolRunner;

    #[tokio::test]
    async fn test_power_off_runs_configured_command() {
        let runner = Arc::new(MockToolRunner::succeeding());
        let power = PowerControl::new(
            vec!["sudo".into(), "shutdown".into(), "-h".into(), "now".into()],
            runner.clone(),
            Duration::from_secs(1),
        );

        assert!(power.request_power_off());
        for _ in 0..50 {
            if !runner.calls().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "sudo");
        assert_eq!(calls[0].args, vec!["shutdown", "-h", "now"]);
    }

    #[tokio::test]
    async fn test_empty_command_is_refused() {
        let runner = Arc::new(MockToolRunner::succeeding());
        let power = PowerControl::new(Vec::new(), runner.clone(), Duration::from_secs(1));
        assert!(!power.request_power_off());
    }
}
