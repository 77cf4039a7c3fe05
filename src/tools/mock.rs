use super::{ToolInvocation, ToolOutput, ToolRunner};
use crate::camera::synthetic_jpeg;
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockBehavior {
    Succeed,
    Fail,
    /// Produce plausible output files for ffmpeg style invocations
    Simulate,
}

/// Tool runner that never spawns processes, for tests and `--simulate`
pub struct MockToolRunner {
    behavior: MockBehavior,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl MockToolRunner {
    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_behavior(MockBehavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::with_behavior(MockBehavior::Fail)
    }

    pub fn simulated() -> Self {
        Self::with_behavior(MockBehavior::Simulate)
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().clone()
    }

    async fn simulate(invocation: &ToolInvocation) -> Result<()> {
        let Some(dest) = invocation.args.last() else {
            return Ok(());
        };
        let dest = Path::new(dest);

        match dest.extension().and_then(|e| e.to_str()) {
            Some("mp4") => {
                let source = invocation
                    .args
                    .iter()
                    .position(|a| a == "-i")
                    .and_then(|i| invocation.args.get(i + 1));
                if let Some(source) = source {
                    tokio::fs::copy(source, dest).await?;
                }
            }
            Some("jpg") | Some("jpeg") => {
                tokio::fs::write(dest, synthetic_jpeg(320, 240, 0)?).await?;
            }
            _ => {}
        }

        Ok(())
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn run(&self, invocation: &ToolInvocation, _timeout: Duration) -> Result<ToolOutput> {
        debug!("Mock tool run: {}", invocation);
        self.calls.lock().push(invocation.clone());

        match self.behavior {
            MockBehavior::Succeed => {}
            MockBehavior::Fail => {
                return Err(ToolError::Failed {
                    program: invocation.program.clone(),
                    code: Some(1),
                    stderr: "simulated tool failure".to_string(),
                }
                .into())
            }
            MockBehavior::Simulate => Self::simulate(invocation).await?,
        }

        Ok(ToolOutput::default())
    }
}
