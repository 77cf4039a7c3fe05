mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::{StationOptions, StationOrchestrator};
pub use types::{Component, ComponentState, ShutdownReason};
