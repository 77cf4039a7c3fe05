mod controller;
mod params;
mod state;
#[cfg(test)]
mod tests;

pub use controller::{CaptureSession, PreviewStream, SessionSettings, TimelapseReport};
pub use params::{TimelapseParameters, VideoParameters};
pub use state::{SessionGate, SessionLease, SessionSnapshot, SessionStatus};
