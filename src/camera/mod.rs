mod device;
mod libcamera;
mod mjpeg;
mod mock;
#[cfg(test)]
mod tests;

pub use device::{
    CaptureDevice, CaptureOutcome, CaptureProfile, FrameProducer, FrameStream, UnavailableDevice,
};
pub use libcamera::LibcameraDevice;
pub use mjpeg::JpegSplitter;
pub use mock::{synthetic_jpeg, MockCaptureDevice, MockCaptureMode};
