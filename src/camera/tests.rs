use super::*;
use crate::config::CameraConfig;
use crate::tools::{ToolInvocation, ToolOutput, ToolRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

fn fake_jpeg(body: &[u8]) -> Vec<u8> {
    let mut frame = SOI.to_vec();
    frame.extend_from_slice(body);
    frame.extend_from_slice(&EOI);
    frame
}

#[test]
fn test_splitter_emits_each_complete_frame() {
    let mut splitter = JpegSplitter::new();
    let mut data = fake_jpeg(b"one");
    data.extend(fake_jpeg(b"two"));

    let frames = splitter.push(&data);
    assert_eq!(frames.len(), 2);
    assert_eq!(&frames[0][..], &fake_jpeg(b"one")[..]);
    assert_eq!(&frames[1][..], &fake_jpeg(b"two")[..]);
    assert_eq!(splitter.pending_len(), 0);
}

#[test]
fn test_splitter_joins_frames_across_reads() {
    let mut splitter = JpegSplitter::new();
    let frame = fake_jpeg(b"split across reads");
    let (head, tail) = frame.split_at(7);

    assert!(splitter.push(head).is_empty());
    let frames = splitter.push(tail);
    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0][..], &frame[..]);
}

#[test]
fn test_splitter_discards_leading_garbage() {
    let mut splitter = JpegSplitter::new();
    let mut data = b"noise".to_vec();
    data.extend(fake_jpeg(b"x"));

    let frames = splitter.push(&data);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0][0..2], SOI);
}

#[test]
fn test_splitter_marker_split_between_reads() {
    let mut splitter = JpegSplitter::new();
    assert!(splitter.push(&[0x00, 0xFF]).is_empty());
    assert!(splitter.push(&[0xD8, 0x01, 0xFF]).is_empty());
    let frames = splitter.push(&[0xD9]);
    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0][..], &[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
}

#[tokio::test]
async fn test_frame_stream_ends_when_producer_drops() {
    let (producer, mut stream) = FrameStream::channel();
    assert!(producer.publish(bytes::Bytes::from_static(b"frame")));

    assert_eq!(stream.next_frame().await.as_deref(), Some(&b"frame"[..]));
    drop(producer);
    assert!(stream.next_frame().await.is_none());
}

#[tokio::test]
async fn test_dropping_stream_stops_producer() {
    let (producer, stream) = FrameStream::channel();
    assert!(!producer.is_stopped());

    drop(stream);

    tokio::time::timeout(Duration::from_secs(1), producer.stopped())
        .await
        .unwrap();
    assert!(!producer.publish(bytes::Bytes::from_static(b"late")));
}

#[tokio::test]
async fn test_unavailable_device_reports_absence() {
    let device = UnavailableDevice::new("no camera");
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("photo.jpg");

    assert!(!device.is_available());
    assert_eq!(
        device.capture_still(&dest).await.unwrap(),
        CaptureOutcome::Unavailable
    );
    assert!(device.open_stream().await.unwrap().is_none());
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_mock_device_writes_decodable_jpeg() {
    let device = MockCaptureDevice::working();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("still.jpg");

    device.configure(CaptureProfile::Still);
    let outcome = device.capture_still(&dest).await.unwrap();

    assert_eq!(outcome, CaptureOutcome::Captured);
    assert_eq!(image::image_dimensions(&dest).unwrap(), (320, 240));
    assert_eq!(device.stills_captured(), 1);
}

#[tokio::test]
async fn test_mock_preview_delivers_frames() {
    let device = MockCaptureDevice::working().with_preview((32, 24), 50);
    let mut stream = device.open_stream().await.unwrap().unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(2), stream.next_frame())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame[0..2], SOI);
}

/// Runner that records invocations and creates the requested output file
#[derive(Default)]
struct TouchingRunner {
    calls: Mutex<Vec<ToolInvocation>>,
}

#[async_trait]
impl ToolRunner for TouchingRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        _timeout: Duration,
    ) -> crate::error::Result<ToolOutput> {
        self.calls.lock().push(invocation.clone());
        let out = invocation
            .args
            .iter()
            .position(|a| a == "-o")
            .and_then(|i| invocation.args.get(i + 1))
            .cloned();
        if let Some(out) = out {
            tokio::fs::write(out, b"data").await?;
        }
        Ok(ToolOutput::default())
    }
}

fn camera_config() -> CameraConfig {
    crate::config::LapsecamConfig::default().camera
}

#[tokio::test]
async fn test_libcamera_still_uses_preview_size_when_configured() {
    let runner = Arc::new(TouchingRunner::default());
    let device = LibcameraDevice::new(camera_config(), runner.clone(), Duration::from_secs(5));
    let dir = tempfile::tempdir().unwrap();

    device.configure(CaptureProfile::Still);
    device
        .capture_still(&dir.path().join("full.jpg"))
        .await
        .unwrap();

    device.configure(CaptureProfile::Preview);
    device
        .capture_still(&dir.path().join("small.jpg"))
        .await
        .unwrap();

    let calls = runner.calls.lock();
    assert!(!calls[0].args.contains(&"--width".to_string()));
    assert!(calls[1].args.contains(&"--width".to_string()));
    assert!(calls[1].args.contains(&"320".to_string()));
}

#[tokio::test]
async fn test_libcamera_reports_missing_output() {
    struct SilentRunner;

    #[async_trait]
    impl ToolRunner for SilentRunner {
        async fn run(
            &self,
            _invocation: &ToolInvocation,
            _timeout: Duration,
        ) -> crate::error::Result<ToolOutput> {
            Ok(ToolOutput::default())
        }
    }

    let device = LibcameraDevice::new(camera_config(), Arc::new(SilentRunner), Duration::from_secs(5));
    let dir = tempfile::tempdir().unwrap();

    let result = device
        .record_video(&dir.path().join("clip.h264"), Duration::from_secs(1))
        .await;
    assert!(matches!(
        result,
        Err(crate::error::LapsecamError::Tool(
            crate::error::ToolError::MissingOutput { .. }
        ))
    ));
}

#[test]
fn test_detect_disabled_camera() {
    let mut config = camera_config();
    config.enabled = false;
    assert!(!LibcameraDevice::detect(&config).is_available());
}

#[test]
fn test_detect_missing_tool() {
    let mut config = camera_config();
    config.still_command = "definitely-not-a-camera-tool".to_string();
    let status = LibcameraDevice::detect(&config);
    assert!(!status.is_available());
    assert!(status.to_string().contains("definitely-not-a-camera-tool"));
}
