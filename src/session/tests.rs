use super::*;
use crate::camera::{MockCaptureDevice, MockCaptureMode};
use crate::error::{LapsecamError, SessionError};
use crate::indicator::{IndicatorController, IndicatorDriver, Rgb};
use crate::media::{Category, MediaStore, ThumbnailGenerator, ThumbnailSettings};
use crate::tools::MockToolRunner;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<&'static str>>,
}

impl IndicatorDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn set_color(&self, _color: Rgb) -> crate::error::Result<()> {
        self.calls.lock().push("on");
        Ok(())
    }

    fn clear(&self) -> crate::error::Result<()> {
        self.calls.lock().push("off");
        Ok(())
    }
}

struct Fixture {
    _dir: TempDir,
    session: Arc<CaptureSession>,
    store: Arc<MediaStore>,
    device: Arc<MockCaptureDevice>,
    indicator: Arc<RecordingDriver>,
}

fn fixture(device: MockCaptureDevice) -> Fixture {
    fixture_with_runner(device, MockToolRunner::simulated())
}

fn fixture_with_runner(device: MockCaptureDevice, runner: MockToolRunner) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(runner);
    let settings = ThumbnailSettings {
        size: 64,
        video_offset_seconds: 1,
        ffmpeg_command: "ffmpeg".to_string(),
        tool_timeout: Duration::from_secs(5),
    };
    let store = Arc::new(MediaStore::new(
        dir.path(),
        ThumbnailGenerator::new(settings, runner.clone()),
    ));
    let driver = Arc::new(RecordingDriver::default());
    let indicator = Arc::new(IndicatorController::new(
        driver.clone(),
        (255, 255, 255),
        Duration::ZERO,
        Duration::ZERO,
    ));
    let device = Arc::new(device);

    let session = Arc::new(CaptureSession::new(
        device.clone(),
        indicator,
        store.clone(),
        runner,
        SessionSettings {
            ffmpeg_command: "ffmpeg".to_string(),
            video_fps: 24,
            tool_timeout: Duration::from_secs(5),
        },
    ));

    Fixture {
        _dir: dir,
        session,
        store,
        device,
        indicator: driver,
    }
}

fn quick_timelapse(interval_ms: u64, duration_ms: u64) -> TimelapseParameters {
    TimelapseParameters {
        interval: Duration::from_millis(interval_ms),
        duration: Duration::from_millis(duration_ms),
    }
}

#[tokio::test]
async fn test_photo_is_stored_with_thumbnail() {
    let f = fixture(MockCaptureDevice::working());

    let asset = f.session.capture_photo().await.unwrap().unwrap();

    assert_eq!(asset.category, Category::Photos);
    assert!(asset.name.starts_with("photo_"));
    assert!(f.store.thumbnail_dir(Category::Photos).join(&asset.name).is_file());
    assert_eq!(f.session.status().status, SessionStatus::Idle);
    assert_eq!(*f.indicator.calls.lock(), vec!["on", "off"]);
}

#[tokio::test]
async fn test_failed_photo_returns_to_idle_with_light_off() {
    let f = fixture(MockCaptureDevice::new(MockCaptureMode::Failing));

    assert!(f.session.capture_photo().await.is_err());

    assert!(f.store.list_assets(Category::Photos).await.unwrap().is_empty());
    assert_eq!(f.session.status().status, SessionStatus::Idle);
    assert_eq!(f.indicator.calls.lock().last(), Some(&"off"));
}

#[tokio::test]
async fn test_missing_camera_skips_capture() {
    let f = fixture(MockCaptureDevice::new(MockCaptureMode::Unavailable));

    assert!(f.session.capture_photo().await.unwrap().is_none());
    assert!(f.session.open_preview().await.unwrap().is_none());
    let timelapse = f
        .session
        .start_timelapse(quick_timelapse(10, 50))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert!(timelapse.is_none());
    assert!(f.store.list_assets(Category::Timelapses).await.unwrap().is_empty());
    assert_eq!(f.session.status().status, SessionStatus::Idle);
}

#[tokio::test]
async fn test_video_is_transcoded_and_stored() {
    let f = fixture(MockCaptureDevice::working());

    let handle = f
        .session
        .start_video(VideoParameters::from_request(Some(0)).unwrap())
        .unwrap();
    let asset = handle.await.unwrap().unwrap().unwrap();

    assert!(asset.name.starts_with("video_"));
    assert!(asset.name.ends_with(".mp4"));
    assert!(f
        .store
        .thumbnail_dir(Category::Videos)
        .join(asset.name.replace(".mp4", ".jpg"))
        .is_file());
    let leftovers = std::fs::read_dir(f.store.root().join(".tmp")).unwrap().count();
    assert_eq!(leftovers, 0);
    assert_eq!(f.session.status().status, SessionStatus::Idle);
}

fn scratch_files(store: &MediaStore) -> usize {
    std::fs::read_dir(store.root().join(".tmp")).unwrap().count()
}

#[tokio::test]
async fn test_failed_recording_leaves_nothing_behind() {
    let f = fixture(MockCaptureDevice::new(MockCaptureMode::Failing));

    let result = f
        .session
        .start_video(VideoParameters::default())
        .unwrap()
        .await
        .unwrap();

    assert!(matches!(result, Err(LapsecamError::Tool(_))));
    assert!(f.store.list_assets(Category::Videos).await.unwrap().is_empty());
    assert_eq!(scratch_files(&f.store), 0);
    assert_eq!(f.session.status().status, SessionStatus::Idle);
    assert_eq!(*f.indicator.calls.lock(), vec!["on", "off"]);
}

#[tokio::test]
async fn test_failed_transcode_leaves_nothing_behind() {
    let f = fixture_with_runner(MockCaptureDevice::working(), MockToolRunner::failing());

    let result = f
        .session
        .start_video(VideoParameters::default())
        .unwrap()
        .await
        .unwrap();

    assert!(matches!(result, Err(LapsecamError::Tool(_))));
    assert!(f.store.list_assets(Category::Videos).await.unwrap().is_empty());
    assert_eq!(scratch_files(&f.store), 0);
    assert_eq!(f.session.status().status, SessionStatus::Idle);
    assert_eq!(*f.indicator.calls.lock(), vec!["on", "off"]);
}

#[tokio::test]
async fn test_failed_frames_keep_numbering_contiguous() {
    let f = fixture(MockCaptureDevice::new(MockCaptureMode::Flaky));

    let report = f
        .session
        .start_timelapse(quick_timelapse(20, 300))
        .unwrap()
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(report.frames_captured >= 2, "captured {}", report.frames_captured);
    assert!(report.frames_failed >= 1);

    let mut names: Vec<String> = std::fs::read_dir(&report.folder.path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    let expected: Vec<String> = (1..=report.frames_captured)
        .map(|i| format!("image_{:06}.jpg", i))
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn test_frame_names_sort_for_a_week_of_seconds() {
    use super::controller::frame_name;

    assert_eq!(frame_name(1), "image_000001.jpg");
    assert!(frame_name(9_999) < frame_name(10_000));
    assert!(frame_name(604_799) < frame_name(604_800));
}

#[tokio::test]
async fn test_stop_only_applies_to_timelapse() {
    let f = fixture(MockCaptureDevice::working().with_realtime_video());

    let handle = f
        .session
        .start_video(VideoParameters::from_request(Some(1)).unwrap())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!f.session.stop());
    assert_eq!(
        f.session.status(),
        SessionSnapshot {
            status: SessionStatus::RecordingVideo,
            cancel_requested: false
        }
    );

    assert!(handle.await.unwrap().unwrap().is_some());
    assert_eq!(f.session.status().status, SessionStatus::Idle);
}

#[tokio::test]
async fn test_busy_session_rejects_other_activities() {
    let f = fixture(MockCaptureDevice::working());

    let handle = f
        .session
        .start_timelapse(quick_timelapse(50, 60_000))
        .unwrap();
    assert_eq!(f.session.status().status, SessionStatus::RunningTimelapse);

    let photo = f.session.capture_photo().await;
    assert!(matches!(
        photo,
        Err(LapsecamError::Session(SessionError::Busy {
            current: SessionStatus::RunningTimelapse
        }))
    ));
    assert!(f.session.start_video(VideoParameters::default()).is_err());
    assert!(f.session.open_preview().await.is_err());
    assert_eq!(f.session.status().status, SessionStatus::RunningTimelapse);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(f.session.stop());
    let report = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(report.cancelled);
    assert!(report.frames_captured >= 1);
    assert_eq!(f.session.status().status, SessionStatus::Idle);
    assert!(!f.session.status().cancel_requested);
}

#[tokio::test]
async fn test_timelapse_frame_count_follows_cadence() {
    let f = fixture(MockCaptureDevice::working());

    let report = f
        .session
        .start_timelapse(quick_timelapse(50, 1000))
        .unwrap()
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(!report.cancelled);
    assert!(
        (17..=21).contains(&report.frames_captured),
        "captured {}",
        report.frames_captured
    );
    assert!(report.folder.path.join("image_000001.jpg").is_file());
    assert_eq!(f.device.stills_captured(), report.frames_captured);
    assert_eq!(*f.indicator.calls.lock(), vec!["on", "off"]);
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() {
    let f = fixture(MockCaptureDevice::working());
    assert!(!f.session.stop());
    assert_eq!(
        f.session.status(),
        SessionSnapshot {
            status: SessionStatus::Idle,
            cancel_requested: false
        }
    );
}

#[tokio::test]
async fn test_preview_holds_session_until_dropped() {
    let f = fixture(MockCaptureDevice::working().with_preview((32, 24), 50));

    let mut preview = f.session.open_preview().await.unwrap().unwrap();
    assert_eq!(f.session.status().status, SessionStatus::Streaming);
    assert!(f.session.capture_photo().await.unwrap_err().is_busy());

    let frame = tokio::time::timeout(Duration::from_secs(2), preview.next_frame())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&frame[0..2], &[0xFF, 0xD8]);

    drop(preview);
    assert_eq!(f.session.status().status, SessionStatus::Idle);
    assert!(f.session.capture_photo().await.unwrap().is_some());
}

#[tokio::test]
async fn test_only_one_concurrent_start_wins() {
    let f = fixture(MockCaptureDevice::working());

    let mut attempts = Vec::new();
    for _ in 0..8 {
        let session = f.session.clone();
        attempts.push(tokio::spawn(async move {
            session
                .start_timelapse(TimelapseParameters {
                    interval: Duration::from_millis(20),
                    duration: Duration::from_millis(100),
                })
                .ok()
        }));
    }

    let mut winners = Vec::new();
    for attempt in attempts {
        if let Some(handle) = attempt.await.unwrap() {
            winners.push(handle);
        }
    }

    assert_eq!(winners.len(), 1);
    for handle in winners {
        handle.await.unwrap().unwrap();
    }
    assert!(f.session.wait_until_idle(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_gate_lease_release() {
    let gate = SessionGate::new();
    let lease = gate.try_begin(SessionStatus::RunningTimelapse).unwrap();
    assert_eq!(lease.status(), SessionStatus::RunningTimelapse);
    assert!(gate.try_begin(SessionStatus::Streaming).is_err());

    assert!(gate.request_stop());
    assert!(gate.cancel_requested());
    tokio::time::timeout(Duration::from_millis(100), gate.cancelled())
        .await
        .unwrap();

    drop(lease);
    assert_eq!(gate.status(), SessionStatus::Idle);
    assert!(!gate.cancel_requested());
    assert!(gate.wait_idle(Duration::from_millis(10)).await);
}

#[test]
fn test_parameter_defaults() {
    assert_eq!(
        VideoParameters::from_request(None).unwrap().duration,
        Duration::from_secs(1)
    );
    assert_eq!(
        VideoParameters::from_request(Some(-5)).unwrap().duration,
        Duration::from_secs(1)
    );

    let timelapse = TimelapseParameters::from_request(Some(0), None).unwrap();
    assert_eq!(timelapse, TimelapseParameters::default());
    assert_eq!(timelapse.expected_frames(), 60);

    let custom = TimelapseParameters::from_request(Some(5), Some(2)).unwrap();
    assert_eq!(custom.interval, Duration::from_secs(5));
    assert_eq!(custom.duration, Duration::from_secs(120));
}

#[test]
fn test_parameter_limits() {
    assert!(VideoParameters::from_request(Some(100_000)).is_err());
    assert!(TimelapseParameters::from_request(Some(100_000), Some(1)).is_err());
    assert!(TimelapseParameters::from_request(Some(1), Some(1_000_000)).is_err());
}
