use super::*;
use crate::camera::synthetic_jpeg;
use crate::error::{LapsecamError, StorageError};
use crate::tools::MockToolRunner;
use chrono::{Local, TimeZone};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn settings() -> ThumbnailSettings {
    ThumbnailSettings {
        size: 128,
        video_offset_seconds: 1,
        ffmpeg_command: "ffmpeg".to_string(),
        tool_timeout: Duration::from_secs(5),
    }
}

fn create_store() -> (TempDir, MediaStore, Arc<MockToolRunner>) {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(MockToolRunner::simulated());
    let store = MediaStore::new(
        dir.path(),
        ThumbnailGenerator::new(settings(), runner.clone()),
    );
    (dir, store, runner)
}

fn write_source(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, synthetic_jpeg(width, height, 1).unwrap()).unwrap();
    path
}

fn zip_entries(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_list_missing_category_is_empty() {
    let (_dir, store, _) = create_store();
    assert!(store.list_assets(Category::Photos).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_asset_uses_timestamped_unique_names() {
    let (dir, store, _) = create_store();
    let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

    let first = write_source(dir.path(), "a.JPG", 32, 32);
    let second = write_source(dir.path(), "b.jpg", 32, 32);
    let one = store.add_asset_at(Category::Photos, &first, at).await.unwrap();
    let two = store.add_asset_at(Category::Photos, &second, at).await.unwrap();

    assert_eq!(one.name, "photo_20240309_140507.jpg");
    assert_eq!(two.name, "photo_20240309_140507_1.jpg");
    assert_eq!(one.key(), "photos/photo_20240309_140507.jpg");
    assert_eq!(one.kind, AssetKind::Photo);
    assert!(!first.exists());
    assert!(dir.path().join("photos/photo_20240309_140507_1.jpg").is_file());
}

#[tokio::test]
async fn test_list_is_newest_first_and_skips_archives() {
    let (dir, store, _) = create_store();
    for (i, hour) in [9, 11, 10].into_iter().enumerate() {
        let source = write_source(dir.path(), &format!("{}.jpg", i), 16, 16);
        let at = Local.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        store.add_asset_at(Category::Photos, &source, at).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    std::fs::write(dir.path().join("photos/old.zip"), b"zip").unwrap();
    std::fs::write(dir.path().join("photos/.hidden"), b"x").unwrap();

    let names: Vec<String> = store
        .list_assets(Category::Photos)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();

    // Creation order, not name order
    assert_eq!(
        names,
        vec![
            "photo_20240101_100000.jpg",
            "photo_20240101_110000.jpg",
            "photo_20240101_090000.jpg",
        ]
    );
}

#[tokio::test]
async fn test_timelapse_folders_are_listed_as_folders() {
    let (_dir, store, _) = create_store();
    let at = Local.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

    let folder = store.create_timelapse_folder_at(at).await.unwrap();
    let again = store.create_timelapse_folder_at(at).await.unwrap();

    assert_eq!(folder.name, "timelapse_20240501_083000");
    assert_eq!(again.name, "timelapse_20240501_083000_1");
    let listed = store.list_assets(Category::Timelapses).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(MediaAsset::is_folder));
}

#[test]
fn test_resolve_accepts_nested_paths() {
    let (_dir, store, _) = create_store();
    let (category, name) = store
        .resolve("timelapses/timelapse_20240101_000000/image_0001.jpg")
        .unwrap();
    assert_eq!(category, Category::Timelapses);
    assert_eq!(name, "timelapse_20240101_000000/image_0001.jpg");
}

#[test]
fn test_resolve_rejects_escapes() {
    let (_dir, store, _) = create_store();
    for key in [
        "photos/../secret",
        "photos/a/../../b",
        "photos//etc/passwd",
        "photos/.tmp",
        "photos/",
        "photos",
    ] {
        assert!(
            matches!(
                store.resolve(key),
                Err(LapsecamError::Storage(StorageError::InvalidPath { .. }))
            ),
            "{} should be rejected",
            key
        );
    }

    assert!(matches!(
        store.resolve("thumbnails/photos/x.jpg"),
        Err(LapsecamError::Storage(StorageError::UnknownCategory { .. }))
    ));
}

#[tokio::test]
async fn test_photo_thumbnail_fits_bounding_box() {
    let (dir, store, _) = create_store();
    let source = write_source(dir.path(), "wide.jpg", 640, 480);
    let asset = store.add_asset(Category::Photos, &source).await.unwrap();

    let thumbnail = store.thumbnail_for(&asset).await.unwrap().unwrap();

    assert_eq!(thumbnail, dir.path().join("thumbnails/photos").join(&asset.name));
    assert_eq!(image::image_dimensions(&thumbnail).unwrap(), (128, 96));
}

#[tokio::test]
async fn test_thumbnail_is_not_regenerated_when_fresh() {
    let (dir, store, runner) = create_store();
    let source = dir.path().join("clip.mp4");
    std::fs::write(&source, b"mp4").unwrap();
    let asset = store.add_asset(Category::Videos, &source).await.unwrap();

    let first = store.thumbnail_for(&asset).await.unwrap().unwrap();
    let second = store.thumbnail_for(&asset).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.extension().unwrap(), "jpg");
    assert_eq!(runner.calls().len(), 1);
    assert!(runner.calls()[0].args.contains(&"00:00:01".to_string()));
}

#[tokio::test]
async fn test_video_thumbnail_falls_back_to_first_frame() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(MockToolRunner::failing());
    let store = MediaStore::new(
        dir.path(),
        ThumbnailGenerator::new(settings(), runner.clone()),
    );
    let source = dir.path().join("clip.mp4");
    std::fs::write(&source, b"mp4").unwrap();
    let asset = store.add_asset(Category::Videos, &source).await.unwrap();

    assert!(store.thumbnail_for(&asset).await.is_err());
    let offsets: Vec<bool> = runner
        .calls()
        .iter()
        .map(|c| c.args.contains(&"00:00:00".to_string()))
        .collect();
    assert_eq!(offsets, vec![false, true]);
}

#[tokio::test]
async fn test_folder_has_no_thumbnail() {
    let (_dir, store, _) = create_store();
    let folder = store.create_timelapse_folder().await.unwrap();
    assert!(store.thumbnail_for(&folder).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_removes_asset_thumbnail_and_archives() {
    let (dir, store, _) = create_store();
    let source = write_source(dir.path(), "p.jpg", 64, 64);
    let asset = store.add_asset(Category::Photos, &source).await.unwrap();
    let thumbnail = store.thumbnail_for(&asset).await.unwrap().unwrap();
    let category_zip = store.archive_category(Category::Photos).await.unwrap();
    assert!(category_zip.is_file());

    let existed = store.delete_asset(Category::Photos, &asset.name).await.unwrap();

    assert!(existed);
    assert!(!asset.path.exists());
    assert!(!thumbnail.exists());
    assert!(!category_zip.exists());
    assert!(store.list_assets(Category::Photos).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_frame_invalidates_folder_archive() {
    let (dir, store, _) = create_store();
    let folder = store.create_timelapse_folder().await.unwrap();
    for i in 1..=3 {
        write_source(&folder.path, &format!("image_{:04}.jpg", i), 8, 8);
    }
    let folder_zip = store
        .archive_asset(Category::Timelapses, &folder.name)
        .await
        .unwrap();
    assert_eq!(folder_zip, dir.path().join(format!("timelapses/{}.zip", folder.name)));

    let frame = format!("{}/image_0002.jpg", folder.name);
    assert!(store.delete_asset(Category::Timelapses, &frame).await.unwrap());

    assert!(!folder_zip.exists());
    assert!(folder.path.is_dir());
}

#[tokio::test]
async fn test_delete_missing_asset_is_noop() {
    let (_dir, store, _) = create_store();
    let existed = store
        .delete_asset(Category::Videos, "video_20200101_000000.mp4")
        .await
        .unwrap();
    assert!(!existed);
}

#[tokio::test]
async fn test_archive_asset_file_is_returned_directly() {
    let (dir, store, _) = create_store();
    let source = write_source(dir.path(), "p.jpg", 8, 8);
    let asset = store.add_asset(Category::Photos, &source).await.unwrap();

    let path = store.archive_asset(Category::Photos, &asset.name).await.unwrap();
    assert_eq!(path, asset.path);

    assert!(matches!(
        store.archive_asset(Category::Photos, "missing.jpg").await,
        Err(LapsecamError::Storage(StorageError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_folder_archive_uses_relative_entries() {
    let (_dir, store, _) = create_store();
    let folder = store.create_timelapse_folder().await.unwrap();
    write_source(&folder.path, "image_0001.jpg", 8, 8);
    write_source(&folder.path, "image_0002.jpg", 8, 8);

    let zip = store
        .archive_asset(Category::Timelapses, &folder.name)
        .await
        .unwrap();

    assert_eq!(zip_entries(&zip), vec!["image_0001.jpg", "image_0002.jpg"]);
}

#[tokio::test]
async fn test_category_archive_excludes_archives() {
    let (dir, store, _) = create_store();
    let folder = store.create_timelapse_folder().await.unwrap();
    write_source(&folder.path, "image_0001.jpg", 8, 8);
    store
        .archive_asset(Category::Timelapses, &folder.name)
        .await
        .unwrap();

    let zip = store.archive_category(Category::Timelapses).await.unwrap();

    assert_eq!(zip, dir.path().join("timelapses.zip"));
    assert_eq!(
        zip_entries(&zip),
        vec![format!("{}/image_0001.jpg", folder.name)]
    );
}

#[tokio::test]
async fn test_archive_of_empty_category() {
    let (_dir, store, _) = create_store();
    let zip = store.archive_category(Category::Videos).await.unwrap();
    assert!(zip_entries(&zip).is_empty());
}

#[tokio::test]
async fn test_delete_category_clears_everything() {
    let (dir, store, _) = create_store();
    for i in 0..3 {
        let source = write_source(dir.path(), &format!("{}.jpg", i), 16, 16);
        let asset = store.add_asset(Category::Photos, &source).await.unwrap();
        store.thumbnail_for(&asset).await.unwrap();
    }
    store.archive_category(Category::Photos).await.unwrap();

    store.delete_category(Category::Photos).await.unwrap();

    assert!(store.list_assets(Category::Photos).await.unwrap().is_empty());
    assert!(!store.category_archive_path(Category::Photos).exists());
    assert!(!store.thumbnail_dir(Category::Photos).exists());
    assert!(store.category_dir(Category::Photos).is_dir());
}

#[tokio::test]
async fn test_prepare_creates_layout_and_clears_temp() {
    let (dir, store, _) = create_store();
    let stale = store.temp_path("jpg").await.unwrap();
    std::fs::write(&stale, b"partial").unwrap();

    store.prepare().await.unwrap();

    for category in Category::ALL {
        assert!(dir.path().join(category.dir_name()).is_dir());
        assert!(store.thumbnail_dir(category).is_dir());
    }
    assert!(!stale.exists());
}

#[test]
fn test_category_parsing() {
    assert_eq!("videos".parse::<Category>().unwrap(), Category::Videos);
    assert!(matches!(
        "music".parse::<Category>(),
        Err(LapsecamError::Storage(StorageError::UnknownCategory { .. }))
    ));
}
