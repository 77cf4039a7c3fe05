use super::archive::{is_archive, sibling_archive, zip_directory};
use super::locks::{AssetGuard, AssetLocks};
use super::thumbnail::{thumbnail_name, ThumbnailGenerator, ThumbnailSettings};
use super::types::{AssetKind, Category, MediaAsset};
use crate::config::{StorageConfig, ToolsConfig};
use crate::error::{LapsecamError, Result, StorageError};
use crate::tools::ToolRunner;
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const THUMBNAIL_DIR: &str = "thumbnails";
const TEMP_DIR: &str = ".tmp";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Filesystem-backed media library rooted at a base directory:
///
/// ```text
/// <root>/photos/      photo_YYYYMMDD_HHMMSS.jpg
/// <root>/videos/      video_YYYYMMDD_HHMMSS.mp4
/// <root>/timelapses/  timelapse_YYYYMMDD_HHMMSS/image_000001.jpg
/// <root>/thumbnails/<category>/...
/// <root>/<category>.zip
/// ```
pub struct MediaStore {
    root: PathBuf,
    thumbnails: ThumbnailGenerator,
    locks: AssetLocks,
    naming: tokio::sync::Mutex<()>,
}

impl MediaStore {
    pub fn new<P: Into<PathBuf>>(root: P, thumbnails: ThumbnailGenerator) -> Self {
        Self {
            root: root.into(),
            thumbnails,
            locks: AssetLocks::new(),
            naming: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(
        storage: &StorageConfig,
        tools: &ToolsConfig,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        let settings = ThumbnailSettings::from_config(storage, tools);
        Self::new(&storage.root, ThumbnailGenerator::new(settings, runner))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn thumbnail_dir(&self, category: Category) -> PathBuf {
        self.root.join(THUMBNAIL_DIR).join(category.dir_name())
    }

    pub fn category_archive_path(&self, category: Category) -> PathBuf {
        self.root.join(format!("{}.zip", category.dir_name()))
    }

    fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// Create the directory layout and clear leftovers from an earlier run
    pub async fn prepare(&self) -> Result<()> {
        for category in Category::ALL {
            fs::create_dir_all(self.category_dir(category)).await?;
            fs::create_dir_all(self.thumbnail_dir(category)).await?;
        }

        let temp = self.temp_dir();
        if remove_path(&temp).await? {
            debug!("Cleared stale temporary files in {}", temp.display());
        }
        fs::create_dir_all(&temp).await?;

        info!("Media store ready at {}", self.root.display());
        Ok(())
    }

    /// Fresh scratch file path for an in-progress capture
    pub async fn temp_path(&self, extension: &str) -> Result<PathBuf> {
        let temp = self.temp_dir();
        fs::create_dir_all(&temp).await?;
        Ok(temp.join(format!("{}.{}", uuid::Uuid::new_v4(), extension)))
    }

    /// Assets of a category, newest first. Empty if the directory is missing.
    pub async fn list_assets(&self, category: Category) -> Result<Vec<MediaAsset>> {
        let dir = self.category_dir(category);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut assets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            let path = entry.path();
            if name.starts_with('.') || is_archive(&path) {
                continue;
            }

            match fs::metadata(&path).await {
                Ok(metadata) => assets.push(build_asset(category, name, path, &metadata)),
                // Deleted between listing and stat
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        assets.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(assets)
    }

    /// Move a finished capture into the library under a timestamped name
    pub async fn add_asset(&self, category: Category, source: &Path) -> Result<MediaAsset> {
        self.add_asset_at(category, source, Local::now()).await
    }

    pub async fn add_asset_at(
        &self,
        category: Category,
        source: &Path,
        at: DateTime<Local>,
    ) -> Result<MediaAsset> {
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir).await?;

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let stem = format!("{}_{}", category.asset_prefix(), at.format(TIMESTAMP_FORMAT));

        let naming = self.naming.lock().await;
        let name = unique_name(&dir, &stem, &extension).await;
        let guard = self.locks.asset(category, &name).await;
        move_file(source, &dir.join(&name)).await?;
        drop(guard);
        drop(naming);

        info!("Stored {}/{}", category, name);
        self.describe(category, &name)
            .await?
            .ok_or_else(|| not_found(category, &name))
    }

    pub async fn create_timelapse_folder(&self) -> Result<MediaAsset> {
        self.create_timelapse_folder_at(Local::now()).await
    }

    pub async fn create_timelapse_folder_at(&self, at: DateTime<Local>) -> Result<MediaAsset> {
        let category = Category::Timelapses;
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir).await?;

        let stem = format!("{}_{}", category.asset_prefix(), at.format(TIMESTAMP_FORMAT));
        let mut suffix = 0u32;
        let name = loop {
            let candidate = numbered(&stem, suffix, "");
            match fs::create_dir(dir.join(&candidate)).await {
                Ok(()) => break candidate,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        };

        info!("Created timelapse folder {}", name);
        self.describe(category, &name)
            .await?
            .ok_or_else(|| not_found(category, &name))
    }

    /// Parse a `category/relative/path` key, rejecting anything that could
    /// point outside the category directory
    pub fn resolve(&self, key: &str) -> Result<(Category, String)> {
        let invalid = || -> LapsecamError {
            StorageError::InvalidPath {
                path: key.to_string(),
            }
            .into()
        };

        let (category, rest) = key.trim_start_matches('/').split_once('/').ok_or_else(invalid)?;
        let category: Category = category.parse()?;

        let mut parts = Vec::new();
        for component in Path::new(rest).components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(invalid)?;
                    if part.starts_with('.') {
                        return Err(invalid());
                    }
                    parts.push(part);
                }
                _ => return Err(invalid()),
            }
        }

        if parts.is_empty() {
            return Err(invalid());
        }
        Ok((category, parts.join("/")))
    }

    pub fn asset_path(&self, category: Category, name: &str) -> PathBuf {
        self.category_dir(category).join(name)
    }

    /// Current state of one asset, `None` if it does not exist
    pub async fn describe(&self, category: Category, name: &str) -> Result<Option<MediaAsset>> {
        let path = self.asset_path(category, name);
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(build_asset(category, name, path, &metadata))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize with other work on the same asset
    pub async fn lock_asset(&self, category: Category, name: &str) -> AssetGuard {
        self.locks.asset(category, name).await
    }

    /// Thumbnail path for an asset, generating it when missing or stale.
    /// `None` for folders and for assets that have disappeared.
    pub async fn thumbnail_for(&self, asset: &MediaAsset) -> Result<Option<PathBuf>> {
        let Some(thumbnail) =
            thumbnail_name(asset.kind, &self.thumbnail_dir(asset.category), &asset.name)
        else {
            return Ok(None);
        };

        let _guard = self.locks.asset(asset.category, &asset.name).await;
        if fs::metadata(&asset.path).await.is_err() {
            return Ok(None);
        }

        if self
            .thumbnails
            .ensure(asset.kind, &asset.path, &thumbnail)
            .await?
        {
            debug!("Generated thumbnail for {}", asset.key());
        }
        Ok(Some(thumbnail))
    }

    /// Remove an asset with its thumbnail and every archive that contained
    /// it. Missing assets are not an error; returns whether it existed.
    pub async fn delete_asset(&self, category: Category, name: &str) -> Result<bool> {
        let _guard = self.locks.asset(category, name).await;
        let path = self.asset_path(category, name);
        let existed = remove_path(&path).await?;

        let thumbnail = self.thumbnail_dir(category).join(name);
        remove_path(&thumbnail).await?;
        remove_path(&thumbnail.with_extension("jpg")).await?;

        remove_path(&sibling_archive(&path)).await?;
        let category_dir = self.category_dir(category);
        if let Some(parent) = path.parent() {
            for ancestor in parent.ancestors() {
                if ancestor == category_dir || !ancestor.starts_with(&category_dir) {
                    break;
                }
                remove_path(&sibling_archive(ancestor)).await?;
            }
        }
        remove_path(&self.category_archive_path(category)).await?;

        if existed {
            info!("Deleted {}/{}", category, name);
        } else {
            debug!("Delete of missing {}/{} only cleared derived files", category, name);
        }
        Ok(existed)
    }

    /// Remove every asset of a category and all of their derived files
    pub async fn delete_category(&self, category: Category) -> Result<()> {
        let _guard = self.locks.category(category).await;

        remove_path(&self.category_dir(category)).await?;
        remove_path(&self.thumbnail_dir(category)).await?;
        remove_path(&self.category_archive_path(category)).await?;
        fs::create_dir_all(self.category_dir(category)).await?;

        info!("Deleted all {}", category);
        Ok(())
    }

    /// Downloadable file for an asset: the file itself, or a zip of a folder
    pub async fn archive_asset(&self, category: Category, name: &str) -> Result<PathBuf> {
        let _guard = self.locks.asset(category, name).await;
        let path = self.asset_path(category, name);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(category, name)),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_dir() {
            return Ok(path);
        }

        let dest = sibling_archive(&path);
        let count = zip_blocking(path, dest.clone()).await?;
        info!("Archived {}/{} ({} files)", category, name, count);
        Ok(dest)
    }

    /// Zip of the whole category at `<root>/<category>.zip`
    pub async fn archive_category(&self, category: Category) -> Result<PathBuf> {
        let _guard = self.locks.category(category).await;
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir).await?;

        let dest = self.category_archive_path(category);
        let count = zip_blocking(dir, dest.clone()).await?;
        info!("Archived all {} ({} files)", category, count);
        Ok(dest)
    }
}

fn build_asset(
    category: Category,
    name: &str,
    path: PathBuf,
    metadata: &std::fs::Metadata,
) -> MediaAsset {
    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());

    MediaAsset {
        kind: AssetKind::for_entry(category, metadata.is_dir()),
        category,
        name: name.to_string(),
        path,
        created_at: created,
        size_bytes: if metadata.is_dir() { 0 } else { metadata.len() },
    }
}

fn not_found(category: Category, name: &str) -> LapsecamError {
    StorageError::NotFound {
        path: format!("{}/{}", category, name),
    }
    .into()
}

fn numbered(stem: &str, suffix: u32, extension: &str) -> String {
    if suffix == 0 {
        format!("{}{}", stem, extension)
    } else {
        format!("{}_{}{}", stem, suffix, extension)
    }
}

async fn unique_name(dir: &Path, stem: &str, extension: &str) -> String {
    let mut suffix = 0;
    loop {
        let candidate = numbered(stem, suffix, extension);
        if fs::symlink_metadata(dir.join(&candidate)).await.is_err() {
            return candidate;
        }
        suffix += 1;
    }
}

async fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if fs::rename(source, dest).await.is_ok() {
        return Ok(());
    }

    // Different filesystem
    fs::copy(source, dest).await?;
    fs::remove_file(source).await?;
    Ok(())
}

/// Remove a file or directory tree. Returns whether anything was there.
async fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn zip_blocking(source: PathBuf, dest: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || zip_directory(&source, &dest))
        .await
        .map_err(|e| LapsecamError::system(format!("Archive task failed: {}", e)))?
}
