use crate::error::{LapsecamError, StorageError};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Top-level media directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Photos,
    Videos,
    Timelapses,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Photos, Category::Videos, Category::Timelapses];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Videos => "videos",
            Self::Timelapses => "timelapses",
        }
    }

    /// Prefix for generated asset names, e.g. `photo_20240101_120000.jpg`
    pub fn asset_prefix(&self) -> &'static str {
        match self {
            Self::Photos => "photo",
            Self::Videos => "video",
            Self::Timelapses => "timelapse",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Photos => "Photos",
            Self::Videos => "Videos",
            Self::Timelapses => "Timelapses",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Photos => 0,
            Self::Videos => 1,
            Self::Timelapses => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Category {
    type Err = LapsecamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.dir_name() == s)
            .ok_or_else(|| {
                StorageError::UnknownCategory {
                    name: s.to_string(),
                }
                .into()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Photo,
    Video,
    TimelapseFolder,
}

impl AssetKind {
    pub(crate) fn for_entry(category: Category, is_dir: bool) -> Self {
        match (category, is_dir) {
            (_, true) => Self::TimelapseFolder,
            (Category::Videos, false) => Self::Video,
            (Category::Photos | Category::Timelapses, false) => Self::Photo,
        }
    }
}

/// One stored item. Identity is its category plus relative name.
#[derive(Debug, Clone, Serialize)]
pub struct MediaAsset {
    pub kind: AssetKind,
    pub category: Category,
    /// Path below the category directory, `/` separated
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    pub size_bytes: u64,
}

impl MediaAsset {
    /// Address used in URLs, e.g. `photos/photo_20240101_120000.jpg`
    pub fn key(&self) -> String {
        format!("{}/{}", self.category.dir_name(), self.name)
    }

    pub fn is_folder(&self) -> bool {
        self.kind == AssetKind::TimelapseFolder
    }
}
