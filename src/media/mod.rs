//! On-disk media library: assets, their thumbnails and zip archives.

mod archive;
mod locks;
mod store;
mod thumbnail;
#[cfg(test)]
mod tests;
mod types;

pub use archive::{is_archive, zip_directory};
pub use locks::{AssetGuard, AssetLocks};
pub use store::MediaStore;
pub use thumbnail::{ThumbnailGenerator, ThumbnailSettings};
pub use types::{AssetKind, Category, MediaAsset};
