use super::types::Category;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Held while a single asset (and everything derived from it) is touched
pub struct AssetGuard {
    _asset: OwnedMutexGuard<()>,
    _category: OwnedRwLockReadGuard<()>,
}

/// Per-asset mutexes under per-category reader/writer locks.
///
/// Lock order is always category then asset. Whole-category operations take
/// the category lock exclusively.
pub struct AssetLocks {
    categories: [Arc<RwLock<()>>; 3],
    assets: Mutex<HashMap<(Category, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for AssetLocks {
    fn default() -> Self {
        Self {
            categories: std::array::from_fn(|_| Arc::new(RwLock::new(()))),
            assets: Mutex::new(HashMap::new()),
        }
    }
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the top-level asset containing `name`; frames inside a timelapse
    /// folder share the folder's lock.
    pub async fn asset(&self, category: Category, name: &str) -> AssetGuard {
        let category_guard = Arc::clone(&self.categories[category.index()])
            .read_owned()
            .await;

        let top = name.split('/').next().unwrap_or(name).to_string();
        let mutex = {
            let mut assets = self.assets.lock();
            assets.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(assets.entry((category, top)).or_default())
        };

        AssetGuard {
            _asset: mutex.lock_owned().await,
            _category: category_guard,
        }
    }

    pub async fn category(&self, category: Category) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.categories[category.index()])
            .write_owned()
            .await
    }
}
