use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::OnceCell;

use crate::buffer_pool::{BufferPool, DEFAULT_PAGES};
use crate::catalog::Catalog;
use crate::util::HandyRwLock;

static DB: OnceCell<Database> = OnceCell::new();

/// Process-wide handle to the catalog and buffer pool. The SQL front-end
/// and the textual catalog loader are external collaborators that sit on
/// top of this; the core only needs a place to hang a shared catalog and a
/// shared pool.
pub struct Database {
    catalog: Arc<RwLock<Catalog>>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    fn new(pool_capacity: usize) -> Database {
        Database {
            catalog: Arc::new(RwLock::new(Catalog::new())),
            buffer_pool: Arc::new(BufferPool::new(pool_capacity)),
        }
    }

    pub fn global() -> &'static Database {
        DB.get_or_init(|| Database::new(DEFAULT_PAGES))
    }

    /// Rebuilds the catalog and pool, for test isolation. Only usable
    /// before any other thread has captured references into the previous
    /// instance's interior-mutable state, since the singleton cell itself
    /// cannot be replaced once set — callers needing true reinitialization
    /// should instead call `catalog().clear()`-style helpers; this method
    /// clears the existing instance's mutable state in place.
    pub fn reset() {
        let db = Self::global();
        db.buffer_pool.clear();
        *db.catalog.wl() = Catalog::new();
    }

    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.rl()
    }

    pub fn catalog_mut(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.wl()
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }
}
