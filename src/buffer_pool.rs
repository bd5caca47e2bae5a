use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, trace};

use crate::database::Database;
use crate::error::DbResult;
use crate::heap_page::HeapPage;
use crate::page_id::HeapPageId;
use crate::permissions::Permissions;
use crate::transaction_id::TransactionId;

pub const DEFAULT_PAGES: usize = 50;

struct Inner {
    pages: HashMap<HeapPageId, Arc<Mutex<HeapPage>>>,
    /// Least-recently-used first, most-recently-used last.
    recency: Vec<HeapPageId>,
}

impl Inner {
    fn touch(&mut self, pid: HeapPageId) {
        self.recency.retain(|p| *p != pid);
        self.recency.push(pid);
    }
}

/// A bounded cache of resident pages keyed by page id, with approximate-LRU
/// eviction and dirty tracking. Every public method serializes through a
/// single mutex guarding the resident map and recency order.
pub struct BufferPool {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        BufferPool {
            capacity,
            inner: Mutex::new(Inner {
                pages: HashMap::new(),
                recency: Vec::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn resident_pages(&self) -> Vec<HeapPageId> {
        self.inner.lock().unwrap().recency.clone()
    }

    /// Returns the resident page, loading it through its owning file on a
    /// miss. The load path (map lookup through insertion) is one critical
    /// section.
    pub fn get_page(
        &self,
        _tid: TransactionId,
        pid: HeapPageId,
        _permission: Permissions,
    ) -> DbResult<Arc<Mutex<HeapPage>>> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(page) = inner.pages.get(&pid) {
            let page = Arc::clone(page);
            inner.touch(pid);
            trace!("buffer pool hit: {:?}", pid);
            return Ok(page);
        }

        trace!("buffer pool miss: {:?}, loading from disk", pid);
        let file = Database::global().catalog().get_file(pid.table_id)?;
        let page = file.read_page(pid.page_number)?;

        if inner.pages.len() >= self.capacity {
            self.evict_one(&mut inner)?;
        }

        let page_arc = Arc::new(Mutex::new(page));
        inner.pages.insert(pid, Arc::clone(&page_arc));
        inner.touch(pid);
        Ok(page_arc)
    }

    /// Evicts the single least-recently-used page, flushing it first if
    /// dirty. Note the reference behavior this mirrors: the check fires at
    /// capacity rather than above it, so the pool never holds more than
    /// `capacity` pages.
    fn evict_one(&self, inner: &mut Inner) -> DbResult<()> {
        let victim = match inner.recency.first().copied() {
            Some(p) => p,
            None => return Ok(()),
        };
        debug!("evicting page {:?}", victim);
        if let Some(page_arc) = inner.pages.get(&victim) {
            let mut guard = page_arc.lock().unwrap();
            if guard.is_dirty() {
                let file = Database::global().catalog().get_file(victim.table_id)?;
                file.write_page(&guard)?;
                guard.mark_dirty(false, None);
            }
        }
        inner.pages.remove(&victim);
        inner.recency.retain(|p| *p != victim);
        Ok(())
    }

    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: i32,
        tuple: crate::tuple::Tuple,
    ) -> DbResult<()> {
        let file = Database::global().catalog().get_file(table_id)?;
        let pages = file.insert_tuple(tid, tuple, self)?;
        for page_arc in pages {
            let mut guard = page_arc.lock().unwrap();
            guard.mark_dirty(true, Some(tid));
        }
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, tuple: &crate::tuple::Tuple) -> DbResult<()> {
        let table_id = tuple
            .record_id()
            .ok_or_else(|| {
                crate::error::DbError::IllegalArgument("tuple has no record id".to_string())
            })?
            .page_id
            .table_id;
        let file = Database::global().catalog().get_file(table_id)?;
        let pid = file.delete_tuple(tid, tuple, self)?;

        let inner = self.inner.lock().unwrap();
        if let Some(page_arc) = inner.pages.get(&pid) {
            let mut guard = page_arc.lock().unwrap();
            guard.mark_dirty(true, Some(tid));
        }
        Ok(())
    }

    /// Writes a resident dirty page through its file; a no-op if the page
    /// is absent or clean.
    pub fn flush_page(&self, pid: HeapPageId) -> DbResult<()> {
        let inner = self.inner.lock().unwrap();
        if let Some(page_arc) = inner.pages.get(&pid) {
            let mut guard = page_arc.lock().unwrap();
            if guard.is_dirty() {
                let file = Database::global().catalog().get_file(pid.table_id)?;
                file.write_page(&guard)?;
                guard.mark_dirty(false, None);
            }
        }
        Ok(())
    }

    pub fn flush_pages(&self, tid: TransactionId) -> DbResult<()> {
        let inner = self.inner.lock().unwrap();
        for (pid, page_arc) in inner.pages.iter() {
            let mut guard = page_arc.lock().unwrap();
            if guard.dirty_owner() == Some(tid) {
                let file = Database::global().catalog().get_file(pid.table_id)?;
                file.write_page(&guard)?;
                guard.mark_dirty(false, None);
            }
        }
        Ok(())
    }

    pub fn flush_all_pages(&self) -> DbResult<()> {
        let inner = self.inner.lock().unwrap();
        for (pid, page_arc) in inner.pages.iter() {
            let mut guard = page_arc.lock().unwrap();
            if guard.is_dirty() {
                let file = Database::global().catalog().get_file(pid.table_id)?;
                file.write_page(&guard)?;
                guard.mark_dirty(false, None);
            }
        }
        Ok(())
    }

    /// Evicts a page without flushing it, regardless of its dirty state.
    /// A hook for rollback/recovery collaborators.
    pub fn discard_page(&self, pid: HeapPageId) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.remove(&pid);
        inner.recency.retain(|p| *p != pid);
    }

    /// Recovery/lock-manager hook: commit flushes every page `tid` dirtied,
    /// abort discards them. The core's contract is to never leave dirty
    /// pages from a committed transaction un-flushed.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        if commit {
            self.flush_pages(tid)
        } else {
            let to_discard: Vec<HeapPageId> = {
                let inner = self.inner.lock().unwrap();
                inner
                    .pages
                    .iter()
                    .filter(|(_, page)| page.lock().unwrap().dirty_owner() == Some(tid))
                    .map(|(pid, _)| *pid)
                    .collect()
            };
            for pid in to_discard {
                self.discard_page(pid);
            }
            Ok(())
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.clear();
        inner.recency.clear();
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_PAGES)
    }
}
