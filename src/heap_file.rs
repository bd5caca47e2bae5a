use std::collections::hash_map::DefaultHasher;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::buffer_pool::BufferPool;
use crate::error::{DbError, DbResult};
use crate::heap_page::HeapPage;
use crate::page_id::HeapPageId;
use crate::permissions::Permissions;
use crate::transaction_id::TransactionId;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// An unordered sequence of fixed-size pages on one backing file.
///
/// The table id is derived from a stable hash of the file's canonicalized
/// path, so two `HeapFile` handles opened on the same path always agree,
/// without needing a central id registrar.
pub struct HeapFile {
    path: PathBuf,
    table_id: i32,
    desc: Arc<TupleDesc>,
    page_size: usize,
    file: Mutex<std::fs::File>,
}

fn hash_path(path: &Path) -> i32 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() & 0x7fff_ffff) as i32
}

impl HeapFile {
    pub fn new<P: AsRef<Path>>(
        path: P,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let canonical = path.as_ref().canonicalize().unwrap_or_else(|_| path.as_ref().to_path_buf());
        let table_id = hash_path(&canonical);
        Ok(HeapFile {
            path: canonical,
            table_id,
            desc,
            page_size,
            file: Mutex::new(file),
        })
    }

    pub fn table_id(&self) -> i32 {
        self.table_id
    }

    pub fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> DbResult<usize> {
        let file = self.file.lock().unwrap();
        let len = file.metadata()?.len() as usize;
        Ok(len / self.page_size)
    }

    pub fn read_page(&self, page_number: i32) -> DbResult<HeapPage> {
        let pid = HeapPageId::new(self.table_id, page_number);
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((page_number as u64) * self.page_size as u64))?;
        let mut buf = vec![0u8; self.page_size];
        file.read_exact(&mut buf)?;
        debug!("read page {:?} from {:?}", pid, self.path);
        HeapPage::new(pid, Arc::clone(&self.desc), self.page_size, &buf)
    }

    pub fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let mut file = self.file.lock().unwrap();
        let offset = (page.id().page_number as u64) * self.page_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.page_data())?;
        file.flush()?;
        Ok(())
    }

    /// Scans existing pages for a free slot; if none, appends a new page.
    /// Returns the (single) page the tuple landed on, already resident in
    /// `pool`.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> DbResult<Vec<Arc<Mutex<HeapPage>>>> {
        let num_pages = self.num_pages()?;
        for page_number in 0..num_pages as i32 {
            let pid = HeapPageId::new(self.table_id, page_number);
            let page_arc = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            {
                let mut guard = page_arc.lock().unwrap();
                if guard.num_empty_slots() > 0 {
                    guard.insert(tuple)?;
                    drop(guard);
                    return Ok(vec![page_arc]);
                }
            }
        }

        // No room on any existing page: append a fresh one and make it
        // durable immediately so `num_pages()` reflects it for the next
        // caller, then bring it into the pool the normal way.
        let new_pid = HeapPageId::new(self.table_id, num_pages as i32);
        let mut new_page = HeapPage::empty(new_pid, Arc::clone(&self.desc), self.page_size);
        new_page.insert(tuple)?;
        self.write_page(&new_page)?;

        let page_arc = pool.get_page(tid, new_pid, Permissions::ReadWrite)?;
        Ok(vec![page_arc])
    }

    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> DbResult<HeapPageId> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::IllegalArgument("tuple has no record id".to_string()))?;
        let page_arc = pool.get_page(tid, rid.page_id, Permissions::ReadWrite)?;
        let mut guard = page_arc.lock().unwrap();
        guard.delete(tuple)?;
        Ok(rid.page_id)
    }

    /// Walks every page in order, yielding one tuple at a time. `rewind`
    /// restarts from page 0. Takes an owned handle to the file so the
    /// iterator is not tied to the lifetime of any particular borrow (the
    /// file itself is process-wide, reached through the catalog).
    pub fn iter(file: Arc<HeapFile>, pool: &'static BufferPool, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator {
            file,
            pool,
            tid,
            page_number: 0,
            buffer: Vec::new(),
            buffer_pos: 0,
            opened: false,
        }
    }
}

/// Lazily opens on first `next()`/`has_next()` call and obtains each page
/// through the buffer pool.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: &'static BufferPool,
    tid: TransactionId,
    page_number: i32,
    buffer: Vec<Tuple>,
    buffer_pos: usize,
    opened: bool,
}

impl HeapFileIterator {
    fn load_page(&mut self, page_number: i32) -> DbResult<bool> {
        let num_pages = self.file.num_pages()? as i32;
        if page_number >= num_pages {
            self.buffer.clear();
            self.buffer_pos = 0;
            return Ok(false);
        }
        let pid = HeapPageId::new(self.file.table_id(), page_number);
        let page_arc = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let guard = page_arc.lock().unwrap();
        self.buffer = guard.iter().cloned().collect();
        self.buffer_pos = 0;
        Ok(true)
    }

    pub fn rewind(&mut self) -> DbResult<()> {
        self.opened = true;
        self.page_number = 0;
        self.load_page(0)?;
        Ok(())
    }

    pub fn next(&mut self) -> DbResult<Option<Tuple>> {
        if !self.opened {
            self.rewind()?;
        }
        loop {
            if self.buffer_pos < self.buffer.len() {
                let t = self.buffer[self.buffer_pos].clone();
                self.buffer_pos += 1;
                return Ok(Some(t));
            }
            self.page_number += 1;
            if !self.load_page(self.page_number)? {
                return Ok(None);
            }
        }
    }
}
