use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFile;
use crate::tuple_desc::TupleDesc;

struct CatalogEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
}

/// Process-wide registry from table id to `(file, name, primary key)`.
/// Populating it from a textual schema definition is the front-end's job
/// (out of scope); the core only needs lookup and iteration.
#[derive(Default)]
pub struct Catalog {
    by_id: HashMap<i32, CatalogEntry>,
    name_to_id: HashMap<String, i32>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            by_id: HashMap::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// Registers a table. A duplicate name or id replaces the previous
    /// entry.
    pub fn add_table(&mut self, file: Arc<HeapFile>, name: &str, primary_key: Option<&str>) {
        let id = file.table_id();
        info!("catalog: registering table '{}' (id={})", name, id);
        self.name_to_id.insert(name.to_string(), id);
        self.by_id.insert(
            id,
            CatalogEntry {
                file,
                name: name.to_string(),
                primary_key: primary_key.map(|s| s.to_string()),
            },
        );
    }

    pub fn get_file(&self, table_id: i32) -> DbResult<Arc<HeapFile>> {
        self.by_id
            .get(&table_id)
            .map(|e| Arc::clone(&e.file))
            .ok_or(DbError::CatalogMiss(table_id))
    }

    pub fn get_table_name(&self, table_id: i32) -> DbResult<&str> {
        self.by_id
            .get(&table_id)
            .map(|e| e.name.as_str())
            .ok_or(DbError::CatalogMiss(table_id))
    }

    pub fn get_primary_key(&self, table_id: i32) -> DbResult<Option<&str>> {
        self.by_id
            .get(&table_id)
            .map(|e| e.primary_key.as_deref())
            .ok_or(DbError::CatalogMiss(table_id))
    }

    pub fn table_id_by_name(&self, name: &str) -> DbResult<i32> {
        self.name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| DbError::IllegalArgument(format!("no such table: {}", name)))
    }

    pub fn tuple_desc(&self, table_id: i32) -> DbResult<Arc<TupleDesc>> {
        Ok(self.get_file(table_id)?.tuple_desc())
    }

    pub fn table_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.by_id.keys().copied()
    }
}
