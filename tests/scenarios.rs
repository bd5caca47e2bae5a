//! Cross-module scenario tests that exercise the real `Database` singleton
//! (catalog + buffer pool) end to end, rather than the operator unit
//! tests' `VecScan` test double. Each test registers its own heap file
//! under a fresh temp path, so table ids (derived from the canonicalized
//! path) never collide across concurrently-running tests; none of them
//! call `Database::reset()`, since that would clear tables other tests
//! still have registered.

use std::collections::HashSet;
use std::sync::Arc;

use tempfile::NamedTempFile;

use heapdb::aggregator::{AggOp, NO_GROUPING};
use heapdb::buffer_pool::BufferPool;
use heapdb::database::Database;
use heapdb::field::{Field, Type};
use heapdb::heap_file::HeapFile;
use heapdb::op::Op;
use heapdb::op_iterator::{IterState, OpIterator};
use heapdb::operators::{Aggregate, Delete, Filter, Insert, Join, SeqScan};
use heapdb::page_id::HeapPageId;
use heapdb::permissions::Permissions;
use heapdb::predicate::{JoinPredicate, Predicate};
use heapdb::transaction_id::TransactionId;
use heapdb::tuple::Tuple;
use heapdb::tuple_desc::{FieldItem, TupleDesc};
use heapdb::PAGE_SIZE;

fn register_table(desc: Arc<TupleDesc>, name: &str) -> Arc<HeapFile> {
    let tmp = NamedTempFile::new().unwrap();
    let file = Arc::new(HeapFile::new(tmp.path(), desc, PAGE_SIZE).unwrap());
    // keep the backing temp file alive for the duration of the test run
    std::mem::forget(tmp);
    Database::global().catalog_mut().add_table(Arc::clone(&file), name, None);
    file
}

fn int_desc() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::new(vec![FieldItem::new(Type::Int, Some("v"))]).unwrap())
}

/// A leaf operator replaying a fixed vector of tuples, standing in for a
/// scan when a test wants to feed `Insert`/`Delete` known rows rather
/// than ones already resident on disk.
struct Literal {
    state: IterState,
    desc: Arc<TupleDesc>,
    rows: Vec<Tuple>,
    pos: usize,
}

impl Literal {
    fn new(desc: Arc<TupleDesc>, rows: Vec<Tuple>) -> Self {
        Literal {
            state: IterState::default(),
            desc,
            rows,
            pos: 0,
        }
    }
}

impl OpIterator for Literal {
    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn do_open(&mut self) -> heapdb::error::DbResult<()> {
        self.pos = 0;
        Ok(())
    }

    fn fetch_next(&mut self) -> heapdb::error::DbResult<Option<Tuple>> {
        if self.pos < self.rows.len() {
            let t = self.rows[self.pos].clone();
            self.pos += 1;
            Ok(Some(t))
        } else {
            Ok(None)
        }
    }

    fn do_close(&mut self) {
        self.pos = self.rows.len();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) {
        assert!(children.is_empty(), "Literal is a leaf and takes no children");
    }
}

/// S2: inserting 10,000 tuples into an initially empty single-INT-column
/// heap file grows it to `ceil(10000 / 992) = 11` pages, and a full scan
/// sees every value exactly once.
#[test]
fn s2_heap_file_insert_grows_file() {
    let desc = int_desc();
    let file = register_table(Arc::clone(&desc), "s2_table");
    let pool = Database::global().buffer_pool();
    let tid = TransactionId::new();

    for i in 0..10_000 {
        let t = Tuple::from_fields(Arc::clone(&desc), vec![Field::Int(i)]).unwrap();
        pool.insert_tuple(tid, file.table_id(), t).unwrap();
    }

    assert_eq!(file.num_pages().unwrap(), 11);

    let mut iter = HeapFile::iter(Arc::clone(&file), pool, tid);
    iter.rewind().unwrap();
    let mut seen = HashSet::new();
    let mut count = 0;
    while let Some(t) = iter.next().unwrap() {
        if let Field::Int(v) = t.field(0) {
            seen.insert(*v);
        }
        count += 1;
    }
    assert_eq!(count, 10_000);
    assert_eq!(seen.len(), 10_000);
}

/// S3: a capacity-3 pool handed the request sequence `(t,0) (t,1) (t,2)
/// (t,0) (t,3)` ends up resident on `{(t,0), (t,2), (t,3)}` — `(t,1)` was
/// the least-recently-used page and was evicted by the fifth request.
#[test]
fn s3_buffer_pool_eviction_is_approximate_lru() {
    let desc = int_desc();
    let tmp = NamedTempFile::new().unwrap();
    {
        let f = std::fs::OpenOptions::new().write(true).open(tmp.path()).unwrap();
        f.set_len(4 * PAGE_SIZE as u64).unwrap();
    }
    let file = Arc::new(HeapFile::new(tmp.path(), Arc::clone(&desc), PAGE_SIZE).unwrap());
    std::mem::forget(tmp);
    Database::global().catalog_mut().add_table(Arc::clone(&file), "s3_table", None);

    let pool = BufferPool::new(3);
    let tid = TransactionId::new();
    let pid = |n: i32| HeapPageId::new(file.table_id(), n);

    pool.get_page(tid, pid(0), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, pid(1), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, pid(2), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, pid(0), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, pid(3), Permissions::ReadOnly).unwrap();

    let resident: HashSet<HeapPageId> = pool.resident_pages().into_iter().collect();
    let expected: HashSet<HeapPageId> = [pid(0), pid(2), pid(3)].into_iter().collect();
    assert_eq!(resident, expected);
    assert!(!resident.contains(&pid(1)));
}

/// End-to-end: `Insert` writes tuples through the buffer pool, and a
/// `SeqScan` immediately after sees them (no separate commit step is
/// required by this core).
#[test]
fn insert_then_scan_sees_inserted_rows() {
    let desc = Arc::new(
        TupleDesc::new(vec![
            FieldItem::new(Type::Int, Some("a")),
            FieldItem::new(Type::Str, Some("b")),
        ])
        .unwrap(),
    );
    let file = register_table(Arc::clone(&desc), "insert_scan_table");
    let tid = TransactionId::new();

    let rows = vec![(1, "x"), (2, "y"), (3, "x")]
        .into_iter()
        .map(|(a, b)| Tuple::from_fields(Arc::clone(&desc), vec![Field::Int(a), Field::Str(b.into())]).unwrap())
        .collect();
    let source = Literal::new(Arc::clone(&desc), rows);
    let mut insert = Insert::new(tid, file.table_id(), Box::new(source));
    insert.open().unwrap();
    let count_tuple = insert.next().unwrap().unwrap();
    assert_eq!(count_tuple.field(0), &Field::Int(3));
    assert!(insert.next().unwrap().is_none());
    insert.close();

    let mut scan = SeqScan::new(tid, file.table_id());
    scan.open().unwrap();
    let mut rows = Vec::new();
    while scan.has_next().unwrap() {
        rows.push(scan.next().unwrap().unwrap());
    }
    scan.close();
    assert_eq!(rows.len(), 3);

    let mut filter = Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Int(1)),
        Box::new(SeqScan::new(tid, file.table_id())),
    );
    filter.open().unwrap();
    let mut filtered = Vec::new();
    while filter.has_next().unwrap() {
        filtered.push(filter.next().unwrap().unwrap());
    }
    filter.close();
    assert_eq!(filtered.len(), 2);
}

/// `Delete` removes tuples through the buffer pool; a subsequent scan no
/// longer sees them.
#[test]
fn delete_then_scan_sees_fewer_rows() {
    let desc = int_desc();
    let file = register_table(Arc::clone(&desc), "delete_scan_table");
    let tid = TransactionId::new();

    let rows = vec![1, 2, 3]
        .into_iter()
        .map(|v| Tuple::from_fields(Arc::clone(&desc), vec![Field::Int(v)]).unwrap())
        .collect();
    let source = Literal::new(Arc::clone(&desc), rows);
    let mut insert = Insert::new(tid, file.table_id(), Box::new(source));
    insert.open().unwrap();
    insert.next().unwrap();
    insert.close();

    let mut scan = SeqScan::new(tid, file.table_id());
    scan.open().unwrap();
    let mut rows = Vec::new();
    while scan.has_next().unwrap() {
        rows.push(scan.next().unwrap().unwrap());
    }
    scan.close();
    assert_eq!(rows.len(), 3);

    let to_delete = rows.into_iter().find(|t| t.field(0) == &Field::Int(2)).unwrap();
    let delete_source = Literal::new(Arc::clone(&desc), vec![to_delete]);
    let mut delete = Delete::new(tid, Box::new(delete_source));
    delete.open().unwrap();
    let count = delete.next().unwrap().unwrap();
    assert_eq!(count.field(0), &Field::Int(1));
    delete.close();

    let mut scan = SeqScan::new(tid, file.table_id());
    scan.open().unwrap();
    let mut remaining = Vec::new();
    while scan.has_next().unwrap() {
        remaining.push(scan.next().unwrap().unwrap());
    }
    scan.close();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.iter().any(|t| t.field(0) == &Field::Int(2)));
}

/// S5 against real heap-backed scans instead of `VecScan`: nested-loops
/// equi-join of `[1,2,3]` against `[2,2,4]` on field 0 yields two `(2,2)`
/// rows.
#[test]
fn nested_loops_join_over_real_tables_s5() {
    let desc = int_desc();
    let left_file = register_table(Arc::clone(&desc), "join_left");
    let right_file = register_table(Arc::clone(&desc), "join_right");
    let tid = TransactionId::new();

    for (file, values) in [(&left_file, vec![1, 2, 3]), (&right_file, vec![2, 2, 4])] {
        let pool = Database::global().buffer_pool();
        for v in values {
            let t = Tuple::from_fields(Arc::clone(&desc), vec![Field::Int(v)]).unwrap();
            pool.insert_tuple(tid, file.table_id(), t).unwrap();
        }
    }

    let mut join = Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        Box::new(SeqScan::new(tid, left_file.table_id())),
        Box::new(SeqScan::new(tid, right_file.table_id())),
    );
    join.open().unwrap();
    let mut out = Vec::new();
    while join.has_next().unwrap() {
        out.push(join.next().unwrap().unwrap());
    }
    join.close();

    assert_eq!(out.len(), 2);
    for t in &out {
        assert_eq!(t.field(0), &Field::Int(2));
        assert_eq!(t.field(1), &Field::Int(2));
    }
}

/// S6 against a real heap-backed scan: grouped `SUM` over
/// `[(A,1),(A,2),(B,5)]` yields `{(A,3),(B,5)}`.
#[test]
fn aggregate_grouped_sum_over_real_table_s6() {
    let desc = Arc::new(
        TupleDesc::new(vec![
            FieldItem::new(Type::Str, Some("g")),
            FieldItem::new(Type::Int, Some("v")),
        ])
        .unwrap(),
    );
    let file = register_table(Arc::clone(&desc), "aggregate_table");
    let tid = TransactionId::new();
    let pool = Database::global().buffer_pool();
    for (g, v) in [("A", 1), ("A", 2), ("B", 5)] {
        let t = Tuple::from_fields(Arc::clone(&desc), vec![Field::Str(g.into()), Field::Int(v)]).unwrap();
        pool.insert_tuple(tid, file.table_id(), t).unwrap();
    }

    let mut agg = Aggregate::new(Box::new(SeqScan::new(tid, file.table_id())), 0, 1, AggOp::Sum).unwrap();
    agg.open().unwrap();
    let mut out = Vec::new();
    while agg.has_next().unwrap() {
        out.push(agg.next().unwrap().unwrap());
    }
    agg.close();

    assert_eq!(out.len(), 2);
    let sum_of = |g: &str| {
        out.iter()
            .find(|t| t.field(0) == &Field::Str(g.to_string()))
            .map(|t| t.field(1).clone())
    };
    assert_eq!(sum_of("A"), Some(Field::Int(3)));
    assert_eq!(sum_of("B"), Some(Field::Int(5)));
}

/// Ungrouped aggregation uses `NO_GROUPING` and yields a single total.
#[test]
fn aggregate_ungrouped_count_over_real_table() {
    let desc = int_desc();
    let file = register_table(Arc::clone(&desc), "ungrouped_count_table");
    let tid = TransactionId::new();
    let pool = Database::global().buffer_pool();
    for v in [1, 2, 3, 4] {
        let t = Tuple::from_fields(Arc::clone(&desc), vec![Field::Int(v)]).unwrap();
        pool.insert_tuple(tid, file.table_id(), t).unwrap();
    }

    let mut agg = Aggregate::new(
        Box::new(SeqScan::new(tid, file.table_id())),
        NO_GROUPING,
        0,
        AggOp::Count,
    )
    .unwrap();
    agg.open().unwrap();
    let total = agg.next().unwrap().unwrap();
    assert_eq!(total.field(0), &Field::Int(4));
    assert!(agg.next().unwrap().is_none());
    agg.close();
}
